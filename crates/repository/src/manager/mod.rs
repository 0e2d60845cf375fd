//! Validated, cached entity management on top of a [`Repository`](crate::core::Repository).
//!
//! - [`EntityManager`] - CRUD with validation, change detection and read-through caching
//! - [`Validator`] / [`RuleValidator`] - Business-rule checks run before writes
//! - [`EntityHooks`] - Pre-write adjustments such as timestamps
//! - [`EntityCache`] / [`MokaEntityCache`] - The read-through cache
//! - [`OperationResult`] - Outcome of a mutation
//!
//! # Write path
//!
//! ```text
//! add:     validate -> before_add -> storage.add -> cache insert
//! update:  key -> read-through -> unchanged? -> validate -> before_update
//!          -> storage.update -> cache refresh
//! remove:  key -> read-through -> storage.remove -> cache evict
//! ```

mod cache;
mod entity_manager;
mod hooks;
mod result;
mod validation;

pub use cache::{
    CacheError, CacheKeyGenerator, DefaultCacheKeyGenerator, EntityCache, FetchFuture,
    MokaEntityCache, ReadThroughError,
};
pub use entity_manager::{EntityManager, EntityManagerBuilder};
pub use hooks::{DefaultHooks, EntityHooks, TimestampHooks, Timestamped};
pub use result::{ErrorCode, ManagerError, ManagerResult, OperationError, OperationResult};
pub use validation::{
    RuleValidator, ValidationFailure, ValidationResult, ValidationSeverity, Validator,
};
