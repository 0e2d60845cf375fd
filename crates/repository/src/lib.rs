//! Helios Repository Layer
//!
//! This crate provides a backend-agnostic repository abstraction for typed
//! entities, with a manager layer that adds validation, change detection and
//! read-through caching on top of any storage engine.
//!
//! # Features
//!
//! - **Entity Schemas**: Each entity type declares its key and queryable fields once
//! - **Key Handling**: Native key types, raw key coercion, random and sequential generation
//! - **Filters**: A composable filter AST translated by each storage engine
//! - **Paging**: Page requests and results with totals computed over the filtered set
//! - **Capabilities**: Engines advertise filtering, paging and ad-hoc queries
//! - **Caching**: A bounded, expiring read-through cache in the manager
//! - **Multitenancy**: One lazily created repository instance per tenant
//!
//! # Architecture
//!
//! - [`schema`] - Entity description and field accessors
//! - [`key`] - Key types, coercion and generation
//! - [`types`] - Filters, sort rules and pages
//! - [`error`] - Error types for all operations
//! - [`core`] - Repository traits and capabilities
//! - [`backends`] - Storage engine implementations
//! - [`manager`] - Validated, cached entity management
//! - [`provider`] - Per-tenant repository instances
//! - [`config`] - Repository and manager configuration
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use helios_repository::backends::memory::InMemoryRepository;
//! use helios_repository::config::{CacheConfig, ManagerConfig};
//! use helios_repository::manager::{EntityManager, RuleValidator};
//! use helios_repository::schema::{Entity, EntitySchemaBuilder};
//! use helios_repository::types::{Filter, SortRule};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Patient {
//!     id: Option<String>,
//!     name: String,
//!     age: i64,
//! }
//!
//! impl Entity for Patient {
//!     type Key = String;
//!
//!     fn describe(schema: &mut EntitySchemaBuilder<Self>) {
//!         schema
//!             .key("id", |p| p.id.clone(), |p, id| p.id = Some(id))
//!             .field("name", |p| p.name.as_str().into())
//!             .field("age", |p| p.age.into());
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let manager = EntityManager::<Patient>::builder(Arc::new(InMemoryRepository::<Patient>::new()))
//!     .validator(RuleValidator::new().require("name", "is required", |p: &Patient| {
//!         !p.name.is_empty()
//!     }))
//!     .config(ManagerConfig::new().with_cache(CacheConfig::enabled(1_000)))
//!     .build()
//!     .unwrap();
//!
//! let added = manager
//!     .add(Patient { id: None, name: "Smith".into(), age: 42 })
//!     .await
//!     .into_value()
//!     .unwrap();
//! let key = added.id.clone().unwrap();
//! assert_eq!(manager.find_by_key(&key).await.unwrap(), Some(added));
//!
//! let adults = manager
//!     .find_all(&Filter::ge("age", 18), &[SortRule::asc("name")])
//!     .await
//!     .unwrap();
//! assert_eq!(adults.len(), 1);
//! # });
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod key;
pub mod manager;
pub mod provider;
pub mod schema;
pub mod tenant;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{RepositoryError, RepositoryResult};
pub use schema::{Entity, EntitySchemaBuilder, FieldValue};
pub use tenant::TenantId;
pub use types::{Filter, PageRequest, PageResult, SortDirection, SortRule};

// Re-export core traits
pub use core::{
    Capability, FilterableRepository, PageableRepository, QueryableRepository, Repository,
    RepositoryCapabilities,
};

// Re-export the manager layer
pub use manager::{EntityManager, ErrorCode, OperationResult};
pub use provider::RepositoryProvider;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
