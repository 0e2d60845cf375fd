//! Core repository traits and abstractions.
//!
//! - [`Repository`] - CRUD operations every storage engine provides
//! - [`FilterableRepository`] - Filter and sort queries
//! - [`PageableRepository`] - Page queries
//! - [`QueryableRepository`] - Ad-hoc predicate queries
//! - [`FilterTranslator`] - Filter/sort translation into a native form
//!
//! # Capabilities
//!
//! The query traits are optional. A storage engine advertises them through
//! the `as_*` probes on [`Repository`]:
//!
//! ```text
//! Repository
//!     ├── as_filterable() -> FilterableRepository
//!     ├── as_pageable()   -> PageableRepository
//!     └── as_queryable()  -> QueryableRepository
//! ```

mod capabilities;
mod repository;
mod translate;

pub use capabilities::{Capability, RepositoryCapabilities};
pub use repository::{
    EntityPredicate, FilterableRepository, PageableRepository, QueryableRepository, Repository,
};
pub use translate::FilterTranslator;
