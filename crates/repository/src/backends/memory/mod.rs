//! In-memory reference storage engine.
//!
//! [`InMemoryRepository`] implements every repository capability on its own:
//! key generation, filtering, sorting, paging and snapshot tracking. Other
//! engines delegate the same work to their database.
//!
//! # Example
//!
//! ```
//! use helios_repository::backends::memory::InMemoryRepository;
//! use helios_repository::core::{FilterableRepository, Repository};
//! use helios_repository::schema::{Entity, EntitySchemaBuilder, FieldValue};
//! use helios_repository::types::{Filter, SortRule};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct City {
//!     name: Option<String>,
//!     population: i64,
//! }
//!
//! impl Entity for City {
//!     type Key = String;
//!
//!     fn describe(schema: &mut EntitySchemaBuilder<Self>) {
//!         schema
//!             .key("name", |c| c.name.clone(), |c, n| c.name = Some(n))
//!             .field("population", |c| FieldValue::from(c.population));
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let repo = InMemoryRepository::<City>::new();
//! for (name, population) in [("Oslo", 709_000), ("Bergen", 291_000), ("Lima", 10_000_000)] {
//!     repo.add(City { name: Some(name.into()), population }).await.unwrap();
//! }
//!
//! let small = repo
//!     .find_all(&Filter::lt("population", 1_000_000), &[SortRule::asc("population")])
//!     .await
//!     .unwrap();
//! assert_eq!(small[0].name.as_deref(), Some("Bergen"));
//! # });
//! ```

mod engine;
mod entry;
mod translate;

pub use engine::InMemoryRepository;
pub use translate::{MemoryPredicate, MemoryTranslator, SortPlan};
