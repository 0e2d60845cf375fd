//! Entity description: identity field, queryable fields and their values.
//!
//! Each entity type describes itself once through [`Entity::describe`]. The
//! resulting [`EntitySchema`] is cached per type by [`schema_of`] and drives
//! key resolution and filter/sort translation.

mod accessor;
mod entity;
mod registry;
mod value;

pub use accessor::FieldAccessor;
pub use entity::{Entity, EntitySchema, EntitySchemaBuilder, KeyField};
pub use registry::{field_accessor, schema_of};
pub use value::FieldValue;
