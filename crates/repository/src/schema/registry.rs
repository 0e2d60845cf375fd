//! Process-wide cache of entity schemas.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use super::accessor::FieldAccessor;
use super::entity::{Entity, EntitySchema, EntitySchemaBuilder};

type SchemaMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

static SCHEMAS: LazyLock<RwLock<SchemaMap>> = LazyLock::new(|| RwLock::new(HashMap::new()));

/// Returns the schema for `E`, running [`Entity::describe`] on first use only.
///
/// A schema that lacks an identity field is cached as-is; the resulting
/// configuration error is reported on every use without re-running discovery.
/// `describe` must not itself call `schema_of`.
pub fn schema_of<E: Entity>() -> Arc<EntitySchema<E>> {
    if let Some(schema) = lookup::<E>(&SCHEMAS.read()) {
        return schema;
    }

    let mut schemas = SCHEMAS.write();
    // Another thread may have discovered it while we waited for the lock.
    if let Some(schema) = lookup::<E>(&schemas) {
        return schema;
    }
    let schema = Arc::new(build::<E>());
    schemas.insert(TypeId::of::<E>(), schema.clone());
    schema
}

/// Looks up a named field accessor of `E`.
pub fn field_accessor<E: Entity>(name: &str) -> Option<FieldAccessor> {
    schema_of::<E>().field(name).cloned()
}

fn lookup<E: Entity>(schemas: &SchemaMap) -> Option<Arc<EntitySchema<E>>> {
    schemas.get(&TypeId::of::<E>())?.clone().downcast().ok()
}

fn build<E: Entity>() -> EntitySchema<E> {
    let mut builder = EntitySchemaBuilder::new();
    E::describe(&mut builder);
    let schema = builder.build();
    debug!(
        entity = schema.entity_name(),
        fields = schema.field_names().count(),
        has_key = schema.key_field().is_ok(),
        "Discovered entity schema"
    );
    schema
}
