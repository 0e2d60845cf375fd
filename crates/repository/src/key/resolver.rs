//! Per-entity-type key resolution.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::{ConfigurationError, KeyError};
use crate::schema::{Entity, EntitySchema, schema_of};

use super::generator::{KeyGenerator, RandomKeyGenerator};
use super::value::{EntityKey, KeyValue};

/// Reads, generates, assigns and coerces the keys of entity type `E`.
///
/// The entity's schema is looked up once on first use and then held by the
/// resolver.
pub struct KeyResolver<E: Entity> {
    schema: OnceLock<Arc<EntitySchema<E>>>,
    generator: Arc<dyn KeyGenerator<E::Key>>,
}

impl<E: Entity> KeyResolver<E> {
    /// Creates a resolver that generates random keys.
    pub fn new() -> Self {
        Self::with_generator(Arc::new(RandomKeyGenerator))
    }

    /// Creates a resolver with a custom key generator.
    pub fn with_generator(generator: Arc<dyn KeyGenerator<E::Key>>) -> Self {
        Self {
            schema: OnceLock::new(),
            generator,
        }
    }

    /// Returns the entity schema, discovering it on first use.
    pub fn schema(&self) -> &Arc<EntitySchema<E>> {
        self.schema.get_or_init(schema_of::<E>)
    }

    /// Returns the name of the identity field.
    pub fn key_field_name(&self) -> Result<&str, ConfigurationError> {
        Ok(self.schema().key_field()?.name())
    }

    /// Returns the entity's current key, or `None` if none was assigned.
    pub fn resolve_key(&self, entity: &E) -> Result<Option<E::Key>, ConfigurationError> {
        Ok(self.schema().key_field()?.get(entity))
    }

    /// Produces a fresh key from the configured generator.
    pub fn generate_key(&self) -> Result<E::Key, ConfigurationError> {
        self.generator.next_key()
    }

    /// Writes `key` into the entity's identity field.
    pub fn assign_key(&self, entity: &mut E, key: E::Key) -> Result<(), ConfigurationError> {
        self.schema().key_field()?.set(entity, key);
        Ok(())
    }

    /// Returns the entity's key, generating and assigning one if absent.
    pub fn ensure_key(&self, entity: &mut E) -> Result<E::Key, ConfigurationError> {
        let field = self.schema().key_field()?;
        if let Some(key) = field.get(entity) {
            return Ok(key);
        }
        let key = self.generator.next_key()?;
        field.set(entity, key.clone());
        Ok(key)
    }

    /// Converts a loosely-typed key into `E::Key`.
    pub fn coerce_key(&self, raw: impl Into<KeyValue>) -> Result<E::Key, KeyError> {
        E::Key::coerce(raw.into())
    }

    /// Name of the configured generation strategy.
    pub fn strategy(&self) -> &'static str {
        self.generator.strategy()
    }
}

impl<E: Entity> Default for KeyResolver<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Clone for KeyResolver<E> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            generator: Arc::clone(&self.generator),
        }
    }
}

impl<E: Entity> fmt::Debug for KeyResolver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyResolver")
            .field("entity", &E::entity_name())
            .field("strategy", &self.generator.strategy())
            .finish()
    }
}
