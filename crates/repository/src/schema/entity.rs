//! The `Entity` trait and per-type schema.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ConfigurationError, FilterError};
use crate::key::EntityKey;
use crate::types::FieldRef;

use super::accessor::FieldAccessor;
use super::value::FieldValue;

/// A value type that can be stored in a repository.
///
/// Implementors describe their identity field and queryable fields once in
/// [`Entity::describe`]. The description is collected on first use and cached
/// for the lifetime of the process.
///
/// # Examples
///
/// ```
/// use helios_repository::schema::{Entity, EntitySchemaBuilder, FieldValue};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Product {
///     sku: Option<String>,
///     price: i64,
/// }
///
/// impl Entity for Product {
///     type Key = String;
///
///     fn entity_name() -> &'static str {
///         "Product"
///     }
///
///     fn describe(schema: &mut EntitySchemaBuilder<Self>) {
///         schema
///             .key("sku", |p| p.sku.clone(), |p, sku| p.sku = Some(sku))
///             .field("price", |p| FieldValue::from(p.price));
///     }
/// }
/// ```
pub trait Entity: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The entity's identity type.
    type Key: EntityKey;

    /// Short name of the entity type, used in errors, logs and cache keys.
    fn entity_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Registers the identity field and the fields usable in filters and sorts.
    fn describe(schema: &mut EntitySchemaBuilder<Self>);
}

type KeyGetter<E> = dyn Fn(&E) -> Option<<E as Entity>::Key> + Send + Sync;
type KeySetter<E> = dyn Fn(&mut E, <E as Entity>::Key) + Send + Sync;

/// The identity field of an entity type.
pub struct KeyField<E: Entity> {
    name: Arc<str>,
    get: Arc<KeyGetter<E>>,
    set: Arc<KeySetter<E>>,
}

impl<E: Entity> KeyField<E> {
    /// Returns the identity field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads the current key, if one was assigned.
    pub fn get(&self, entity: &E) -> Option<E::Key> {
        (self.get)(entity)
    }

    /// Writes `key` into the identity field.
    pub fn set(&self, entity: &mut E, key: E::Key) {
        (self.set)(entity, key)
    }
}

impl<E: Entity> fmt::Debug for KeyField<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyField").field("name", &self.name).finish()
    }
}

/// Collects an entity type's field registrations.
pub struct EntitySchemaBuilder<E: Entity> {
    key: Option<KeyField<E>>,
    fields: HashMap<String, FieldAccessor>,
}

impl<E: Entity> EntitySchemaBuilder<E> {
    pub(crate) fn new() -> Self {
        Self {
            key: None,
            fields: HashMap::new(),
        }
    }

    /// Registers the identity field.
    ///
    /// The key is also registered as an ordinary field under the same name so
    /// filters and sort rules can reference it. Registering a second key
    /// replaces the first; composite keys are not supported.
    pub fn key<G, S>(&mut self, name: &str, get: G, set: S) -> &mut Self
    where
        G: Fn(&E) -> Option<E::Key> + Send + Sync + 'static,
        S: Fn(&mut E, E::Key) + Send + Sync + 'static,
    {
        let get: Arc<KeyGetter<E>> = Arc::new(get);
        let read = Arc::clone(&get);
        self.fields.insert(
            name.to_ascii_lowercase(),
            FieldAccessor::new(name, move |entity: &E| {
                read(entity).map_or(FieldValue::Null, |key| key.to_field_value())
            }),
        );
        self.key = Some(KeyField {
            name: name.into(),
            get,
            set: Arc::new(set),
        });
        self
    }

    /// Registers a queryable field. Names are matched case-insensitively.
    pub fn field<F>(&mut self, name: &str, read: F) -> &mut Self
    where
        F: Fn(&E) -> FieldValue + Send + Sync + 'static,
    {
        self.fields
            .insert(name.to_ascii_lowercase(), FieldAccessor::new(name, read));
        self
    }

    pub(crate) fn build(self) -> EntitySchema<E> {
        EntitySchema {
            entity_name: E::entity_name(),
            key: self.key,
            fields: self.fields,
        }
    }
}

/// The discovered description of an entity type.
///
/// Obtained through [`schema_of`](super::schema_of); never rebuilt once cached.
pub struct EntitySchema<E: Entity> {
    entity_name: &'static str,
    key: Option<KeyField<E>>,
    fields: HashMap<String, FieldAccessor>,
}

impl<E: Entity> EntitySchema<E> {
    /// Returns the entity type's short name.
    pub fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    /// Returns the identity field, or a configuration error if none was registered.
    pub fn key_field(&self) -> Result<&KeyField<E>, ConfigurationError> {
        self.key.as_ref().ok_or(ConfigurationError::NoIdentityField {
            entity: self.entity_name,
        })
    }

    /// Looks up a field accessor by name, ignoring ASCII case.
    pub fn field(&self, name: &str) -> Option<&FieldAccessor> {
        self.fields.get(&name.to_ascii_lowercase())
    }

    /// Iterates over the registered field names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.values().map(FieldAccessor::name)
    }

    /// Resolves a field reference to an accessor usable against `E`.
    ///
    /// Accessors built for another entity type and names with no registered
    /// mapping are rejected.
    pub fn resolve(&self, field: &FieldRef) -> Result<FieldAccessor, FilterError> {
        match field {
            FieldRef::Accessor(accessor) if accessor.is_for::<E>() => Ok(accessor.clone()),
            FieldRef::Accessor(accessor) => Err(FilterError::ForeignAccessor {
                field: accessor.name().to_string(),
                expected: self.entity_name,
                actual: accessor.entity_type_name(),
            }),
            FieldRef::Named(name) => {
                self.field(name)
                    .cloned()
                    .ok_or_else(|| FilterError::UnmappedField {
                        entity: self.entity_name,
                        field: name.clone(),
                    })
            }
        }
    }
}

impl<E: Entity> fmt::Debug for EntitySchema<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySchema")
            .field("entity", &self.entity_name)
            .field("key", &self.key)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}
