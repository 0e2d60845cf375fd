//! Typed field accessors.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use super::value::FieldValue;

type ReadFn = dyn Fn(&dyn Any) -> Option<FieldValue> + Send + Sync;

/// A named, typed reader for one field of one entity type.
///
/// An accessor remembers the entity type it was built for, so a filter that
/// carries it can be rejected when translated against a different type.
/// Cloning is cheap.
#[derive(Clone)]
pub struct FieldAccessor {
    name: Arc<str>,
    entity_type: TypeId,
    entity_type_name: &'static str,
    read: Arc<ReadFn>,
}

impl FieldAccessor {
    /// Creates an accessor for field `name` of entity type `E`.
    ///
    /// # Examples
    ///
    /// ```
    /// use helios_repository::schema::{FieldAccessor, FieldValue};
    ///
    /// struct Product {
    ///     price: i64,
    /// }
    ///
    /// let price = FieldAccessor::new("price", |p: &Product| FieldValue::from(p.price));
    /// assert_eq!(price.read(&Product { price: 12 }), Some(FieldValue::Integer(12)));
    /// ```
    pub fn new<E, F>(name: impl Into<Arc<str>>, read: F) -> Self
    where
        E: 'static,
        F: Fn(&E) -> FieldValue + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            entity_type: TypeId::of::<E>(),
            entity_type_name: type_name::<E>(),
            read: Arc::new(move |entity: &dyn Any| entity.downcast_ref::<E>().map(&read)),
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the type name of the entity this accessor was built for.
    pub fn entity_type_name(&self) -> &'static str {
        self.entity_type_name
    }

    /// Returns true if this accessor was built for entity type `E`.
    pub fn is_for<E: 'static>(&self) -> bool {
        self.entity_type == TypeId::of::<E>()
    }

    /// Reads the field from `entity`.
    ///
    /// Returns `None` if `entity` is not of the type this accessor was built for.
    pub fn read<E: 'static>(&self, entity: &E) -> Option<FieldValue> {
        (self.read)(entity)
    }
}

impl fmt::Debug for FieldAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.name)
            .field("entity_type", &self.entity_type_name)
            .finish()
    }
}
