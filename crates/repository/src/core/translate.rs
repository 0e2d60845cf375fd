//! Translation of backend-neutral queries into an engine's native form.

use crate::error::FilterError;
use crate::schema::Entity;
use crate::types::{Filter, SortRule};

/// Converts [`Filter`]s and [`SortRule`]s into a storage engine's native
/// predicate and ordering.
///
/// Translation fails with [`FilterError::ForeignAccessor`] when a filter uses
/// an accessor built for another entity type, and with
/// [`FilterError::UnmappedField`] when it names a field `E` never registered.
pub trait FilterTranslator<E: Entity> {
    /// Native predicate type.
    type NativePredicate;

    /// Native ordering type.
    type NativeOrder;

    /// Translates a filter.
    fn to_native_predicate(&self, filter: &Filter) -> Result<Self::NativePredicate, FilterError>;

    /// Translates a list of sort rules.
    fn to_native_order(&self, sort: &[SortRule]) -> Result<Self::NativeOrder, FilterError>;
}
