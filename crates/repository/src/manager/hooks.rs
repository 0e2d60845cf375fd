//! Pre-write hooks and change detection.

use chrono::{DateTime, Utc};

use crate::schema::Entity;

/// Customizes the manager's write path for one entity type.
pub trait EntityHooks<E: Entity>: Send + Sync {
    /// Runs after validation, before the entity is added.
    fn before_add(&self, _entity: &mut E) {}

    /// Runs after validation, before the entity replaces `existing`.
    fn before_update(&self, _entity: &mut E, _existing: &E) {}

    /// Decides whether an update would change nothing.
    ///
    /// Defaults to structural equality.
    fn is_unchanged(&self, existing: &E, incoming: &E) -> bool {
        existing == incoming
    }
}

/// No-op hooks with structural change detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl<E: Entity> EntityHooks<E> for DefaultHooks {}

/// An entity that records when it was created and last updated.
pub trait Timestamped {
    /// Creation time, if stamped.
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// Sets the creation time.
    fn set_created_at(&mut self, at: DateTime<Utc>);

    /// Sets the last update time.
    fn set_updated_at(&mut self, at: DateTime<Utc>);
}

/// Stamps creation and update times.
///
/// On add both times are set to now. On update the creation time is carried
/// over from the stored entity and the update time is set to now.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampHooks;

impl<E: Entity + Timestamped> EntityHooks<E> for TimestampHooks {
    fn before_add(&self, entity: &mut E) {
        let now = Utc::now();
        entity.set_created_at(now);
        entity.set_updated_at(now);
    }

    fn before_update(&self, entity: &mut E, existing: &E) {
        if let Some(created) = existing.created_at() {
            entity.set_created_at(created);
        }
        entity.set_updated_at(Utc::now());
    }
}
