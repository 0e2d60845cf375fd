//! Tracked entries.

/// A stored entity together with its previous snapshot.
#[derive(Debug, Clone)]
pub(crate) struct TrackedEntry<E> {
    pub(crate) current: E,
    pub(crate) original: E,
}

impl<E: Clone> TrackedEntry<E> {
    /// Starts tracking a freshly added entity.
    pub(crate) fn new(entity: E) -> Self {
        Self {
            original: entity.clone(),
            current: entity,
        }
    }

    /// Replaces the current snapshot; the replaced value becomes the original.
    pub(crate) fn replace(&mut self, entity: E) {
        self.original = std::mem::replace(&mut self.current, entity);
    }
}
