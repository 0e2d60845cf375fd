//! Key generation strategies.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::error::ConfigurationError;

use super::value::EntityKey;

/// Produces fresh keys for entities added without one.
pub trait KeyGenerator<K: EntityKey>: Send + Sync {
    /// Name of the strategy, used in errors.
    fn strategy(&self) -> &'static str;

    /// Returns the next key.
    ///
    /// Fails with [`ConfigurationError::UnsupportedKeyType`] when the strategy
    /// cannot produce `K`.
    fn next_key(&self) -> Result<K, ConfigurationError>;
}

/// Random 128-bit (v4) identifiers, as a UUID or its hyphenated string form.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomKeyGenerator;

impl<K: EntityKey> KeyGenerator<K> for RandomKeyGenerator {
    fn strategy(&self) -> &'static str {
        "random"
    }

    fn next_key(&self) -> Result<K, ConfigurationError> {
        K::from_random(Uuid::new_v4()).ok_or(ConfigurationError::UnsupportedKeyType {
            key_type: K::key_type(),
            strategy: "random",
        })
    }
}

/// Monotonic sequence numbers for integer (or string) keys.
#[derive(Debug)]
pub struct SequentialKeyGenerator {
    next: AtomicU64,
}

impl SequentialKeyGenerator {
    /// Creates a generator whose first key is `start`.
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl Default for SequentialKeyGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<K: EntityKey> KeyGenerator<K> for SequentialKeyGenerator {
    fn strategy(&self) -> &'static str {
        "sequential"
    }

    fn next_key(&self) -> Result<K, ConfigurationError> {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        K::from_sequence(n).ok_or(ConfigurationError::UnsupportedKeyType {
            key_type: K::key_type(),
            strategy: "sequential",
        })
    }
}
