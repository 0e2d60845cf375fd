//! Read-through entity caching.
//!
//! The manager reads through an [`EntityCache`] keyed by strings from a
//! [`CacheKeyGenerator`]. [`MokaEntityCache`] is the bundled implementation.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use thiserror::Error;
use tracing::{trace, warn};

use crate::config::CacheConfig;
use crate::error::{BackendError, RepositoryError, RepositoryResult};
use crate::schema::Entity;

/// A cache operation failed.
#[derive(Error, Debug)]
#[error("cache {operation} failed: {message}")]
pub struct CacheError {
    /// The failing operation, e.g. `get`.
    pub operation: &'static str,
    /// What went wrong.
    pub message: String,
}

impl CacheError {
    /// Creates a cache error.
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Storage lookup run on a cache miss.
pub type FetchFuture<'a, E> =
    Pin<Box<dyn Future<Output = RepositoryResult<Option<E>>> + Send + 'a>>;

/// Failure of a read-through lookup.
#[derive(Error, Debug)]
pub enum ReadThroughError {
    /// The cache failed before storage was consulted.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The storage lookup failed.
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// An async entity cache.
#[async_trait]
pub trait EntityCache<E: Entity>: Send + Sync {
    /// Returns the cached entity, if any.
    async fn get(&self, key: &str) -> Result<Option<E>, CacheError>;

    /// Stores an entity.
    async fn insert(&self, key: String, entity: E) -> Result<(), CacheError>;

    /// Drops an entry.
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// Returns the cached entity or runs `fetch` and caches what it finds.
    ///
    /// Absent entities are not cached. A failure to store the fetched entity
    /// is logged and does not fail the lookup.
    async fn get_or_fetch<'a>(
        &self,
        key: &str,
        fetch: FetchFuture<'a, E>,
    ) -> Result<Option<E>, ReadThroughError> {
        if let Some(hit) = self.get(key).await? {
            trace!(key, "Cache hit");
            return Ok(Some(hit));
        }
        trace!(key, "Cache miss");

        let fetched = fetch.await?;
        if let Some(entity) = &fetched
            && let Err(e) = self.insert(key.to_string(), entity.clone()).await
        {
            warn!(key, error = %e, "Failed to cache fetched entity");
        }
        Ok(fetched)
    }
}

enum Miss {
    Absent,
    Storage(RepositoryError),
}

/// In-process cache bounded by entry count with a time-to-live.
///
/// Concurrent misses on one key run a single fetch.
pub struct MokaEntityCache<E: Entity> {
    cache: Cache<String, E>,
}

impl<E: Entity> MokaEntityCache<E> {
    /// Builds a cache sized and aged by `config`.
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl())
            .build();
        Self { cache }
    }

    /// Approximate number of entries. Pending maintenance may lag behind.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Applies pending evictions so counts are exact.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

#[async_trait]
impl<E: Entity> EntityCache<E> for MokaEntityCache<E> {
    async fn get(&self, key: &str) -> Result<Option<E>, CacheError> {
        Ok(self.cache.get(key).await)
    }

    async fn insert(&self, key: String, entity: E) -> Result<(), CacheError> {
        self.cache.insert(key, entity).await;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn get_or_fetch<'a>(
        &self,
        key: &str,
        fetch: FetchFuture<'a, E>,
    ) -> Result<Option<E>, ReadThroughError> {
        let loaded = self
            .cache
            .try_get_with(key.to_string(), async move {
                trace!(key, "Cache miss");
                match fetch.await {
                    Ok(Some(entity)) => Ok(entity),
                    Ok(None) => Err(Miss::Absent),
                    Err(e) => Err(Miss::Storage(e)),
                }
            })
            .await;

        match loaded {
            Ok(entity) => Ok(Some(entity)),
            Err(miss) => match Arc::try_unwrap(miss) {
                Ok(Miss::Absent) => Ok(None),
                Ok(Miss::Storage(e)) => Err(ReadThroughError::Storage(e)),
                // Another waiter holds the shared error; report it by message.
                Err(shared) => match shared.as_ref() {
                    Miss::Absent => Ok(None),
                    Miss::Storage(e) => Err(ReadThroughError::Storage(
                        BackendError::Internal {
                            backend: "cache",
                            message: e.to_string(),
                            source: None,
                        }
                        .into(),
                    )),
                },
            },
        }
    }
}

impl<E: Entity> fmt::Debug for MokaEntityCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MokaEntityCache")
            .field("entries", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

/// Derives cache keys for entities.
pub trait CacheKeyGenerator<E: Entity>: Send + Sync {
    /// The cache key for an entity key.
    fn cache_key(&self, key: &E::Key) -> String;

    /// Every cache key that may hold `entity`. All are evicted on removal.
    fn cache_keys_for(&self, _entity: &E, key: &E::Key) -> Vec<String> {
        vec![self.cache_key(key)]
    }
}

/// Produces `"{entity name in lowercase}:{key}"`.
pub struct DefaultCacheKeyGenerator<E> {
    _entity: PhantomData<fn() -> E>,
}

impl<E> DefaultCacheKeyGenerator<E> {
    /// Creates the generator.
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<E> Default for DefaultCacheKeyGenerator<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for DefaultCacheKeyGenerator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultCacheKeyGenerator")
    }
}

impl<E: Entity> CacheKeyGenerator<E> for DefaultCacheKeyGenerator<E> {
    fn cache_key(&self, key: &E::Key) -> String {
        format!("{}:{}", E::entity_name().to_lowercase(), key)
    }
}
