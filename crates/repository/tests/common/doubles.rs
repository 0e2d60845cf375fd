//! Test doubles around the in-memory engine and the cache.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use helios_repository::backends::memory::InMemoryRepository;
use helios_repository::core::{
    FilterableRepository, PageableRepository, QueryableRepository, Repository,
};
use helios_repository::error::{BackendError, RepositoryError, RepositoryResult};
use helios_repository::manager::{CacheError, EntityCache};
use helios_repository::schema::Entity;

/// Wraps an [`InMemoryRepository`], counting calls and injecting failures.
pub struct CountingRepository<E: Entity> {
    pub inner: InMemoryRepository<E>,
    pub finds: AtomicUsize,
    pub adds: AtomicUsize,
    pub updates: AtomicUsize,
    pub removes: AtomicUsize,
    failing: AtomicBool,
    queries: bool,
}

impl<E: Entity> CountingRepository<E> {
    /// Exposes every capability of the inner engine.
    pub fn new(inner: InMemoryRepository<E>) -> Self {
        Self {
            inner,
            finds: AtomicUsize::new(0),
            adds: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            queries: true,
        }
    }

    /// Hides the filtering, paging and query capabilities.
    pub fn crud_only(inner: InMemoryRepository<E>) -> Self {
        Self {
            queries: false,
            ..Self::new(inner)
        }
    }

    /// Makes every later call fail.
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn find_count(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
            + self.updates.load(Ordering::SeqCst)
            + self.removes.load(Ordering::SeqCst)
    }

    fn check(&self) -> RepositoryResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend(BackendError::Internal {
                backend: "counting",
                message: "injected failure".to_string(),
                source: None,
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for CountingRepository<E> {
    fn backend_name(&self) -> &'static str {
        "counting"
    }

    async fn add(&self, entity: E) -> RepositoryResult<E::Key> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.add(entity).await
    }

    async fn remove(&self, entity: &E) -> RepositoryResult<bool> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.remove(entity).await
    }

    async fn remove_by_key(&self, key: &E::Key) -> RepositoryResult<bool> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.remove_by_key(key).await
    }

    async fn remove_range(&self, entities: &[E]) -> RepositoryResult<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.remove_range(entities).await
    }

    async fn update(&self, entity: E) -> RepositoryResult<bool> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.update(entity).await
    }

    async fn find(&self, key: &E::Key) -> RepositoryResult<Option<E>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.find(key).await
    }

    fn as_filterable(&self) -> Option<&dyn FilterableRepository<E>> {
        if self.queries { self.inner.as_filterable() } else { None }
    }

    fn as_pageable(&self) -> Option<&dyn PageableRepository<E>> {
        if self.queries { self.inner.as_pageable() } else { None }
    }

    fn as_queryable(&self) -> Option<&dyn QueryableRepository<E>> {
        if self.queries { self.inner.as_queryable() } else { None }
    }
}

/// A cache whose reads and writes always fail.
#[derive(Default)]
pub struct FailingCache {
    pub invalidations: AtomicUsize,
}

impl FailingCache {
    pub fn invalidation_count(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<E: Entity> EntityCache<E> for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<E>, CacheError> {
        Err(CacheError::new("get", "cache offline"))
    }

    async fn insert(&self, _key: String, _entity: E) -> Result<(), CacheError> {
        Err(CacheError::new("insert", "cache offline"))
    }

    async fn invalidate(&self, _key: &str) -> Result<(), CacheError> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
