//! In-memory storage engine.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::config::RepositoryConfig;
use crate::core::{
    EntityPredicate, FilterTranslator, FilterableRepository, PageableRepository,
    QueryableRepository, Repository,
};
use crate::error::{BackendError, BatchError, FilterError, RepositoryResult, ResourceError};
use crate::key::{KeyGenerator, KeyResolver};
use crate::schema::Entity;
use crate::types::{Filter, PageRequest, PageResult, SortRule};

use super::entry::TrackedEntry;
use super::translate::{MemoryPredicate, MemoryTranslator, SortPlan};

const BACKEND_NAME: &str = "memory";

/// Reference storage engine over an ordered in-process map.
///
/// Entries are kept in key order, which is also the result order when no
/// sort rules are given. Each operation holds the map lock for its whole
/// duration and has no await point, so operations are individually atomic;
/// sequences of operations are not.
///
/// State lives only as long as the repository.
pub struct InMemoryRepository<E: Entity> {
    entries: RwLock<BTreeMap<E::Key, TrackedEntry<E>>>,
    resolver: KeyResolver<E>,
    disposed: AtomicBool,
}

impl<E: Entity> InMemoryRepository<E> {
    /// Creates an empty repository with random key generation.
    pub fn new() -> Self {
        Self::with_config(&RepositoryConfig::default())
    }

    /// Creates an empty repository using the configured key strategy.
    pub fn with_config(config: &RepositoryConfig) -> Self {
        Self::with_key_generator(config.key_generator::<E::Key>())
    }

    /// Creates an empty repository with a custom key generator.
    pub fn with_key_generator(generator: Arc<dyn KeyGenerator<E::Key>>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            resolver: KeyResolver::with_generator(generator),
            disposed: AtomicBool::new(false),
        }
    }

    /// The key resolver used by this repository.
    pub fn resolver(&self) -> &KeyResolver<E> {
        &self.resolver
    }

    /// Drops all entries. Every later operation fails with [`BackendError::Disposed`].
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            let dropped = {
                let mut entries = self.entries.write();
                let count = entries.len();
                entries.clear();
                count
            };
            debug!(entity = E::entity_name(), dropped, "Disposed in-memory repository");
        }
    }

    /// Returns true once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the snapshot replaced by the most recent update, or the
    /// entity as added if it was never updated.
    pub async fn find_original(&self, key: &E::Key) -> RepositoryResult<Option<E>> {
        self.ensure_active()?;
        Ok(self
            .entries
            .read()
            .get(key)
            .map(|entry| entry.original.clone()))
    }

    fn ensure_active(&self) -> RepositoryResult<()> {
        if self.is_disposed() {
            return Err(BackendError::Disposed {
                backend: BACKEND_NAME,
            }
            .into());
        }
        Ok(())
    }

    fn select(
        &self,
        predicate: &EntityPredicate<E>,
        sort: &[SortRule],
    ) -> RepositoryResult<Vec<E>> {
        let order = self.to_native_order(sort)?;
        let entries = self.entries.read();
        let mut matched: Vec<&E> = entries
            .values()
            .map(|entry| &entry.current)
            .filter(|entity| predicate(*entity))
            .collect();
        order.apply(&mut matched);
        Ok(matched.into_iter().cloned().collect())
    }
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> fmt::Debug for InMemoryRepository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("entity", &E::entity_name())
            .field("len", &self.entries.read().len())
            .field("disposed", &self.is_disposed())
            .field("strategy", &self.resolver.strategy())
            .finish_non_exhaustive()
    }
}

impl<E: Entity> FilterTranslator<E> for InMemoryRepository<E> {
    type NativePredicate = MemoryPredicate<E>;
    type NativeOrder = SortPlan;

    fn to_native_predicate(&self, filter: &Filter) -> Result<MemoryPredicate<E>, FilterError> {
        filter.accept(&MemoryTranslator::<E>::new(self.resolver.schema()))
    }

    fn to_native_order(&self, sort: &[SortRule]) -> Result<SortPlan, FilterError> {
        SortPlan::resolve::<E>(self.resolver.schema(), sort)
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn add(&self, mut entity: E) -> RepositoryResult<E::Key> {
        self.ensure_active()?;
        let key = self.resolver.ensure_key(&mut entity)?;

        let mut entries = self.entries.write();
        match entries.entry(key.clone()) {
            Entry::Occupied(_) => Err(ResourceError::DuplicateKey {
                entity: E::entity_name(),
                key: key.to_string(),
            }
            .into()),
            Entry::Vacant(slot) => {
                slot.insert(TrackedEntry::new(entity));
                debug!(entity = E::entity_name(), key = %key, "Added entity");
                Ok(key)
            }
        }
    }

    async fn remove(&self, entity: &E) -> RepositoryResult<bool> {
        self.ensure_active()?;
        match self.resolver.resolve_key(entity)? {
            Some(key) => self.remove_by_key(&key).await,
            None => Ok(false),
        }
    }

    async fn remove_by_key(&self, key: &E::Key) -> RepositoryResult<bool> {
        self.ensure_active()?;
        let removed = self.entries.write().remove(key).is_some();
        debug!(entity = E::entity_name(), key = %key, removed, "Removed entity");
        Ok(removed)
    }

    async fn remove_range(&self, entities: &[E]) -> RepositoryResult<()> {
        self.ensure_active()?;
        let keys = entities
            .iter()
            .map(|entity| self.resolver.resolve_key(entity))
            .collect::<Result<Vec<_>, _>>()?;

        let mut map = self.entries.write();
        for (index, key) in keys.iter().enumerate() {
            match key {
                Some(key) if map.contains_key(key) => {}
                other => {
                    return Err(BatchError::RemoveAborted {
                        entity: E::entity_name(),
                        index,
                        key: other.as_ref().map(ToString::to_string),
                    }
                    .into());
                }
            }
        }

        for key in keys.iter().flatten() {
            map.remove(key);
        }
        debug!(entity = E::entity_name(), count = keys.len(), "Removed entity batch");
        Ok(())
    }

    async fn update(&self, entity: E) -> RepositoryResult<bool> {
        self.ensure_active()?;
        let Some(key) = self.resolver.resolve_key(&entity)? else {
            return Ok(false);
        };

        let mut entries = self.entries.write();
        match entries.get_mut(&key) {
            Some(tracked) => {
                tracked.replace(entity);
                debug!(entity = E::entity_name(), key = %key, "Updated entity");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find(&self, key: &E::Key) -> RepositoryResult<Option<E>> {
        self.ensure_active()?;
        Ok(self.entries.read().get(key).map(|entry| entry.current.clone()))
    }

    fn as_filterable(&self) -> Option<&dyn FilterableRepository<E>> {
        Some(self)
    }

    fn as_pageable(&self) -> Option<&dyn PageableRepository<E>> {
        Some(self)
    }

    fn as_queryable(&self) -> Option<&dyn QueryableRepository<E>> {
        Some(self)
    }
}

#[async_trait]
impl<E: Entity> FilterableRepository<E> for InMemoryRepository<E> {
    async fn find_first(&self, filter: &Filter, sort: &[SortRule]) -> RepositoryResult<Option<E>> {
        self.ensure_active()?;
        let predicate = self.to_native_predicate(filter)?;
        let order = self.to_native_order(sort)?;

        let entries = self.entries.read();
        let mut matched = entries
            .values()
            .map(|entry| &entry.current)
            .filter(|entity| predicate(*entity));
        let first = if order.is_empty() {
            matched.next()
        } else {
            matched.min_by(|a, b| order.compare(*a, *b))
        };
        Ok(first.cloned())
    }

    async fn find_all(&self, filter: &Filter, sort: &[SortRule]) -> RepositoryResult<Vec<E>> {
        self.ensure_active()?;
        let predicate = self.to_native_predicate(filter)?;
        let found = self.select(&predicate, sort)?;
        trace!(
            entity = E::entity_name(),
            filter = %filter,
            found = found.len(),
            "Evaluated filter"
        );
        Ok(found)
    }

    async fn exists(&self, filter: &Filter) -> RepositoryResult<bool> {
        self.ensure_active()?;
        let predicate = self.to_native_predicate(filter)?;
        Ok(self
            .entries
            .read()
            .values()
            .any(|entry| predicate(&entry.current)))
    }

    async fn count(&self, filter: &Filter) -> RepositoryResult<u64> {
        self.ensure_active()?;
        let predicate = self.to_native_predicate(filter)?;
        let count = self
            .entries
            .read()
            .values()
            .filter(|entry| predicate(&entry.current))
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl<E: Entity> PageableRepository<E> for InMemoryRepository<E> {
    async fn page(&self, request: &PageRequest) -> RepositoryResult<PageResult<E>> {
        self.ensure_active()?;
        let predicate = self.to_native_predicate(request.filter())?;
        let order = self.to_native_order(request.sort())?;

        let (total, items) = {
            let entries = self.entries.read();
            let mut matched: Vec<&E> = entries
                .values()
                .map(|entry| &entry.current)
                .filter(|entity| predicate(*entity))
                .collect();
            let total = matched.len() as u64;
            order.apply(&mut matched);

            let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
            let items: Vec<E> = matched
                .into_iter()
                .skip(offset)
                .take(request.page_size() as usize)
                .cloned()
                .collect();
            (total, items)
        };

        trace!(
            entity = E::entity_name(),
            page = request.page_number(),
            size = request.page_size(),
            total,
            returned = items.len(),
            "Paged entities"
        );
        Ok(PageResult::new(request.clone(), total, items))
    }
}

#[async_trait]
impl<E: Entity> QueryableRepository<E> for InMemoryRepository<E> {
    async fn query_with(
        &self,
        predicate: &EntityPredicate<E>,
        sort: &[SortRule],
    ) -> RepositoryResult<Vec<E>> {
        self.ensure_active()?;
        self.select(predicate, sort)
    }
}
