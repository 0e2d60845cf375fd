//! The entity manager.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use crate::config::ManagerConfig;
use crate::core::{
    Capability, EntityPredicate, FilterableRepository, PageableRepository, QueryableRepository,
    Repository, RepositoryCapabilities,
};
use crate::error::{ConfigurationError, RepositoryError, RepositoryResult};
use crate::key::{KeyResolver, KeyValue};
use crate::schema::Entity;
use crate::types::{Filter, PageRequest, PageResult, SortRule};

use super::cache::{
    CacheKeyGenerator, DefaultCacheKeyGenerator, EntityCache, MokaEntityCache, ReadThroughError,
};
use super::hooks::{DefaultHooks, EntityHooks};
use super::result::{ManagerError, ManagerResult, OperationError, OperationResult};
use super::validation::{ValidationResult, Validator};

/// Validated, cached CRUD over a storage engine.
///
/// Mutations never return `Err`. Validation failures, missing entities and
/// unexpected storage errors all come back as [`OperationResult::Failed`]
/// with an [`ErrorCode`](super::ErrorCode). Lookups and queries return
/// [`ManagerResult`].
///
/// Key lookups read through the cache when one is configured. Cache failures
/// are logged and fall back to storage.
pub struct EntityManager<E: Entity> {
    storage: Arc<dyn Repository<E>>,
    resolver: KeyResolver<E>,
    validator: Option<Arc<dyn Validator<E>>>,
    cache: Option<Arc<dyn EntityCache<E>>>,
    cache_keys: Arc<dyn CacheKeyGenerator<E>>,
    hooks: Arc<dyn EntityHooks<E>>,
    config: ManagerConfig,
}

impl<E: Entity> EntityManager<E> {
    /// Creates a manager with default configuration and no validator.
    pub fn new(storage: Arc<dyn Repository<E>>) -> Self {
        Self {
            storage,
            resolver: KeyResolver::new(),
            validator: None,
            cache: None,
            cache_keys: Arc::new(DefaultCacheKeyGenerator::new()),
            hooks: Arc::new(DefaultHooks),
            config: ManagerConfig::default(),
        }
    }

    /// Starts building a manager over `storage`.
    pub fn builder(storage: Arc<dyn Repository<E>>) -> EntityManagerBuilder<E> {
        EntityManagerBuilder::new(storage)
    }

    /// The underlying storage engine.
    pub fn storage(&self) -> &Arc<dyn Repository<E>> {
        &self.storage
    }

    /// The manager configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Capabilities of the underlying storage engine.
    pub fn capabilities(&self) -> RepositoryCapabilities {
        self.storage.capabilities()
    }

    /// Returns true if a cache is in use.
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Validates and adds an entity.
    ///
    /// The returned entity carries its key and any changes made by the
    /// add hook.
    #[instrument(skip(self, entity), fields(entity_type = E::entity_name()))]
    pub async fn add(&self, mut entity: E) -> OperationResult<E> {
        let validation = self.validate(&entity).await;
        if !validation.is_valid() {
            debug!(errors = validation.errors().count(), "Rejected invalid entity");
            return OperationResult::Failed(OperationError::not_valid(validation));
        }

        self.hooks.before_add(&mut entity);

        let key = match self.storage.add(entity.clone()).await {
            Ok(key) => key,
            Err(e) => return self.unexpected("add", e),
        };
        if let Err(e) = self.resolver.assign_key(&mut entity, key.clone()) {
            return self.unexpected("add", e.into());
        }

        self.cache_store(&key, &entity).await;
        debug!(key = %key, "Added entity");
        OperationResult::Success(entity)
    }

    /// Validates and stores changes to an existing entity.
    ///
    /// Returns [`OperationResult::NotModified`] without validating or writing
    /// when the entity equals the stored one.
    #[instrument(skip(self, entity), fields(entity_type = E::entity_name()))]
    pub async fn update(&self, mut entity: E) -> OperationResult<E> {
        let key = match self.key_of(&entity) {
            Ok(key) => key,
            Err(failed) => return failed,
        };

        let existing = match self.read_through(&key).await {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                return OperationResult::Failed(OperationError::not_found(E::entity_name(), &key));
            }
            Err(e) => return self.unexpected("update", e),
        };

        if self.hooks.is_unchanged(&existing, &entity) {
            debug!(key = %key, "Entity unchanged");
            return OperationResult::NotModified;
        }

        let validation = self.validate(&entity).await;
        if !validation.is_valid() {
            debug!(errors = validation.errors().count(), "Rejected invalid entity");
            return OperationResult::Failed(OperationError::not_valid(validation));
        }

        self.hooks.before_update(&mut entity, &existing);

        match self.storage.update(entity.clone()).await {
            Ok(true) => {
                self.cache_store(&key, &entity).await;
                debug!(key = %key, "Updated entity");
                OperationResult::Success(entity)
            }
            Ok(false) => {
                // Removed between the lookup and the write.
                self.evict(&existing, &key).await;
                OperationResult::NotModified
            }
            Err(e) => {
                self.evict(&existing, &key).await;
                self.unexpected("update", e)
            }
        }
    }

    /// Removes an entity by the key it carries.
    #[instrument(skip(self, entity), fields(entity_type = E::entity_name()))]
    pub async fn remove(&self, entity: &E) -> OperationResult<()> {
        match self.key_of(entity) {
            Ok(key) => self.remove_by_key(&key).await,
            Err(failed) => failed,
        }
    }

    /// Removes the entity stored under `key` and evicts its cache entries.
    #[instrument(skip(self), fields(entity_type = E::entity_name()))]
    pub async fn remove_by_key(&self, key: &E::Key) -> OperationResult<()> {
        let existing = match self.read_through(key).await {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                return OperationResult::Failed(OperationError::not_found(E::entity_name(), key));
            }
            Err(e) => return self.unexpected("remove", e),
        };

        let removed = self.storage.remove_by_key(key).await;
        self.evict(&existing, key).await;
        match removed {
            Ok(true) => {
                debug!(key = %key, "Removed entity");
                OperationResult::Success(())
            }
            Ok(false) => OperationResult::NotModified,
            Err(e) => self.unexpected("remove", e),
        }
    }

    /// Finds an entity by key, reading through the cache.
    #[instrument(skip(self), fields(entity_type = E::entity_name()))]
    pub async fn find_by_key(&self, key: &E::Key) -> ManagerResult<Option<E>> {
        self.read_through(key)
            .await
            .map_err(|source| self.operation_error("find_by_key", source))
    }

    /// Finds an entity by a raw key, converting it to the entity's key type first.
    ///
    /// # Errors
    ///
    /// * `ManagerError::InvalidKey` - If the raw key cannot be converted
    pub async fn find_by_raw_key(&self, raw: impl Into<KeyValue>) -> ManagerResult<Option<E>> {
        let key = self.resolver.coerce_key(raw)?;
        self.find_by_key(&key).await
    }

    /// Returns the first entity matching `filter` in `sort` order.
    #[instrument(
        skip(self, filter, sort),
        fields(entity_type = E::entity_name(), filter = %filter)
    )]
    pub async fn find_first(
        &self,
        filter: &Filter,
        sort: &[SortRule],
    ) -> ManagerResult<Option<E>> {
        self.filterable()?
            .find_first(filter, sort)
            .await
            .map_err(|source| self.operation_error("find_first", source))
    }

    /// Returns every entity matching `filter` in `sort` order.
    #[instrument(
        skip(self, filter, sort),
        fields(entity_type = E::entity_name(), filter = %filter)
    )]
    pub async fn find_all(
        &self,
        filter: &Filter,
        sort: &[SortRule],
    ) -> ManagerResult<Vec<E>> {
        self.filterable()?
            .find_all(filter, sort)
            .await
            .map_err(|source| self.operation_error("find_all", source))
    }

    /// Returns true if any entity matches `filter`.
    #[instrument(skip(self, filter), fields(entity_type = E::entity_name(), filter = %filter))]
    pub async fn exists(&self, filter: &Filter) -> ManagerResult<bool> {
        self.filterable()?
            .exists(filter)
            .await
            .map_err(|source| self.operation_error("exists", source))
    }

    /// Counts the entities matching `filter`.
    #[instrument(skip(self, filter), fields(entity_type = E::entity_name(), filter = %filter))]
    pub async fn count(&self, filter: &Filter) -> ManagerResult<u64> {
        self.filterable()?
            .count(filter)
            .await
            .map_err(|source| self.operation_error("count", source))
    }

    /// Returns one page of the filtered, sorted entity set.
    #[instrument(
        skip(self, request),
        fields(
            entity_type = E::entity_name(),
            page = request.page_number(),
            size = request.page_size()
        )
    )]
    pub async fn page(&self, request: &PageRequest) -> ManagerResult<PageResult<E>> {
        self.pageable()?
            .page(request)
            .await
            .map_err(|source| self.operation_error("page", source))
    }

    /// Returns every entity for which `predicate` holds.
    #[instrument(skip(self, predicate, sort), fields(entity_type = E::entity_name()))]
    pub async fn query_with(
        &self,
        predicate: &EntityPredicate<E>,
        sort: &[SortRule],
    ) -> ManagerResult<Vec<E>> {
        self.queryable()?
            .query_with(predicate, sort)
            .await
            .map_err(|source| self.operation_error("query_with", source))
    }

    /// Builds a page request with this manager's page size limits and default
    /// sort direction.
    pub fn page_request(
        &self,
        page_number: Option<u32>,
        page_size: Option<u32>,
        sort: Option<&str>,
    ) -> RepositoryResult<PageRequest> {
        self.config.page_request(page_number, page_size, sort)
    }

    fn filterable(&self) -> ManagerResult<&dyn FilterableRepository<E>> {
        self.storage
            .as_filterable()
            .ok_or_else(|| self.not_supported(Capability::Filtering))
    }

    fn pageable(&self) -> ManagerResult<&dyn PageableRepository<E>> {
        self.storage
            .as_pageable()
            .ok_or_else(|| self.not_supported(Capability::Paging))
    }

    fn queryable(&self) -> ManagerResult<&dyn QueryableRepository<E>> {
        self.storage
            .as_queryable()
            .ok_or_else(|| self.not_supported(Capability::Queryable))
    }

    fn not_supported(&self, capability: Capability) -> ManagerError {
        let backend = self.storage.backend_name();
        warn!(%capability, backend, "Capability not supported");
        ManagerError::NotSupported {
            capability,
            backend,
        }
    }

    fn key_of<T>(&self, entity: &E) -> Result<E::Key, OperationResult<T>> {
        match self.resolver.resolve_key(entity) {
            Ok(Some(key)) => Ok(key),
            Ok(None) => Err(OperationResult::Failed(OperationError::invalid(format!(
                "{} has no key",
                E::entity_name()
            )))),
            Err(e) => Err(self.unexpected("resolve_key", e.into())),
        }
    }

    async fn validate(&self, entity: &E) -> ValidationResult {
        match &self.validator {
            Some(validator) => validator.validate(entity).await,
            None => ValidationResult::valid(),
        }
    }

    async fn read_through(&self, key: &E::Key) -> RepositoryResult<Option<E>> {
        let Some(cache) = &self.cache else {
            return self.storage.find(key).await;
        };

        let cache_key = self.cache_keys.cache_key(key);
        match cache.get_or_fetch(&cache_key, self.storage.find(key)).await {
            Ok(found) => Ok(found),
            Err(ReadThroughError::Storage(e)) => Err(e),
            Err(ReadThroughError::Cache(e)) => {
                warn!(key = %cache_key, error = %e, "Cache read failed, reading from storage");
                if let Err(e) = cache.invalidate(&cache_key).await {
                    warn!(key = %cache_key, error = %e, "Failed to evict cache entry");
                }
                self.storage.find(key).await
            }
        }
    }

    async fn cache_store(&self, key: &E::Key, entity: &E) {
        let Some(cache) = &self.cache else {
            return;
        };
        let cache_key = self.cache_keys.cache_key(key);
        if let Err(e) = cache.insert(cache_key.clone(), entity.clone()).await {
            warn!(key = %cache_key, error = %e, "Failed to cache entity");
            if let Err(e) = cache.invalidate(&cache_key).await {
                warn!(key = %cache_key, error = %e, "Failed to evict stale cache entry");
            }
        }
    }

    async fn evict(&self, entity: &E, key: &E::Key) {
        let Some(cache) = &self.cache else {
            return;
        };
        for cache_key in self.cache_keys.cache_keys_for(entity, key) {
            if let Err(e) = cache.invalidate(&cache_key).await {
                warn!(key = %cache_key, error = %e, "Failed to evict cache entry");
            }
        }
    }

    fn unexpected<T>(&self, operation: &'static str, e: RepositoryError) -> OperationResult<T> {
        error!(
            operation,
            entity_type = E::entity_name(),
            backend = self.storage.backend_name(),
            error = %e,
            "Repository operation failed"
        );
        OperationResult::Failed(OperationError::unknown(e.to_string()))
    }

    fn operation_error(&self, operation: &'static str, source: RepositoryError) -> ManagerError {
        error!(
            operation,
            entity_type = E::entity_name(),
            backend = self.storage.backend_name(),
            error = %source,
            "Repository operation failed"
        );
        ManagerError::Operation {
            operation,
            entity: E::entity_name(),
            source,
        }
    }
}

impl<E: Entity> fmt::Debug for EntityManager<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("entity", &E::entity_name())
            .field("backend", &self.storage.backend_name())
            .field("validated", &self.validator.is_some())
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`EntityManager`].
pub struct EntityManagerBuilder<E: Entity> {
    storage: Arc<dyn Repository<E>>,
    validator: Option<Arc<dyn Validator<E>>>,
    cache: Option<Arc<dyn EntityCache<E>>>,
    cache_keys: Option<Arc<dyn CacheKeyGenerator<E>>>,
    hooks: Option<Arc<dyn EntityHooks<E>>>,
    config: ManagerConfig,
}

impl<E: Entity> EntityManagerBuilder<E> {
    /// Starts a builder over `storage`.
    pub fn new(storage: Arc<dyn Repository<E>>) -> Self {
        Self {
            storage,
            validator: None,
            cache: None,
            cache_keys: None,
            hooks: None,
            config: ManagerConfig::default(),
        }
    }

    /// Sets the validator run before adds and updates.
    pub fn validator(mut self, validator: impl Validator<E> + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Sets the cache. Overrides the cache built from configuration.
    pub fn cache(mut self, cache: Arc<dyn EntityCache<E>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the cache key generator.
    pub fn cache_key_generator(mut self, keys: impl CacheKeyGenerator<E> + 'static) -> Self {
        self.cache_keys = Some(Arc::new(keys));
        self
    }

    /// Sets the write hooks.
    pub fn hooks(mut self, hooks: impl EntityHooks<E> + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the manager.
    ///
    /// When no cache was supplied and the configuration enables caching, a
    /// [`MokaEntityCache`] is created.
    ///
    /// # Errors
    ///
    /// * `ConfigurationError::Invalid` - If the configuration fails validation
    pub fn build(self) -> Result<EntityManager<E>, ConfigurationError> {
        self.config
            .validate()
            .map_err(|errors| ConfigurationError::Invalid {
                message: errors.join("; "),
            })?;

        let cache = match self.cache {
            Some(cache) => Some(cache),
            None if self.config.cache.enabled => {
                debug!(
                    entity_type = E::entity_name(),
                    max_entries = self.config.cache.max_entries,
                    ttl_secs = self.config.cache.ttl_secs,
                    "Created entity cache"
                );
                let cache: Arc<dyn EntityCache<E>> =
                    Arc::new(MokaEntityCache::<E>::new(&self.config.cache));
                Some(cache)
            }
            None => None,
        };

        Ok(EntityManager {
            storage: self.storage,
            resolver: KeyResolver::new(),
            validator: self.validator,
            cache,
            cache_keys: self
                .cache_keys
                .unwrap_or_else(|| Arc::new(DefaultCacheKeyGenerator::new())),
            hooks: self.hooks.unwrap_or_else(|| Arc::new(DefaultHooks)),
            config: self.config,
        })
    }
}

impl<E: Entity> fmt::Debug for EntityManagerBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManagerBuilder")
            .field("backend", &self.storage.backend_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::InMemoryRepository;
    use crate::config::CacheConfig;
    use crate::manager::{ErrorCode, RuleValidator};
    use crate::schema::EntitySchemaBuilder;

    #[derive(Debug, Clone, PartialEq)]
    struct Task {
        id: Option<u64>,
        title: String,
        done: bool,
    }

    impl Entity for Task {
        type Key = u64;

        fn describe(schema: &mut EntitySchemaBuilder<Self>) {
            schema
                .key("id", |t| t.id, |t, id| t.id = Some(id))
                .field("title", |t| t.title.as_str().into())
                .field("done", |t| t.done.into());
        }
    }

    fn task(title: &str) -> Task {
        Task {
            id: None,
            title: title.to_string(),
            done: false,
        }
    }

    fn manager() -> EntityManager<Task> {
        let storage = Arc::new(InMemoryRepository::<Task>::with_config(
            &crate::config::RepositoryConfig::sequential(1),
        ));
        EntityManager::<Task>::builder(storage)
            .validator(RuleValidator::new().require("title", "is required", |t: &Task| {
                !t.title.is_empty()
            }))
            .config(ManagerConfig::new().with_cache(CacheConfig::enabled(100)))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_assigns_key() {
        let manager = manager();
        let added = manager.add(task("write docs")).await.into_value().unwrap();
        assert_eq!(added.id, Some(1));
        assert_eq!(manager.find_by_key(&1).await.unwrap(), Some(added));
    }

    #[tokio::test]
    async fn test_invalid_add_is_rejected() {
        let manager = manager();
        let result = manager.add(task("")).await;
        assert_eq!(result.code(), Some(ErrorCode::NotValid));
        assert_eq!(manager.count(&Filter::empty()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let manager = manager();
        let mut added = manager.add(task("a")).await.into_value().unwrap();

        assert!(manager.update(added.clone()).await.is_not_modified());

        added.done = true;
        assert!(manager.update(added.clone()).await.is_success());
        assert_eq!(manager.find_by_key(&1).await.unwrap(), Some(added.clone()));

        assert!(manager.remove(&added).await.is_success());
        assert_eq!(manager.find_by_key(&1).await.unwrap(), None);
        assert_eq!(manager.remove(&added).await.code(), Some(ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn test_unkeyed_update_is_not_valid() {
        let manager = manager();
        assert_eq!(manager.update(task("x")).await.code(), Some(ErrorCode::NotValid));
    }

    #[tokio::test]
    async fn test_raw_key_lookup() {
        let manager = manager();
        manager.add(task("a")).await.into_value().unwrap();
        assert!(manager.find_by_raw_key("1").await.unwrap().is_some());
        assert!(matches!(
            manager.find_by_raw_key("one").await,
            Err(ManagerError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let storage = Arc::new(InMemoryRepository::<Task>::new());
        let result = EntityManager::<Task>::builder(storage)
            .config(ManagerConfig::new().with_page_sizes(0, 10))
            .build();
        assert!(matches!(result, Err(ConfigurationError::Invalid { .. })));
    }
}
