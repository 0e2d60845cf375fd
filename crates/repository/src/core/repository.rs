//! Repository traits implemented by storage engines.

use async_trait::async_trait;

use crate::error::{BatchError, RepositoryResult};
use crate::schema::Entity;
use crate::types::{Filter, PageRequest, PageResult, SortRule};

use super::capabilities::RepositoryCapabilities;

/// An ad-hoc predicate over entities.
pub type EntityPredicate<E> = dyn Fn(&E) -> bool + Send + Sync;

/// Core CRUD contract for a storage engine holding entities of type `E`.
///
/// Optional query capabilities are exposed through the `as_*` probes. Callers
/// must check them and report an unsupported capability rather than assume it.
///
/// # Example
///
/// ```ignore
/// use helios_repository::core::Repository;
///
/// async fn rename<R: Repository<Customer>>(repo: &R, key: &Uuid) -> RepositoryResult<bool> {
///     let Some(mut customer) = repo.find(key).await? else {
///         return Ok(false);
///     };
///     customer.name = "Renamed".to_string();
///     repo.update(customer).await
/// }
/// ```
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Adds an entity, generating its key if absent.
    ///
    /// # Errors
    ///
    /// * `ResourceError::DuplicateKey` - If an entity with the same key is stored
    /// * `ConfigurationError` - If the key cannot be resolved or generated
    async fn add(&self, entity: E) -> RepositoryResult<E::Key>;

    /// Adds entities one at a time.
    ///
    /// Not transactional: when an add fails, the entities before it stay
    /// committed and their keys are reported in [`BatchError::PartialAdd`].
    async fn add_range(&self, entities: Vec<E>) -> RepositoryResult<Vec<E::Key>> {
        let mut committed = Vec::with_capacity(entities.len());
        for (index, entity) in entities.into_iter().enumerate() {
            match self.add(entity).await {
                Ok(key) => committed.push(key),
                Err(source) => {
                    return Err(BatchError::PartialAdd {
                        entity: E::entity_name(),
                        index,
                        committed: committed.iter().map(ToString::to_string).collect(),
                        source: Box::new(source),
                    }
                    .into());
                }
            }
        }
        Ok(committed)
    }

    /// Removes the entity stored under `entity`'s key.
    ///
    /// Returns `false` if nothing was stored under that key.
    async fn remove(&self, entity: &E) -> RepositoryResult<bool>;

    /// Removes the entity stored under `key`.
    async fn remove_by_key(&self, key: &E::Key) -> RepositoryResult<bool>;

    /// Removes all `entities`, or none of them.
    ///
    /// Every entity must resolve to a stored key before anything is deleted.
    /// Otherwise the batch fails with [`BatchError::RemoveAborted`].
    async fn remove_range(&self, entities: &[E]) -> RepositoryResult<()>;

    /// Replaces the stored entity with the same key.
    ///
    /// Returns `false` if the entity has no key or nothing is stored under it.
    async fn update(&self, entity: E) -> RepositoryResult<bool>;

    /// Finds an entity by key.
    async fn find(&self, key: &E::Key) -> RepositoryResult<Option<E>>;

    /// Filter and sort support, if available.
    fn as_filterable(&self) -> Option<&dyn FilterableRepository<E>> {
        None
    }

    /// Paging support, if available.
    fn as_pageable(&self) -> Option<&dyn PageableRepository<E>> {
        None
    }

    /// Ad-hoc predicate support, if available.
    fn as_queryable(&self) -> Option<&dyn QueryableRepository<E>> {
        None
    }

    /// Summarizes the optional capabilities of this repository.
    fn capabilities(&self) -> RepositoryCapabilities {
        RepositoryCapabilities {
            supports_filtering: self.as_filterable().is_some(),
            supports_paging: self.as_pageable().is_some(),
            supports_queryable: self.as_queryable().is_some(),
        }
    }
}

/// Filter and sort queries.
#[async_trait]
pub trait FilterableRepository<E: Entity>: Send + Sync {
    /// Returns the first entity matching `filter` in `sort` order.
    async fn find_first(&self, filter: &Filter, sort: &[SortRule]) -> RepositoryResult<Option<E>>;

    /// Returns every entity matching `filter` in `sort` order.
    async fn find_all(&self, filter: &Filter, sort: &[SortRule]) -> RepositoryResult<Vec<E>>;

    /// Returns true if any entity matches `filter`.
    async fn exists(&self, filter: &Filter) -> RepositoryResult<bool>;

    /// Counts the entities matching `filter`.
    async fn count(&self, filter: &Filter) -> RepositoryResult<u64>;
}

/// Page queries.
#[async_trait]
pub trait PageableRepository<E: Entity>: Send + Sync {
    /// Returns one page of the filtered, sorted entity set.
    ///
    /// The total count reflects the filtered set, not the page.
    async fn page(&self, request: &PageRequest) -> RepositoryResult<PageResult<E>>;
}

/// Ad-hoc predicate queries that bypass the filter AST.
#[async_trait]
pub trait QueryableRepository<E: Entity>: Send + Sync {
    /// Returns every entity for which `predicate` holds, in `sort` order.
    async fn query_with(
        &self,
        predicate: &EntityPredicate<E>,
        sort: &[SortRule],
    ) -> RepositoryResult<Vec<E>>;
}
