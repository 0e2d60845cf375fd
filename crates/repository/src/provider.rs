//! Lazily created repository instances, one per tenant.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{RepositoryError, RepositoryResult};
use crate::tenant::TenantId;

type Slot<R> = Arc<OnceCell<Arc<R>>>;
type Factory<R> = dyn Fn(&TenantId) -> RepositoryResult<R> + Send + Sync;

/// Hands out one shared repository instance per tenant, creating it on first request.
///
/// The registry lock is held only to find or insert a tenant's slot.
/// Creation runs inside that slot, so concurrent first requests for the same
/// tenant create one instance and requests for other tenants are not
/// blocked. The instances themselves are never guarded by the provider.
///
/// # Example
///
/// ```
/// use helios_repository::backends::memory::InMemoryRepository;
/// use helios_repository::provider::RepositoryProvider;
/// use helios_repository::schema::{Entity, EntitySchemaBuilder};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Note {
///     id: Option<String>,
/// }
///
/// impl Entity for Note {
///     type Key = String;
///
///     fn describe(schema: &mut EntitySchemaBuilder<Self>) {
///         schema.key("id", |n| n.id.clone(), |n, id| n.id = Some(id));
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let provider = RepositoryProvider::new(|_| Ok(InMemoryRepository::<Note>::new()));
/// let a = provider.get_or_create(&"acme".into()).await.unwrap();
/// let b = provider.get_or_create(&"acme".into()).await.unwrap();
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// # });
/// ```
pub struct RepositoryProvider<R> {
    instances: RwLock<HashMap<TenantId, Slot<R>>>,
    factory: Box<Factory<R>>,
}

impl<R: Send + Sync + 'static> RepositoryProvider<R> {
    /// Creates a provider that builds instances with `factory`.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&TenantId) -> RepositoryResult<R> + Send + Sync + 'static,
    {
        Self {
            instances: RwLock::new(HashMap::new()),
            factory: Box::new(factory),
        }
    }

    /// Returns the tenant's instance, creating it if absent.
    ///
    /// A failed creation leaves no instance behind; the next call retries.
    pub async fn get_or_create(&self, tenant: &TenantId) -> RepositoryResult<Arc<R>> {
        let slot = self.slot(tenant);
        let instance = slot
            .get_or_try_init(|| async {
                let instance = (self.factory)(tenant)?;
                debug!(tenant = %tenant, "Created repository instance");
                Ok::<_, RepositoryError>(Arc::new(instance))
            })
            .await?;
        Ok(Arc::clone(instance))
    }

    /// Returns the tenant's instance if it was already created.
    pub fn get(&self, tenant: &TenantId) -> Option<Arc<R>> {
        self.instances
            .read()
            .get(tenant)
            .and_then(|slot| slot.get().cloned())
    }

    /// Forgets the tenant's instance. Holders of the old `Arc` keep using it.
    pub fn remove(&self, tenant: &TenantId) -> Option<Arc<R>> {
        let slot = self.instances.write().remove(tenant)?;
        let removed = slot.get().cloned();
        if removed.is_some() {
            debug!(tenant = %tenant, "Removed repository instance");
        }
        removed
    }

    /// Tenants that currently have an instance.
    pub fn tenants(&self) -> Vec<TenantId> {
        let mut tenants: Vec<TenantId> = self
            .instances
            .read()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(tenant, _)| tenant.clone())
            .collect();
        tenants.sort();
        tenants
    }

    /// Number of created instances.
    pub fn len(&self) -> usize {
        self.instances
            .read()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Returns true if no instance was created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, tenant: &TenantId) -> Slot<R> {
        if let Some(slot) = self.instances.read().get(tenant) {
            return Arc::clone(slot);
        }
        let mut instances = self.instances.write();
        Arc::clone(
            instances
                .entry(tenant.clone())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        )
    }
}

impl<R> fmt::Debug for RepositoryProvider<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryProvider")
            .field("slots", &self.instances.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::ConfigurationError;

    struct Instance {
        tenant: TenantId,
    }

    #[tokio::test]
    async fn test_instance_per_tenant() {
        let provider = RepositoryProvider::new(|tenant| {
            Ok(Instance {
                tenant: tenant.clone(),
            })
        });

        let acme = provider.get_or_create(&"acme".into()).await.unwrap();
        let globex = provider.get_or_create(&"globex".into()).await.unwrap();
        assert_eq!(acme.tenant.as_str(), "acme");
        assert_eq!(globex.tenant.as_str(), "globex");
        assert_eq!(provider.len(), 2);
        assert_eq!(
            provider.tenants(),
            vec![TenantId::new("acme"), TenantId::new("globex")]
        );
    }

    #[tokio::test]
    async fn test_failed_creation_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let provider = RepositoryProvider::new(move |tenant| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(RepositoryError::Configuration(ConfigurationError::Invalid {
                    message: "not ready".to_string(),
                }));
            }
            Ok(Instance {
                tenant: tenant.clone(),
            })
        });

        let tenant = TenantId::new("acme");
        assert!(provider.get_or_create(&tenant).await.is_err());
        assert!(provider.get(&tenant).is_none());
        assert!(provider.is_empty());

        assert!(provider.get_or_create(&tenant).await.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remove_forgets_instance() {
        let provider = RepositoryProvider::new(|tenant| {
            Ok(Instance {
                tenant: tenant.clone(),
            })
        });
        let tenant = TenantId::new("acme");
        let first = provider.get_or_create(&tenant).await.unwrap();
        assert!(provider.remove(&tenant).is_some());
        assert!(provider.get(&tenant).is_none());

        let second = provider.get_or_create(&tenant).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
