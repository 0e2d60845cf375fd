//! In-memory engine integration tests.
//!
//! These tests exercise the engine through the public repository traits.

mod common;

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use uuid::Uuid;

use helios_repository::backends::memory::InMemoryRepository;
use helios_repository::core::{
    Capability, FilterableRepository, PageableRepository, QueryableRepository, Repository,
};
use helios_repository::error::{
    BackendError, BatchError, ConfigurationError, FilterError, RepositoryError, ResourceError,
};
use helios_repository::schema::field_accessor;
use helios_repository::types::{Filter, PageRequest, SortRule};

use common::*;

fn names(customers: &[Customer]) -> Vec<&str> {
    customers.iter().map(|c| c.name.as_str()).collect()
}

// ============================================================================
// CRUD Tests
// ============================================================================

#[tokio::test]
async fn test_add_generates_key() {
    init_tracing();
    let repo = InMemoryRepository::new();

    let key = repo.add(Customer::new("Ada", 36, "gold")).await.unwrap();
    let found = repo.find(&key).await.unwrap().unwrap();
    assert_eq!(found.id, Some(key));
    assert_eq!(found.name, "Ada");
}

#[tokio::test]
async fn test_add_keeps_supplied_key() {
    let repo = InMemoryRepository::new();
    let key = repo.add(Product::new("SKU-1", "Lamp", 19.5)).await.unwrap();
    assert_eq!(key, "SKU-1");
}

#[tokio::test]
async fn test_add_duplicate_key_fails() {
    let repo = InMemoryRepository::new();
    repo.add(Product::new("SKU-1", "Lamp", 19.5)).await.unwrap();

    let result = repo.add(Product::new("SKU-1", "Desk", 120.0)).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Resource(ResourceError::DuplicateKey { .. }))
    ));
    let stored = repo.find(&"SKU-1".to_string()).await.unwrap().unwrap();
    assert_eq!(stored.title, "Lamp");
}

#[tokio::test]
async fn test_sequential_keys() {
    let repo = order_repository();
    let keys = repo
        .add_range(vec![Order::new("a", 1), Order::new("b", 2), Order::new("c", 3)])
        .await
        .unwrap();
    assert_eq!(keys, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_unkeyed_entity_is_a_configuration_error() {
    let repo = InMemoryRepository::new();
    let result = repo
        .add(Unkeyed {
            label: "x".to_string(),
        })
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::Configuration(ConfigurationError::NoIdentityField { .. }))
    ));
}

#[tokio::test]
async fn test_update_replaces_and_tracks_original() {
    let repo = InMemoryRepository::new();
    let key = repo.add(Customer::new("Ada", 36, "gold")).await.unwrap();

    let mut changed = repo.find(&key).await.unwrap().unwrap();
    changed.age = 37;
    assert!(repo.update(changed.clone()).await.unwrap());

    assert_eq!(repo.find(&key).await.unwrap(), Some(changed));
    assert_eq!(repo.find_original(&key).await.unwrap().unwrap().age, 36);
}

#[tokio::test]
async fn test_update_missing_returns_false() {
    let repo = InMemoryRepository::new();
    let mut ghost = Customer::new("Ghost", 99, "gold");
    ghost.id = Some(Uuid::new_v4());
    assert!(!repo.update(ghost).await.unwrap());
    assert!(!repo.update(Customer::new("Unkeyed", 1, "gold")).await.unwrap());
}

#[tokio::test]
async fn test_remove() {
    let repo = InMemoryRepository::new();
    let key = repo.add(Customer::new("Ada", 36, "gold")).await.unwrap();
    let stored = repo.find(&key).await.unwrap().unwrap();

    assert!(repo.remove(&stored).await.unwrap());
    assert!(!repo.remove(&stored).await.unwrap());
    assert!(!repo.remove_by_key(&key).await.unwrap());
    assert!(repo.find(&key).await.unwrap().is_none());
}

// ============================================================================
// Batch Tests
// ============================================================================

#[tokio::test]
async fn test_add_range_stops_at_first_failure() {
    let repo = InMemoryRepository::new();
    repo.add(Product::new("P-5", "Existing", 1.0)).await.unwrap();

    let batch: Vec<Product> = (0..10)
        .map(|n| Product::new(&format!("P-{}", n), "New", n as f64))
        .collect();
    let err = repo.add_range(batch).await.unwrap_err();

    match err {
        RepositoryError::Batch(BatchError::PartialAdd {
            index, committed, ..
        }) => {
            assert_eq!(index, 5);
            assert_eq!(committed, vec!["P-0", "P-1", "P-2", "P-3", "P-4"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    // Five committed plus the pre-existing one.
    assert_eq!(repo.len(), 6);
}

#[tokio::test]
async fn test_remove_range_is_all_or_nothing() {
    let repo = seeded_customers(9).await;
    let mut batch = repo.find_all(&Filter::empty(), &[]).await.unwrap();

    let mut ghost = Customer::new("Ghost", 99, "gold");
    ghost.id = Some(Uuid::new_v4());
    batch.insert(4, ghost);

    let err = repo.remove_range(&batch).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Batch(BatchError::RemoveAborted { index: 4, .. })
    ));
    assert_eq!(repo.len(), 9);

    batch.remove(4);
    repo.remove_range(&batch).await.unwrap();
    assert!(repo.is_empty());
}

// ============================================================================
// Filter and Sort Tests
// ============================================================================

#[tokio::test]
async fn test_empty_filter_returns_everything() {
    let repo = seeded_customers(25).await;
    let all = repo.find_all(&Filter::empty(), &[]).await.unwrap();
    assert_eq!(all.len(), 25);
    assert_eq!(repo.count(&Filter::empty()).await.unwrap(), 25);
}

#[tokio::test]
async fn test_filter_and_sort() {
    let repo = seeded_customers(30).await;
    let filter = Filter::eq("tier", "gold").and(Filter::ge("age", 30));

    let found = repo
        .find_all(&filter, &[SortRule::desc("age"), SortRule::asc("name")])
        .await
        .unwrap();

    assert!(!found.is_empty());
    assert!(found.iter().all(|c| c.tier == "gold" && c.age >= 30));
    assert!(found.windows(2).all(|w| w[0].age >= w[1].age));
    assert_eq!(found.len() as u64, repo.count(&filter).await.unwrap());
}

#[tokio::test]
async fn test_sort_is_multi_key() {
    let repo = InMemoryRepository::new();
    for (name, age) in [("b", 30), ("a", 30), ("c", 20)] {
        repo.add(Customer::new(name, age, "gold")).await.unwrap();
    }

    let sorted = repo
        .find_all(&Filter::empty(), &[SortRule::asc("age"), SortRule::asc("name")])
        .await
        .unwrap();
    assert_eq!(names(&sorted), vec!["c", "a", "b"]);

    let parsed = SortRule::parse_list("age:desc, name", Default::default()).unwrap();
    let sorted = repo.find_all(&Filter::empty(), &parsed).await.unwrap();
    assert_eq!(names(&sorted), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_nulls_sort_first() {
    let repo = InMemoryRepository::new();
    repo.add(Customer::new("with", 1, "gold").with_email("x@example.com"))
        .await
        .unwrap();
    repo.add(Customer::new("without", 2, "gold")).await.unwrap();

    let sorted = repo
        .find_all(&Filter::empty(), &[SortRule::asc("email")])
        .await
        .unwrap();
    assert_eq!(names(&sorted), vec!["without", "with"]);

    let missing = repo.find_all(&Filter::is_null("email"), &[]).await.unwrap();
    assert_eq!(names(&missing), vec!["without"]);
}

#[tokio::test]
async fn test_nan_prices_sort_last_without_disturbing_order() {
    let repo = InMemoryRepository::new();
    for n in 0..500u32 {
        let price = if n % 7 == 0 {
            f64::NAN
        } else {
            f64::from((n * 7919) % 1000) / 4.0
        };
        repo.add(Product::new(&format!("SKU-{:03}", n), "Item", price))
            .await
            .unwrap();
    }

    let sorted = repo
        .find_all(&Filter::empty(), &[SortRule::asc("price")])
        .await
        .unwrap();
    assert_eq!(sorted.len(), 500);

    let prices: Vec<f64> = sorted.iter().map(|p| p.price).collect();
    let split = prices.iter().position(|p| p.is_nan()).unwrap();
    assert!(prices[..split].windows(2).all(|w| w[0] <= w[1]));
    assert!(prices[split..].iter().all(|p| p.is_nan()));
    assert_eq!(prices.len() - split, 72);

    let descending = repo
        .find_all(&Filter::empty(), &[SortRule::desc("price")])
        .await
        .unwrap();
    assert!(descending[..72].iter().all(|p| p.price.is_nan()));
    assert!(descending[72..].windows(2).all(|w| w[0].price >= w[1].price));
}

#[tokio::test]
async fn test_find_first_and_exists() {
    let repo = seeded_customers(10).await;

    let youngest = repo
        .find_first(&Filter::empty(), &[SortRule::asc("age")])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(youngest.name, "customer-000");

    assert!(repo.exists(&Filter::starts_with("name", "customer-00")).await.unwrap());
    assert!(!repo.exists(&Filter::contains("name", "nobody")).await.unwrap());
    assert!(repo
        .find_first(&Filter::gt("age", 1_000), &[])
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_negated_and_disjunctive_filters() {
    let repo = seeded_customers(9).await;

    let not_gold = repo
        .count(&Filter::eq("tier", "gold").negate())
        .await
        .unwrap();
    assert_eq!(not_gold, 6);

    let either = Filter::eq("tier", "gold").or(Filter::eq("tier", "bronze"));
    assert_eq!(repo.count(&either).await.unwrap(), 6);

    let listed = Filter::is_in("tier", ["silver", "gold"]);
    assert_eq!(repo.count(&listed).await.unwrap(), 6);
}

#[tokio::test]
async fn test_typed_accessor_filter() {
    let repo = seeded_customers(6).await;
    let age = field_accessor::<Customer>("age").unwrap();

    let found = repo.find_all(&Filter::lt(age, 20), &[]).await.unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn test_unmapped_field_is_rejected() {
    let repo = seeded_customers(3).await;
    let err = repo
        .find_all(&Filter::eq("shoe_size", 42), &[])
        .await
        .unwrap_err();
    match err {
        RepositoryError::Filter(e) => {
            assert!(matches!(e, FilterError::UnmappedField { .. }));
            assert!(e.is_configuration());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_foreign_accessor_is_rejected() {
    let repo = seeded_customers(3).await;
    let foreign = field_accessor::<Order>("quantity").unwrap();
    let err = repo.count(&Filter::eq(foreign, 1)).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Filter(FilterError::ForeignAccessor { .. })
    ));
}

#[tokio::test]
async fn test_query_with_predicate() {
    let repo = seeded_customers(12).await;
    let found = repo
        .query_with(&|c: &Customer| c.name.ends_with('1'), &[SortRule::asc("name")])
        .await
        .unwrap();
    assert_eq!(names(&found), vec!["customer-001", "customer-011"]);
}

// ============================================================================
// Capability and Lifecycle Tests
// ============================================================================

#[test]
fn test_memory_engine_supports_everything() {
    let repo = InMemoryRepository::<Customer>::new();
    let caps = repo.capabilities();
    for capability in [Capability::Filtering, Capability::Paging, Capability::Queryable] {
        assert!(caps.supports(capability));
    }
}

#[tokio::test]
async fn test_disposed_repository_rejects_operations() {
    let repo = seeded_customers(3).await;
    repo.dispose();

    assert!(repo.is_empty());
    assert!(matches!(
        repo.count(&Filter::empty()).await,
        Err(RepositoryError::Backend(BackendError::Disposed { .. }))
    ));
    assert!(repo.add(Customer::new("late", 1, "gold")).await.is_err());
}

#[tokio::test]
async fn test_count_matches_page_total() {
    let repo = seeded_customers(40).await;
    let filter = Filter::eq("tier", "silver");

    let count = repo.count(&filter).await.unwrap();
    let page = repo
        .page(&PageRequest::new(1, 5).unwrap().with_filter(filter))
        .await
        .unwrap();
    assert_eq!(page.total_item_count(), count);
}

// ============================================================================
// Property Tests
// ============================================================================

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("test runtime")
}

fn keys(customers: Vec<Customer>) -> BTreeSet<Uuid> {
    customers.into_iter().filter_map(|c| c.id).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_and_is_intersection(min_age in 18i64..70, tier in prop::sample::select(vec!["bronze", "silver", "gold"])) {
        let rt = runtime();
        rt.block_on(async {
            let repo = seeded_customers(60).await;
            let by_age = Filter::ge("age", min_age);
            let by_tier = Filter::eq("tier", tier);

            let left = keys(repo.find_all(&by_age, &[]).await.unwrap());
            let right = keys(repo.find_all(&by_tier, &[]).await.unwrap());
            let both = keys(repo.find_all(&by_age.clone().and(by_tier.clone()), &[]).await.unwrap());
            let either = keys(repo.find_all(&by_age.or(by_tier), &[]).await.unwrap());

            assert_eq!(both, left.intersection(&right).copied().collect::<BTreeSet<_>>());
            assert_eq!(either, left.union(&right).copied().collect::<BTreeSet<_>>());
        });
    }
}
