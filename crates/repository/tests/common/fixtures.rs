//! Entity fixtures and seeding helpers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use helios_repository::backends::memory::InMemoryRepository;
use helios_repository::config::RepositoryConfig;
use helios_repository::core::Repository;
use helios_repository::manager::Timestamped;
use helios_repository::schema::{Entity, EntitySchemaBuilder};

/// A customer keyed by UUID.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: Option<Uuid>,
    pub name: String,
    pub age: i64,
    pub tier: String,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn new(name: &str, age: i64, tier: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            age,
            tier: tier.to_string(),
            email: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
}

impl Entity for Customer {
    type Key = Uuid;

    fn describe(schema: &mut EntitySchemaBuilder<Self>) {
        schema
            .key("id", |c| c.id, |c, id| c.id = Some(id))
            .field("name", |c| c.name.as_str().into())
            .field("age", |c| c.age.into())
            .field("tier", |c| c.tier.as_str().into())
            .field("email", |c| c.email.clone().into());
    }
}

impl Timestamped for Customer {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = Some(at);
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }
}

/// A product keyed by a caller-chosen SKU.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub sku: Option<String>,
    pub title: String,
    pub price: f64,
}

impl Product {
    pub fn new(sku: &str, title: &str, price: f64) -> Self {
        Self {
            sku: Some(sku.to_string()),
            title: title.to_string(),
            price,
        }
    }
}

impl Entity for Product {
    type Key = String;

    fn describe(schema: &mut EntitySchemaBuilder<Self>) {
        schema
            .key("sku", |p| p.sku.clone(), |p, sku| p.sku = Some(sku))
            .field("title", |p| p.title.as_str().into())
            .field("price", |p| p.price.into());
    }
}

/// An order keyed by a sequential integer.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Option<i64>,
    pub customer: String,
    pub quantity: i64,
}

impl Order {
    pub fn new(customer: &str, quantity: i64) -> Self {
        Self {
            id: None,
            customer: customer.to_string(),
            quantity,
        }
    }
}

impl Entity for Order {
    type Key = i64;

    fn describe(schema: &mut EntitySchemaBuilder<Self>) {
        schema
            .key("id", |o| o.id, |o, id| o.id = Some(id))
            .field("customer", |o| o.customer.as_str().into())
            .field("quantity", |o| o.quantity.into());
    }
}

/// An entity that declares no key field.
#[derive(Debug, Clone, PartialEq)]
pub struct Unkeyed {
    pub label: String,
}

impl Entity for Unkeyed {
    type Key = String;

    fn describe(schema: &mut EntitySchemaBuilder<Self>) {
        schema.field("label", |u| u.label.as_str().into());
    }
}

const TIERS: [&str; 3] = ["bronze", "silver", "gold"];

/// `count` customers named `customer-000`, `customer-001`, ... with ages
/// 18 + n % 50 and tiers cycling bronze, silver, gold.
pub fn customers(count: usize) -> Vec<Customer> {
    (0..count)
        .map(|n| Customer::new(&format!("customer-{:03}", n), 18 + (n as i64 % 50), TIERS[n % 3]))
        .collect()
}

/// An in-memory customer repository holding `count` seeded customers.
pub async fn seeded_customers(count: usize) -> InMemoryRepository<Customer> {
    let repo = InMemoryRepository::new();
    repo.add_range(customers(count))
        .await
        .expect("seeding customers");
    repo
}

/// An in-memory order repository with sequential keys starting at 1.
pub fn order_repository() -> InMemoryRepository<Order> {
    InMemoryRepository::with_config(&RepositoryConfig::sequential(1))
}
