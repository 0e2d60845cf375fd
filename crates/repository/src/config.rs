//! Configuration for storage engines and the entity manager.
//!
//! All configuration types deserialize with serde, fill missing fields with
//! defaults, and can be overridden from `REPOSITORY_*` environment variables.
//!
//! # Example
//!
//! ```
//! use helios_repository::config::{CacheConfig, ManagerConfig};
//!
//! let config = ManagerConfig::default()
//!     .with_cache(CacheConfig::enabled(500))
//!     .with_page_sizes(25, 200);
//! assert!(config.validate().is_ok());
//!
//! let request = config.page_request(Some(2), Some(10_000), Some("name,age:desc")).unwrap();
//! assert_eq!(request.page_size(), 200);
//! assert_eq!(request.sort().len(), 2);
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RepositoryResult;
use crate::key::{EntityKey, KeyGenerator, RandomKeyGenerator, SequentialKeyGenerator};
use crate::types::{PageRequest, SortDirection, SortRule};

/// Key generation strategy for entities added without a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// Random 128-bit identifiers. Supports UUID and string keys.
    #[default]
    Random,
    /// Monotonic sequence numbers. Supports integer and string keys.
    Sequential,
}

impl fmt::Display for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStrategy::Random => write!(f, "random"),
            KeyStrategy::Sequential => write!(f, "sequential"),
        }
    }
}

impl FromStr for KeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" | "uuid" => Ok(KeyStrategy::Random),
            "sequential" | "sequence" => Ok(KeyStrategy::Sequential),
            other => Err(format!("unknown key strategy '{}'", other)),
        }
    }
}

/// Configuration for the in-memory storage engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// How keys are generated for entities added without one.
    #[serde(default)]
    pub key_strategy: KeyStrategy,

    /// First value produced by the sequential strategy.
    #[serde(default = "default_sequence_start")]
    pub sequence_start: u64,
}

fn default_sequence_start() -> u64 {
    1
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            key_strategy: KeyStrategy::default(),
            sequence_start: default_sequence_start(),
        }
    }
}

impl RepositoryConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key strategy.
    pub fn with_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_strategy = strategy;
        self
    }

    /// Uses sequential keys starting at `start`.
    pub fn sequential(start: u64) -> Self {
        Self {
            key_strategy: KeyStrategy::Sequential,
            sequence_start: start,
        }
    }

    /// Reads `REPOSITORY_KEY_STRATEGY` and `REPOSITORY_SEQUENCE_START` over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        override_from(&lookup, "REPOSITORY_KEY_STRATEGY", &mut config.key_strategy);
        override_from(&lookup, "REPOSITORY_SEQUENCE_START", &mut config.sequence_start);
        config
    }

    /// Builds the key generator selected by this configuration.
    pub fn key_generator<K: EntityKey>(&self) -> Arc<dyn KeyGenerator<K>> {
        match self.key_strategy {
            KeyStrategy::Random => Arc::new(RandomKeyGenerator),
            KeyStrategy::Sequential => Arc::new(SequentialKeyGenerator::new(self.sequence_start)),
        }
    }
}

/// Configuration for the bundled entity cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether the manager creates a cache when none is supplied.
    #[serde(default)]
    pub enabled: bool,

    /// Maximum number of cached entities.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,

    /// Time-to-live of a cached entity, in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_max_entries() -> u64 {
    10_000
}

fn default_ttl_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    /// An enabled cache holding up to `max_entries` entities.
    pub fn enabled(max_entries: u64) -> Self {
        Self {
            enabled: true,
            max_entries,
            ..Self::default()
        }
    }

    /// Sets the time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.as_secs();
        self
    }

    /// Time-to-live as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.enabled && self.max_entries == 0 {
            errors.push("Cache max entries cannot be 0 when the cache is enabled".to_string());
        }

        if self.enabled && self.ttl_secs == 0 {
            errors.push("Cache TTL cannot be 0 when the cache is enabled".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration for [`EntityManager`](crate::manager::EntityManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Bundled cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Page size used when a caller gives none.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Upper bound on caller-supplied page sizes.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Direction used when a sort token has no `:asc`/`:desc` suffix.
    #[serde(default)]
    pub default_sort_direction: SortDirection,
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    1000
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            default_sort_direction: SortDirection::default(),
        }
    }
}

impl ManagerConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache configuration.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the default and maximum page sizes.
    pub fn with_page_sizes(mut self, default_size: u32, max_size: u32) -> Self {
        self.default_page_size = default_size;
        self.max_page_size = max_size;
        self
    }

    /// Sets the default sort direction.
    pub fn with_default_sort_direction(mut self, direction: SortDirection) -> Self {
        self.default_sort_direction = direction;
        self
    }

    /// Reads `REPOSITORY_*` environment variables over the defaults.
    ///
    /// Recognized variables: `REPOSITORY_CACHE_ENABLED`,
    /// `REPOSITORY_CACHE_MAX_ENTRIES`, `REPOSITORY_CACHE_TTL_SECS`,
    /// `REPOSITORY_DEFAULT_PAGE_SIZE`, `REPOSITORY_MAX_PAGE_SIZE` and
    /// `REPOSITORY_DEFAULT_SORT_DIRECTION`. Unparsable values are logged and
    /// ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        override_from(&lookup, "REPOSITORY_CACHE_ENABLED", &mut config.cache.enabled);
        override_from(&lookup, "REPOSITORY_CACHE_MAX_ENTRIES", &mut config.cache.max_entries);
        override_from(&lookup, "REPOSITORY_CACHE_TTL_SECS", &mut config.cache.ttl_secs);
        override_from(&lookup, "REPOSITORY_DEFAULT_PAGE_SIZE", &mut config.default_page_size);
        override_from(&lookup, "REPOSITORY_MAX_PAGE_SIZE", &mut config.max_page_size);
        override_from(
            &lookup,
            "REPOSITORY_DEFAULT_SORT_DIRECTION",
            &mut config.default_sort_direction,
        );
        config
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = match self.cache.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if self.default_page_size > self.max_page_size {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Builds a page request from presentation-layer input.
    ///
    /// Missing values fall back to page 1 and the default page size; page
    /// sizes above the maximum are clamped. `sort` uses the
    /// `field[:asc|desc]` list format.
    pub fn page_request(
        &self,
        page_number: Option<u32>,
        page_size: Option<u32>,
        sort: Option<&str>,
    ) -> RepositoryResult<PageRequest> {
        let size = page_size
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size);
        let request = PageRequest::new(page_number.unwrap_or(1), size)?;

        match sort {
            Some(sort) => {
                let rules = SortRule::parse_list(sort, self.default_sort_direction)?;
                Ok(request.with_sort(rules))
            }
            None => Ok(request),
        }
    }
}

fn override_from<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, target: &mut T)
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let Some(raw) = lookup(name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(e) => warn!(
            variable = name,
            value = %raw,
            error = %e,
            "Ignoring invalid configuration value"
        ),
    }
}
