//! Runtime capability discovery.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An optional repository capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// filtering - Filter and sort queries.
    Filtering,
    /// paging - Filtered, sorted page queries.
    Paging,
    /// queryable - Ad-hoc predicate queries.
    Queryable,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Filtering => write!(f, "filtering"),
            Capability::Paging => write!(f, "paging"),
            Capability::Queryable => write!(f, "queryable"),
        }
    }
}

/// The optional capabilities a repository supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryCapabilities {
    /// Whether filter/sort queries are supported.
    pub supports_filtering: bool,
    /// Whether page queries are supported.
    pub supports_paging: bool,
    /// Whether ad-hoc predicate queries are supported.
    pub supports_queryable: bool,
}

impl RepositoryCapabilities {
    /// Every capability.
    pub fn all() -> Self {
        Self {
            supports_filtering: true,
            supports_paging: true,
            supports_queryable: true,
        }
    }

    /// Returns true if `capability` is supported.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Filtering => self.supports_filtering,
            Capability::Paging => self.supports_paging,
            Capability::Queryable => self.supports_queryable,
        }
    }

    /// Lists the supported capabilities.
    pub fn supported(&self) -> Vec<Capability> {
        [Capability::Filtering, Capability::Paging, Capability::Queryable]
            .into_iter()
            .filter(|c| self.supports(*c))
            .collect()
    }
}
