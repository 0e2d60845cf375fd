//! Error types for the repository layer.
//!
//! Errors are grouped by category: configuration problems discovered at first
//! use, key coercion failures, filter translation failures, resource state
//! errors, batch errors and backend failures. [`RepositoryError`] wraps them all.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all storage engine operations.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Entity or engine configuration errors
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Key coercion errors
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Filter and sort translation errors
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Page request errors
    #[error(transparent)]
    Paging(#[from] PagingError),

    /// Entity state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Batch operation errors
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Configuration errors.
///
/// These are raised at first use rather than at construction, and the
/// discovery that produced them is not re-run afterwards.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The entity type registered no identity field.
    #[error("no identity field registered for entity type {entity}")]
    NoIdentityField { entity: &'static str },

    /// The key generator cannot produce keys of this type.
    #[error("key type {key_type} is not supported by the {strategy} key generator")]
    UnsupportedKeyType {
        key_type: &'static str,
        strategy: &'static str,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Errors converting a loosely-typed key into an entity's native key type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The raw key kind cannot be converted to the target key type.
    #[error("unsupported key: cannot convert {from} to {to}")]
    Unsupported { from: &'static str, to: &'static str },

    /// The raw key has a convertible kind but an invalid value.
    #[error("unsupported key: '{value}' is not a valid {to}")]
    Unparsable { value: String, to: &'static str },
}

/// Errors translating a filter or sort rule against a concrete entity type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The filter references an accessor that was built for another entity type.
    #[error("unsupported filter: field '{field}' was built for {actual}, not {expected}")]
    ForeignAccessor {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The filter references a field name with no registered mapping.
    #[error("unsupported filter: no field named '{field}' is mapped for entity type {entity}")]
    UnmappedField { entity: &'static str, field: String },

    /// A sort token in the `field[:asc|desc]` wire format could not be parsed.
    #[error("invalid sort token '{token}': {message}")]
    InvalidSortToken { token: String, message: String },
}

impl FilterError {
    /// Returns true if this error stems from missing entity configuration
    /// (an unmapped field name) rather than from a malformed request.
    pub fn is_configuration(&self) -> bool {
        matches!(self, FilterError::UnmappedField { .. })
    }
}

/// Errors building a page request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PagingError {
    #[error("page number must be at least 1, got {value}")]
    InvalidPageNumber { value: u32 },

    #[error("page size must be at least 1, got {value}")]
    InvalidPageSize { value: u32 },
}

/// Errors related to entity state inside a storage engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// An entity with the same key is already stored.
    #[error("duplicate key: {entity}/{key} already exists")]
    DuplicateKey { entity: &'static str, key: String },

    /// No entity is stored under the key.
    #[error("entity not found: {entity}/{key}")]
    NotFound { entity: &'static str, key: String },
}

/// Errors from multi-entity operations.
#[derive(Error, Debug)]
pub enum BatchError {
    /// An add batch failed partway. Entities before `index` stay committed.
    #[error("add batch for {entity} failed at index {index} after {} committed adds", .committed.len())]
    PartialAdd {
        entity: &'static str,
        index: usize,
        committed: Vec<String>,
        #[source]
        source: Box<RepositoryError>,
    },

    /// A remove batch was rejected before anything was deleted.
    #[error("remove batch for {entity} aborted: entity at index {index} does not resolve to a stored key")]
    RemoveAborted {
        entity: &'static str,
        index: usize,
        key: Option<String>,
    },
}

/// Errors originating from the storage backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The engine was disposed and accepts no further operations.
    #[error("{backend} repository has been disposed")]
    Disposed { backend: &'static str },

    /// Internal backend error.
    #[error("internal error in {backend}: {message}")]
    Internal {
        backend: &'static str,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;
