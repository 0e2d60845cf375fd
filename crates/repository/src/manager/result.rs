//! Typed outcomes of manager operations.

#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::Capability;
use crate::error::{KeyError, RepositoryError};

use super::validation::ValidationResult;

/// Classifies a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// The entity failed validation or has no key.
    NotValid,
    /// No entity is stored under the key.
    NotFound,
    /// The storage engine or cache failed unexpectedly.
    UnknownError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::NotValid => write!(f, "not-valid"),
            ErrorCode::NotFound => write!(f, "not-found"),
            ErrorCode::UnknownError => write!(f, "unknown-error"),
        }
    }
}

/// Details of a failed operation.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct OperationError {
    pub code: ErrorCode,
    pub message: String,
    /// Field-level failures, for [`ErrorCode::NotValid`] results from validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
}

impl OperationError {
    /// Validation failed.
    pub fn not_valid(validation: ValidationResult) -> Self {
        Self {
            code: ErrorCode::NotValid,
            message: format!(
                "validation failed with {} error(s)",
                validation.errors().count()
            ),
            validation: Some(validation),
        }
    }

    /// The entity is unusable for a reason other than validation.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::NotValid,
            message: message.into(),
            validation: None,
        }
    }

    /// Nothing is stored under `key`.
    pub fn not_found(entity: &str, key: &impl fmt::Display) -> Self {
        Self {
            code: ErrorCode::NotFound,
            message: format!("{}/{} not found", entity, key),
            validation: None,
        }
    }

    /// An unexpected failure.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::UnknownError,
            message: message.into(),
            validation: None,
        }
    }
}

/// Outcome of a mutating manager operation.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum OperationResult<T> {
    /// The operation took effect.
    Success(T),
    /// Nothing needed to change.
    NotModified,
    /// The operation was rejected or failed.
    Failed(OperationError),
}

impl<T> OperationResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success(_))
    }

    pub fn is_not_modified(&self) -> bool {
        matches!(self, OperationResult::NotModified)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, OperationResult::Failed(_))
    }

    /// The error code of a failed result.
    pub fn code(&self) -> Option<ErrorCode> {
        self.error().map(|e| e.code)
    }

    pub fn error(&self) -> Option<&OperationError> {
        match self {
            OperationResult::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            OperationResult::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            OperationResult::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        match self {
            OperationResult::Success(value) => OperationResult::Success(f(value)),
            OperationResult::NotModified => OperationResult::NotModified,
            OperationResult::Failed(error) => OperationResult::Failed(error),
        }
    }
}

/// Errors from manager lookups and queries.
///
/// Mutations report failures as [`OperationResult::Failed`] instead.
#[derive(Error, Debug)]
pub enum ManagerError {
    /// The storage engine failed.
    #[error("{operation} on {entity} failed: {source}")]
    Operation {
        operation: &'static str,
        entity: &'static str,
        #[source]
        source: RepositoryError,
    },

    /// The storage engine lacks the capability the call needs.
    #[error("{capability} is not supported by the {backend} repository")]
    NotSupported {
        capability: Capability,
        backend: &'static str,
    },

    /// A raw key could not be converted to the entity's key type.
    #[error(transparent)]
    InvalidKey(#[from] KeyError),
}

/// Result type alias for manager lookups.
pub type ManagerResult<T> = Result<T, ManagerError>;
