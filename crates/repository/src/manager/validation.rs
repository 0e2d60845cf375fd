//! Entity validation.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::schema::Entity;

/// Severity of a validation failure. Only errors make an entity invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    /// Blocks the operation.
    #[default]
    Error,
    /// Reported but does not block.
    Warning,
    /// Informational only.
    Information,
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// The offending field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
    /// How serious the failure is.
    #[serde(default)]
    pub severity: ValidationSeverity,
}

impl ValidationFailure {
    /// A blocking failure.
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Error,
        }
    }

    /// A non-blocking failure.
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Warning,
        }
    }

    /// Returns true for blocking failures.
    pub fn is_error(&self) -> bool {
        self.severity == ValidationSeverity::Error
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every failure found while validating one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// All failures, in the order they were found.
    pub failures: Vec<ValidationFailure>,
}

impl ValidationResult {
    /// A result with no failures.
    pub fn valid() -> Self {
        Self::default()
    }

    /// A result with the given failures.
    pub fn new(failures: Vec<ValidationFailure>) -> Self {
        Self { failures }
    }

    /// Adds a failure.
    pub fn push(&mut self, failure: ValidationFailure) {
        self.failures.push(failure);
    }

    /// True if no failure has error severity.
    pub fn is_valid(&self) -> bool {
        !self.failures.iter().any(ValidationFailure::is_error)
    }

    /// Blocking failures.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationFailure> {
        self.failures.iter().filter(|f| f.is_error())
    }
}

/// Checks business rules before an entity is written.
#[async_trait]
pub trait Validator<E: Entity>: Send + Sync {
    /// Validates `entity`, reporting every failure rather than the first.
    async fn validate(&self, entity: &E) -> ValidationResult;
}

type Rule<E> = Box<dyn Fn(&E) -> Option<ValidationFailure> + Send + Sync>;

/// A validator built from independent rule closures.
///
/// All rules run on every validation.
///
/// # Example
///
/// ```
/// use helios_repository::manager::{RuleValidator, ValidationFailure};
///
/// struct Order {
///     quantity: i64,
///     note: String,
/// }
///
/// let validator = RuleValidator::<Order>::new()
///     .require("quantity", "must be positive", |o| o.quantity > 0)
///     .rule(|o| (o.note.len() > 200).then(|| ValidationFailure::warning("note", "very long")));
/// assert_eq!(validator.len(), 2);
/// ```
pub struct RuleValidator<E> {
    rules: Vec<Rule<E>>,
}

impl<E> RuleValidator<E> {
    /// Creates a validator with no rules.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds a rule that may report one failure.
    pub fn rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&E) -> Option<ValidationFailure> + Send + Sync + 'static,
    {
        self.rules.push(Box::new(rule));
        self
    }

    /// Adds a rule reporting an error on `field` when `check` is false.
    pub fn require<F>(self, field: &str, message: &str, check: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let field = field.to_string();
        let message = message.to_string();
        self.rule(move |entity| {
            (!check(entity)).then(|| ValidationFailure::error(field.clone(), message.clone()))
        })
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs every rule against `entity`.
    pub fn check(&self, entity: &E) -> ValidationResult {
        ValidationResult::new(self.rules.iter().filter_map(|rule| rule(entity)).collect())
    }
}

impl<E> Default for RuleValidator<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> Validator<E> for RuleValidator<E> {
    async fn validate(&self, entity: &E) -> ValidationResult {
        self.check(entity)
    }
}
