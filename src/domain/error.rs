//! Domain-level errors (no external dependencies)

use std::path::PathBuf;
use thiserror::Error;

/// Domain errors represent analysis input and model violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid operator '{0}': must be one of AND, OR")]
    InvalidOperator(String),

    #[error("comparison between event and '{0}' is not valid")]
    InvalidComparison(String),

    #[error("invariant violated for '{event}': {reason}")]
    InvariantViolation { event: String, reason: String },

    #[error("distribution '{distribution}' of '{event}' is not supported for {mode} analysis")]
    UnsupportedDistribution {
        event: String,
        distribution: String,
        mode: String,
    },

    #[error("'{event}' requires {expected} parameter(s), got {actual}")]
    ShapeMismatch {
        event: String,
        expected: usize,
        actual: usize,
    },

    #[error("value out of range: {0}")]
    RangeError(String),

    #[error("probability vectors differ in length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("{count} cut sets exceed the exact calculation limit of {limit}")]
    TooManyCutSets { count: usize, limit: usize },

    #[error("cycle detected in fault tree logic at: {0}")]
    CycleDetected(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub(crate) fn invariant(event: &str, reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            event: event.to_string(),
            reason: reason.into(),
        }
    }
}
