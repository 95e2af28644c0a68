//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic input failures. Missing rows, conflicts
/// and storage failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A named input field was missing or malformed.
    #[error("validation failed for `{field}`: {reason}")]
    Validation { field: String, reason: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The offending field.
    pub fn field(&self) -> &str {
        match self {
            DomainError::Validation { field, .. } => field,
        }
    }
}
