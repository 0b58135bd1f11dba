//! Input/validation error model.

use thiserror::Error;

/// Result type used for value construction and input validation.
pub type DomainResult<T> = Result<T, DomainError>;

/// Validation-level error.
///
/// Keep this focused on deterministic input failures (empty fields, malformed
/// values). Transport and backend failures belong to the client crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. empty).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
