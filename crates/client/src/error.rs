//! Session error taxonomy.

use thiserror::Error;

use careerhub_core::DomainError;

/// Errors surfaced by session operations.
///
/// Transport failures (`Network`) are kept apart from application-level
/// rejections so callers can offer a retry instead of an inline message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("refresh failed: {0}")]
    RefreshFailed(String),

    #[error("invalid or expired code: {0}")]
    InvalidOtp(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error(transparent)]
    Validation(#[from] DomainError),
}

impl SessionError {
    /// Whether the error is meant to be rendered to the user (inline or with a
    /// retry affordance). Refresh failures end in a silent redirect instead.
    pub fn is_user_facing(&self) -> bool {
        match self {
            SessionError::InvalidCredentials(_)
            | SessionError::Network(_)
            | SessionError::InvalidOtp(_)
            | SessionError::Validation(_)
            | SessionError::Api(_) => true,
            SessionError::RefreshFailed(_) | SessionError::Decode(_) => false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Network(_))
    }
}
