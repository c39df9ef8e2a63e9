//! Remote call error types

use shared::error::ErrorCode;
use thiserror::Error;

/// Error returned by the remote service client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connection, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request rejected as invalid
    #[error("Validation error: {0}")]
    Validation(String),

    /// Request conflicts with remote state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Remote service failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for remote operations
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Whether this error means the resource does not exist remotely
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
            || matches!(self, Self::Http(e) if e.status() == Some(reqwest::StatusCode::NOT_FOUND))
    }

    /// Map this transport-level error into the shared error code space
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Http(e) if e.is_timeout() => ErrorCode::TimeoutError,
            Self::Http(_) => ErrorCode::NetworkError,
            Self::InvalidResponse(_) => ErrorCode::InternalError,
            Self::Unauthorized => ErrorCode::NotAuthenticated,
            Self::Forbidden(_) => ErrorCode::PermissionDenied,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::Conflict(_) => ErrorCode::AlreadyExists,
            Self::Internal(_) => ErrorCode::InternalError,
            Self::Serialization(_) => ErrorCode::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ClientError::Unauthorized.error_code(),
            ErrorCode::NotAuthenticated
        );
        assert_eq!(
            ClientError::NotFound("order".to_string()).error_code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            ClientError::Internal("boom".to_string()).error_code(),
            ErrorCode::InternalError
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(ClientError::NotFound("x".to_string()).is_not_found());
        assert!(!ClientError::Unauthorized.is_not_found());
    }
}
