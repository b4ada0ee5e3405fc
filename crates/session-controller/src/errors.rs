//! Session controller error types.
//!
//! Adaptor failures reach callers through the observer, not as `Err`
//! values; `SessionError` covers the handful of calls that can fail
//! synchronously (configuration, status queries) and gives adaptor errors a
//! stable code and a caller-safe message when they are surfaced.

use crate::config::ConfigError;
use crate::session::{ErrorCode, ErrorInfo};
use thiserror::Error;

/// Session controller error type.
///
/// Error codes:
/// - `Disposed`: `CANCELLED` (1)
/// - `Adaptor` not found: `NOT_FOUND` (4)
/// - `Adaptor` already ended: `CONFLICT` (5)
/// - Internal, Config, other adaptor failures: `INTERNAL_ERROR` (6)
/// - `Adaptor` timeout or transport: `UNAVAILABLE` (8)
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The signaling adaptor reported a failure.
    #[error("Adaptor error: {0}")]
    Adaptor(ErrorInfo),

    /// The controller was disposed.
    #[error("Controller disposed")]
    Disposed,

    /// Internal error (actor gone, channel closed).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Returns the error code for this error.
    pub fn error_code(&self) -> i32 {
        match self {
            SessionError::Disposed => 1, // CANCELLED
            SessionError::Adaptor(info) => match info.code {
                ErrorCode::NotFound => 4,                          // NOT_FOUND
                ErrorCode::AlreadyEnded => 5,                      // CONFLICT
                ErrorCode::Timeout | ErrorCode::Transport => 8,    // UNAVAILABLE
                ErrorCode::Negotiation | ErrorCode::Other(_) => 6, // INTERNAL_ERROR
            },
            SessionError::Config(_) | SessionError::Internal(_) => 6, // INTERNAL_ERROR
        }
    }

    /// Returns a caller-safe error message (no internal details).
    pub fn client_message(&self) -> String {
        match self {
            SessionError::Config(_) | SessionError::Internal(_) => {
                "An internal error occurred".to_string()
            }
            SessionError::Disposed => "Session controller was shut down".to_string(),
            SessionError::Adaptor(info) => match info.code {
                ErrorCode::NotFound => "Stream not found".to_string(),
                ErrorCode::AlreadyEnded => "Stream already ended".to_string(),
                ErrorCode::Timeout => "Media server did not respond in time".to_string(),
                ErrorCode::Transport => "Media server is unreachable".to_string(),
                ErrorCode::Negotiation => "Media negotiation failed".to_string(),
                ErrorCode::Other(_) => "The media session failed".to_string(),
            },
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        SessionError::Config(err.to_string())
    }
}

impl From<ErrorInfo> for SessionError {
    fn from(info: ErrorInfo) -> Self {
        SessionError::Adaptor(info)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn adaptor(code: ErrorCode) -> SessionError {
        SessionError::Adaptor(ErrorInfo::new(code, "detail"))
    }

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(SessionError::Disposed.error_code(), 1);
        assert_eq!(adaptor(ErrorCode::NotFound).error_code(), 4);
        assert_eq!(adaptor(ErrorCode::AlreadyEnded).error_code(), 5);
        assert_eq!(adaptor(ErrorCode::Timeout).error_code(), 8);
        assert_eq!(adaptor(ErrorCode::Transport).error_code(), 8);
        assert_eq!(adaptor(ErrorCode::Negotiation).error_code(), 6);
        assert_eq!(
            adaptor(ErrorCode::Other("license_suspended".to_string())).error_code(),
            6
        );
        assert_eq!(SessionError::Config("bad".to_string()).error_code(), 6);
        assert_eq!(SessionError::Internal("gone".to_string()).error_code(), 6);
    }

    #[test]
    fn test_client_messages_hide_internal_details() {
        let internal = SessionError::Internal("channel send failed: 0x7f3a".to_string());
        assert_eq!(internal.client_message(), "An internal error occurred");

        let other = SessionError::Adaptor(ErrorInfo::new(
            ErrorCode::Other("license_suspended".to_string()),
            "license key ABC-123 suspended",
        ));
        assert!(!other.client_message().contains("ABC-123"));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: SessionError = ConfigError::InvalidValue("depth".to_string()).into();
        assert!(matches!(err, SessionError::Config(_)));
        assert_eq!(err.error_code(), 6);
    }

    #[test]
    fn test_display_formatting() {
        let err: SessionError = ErrorInfo::new(ErrorCode::NotFound, "no stream").into();
        assert_eq!(format!("{err}"), "Adaptor error: not_found: no stream");
        assert_eq!(format!("{}", SessionError::Disposed), "Controller disposed");
    }
}
