//! Background host error types.

use std::io;
use thiserror::Error;

use eventlens_google::GoogleError;
use eventlens_protocol::ProtocolError;

/// Result type for background operations.
pub type BackgroundResult<T> = Result<T, BackgroundError>;

/// Errors that can occur in the background host.
#[derive(Debug, Error)]
pub enum BackgroundError {
    /// IO error (stdin/stdout, loopback socket).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Native-messaging framing error.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Google OAuth, Calendar API or storage error.
    #[error("Google error: {0}")]
    Google(#[from] GoogleError),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// No usable tokens are stored.
    #[error("Not authenticated: {message}")]
    NotAuthenticated { message: String },

    /// The interactive authorization prompt failed or was dismissed.
    #[error("Authorization prompt failed: {message}")]
    AuthPrompt { message: String },

    /// Posting a message to a tab failed.
    #[error("Relay error: {message}")]
    Relay { message: String },
}

impl BackgroundError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a not-authenticated error.
    pub fn not_authenticated(message: impl Into<String>) -> Self {
        Self::NotAuthenticated {
            message: message.into(),
        }
    }

    /// Creates an authorization prompt error.
    pub fn auth_prompt(message: impl Into<String>) -> Self {
        Self::AuthPrompt {
            message: message.into(),
        }
    }

    /// Creates a relay error.
    pub fn relay(message: impl Into<String>) -> Self {
        Self::Relay {
            message: message.into(),
        }
    }

    /// True when the same call might succeed later (network, 429, 5xx).
    ///
    /// Nothing retries; swallowed failures carry it as a log field.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Google(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BackgroundError::not_authenticated("no refresh token stored");
        assert_eq!(err.to_string(), "Not authenticated: no refresh token stored");

        let err: BackgroundError = GoogleError::invalid_calendar("empty calendar id").into();
        assert_eq!(
            err.to_string(),
            "Google error: invalid_calendar: empty calendar id"
        );
    }

    #[test]
    fn only_transient_google_errors_are_retryable() {
        let err: BackgroundError = GoogleError::network("connection reset").into();
        assert!(err.is_retryable());

        let err: BackgroundError = GoogleError::invalid_calendar("empty calendar id").into();
        assert!(!err.is_retryable());

        assert!(!BackgroundError::relay("tab 3 is gone").is_retryable());
        assert!(!BackgroundError::Io(io::Error::other("broken pipe")).is_retryable());
    }

    #[test]
    fn io_error_converts() {
        let err: BackgroundError = io::Error::other("broken pipe").into();
        assert!(matches!(err, BackgroundError::Io(_)));
    }
}
