//! Error types for Google API operations.
//!
//! Every failure in the OAuth, storage and Calendar API layers is a
//! [`GoogleError`] carrying a [`GoogleErrorCode`] category.

use std::fmt;
use thiserror::Error;

/// The category of a Google error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoogleErrorCode {
    /// No usable credentials, or the provider rejected them.
    AuthenticationFailed,
    /// The account lacks permission for the resource (403).
    AuthorizationFailed,
    /// Connection failed, timed out, or the body could not be read.
    NetworkError,
    /// Too many requests (429).
    RateLimited,
    /// Server returned a 5xx status.
    ServerError,
    /// The response body did not have the expected shape.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// Request was rejected (other 4xx).
    BadRequest,
    /// The calendar id cannot be looked up (missing, empty, synthetic).
    InvalidCalendar,
    /// Missing or invalid configuration.
    ConfigurationError,
    /// Reading or writing persistent storage failed.
    StorageError,
}

impl GoogleErrorCode {
    /// Returns true if this error is transient.
    ///
    /// Nothing retries today; the flag only enriches log lines.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::InvalidCalendar => "invalid_calendar",
            Self::ConfigurationError => "configuration_error",
            Self::StorageError => "storage_error",
        }
    }
}

impl fmt::Display for GoogleErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while talking to Google or persisting its tokens.
#[derive(Debug, Error)]
pub struct GoogleError {
    code: GoogleErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GoogleError {
    /// Creates a new error with the given code and message.
    pub fn new(code: GoogleErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::AuthenticationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::NetworkError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::InvalidResponse, message)
    }

    /// Creates an invalid calendar error.
    pub fn invalid_calendar(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::InvalidCalendar, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::ConfigurationError, message)
    }

    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::StorageError, message)
    }

    /// Maps a non-success HTTP status to an error.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        use reqwest::StatusCode;

        let code = match status {
            StatusCode::UNAUTHORIZED => GoogleErrorCode::AuthenticationFailed,
            StatusCode::FORBIDDEN => GoogleErrorCode::AuthorizationFailed,
            StatusCode::NOT_FOUND => GoogleErrorCode::NotFound,
            StatusCode::TOO_MANY_REQUESTS => GoogleErrorCode::RateLimited,
            s if s.is_server_error() => GoogleErrorCode::ServerError,
            _ => GoogleErrorCode::BadRequest,
        };
        Self::new(code, format!("API error ({}): {}", status, body))
    }

    /// Maps a reqwest transport error.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timeout".to_string()
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            format!("request failed: {}", err)
        };
        Self::network(message).with_source(err)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> GoogleErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this error is transient.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for GoogleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for Google operations.
pub type GoogleResult<T> = Result<T, GoogleError>;
