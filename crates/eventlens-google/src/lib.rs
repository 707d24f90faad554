//! Google OAuth and Calendar API plumbing.
//!
//! - [`OAuthClient`] - authorization URL, code exchange, refresh, token info
//! - [`TokenStore`] - access/refresh token and expiration over a [`KeyValueStore`]
//! - [`CalendarClient`] - calendar list and single-event lookups
//! - [`GoogleError`] - error type shared by all of the above
//!
//! # Example
//!
//! ```ignore
//! use eventlens_google::{CalendarClient, GoogleConfig, OAuthClient, OAuthCredentials};
//!
//! let config = GoogleConfig::new(OAuthCredentials::new("id.apps.googleusercontent.com", "secret"));
//! let oauth = OAuthClient::new(&config)?;
//! let tokens = oauth.refresh_token("1//refresh").await?;
//!
//! let client = CalendarClient::new(&config)?;
//! let event = client.get_event(&tokens.access_token, Some("primary"), "evt1").await?;
//! ```

mod client;
mod config;
mod error;
mod oauth;
mod storage;
mod tokens;

pub use client::{CalendarClient, check_calendar_id};
pub use config::{GoogleConfig, GoogleEndpoints, OAuthCredentials};
pub use error::{GoogleError, GoogleErrorCode, GoogleResult};
pub use oauth::{OAuthClient, TokenResponse};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use tokens::{TokenRecord, TokenStore};
