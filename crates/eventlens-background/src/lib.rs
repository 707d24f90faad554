//! Background host for the eventlens browser extension.
//!
//! Authorizes against Google once, keeps the OAuth tokens and the calendar
//! map in a local store, and answers the calendar page's `events` requests
//! by fetching each event and posting it back to the calendar tabs.
//!
//! The browser-specific pieces sit behind traits:
//! - [`KeyValueStore`](eventlens_google::KeyValueStore) for persistence
//! - [`AuthPrompt`] for the interactive consent page
//! - [`TabDispatch`] for delivery to the calendar tabs; [`TabFanout`] builds
//!   it from a per-tab [`TabMessenger`], [`PortMessenger`] forwards to the
//!   extension

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod host;
pub mod port;
pub mod relay;
pub mod secret;
pub mod session;

pub use auth::{AuthPrompt, LoopbackPrompt, authorize};
pub use config::BackgroundConfig;
pub use error::{BackgroundError, BackgroundResult};
pub use handler::{BatchSummary, MessageListener};
pub use port::PortMessenger;
pub use relay::{
    Delivery, EventRelay, RelayOutcome, TabDispatch, TabFanout, TabMessenger, UrlPattern,
};
pub use session::{Session, TokenStatus};
