//! Lifecycle and message dispatch.
//!
//! [`MessageListener`] is what the host calls: once on install to run the
//! authorization flow, and for every message the calendar page sends.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use eventlens_core::CalendarMap;
use eventlens_protocol::{EventRequest, InboundFrame, InboundMessage};

use crate::auth::{AuthPrompt, authorize};
use crate::error::BackgroundResult;
use crate::relay::{Delivery, EventRelay, RelayOutcome};
use crate::session::Session;

/// Counts for one `events` batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Events asked for.
    pub requested: usize,
    /// Events posted to at least one matching tab, or handed to the
    /// extension for posting.
    pub relayed: usize,
    /// Events fetched but not relayed (no description).
    pub skipped: usize,
    /// Events sent out that no tab received: none matched, or every post failed.
    pub undelivered: usize,
    /// Events that could not be fetched or relayed.
    pub failed: usize,
}

impl BatchSummary {
    fn aborted(requested: usize) -> Self {
        Self {
            requested,
            failed: requested,
            ..Default::default()
        }
    }
}

/// Handles install and inbound messages.
#[derive(Debug)]
pub struct MessageListener {
    session: Arc<Session>,
    relay: EventRelay,
}

impl MessageListener {
    /// Creates a listener.
    pub fn new(session: Arc<Session>, relay: EventRelay) -> Self {
        Self { session, relay }
    }

    /// Returns the session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs the authorization flow, then fills the calendar map.
    pub async fn on_installed(&self, prompt: &dyn AuthPrompt) -> BackgroundResult<CalendarMap> {
        authorize(&self.session, prompt).await
    }

    /// Handles one inbound frame.
    pub async fn on_message(&self, frame: InboundFrame) -> BatchSummary {
        match frame.message {
            InboundMessage::Events { events } => self.handle_events(events).await,
            InboundMessage::Unknown => {
                debug!("ignoring unknown message");
                BatchSummary::default()
            }
        }
    }

    async fn handle_events(&self, events: Vec<EventRequest>) -> BatchSummary {
        let requested = events.len();
        debug!("received {} event requests", requested);

        let expired = match self.session.tokens_expired() {
            Ok(expired) => expired,
            Err(e) => {
                warn!(retryable = e.is_retryable(), "failed to read tokens: {}", e);
                return BatchSummary::aborted(requested);
            }
        };
        if expired {
            info!("access token expired, refreshing before fetching events");
            if let Err(e) = self.session.refresh().await {
                warn!(
                    retryable = e.is_retryable(),
                    "token refresh failed, dropping {} event requests: {}",
                    requested,
                    e
                );
                return BatchSummary::aborted(requested);
            }
        }

        let (access_token, calendars) =
            match (self.session.access_token(), self.session.load_calendars()) {
                (Ok(token), Ok(calendars)) => (token, calendars),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(retryable = e.is_retryable(), "cannot fetch events: {}", e);
                    return BatchSummary::aborted(requested);
                }
            };

        let results = join_all(
            events
                .iter()
                .map(|request| self.fetch_and_relay(&access_token, &calendars, request)),
        )
        .await;

        let mut summary = BatchSummary {
            requested,
            ..Default::default()
        };
        for (request, result) in events.iter().zip(results) {
            match result {
                Ok(RelayOutcome::Skipped) => summary.skipped += 1,
                Ok(RelayOutcome::Delivered(Delivery::Tabs(0))) => {
                    debug!("event {} reached no calendar tab", request.id);
                    summary.undelivered += 1;
                }
                Ok(RelayOutcome::Delivered(_)) => summary.relayed += 1,
                Err(e) => {
                    warn!(
                        retryable = e.is_retryable(),
                        "event {} in calendar {:?} failed: {}",
                        request.id,
                        request.calendar_name,
                        e
                    );
                    summary.failed += 1;
                }
            }
        }

        debug!("batch done: {:?}", summary);
        summary
    }

    async fn fetch_and_relay(
        &self,
        access_token: &str,
        calendars: &CalendarMap,
        request: &EventRequest,
    ) -> BackgroundResult<RelayOutcome> {
        let calendar_id = calendars.get(&request.calendar_name);
        let event = self
            .session
            .fetch_event(access_token, calendar_id, &request.id)
            .await?;
        self.relay.relay(event).await
    }
}
