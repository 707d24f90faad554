//! Relaying fetched events to calendar tabs.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use eventlens_core::Event;
use eventlens_protocol::{OutboundMessage, Tab};

use crate::error::{BackgroundError, BackgroundResult};

/// A boxed future, keeping the tab traits object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Access to the browser's tabs, one tab at a time.
pub trait TabMessenger: Send + Sync {
    /// Returns the open tabs whose URL matches `pattern`.
    fn query_tabs<'a>(
        &'a self,
        pattern: &'a UrlPattern,
    ) -> BoxFuture<'a, BackgroundResult<Vec<Tab>>>;

    /// Posts `message` to one tab.
    fn send_message<'a>(
        &'a self,
        tab_id: i64,
        message: &'a OutboundMessage,
    ) -> BoxFuture<'a, BackgroundResult<()>>;
}

/// How far a message got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Posted to this many tabs.
    Tabs(usize),
    /// Handed to the extension, which posts it to the matching tabs itself.
    Forwarded,
}

/// Delivers a message to every open tab matching a pattern.
pub trait TabDispatch: Send + Sync {
    fn dispatch<'a>(
        &'a self,
        pattern: &'a UrlPattern,
        message: &'a OutboundMessage,
    ) -> BoxFuture<'a, BackgroundResult<Delivery>>;
}

/// [`TabDispatch`] over a [`TabMessenger`]: query the tabs, then post to each.
///
/// A tab that cannot be reached is logged and does not stop the others.
pub struct TabFanout {
    messenger: Arc<dyn TabMessenger>,
}

impl TabFanout {
    pub fn new(messenger: Arc<dyn TabMessenger>) -> Self {
        Self { messenger }
    }
}

impl TabDispatch for TabFanout {
    fn dispatch<'a>(
        &'a self,
        pattern: &'a UrlPattern,
        message: &'a OutboundMessage,
    ) -> BoxFuture<'a, BackgroundResult<Delivery>> {
        Box::pin(async move {
            let tabs = self.messenger.query_tabs(pattern).await?;

            let mut sent = 0;
            for tab in &tabs {
                match self.messenger.send_message(tab.id, message).await {
                    Ok(()) => sent += 1,
                    Err(e) => warn!(
                        retryable = e.is_retryable(),
                        "failed to post event to tab {}: {}", tab.id, e
                    ),
                }
            }

            debug!("posted to {} of {} matching tabs", sent, tabs.len());
            Ok(Delivery::Tabs(sent))
        })
    }
}

/// A tab URL pattern where `*` matches any run of characters.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    pattern: String,
    regex: Regex,
}

impl UrlPattern {
    /// Compiles a pattern.
    pub fn new(pattern: &str) -> BackgroundResult<Self> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{}$", body)).map_err(|e| {
            BackgroundError::config(format!("invalid tab URL pattern {:?}: {}", pattern, e))
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Returns the pattern as written.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Returns true if `url` matches the whole pattern.
    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }
}

/// What happened to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The event has no description; nothing was sent.
    Skipped,
    Delivered(Delivery),
}

/// Posts events to every tab matching a pattern.
pub struct EventRelay {
    dispatch: Arc<dyn TabDispatch>,
    pattern: UrlPattern,
    message: String,
}

impl std::fmt::Debug for EventRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRelay")
            .field("pattern", &self.pattern.as_str())
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl EventRelay {
    /// Creates a relay posting `message`-tagged events to tabs matching `pattern`.
    pub fn new(
        dispatch: Arc<dyn TabDispatch>,
        pattern: UrlPattern,
        message: impl Into<String>,
    ) -> Self {
        Self {
            dispatch,
            pattern,
            message: message.into(),
        }
    }

    /// Posts `event` to every matching tab.
    ///
    /// Events without a description are skipped before anything is sent.
    pub async fn relay(&self, event: Event) -> BackgroundResult<RelayOutcome> {
        if !event.has_description() {
            debug!("event {:?} has no description, not relaying", event.id);
            return Ok(RelayOutcome::Skipped);
        }

        let message = OutboundMessage::new(self.message.clone(), event);
        let delivery = self.dispatch.dispatch(&self.pattern, &message).await?;
        debug!("relayed event {:?}: {:?}", message.event.id, delivery);
        Ok(RelayOutcome::Delivered(delivery))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every posted message; fails for tab ids in `unreachable`.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingMessenger {
        pub tabs: Vec<Tab>,
        pub unreachable: Vec<i64>,
        pub queries: Mutex<usize>,
        pub sent: Mutex<Vec<(i64, OutboundMessage)>>,
    }

    impl RecordingMessenger {
        pub(crate) fn with_tabs(tabs: Vec<Tab>) -> Self {
            Self {
                tabs,
                ..Default::default()
            }
        }

        pub(crate) fn sent(&self) -> Vec<(i64, OutboundMessage)> {
            self.sent.lock().unwrap().clone()
        }

        pub(crate) fn query_count(&self) -> usize {
            *self.queries.lock().unwrap()
        }
    }

    impl TabMessenger for RecordingMessenger {
        fn query_tabs<'a>(
            &'a self,
            pattern: &'a UrlPattern,
        ) -> BoxFuture<'a, BackgroundResult<Vec<Tab>>> {
            Box::pin(async move {
                *self.queries.lock().unwrap() += 1;
                Ok(self
                    .tabs
                    .iter()
                    .filter(|tab| tab.url.as_deref().is_some_and(|url| pattern.matches(url)))
                    .cloned()
                    .collect())
            })
        }

        fn send_message<'a>(
            &'a self,
            tab_id: i64,
            message: &'a OutboundMessage,
        ) -> BoxFuture<'a, BackgroundResult<()>> {
            Box::pin(async move {
                if self.unreachable.contains(&tab_id) {
                    return Err(BackgroundError::relay(format!("tab {} is gone", tab_id)));
                }
                self.sent.lock().unwrap().push((tab_id, message.clone()));
                Ok(())
            })
        }
    }
}
