//! Message types exchanged with the calendar page.

use eventlens_core::Event;
use serde::{Deserialize, Serialize};

/// Message tag used when relaying an event to a tab.
pub const SHOW_EVENT: &str = "showEvent";

/// A request for one event, as scraped from the calendar page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    /// Display name of the calendar the event belongs to.
    #[serde(rename = "calendarName")]
    pub calendar_name: String,
    /// Event identifier.
    pub id: String,
}

impl EventRequest {
    /// Creates a new event request.
    pub fn new(calendar_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            calendar_name: calendar_name.into(),
            id: id.into(),
        }
    }
}

/// Messages the content script sends to the background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msg")]
pub enum InboundMessage {
    /// Fetch and relay a batch of events.
    #[serde(rename = "events")]
    Events {
        /// The events to look up.
        #[serde(default)]
        events: Vec<EventRequest>,
    },

    /// Any other message tag; ignored.
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    /// Creates an `events` message.
    pub fn events(events: Vec<EventRequest>) -> Self {
        Self::Events { events }
    }
}

/// Message posted to a calendar tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Message tag.
    pub msg: String,
    /// The relayed event.
    pub event: Event,
}

impl OutboundMessage {
    /// Creates a message with the given tag.
    pub fn new(msg: impl Into<String>, event: Event) -> Self {
        Self {
            msg: msg.into(),
            event,
        }
    }

    /// Creates a `showEvent` message.
    pub fn show_event(event: Event) -> Self {
        Self::new(SHOW_EVENT, event)
    }
}

/// A browser tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    /// Browser-assigned tab id.
    pub id: i64,
    /// URL loaded in the tab, when the browser discloses it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Tab {
    /// Creates a tab with a known URL.
    pub fn new(id: i64, url: impl Into<String>) -> Self {
        Self {
            id,
            url: Some(url.into()),
        }
    }
}

/// Where an inbound message came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSender {
    /// The sending tab, absent for messages from extension pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab: Option<Tab>,
}

/// A frame read from the browser: the message plus its sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundFrame {
    /// Sender information forwarded by the extension.
    #[serde(default)]
    pub sender: MessageSender,
    /// The message itself.
    pub message: InboundMessage,
}

impl InboundFrame {
    /// Creates a frame without sender information.
    pub fn new(message: InboundMessage) -> Self {
        Self {
            sender: MessageSender::default(),
            message,
        }
    }

    /// Builder method to set the sending tab.
    pub fn with_tab(mut self, tab: Tab) -> Self {
        self.sender.tab = Some(tab);
        self
    }
}

/// A frame written to the browser.
///
/// The extension posts `message` to every open tab whose URL matches
/// `tab_url`, using the browser's own tab query. `*` matches any run of
/// characters, as in the browser's URL match patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    #[serde(rename = "tabUrl")]
    pub tab_url: String,
    pub message: OutboundMessage,
}

impl OutboundFrame {
    /// Creates a frame addressed to the tabs matching `tab_url`.
    pub fn new(tab_url: impl Into<String>, message: OutboundMessage) -> Self {
        Self {
            tab_url: tab_url.into(),
            message,
        }
    }
}
