//! The remote calendar event relayed to the calendar page.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A Google Calendar event as returned by the events endpoint.
///
/// Only the fields this crate inspects are typed; everything else the API
/// returns is kept in `extra` and serialized back unchanged, so the content
/// script receives the full object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Event title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Free-form event description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Every other field of the API response.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    /// Creates an event with the given id and nothing else.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns true if the event carries a description.
    ///
    /// Events without one are never relayed to the calendar page.
    pub fn has_description(&self) -> bool {
        self.description.is_some()
    }
}
