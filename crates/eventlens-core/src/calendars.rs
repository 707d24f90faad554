//! Calendar display name to calendar id mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A calendar from the account's calendar list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    /// The calendar ID.
    pub id: String,
    /// The calendar display name.
    pub summary: String,
}

impl CalendarEntry {
    /// Creates a new calendar entry.
    pub fn new(id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
        }
    }
}

/// Mapping from calendar display name to calendar id.
///
/// The calendar page only knows the display name of an event's calendar,
/// the API needs the id. The map is rebuilt wholesale from each calendar
/// list fetch and serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarMap(BTreeMap<String, String>);

impl CalendarMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map keyed by `summary`. A later entry with the same name
    /// replaces an earlier one.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CalendarEntry>,
    {
        let map = entries
            .into_iter()
            .fold(BTreeMap::new(), |mut map, entry| {
                map.insert(entry.summary, entry.id);
                map
            });
        Self(map)
    }

    /// Resolves a calendar display name to its id.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns the number of calendars.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the map holds no calendar.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses a map from its JSON text form.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serializes the map to its JSON text form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
