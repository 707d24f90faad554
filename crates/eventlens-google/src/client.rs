//! Google Calendar API client.
//!
//! Two calls are needed: the user's calendar list (to map display names to
//! calendar ids) and single-event lookups.

use serde::Deserialize;
use tracing::debug;

use eventlens_core::{CalendarEntry, Event};

use crate::config::GoogleConfig;
use crate::error::{GoogleError, GoogleResult};

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct CalendarClient {
    http_client: reqwest::Client,
    api_base: String,
}

/// Checks that a calendar id can be looked up.
///
/// Rejects a missing or empty id, and ids containing `#`: Google's
/// synthetic calendars (week numbers, holidays) have no fetchable events.
pub fn check_calendar_id(calendar_id: Option<&str>) -> GoogleResult<&str> {
    match calendar_id {
        None => Err(GoogleError::invalid_calendar("no calendar id")),
        Some("") => Err(GoogleError::invalid_calendar("empty calendar id")),
        Some(id) if id.contains('#') => Err(GoogleError::invalid_calendar(format!(
            "calendar '{}' has no fetchable events",
            id
        ))),
        Some(id) => Ok(id),
    }
}

impl CalendarClient {
    /// Creates a new Calendar API client from the configuration.
    pub fn new(config: &GoogleConfig) -> GoogleResult<Self> {
        let http_client = config.http_client().map_err(|e| {
            GoogleError::configuration(format!("failed to create HTTP client: {}", e))
                .with_source(e)
        })?;

        Ok(Self {
            http_client,
            api_base: config.endpoints.calendar_api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Lists the calendars of the authenticated user.
    ///
    /// Entries without a summary cannot be looked up by name and are dropped.
    pub async fn list_calendars(&self, access_token: &str) -> GoogleResult<Vec<CalendarEntry>> {
        let url = format!("{}/users/me/calendarList", self.api_base);
        let body = self.get(&url, access_token).await?;

        let list: CalendarListResponse = serde_json::from_str(&body).map_err(|e| {
            GoogleError::invalid_response(format!("failed to parse calendar list: {}", e))
        })?;

        let entries: Vec<CalendarEntry> = list
            .items
            .into_iter()
            .filter_map(|item| match item.summary {
                Some(summary) => Some(CalendarEntry::new(item.id, summary)),
                None => {
                    debug!("skipping calendar {} without summary", item.id);
                    None
                }
            })
            .collect();

        debug!("fetched {} calendars", entries.len());
        Ok(entries)
    }

    /// Fetches one event.
    ///
    /// The calendar id is checked with [`check_calendar_id`] before any
    /// request is made.
    pub async fn get_event(
        &self,
        access_token: &str,
        calendar_id: Option<&str>,
        event_id: &str,
    ) -> GoogleResult<Event> {
        let calendar_id = check_calendar_id(calendar_id).map_err(|e| {
            GoogleError::invalid_calendar(format!("event '{}': {}", event_id, e.message()))
        })?;

        let url = format!(
            "{}/calendars/{}/events/{}",
            self.api_base,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );
        let body = self.get(&url, access_token).await?;

        serde_json::from_str(&body).map_err(|e| {
            GoogleError::invalid_response(format!("failed to parse event {}: {}", event_id, e))
        })
    }

    async fn get(&self, url: &str, access_token: &str) -> GoogleResult<String> {
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(GoogleError::from_reqwest)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GoogleError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(GoogleError::from_status(status, &body));
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<ApiCalendar>,
}

#[derive(Debug, Deserialize)]
struct ApiCalendar {
    id: String,
    #[serde(default)]
    summary: Option<String>,
}
