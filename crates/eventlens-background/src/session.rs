//! Authenticated session state.
//!
//! [`Session`] owns the store, the Google clients and the clock. Tokens and
//! the calendar map are always read from and written to the store, so a
//! restarted host picks up where the last one stopped.

use std::sync::Arc;

use tracing::{debug, info, warn};

use eventlens_core::{CalendarMap, Clock, Event, SystemClock};
use eventlens_google::{
    CalendarClient, GoogleConfig, GoogleError, KeyValueStore, OAuthClient, TokenRecord,
    TokenStore,
};

use crate::error::{BackgroundError, BackgroundResult};

/// Storage key of the calendar map (JSON object, name to id).
pub const CALENDARS_KEY: &str = "calendars";

/// Outcome of a token validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// Google accepted the stored access token.
    Valid,
    /// Google rejected it and a new one was obtained.
    Refreshed,
}

/// Tokens, calendar map and the clients that fill them.
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    tokens: TokenStore,
    oauth: OAuthClient,
    api: CalendarClient,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("oauth", &self.oauth)
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session over `store`, using the system clock.
    pub fn new(config: &GoogleConfig, store: Arc<dyn KeyValueStore>) -> BackgroundResult<Self> {
        Ok(Self {
            tokens: TokenStore::new(store.clone()),
            store,
            oauth: OAuthClient::new(config)?,
            api: CalendarClient::new(config)?,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the OAuth client.
    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    /// Reads the stored tokens.
    pub fn load_tokens(&self) -> BackgroundResult<TokenRecord> {
        Ok(self.tokens.load()?)
    }

    /// Returns true if the stored access token must be refreshed before use.
    pub fn tokens_expired(&self) -> BackgroundResult<bool> {
        Ok(self.load_tokens()?.is_expired(self.clock.now()))
    }

    /// Returns the stored access token.
    pub fn access_token(&self) -> BackgroundResult<String> {
        self.load_tokens()?.access_token.ok_or_else(|| {
            BackgroundError::not_authenticated("no access token stored, run `eventlens install`")
        })
    }

    /// Exchanges an authorization code and stores the resulting tokens.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> BackgroundResult<()> {
        let response = self.oauth.exchange_code(code, redirect_uri).await?;
        self.tokens.save_exchange(
            &response.access_token,
            response.refresh_token.as_deref(),
            self.clock.now(),
        )?;
        Ok(())
    }

    /// Obtains a new access token with the stored refresh token.
    ///
    /// Stored tokens are left untouched when this fails.
    pub async fn refresh(&self) -> BackgroundResult<()> {
        let record = self.load_tokens()?;
        let refresh_token = record.refresh_token.ok_or_else(|| {
            BackgroundError::not_authenticated("no refresh token stored, run `eventlens install`")
        })?;

        let response = self.oauth.refresh_token(&refresh_token).await?;
        self.tokens
            .save_refresh(&response.access_token, self.clock.now())?;
        Ok(())
    }

    /// Refreshes the access token if it is expired, then returns it.
    pub async fn fresh_access_token(&self) -> BackgroundResult<String> {
        if self.tokens_expired()? {
            debug!("access token expired, refreshing");
            self.refresh().await?;
        }
        self.access_token()
    }

    /// Asks Google whether the stored access token is valid, refreshing it if not.
    pub async fn validate_tokens(&self) -> BackgroundResult<TokenStatus> {
        let access_token = self.access_token()?;
        if self.oauth.token_info(&access_token).await? {
            debug!("stored access token is valid");
            return Ok(TokenStatus::Valid);
        }

        warn!("stored access token was rejected, refreshing");
        self.refresh().await?;
        Ok(TokenStatus::Refreshed)
    }

    /// Fetches the calendar list and stores it as the calendar map.
    pub async fn refresh_calendars(&self) -> BackgroundResult<CalendarMap> {
        let access_token = self.fresh_access_token().await?;
        let entries = self.api.list_calendars(&access_token).await?;
        let calendars = CalendarMap::from_entries(entries);

        let json = calendars.to_json().map_err(|e| {
            GoogleError::storage(format!("failed to serialize calendar map: {}", e))
        })?;
        self.store.set(CALENDARS_KEY, &json)?;

        info!("stored {} calendars", calendars.len());
        Ok(calendars)
    }

    /// Reads the stored calendar map; empty if it was never fetched.
    pub fn load_calendars(&self) -> BackgroundResult<CalendarMap> {
        match self.store.get(CALENDARS_KEY)? {
            Some(json) => Ok(CalendarMap::from_json(&json).map_err(|e| {
                GoogleError::storage(format!("stored calendar map is corrupt: {}", e))
            })?),
            None => {
                debug!("no calendar map stored yet");
                Ok(CalendarMap::new())
            }
        }
    }

    /// Fetches one event with the given access token.
    pub async fn fetch_event(
        &self,
        access_token: &str,
        calendar_id: Option<&str>,
        event_id: &str,
    ) -> BackgroundResult<Event> {
        Ok(self.api.get_event(access_token, calendar_id, event_id).await?)
    }
}
