//! OAuth token persistence.
//!
//! The access token, refresh token and expiration are stored as three flat
//! keys of a [`KeyValueStore`]. Every exchange or refresh overwrites them;
//! no history is kept.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use eventlens_core::{expiration_from, is_expired};

use crate::error::GoogleResult;
use crate::storage::KeyValueStore;

/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Storage key of the access token expiration (epoch ms, decimal string).
pub const EXPIRATION_KEY: &str = "expiration";

/// Snapshot of the stored tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRecord {
    /// The access token for API requests.
    pub access_token: Option<String>,
    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,
    /// When the access token expires, in epoch milliseconds.
    pub expiration: Option<i64>,
}

impl TokenRecord {
    /// Returns true if the access token is missing an expiration or past it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.expiration, now)
    }
}

/// Token storage over a shared key-value store.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Creates a token store backed by `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads the current tokens.
    ///
    /// An expiration that is not a valid integer is treated as absent.
    pub fn load(&self) -> GoogleResult<TokenRecord> {
        let expiration = self
            .store
            .get(EXPIRATION_KEY)?
            .and_then(|value| value.parse::<i64>().ok());

        Ok(TokenRecord {
            access_token: self.store.get(ACCESS_TOKEN_KEY)?,
            refresh_token: self.store.get(REFRESH_TOKEN_KEY)?,
            expiration,
        })
    }

    /// Stores the result of an authorization code exchange.
    ///
    /// Writes the access token, the refresh token (when Google returned
    /// one) and an expiration 45 minutes after `issued_at`.
    pub fn save_exchange(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        issued_at: DateTime<Utc>,
    ) -> GoogleResult<i64> {
        let expiration = expiration_from(issued_at);
        let mut entries = vec![
            (ACCESS_TOKEN_KEY, access_token.to_string()),
            (EXPIRATION_KEY, expiration.to_string()),
        ];
        match refresh_token {
            Some(refresh_token) => entries.push((REFRESH_TOKEN_KEY, refresh_token.to_string())),
            None => debug!("token response carried no refresh token, keeping the stored one"),
        }

        self.store.set_many(&entries)?;
        info!("stored new tokens, expiring at {}", expiration);
        Ok(expiration)
    }

    /// Stores a refreshed access token; the refresh token is left as is.
    pub fn save_refresh(&self, access_token: &str, issued_at: DateTime<Utc>) -> GoogleResult<i64> {
        let expiration = expiration_from(issued_at);
        self.store.set_many(&[
            (ACCESS_TOKEN_KEY, access_token.to_string()),
            (EXPIRATION_KEY, expiration.to_string()),
        ])?;
        info!("stored refreshed access token, expiring at {}", expiration);
        Ok(expiration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use eventlens_core::{Clock, FixedClock};

    const NOW_MS: i64 = 1_710_000_000_000;
    const LIFETIME_MS: i64 = 45 * 60 * 1000;

    fn store() -> (Arc<MemoryStore>, TokenStore) {
        let memory = Arc::new(MemoryStore::new());
        let tokens = TokenStore::new(memory.clone());
        (memory, tokens)
    }

    #[test]
    fn empty_store_loads_empty_record() {
        let (_, tokens) = store();
        let record = tokens.load().unwrap();
        assert_eq!(record, TokenRecord::default());
        assert!(record.is_expired(Utc::now()));
    }

    #[test]
    fn exchange_writes_exactly_three_keys() {
        let (memory, tokens) = store();
        let now = FixedClock::from_millis(NOW_MS).now();

        let expiration = tokens.save_exchange("A", Some("B"), now).unwrap();
        assert_eq!(expiration, NOW_MS + LIFETIME_MS);

        assert_eq!(
            memory.keys().unwrap(),
            vec!["access_token", "expiration", "refresh_token"]
        );
        assert_eq!(
            tokens.load().unwrap(),
            TokenRecord {
                access_token: Some("A".to_string()),
                refresh_token: Some("B".to_string()),
                expiration: Some(NOW_MS + LIFETIME_MS),
            }
        );
    }

    #[test]
    fn exchange_without_refresh_token_keeps_previous_one() {
        let (_, tokens) = store();
        let now = FixedClock::from_millis(NOW_MS).now();
        tokens.save_exchange("A", Some("B"), now).unwrap();
        tokens.save_exchange("C", None, now).unwrap();

        let record = tokens.load().unwrap();
        assert_eq!(record.access_token.as_deref(), Some("C"));
        assert_eq!(record.refresh_token.as_deref(), Some("B"));
    }

    #[test]
    fn refresh_only_touches_access_token_and_expiration() {
        let (_, tokens) = store();
        let issued = FixedClock::from_millis(NOW_MS).now();
        tokens.save_exchange("A", Some("B"), issued).unwrap();

        let later = FixedClock::from_millis(NOW_MS + 3_600_000).now();
        tokens.save_refresh("A2", later).unwrap();

        let record = tokens.load().unwrap();
        assert_eq!(record.access_token.as_deref(), Some("A2"));
        assert_eq!(record.refresh_token.as_deref(), Some("B"));
        assert_eq!(record.expiration, Some(NOW_MS + 3_600_000 + LIFETIME_MS));
        assert!(!record.is_expired(later));
    }

    #[test]
    fn garbage_expiration_counts_as_missing() {
        let (memory, tokens) = store();
        memory.set(EXPIRATION_KEY, "soon").unwrap();
        assert_eq!(tokens.load().unwrap().expiration, None);
    }
}
