//! Clock abstraction and access-token expiry arithmetic.
//!
//! Expirations are stored as epoch milliseconds, the format the token
//! store persists under the `expiration` key.

use chrono::{DateTime, Duration, Utc};

/// Minutes a freshly issued access token is trusted before a refresh.
///
/// Shorter than Google's one hour `expires_in`, which is ignored.
pub const TOKEN_LIFETIME_MINUTES: i64 = 45;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current instant as epoch milliseconds.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Wall clock backed by [`Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Creates a clock frozen at the given epoch milliseconds.
    ///
    /// Out-of-range values fall back to the Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Self(DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Returns the expiration (epoch ms) of a token issued at `issued_at`.
pub fn expiration_from(issued_at: DateTime<Utc>) -> i64 {
    (issued_at + Duration::minutes(TOKEN_LIFETIME_MINUTES)).timestamp_millis()
}

/// Returns true when `expiration` is unknown or already behind `now`.
pub fn is_expired(expiration: Option<i64>, now: DateTime<Utc>) -> bool {
    match expiration {
        Some(expires_at) => expires_at < now.timestamp_millis(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiration_is_exactly_45_minutes_later() {
        let issued = FixedClock::from_millis(1_700_000_000_000).now();
        assert_eq!(expiration_from(issued), 1_700_000_000_000 + 45 * 60 * 1000);
    }

    #[test]
    fn missing_expiration_counts_as_expired() {
        assert!(is_expired(None, Utc::now()));
    }

    #[test]
    fn expiration_boundaries() {
        let now = FixedClock::from_millis(10_000).now();
        assert!(is_expired(Some(9_999), now));
        assert!(!is_expired(Some(10_000), now));
        assert!(!is_expired(Some(10_001), now));
    }

    #[test]
    fn fixed_clock_reports_millis() {
        let clock = FixedClock::from_millis(42);
        assert_eq!(clock.now_millis(), 42);
    }
}
