use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Short-lived bearer credential held only in memory.
///
/// The client never parses or verifies the token body; the expiry comes from
/// the backend's `expiresIn` alongside it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Build a token from a backend `expiresIn` (seconds) relative to `now`.
    pub fn expiring_in(value: impl Into<String>, expires_in_secs: u64, now: DateTime<Utc>) -> Self {
        let secs = i64::try_from(expires_in_secs).unwrap_or(i64::MAX);
        let expires_at = Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d));
        Self::new(value, expires_at)
    }

    /// Build a token from the backend's optional `expiresIn`.
    ///
    /// An absent or zero `expiresIn` means the backend gave no lifetime: the
    /// token carries no expiry and stays live until replaced.
    pub fn from_expires_in(value: impl Into<String>, expires_in_secs: Option<u64>, now: DateTime<Utc>) -> Self {
        match expires_in_secs {
            Some(secs) if secs > 0 => Self::expiring_in(value, secs, now),
            Some(_) | None => Self::new(value, None),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// A token without a known expiry is treated as live until replaced.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

// Keep the credential out of logs.
impl core::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn expiry_is_relative_to_issue_time() {
        let token = AccessToken::expiring_in("abc", 300, t0());
        assert_eq!(token.expires_at(), Some(t0() + Duration::seconds(300)));
        assert!(!token.is_expired(t0() + Duration::seconds(299)));
        assert!(token.is_expired(t0() + Duration::seconds(300)));
    }

    #[test]
    fn token_without_expiry_never_expires() {
        let token = AccessToken::new("abc", None);
        assert!(!token.is_expired(t0() + Duration::days(365)));
    }

    #[test]
    fn missing_or_zero_lifetime_means_no_expiry() {
        for expires_in in [None, Some(0)] {
            let token = AccessToken::from_expires_in("abc", expires_in, t0());
            assert_eq!(token.expires_at(), None);
            assert!(!token.is_expired(t0() + Duration::days(1)));
        }
        let token = AccessToken::from_expires_in("abc", Some(60), t0());
        assert_eq!(token.expires_at(), Some(t0() + Duration::seconds(60)));
    }

    #[test]
    fn debug_output_redacts_value() {
        let token = AccessToken::new("super-secret", None);
        assert!(!format!("{token:?}").contains("super-secret"));
    }
}
