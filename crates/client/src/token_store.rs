//! In-memory access-token holder.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use careerhub_auth::AccessToken;

/// Process-wide slot for the current access token.
///
/// Cheap to clone; all clones share one slot. The GraphQL client is handed a
/// clone at construction and reads it on every request, so a `set` is visible
/// to the very next call. The store never parses or verifies token contents.
#[derive(Clone, Default)]
pub struct TokenStore {
    slot: Arc<RwLock<Option<AccessToken>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current credential. Always a full replacement: passing
    /// `None` for the token clears the slot regardless of `expiry`.
    pub fn set(&self, token: Option<String>, expiry: Option<DateTime<Utc>>) {
        self.replace(token.map(|t| AccessToken::new(t, expiry)));
    }

    pub fn replace(&self, token: Option<AccessToken>) {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    pub fn get(&self) -> Option<String> {
        self.read(|t| t.value().to_string())
    }

    pub fn current(&self) -> Option<AccessToken> {
        self.read(AccessToken::clone)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read(AccessToken::expires_at).flatten()
    }

    /// `true` when there is no token or the token is past its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.read(|t| t.is_expired(now)).unwrap_or(true)
    }

    pub fn clear(&self) {
        self.replace(None);
    }

    fn read<T>(&self, f: impl FnOnce(&AccessToken) -> T) -> Option<T> {
        self.slot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(f)
    }
}

impl core::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenStore")
            .field("current", &self.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn clones_share_one_slot() {
        let store = TokenStore::new();
        let reader = store.clone();
        store.set(Some("a".to_string()), None);
        assert_eq!(reader.get().as_deref(), Some("a"));
        reader.clear();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn setting_none_drops_expiry_too() {
        let store = TokenStore::new();
        let exp = DateTime::from_timestamp(1_700_000_300, 0);
        store.set(Some("a".to_string()), exp);
        assert_eq!(store.expires_at(), exp);

        store.set(None, exp);
        assert_eq!(store.get(), None);
        assert_eq!(store.expires_at(), None);
    }

    #[test]
    fn empty_store_counts_as_expired() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let store = TokenStore::new();
        assert!(store.is_expired(now));

        store.set(Some("a".to_string()), DateTime::from_timestamp(1_700_000_060, 0));
        assert!(!store.is_expired(now));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of `set` calls, the store holds exactly
        /// the last value written (no merge with earlier writes).
        #[test]
        fn last_write_wins(
            writes in prop::collection::vec(
                (prop::option::of("[A-Za-z0-9._-]{1,32}"), prop::option::of(0i64..4_000_000_000i64)),
                1..20
            )
        ) {
            let store = TokenStore::new();
            for (token, expiry) in &writes {
                let expiry = expiry.and_then(|s| DateTime::from_timestamp(s, 0));
                store.set(token.clone(), expiry);

                prop_assert_eq!(store.get(), token.clone());
                let expected_expiry = if token.is_some() { expiry } else { None };
                prop_assert_eq!(store.expires_at(), expected_expiry);
            }
        }
    }
}
