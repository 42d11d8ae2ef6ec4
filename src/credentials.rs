//! Reconnection credentials and the store that guards their expiry.
//!
//! A [`ReconnectionCredential`] is a short-lived secret that lets the client
//! resume a specific prior room connection without re-authenticating. One is
//! persisted per room kind (lobby, preparation) through an external
//! [`CredentialStore`] collaborator.
//!
//! The [`TokenStore`] wrapper enforces expiry itself: an expired credential
//! is deleted on load and never returned, so it can never be presented to
//! the server by any caller.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Storage key for the lobby reconnection credential.
pub const LOBBY_CREDENTIAL_KEY: &str = "lounge.credential.lobby";

/// Storage key for the preparation-room reconnection credential.
pub const PREPARATION_CREDENTIAL_KEY: &str = "lounge.credential.preparation";

/// Default TTL for the lobby credential.
pub const LOBBY_CREDENTIAL_TTL: Duration = Duration::from_secs(5 * 60);

/// Default TTL for the preparation-room credential.
pub const PREPARATION_CREDENTIAL_TTL: Duration = Duration::from_secs(30);

/// A persisted credential for resuming one specific room connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconnectionCredential {
    /// Opaque server-issued reconnection token.
    pub token: String,
    /// The room this token resumes.
    pub room_id: String,
    /// Expiry as unix seconds. Enforced by [`TokenStore`], not by callers.
    pub expires_at: u64,
}

impl ReconnectionCredential {
    /// Create a credential expiring `ttl` from now.
    pub fn issued(token: impl Into<String>, room_id: impl Into<String>, ttl: Duration) -> Self {
        Self {
            token: token.into(),
            room_id: room_id.into(),
            expires_at: unix_now().saturating_add(ttl.as_secs()),
        }
    }

    /// Whether the credential is expired at `now` (unix seconds).
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at <= now
    }
}

/// Current time as unix seconds.
///
/// A clock before the epoch reads as 0, which makes every credential look
/// expired — the safe direction.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// External key/value persistence with TTL for reconnection credentials.
///
/// Implemented by the embedding application (platform local storage, a
/// settings database, etc.). The store's own TTL eviction is a second line
/// of defense; [`TokenStore`] checks `expires_at` regardless, so a store
/// without native TTL support may ignore the `ttl` argument.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Fetch the credential stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<ReconnectionCredential>>;

    /// Persist `credential` under `key` with the given time-to-live.
    async fn set(
        &self,
        key: &str,
        credential: &ReconnectionCredential,
        ttl: Duration,
    ) -> Result<()>;

    /// Remove the credential stored under `key`. Absent keys are a no-op.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Expiry-enforcing facade over a [`CredentialStore`].
///
/// Cloneable; all clones share the underlying store.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn CredentialStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Load the credential under `key`, returning `None` for absent or
    /// expired entries. Expired entries are deleted on the spot — an expired
    /// credential must never be presented to the server.
    ///
    /// # Errors
    ///
    /// Propagates [`LoungeError::Storage`](crate::error::LoungeError::Storage)
    /// from the underlying store.
    pub async fn load(&self, key: &str) -> Result<Option<ReconnectionCredential>> {
        let Some(credential) = self.store.get(key).await? else {
            return Ok(None);
        };
        if credential.is_expired_at(unix_now()) {
            debug!(key, room_id = %credential.room_id, "discarding expired credential");
            self.store.delete(key).await?;
            return Ok(None);
        }
        Ok(Some(credential))
    }

    /// Persist a freshly issued credential under `key` with the given TTL.
    ///
    /// # Errors
    ///
    /// Propagates [`LoungeError::Storage`](crate::error::LoungeError::Storage)
    /// from the underlying store.
    pub async fn save(
        &self,
        key: &str,
        token: &str,
        room_id: &str,
        ttl: Duration,
    ) -> Result<ReconnectionCredential> {
        let credential = ReconnectionCredential::issued(token, room_id, ttl);
        self.store.set(key, &credential, ttl).await?;
        debug!(key, room_id, ttl_secs = ttl.as_secs(), "credential persisted");
        Ok(credential)
    }

    /// Remove the credential under `key` (used after a failed reconnect —
    /// the token is assumed consumed or invalid and is never retried).
    ///
    /// # Errors
    ///
    /// Propagates [`LoungeError::Storage`](crate::error::LoungeError::Storage)
    /// from the underlying store.
    pub async fn discard(&self, key: &str) -> Result<()> {
        self.store.delete(key).await
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    /// Minimal in-memory store for unit-testing the expiry facade.
    #[derive(Default)]
    struct MapStore {
        entries: StdMutex<HashMap<String, ReconnectionCredential>>,
    }

    #[async_trait]
    impl CredentialStore for MapStore {
        async fn get(&self, key: &str) -> Result<Option<ReconnectionCredential>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(
            &self,
            key: &str,
            credential: &ReconnectionCredential,
            _ttl: Duration,
        ) -> Result<()> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), credential.clone());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn load_returns_live_credential() {
        let store = Arc::new(MapStore::default());
        let tokens = TokenStore::new(Arc::clone(&store) as Arc<dyn CredentialStore>);

        tokens
            .save(LOBBY_CREDENTIAL_KEY, "abc", "lobby1", Duration::from_secs(300))
            .await
            .unwrap();

        let loaded = tokens.load(LOBBY_CREDENTIAL_KEY).await.unwrap().unwrap();
        assert_eq!(loaded.token, "abc");
        assert_eq!(loaded.room_id, "lobby1");
    }

    #[tokio::test]
    async fn load_deletes_and_hides_expired_credential() {
        let store = Arc::new(MapStore::default());
        let tokens = TokenStore::new(Arc::clone(&store) as Arc<dyn CredentialStore>);

        let stale = ReconnectionCredential {
            token: "abc".into(),
            room_id: "lobby1".into(),
            expires_at: unix_now().saturating_sub(1),
        };
        store
            .set(LOBBY_CREDENTIAL_KEY, &stale, Duration::from_secs(0))
            .await
            .unwrap();

        assert!(tokens.load(LOBBY_CREDENTIAL_KEY).await.unwrap().is_none());
        // The stale entry must be gone from the underlying store too.
        assert!(store.get(LOBBY_CREDENTIAL_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn discard_removes_entry() {
        let store = Arc::new(MapStore::default());
        let tokens = TokenStore::new(Arc::clone(&store) as Arc<dyn CredentialStore>);

        tokens
            .save(PREPARATION_CREDENTIAL_KEY, "tok", "prep42", Duration::from_secs(30))
            .await
            .unwrap();
        tokens.discard(PREPARATION_CREDENTIAL_KEY).await.unwrap();

        assert!(tokens
            .load(PREPARATION_CREDENTIAL_KEY)
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let credential = ReconnectionCredential {
            token: "t".into(),
            room_id: "r".into(),
            expires_at: 1_000,
        };
        assert!(credential.is_expired_at(1_000));
        assert!(credential.is_expired_at(1_001));
        assert!(!credential.is_expired_at(999));
    }
}
