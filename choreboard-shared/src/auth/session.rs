/// Signed-in sessions
///
/// A [`Session`] is what the remote auth service hands back on sign-in: a
/// bearer token, a refresh token, the expiry, and the account it belongs
/// to. [`SessionStore`] keeps the current session in the device key-value
/// store so it can be restored on the next start.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::storage::{KeyValueStore, StorageError, StorageResult};

/// Storage key for the persisted session
pub const SESSION_STORAGE_KEY: &str = "choreboard.auth.session";

/// Account as reported by the remote auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Account ID, shared with the `users` profile row
    pub id: Uuid,

    #[serde(default)]
    pub email: String,

    /// When the signup email was confirmed; `None` while unverified
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    pub fn is_email_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

/// Bearer session for the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,

    pub refresh_token: String,

    /// Absolute expiry of `access_token`
    pub expires_at: DateTime<Utc>,

    pub user: AuthUser,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Persists the current session in a key-value store
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Loads the stored session, if any
    pub async fn load(&self) -> StorageResult<Option<Session>> {
        let Some(raw) = self.store.get_item(SESSION_STORAGE_KEY).await? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Corrupt(format!("stored session: {}", e)))
    }

    pub async fn save(&self, session: &Session) -> StorageResult<()> {
        let raw = serde_json::to_string(session)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        self.store.set_item(SESSION_STORAGE_KEY, &raw).await
    }

    pub async fn clear(&self) -> StorageResult<()> {
        self.store.remove_item(SESSION_STORAGE_KEY).await
    }
}
