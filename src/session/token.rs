//! Persisted resume token.
//!
//! Lives in the session-scoped store only. Holds the password proof so a
//! later run within the same session can re-authenticate silently.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

use crate::error::WalletResult;
use crate::storage::{KeyValueStore, SESSION_TOKEN};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// Key the session was unlocked with. `None` for a bootstrap session.
    pub active_key_id: Option<String>,
    /// Hex password proof.
    pub password_proof: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    pub last_activity: u64,
}

impl SessionToken {
    /// Read the token. Unparsable tokens are discarded and treated as absent.
    pub fn load(store: &dyn KeyValueStore) -> Option<SessionToken> {
        let raw = store.get(SESSION_TOKEN)?;
        match serde_json::from_str(&raw) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable session token");
                if let Err(e) = store.delete(SESSION_TOKEN) {
                    tracing::warn!(error = %e, "Failed to delete session token");
                }
                None
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> WalletResult<()> {
        store.put(SESSION_TOKEN, serde_json::to_string(self)?)
    }

    pub fn clear(store: &dyn KeyValueStore) -> WalletResult<()> {
        store.delete(SESSION_TOKEN)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("active_key_id", &self.active_key_id)
            .field("password_proof", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("last_activity", &self.last_activity)
            .finish()
    }
}

impl Drop for SessionToken {
    fn drop(&mut self) {
        self.password_proof.zeroize();
    }
}
