//! Per-user dialog session store
//!
//! Holds every in-flight dialog, keyed by user id. Sessions are transient:
//! nothing survives a restart, and there is no expiry. A session lives until
//! it is cleared or overwritten by a newly started dialog.

use crate::bot::state::Session;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory session store
pub struct SessionStore {
    sessions: RwLock<HashMap<i64, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Clone out the user's session, if one is active
    pub async fn get(&self, user_id: i64) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(&user_id).cloned()
    }

    /// Store a session, replacing any previous one for the same user
    pub async fn set(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.user_id, session);
    }

    /// Drop the user's session, if any
    pub async fn clear(&self, user_id: i64) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&user_id);
    }
}
