//! Process-wide registry of live sessions
//!
//! The registry is the only state shared across sessions. It is handed
//! around as an `Arc` (HTTP state, shutdown hook, each session's own
//! failure handler) rather than reached through a global. Membership
//! mutations are atomic behind one lock; nothing async happens while it is
//! held.

use crate::session::{Session, SessionId, SessionState};
use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Collection of every session not yet closed
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live session
    pub fn add(&self, session: Arc<Session>) {
        self.sessions.write().insert(session.id(), session);
    }

    /// Look up a session by id
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Deregister a session
    ///
    /// Idempotent: removing an absent session is a no-op returning `None`.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.write().remove(id)
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Close every registered session and clear the registry
    ///
    /// A barrier, not fire-and-forget: closes run concurrently and this
    /// returns only after every one of them has completed. Afterwards the
    /// registry is empty and every previously registered session is
    /// `Closed`.
    pub async fn close_all(&self) {
        let sessions: Vec<Arc<Session>> = self.sessions.read().values().cloned().collect();
        if sessions.is_empty() {
            return;
        }

        info!(count = sessions.len(), "closing all sessions");
        let results = join_all(sessions.iter().map(|s| s.close())).await;
        for (session, result) in sessions.iter().zip(results) {
            if let Err(e) = result {
                warn!(session = %session.id(), "close during shutdown reported: {e}");
            }
            debug_assert_eq!(session.state(), SessionState::Closed);
        }

        self.sessions.write().clear();
        info!("session registry cleared");
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("len", &self.len())
            .finish()
    }
}
