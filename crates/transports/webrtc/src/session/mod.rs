//! Session lifecycle
//!
//! One [`Session`] per negotiated connection: it owns the peer connection
//! handle, the pump tasks feeding its track pipes, and a lifecycle state
//! driven by the negotiator's event loop. Sessions are registered in a
//! [`SessionRegistry`] from the moment an offer is accepted until they are
//! closed.

pub mod negotiator;
pub mod registry;

pub use negotiator::{AnswerDescription, Negotiator, SessionEvent};
pub use registry::SessionRegistry;

use crate::Result;
use framepipe_core::Transform;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;
use webrtc::peer_connection::RTCPeerConnection;

/// Opaque handle identifying one negotiated connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a session
///
/// `Created → Negotiating → Connected → Closed`, with `Failed` branching in
/// from transport failure at any point after creation. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Offer accepted, session object allocated
    Created,
    /// Offer/answer exchange in progress
    Negotiating,
    /// Transport reported success
    Connected,
    /// Transport reported failure; close is in flight
    Failed,
    /// Cleanup complete
    Closed,
}

impl SessionState {
    /// Whether this state has no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

/// One negotiated connection and everything it owns
pub struct Session {
    id: SessionId,
    transform: Transform,
    peer_connection: Arc<RTCPeerConnection>,
    state: RwLock<SessionState>,
    /// Pump tasks feeding this session's track pipes
    pumps: Mutex<Vec<JoinHandle<()>>>,
    /// Async close gate: `true` once cleanup has completed. Concurrent
    /// closers queue on the lock, so close() returning means cleanup is
    /// done no matter who performed it.
    closed: tokio::sync::Mutex<bool>,
}

impl Session {
    /// Allocate a session over a freshly built peer connection
    pub fn new(transform: Transform, peer_connection: Arc<RTCPeerConnection>) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId::new(),
            transform,
            peer_connection,
            state: RwLock::new(SessionState::Created),
            pumps: Mutex::new(Vec::new()),
            closed: tokio::sync::Mutex::new(false),
        })
    }

    /// Session identifier
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Transform selected for this session's track pipes
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Record a lifecycle transition
    pub(crate) fn set_state(&self, next: SessionState) {
        let mut state = self.state.write();
        debug!(session = %self.id, from = ?*state, to = ?next, "session state transition");
        *state = next;
    }

    /// Peer connection this session exclusively manages
    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.peer_connection
    }

    /// Track a pump task so close() can interrupt it
    pub(crate) fn add_pump(&self, handle: JoinHandle<()>) {
        self.pumps.lock().push(handle);
    }

    /// Number of live track pipes attached to this session
    pub fn pipe_count(&self) -> usize {
        self.pumps.lock().len()
    }

    /// Close the session and release its resources
    ///
    /// Idempotent. Aborts every pump task (bounding interruption of an
    /// in-flight frame pull to one frame interval), closes the peer
    /// connection, and lands in `Closed` regardless of what the engine
    /// reports on the way down. A closed session holds no track pipes.
    pub async fn close(&self) -> Result<()> {
        let mut closed = self.closed.lock().await;
        if *closed {
            return Ok(());
        }

        let pumps = std::mem::take(&mut *self.pumps.lock());
        for pump in &pumps {
            pump.abort();
        }

        let result = self.peer_connection.close().await;
        self.set_state(SessionState::Closed);
        *closed = true;

        if let Err(e) = result {
            warn!(session = %self.id, "peer connection close reported: {e}");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("transform", &self.transform)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
