//! Registry of open port sessions in the background context.
//!
//! Created once when the background starts and lives as long as it does.
//! Sessions are keyed by [`PortId`] since several content scripts may open
//! ports with the same name; lookups by name aggregate over them.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                PortRegistry                  │
//! │  PortId(a) → "content-script-port" (tab 3)   │
//! │  PortId(b) → "content-script-port" (tab 7)   │
//! │  PortId(c) → "popup-port"                    │
//! └──────────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::identifiers::PortId;
use crate::protocol::{MessageSender, Response};
use crate::transport::{Disconnect, PortSender};

// ============================================================================
// Constants
// ============================================================================

/// Buffered closure notices per subscriber before old ones are dropped.
const CLOSURE_CAPACITY: usize = 64;

// ============================================================================
// PortSession
// ============================================================================

/// An open session as seen by the background.
#[derive(Debug, Clone)]
pub struct PortSession {
    /// Context that opened the port.
    pub sender: MessageSender,
    /// Posting handle for the background end.
    pub port: PortSender<Response>,
}

/// A session closed by the transient side, as seen by the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
    /// Port ID.
    pub id: PortId,
    /// Session name.
    pub name: String,
    /// Context that had opened the port.
    pub sender: MessageSender,
    /// How the peer closed it.
    pub disconnect: Disconnect,
}

// ============================================================================
// PortRegistry
// ============================================================================

/// Open port sessions by ID.
#[derive(Debug)]
pub struct PortRegistry {
    sessions: RwLock<FxHashMap<PortId, PortSession>>,
    closures: broadcast::Sender<ClosedSession>,
}

impl Default for PortRegistry {
    fn default() -> Self {
        let (closures, _) = broadcast::channel(CLOSURE_CAPACITY);
        Self {
            sessions: RwLock::new(FxHashMap::default()),
            closures,
        }
    }
}

impl PortRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to sessions closed by their transient side.
    ///
    /// Each closure is announced once, with the peer's error reason if the
    /// closure was abnormal. Closures by [`close_all`](Self::close_all) are
    /// not announced.
    #[must_use]
    pub fn subscribe_closed(&self) -> broadcast::Receiver<ClosedSession> {
        self.closures.subscribe()
    }

    /// Removes a session the peer closed and announces it.
    pub(crate) fn peer_closed(&self, id: PortId, disconnect: Disconnect) {
        let Some(session) = self.remove(id) else {
            return;
        };

        let closed = ClosedSession {
            id,
            name: session.port.name().to_string(),
            sender: session.sender,
            disconnect,
        };
        // No subscribers is fine.
        let _ = self.closures.send(closed);
    }

    /// Registers a session.
    pub fn insert(&self, session: PortSession) {
        let id = session.port.id();
        debug!(port = %id, name = %session.port.name(), "Port session registered");
        self.sessions.write().insert(id, session);
    }

    /// Removes a session, returning it if present.
    pub fn remove(&self, id: PortId) -> Option<PortSession> {
        let removed = self.sessions.write().remove(&id);
        if removed.is_some() {
            debug!(port = %id, "Port session removed");
        }
        removed
    }

    /// Returns the number of open sessions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns `true` if no session is open.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Returns the number of open sessions named `name`.
    #[must_use]
    pub fn count_named(&self, name: &str) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|session| session.port.name() == name)
            .count()
    }

    /// Returns the distinct names of open sessions, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .sessions
            .read()
            .values()
            .map(|session| session.port.name().to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Closes every session with `reason` and empties the registry.
    ///
    /// Returns the number of sessions closed.
    pub fn close_all(&self, reason: &str) -> usize {
        let sessions: Vec<_> = self.sessions.write().drain().collect();
        let count = sessions
            .iter()
            .filter(|(_, session)| session.port.disconnect(Some(reason.to_string())))
            .count();

        if count > 0 {
            info!(count, reason, "Closed port sessions");
        }
        count
    }
}

// ============================================================================
// Tests
// ============================================================================
