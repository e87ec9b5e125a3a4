//! Transient-context connection to the background.
//!
//! A [`Connection`] is what a content script or popup holds. It turns the
//! bus's one-shot primitive into an awaitable `send_request` and opens port
//! sessions.
//!
//! # Pending Calls
//!
//! Each outstanding `send_request` registers a pending call keyed by
//! [`RequestId`]. The entry is removed the moment the call resolves:
//!
//! - a response arrives → the call resolves with it, even if it is
//!   `success: false`
//! - the reply slot is dropped unanswered → [`Error::Channel`]
//!
//! Whichever comes first wins; a call never resolves twice. Channel errors
//! are checked before the payload is looked at. There is no retry and no
//! cancellation: once sent, a request runs to completion on the background.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Message, MessageKind, MessageSender, Response};

use super::bus::MessageBus;
use super::port::{ClientPort, Port};

// ============================================================================
// Constants
// ============================================================================

/// Maximum pending calls per connection before rejecting new ones.
pub const MAX_PENDING_CALLS: usize = 100;

// ============================================================================
// Types
// ============================================================================

/// Bookkeeping for an outstanding one-shot request.
#[derive(Debug, Clone)]
struct PendingCall {
    kind: MessageKind,
    sent_at: Instant,
}

/// Map of request IDs to outstanding calls.
type PendingMap = FxHashMap<RequestId, PendingCall>;

/// Removes the pending entry however the call ends, including when the
/// caller's future is dropped by a timeout.
struct PendingGuard {
    id: RequestId,
    pending: Arc<Mutex<PendingMap>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if let Some(call) = self.pending.lock().remove(&self.id) {
            trace!(
                id = %self.id,
                kind = %call.kind,
                elapsed_ms = call.sent_at.elapsed().as_millis() as u64,
                "Pending call settled"
            );
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// A transient context's handle to the background.
///
/// Cheap to clone; clones share the pending-call registry.
#[derive(Clone)]
pub struct Connection {
    /// Identity stamped on every message and port.
    sender: MessageSender,
    /// Bus to the background.
    bus: MessageBus,
    /// Outstanding calls.
    pending: Arc<Mutex<PendingMap>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("sender", &self.sender)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Creates a connection for `sender` over `bus`.
    #[must_use]
    pub fn new(bus: MessageBus, sender: MessageSender) -> Self {
        Self {
            sender,
            bus,
            pending: Arc::new(Mutex::new(PendingMap::default())),
        }
    }

    /// Returns the identity this connection sends as.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> &MessageSender {
        &self.sender
    }

    /// Returns the number of outstanding calls.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Sends a message and waits for its response.
    ///
    /// Resolves with the background's [`Response`] as-is; a
    /// `success: false` response is a normal outcome, not an `Err`.
    ///
    /// # Errors
    ///
    /// - [`Error::Channel`] if the background is gone or closes the call
    ///   without answering
    /// - [`Error::Protocol`] if too many calls are pending or the reply is
    ///   malformed
    /// - [`Error::Json`] if the message cannot be serialized
    pub async fn send_request(&self, message: Message) -> Result<Response> {
        let (id, reply_rx, _guard) = self.submit(message)?;

        // Channel failure first: never read a payload from a dead call.
        let body = reply_rx.await.map_err(|_| {
            debug!(%id, "Call closed without a response");
            Error::closed_before_response()
        })?;

        serde_json::from_str::<Response>(&body)
            .map_err(|e| Error::protocol(format!("Malformed response for {id}: {e}")))
    }

    /// Like [`send_request`](Self::send_request), but gives up after
    /// `request_timeout`.
    ///
    /// The background still completes the request; only the wait ends.
    ///
    /// # Errors
    ///
    /// As [`send_request`](Self::send_request), plus
    /// [`Error::RequestTimeout`].
    pub async fn send_request_with_timeout(
        &self,
        message: Message,
        request_timeout: Duration,
    ) -> Result<Response> {
        let (id, reply_rx, guard) = self.submit(message)?;

        match timeout(request_timeout, reply_rx).await {
            Ok(Ok(body)) => serde_json::from_str::<Response>(&body)
                .map_err(|e| Error::protocol(format!("Malformed response for {id}: {e}"))),
            Ok(Err(_)) => Err(Error::closed_before_response()),
            Err(_) => {
                drop(guard);
                Err(Error::request_timeout(
                    id,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Opens a port session named `name`.
    ///
    /// The port starts [`Connecting`](super::PortState::Connecting) and
    /// becomes `Open` once the background accepts it. Messages posted
    /// before that are queued.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Channel`] if no background is listening.
    pub fn connect(&self, name: impl Into<String>) -> Result<ClientPort> {
        let (client, server) = Port::pair(name);
        debug!(port = %client.id(), name = %client.name(), "Opening port");
        self.bus.send_connect(self.sender.clone(), server)?;
        Ok(client)
    }

    /// Registers a pending call and puts the message on the bus.
    fn submit(
        &self,
        message: Message,
    ) -> Result<(RequestId, oneshot::Receiver<String>, PendingGuard)> {
        let id = RequestId::generate();
        let kind = message.kind.clone();

        {
            let mut pending = self.pending.lock();
            if pending.len() >= MAX_PENDING_CALLS {
                warn!(
                    pending = pending.len(),
                    max = MAX_PENDING_CALLS,
                    "Too many pending calls"
                );
                return Err(Error::protocol(format!(
                    "Too many pending calls: {}/{}",
                    pending.len(),
                    MAX_PENDING_CALLS
                )));
            }
            pending.insert(
                id,
                PendingCall {
                    kind: kind.clone(),
                    sent_at: Instant::now(),
                },
            );
        }

        let guard = PendingGuard {
            id,
            pending: Arc::clone(&self.pending),
        };

        let body = serde_json::to_string(&message)?;
        let reply_rx = self.bus.send_one_shot(id, self.sender.clone(), body)?;

        trace!(%id, %kind, "Request sent");
        Ok((id, reply_rx, guard))
    }
}

// ============================================================================
// Tests
// ============================================================================
