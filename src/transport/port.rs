//! Long-lived, named, bidirectional port sessions.
//!
//! A port is opened by a transient context with
//! [`Connection::connect`](super::Connection::connect) and accepted by the
//! background. Both sides post messages repeatedly without per-message
//! correlation; messages on a port arrive in send order.
//!
//! # State Machine
//!
//! ```text
//! Connecting ──accept──► Open ──disconnect──► Closed
//!      └──────────────disconnect─────────────────┘
//! ```
//!
//! `Closed` is terminal. Each side's state flips to `Closed` exactly once.
//! The side that did not request the closure learns about it through a
//! single [`PortEvent::Disconnected`] from [`Port::recv`], carrying an
//! error reason when the closure was abnormal. Posting on a closed port
//! fails with [`Error::PortClosed`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::PortId;
use crate::protocol::{Message, Response};

// ============================================================================
// Types
// ============================================================================

/// Port opened by a transient context: posts messages, receives responses.
pub type ClientPort = Port<Message, Response>;

/// Background end of a port: posts responses, receives messages.
pub type ServerPort = Port<Response, Message>;

/// Error reason when the underlying channel vanishes without a disconnect.
const CHANNEL_DROPPED: &str = "port channel dropped without disconnect";

/// Frames exchanged between the two ends of a port.
#[derive(Debug)]
enum PortFrame {
    /// Acceptor took the session.
    Accepted,
    /// Serialized payload.
    Message(String),
    /// Sender closed its end, with an optional error.
    Disconnect(Option<String>),
}

// ============================================================================
// PortState
// ============================================================================

/// Lifecycle state of one end of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    /// Opened, not yet accepted. Posting is allowed and queued.
    Connecting,
    /// Accepted by the other end.
    Open,
    /// Terminal.
    Closed,
}

// ============================================================================
// Disconnect / PortEvent
// ============================================================================

/// Closure notice delivered to the side that did not close the port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    /// Error reason if the closure was abnormal.
    pub error: Option<String>,
}

impl Disconnect {
    /// Returns `true` if the port was closed without an error.
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}

/// Something received on a port.
#[derive(Debug, Clone, PartialEq)]
pub enum PortEvent<T> {
    /// A message from the other end.
    Message(T),
    /// The other end closed the port. Delivered once.
    Disconnected(Disconnect),
}

// ============================================================================
// PortShared
// ============================================================================

/// State of one end, shared between the [`Port`] and its [`PortSender`]s.
struct PortShared {
    id: PortId,
    name: String,
    state: Mutex<PortState>,
    tx: mpsc::UnboundedSender<PortFrame>,
}

impl PortShared {
    fn state(&self) -> PortState {
        *self.state.lock()
    }

    fn send_frame(&self, frame: PortFrame) -> Result<()> {
        let state = self.state.lock();

        if *state == PortState::Closed {
            return Err(Error::port_closed(&self.name));
        }

        if self.tx.send(frame).is_err() {
            // Peer end is gone. State stays as is so `recv` still hands out
            // the disconnect notice queued before it went.
            warn!(port = %self.id, name = %self.name, "Peer dropped, post rejected");
            return Err(Error::port_closed(&self.name));
        }

        Ok(())
    }

    /// Closes this end. Returns `false` if it was already closed.
    fn close(&self, error: Option<String>) -> bool {
        let mut state = self.state.lock();

        if *state == PortState::Closed {
            return false;
        }

        *state = PortState::Closed;
        debug!(port = %self.id, name = %self.name, ?error, "Port disconnected");
        let _ = self.tx.send(PortFrame::Disconnect(error));
        true
    }

    fn mark_open(&self) {
        let mut state = self.state.lock();
        if *state == PortState::Connecting {
            *state = PortState::Open;
        }
    }

    fn mark_closed(&self) {
        *self.state.lock() = PortState::Closed;
    }
}

// ============================================================================
// Port
// ============================================================================

/// One end of a port session.
///
/// `Tx` is what this end posts, `Rx` what it receives. Payloads are
/// serialized across the boundary, so the two ends share no memory.
///
/// Dropping an open port disconnects it cleanly.
pub struct Port<Tx, Rx> {
    shared: Arc<PortShared>,
    rx: mpsc::UnboundedReceiver<PortFrame>,
    /// Set once the disconnect notice has been handed out.
    finished: bool,
    _marker: PhantomData<fn(Tx) -> Rx>,
}

impl<Tx, Rx> Port<Tx, Rx> {
    /// Creates both ends of a port named `name`, each `Connecting`.
    pub(crate) fn pair(name: impl Into<String>) -> (Port<Tx, Rx>, Port<Rx, Tx>) {
        let id = PortId::generate();
        let name = name.into();
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();

        let end = |tx| PortShared {
            id,
            name: name.clone(),
            state: Mutex::new(PortState::Connecting),
            tx,
        };

        let a = Port {
            shared: Arc::new(end(a_tx)),
            rx: a_rx,
            finished: false,
            _marker: PhantomData,
        };
        let b = Port {
            shared: Arc::new(end(b_tx)),
            rx: b_rx,
            finished: false,
            _marker: PhantomData,
        };

        (a, b)
    }

    /// Returns the port ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> PortId {
        self.shared.id
    }

    /// Returns the session name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns the current state of this end.
    #[inline]
    #[must_use]
    pub fn state(&self) -> PortState {
        self.shared.state()
    }

    /// Returns `true` once accepted and until closed.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == PortState::Open
    }

    /// Accepts the session and tells the initiator.
    pub(crate) fn accept(&self) -> Result<()> {
        self.shared.mark_open();
        self.shared.send_frame(PortFrame::Accepted)
    }

    /// Returns a cloneable handle that can post on this port.
    #[must_use]
    pub fn sender(&self) -> PortSender<Tx> {
        PortSender {
            shared: Arc::clone(&self.shared),
            _marker: PhantomData,
        }
    }

    /// Closes the port cleanly.
    pub fn disconnect(self) {
        self.shared.close(None);
    }

    /// Closes the port, reporting `error` to the other end.
    pub fn disconnect_with_error(self, error: impl Into<String>) {
        self.shared.close(Some(error.into()));
    }
}

impl<Tx: Serialize, Rx> Port<Tx, Rx> {
    /// Posts a message to the other end.
    ///
    /// # Errors
    ///
    /// - [`Error::PortClosed`] if this end is closed or the peer is gone
    /// - [`Error::Json`] if the message cannot be serialized
    pub fn post(&self, message: &Tx) -> Result<()> {
        post_on(&self.shared, message)
    }
}

impl<Tx, Rx: DeserializeOwned> Port<Tx, Rx> {
    /// Receives the next event from the other end.
    ///
    /// Returns `None` after the disconnect notice has been delivered, or
    /// once this end has been closed locally.
    pub async fn recv(&mut self) -> Option<PortEvent<Rx>> {
        loop {
            if self.finished || self.shared.state() == PortState::Closed {
                return None;
            }

            let Some(frame) = self.rx.recv().await else {
                self.finish();
                return Some(PortEvent::Disconnected(Disconnect {
                    error: Some(CHANNEL_DROPPED.to_string()),
                }));
            };

            match frame {
                PortFrame::Accepted => {
                    self.shared.mark_open();
                    trace!(port = %self.shared.id, "Port accepted");
                }

                PortFrame::Message(text) => match serde_json::from_str::<Rx>(&text) {
                    Ok(message) => return Some(PortEvent::Message(message)),
                    Err(e) => {
                        warn!(port = %self.shared.id, error = %e, "Failed to parse port message");
                    }
                },

                PortFrame::Disconnect(error) => {
                    self.finish();
                    debug!(
                        port = %self.shared.id,
                        name = %self.shared.name,
                        ?error,
                        "Peer disconnected"
                    );
                    return Some(PortEvent::Disconnected(Disconnect { error }));
                }
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.shared.mark_closed();
        self.rx.close();
    }
}

impl<Tx, Rx> Drop for Port<Tx, Rx> {
    fn drop(&mut self) {
        self.shared.close(None);
    }
}

impl<Tx, Rx> fmt::Debug for Port<Tx, Rx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PortSender
// ============================================================================

/// Cloneable posting handle for one end of a port.
///
/// Used to answer deferred messages after the receive loop has moved on.
pub struct PortSender<Tx> {
    shared: Arc<PortShared>,
    _marker: PhantomData<fn(Tx)>,
}

impl<Tx> Clone for PortSender<Tx> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            _marker: PhantomData,
        }
    }
}

impl<Tx> PortSender<Tx> {
    /// Returns the port ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> PortId {
        self.shared.id
    }

    /// Returns the session name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns `true` if this end is closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state() == PortState::Closed
    }

    /// Closes this end of the port.
    ///
    /// Returns `false` if it was already closed.
    pub fn disconnect(&self, error: Option<String>) -> bool {
        self.shared.close(error)
    }
}

impl<Tx: Serialize> PortSender<Tx> {
    /// Posts a message to the other end.
    ///
    /// # Errors
    ///
    /// Same as [`Port::post`].
    pub fn post(&self, message: &Tx) -> Result<()> {
        post_on(&self.shared, message)
    }
}

impl<Tx> fmt::Debug for PortSender<Tx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortSender")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .finish_non_exhaustive()
    }
}

fn post_on<T: Serialize>(shared: &PortShared, message: &T) -> Result<()> {
    if shared.state() == PortState::Closed {
        return Err(Error::port_closed(&shared.name));
    }
    let json = serde_json::to_string(message)?;
    shared.send_frame(PortFrame::Message(json))
}

// ============================================================================
// Tests
// ============================================================================
