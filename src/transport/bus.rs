//! In-process message bus between extension contexts.
//!
//! Models the two platform primitives every transient context has:
//!
//! - **one-shot send**: deliver a message with a reply callback
//!   ([`ReplySlot`]); the callback is invoked at most once
//! - **connect**: hand the background one end of a new [`Port`](super::Port)
//!
//! Everything crossing the bus is serialized, so contexts never share
//! memory. The background drains the [`Inbox`]; when it is gone, sends fail
//! and dropped reply slots surface as channel errors on the caller side.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::{mpsc, oneshot};
use tracing::{error, trace};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{MessageSender, Response};

use super::port::ServerPort;

// ============================================================================
// Envelope
// ============================================================================

/// Something delivered to the background context.
#[derive(Debug)]
pub enum Envelope {
    /// A one-shot message awaiting a reply.
    OneShot {
        /// Correlation ID, for diagnostics.
        id: RequestId,
        /// Sending context.
        sender: MessageSender,
        /// Serialized [`Message`](crate::protocol::Message).
        body: String,
        /// Where the response goes.
        reply: ReplySlot,
    },
    /// A new port session.
    Connect {
        /// Opening context.
        sender: MessageSender,
        /// Background end of the port.
        port: ServerPort,
    },
}

// ============================================================================
// ReplySlot
// ============================================================================

/// Reply callback for a one-shot message.
///
/// Consumed by [`ReplySlot::send`]. Dropping it unsent closes the call
/// without a response, which the caller sees as a channel error.
#[derive(Debug)]
pub struct ReplySlot {
    id: RequestId,
    tx: oneshot::Sender<String>,
}

impl ReplySlot {
    /// Returns the request this slot answers.
    #[inline]
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Sends the response.
    ///
    /// Returns `false` if the caller is no longer waiting.
    pub fn send(self, response: &Response) -> bool {
        let json = match serde_json::to_string(response) {
            Ok(json) => json,
            Err(e) => {
                error!(id = %self.id, error = %e, "Failed to serialize response");
                return false;
            }
        };

        let delivered = self.tx.send(json).is_ok();
        if !delivered {
            trace!(id = %self.id, "Caller went away before reply");
        }
        delivered
    }

    /// Sends an arbitrary body, bypassing response serialization.
    #[cfg(test)]
    pub(crate) fn send_raw(self, body: impl Into<String>) -> bool {
        self.tx.send(body.into()).is_ok()
    }
}

// ============================================================================
// MessageBus
// ============================================================================

/// Receiving side of the bus, owned by the background context.
pub type Inbox = mpsc::UnboundedReceiver<Envelope>;

/// Sending side of the bus, shared by transient contexts.
#[derive(Debug, Clone)]
pub struct MessageBus {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl MessageBus {
    /// Creates a bus and the inbox the background listens on.
    #[must_use]
    pub fn new() -> (Self, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns `true` if the background is no longer listening.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Delivers a one-shot message.
    ///
    /// Returns the receiver that resolves with the serialized response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Channel`] if no background is listening.
    pub(crate) fn send_one_shot(
        &self,
        id: RequestId,
        sender: MessageSender,
        body: String,
    ) -> Result<oneshot::Receiver<String>> {
        let (tx, rx) = oneshot::channel();
        let envelope = Envelope::OneShot {
            id,
            sender,
            body,
            reply: ReplySlot { id, tx },
        };

        self.tx.send(envelope).map_err(|_| Error::no_receiver())?;
        Ok(rx)
    }

    /// Hands the background end of a new port to the background.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Channel`] if no background is listening.
    pub(crate) fn send_connect(&self, sender: MessageSender, port: ServerPort) -> Result<()> {
        self.tx
            .send(Envelope::Connect { sender, port })
            .map_err(|_| Error::no_receiver())
    }
}

// ============================================================================
// Tests
// ============================================================================
