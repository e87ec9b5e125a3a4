//! Background responder event loop.
//!
//! The responder drains the bus [`Inbox`] and answers every envelope:
//!
//! ```text
//! Inbox ──► OneShot ──► DispatchTable ──► Immediate ──► ReplySlot
//!                                   └───► Deferred ───► JoinSet ──► ReplySlot
//!
//! Inbox ──► Connect ──► accept ──► PortRegistry
//!                             └──► serve_port (one task per session)
//! ```
//!
//! Deferred work runs on a [`JoinSet`] owned by the loop. On shutdown every
//! port session is closed with [`SHUTDOWN_REASON`] and outstanding tasks are
//! aborted; their reply slots drop unanswered and callers see a channel
//! error.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, trace, warn};

use crate::protocol::{Message, MessageSender, Response};
use crate::transport::{Envelope, Inbox, PortEvent, ServerPort};

use super::config::ResponderConfig;
use super::dispatch::{Dispatch, DispatchTable, Origin};
use super::registry::{PortRegistry, PortSession};

// ============================================================================
// Constants
// ============================================================================

/// Error reported to open ports when the background stops.
pub const SHUTDOWN_REASON: &str = "background context shut down";

// ============================================================================
// BackgroundResponder
// ============================================================================

/// The long-lived background context.
///
/// Cheap to clone; clones share the dispatch table and port registry.
#[derive(Debug, Clone)]
pub struct BackgroundResponder {
    table: Arc<DispatchTable>,
    ports: Arc<PortRegistry>,
}

impl BackgroundResponder {
    /// Creates a responder routing through `table`.
    #[must_use]
    pub fn new(table: DispatchTable) -> Self {
        Self {
            table: Arc::new(table),
            ports: Arc::new(PortRegistry::new()),
        }
    }

    /// Creates a responder with the standard table for `config`.
    #[must_use]
    pub fn with_config(config: &ResponderConfig) -> Self {
        Self::new(DispatchTable::standard(config))
    }

    /// Returns the dispatch table.
    #[inline]
    #[must_use]
    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Returns the registry of open port sessions.
    #[inline]
    #[must_use]
    pub fn ports(&self) -> &Arc<PortRegistry> {
        &self.ports
    }

    /// Computes the answer to one message without any transport.
    #[inline]
    #[must_use]
    pub fn dispatch(&self, message: Message, origin: &Origin) -> Dispatch {
        self.table.dispatch(message, origin)
    }

    /// Dispatches a serialized message; a body that does not parse is
    /// answered immediately with a failure.
    fn dispatch_body(&self, body: &str, origin: &Origin) -> Dispatch {
        match serde_json::from_str::<Message>(body) {
            Ok(message) => self.dispatch(message, origin),
            Err(e) => {
                warn!(error = %e, "Malformed message");
                Dispatch::immediate(Response::failure(format!("malformed message: {e}")))
            }
        }
    }

    /// Runs until `shutdown` fires or every bus sender is gone.
    pub(crate) async fn run(self, mut inbox: Inbox, mut shutdown: oneshot::Receiver<()>) {
        let mut tasks = JoinSet::new();
        info!("Background responder started");

        loop {
            tokio::select! {
                envelope = inbox.recv() => {
                    match envelope {
                        Some(envelope) => self.handle_envelope(envelope, &mut tasks),
                        None => {
                            debug!("Message bus closed");
                            break;
                        }
                    }
                }

                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    log_join(result);
                }

                _ = &mut shutdown => {
                    debug!("Shutdown signal received");
                    break;
                }
            }
        }

        let closed = self.ports.close_all(SHUTDOWN_REASON);
        let aborted = tasks.len();
        tasks.shutdown().await;

        inbox.close();
        let mut refused = 0usize;
        while let Ok(envelope) = inbox.try_recv() {
            // Queued one-shot calls fail through their dropped reply slot.
            if let Envelope::Connect { port, .. } = envelope {
                port.disconnect_with_error(SHUTDOWN_REASON);
                refused += 1;
            }
        }

        info!(ports = closed, aborted, refused, "Background responder stopped");
    }

    fn handle_envelope(&self, envelope: Envelope, tasks: &mut JoinSet<()>) {
        match envelope {
            Envelope::OneShot {
                id,
                sender,
                body,
                reply,
            } => {
                let origin = Origin::one_shot(sender);
                match self.dispatch_body(&body, &origin) {
                    Dispatch::Immediate(response) => {
                        trace!(%id, success = response.is_success(), "Immediate reply");
                        reply.send(&response);
                    }
                    Dispatch::Deferred(future) => {
                        trace!(%id, "Deferred reply");
                        tasks.spawn(async move {
                            let response = future.await;
                            reply.send(&response);
                        });
                    }
                }
            }

            Envelope::Connect { sender, port } => {
                if let Err(e) = port.accept() {
                    warn!(port = %port.id(), error = %e, "Port closed before accept");
                    return;
                }

                self.ports.insert(PortSession {
                    sender: sender.clone(),
                    port: port.sender(),
                });

                tasks.spawn(serve_port(
                    Arc::clone(&self.table),
                    Arc::clone(&self.ports),
                    sender,
                    port,
                ));
            }
        }
    }
}

// ============================================================================
// Port Sessions
// ============================================================================

/// Answers messages on one port until either side disconnects.
///
/// Replies are posted in completion order, so an immediate answer may
/// overtake a deferred one posted earlier.
async fn serve_port(
    table: Arc<DispatchTable>,
    ports: Arc<PortRegistry>,
    sender: MessageSender,
    mut port: ServerPort,
) {
    let id = port.id();
    let origin = Origin::port(sender, port.name());
    let mut replies = JoinSet::new();

    info!(port = %id, name = %port.name(), "Port session open");

    loop {
        tokio::select! {
            event = port.recv() => {
                match event {
                    Some(PortEvent::Message(message)) => {
                        match table.dispatch(message, &origin) {
                            Dispatch::Immediate(response) => {
                                if let Err(e) = port.post(&response) {
                                    debug!(port = %id, error = %e, "Reply not posted");
                                }
                            }
                            Dispatch::Deferred(future) => {
                                let poster = port.sender();
                                replies.spawn(async move {
                                    let response = future.await;
                                    if let Err(e) = poster.post(&response) {
                                        debug!(port = %poster.id(), error = %e, "Deferred reply not posted");
                                    }
                                });
                            }
                        }
                    }

                    Some(PortEvent::Disconnected(disconnect)) => {
                        info!(port = %id, error = ?disconnect.error, "Port session closed by peer");
                        ports.peer_closed(id, disconnect);
                        return;
                    }

                    None => break,
                }
            }

            Some(result) = replies.join_next(), if !replies.is_empty() => {
                log_join(result);
            }
        }
    }

    ports.remove(id);
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result
        && !e.is_cancelled()
    {
        error!(error = %e, "Reply task failed");
    }
}

// ============================================================================
// Tests
// ============================================================================
