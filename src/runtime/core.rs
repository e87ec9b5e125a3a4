//! Extension coordinator.
//!
//! The [`Extension`] owns the background context task and hands out
//! [`Connection`]s to transient contexts.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};
use url::Url;

use crate::background::{BackgroundResponder, ClosedSession, DispatchTable, PortRegistry};
use crate::error::Result;
use crate::protocol::MessageSender;
use crate::transport::{Connection, MessageBus};

use super::builder::ExtensionBuilder;

// ============================================================================
// Extension
// ============================================================================

/// A running extension: one background context plus the bus that
/// transient contexts use to reach it.
///
/// Dropping the extension stops the background as well;
/// [`shutdown`](Self::shutdown) additionally waits for it to finish.
///
/// # Examples
///
/// ```no_run
/// use webext_messaging::{Extension, Message};
///
/// # async fn example() -> webext_messaging::Result<()> {
/// let extension = Extension::builder().start()?;
///
/// let content = extension.content_script("https://example.com/", 1)?;
/// let response = content.send_request(Message::ping()).await?;
/// assert!(response.is_success());
///
/// extension.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct Extension {
    /// Bus to the background.
    bus: MessageBus,
    /// Open port sessions, shared with the background.
    ports: Arc<PortRegistry>,
    /// Stops the background when fired or dropped.
    shutdown_tx: oneshot::Sender<()>,
    /// The background task.
    task: JoinHandle<()>,
}

// ============================================================================
// Extension - Debug
// ============================================================================

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("port_count", &self.port_count())
            .field("running", &!self.task.is_finished())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Extension - Public API
// ============================================================================

impl Extension {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ExtensionBuilder {
        ExtensionBuilder::new()
    }

    /// Returns a connection for a content script on page `url` in tab
    /// `tab_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`](crate::Error::Url) if `url` does not parse.
    pub fn content_script(&self, url: &str, tab_id: u32) -> Result<Connection> {
        let url = Url::parse(url)?;
        Ok(self.connection(MessageSender::content(url, tab_id)))
    }

    /// Returns a connection for the popup.
    #[inline]
    #[must_use]
    pub fn popup(&self) -> Connection {
        self.connection(MessageSender::popup())
    }

    /// Returns a connection sending as `sender`.
    #[inline]
    #[must_use]
    pub fn connection(&self, sender: MessageSender) -> Connection {
        Connection::new(self.bus.clone(), sender)
    }

    /// Returns the number of open port sessions.
    #[inline]
    #[must_use]
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Returns the distinct names of open port sessions, sorted.
    #[inline]
    #[must_use]
    pub fn port_names(&self) -> Vec<String> {
        self.ports.names()
    }

    /// Subscribes to port sessions closed by their transient side.
    ///
    /// Each notice carries the session's name, its sender and the
    /// disconnect reason the peer gave.
    #[must_use]
    pub fn port_closures(&self) -> broadcast::Receiver<ClosedSession> {
        self.ports.subscribe_closed()
    }

    /// Stops the background context and waits for it to finish.
    ///
    /// Deferred requests still in flight fail with a channel error on the
    /// caller side; open ports are disconnected with
    /// [`SHUTDOWN_REASON`](crate::background::SHUTDOWN_REASON).
    pub async fn shutdown(self) {
        let Self {
            shutdown_tx, task, ..
        } = self;

        let _ = shutdown_tx.send(());
        if let Err(e) = task.await {
            error!(error = %e, "Background task failed");
        }

        info!("Extension shut down");
    }
}

// ============================================================================
// Extension - Internal API
// ============================================================================

impl Extension {
    /// Spawns the background context routing through `table`.
    pub(crate) fn spawn(table: DispatchTable) -> Self {
        let routes = table.len();
        let responder = BackgroundResponder::new(table);
        let ports = Arc::clone(responder.ports());
        let (bus, inbox) = MessageBus::new();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(responder.run(inbox, shutdown_rx));
        info!(routes, "Extension started");

        Self {
            bus,
            ports,
            shutdown_tx,
            task,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
