//! WebExtension messaging - request/response and port sessions between
//! extension contexts.
//!
//! An extension runs one long-lived **background** context and any number
//! of transient **content script** and **popup** contexts. Transient
//! contexts reach the background two ways:
//!
//! - **one-shot**: [`Connection::send_request`] sends a [`Message`] and
//!   awaits exactly one [`Response`]
//! - **port**: [`Connection::connect`] opens a named, bidirectional
//!   session that stays open until either side disconnects
//!
//! Key design principles:
//!
//! - Contexts share no memory; everything crossing a boundary is JSON
//! - Domain failures travel inside a `success: false` [`Response`]; only
//!   channel failures are `Err`
//! - A handler declares up front whether it answers immediately or later
//!   ([`Dispatch`]), so a deferred answer always has an open channel
//! - A fault in one handler never affects other messages
//!
//! # Quick Start
//!
//! ```no_run
//! use webext_messaging::{Extension, Message, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let extension = Extension::builder().start()?;
//!
//!     let content = extension.content_script("https://example.com/", 1)?;
//!     let response = content.send_request(Message::process_text("hello")).await?;
//!     println!("{:?}", response.get_str());
//!
//!     extension.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`background`] | Responder, dispatch table and handlers |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Message and response schema |
//! | [`runtime`] | [`Extension`] and its builder |
//! | [`transport`] | Message bus, connections and ports |

// ============================================================================
// Modules
// ============================================================================

/// Background context: responder, dispatch and handlers.
pub mod background;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for requests and ports.
pub mod identifiers;

/// Message schema shared by all contexts.
pub mod protocol;

/// Extension wiring.
pub mod runtime;

/// Channel transport between contexts.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Background types
pub use background::{
    BackgroundResponder, Dispatch, DispatchTable, Handler, Origin, ResponderConfig,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{PortId, RequestId};

// Protocol types
pub use protocol::{
    ContextKind, Message, MessageKind, MessageSender, Request, Response, SampleData, User,
};

// Runtime types
pub use runtime::{Extension, ExtensionBuilder};

// Transport types
pub use transport::{ClientPort, Connection, Disconnect, PortEvent, PortState};
