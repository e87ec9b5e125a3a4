//! The long-lived background context.
//!
//! The background owns all shared state and answers every message sent by
//! transient contexts, over one-shot sends and over port sessions alike.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`BackgroundResponder`] | Event loop draining the bus |
//! | [`DispatchTable`] | Routes a message kind to its [`Handler`] |
//! | [`Dispatch`] | A handler's answer, immediate or deferred |
//! | [`ResponderConfig`] | Latencies and reply strings |
//! | [`PortRegistry`] | Open port sessions |
//!
//! # Example
//!
//! ```
//! use webext_messaging::background::{BackgroundResponder, Origin, ResponderConfig};
//! use webext_messaging::protocol::{Message, MessageSender};
//!
//! let responder = BackgroundResponder::with_config(&ResponderConfig::default());
//! let origin = Origin::one_shot(MessageSender::popup());
//!
//! assert!(responder.dispatch(Message::ping(), &origin).is_immediate());
//! assert!(!responder.dispatch(Message::get_data(), &origin).is_immediate());
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Responder settings.
pub mod config;

/// Dispatch timing, handlers and routing.
pub mod dispatch;

/// Standard message handlers.
pub mod handlers;

/// Open port sessions.
pub mod registry;

/// Background event loop.
pub mod responder;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{
    DEFAULT_GET_DATA_LATENCY, DEFAULT_PING_REPLY, DEFAULT_PORT_PING_REPLY,
    DEFAULT_PROCESS_TEXT_LATENCY, ResponderConfig,
};
pub use dispatch::{ChannelKind, Dispatch, DispatchTable, Handler, Origin};
pub use handlers::{GetDataHandler, PingHandler, ProcessTextHandler};
pub use registry::{ClosedSession, PortRegistry, PortSession};
pub use responder::{BackgroundResponder, SHUTDOWN_REASON};
