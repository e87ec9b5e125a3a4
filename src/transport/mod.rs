//! Channel transport between extension contexts.
//!
//! This module wraps the platform's one-shot send and connect/post
//! primitives behind a uniform send-and-await operation, translating
//! channel-level failures into [`Error::Channel`](crate::Error::Channel).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │ Content / Popup │         MessageBus           │   Background    │
//! │                 │─── Envelope::OneShot ───────►│                 │
//! │  Connection     │◄── ReplySlot (once) ─────────│  Responder      │
//! │                 │─── Envelope::Connect ───────►│                 │
//! │  ClientPort     │◄════════ Port frames ═══════►│  ServerPort     │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `bus` | Platform primitives: one-shot envelopes and connect |
//! | `connection` | `send_request` and pending-call tracking |
//! | `port` | Port sessions and their lifecycle |

// ============================================================================
// Submodules
// ============================================================================

/// Platform primitives.
pub mod bus;

/// Transient-context connection.
pub mod connection;

/// Port sessions.
pub mod port;

// ============================================================================
// Re-exports
// ============================================================================

pub use bus::{Envelope, Inbox, MessageBus, ReplySlot};
pub use connection::{Connection, MAX_PENDING_CALLS};
pub use port::{ClientPort, Disconnect, Port, PortEvent, PortSender, PortState, ServerPort};
