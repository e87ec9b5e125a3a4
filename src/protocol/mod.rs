//! Message schema shared by every context.
//!
//! This module defines the only contract both ends agree on. It carries
//! no behavior beyond structural validation.
//!
//! # Protocol Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `Message` | Transient → Background | Request envelope `{type, payload?}` |
//! | `Request` | (background side) | Validated message, one variant per kind |
//! | `Response` | Background → Transient | `{success, data?, error?}` |
//! | `MessageSender` | (metadata) | Which context sent a message |
//!
//! # Message Kinds
//!
//! | Kind | Payload | Data on success |
//! |------|---------|-----------------|
//! | `PING` | none | greeting string |
//! | `GET_DATA` | none | [`SampleData`] |
//! | `PROCESS_TEXT` | `{ "text": string }` | uppercased text |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Message kinds, envelope and typed request |
//! | `response` | Response envelope and sample data |
//! | `sender` | Sender metadata |

// ============================================================================
// Submodules
// ============================================================================

/// Message kinds, envelope and typed request.
pub mod message;

/// Response envelope and sample data.
pub mod response;

/// Sender metadata.
pub mod sender;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{Message, MessageKind, Request};
pub use response::{Response, SampleData, User};
pub use sender::{ContextKind, MessageSender};
