//! Error types for extension messaging.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```no_run
//! use webext_messaging::{Connection, Message, Result};
//!
//! async fn example(connection: &Connection) -> Result<()> {
//!     let response = connection.send_request(Message::ping()).await?;
//!     println!("{:?}", response.data());
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Channel | [`Error::Channel`], [`Error::RequestTimeout`], [`Error::PortClosed`] |
//! | Domain | [`Error::InvalidPayload`], [`Error::Operation`], [`Error::Handler`] |
//! | Protocol | [`Error::Protocol`] |
//! | Configuration | [`Error::Config`] |
//! | External | [`Error::Json`], [`Error::Url`] |
//!
//! Domain errors never cross the channel as `Err`: the background folds
//! them into a `success: false` [`Response`](crate::protocol::Response).
//! Only channel-level failures reach the caller of `send_request` as `Err`.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::RequestId;

// ============================================================================
// Platform Diagnostics
// ============================================================================

/// Diagnostic when no background context is listening.
pub const NO_RECEIVER: &str = "Could not establish connection. Receiving end does not exist.";

/// Diagnostic when the reply slot is dropped without a response.
pub const CLOSED_BEFORE_RESPONSE: &str =
    "The message port closed before a response was received.";

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Channel Errors
    // ========================================================================
    /// The channel failed before a response arrived.
    ///
    /// Carries the platform diagnostic string. Distinct from a
    /// `success: false` response: this means the far end is unavailable.
    #[error("Channel error: {message}")]
    Channel {
        /// Platform diagnostic.
        message: String,
    },

    /// Caller-side timeout from `send_request_with_timeout`.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Attempted to post on a port that is already closed.
    #[error("Port '{name}' is closed")]
    PortClosed {
        /// Port session name.
        name: String,
    },

    // ========================================================================
    // Domain Errors
    // ========================================================================
    /// Message payload failed validation.
    #[error("invalid payload: {message}")]
    InvalidPayload {
        /// What was wrong with the payload.
        message: String,
    },

    /// The responder answered with `success: false`.
    ///
    /// Only produced by [`Response::into_result`](crate::protocol::Response::into_result).
    #[error("{message}")]
    Operation {
        /// Error string from the response.
        message: String,
    },

    /// A handler failed while computing a response.
    #[error("{message}")]
    Handler {
        /// Fault description.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed frame or too many outstanding calls.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid extension configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Sender URL could not be parsed.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a channel error.
    #[inline]
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    /// Creates a channel error for a missing background context.
    #[inline]
    pub fn no_receiver() -> Self {
        Self::channel(NO_RECEIVER)
    }

    /// Creates a channel error for a reply slot dropped unanswered.
    #[inline]
    pub fn closed_before_response() -> Self {
        Self::channel(CLOSED_BEFORE_RESPONSE)
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }

    /// Creates a port closed error.
    #[inline]
    pub fn port_closed(name: impl Into<String>) -> Self {
        Self::PortClosed { name: name.into() }
    }

    /// Creates an invalid payload error.
    #[inline]
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Creates an operation error.
    #[inline]
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
        }
    }

    /// Creates a handler error.
    #[inline]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the channel itself failed.
    ///
    /// Callers use this to tell "background unavailable" apart from a
    /// failed operation.
    #[inline]
    #[must_use]
    pub fn is_channel_error(&self) -> bool {
        matches!(
            self,
            Self::Channel { .. } | Self::RequestTimeout { .. } | Self::PortClosed { .. }
        )
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if this error belongs inside a response envelope.
    #[inline]
    #[must_use]
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPayload { .. } | Self::Operation { .. } | Self::Handler { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_error_display() {
        let err = Error::no_receiver();
        assert_eq!(
            err.to_string(),
            "Channel error: Could not establish connection. Receiving end does not exist."
        );
    }

    #[test]
    fn test_invalid_payload_display() {
        let err = Error::invalid_payload("`text` must be a string");
        assert!(err.to_string().starts_with("invalid payload"));
    }

    #[test]
    fn test_is_channel_error() {
        assert!(Error::closed_before_response().is_channel_error());
        assert!(Error::port_closed("content-script-port").is_channel_error());
        assert!(Error::request_timeout(RequestId::generate(), 10).is_channel_error());
        assert!(!Error::operation("nope").is_channel_error());
        assert!(!Error::config("bad").is_channel_error());
    }

    #[test]
    fn test_is_domain_error() {
        assert!(Error::invalid_payload("x").is_domain_error());
        assert!(Error::handler("boom").is_domain_error());
        assert!(!Error::no_receiver().is_domain_error());
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::request_timeout(RequestId::generate(), 5).is_timeout());
        assert!(!Error::no_receiver().is_timeout());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
