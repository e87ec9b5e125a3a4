//! Background responder configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use webext_messaging::ResponderConfig;
//!
//! let config = ResponderConfig::new()
//!     .with_get_data_latency(Duration::from_millis(10))
//!     .with_ping_reply("hello");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Simulated latency before answering `GET_DATA`.
pub const DEFAULT_GET_DATA_LATENCY: Duration = Duration::from_millis(1000);

/// Simulated latency before answering a valid `PROCESS_TEXT`.
pub const DEFAULT_PROCESS_TEXT_LATENCY: Duration = Duration::from_millis(500);

/// Reply to a one-shot `PING`.
pub const DEFAULT_PING_REPLY: &str = "pong from background";

/// Reply to a `PING` posted on a port.
pub const DEFAULT_PORT_PING_REPLY: &str = "pong from background port";

// ============================================================================
// ResponderConfig
// ============================================================================

/// Settings for the standard dispatch table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponderConfig {
    /// Delay before the `GET_DATA` response.
    pub get_data_latency: Duration,

    /// Delay before a valid `PROCESS_TEXT` response.
    pub process_text_latency: Duration,

    /// Data of a one-shot `PING` response.
    pub ping_reply: String,

    /// Data of a port `PING` response. Must differ from `ping_reply`.
    pub port_ping_reply: String,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            get_data_latency: DEFAULT_GET_DATA_LATENCY,
            process_text_latency: DEFAULT_PROCESS_TEXT_LATENCY,
            ping_reply: DEFAULT_PING_REPLY.to_string(),
            port_ping_reply: DEFAULT_PORT_PING_REPLY.to_string(),
        }
    }
}

impl ResponderConfig {
    /// Creates a config with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `GET_DATA` latency.
    #[inline]
    #[must_use]
    pub fn with_get_data_latency(mut self, latency: Duration) -> Self {
        self.get_data_latency = latency;
        self
    }

    /// Sets the `PROCESS_TEXT` latency.
    #[inline]
    #[must_use]
    pub fn with_process_text_latency(mut self, latency: Duration) -> Self {
        self.process_text_latency = latency;
        self
    }

    /// Sets the one-shot `PING` reply.
    #[inline]
    #[must_use]
    pub fn with_ping_reply(mut self, reply: impl Into<String>) -> Self {
        self.ping_reply = reply.into();
        self
    }

    /// Sets the port `PING` reply.
    #[inline]
    #[must_use]
    pub fn with_port_ping_reply(mut self, reply: impl Into<String>) -> Self {
        self.port_ping_reply = reply.into();
        self
    }

    /// Checks that the config is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a reply string is empty or both replies
    /// are equal (port replies must be distinguishable).
    pub fn validate(&self) -> Result<()> {
        if self.ping_reply.is_empty() || self.port_ping_reply.is_empty() {
            return Err(Error::config("PING replies must not be empty"));
        }
        if self.ping_reply == self.port_ping_reply {
            return Err(Error::config(
                "one-shot and port PING replies must differ",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
