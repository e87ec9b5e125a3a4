//! Standard handlers for the closed set of message kinds.
//!
//! | Kind | Timing | Data |
//! |------|--------|------|
//! | `PING` | immediate | greeting, distinct for ports |
//! | `GET_DATA` | deferred | [`SampleData`] |
//! | `PROCESS_TEXT` | deferred (invalid payload: immediate) | uppercased text |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::Error;
use crate::protocol::{MessageKind, Request, Response, SampleData};

use super::config::ResponderConfig;
use super::dispatch::{Dispatch, DispatchTable, Handler, Origin};

// ============================================================================
// PingHandler
// ============================================================================

/// Answers `PING` immediately.
#[derive(Debug, Clone)]
pub struct PingHandler {
    reply: String,
    port_reply: String,
}

impl PingHandler {
    /// Creates a handler with separate one-shot and port replies.
    #[must_use]
    pub fn new(reply: impl Into<String>, port_reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            port_reply: port_reply.into(),
        }
    }
}

impl Handler for PingHandler {
    fn handle(&self, _request: Request, origin: &Origin) -> Dispatch {
        let reply = if origin.is_port() {
            &self.port_reply
        } else {
            &self.reply
        };
        Dispatch::immediate(Response::success(reply.as_str()))
    }
}

// ============================================================================
// GetDataHandler
// ============================================================================

/// Answers `GET_DATA` with sample data after a delay.
#[derive(Debug, Clone)]
pub struct GetDataHandler {
    latency: Duration,
    data: SampleData,
}

impl GetDataHandler {
    /// Creates a handler serving the default sample data.
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self::with_data(latency, SampleData::default())
    }

    /// Creates a handler serving `data`.
    #[must_use]
    pub fn with_data(latency: Duration, data: SampleData) -> Self {
        Self { latency, data }
    }
}

impl Handler for GetDataHandler {
    fn handle(&self, _request: Request, _origin: &Origin) -> Dispatch {
        let data = self.data.clone();
        Dispatch::after(self.latency, move || {
            Response::success_from(&data).unwrap_or_else(|e| Response::failure(e.to_string()))
        })
    }
}

// ============================================================================
// ProcessTextHandler
// ============================================================================

/// Uppercases `PROCESS_TEXT` text after a delay.
///
/// Payload validation happens in the [`DispatchTable`] before this runs, so
/// an invalid payload is answered immediately without the delay.
#[derive(Debug, Clone)]
pub struct ProcessTextHandler {
    latency: Duration,
}

impl ProcessTextHandler {
    /// Creates a handler with the given latency.
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Handler for ProcessTextHandler {
    fn handle(&self, request: Request, _origin: &Origin) -> Dispatch {
        match request {
            Request::ProcessText { text } => {
                Dispatch::after(self.latency, move || Response::success(text.to_uppercase()))
            }
            other => Dispatch::immediate(Response::failure(
                Error::invalid_payload(format!("{} is not PROCESS_TEXT", other.kind()))
                    .to_string(),
            )),
        }
    }
}

// ============================================================================
// Standard Table
// ============================================================================

impl DispatchTable {
    /// Builds the table for `PING`, `GET_DATA` and `PROCESS_TEXT`.
    #[must_use]
    pub fn standard(config: &ResponderConfig) -> Self {
        Self::new()
            .route(
                MessageKind::Ping,
                PingHandler::new(&config.ping_reply, &config.port_ping_reply),
            )
            .route(
                MessageKind::GetData,
                GetDataHandler::new(config.get_data_latency),
            )
            .route(
                MessageKind::ProcessText,
                ProcessTextHandler::new(config.process_text_latency),
            )
    }
}

// ============================================================================
// Tests
// ============================================================================
