//! Message kinds, the wire envelope, and the typed request union.
//!
//! A [`Message`] is what crosses the channel: `{ "type": ..., "payload": ... }`
//! with a weakly typed payload. The background never trusts it as-is; it
//! parses it into a [`Request`], whose variants carry strongly shaped
//! payloads.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, Result};

// ============================================================================
// MessageKind
// ============================================================================

/// Message kind discriminator.
///
/// The closed set is `PING`, `GET_DATA` and `PROCESS_TEXT`. Anything else
/// deserializes into [`MessageKind::Unknown`] instead of failing, so the
/// background can answer it with an error response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    /// Liveness check.
    Ping,
    /// Fetch sample data.
    GetData,
    /// Uppercase a string.
    ProcessText,
    /// Any kind outside the closed set.
    Unknown(String),
}

impl MessageKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ping => "PING",
            Self::GetData => "GET_DATA",
            Self::ProcessText => "PROCESS_TEXT",
            Self::Unknown(kind) => kind,
        }
    }

    /// Returns `true` if this kind is part of the closed set.
    #[inline]
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for MessageKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PING" => Self::Ping,
            "GET_DATA" => Self::GetData,
            "PROCESS_TEXT" => Self::ProcessText,
            _ => Self::Unknown(value),
        }
    }
}

impl From<&str> for MessageKind {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Unknown(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Message
// ============================================================================

/// A message sent from a transient context to the background.
///
/// # Format
///
/// ```json
/// {
///   "type": "PROCESS_TEXT",
///   "payload": { "text": "hello" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,

    /// Kind-dependent payload, unvalidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Message {
    /// Creates a message with an arbitrary kind and payload.
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<MessageKind>, payload: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Creates a `PING` message.
    #[inline]
    #[must_use]
    pub fn ping() -> Self {
        Self::new(MessageKind::Ping, None)
    }

    /// Creates a `GET_DATA` message.
    #[inline]
    #[must_use]
    pub fn get_data() -> Self {
        Self::new(MessageKind::GetData, None)
    }

    /// Creates a well-formed `PROCESS_TEXT` message.
    #[inline]
    #[must_use]
    pub fn process_text(text: impl Into<String>) -> Self {
        Self::new(
            MessageKind::ProcessText,
            Some(json!({ "text": text.into() })),
        )
    }
}

// ============================================================================
// Request
// ============================================================================

/// A validated message, one variant per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// `PING`.
    Ping,
    /// `GET_DATA`.
    GetData,
    /// `PROCESS_TEXT` with a string `text`.
    ProcessText {
        /// Text to uppercase. May be empty.
        text: String,
    },
    /// A kind outside the closed set, payload passed through.
    Other {
        /// Wire name of the kind.
        kind: String,
        /// Raw payload.
        payload: Option<Value>,
    },
}

/// Shape of a `PROCESS_TEXT` payload.
#[derive(Debug, Deserialize)]
struct ProcessTextPayload {
    text: String,
}

impl Request {
    /// Returns the kind this request was parsed from.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Ping => MessageKind::Ping,
            Self::GetData => MessageKind::GetData,
            Self::ProcessText { .. } => MessageKind::ProcessText,
            Self::Other { kind, .. } => MessageKind::Unknown(kind.clone()),
        }
    }
}

impl TryFrom<Message> for Request {
    type Error = Error;

    /// Validates the payload for the message kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPayload`] if a `PROCESS_TEXT` payload is
    /// missing or `text` is not a string.
    fn try_from(message: Message) -> Result<Self> {
        match message.kind {
            MessageKind::Ping => Ok(Self::Ping),
            MessageKind::GetData => Ok(Self::GetData),
            MessageKind::ProcessText => {
                let payload = message
                    .payload
                    .ok_or_else(|| Error::invalid_payload("missing payload"))?;
                let ProcessTextPayload { text } = serde_json::from_value(payload)
                    .map_err(|_| Error::invalid_payload("`text` must be a string"))?;
                Ok(Self::ProcessText { text })
            }
            MessageKind::Unknown(kind) => Ok(Self::Other {
                kind,
                payload: message.payload,
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
