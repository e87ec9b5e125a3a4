//! Response envelope and sample data types.
//!
//! Every message is answered with a [`Response`]; domain failures travel
//! inside it rather than as transport errors.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Response
// ============================================================================

/// The result returned for a [`Message`](super::Message).
///
/// Exactly one of `data` / `error` is populated on the wire; the enum makes
/// any other combination unrepresentable.
///
/// # Format
///
/// Success:
/// ```json
/// { "success": true, "data": "PONG" }
/// ```
///
/// Failure:
/// ```json
/// { "success": false, "error": "unknown message kind: FOO" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResponse", into = "RawResponse")]
pub enum Response {
    /// Operation succeeded.
    Success {
        /// Kind-dependent result.
        data: Value,
    },
    /// Operation failed.
    Failure {
        /// Human-readable reason.
        error: String,
    },
}

impl Response {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(data: impl Into<Value>) -> Self {
        Self::Success { data: data.into() }
    }

    /// Creates a failure response.
    #[inline]
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    /// Creates a success response from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if `data` cannot be serialized.
    pub fn success_from<T: Serialize>(data: &T) -> Result<Self> {
        Ok(Self::success(serde_json::to_value(data)?))
    }

    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the data if this is a success response.
    #[inline]
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Success { data } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the error string if this is a failure response.
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }

    /// Extracts the data, turning a failure into [`Error::Operation`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Operation`] if the response was a failure.
    pub fn into_result(self) -> Result<Value> {
        match self {
            Self::Success { data } => Ok(data),
            Self::Failure { error } => Err(Error::operation(error)),
        }
    }

    /// Deserializes the data into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Operation`] on a failure response, or
    /// [`Error::Json`] if the data does not match `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Self::Success { data } => Ok(serde_json::from_value(data.clone())?),
            Self::Failure { error } => Err(Error::operation(error.clone())),
        }
    }

    /// Gets the data as a string, if it is one.
    #[inline]
    #[must_use]
    pub fn get_str(&self) -> Option<&str> {
        self.data().and_then(Value::as_str)
    }

    /// Gets a u64 field of the data.
    ///
    /// Returns 0 if not a success, key not found or not a number.
    #[inline]
    #[must_use]
    pub fn get_u64(&self, key: &str) -> u64 {
        self.data()
            .and_then(|v| v.get(key))
            .and_then(Value::as_u64)
            .unwrap_or_default()
    }
}

// ============================================================================
// RawResponse
// ============================================================================

/// Wire shape of [`Response`].
#[derive(Debug, Serialize, Deserialize)]
struct RawResponse {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl TryFrom<RawResponse> for Response {
    type Error = String;

    fn try_from(raw: RawResponse) -> StdResult<Self, Self::Error> {
        match (raw.success, raw.data, raw.error) {
            (true, _, Some(_)) => Err("success response must not carry an error".into()),
            (true, data, None) => Ok(Self::Success {
                data: data.unwrap_or(Value::Null),
            }),
            (false, Some(_), _) => Err("failure response must not carry data".into()),
            (false, None, Some(error)) => Ok(Self::Failure { error }),
            (false, None, None) => Err("failure response is missing its error".into()),
        }
    }
}

impl From<Response> for RawResponse {
    fn from(response: Response) -> Self {
        match response {
            Response::Success { data } => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Response::Failure { error } => Self {
                success: false,
                data: None,
                error: Some(error),
            },
        }
    }
}

// ============================================================================
// Sample Data
// ============================================================================

/// A user record in the `GET_DATA` sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: u32,
    /// Display name.
    pub name: String,
}

/// Data returned for `GET_DATA`.
///
/// `count` always equals `users.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleData {
    /// Sample users.
    pub users: Vec<User>,
    /// Number of users.
    pub count: usize,
}

impl SampleData {
    /// Builds sample data from users, deriving `count`.
    #[must_use]
    pub fn from_users(users: Vec<User>) -> Self {
        let count = users.len();
        Self { users, count }
    }
}

impl Default for SampleData {
    fn default() -> Self {
        Self::from_users(
            ["Alice", "Bob", "Charlie"]
                .into_iter()
                .zip(1..)
                .map(|(name, id)| User {
                    id,
                    name: name.to_string(),
                })
                .collect(),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
