//! Request, Response and inbound frame types.
//!
//! Every inbound text frame is classified exactly once by [`Frame::parse`]:
//! frames carrying a `method` are notifications, frames carrying only an
//! `id` are responses. Anything that is not a JSON object of that shape is
//! stream corruption.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CallId;

use super::Command;

// ============================================================================
// Request
// ============================================================================

/// A command request from local end to browser.
///
/// # Format
///
/// ```json
/// { "id": 7, "method": "Page.navigate", "params": { "url": "..." } }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Identifier for request/response correlation.
    pub id: CallId,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    /// Creates a request with the given ID.
    #[inline]
    #[must_use]
    pub fn new(id: CallId, command: Command) -> Self {
        Self { id, command }
    }

    /// Returns the wire method name.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        self.command.method()
    }
}

// ============================================================================
// RpcError
// ============================================================================

/// Error object of an error response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Human readable message.
    pub message: String,
    /// Optional extra detail.
    #[serde(default)]
    pub data: Option<Value>,
}

// ============================================================================
// Response
// ============================================================================

/// A response to a previously issued [`Request`].
#[derive(Debug, Clone)]
pub struct Response {
    /// Matches the request `id`.
    pub id: CallId,
    /// Result payload (if success).
    pub result: Option<Value>,
    /// Error object (if error).
    pub error: Option<RpcError>,
}

impl Response {
    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the response carried an error object.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(err) => Err(Error::protocol(err.code, err.message)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// Notification
// ============================================================================

/// An unsolicited server notification.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Event name in `Domain.event` format.
    pub method: String,
    /// Event-specific data.
    pub params: Value,
}

// ============================================================================
// Frame
// ============================================================================

/// A classified inbound frame.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Response to a call.
    Response(Response),
    /// Server-pushed notification.
    Notification(Notification),
}

/// Raw envelope shared by responses and notifications.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<CallId>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

impl Frame {
    /// Decodes and classifies one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StreamCorrupted`] if the envelope cannot be decoded.
    pub fn parse(text: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| Error::stream_corrupted(format!("undecodable frame: {e}")))?;

        match (envelope.method, envelope.id) {
            (Some(method), _) => Ok(Self::Notification(Notification {
                method,
                params: envelope.params.unwrap_or(Value::Null),
            })),
            (None, Some(id)) => Ok(Self::Response(Response {
                id,
                result: envelope.result,
                error: envelope.error,
            })),
            (None, None) => Err(Error::stream_corrupted(
                "frame has neither an id nor a method",
            )),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
