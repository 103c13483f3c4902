//! Error types for the crawler.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```no_run
//! use cdp_crawler::protocol::Command;
//! use cdp_crawler::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     client.call(Command::navigate("https://example.com/")).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::StreamCorrupted`] |
//! | Protocol | [`Error::Protocol`], [`Error::UnexpectedResult`] |
//! | Execution | [`Error::RequestTimeout`], [`Error::Timeout`], [`Error::ScriptError`] |
//! | Page | [`Error::NavigationFailed`], [`Error::Archive`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Http`], [`Error::Base64`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use base64::DecodeError;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CallId;

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
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when session or crawler configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connection to the debug endpoint failed.
    ///
    /// Returned when target discovery or the WebSocket dial fails.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// WebSocket connection closed.
    ///
    /// Returned for calls outstanding when the connection goes away and for
    /// calls issued after it is gone.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The inbound frame stream could not be decoded.
    ///
    /// Unrecoverable for the connection: the event loop stops after this.
    #[error("Stream corrupted: {message}")]
    StreamCorrupted {
        /// Description of the undecodable frame.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Explicit error response to an RPC call.
    ///
    /// Affects only the call that received it.
    #[error("Protocol error {code}: {message}")]
    Protocol {
        /// Error code reported by the browser.
        code: i64,
        /// Error message reported by the browser.
        message: String,
    },

    /// RPC result did not have the expected shape.
    #[error("Unexpected result for {method}: {message}")]
    UnexpectedResult {
        /// Method whose result was malformed.
        method: String,
        /// What was wrong with it.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// RPC call deadline elapsed.
    #[error("Call {call_id} ({method}) timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The call that timed out.
        call_id: CallId,
        /// Method of the call.
        method: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Operation deadline elapsed.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// In-page script evaluation failed.
    #[error("Script error: {message}")]
    ScriptError {
        /// Exception text reported by the page.
        message: String,
    },

    // ========================================================================
    // Page Errors
    // ========================================================================
    /// The primary navigation request failed to load.
    #[error("Navigation to {url} failed: {reason}")]
    NavigationFailed {
        /// URL that was being visited.
        url: String,
        /// Failure reported by the browser.
        reason: String,
    },

    /// Exchange could not be written to the archive.
    #[error("Archive error: {message}")]
    Archive {
        /// Description of the archive failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP error during target discovery.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid base64.
    #[error("Base64 error: {0}")]
    Base64(#[from] DecodeError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a stream corruption error.
    #[inline]
    pub fn stream_corrupted(message: impl Into<String>) -> Self {
        Self::StreamCorrupted {
            message: message.into(),
        }
    }

    /// Creates a protocol error from an RPC error response.
    #[inline]
    pub fn protocol(code: i64, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }

    /// Creates an unexpected result error.
    #[inline]
    pub fn unexpected_result(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedResult {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(call_id: CallId, method: impl Into<String>, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            call_id,
            method: method.into(),
            timeout_ms,
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a script error.
    #[inline]
    pub fn script_error(message: impl Into<String>) -> Self {
        Self::ScriptError {
            message: message.into(),
        }
    }

    /// Creates a navigation failure.
    #[inline]
    pub fn navigation_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NavigationFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an archive error.
    #[inline]
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::RequestTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    ///
    /// Connection errors leave the transport unusable.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::StreamCorrupted { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors leave the connection usable for the next call.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. }
                | Self::UnexpectedResult { .. }
                | Self::Timeout { .. }
                | Self::RequestTimeout { .. }
                | Self::ScriptError { .. }
                | Self::NavigationFailed { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
