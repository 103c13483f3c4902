//! DevTools protocol message types.
//!
//! This module defines the JSON frames exchanged with the browser over the
//! debug WebSocket.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Shape |
//! |--------------|-----------|-------|
//! | [`Request`] | Local → Browser | `{id, method, params}` |
//! | [`Response`] | Browser → Local | `{id, result}` or `{id, error: {code, message}}` |
//! | [`Notification`] | Browser → Local | `{method, params}` (no id) |
//!
//! Notifications are decoded into the typed [`Event`] union through an
//! [`EventRegistry`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outgoing commands by domain |
//! | `event` | Event union, payloads and registry |
//! | `network` | Network request/response metadata |
//! | `request` | Request, Response and inbound frame classification |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by domain.
pub mod command;

/// Event types and the event registry.
pub mod event;

/// Network request and response metadata.
pub mod network;

/// Request, Response and inbound frame types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    Command, NetworkCommand, PageCommand, RawCommand, RuntimeCommand, TargetCommand,
};
pub use event::{
    Event, EventDecoder, EventRegistry, LoadEventFired, LoadingFailed, LoadingFinished,
    RequestWillBeSent, ResponseReceived,
};
pub use network::{Headers, NetworkRequest, NetworkResponse};
pub use request::{Frame, Notification, Request, Response, RpcError};
