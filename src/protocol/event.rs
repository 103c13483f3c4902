//! Event message types.
//!
//! Events are notifications pushed by the browser while a page loads. The
//! transport decodes each notification through an [`EventRegistry`] into the
//! typed [`Event`] union; notifications the registry does not know are
//! dropped.
//!
//! # Event Types
//!
//! | Method | Variant |
//! |--------|---------|
//! | `Page.loadEventFired` | [`Event::LoadEventFired`] |
//! | `Network.requestWillBeSent` | [`Event::RequestWillBeSent`] |
//! | `Network.responseReceived` | [`Event::ResponseReceived`] |
//! | `Network.loadingFinished` | [`Event::LoadingFinished`] |
//! | `Network.loadingFailed` | [`Event::LoadingFailed`] |

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;

use crate::identifiers::RequestId;

use super::network::{NetworkRequest, NetworkResponse};

// ============================================================================
// Event
// ============================================================================

/// A decoded server notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The page's `load` event fired.
    LoadEventFired(LoadEventFired),
    /// A network request is about to be sent.
    RequestWillBeSent(RequestWillBeSent),
    /// Response headers were received.
    ResponseReceived(ResponseReceived),
    /// A response body finished loading.
    LoadingFinished(LoadingFinished),
    /// A request failed to load.
    LoadingFailed(LoadingFailed),
}

impl Event {
    /// Returns the wire method name of this event.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::LoadEventFired(_) => "Page.loadEventFired",
            Self::RequestWillBeSent(_) => "Network.requestWillBeSent",
            Self::ResponseReceived(_) => "Network.responseReceived",
            Self::LoadingFinished(_) => "Network.loadingFinished",
            Self::LoadingFailed(_) => "Network.loadingFailed",
        }
    }

    /// Returns the network request this event belongs to, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            Self::LoadEventFired(_) => None,
            Self::RequestWillBeSent(e) => Some(&e.request_id),
            Self::ResponseReceived(e) => Some(&e.request_id),
            Self::LoadingFinished(e) => Some(&e.request_id),
            Self::LoadingFailed(e) => Some(&e.request_id),
        }
    }
}

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload of `Page.loadEventFired`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoadEventFired {
    /// Monotonic timestamp.
    #[serde(default)]
    pub timestamp: f64,
}

/// Payload of `Network.requestWillBeSent`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWillBeSent {
    /// Request identifier.
    pub request_id: RequestId,
    /// Loader identifier.
    #[serde(default)]
    pub loader_id: String,
    /// URL of the document this request is loaded for.
    #[serde(default, rename = "documentURL")]
    pub document_url: String,
    /// Request data.
    pub request: NetworkRequest,
    /// Monotonic timestamp.
    #[serde(default)]
    pub timestamp: f64,
    /// Wall clock timestamp.
    #[serde(default)]
    pub wall_time: f64,
    /// Resource type (`Document`, `Script`, ...).
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
}

/// Payload of `Network.responseReceived`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceived {
    /// Request identifier.
    pub request_id: RequestId,
    /// Monotonic timestamp.
    #[serde(default)]
    pub timestamp: f64,
    /// Resource type.
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
    /// Response data.
    pub response: NetworkResponse,
}

/// Payload of `Network.loadingFinished`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFinished {
    /// Request identifier.
    pub request_id: RequestId,
    /// Monotonic timestamp.
    #[serde(default)]
    pub timestamp: f64,
    /// Total bytes received.
    #[serde(default)]
    pub encoded_data_length: f64,
}

/// Payload of `Network.loadingFailed`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFailed {
    /// Request identifier.
    pub request_id: RequestId,
    /// Monotonic timestamp.
    #[serde(default)]
    pub timestamp: f64,
    /// Error message.
    #[serde(default)]
    pub error_text: String,
    /// True if the load was canceled.
    #[serde(default)]
    pub canceled: bool,
}

// ============================================================================
// EventRegistry
// ============================================================================

/// Decodes notification params into a typed [`Event`].
pub type EventDecoder = fn(Value) -> serde_json::Result<Event>;

/// Read-only mapping from notification name to decoder.
///
/// Built once and never mutated, so the transport's read loop consults it
/// without locking.
pub struct EventRegistry {
    decoders: FxHashMap<&'static str, EventDecoder>,
}

static STANDARD: LazyLock<EventRegistry> = LazyLock::new(EventRegistry::build_standard);

impl EventRegistry {
    /// Returns the registry of every event the page session consumes.
    #[inline]
    #[must_use]
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    /// Builds a registry from explicit entries.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (&'static str, EventDecoder)>) -> Self {
        Self {
            decoders: entries.into_iter().collect(),
        }
    }

    fn build_standard() -> Self {
        Self::from_entries([
            ("Page.loadEventFired", decode_load_event_fired as EventDecoder),
            ("Network.requestWillBeSent", decode_request_will_be_sent as EventDecoder),
            ("Network.responseReceived", decode_response_received as EventDecoder),
            ("Network.loadingFinished", decode_loading_finished as EventDecoder),
            ("Network.loadingFailed", decode_loading_failed as EventDecoder),
        ])
    }

    /// Decodes a notification.
    ///
    /// Returns `None` if the method is not registered.
    #[must_use]
    pub fn decode(&self, method: &str, params: Value) -> Option<serde_json::Result<Event>> {
        self.decoders.get(method).map(|decode| decode(params))
    }

    /// Returns `true` if the method is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.decoders.contains_key(method)
    }

    /// Returns the number of registered events.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Returns `true` if no events are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

// ============================================================================
// Decoders
// ============================================================================

fn decode_load_event_fired(params: Value) -> serde_json::Result<Event> {
    serde_json::from_value(params).map(Event::LoadEventFired)
}

fn decode_request_will_be_sent(params: Value) -> serde_json::Result<Event> {
    serde_json::from_value(params).map(Event::RequestWillBeSent)
}

fn decode_response_received(params: Value) -> serde_json::Result<Event> {
    serde_json::from_value(params).map(Event::ResponseReceived)
}

fn decode_loading_finished(params: Value) -> serde_json::Result<Event> {
    serde_json::from_value(params).map(Event::LoadingFinished)
}

fn decode_loading_failed(params: Value) -> serde_json::Result<Event> {
    serde_json::from_value(params).map(Event::LoadingFailed)
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<_> = self.decoders.keys().collect();
        methods.sort();
        f.debug_struct("EventRegistry")
            .field("methods", &methods)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
