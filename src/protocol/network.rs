//! Network request and response metadata.
//!
//! Mirrors the `Network.Request` and `Network.Response` objects carried by
//! network notifications. Only the fields the crawler consumes are decoded;
//! unknown fields are ignored.

// ============================================================================
// Imports
// ============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Headers
// ============================================================================

/// HTTP header map as reported by the browser.
///
/// Iteration order is unspecified.
pub type Headers = HashMap<String, String>;

// ============================================================================
// NetworkRequest
// ============================================================================

/// Request metadata from `Network.requestWillBeSent`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRequest {
    /// Request URL without fragment.
    pub url: String,

    /// HTTP method.
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: Headers,

    /// Mixed content classification.
    #[serde(default)]
    pub mixed_content_type: Option<String>,

    /// Loading priority.
    #[serde(default)]
    pub initial_priority: Option<String>,

    /// Referrer policy.
    #[serde(default)]
    pub referrer_policy: Option<String>,
}

// ============================================================================
// NetworkResponse
// ============================================================================

/// Response metadata from `Network.responseReceived`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkResponse {
    /// Response URL.
    pub url: String,

    /// HTTP status code.
    pub status: u16,

    /// HTTP status text.
    #[serde(default)]
    pub status_text: String,

    /// Response headers.
    #[serde(default)]
    pub headers: Headers,

    /// Raw response header text, when the browser exposes it.
    #[serde(default)]
    pub headers_text: Option<String>,

    /// MIME type of the resource.
    #[serde(default)]
    pub mime_type: String,

    /// Headers actually sent on the wire.
    #[serde(default)]
    pub request_headers: Option<Headers>,

    /// Raw request header text, when the browser exposes it.
    #[serde(default)]
    pub request_headers_text: Option<String>,

    /// Address the response was served from.
    #[serde(default, rename = "remoteIPAddress")]
    pub remote_ip_address: Option<String>,

    /// Port the response was served from.
    #[serde(default)]
    pub remote_port: Option<u16>,

    /// Protocol label (`http/1.1`, `h2`, `http/1.0`, ...).
    #[serde(default)]
    pub protocol: Option<String>,

    /// Bytes received so far for this response.
    #[serde(default)]
    pub encoded_data_length: f64,
}

// ============================================================================
// Tests
// ============================================================================
