//! Command definitions organized by domain.
//!
//! Commands follow the `Domain.method` naming of the DevTools protocol.
//!
//! # Command Domains
//!
//! | Domain | Commands |
//! |--------|----------|
//! | `Page` | `enable`, `navigate` |
//! | `Network` | `enable`, `setBlockedURLs`, `getResponseBody` |
//! | `Runtime` | `evaluate` |
//! | `Target` | `createTarget` |
//!
//! Anything else can be sent as a [`RawCommand`].

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::identifiers::RequestId;

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by domain.
///
/// This enum wraps domain-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Command {
    /// Page domain commands.
    Page(PageCommand),
    /// Network domain commands.
    Network(NetworkCommand),
    /// Runtime domain commands.
    Runtime(RuntimeCommand),
    /// Target domain commands.
    Target(TargetCommand),
    /// Untyped command.
    Raw(RawCommand),
}

impl Command {
    /// Returns the wire method name.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Page(PageCommand::Enable) => "Page.enable",
            Self::Page(PageCommand::Navigate { .. }) => "Page.navigate",
            Self::Network(NetworkCommand::Enable) => "Network.enable",
            Self::Network(NetworkCommand::SetBlockedUrls { .. }) => "Network.setBlockedURLs",
            Self::Network(NetworkCommand::GetResponseBody { .. }) => "Network.getResponseBody",
            Self::Runtime(RuntimeCommand::Evaluate { .. }) => "Runtime.evaluate",
            Self::Target(TargetCommand::CreateTarget { .. }) => "Target.createTarget",
            Self::Raw(raw) => &raw.method,
        }
    }

    /// `Page.navigate` to `url`.
    #[inline]
    #[must_use]
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::Page(PageCommand::Navigate { url: url.into() })
    }

    /// `Runtime.evaluate` returning the result by value.
    #[inline]
    #[must_use]
    pub fn evaluate(expression: impl Into<String>) -> Self {
        Self::Runtime(RuntimeCommand::Evaluate {
            expression: expression.into(),
            return_by_value: true,
        })
    }

    /// `Network.getResponseBody` for a finished request.
    #[inline]
    #[must_use]
    pub fn get_response_body(request_id: RequestId) -> Self {
        Self::Network(NetworkCommand::GetResponseBody { request_id })
    }

    /// Untyped command with arbitrary params.
    #[inline]
    #[must_use]
    pub fn raw(method: impl Into<String>, params: Value) -> Self {
        Self::Raw(RawCommand {
            method: method.into(),
            params,
        })
    }
}

// ============================================================================
// Page Commands
// ============================================================================

/// Page domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    /// Enable page lifecycle notifications.
    #[serde(rename = "Page.enable")]
    Enable,

    /// Navigate the page to a URL.
    #[serde(rename = "Page.navigate")]
    Navigate {
        /// URL to navigate to.
        url: String,
    },
}

// ============================================================================
// Network Commands
// ============================================================================

/// Network domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum NetworkCommand {
    /// Enable network notifications.
    #[serde(rename = "Network.enable")]
    Enable,

    /// Block requests matching URL patterns (`*` wildcards).
    #[serde(rename = "Network.setBlockedURLs")]
    SetBlockedUrls {
        /// Patterns to block.
        urls: Vec<String>,
    },

    /// Fetch the body of a finished response.
    #[serde(rename = "Network.getResponseBody")]
    GetResponseBody {
        /// Network request whose body to fetch.
        #[serde(rename = "requestId")]
        request_id: RequestId,
    },
}

// ============================================================================
// Runtime Commands
// ============================================================================

/// Runtime domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum RuntimeCommand {
    /// Evaluate an expression in the page's main world.
    #[serde(rename = "Runtime.evaluate")]
    Evaluate {
        /// JavaScript expression.
        expression: String,
        /// Serialize the result instead of returning a remote object handle.
        #[serde(rename = "returnByValue")]
        return_by_value: bool,
    },
}

// ============================================================================
// Target Commands
// ============================================================================

/// Target domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum TargetCommand {
    /// Open a new tab.
    #[serde(rename = "Target.createTarget")]
    CreateTarget {
        /// Initial URL of the tab.
        url: String,
    },
}

// ============================================================================
// RawCommand
// ============================================================================

/// A command not covered by the typed enums.
#[derive(Debug, Clone, Serialize)]
pub struct RawCommand {
    /// Wire method name.
    pub method: String,
    /// Parameters, omitted when null.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

// ============================================================================
// Tests
// ============================================================================
