//! Debug target discovery.
//!
//! The browser lists its debuggable targets as JSON at a well-known HTTP
//! path. Each target exposes the WebSocket URL to dial.
//!
//! # Connection Flow
//!
//! 1. `GET http://host:port/json/list`
//! 2. Pick the first `page` target, or open a new one with `Target.createTarget`
//! 3. Dial the target's WebSocket URL

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifiers::TargetId;
use crate::protocol::{Command, EventRegistry, TargetCommand};

use super::connection::{Client, ClientConfig};

// ============================================================================
// Constants
// ============================================================================

/// Path listing debuggable targets.
const TARGET_LIST_PATH: &str = "/json/list";

/// Initial URL of tabs opened for crawling.
const BLANK_URL: &str = "about:blank";

// ============================================================================
// TargetInfo
// ============================================================================

/// One entry of the target list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    /// Target ID.
    pub id: TargetId,
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Target type (`page`, `service_worker`, ...).
    #[serde(default, rename = "type")]
    pub target_type: String,
    /// Current URL.
    #[serde(default)]
    pub url: String,
    /// WebSocket URL; absent while another client is attached.
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

impl TargetInfo {
    /// Returns `true` if this target is a tab.
    #[inline]
    #[must_use]
    pub fn is_page(&self) -> bool {
        self.target_type == "page"
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// Lists the browser's debuggable targets.
///
/// # Errors
///
/// - [`Error::Http`] if the endpoint cannot be reached or returns bad JSON
pub async fn list_targets(host: &str, port: u16) -> Result<Vec<TargetInfo>> {
    let url = format!("http://{host}:{port}{TARGET_LIST_PATH}");
    debug!(url = %url, "Listing debug targets");

    let targets: Vec<TargetInfo> = reqwest::get(&url)
        .await?
        .error_for_status()?
        .json()
        .await?;

    debug!(count = targets.len(), "Debug targets listed");
    Ok(targets)
}

/// Selects the first tab from a target list.
///
/// Falls back to the first dialable target if none is typed `page`.
#[must_use]
pub fn select_first_tab(targets: &[TargetInfo]) -> Option<&TargetInfo> {
    let dialable = |t: &&TargetInfo| t.web_socket_debugger_url.is_some();
    targets
        .iter()
        .filter(dialable)
        .find(|t| t.is_page())
        .or_else(|| targets.iter().find(dialable))
}

/// Connects to the browser's first tab.
///
/// # Errors
///
/// - [`Error::Http`] if target discovery fails
/// - [`Error::Connection`] if there is no dialable tab or the dial fails
pub async fn dial_first_tab(host: &str, port: u16, config: ClientConfig) -> Result<Client> {
    let targets = list_targets(host, port).await?;

    let target = select_first_tab(&targets)
        .ok_or_else(|| Error::connection(format!("no debuggable tab at {host}:{port}")))?;

    let ws_url = target
        .web_socket_debugger_url
        .as_deref()
        .ok_or_else(|| Error::connection(format!("target {} is not dialable", target.id)))?;

    info!(target_id = %target.id, url = %target.url, "Attaching to tab");
    Client::connect_with(ws_url, EventRegistry::standard(), config).await
}

/// Opens a fresh tab and connects to it.
///
/// The connection to the first tab used to create it is closed afterwards.
///
/// # Errors
///
/// - Everything [`dial_first_tab`] returns
/// - [`Error::Protocol`] if the browser refuses to create the tab
/// - [`Error::UnexpectedResult`] if the reply carries no target ID
pub async fn dial_new_tab(host: &str, port: u16, config: ClientConfig) -> Result<Client> {
    let bootstrap = dial_first_tab(host, port, config).await?;

    let command = Command::Target(TargetCommand::CreateTarget {
        url: BLANK_URL.to_string(),
    });
    let result = bootstrap.call(command).await;
    bootstrap.close();

    let target_id = result?
        .get("targetId")
        .and_then(|v| v.as_str())
        .map(TargetId::new)
        .ok_or_else(|| Error::unexpected_result("Target.createTarget", "missing targetId"))?;

    let ws_url = page_ws_url(host, port, &target_id);
    info!(target_id = %target_id, "Attaching to new tab");
    Client::connect_with(&ws_url, EventRegistry::standard(), config).await
}

/// Builds the WebSocket URL of a page target.
#[inline]
#[must_use]
pub fn page_ws_url(host: &str, port: u16, target_id: &TargetId) -> String {
    format!("ws://{host}:{port}/devtools/page/{target_id}")
}

// ============================================================================
// Tests
// ============================================================================
