//! Visit results and captured exchanges.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{NetworkRequest, NetworkResponse};

// ============================================================================
// Exchange
// ============================================================================

/// One correlated request, response and body captured during a visit.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    /// Network request identifier shared by both halves.
    pub request_id: RequestId,
    /// Request metadata.
    pub request: NetworkRequest,
    /// Response metadata.
    pub response: NetworkResponse,
    /// Raw response body, base64-decoded if the browser encoded it.
    pub body: Vec<u8>,
}

impl Exchange {
    /// Returns the URL the exchange is archived under.
    ///
    /// The response URL, or the request URL if the response has none.
    #[must_use]
    pub fn target_uri(&self) -> &str {
        if self.response.url.is_empty() {
            &self.request.url
        } else {
            &self.response.url
        }
    }
}

/// Receives every exchange completed during a visit.
///
/// An error fails the visit.
pub type ExchangeHandler = Box<dyn FnMut(&Exchange) -> Result<()> + Send>;

// ============================================================================
// Visit
// ============================================================================

/// Outcome of a successful page visit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    /// URL that was navigated to.
    pub url: String,
    /// Time from navigation to assembled result.
    #[serde(rename = "durationMs", serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Status of the primary response (0 if none was seen).
    pub status: u16,
    /// MIME type of the primary response.
    pub mime_type: String,
    /// Absolute link targets in document order.
    pub links: Vec<String>,
    /// Rendered text of the page.
    pub dom_text: String,
    /// Sum of captured body lengths.
    pub total_bytes: u64,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> StdResult<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

type StdResult<T, E> = std::result::Result<T, E>;

// ============================================================================
// BrowseOutcome
// ============================================================================

/// Terminal outcome of one browse attempt.
#[derive(Debug)]
pub enum BrowseOutcome {
    /// The page loaded and was extracted.
    Visited(Visit),
    /// Navigation, capture or extraction failed.
    Failed(Error),
    /// The visit deadline elapsed.
    TimedOut {
        /// URL that was being visited.
        url: String,
        /// Milliseconds waited.
        timeout_ms: u64,
    },
}

impl BrowseOutcome {
    /// Returns `true` if the visit succeeded.
    #[inline]
    #[must_use]
    pub fn is_visited(&self) -> bool {
        matches!(self, Self::Visited(_))
    }

    /// Returns `true` if the visit deadline elapsed.
    #[inline]
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Returns the visit, if any.
    #[inline]
    #[must_use]
    pub fn visit(&self) -> Option<&Visit> {
        match self {
            Self::Visited(visit) => Some(visit),
            _ => None,
        }
    }

    /// Converts into a `Result`, mapping a timeout to [`Error::Timeout`].
    ///
    /// # Errors
    ///
    /// Returns the failure or timeout as an error.
    pub fn into_result(self) -> Result<Visit> {
        match self {
            Self::Visited(visit) => Ok(visit),
            Self::Failed(err) => Err(err),
            Self::TimedOut { url, timeout_ms } => Err(Error::timeout(format!("visit {url}"), timeout_ms)),
        }
    }
}

impl fmt::Display for BrowseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visited(visit) => write!(
                f,
                "visited (status {}, {} links, {} bytes)",
                visit.status,
                visit.links.len(),
                visit.total_bytes
            ),
            Self::Failed(err) => write!(f, "failed: {err}"),
            Self::TimedOut { timeout_ms, .. } => write!(f, "timed out after {timeout_ms}ms"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
