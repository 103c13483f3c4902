//! Page session: one visit at a time over a tab connection.
//!
//! # Visit Lifecycle
//!
//! ```text
//! Idle ─► Navigating ─► Collecting ─► Extracting ─► Done
//!             │             │              │
//!             └─────────────┴──────────────┴─► Failed / TimedOut
//! ```
//!
//! Whatever the outcome, the page is navigated to the reset URL afterwards
//! so the next visit starts from a clean document.
//!
//! While collecting, network events are correlated by request ID. The first
//! request of the visit's loader is the primary request; its response
//! supplies the visit's status and MIME type. A load event seen before the
//! primary request belongs to an earlier document and is skipped. A request whose loading finished after a
//! response was seen becomes an [`Exchange`] and is handed to the exchange
//! handler exactly once.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::{Instant, timeout};
use tracing::{debug, info, trace, warn};

use crate::driver::SessionOptions;
use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Command, Event, NetworkCommand, NetworkRequest, NetworkResponse, PageCommand};
use crate::transport::{Client, EventQueue};

use super::extract::{extract_links, extract_text};
use super::visit::{BrowseOutcome, Exchange, ExchangeHandler, Visit};

// ============================================================================
// ResponseBody
// ============================================================================

/// Result of `Network.getResponseBody`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseBody {
    #[serde(default)]
    body: String,
    #[serde(default)]
    base64_encoded: bool,
}

impl ResponseBody {
    fn into_bytes(self) -> Result<Vec<u8>> {
        if self.base64_encoded {
            Ok(BASE64.decode(self.body)?)
        } else {
            Ok(self.body.into_bytes())
        }
    }
}

// ============================================================================
// Capture
// ============================================================================

/// Correlation state of one visit.
#[derive(Debug, Default)]
struct Capture {
    /// Loader reported by `Page.navigate`, when the browser gave one.
    loader: Option<String>,
    primary: Option<RequestId>,
    requests: FxHashMap<RequestId, NetworkRequest>,
    responses: FxHashMap<RequestId, NetworkResponse>,
    status: u16,
    mime_type: String,
    total_bytes: u64,
    exchanges: usize,
}

impl Capture {
    fn is_primary(&self, request_id: &RequestId) -> bool {
        self.primary.as_ref() == Some(request_id)
    }

    fn for_loader(loader: Option<String>) -> Self {
        Self {
            loader,
            ..Self::default()
        }
    }

    /// Returns `true` if a request was issued by the navigation's loader.
    ///
    /// Requests without a loader ID are attributed to the navigation.
    fn is_navigation(&self, loader_id: &str) -> bool {
        match &self.loader {
            Some(loader) => loader_id.is_empty() || loader_id == loader,
            None => true,
        }
    }

    fn on_request(&mut self, request_id: RequestId, loader_id: &str, request: NetworkRequest) {
        if self.primary.is_none() {
            if self.is_navigation(loader_id) {
                debug!(request_id = %request_id, url = %request.url, "Primary request");
                self.primary = Some(request_id.clone());
            } else {
                debug!(request_id = %request_id, loader_id, url = %request.url, "Request from an earlier loader");
            }
        }
        self.requests.insert(request_id, request);
    }

    fn on_response(&mut self, request_id: RequestId, response: NetworkResponse) {
        if self.is_primary(&request_id) {
            self.status = response.status;
            self.mime_type.clone_from(&response.mime_type);
        }
        self.responses.insert(request_id, response);
    }

    /// Removes and returns both halves of a finished request.
    ///
    /// Returns `None` unless a request and a response were both seen.
    fn take_pair(&mut self, request_id: &RequestId) -> Option<(NetworkRequest, NetworkResponse)> {
        let request = self.requests.remove(request_id);
        let response = self.responses.remove(request_id);
        request.zip(response)
    }
}

// ============================================================================
// PageSession
// ============================================================================

/// Drives page visits over one tab connection.
///
/// Owns the connection's event queue, so there is at most one session per
/// connection.
pub struct PageSession {
    client: Client,
    events: EventQueue,
    options: SessionOptions,
    handler: Option<ExchangeHandler>,
}

impl fmt::Debug for PageSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageSession")
            .field("client", &self.client)
            .field("options", &self.options)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl PageSession {
    /// Creates a session over a connected client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the client's event queue is already owned
    /// by another session.
    pub fn new(client: Client, options: SessionOptions) -> Result<Self> {
        let events = client
            .take_events()
            .ok_or_else(|| Error::config("Event queue already taken by another session"))?;

        Ok(Self {
            client,
            events,
            options,
            handler: None,
        })
    }

    /// Enables the page and network domains and installs URL blocking.
    ///
    /// # Errors
    ///
    /// Returns any error of the underlying calls.
    pub async fn prepare(&self, blocked_urls: &[String]) -> Result<()> {
        self.client.call(Command::Page(PageCommand::Enable)).await?;
        self.client.call(Command::Network(NetworkCommand::Enable)).await?;

        if !blocked_urls.is_empty() {
            let command = Command::Network(NetworkCommand::SetBlockedUrls {
                urls: blocked_urls.to_vec(),
            });
            self.client.call(command).await?;
            debug!(count = blocked_urls.len(), "Blocked URL patterns installed");
        }

        Ok(())
    }

    /// Installs the handler receiving every captured exchange.
    pub fn set_exchange_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&Exchange) -> Result<()> + Send + 'static,
    {
        self.handler = Some(Box::new(handler));
    }

    /// Removes the exchange handler.
    pub fn clear_exchange_handler(&mut self) {
        self.handler = None;
    }

    /// Returns the underlying client.
    #[inline]
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Returns the session options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Returns `true` if the connection is gone.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// Closes the connection.
    pub fn close(&self) {
        self.client.close();
    }
}

// ============================================================================
// Browsing
// ============================================================================

impl PageSession {
    /// Visits a URL and returns its outcome.
    ///
    /// Never blocks past the visit timeout plus the reset step, which is
    /// itself bounded by the call timeout.
    pub async fn browse(&mut self, url: &str) -> BrowseOutcome {
        let stale = self.events.drain_stale();
        if stale > 0 {
            debug!(count = stale, "Discarded stale events");
        }

        info!(url, "Browsing");
        let started = Instant::now();
        let visit_timeout = self.options.visit_timeout;

        let outcome = match timeout(visit_timeout, self.visit(url, started)).await {
            Ok(Ok(visit)) => {
                info!(
                    url,
                    status = visit.status,
                    links = visit.links.len(),
                    bytes = visit.total_bytes,
                    elapsed_ms = visit.duration.as_millis() as u64,
                    "Visited"
                );
                BrowseOutcome::Visited(visit)
            }
            Ok(Err(e)) => {
                warn!(url, error = %e, "Visit failed");
                BrowseOutcome::Failed(e)
            }
            Err(_) => {
                let timeout_ms = visit_timeout.as_millis() as u64;
                warn!(url, timeout_ms, "Visit timed out");
                BrowseOutcome::TimedOut {
                    url: url.to_string(),
                    timeout_ms,
                }
            }
        };

        self.reset().await;
        outcome
    }

    async fn visit(&mut self, url: &str, started: Instant) -> Result<Visit> {
        let loader = self.navigate(url).await?;
        let capture = self.collect(url, Capture::for_loader(loader)).await?;

        let links = extract_links(&self.client).await?;
        let dom_text = extract_text(&self.client).await?;

        Ok(Visit {
            url: url.to_string(),
            duration: started.elapsed(),
            status: capture.status,
            mime_type: capture.mime_type,
            links,
            dom_text,
            total_bytes: capture.total_bytes,
        })
    }

    /// Navigates and returns the new document's loader ID, if reported.
    async fn navigate(&self, url: &str) -> Result<Option<String>> {
        let result = self.client.call(Command::navigate(url)).await?;

        if let Some(reason) = result.get("errorText").and_then(Value::as_str)
            && !reason.is_empty()
        {
            return Err(Error::navigation_failed(url, reason));
        }

        Ok(result
            .get("loaderId")
            .and_then(Value::as_str)
            .filter(|loader| !loader.is_empty())
            .map(str::to_string))
    }

    /// Consumes events until the page's load event.
    async fn collect(&mut self, url: &str, mut capture: Capture) -> Result<Capture> {
        loop {
            let event = self.events.next().await.ok_or(Error::ConnectionClosed)?;
            trace!(method = event.method(), "Collecting");

            match event {
                Event::RequestWillBeSent(sent) => {
                    capture.on_request(sent.request_id, &sent.loader_id, sent.request);
                }
                Event::ResponseReceived(received) => {
                    capture.on_response(received.request_id, received.response);
                }
                Event::LoadingFinished(finished) => {
                    self.finish(&mut capture, finished.request_id).await?;
                }
                Event::LoadingFailed(failed) => {
                    if capture.is_primary(&failed.request_id) {
                        return Err(Error::navigation_failed(url, failed.error_text));
                    }
                    debug!(
                        request_id = %failed.request_id,
                        error = %failed.error_text,
                        canceled = failed.canceled,
                        "Subresource failed"
                    );
                    capture.take_pair(&failed.request_id);
                }
                Event::LoadEventFired(_) if capture.primary.is_none() => {
                    debug!("Load event before the primary request, skipping");
                }
                Event::LoadEventFired(_) => {
                    debug!(exchanges = capture.exchanges, "Page loaded");
                    return Ok(capture);
                }
            }
        }
    }

    /// Turns a finished request into an exchange and hands it off.
    async fn finish(&mut self, capture: &mut Capture, request_id: RequestId) -> Result<()> {
        let Some((request, response)) = capture.take_pair(&request_id) else {
            trace!(request_id = %request_id, "Finished without request and response");
            return Ok(());
        };

        let body = match fetch_body(&self.client, &request_id).await {
            Ok(body) => body,
            Err(e @ Error::Protocol { .. }) => {
                warn!(request_id = %request_id, url = %response.url, error = %e, "Body unavailable, skipping exchange");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        capture.total_bytes += body.len() as u64;
        capture.exchanges += 1;

        let exchange = Exchange {
            request_id,
            request,
            response,
            body,
        };

        if let Some(handler) = self.handler.as_mut() {
            handler(&exchange)?;
        }

        Ok(())
    }

    /// Navigates to the reset URL and waits for it to load.
    ///
    /// Best effort: failures are logged.
    async fn reset(&mut self) {
        if self.client.is_closed() {
            return;
        }

        // Only a load event queued after this point can be the reset's own.
        let stale = self.events.drain_stale();
        if stale > 0 {
            trace!(count = stale, "Discarded events before reset");
        }

        let reset_url = self.options.reset_url.clone();
        if let Err(e) = self.client.call(Command::navigate(reset_url.as_str())).await {
            warn!(url = %reset_url, error = %e, "Reset navigation failed");
            return;
        }

        let settle_timeout = self.options.call_timeout;
        let events = &mut self.events;
        let settle = async move {
            while let Some(event) = events.next().await {
                if matches!(event, Event::LoadEventFired(_)) {
                    return true;
                }
            }
            false
        };

        match timeout(settle_timeout, settle).await {
            Ok(true) => trace!(url = %reset_url, "Page reset"),
            Ok(false) => debug!("Event stream ended during reset"),
            Err(_) => debug!(url = %reset_url, "Reset did not settle"),
        }
    }
}

/// Fetches and decodes a response body.
async fn fetch_body(client: &Client, request_id: &RequestId) -> Result<Vec<u8>> {
    let result = client
        .call(Command::get_response_body(request_id.clone()))
        .await?;
    let body: ResponseBody = serde_json::from_value(result)?;
    body.into_bytes()
}

// ============================================================================
// Tests
// ============================================================================
