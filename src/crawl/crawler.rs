//! Breadth-first crawl loop over one page session.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::browser::{BrowseOutcome, PageSession, Visit};
use crate::error::{Error, Result};

use super::frontier::{Frontier, PageId};
use super::scope::UrlScope;

// ============================================================================
// CrawlStats
// ============================================================================

/// Counters of a finished crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStats {
    /// Pages browsed.
    pub pages: usize,
    /// Pages visited successfully.
    pub visited: usize,
    /// Pages that failed.
    pub failed: usize,
    /// Pages that timed out.
    pub timed_out: usize,
    /// In-scope links recorded.
    pub links: usize,
    /// Sum of captured body bytes.
    pub bytes: u64,
}

impl fmt::Display for CrawlStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages ({} visited, {} failed, {} timed out), {} links, {} bytes",
            self.pages, self.visited, self.failed, self.timed_out, self.links, self.bytes
        )
    }
}

// ============================================================================
// Crawler
// ============================================================================

/// Visits frontier candidates one at a time and feeds discovered links back.
#[derive(Debug)]
pub struct Crawler<F> {
    session: PageSession,
    frontier: F,
    scope: UrlScope,
}

impl<F: Frontier> Crawler<F> {
    /// Creates a crawler.
    #[must_use]
    pub fn new(session: PageSession, frontier: F, scope: UrlScope) -> Self {
        Self {
            session,
            frontier,
            scope,
        }
    }

    /// Adds a seed URL if it is in scope.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is not an in-scope http(s) URL
    /// - Any frontier error
    pub fn seed(&mut self, url: &str) -> Result<PageId> {
        let normalized = self
            .scope
            .admit(url)
            .ok_or_else(|| Error::config(format!("Seed {url} is outside the crawl scope")))?;
        self.frontier.add_seed(&normalized)
    }

    /// Returns the frontier.
    #[inline]
    #[must_use]
    pub fn frontier(&self) -> &F {
        &self.frontier
    }

    /// Returns the page session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &PageSession {
        &self.session
    }

    /// Returns the session, frontier and scope.
    #[must_use]
    pub fn into_parts(self) -> (PageSession, F, UrlScope) {
        (self.session, self.frontier, self.scope)
    }

    /// Crawls until the frontier is exhausted or `max_pages` pages were browsed.
    ///
    /// Failed and timed-out pages are recorded and skipped.
    ///
    /// # Errors
    ///
    /// - A connection-level error if the browser connection is lost
    /// - [`Error::Io`] if archiving to disk fails
    /// - Any frontier error
    pub async fn run(&mut self, max_pages: Option<usize>) -> Result<CrawlStats> {
        let mut stats = CrawlStats::default();

        loop {
            if let Some(max) = max_pages
                && stats.pages >= max
            {
                info!(max, "Page limit reached");
                break;
            }

            let Some((page, url)) = self.frontier.next_candidate()? else {
                debug!("Frontier exhausted");
                break;
            };

            let outcome = self.session.browse(&url).await;
            stats.pages += 1;

            match outcome {
                BrowseOutcome::Visited(visit) => {
                    stats.visited += 1;
                    stats.bytes += visit.total_bytes;
                    stats.links += self.enqueue_links(page, &visit)?;
                    self.frontier.record_visit(page, &visit)?;
                }
                BrowseOutcome::Failed(err) => {
                    stats.failed += 1;
                    self.frontier.record_failure(page, &err.to_string())?;
                    if is_fatal(&err) {
                        warn!(url = %url, error = %err, "Stopping crawl");
                        return Err(err);
                    }
                }
                BrowseOutcome::TimedOut { timeout_ms, .. } => {
                    stats.timed_out += 1;
                    self.frontier
                        .record_failure(page, &format!("timed out after {timeout_ms}ms"))?;
                }
            }

            if self.session.is_closed() {
                warn!(url = %url, "Connection lost, stopping crawl");
                return Err(Error::ConnectionClosed);
            }
        }

        info!(%stats, "Crawl finished");
        Ok(stats)
    }

    /// Records in-scope links of a visit and returns how many there were.
    fn enqueue_links(&mut self, page: PageId, visit: &Visit) -> Result<usize> {
        let mut admitted = 0;
        for link in &visit.links {
            if let Some(normalized) = self.scope.admit(link) {
                self.frontier.add_link(page, &normalized)?;
                admitted += 1;
            }
        }
        debug!(page = %page, found = visit.links.len(), admitted, "Links recorded");
        Ok(admitted)
    }
}

/// Returns `true` for errors after which no further page can succeed.
fn is_fatal(err: &Error) -> bool {
    err.is_connection_error() || matches!(err, Error::Io(_))
}

// ============================================================================
// Tests
// ============================================================================
