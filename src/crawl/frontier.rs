//! Crawl frontier: pages pending, visited and linked.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::browser::Visit;
use crate::error::Result;

// ============================================================================
// PageId
// ============================================================================

/// Identifier of a page in a frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PageId(u64);

impl PageId {
    /// Creates a page ID.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Frontier
// ============================================================================

/// Store of crawl candidates and results.
///
/// Implementations decide ordering and deduplication. Errors are those of
/// the backing store.
pub trait Frontier {
    /// Adds a seed URL and returns its page.
    fn add_seed(&mut self, url: &str) -> Result<PageId>;

    /// Returns the next page to visit, or `None` when the frontier is exhausted.
    fn next_candidate(&mut self) -> Result<Option<(PageId, String)>>;

    /// Records a link from `source` to `url`, enqueueing `url` if it is new.
    fn add_link(&mut self, source: PageId, url: &str) -> Result<PageId>;

    /// Records a successful visit.
    fn record_visit(&mut self, page: PageId, visit: &Visit) -> Result<()>;

    /// Records a failed or timed-out visit.
    fn record_failure(&mut self, page: PageId, reason: &str) -> Result<()>;
}

// ============================================================================
// MemoryFrontier
// ============================================================================

/// State of a page in a [`MemoryFrontier`].
#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    /// Waiting to be visited.
    Pending,
    /// Handed out by `next_candidate`.
    InProgress,
    /// Visited successfully.
    Visited(Visit),
    /// Visit failed or timed out.
    Failed(String),
}

#[derive(Debug, Clone)]
struct PageEntry {
    url: String,
    state: PageState,
}

/// In-memory breadth-first frontier.
///
/// Each URL is enqueued at most once. Links are kept as an edge list in
/// discovery order, deduplicated through a set.
#[derive(Debug, Default)]
pub struct MemoryFrontier {
    pages: Vec<PageEntry>,
    by_url: FxHashMap<String, PageId>,
    queue: VecDeque<PageId>,
    links: Vec<(PageId, PageId)>,
    edges: FxHashSet<(PageId, PageId)>,
}

impl MemoryFrontier {
    /// Creates an empty frontier.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the page for a URL, inserting and enqueueing it if unseen.
    fn intern(&mut self, url: &str) -> PageId {
        if let Some(&id) = self.by_url.get(url) {
            return id;
        }
        let id = PageId::new(self.pages.len() as u64);
        self.pages.push(PageEntry {
            url: url.to_string(),
            state: PageState::Pending,
        });
        self.by_url.insert(url.to_string(), id);
        self.queue.push_back(id);
        id
    }

    fn entry_mut(&mut self, page: PageId) -> Option<&mut PageEntry> {
        self.pages.get_mut(page.as_u64() as usize)
    }

    /// Returns the URL of a page.
    #[must_use]
    pub fn url(&self, page: PageId) -> Option<&str> {
        self.pages.get(page.as_u64() as usize).map(|e| e.url.as_str())
    }

    /// Returns the state of a page.
    #[must_use]
    pub fn state(&self, page: PageId) -> Option<&PageState> {
        self.pages.get(page.as_u64() as usize).map(|e| &e.state)
    }

    /// Returns the page of a URL, if known.
    #[must_use]
    pub fn page_of(&self, url: &str) -> Option<PageId> {
        self.by_url.get(url).copied()
    }

    /// Returns the number of known pages.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` if no page is known.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Returns the number of pages waiting to be visited.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Returns the recorded link edges.
    #[inline]
    #[must_use]
    pub fn links(&self) -> &[(PageId, PageId)] {
        &self.links
    }

    /// Returns every successful visit.
    pub fn visits(&self) -> impl Iterator<Item = (PageId, &Visit)> {
        self.pages.iter().enumerate().filter_map(|(i, e)| match &e.state {
            PageState::Visited(visit) => Some((PageId::new(i as u64), visit)),
            _ => None,
        })
    }
}

impl Frontier for MemoryFrontier {
    fn add_seed(&mut self, url: &str) -> Result<PageId> {
        Ok(self.intern(url))
    }

    fn next_candidate(&mut self) -> Result<Option<(PageId, String)>> {
        while let Some(id) = self.queue.pop_front() {
            if let Some(entry) = self.entry_mut(id)
                && entry.state == PageState::Pending
            {
                entry.state = PageState::InProgress;
                return Ok(Some((id, entry.url.clone())));
            }
        }
        Ok(None)
    }

    fn add_link(&mut self, source: PageId, url: &str) -> Result<PageId> {
        let target = self.intern(url);
        if self.edges.insert((source, target)) {
            self.links.push((source, target));
        }
        Ok(target)
    }

    fn record_visit(&mut self, page: PageId, visit: &Visit) -> Result<()> {
        if let Some(entry) = self.entry_mut(page) {
            entry.state = PageState::Visited(visit.clone());
        }
        Ok(())
    }

    fn record_failure(&mut self, page: PageId, reason: &str) -> Result<()> {
        if let Some(entry) = self.entry_mut(page) {
            entry.state = PageState::Failed(reason.to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut frontier = MemoryFrontier::new();
        let a = frontier.add_seed("http://x/a").expect("seed");
        let b = frontier.add_seed("http://x/b").expect("seed");

        assert_eq!(frontier.next_candidate().expect("next"), Some((a, "http://x/a".into())));
        let c = frontier.add_link(a, "http://x/c").expect("link");
        assert_eq!(frontier.next_candidate().expect("next"), Some((b, "http://x/b".into())));
        assert_eq!(frontier.next_candidate().expect("next"), Some((c, "http://x/c".into())));
        assert_eq!(frontier.next_candidate().expect("next"), None);
    }

    #[test]
    fn test_urls_are_enqueued_once() {
        let mut frontier = MemoryFrontier::new();
        let a = frontier.add_seed("http://x/a").expect("seed");
        assert_eq!(frontier.add_seed("http://x/a").expect("seed"), a);

        let (page, _) = frontier.next_candidate().expect("next").expect("candidate");
        assert_eq!(frontier.add_link(page, "http://x/a").expect("link"), a);
        assert_eq!(frontier.next_candidate().expect("next"), None);
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_links_are_deduplicated() {
        let mut frontier = MemoryFrontier::new();
        let a = frontier.add_seed("http://x/a").expect("seed");
        let b = frontier.add_link(a, "http://x/b").expect("link");
        frontier.add_link(a, "http://x/b").expect("link");
        frontier.add_link(b, "http://x/a").expect("link");

        assert_eq!(frontier.links(), [(a, b), (b, a)]);
        assert_eq!(frontier.page_of("http://x/b"), Some(b));
    }

    #[test]
    fn test_dense_link_graph() {
        let mut frontier = MemoryFrontier::new();
        let pages: Vec<PageId> = (0..200)
            .map(|i| frontier.add_seed(&format!("http://x/{i}")).expect("seed"))
            .collect();

        for _ in 0..2 {
            for &source in &pages {
                for i in 0..200 {
                    frontier.add_link(source, &format!("http://x/{i}")).expect("link");
                }
            }
        }

        assert_eq!(frontier.len(), 200);
        assert_eq!(frontier.links().len(), 200 * 200);
        assert_eq!(frontier.links()[0], (pages[0], pages[0]));
        assert_eq!(frontier.links()[201], (pages[1], pages[1]));
    }

    #[test]
    fn test_record_states() {
        let mut frontier = MemoryFrontier::new();
        let a = frontier.add_seed("http://x/a").expect("seed");
        let b = frontier.add_seed("http://x/b").expect("seed");
        frontier.next_candidate().expect("next");
        assert_eq!(frontier.state(a), Some(&PageState::InProgress));

        let visit = Visit {
            url: "http://x/a".into(),
            status: 200,
            ..Default::default()
        };
        frontier.record_visit(a, &visit).expect("record");
        frontier.record_failure(b, "timed out").expect("record");

        assert_eq!(frontier.state(a), Some(&PageState::Visited(visit)));
        assert_eq!(frontier.state(b), Some(&PageState::Failed("timed out".into())));
        assert_eq!(frontier.visits().count(), 1);

        // A page recorded before being handed out is not revisited.
        assert_eq!(frontier.next_candidate().expect("next"), None);
    }
}
