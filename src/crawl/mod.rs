//! Crawl driver.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frontier` | `Frontier` trait and in-memory implementation |
//! | `scope` | URL prefix scope |
//! | `crawler` | Crawl loop |

// ============================================================================
// Submodules
// ============================================================================

/// Crawl loop.
pub mod crawler;

/// Candidate store.
pub mod frontier;

/// URL prefix scope.
pub mod scope;

// ============================================================================
// Re-exports
// ============================================================================

pub use crawler::{CrawlStats, Crawler};
pub use frontier::{Frontier, MemoryFrontier, PageId, PageState};
pub use scope::UrlScope;
