//! CDP Crawler - Web archiving crawler over the Chrome DevTools Protocol.
//!
//! This library drives an already running Chromium-family browser through
//! its remote-debugging WebSocket, records every HTTP exchange of each page
//! it visits into a WARC file, and extracts links and rendered text.
//!
//! # Architecture
//!
//! The crawler follows a client-server model:
//!
//! - **Local End (Rust)**: Sends commands, receives events via WebSocket
//! - **Remote End (Browser)**: Executes commands in a tab, emits events
//!
//! Key design principles:
//!
//! - Each [`Client`] owns one WebSocket connection and its event loop task
//! - Responses are correlated to calls by ascending integer ID
//! - Events flow through one bounded queue, in wire order, to one [`PageSession`]
//! - Each completed request/response pair becomes an [`Exchange`], archived by [`WarcWriter`]
//!
//! # Quick Start
//!
//! ```no_run
//! use cdp_crawler::{BrowseOutcome, Result, SessionBuilder, WarcWriter};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Attach to the first tab of a browser started with
//!     // --remote-debugging-port=9292
//!     let mut session = SessionBuilder::new()
//!         .host("localhost")
//!         .port(9292)
//!         .connect()
//!         .await?;
//!
//!     // Archive everything the page loads
//!     session.set_exchange_handler(WarcWriter::create("data/crawl.warc")?.into_handler());
//!
//!     if let BrowseOutcome::Visited(visit) = session.browse("https://example.com").await {
//!         println!("{} -> {} links", visit.status, visit.links.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`archive`] | WARC record formatting and writing |
//! | [`browser`] | Page sessions, visits and exchanges |
//! | [`crawl`] | Frontier, scope and crawl loop |
//! | [`driver`] | Session builder and options |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | DevTools message types |
//! | [`transport`] | WebSocket transport and target discovery |

// ============================================================================
// Modules
// ============================================================================

/// WARC archiving.
///
/// [`WarcWriter`] appends each exchange as a request/response record pair.
pub mod archive;

/// Page browsing.
///
/// - [`PageSession`] - Visit state machine over one tab
/// - [`Visit`] - Result of a successful visit
/// - [`Exchange`] - One captured request/response pair
pub mod browser;

/// Crawl driver.
///
/// [`Crawler`] visits [`Frontier`] candidates within a [`UrlScope`].
pub mod crawl;

/// Session configuration.
///
/// Use [`SessionBuilder::new()`] to connect to a browser.
pub mod driver;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// DevTools protocol message types.
///
/// Commands, response frames, events and network payloads.
pub mod protocol;

/// WebSocket transport layer.
///
/// Connection management, call correlation and target discovery.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Archive types
pub use archive::{ExchangeRecords, WarcWriter};

// Browser types
pub use browser::{BrowseOutcome, Exchange, ExchangeHandler, PageSession, Visit};

// Crawl types
pub use crawl::{CrawlStats, Crawler, Frontier, MemoryFrontier, PageId, UrlScope};

// Driver types
pub use driver::{SessionBuilder, SessionOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CallId, RecordId, RequestId, TargetId};

// Transport types
pub use transport::{Client, ClientConfig, EventQueue, TargetInfo};
