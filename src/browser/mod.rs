//! Page browsing.
//!
//! A [`PageSession`] navigates one tab, correlates its network events into
//! [`Exchange`]s and extracts links and text once the page has loaded.
//!
//! # Example
//!
//! ```no_run
//! use cdp_crawler::{SessionBuilder, BrowseOutcome};
//!
//! # async fn example() -> cdp_crawler::Result<()> {
//! let mut session = SessionBuilder::new().port(9292).connect().await?;
//!
//! session.set_exchange_handler(|exchange| {
//!     println!("{} {}", exchange.response.status, exchange.target_uri());
//!     Ok(())
//! });
//!
//! match session.browse("https://example.com/").await {
//!     BrowseOutcome::Visited(visit) => println!("{} links", visit.links.len()),
//!     other => println!("{other}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `session` | Visit state machine |
//! | `extract` | In-page link and text extraction |
//! | `visit` | Visit results and exchanges |

// ============================================================================
// Submodules
// ============================================================================

/// In-page extraction scripts.
pub mod extract;

/// Visit state machine.
pub mod session;

/// Visit results and exchanges.
pub mod visit;

// ============================================================================
// Re-exports
// ============================================================================

pub use session::PageSession;
pub use visit::{BrowseOutcome, Exchange, ExchangeHandler, Visit};
