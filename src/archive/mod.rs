//! WARC archiving of captured exchanges.
//!
//! # Example
//!
//! ```no_run
//! use cdp_crawler::{SessionBuilder, WarcWriter};
//!
//! # async fn example() -> cdp_crawler::Result<()> {
//! let mut session = SessionBuilder::new().connect().await?;
//! session.set_exchange_handler(WarcWriter::create("data/crawl.warc")?.into_handler());
//! session.browse("https://example.com/").await;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `record` | Record and header block formatting |
//! | `warc` | Append-only file writer |

// ============================================================================
// Submodules
// ============================================================================

/// Record and header block formatting.
pub mod record;

/// Append-only file writer.
pub mod warc;

// ============================================================================
// Re-exports
// ============================================================================

pub use record::{ExchangeRecords, RecordType, format_exchange, payload_digest};
pub use warc::WarcWriter;
