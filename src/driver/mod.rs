//! Session setup.
//!
//! This module provides the main entry point for browsing: it discovers a
//! tab, connects to it and prepares a [`PageSession`](crate::PageSession).
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SessionBuilder`] | Fluent connection builder |
//! | [`SessionOptions`] | Timeouts and reset behavior |
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use cdp_crawler::{Result, SessionBuilder, SessionOptions};
//!
//! # async fn example() -> Result<()> {
//! let mut session = SessionBuilder::new()
//!     .port(9292)
//!     .options(SessionOptions::new().with_visit_timeout(Duration::from_secs(20)))
//!     .connect()
//!     .await?;
//!
//! let visit = session.browse("https://example.com").await.into_result()?;
//! println!("{}", visit.dom_text);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for session configuration.
pub mod builder;

/// Session timing options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{DEFAULT_HOST, DEFAULT_PORT, SessionBuilder};
pub use options::{DEFAULT_RESET_URL, DEFAULT_VISIT_TIMEOUT, SessionOptions};
