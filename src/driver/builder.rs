//! Builder pattern for session configuration.
//!
//! Provides a fluent API for connecting to a browser and creating a ready
//! [`PageSession`].
//!
//! # Example
//!
//! ```no_run
//! use cdp_crawler::{SessionBuilder, SessionOptions};
//!
//! # async fn example() -> cdp_crawler::Result<()> {
//! let session = SessionBuilder::new()
//!     .host("localhost")
//!     .port(9292)
//!     .new_tab(true)
//!     .block_url("*google-analytics.com/ga.js")
//!     .options(SessionOptions::new())
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use tracing::info;

use crate::browser::PageSession;
use crate::error::{Error, Result};
use crate::transport::{dial_first_tab, dial_new_tab};

use super::options::SessionOptions;

// ============================================================================
// Constants
// ============================================================================

/// Default remote-debugging host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default remote-debugging port.
pub const DEFAULT_PORT: u16 = 9292;

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for configuring a [`PageSession`].
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    /// Remote-debugging host.
    host: String,
    /// Remote-debugging port.
    port: u16,
    /// Open a fresh tab instead of attaching to the first one.
    new_tab: bool,
    /// URL patterns blocked in the tab.
    blocked_urls: Vec<String>,
    /// Session timing options.
    options: SessionOptions,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            new_tab: false,
            blocked_urls: Vec::new(),
            options: SessionOptions::default(),
        }
    }
}

// ============================================================================
// SessionBuilder Implementation
// ============================================================================

impl SessionBuilder {
    /// Creates a builder targeting `localhost:9292`.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the remote-debugging host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the remote-debugging port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Opens a fresh tab instead of attaching to the first one.
    #[inline]
    #[must_use]
    pub fn new_tab(mut self, new_tab: bool) -> Self {
        self.new_tab = new_tab;
        self
    }

    /// Blocks requests matching a URL pattern (`*` wildcards).
    #[inline]
    #[must_use]
    pub fn block_url(mut self, pattern: impl Into<String>) -> Self {
        self.blocked_urls.push(pattern.into());
        self
    }

    /// Blocks requests matching any of the URL patterns.
    #[inline]
    #[must_use]
    pub fn block_urls(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.blocked_urls.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Sets the session options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Connects, enables the page and network domains and returns the session.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the configuration is invalid
    /// - [`Error::Http`] if target discovery fails
    /// - [`Error::Connection`] if the tab cannot be dialed
    /// - Any error of the setup calls
    pub async fn connect(self) -> Result<PageSession> {
        self.validate()?;

        let config = self.options.client_config();
        let client = if self.new_tab {
            dial_new_tab(&self.host, self.port, config).await?
        } else {
            dial_first_tab(&self.host, self.port, config).await?
        };

        let session = PageSession::new(client, self.options)?;
        if let Err(e) = session.prepare(&self.blocked_urls).await {
            session.close();
            return Err(e);
        }

        info!(host = %self.host, port = self.port, new_tab = self.new_tab, "Session ready");
        Ok(session)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SessionBuilder {
    /// Validates the builder configuration.
    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config(
                "Host is required. Use .host() to set it.\n\
                 Example: SessionBuilder::new().host(\"localhost\")",
            ));
        }

        if self.port == 0 {
            return Err(Error::config(
                "Port must be non-zero. Use .port() to set it.\n\
                 Example: SessionBuilder::new().port(9292)",
            ));
        }

        if self.blocked_urls.iter().any(|p| p.is_empty()) {
            return Err(Error::config("Blocked URL patterns must not be empty"));
        }

        self.options.validate()
    }
}

// ============================================================================
// Tests
// ============================================================================
