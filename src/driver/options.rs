//! Page session timing and reset options.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use cdp_crawler::SessionOptions;
//!
//! let options = SessionOptions::new()
//!     .with_visit_timeout(Duration::from_secs(30))
//!     .with_reset_url("about:blank");
//!
//! assert_eq!(options.visit_timeout, Duration::from_secs(30));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::{ClientConfig, DEFAULT_CALL_TIMEOUT, DEFAULT_EVENT_QUEUE_CAPACITY};

// ============================================================================
// Constants
// ============================================================================

/// Default deadline for one page visit.
pub const DEFAULT_VISIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default page loaded after every visit.
pub const DEFAULT_RESET_URL: &str = "about:blank";

// ============================================================================
// SessionOptions
// ============================================================================

/// Timing and reset configuration of a page session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Deadline for each RPC call.
    pub call_timeout: Duration,

    /// Deadline for a whole visit, from navigation to extraction.
    pub visit_timeout: Duration,

    /// Capacity of the connection's event queue.
    pub event_queue_capacity: usize,

    /// URL navigated to after each visit.
    pub reset_url: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            visit_timeout: DEFAULT_VISIT_TIMEOUT,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            reset_url: DEFAULT_RESET_URL.to_string(),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionOptions {
    /// Sets the per-call deadline.
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Sets the per-visit deadline.
    #[inline]
    #[must_use]
    pub fn with_visit_timeout(mut self, timeout: Duration) -> Self {
        self.visit_timeout = timeout;
        self
    }

    /// Sets the event queue capacity.
    #[inline]
    #[must_use]
    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    /// Sets the URL loaded between visits.
    #[inline]
    #[must_use]
    pub fn with_reset_url(mut self, url: impl Into<String>) -> Self {
        self.reset_url = url.into();
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl SessionOptions {
    /// Returns the transport configuration these options imply.
    #[inline]
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            call_timeout: self.call_timeout,
            event_queue_capacity: self.event_queue_capacity,
        }
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for zero timeouts, a zero queue capacity
    /// or an empty reset URL.
    pub fn validate(&self) -> Result<()> {
        if self.call_timeout.is_zero() || self.visit_timeout.is_zero() {
            return Err(Error::config("Timeouts must be greater than zero"));
        }
        if self.event_queue_capacity == 0 {
            return Err(Error::config("Event queue capacity must be greater than zero"));
        }
        if self.reset_url.is_empty() {
            return Err(Error::config("Reset URL must not be empty"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
