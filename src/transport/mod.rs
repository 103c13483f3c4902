//! WebSocket transport layer.
//!
//! This module handles communication with the browser's remote-debugging
//! endpoint over one persistent WebSocket per tab.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  PageSession    │                              │  Browser tab    │
//! │                 │         WebSocket            │                 │
//! │  Client ───────►│◄────────────────────────────►│  DevTools       │
//! │  EventQueue ◄───│   /devtools/page/<target>    │  endpoint       │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `discovery::list_targets` - Find the tab's WebSocket URL
//! 2. `Client::connect` - Dial and spawn the event loop
//! 3. `Client::call` - Send commands, await correlated responses
//! 4. `EventQueue::next` - Consume notifications in wire order
//! 5. `Client::close` - Shut the event loop down
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket client and event loop |
//! | `discovery` | HTTP target discovery and tab dialing |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket client and event loop.
pub mod connection;

/// Debug target discovery.
pub mod discovery;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{
    Client, ClientConfig, DEFAULT_CALL_TIMEOUT, DEFAULT_EVENT_QUEUE_CAPACITY, EventQueue,
    PendingCall,
};
pub use discovery::{TargetInfo, dial_first_tab, dial_new_tab, list_targets, select_first_tab};
