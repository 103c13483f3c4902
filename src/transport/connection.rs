//! WebSocket connection and event loop.
//!
//! This module handles the WebSocket connection to the browser's debug
//! endpoint, including request/response correlation and event routing.
//!
//! # Event Loop
//!
//! The client spawns one tokio task per connection that handles:
//!
//! - Incoming frames from the browser (responses, notifications)
//! - Outgoing requests from the [`Client`] handles
//! - Request/response correlation by [`CallId`]
//! - Pushing decoded [`Event`]s onto the bounded event queue
//!
//! A full event queue blocks the loop until the consumer catches up, which
//! applies backpressure to the browser's notification feed.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::CallId;
use crate::protocol::{Command, Event, EventRegistry, Frame, Notification, Request, Response};

// ============================================================================
// Constants
// ============================================================================

/// Default deadline for a single call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default capacity of the event queue.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1000;

// ============================================================================
// Types
// ============================================================================

/// Map of call IDs to their response channels.
type CorrelationMap = FxHashMap<CallId, PendingEntry>;

/// A registered call awaiting its response.
struct PendingEntry {
    method: String,
    response_tx: oneshot::Sender<Result<Response>>,
}

/// Pending-call table and identifier counter.
///
/// Only ever mutated under the surrounding mutex.
struct PendingCalls {
    next_id: CallId,
    calls: CorrelationMap,
    closed: bool,
}

impl PendingCalls {
    fn new() -> Self {
        Self {
            next_id: CallId::new(1),
            calls: CorrelationMap::default(),
            closed: false,
        }
    }
}

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a serialized request.
    Send { call_id: CallId, frame: String },
    /// Close the connection.
    Shutdown,
}

// ============================================================================
// ClientConfig
// ============================================================================

/// Tunables for a [`Client`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Deadline applied by [`Client::call`].
    pub call_timeout: Duration,
    /// Capacity of the bounded event queue.
    pub event_queue_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}

// ============================================================================
// EventQueue
// ============================================================================

/// Receiving end of the connection's event queue.
///
/// Events arrive in wire order. There is exactly one queue per connection.
#[derive(Debug)]
pub struct EventQueue {
    rx: mpsc::Receiver<Event>,
}

impl EventQueue {
    /// Waits for the next event.
    ///
    /// Returns `None` once the connection is gone and the queue is empty.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Discards every event already queued and returns how many were dropped.
    pub fn drain_stale(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

// ============================================================================
// PendingCall
// ============================================================================

/// Handle to an issued call whose response has not been awaited yet.
///
/// Several handles can be outstanding at once; each resolves independently.
#[must_use = "a pending call does nothing unless waited on"]
pub struct PendingCall {
    id: CallId,
    method: String,
    response_rx: oneshot::Receiver<Result<Response>>,
    pending: Arc<Mutex<PendingCalls>>,
}

impl PendingCall {
    /// Returns the call ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> CallId {
        self.id
    }

    /// Returns the method name.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Waits for the response.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the browser answered with an error
    /// - [`Error::RequestTimeout`] if no response arrived within `deadline`
    /// - [`Error::ConnectionClosed`] if the connection went away first
    pub async fn wait(mut self, deadline: Duration) -> Result<Value> {
        match timeout(deadline, &mut self.response_rx).await {
            Ok(Ok(response)) => response?.into_result(),
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                warn!(call_id = %self.id, method = %self.method, "Call timed out");
                Err(Error::request_timeout(
                    self.id,
                    std::mem::take(&mut self.method),
                    deadline.as_millis() as u64,
                ))
            }
        }
    }
}

impl Drop for PendingCall {
    /// Unregisters the call so a late response for its id is dropped by the
    /// read loop. Also covers a `wait` future cancelled by an outer deadline.
    fn drop(&mut self) {
        if self.pending.lock().calls.remove(&self.id).is_some() {
            trace!(call_id = %self.id, method = %self.method, "Abandoned call unregistered");
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// RPC client over one debug WebSocket connection.
///
/// Handles request/response correlation and event routing.
/// The client spawns an internal event loop task.
///
/// # Thread Safety
///
/// `Client` is `Send + Sync` and cheap to clone. Any number of tasks may
/// issue calls concurrently; the event queue has a single consumer.
pub struct Client {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Pending-call table (shared with event loop).
    pending: Arc<Mutex<PendingCalls>>,
    /// Event queue, handed out once.
    events: Arc<Mutex<Option<EventQueue>>>,
    /// Deadline for [`Client::call`].
    call_timeout: Duration,
}

impl Clone for Client {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            pending: Arc::clone(&self.pending),
            events: Arc::clone(&self.events),
            call_timeout: self.call_timeout,
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("pending", &self.pending_count())
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Connects to a debug WebSocket URL with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the WebSocket cannot be established.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        Self::connect_with(ws_url, EventRegistry::standard(), ClientConfig::default()).await
    }

    /// Connects to a debug WebSocket URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the WebSocket cannot be established.
    pub async fn connect_with(
        ws_url: &str,
        registry: &'static EventRegistry,
        config: ClientConfig,
    ) -> Result<Self> {
        debug!(url = %ws_url, "Connecting to debug endpoint");

        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| Error::connection(format!("{ws_url}: {e}")))?;

        debug!(url = %ws_url, "Connected");
        Ok(Self::from_stream(ws_stream, registry, config))
    }

    /// Creates a client over an established WebSocket stream.
    ///
    /// Spawns the event loop task internally.
    pub fn from_stream<S>(
        ws_stream: WebSocketStream<S>,
        registry: &'static EventRegistry,
        config: ClientConfig,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(config.event_queue_capacity.max(1));
        let pending = Arc::new(Mutex::new(PendingCalls::new()));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&pending),
            event_tx,
            registry,
        ));

        Self {
            command_tx,
            pending,
            events: Arc::new(Mutex::new(Some(EventQueue { rx: event_rx }))),
            call_timeout: config.call_timeout,
        }
    }

    /// Takes the event queue.
    ///
    /// Returns `None` if it was already taken.
    #[must_use]
    pub fn take_events(&self) -> Option<EventQueue> {
        self.events.lock().take()
    }

    /// Issues a call and waits for its response with the default deadline.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::RequestTimeout`] if response not received within the deadline
    /// - [`Error::Protocol`] if the browser answered with an error
    pub async fn call(&self, command: Command) -> Result<Value> {
        self.call_with_timeout(command, self.call_timeout).await
    }

    /// Issues a call and waits for its response with a custom deadline.
    ///
    /// # Errors
    ///
    /// Same as [`Client::call`].
    pub async fn call_with_timeout(&self, command: Command, deadline: Duration) -> Result<Value> {
        self.begin_call(command)?.wait(deadline).await
    }

    /// Issues a call without waiting for its response.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::Json`] if the command cannot be serialized
    pub fn begin_call(&self, command: Command) -> Result<PendingCall> {
        let method = command.method().to_string();
        let (response_tx, response_rx) = oneshot::channel();

        let id = {
            let mut pending = self.pending.lock();
            if pending.closed {
                return Err(Error::ConnectionClosed);
            }

            let id = pending.next_id;
            let frame = serde_json::to_string(&Request::new(id, command))?;
            pending.next_id = id.next();

            // Queue while holding the lock so wire order follows id order.
            self.command_tx
                .send(ConnectionCommand::Send { call_id: id, frame })
                .map_err(|_| Error::ConnectionClosed)?;

            pending.calls.insert(
                id,
                PendingEntry {
                    method: method.clone(),
                    response_tx,
                },
            );
            id
        };

        debug!(call_id = %id, method = %method, "CALL");

        Ok(PendingCall {
            id,
            method,
            response_rx,
            pending: Arc::clone(&self.pending),
        })
    }

    /// Returns the number of calls awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().calls.len()
    }

    /// Returns `true` once the event loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pending.lock().closed
    }

    /// Returns the default call deadline.
    #[inline]
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Closes the connection.
    ///
    /// Outstanding calls fail with [`Error::ConnectionClosed`].
    pub fn close(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        pending: Arc<Mutex<PendingCalls>>,
        event_tx: mpsc::Sender<Event>,
        registry: &'static EventRegistry,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut corruption: Option<String> = None;

        loop {
            tokio::select! {
                // Incoming frames from the browser
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            match Frame::parse(&text) {
                                Ok(Frame::Response(response)) => {
                                    Self::complete_call(response, &pending);
                                }
                                Ok(Frame::Notification(notification)) => {
                                    Self::dispatch_event(notification, registry, &event_tx).await;
                                }
                                Err(e) => {
                                    error!(error = %e, "Tearing down connection");
                                    corruption = Some(e.to_string());
                                    let _ = ws_write.close().await;
                                    break;
                                }
                            }
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from Client handles
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { call_id, frame }) => {
                            Self::write_frame(call_id, frame, &mut ws_write, &pending).await;
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        Self::fail_pending_calls(&pending, corruption.as_deref());

        debug!("Event loop terminated");
    }

    /// Completes the pending call matching a response.
    fn complete_call(response: Response, pending: &Mutex<PendingCalls>) {
        let entry = pending.lock().calls.remove(&response.id);

        let Some(entry) = entry else {
            warn!(call_id = %response.id, "Response for unknown call");
            return;
        };

        match &response.error {
            None => trace!(call_id = %response.id, method = %entry.method, "RESULT"),
            Some(err) => debug!(
                call_id = %response.id,
                method = %entry.method,
                code = err.code,
                message = %err.message,
                "ERROR"
            ),
        }

        let _ = entry.response_tx.send(Ok(response));
    }

    /// Decodes a notification and pushes it onto the event queue.
    async fn dispatch_event(
        notification: Notification,
        registry: &EventRegistry,
        event_tx: &mpsc::Sender<Event>,
    ) {
        let Notification { method, params } = notification;

        let event = match registry.decode(&method, params) {
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                warn!(method = %method, error = %e, "Dropping undecodable event");
                return;
            }
            None => {
                trace!(method = %method, "Dropping unregistered event");
                return;
            }
        };

        trace!(method = %method, "EVENT");

        // Blocks while the queue is full.
        if event_tx.send(event).await.is_err() {
            trace!(method = %method, "Event queue gone, dropping event");
        }
    }

    /// Writes a serialized request to the socket.
    async fn write_frame<S>(
        call_id: CallId,
        frame: String,
        ws_write: &mut SplitSink<WebSocketStream<S>, Message>,
        pending: &Mutex<PendingCalls>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
            let entry = pending.lock().calls.remove(&call_id);
            if let Some(entry) = entry {
                let _ = entry.response_tx.send(Err(Error::connection(e.to_string())));
            }
            return;
        }

        trace!(call_id = %call_id, "Request sent");
    }

    /// Fails all pending calls and refuses new ones.
    fn fail_pending_calls(pending: &Mutex<PendingCalls>, corruption: Option<&str>) {
        let drained: Vec<_> = {
            let mut pending = pending.lock();
            pending.closed = true;
            pending.calls.drain().collect()
        };
        let count = drained.len();

        for (_, entry) in drained {
            let err = match corruption {
                Some(message) => Error::stream_corrupted(message),
                None => Error::ConnectionClosed,
            };
            let _ = entry.response_tx.send(Err(err));
        }

        if count > 0 {
            debug!(count, "Failed pending calls on shutdown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
