//! SSE connection controller.
//!
//! [`EventSource`] owns the connection state machine and a background driver
//! task per connection. The driver is the only place bytes are decoded and
//! handler callbacks are made, so decoding state never needs more than an
//! uncontended lock.
//!
//! ```text
//!            connect()                 first response             clean end
//!   Idle ─────────────► Connecting ─────────────────► Open ─────────────────► Closed
//!   Closed ─────────┘        ▲                          │ error
//!                            │   after reconnect delay  ▼
//!                            └──────────────────── Reconnecting   (retry_on_disconnect)
//!
//!   close(): any state ──► Closed, cancels the driver, no further callbacks
//! ```

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{sleep, timeout},
};
use tracing::{debug, error, info, trace, warn};

use crate::{
    config::SseConfig,
    error::{SseError, SseResult},
    handler::SseHandler,
    parse::{ParsedItem, Pipeline},
    transport::{HttpTransport, SseRequest, SseTransport},
};

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

/// SSE connection state machine states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, never connected.
    Idle,
    /// Request issued, waiting for the response.
    Connecting,
    /// Receiving the event stream.
    Open,
    /// Waiting out the reconnect interval after an error.
    Reconnecting,
    /// Finished or closed by the user.
    Closed,
}

impl ConnectionState {
    /// Returns `true` if the connection is actively streaming.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if the connection is in a terminal state.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns `true` while a driver task owns the connection.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open | Self::Reconnecting)
    }
}

/// Identifies one `connect()` call. Advanced by every `connect()` and
/// `close()`, so a driver from an older epoch can no longer touch state or
/// reach the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
struct ConnectionEpoch(u64);

impl ConnectionEpoch {
    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

struct Inner {
    state: ConnectionState,
    epoch: ConnectionEpoch,
    last_event_id: Option<String>,
    reconnect_interval: Duration,
    task: Option<JoinHandle<()>>,
}

/// The decode pipeline, tagged with the epoch allowed to feed it.
struct Decoding {
    epoch: ConnectionEpoch,
    pipeline: Pipeline,
}

struct Shared {
    inner: Mutex<Inner>,
    decoding: Mutex<Decoding>,
}

// ---------------------------------------------------------------------------
// Public API: EventSource
// ---------------------------------------------------------------------------

/// A reconnecting SSE client.
///
/// `connect()` and `close()` are the only operations; everything the stream
/// produces is delivered to the [`SseHandler`]. The handler is held weakly:
/// the caller keeps it alive.
///
/// ```rust,no_run
/// use std::{sync::Arc, time::Duration};
///
/// use hpx_sse::{EventSource, MessageEvent, SseConfig, SseHandler};
///
/// struct Printer;
///
/// impl SseHandler for Printer {
///     fn on_message(&self, event: MessageEvent) {
///         println!("{}: {}", event.event_type(), event.data());
///     }
/// }
///
/// # async fn example() -> Result<(), hpx_sse::SseError> {
/// let handler = Arc::new(Printer);
/// let config = SseConfig::new("https://api.example.com/v1/stream")
///     .method(http::Method::GET)
///     .retry_on_disconnect(true)
///     .reconnect_interval(Duration::from_secs(2));
///
/// let source = EventSource::new(config, &handler)?;
/// source.connect();
/// // ...
/// source.close();
/// # Ok(())
/// # }
/// ```
pub struct EventSource {
    config: Arc<SseConfig>,
    transport: Arc<dyn SseTransport>,
    handler: Weak<dyn SseHandler>,
    runtime: Handle,
    shared: Arc<Shared>,
}

impl EventSource {
    /// Create a controller using the reqwest transport and the current tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, if called outside a
    /// tokio runtime, or if the HTTP client cannot be built.
    pub fn new<H: SseHandler>(config: SseConfig, handler: &Arc<H>) -> SseResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|_| SseError::config("EventSource::new must be called within a tokio runtime"))?;
        Self::with_runtime(config, handler, runtime)
    }

    /// Create a controller using the reqwest transport, spawning its driver
    /// on `runtime`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn with_runtime<H: SseHandler>(
        config: SseConfig,
        handler: &Arc<H>,
        runtime: Handle,
    ) -> SseResult<Self> {
        Self::with_transport(config, handler, HttpTransport::new()?, runtime)
    }

    /// Create a controller over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_transport<H: SseHandler, T: SseTransport>(
        config: SseConfig,
        handler: &Arc<H>,
        transport: T,
        runtime: Handle,
    ) -> SseResult<Self> {
        config.validate()?;

        let handler = Arc::downgrade(handler);
        let handler: Weak<dyn SseHandler> = handler;
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: ConnectionState::Idle,
                epoch: ConnectionEpoch::default(),
                last_event_id: config.last_event_id.clone(),
                reconnect_interval: config.reconnect_interval,
                task: None,
            }),
            decoding: Mutex::new(Decoding {
                epoch: ConnectionEpoch::default(),
                pipeline: Pipeline::new(),
            }),
        });

        Ok(Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            handler,
            runtime,
            shared,
        })
    }

    /// Start streaming.
    ///
    /// Does nothing unless the connection is `Idle` or `Closed`. Reconnecting
    /// after a close resumes from the last known event ID.
    pub fn connect(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.state.is_active() {
            debug!(state = ?inner.state, "SSE connect ignored, connection already active");
            return;
        }

        let epoch = inner.epoch.next();
        inner.epoch = epoch;
        inner.state = ConnectionState::Connecting;
        {
            let mut decoding = self.shared.decoding.lock();
            decoding.epoch = epoch;
            decoding.pipeline.reset(inner.last_event_id.clone());
        }

        let driver = Driver {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            handler: Weak::clone(&self.handler),
            shared: Arc::clone(&self.shared),
            epoch,
        };
        if let Some(previous) = inner.task.replace(self.runtime.spawn(driver.run())) {
            previous.abort();
        }
    }

    /// Stop streaming.
    ///
    /// Cancels the in-flight request or pending reconnect and suppresses all
    /// further handler callbacks. Safe to call repeatedly, before `connect()`,
    /// or from inside a handler callback.
    ///
    /// `close()` does not wait for a callback that is already running. When it
    /// is called from a thread other than the driver's, at most one callback
    /// whose epoch check had already passed may still complete after `close()`
    /// returns. Calls made from inside a callback have no such window.
    pub fn close(&self) {
        let task = {
            let mut inner = self.shared.inner.lock();
            if inner.state.is_closed() && inner.task.is_none() {
                return;
            }
            if inner.state.is_active() {
                info!(url = %self.config.url, "SSE connection closing (requested)");
            }
            inner.state = ConnectionState::Closed;
            inner.epoch = inner.epoch.next();
            inner.task.take()
        };

        if let Some(task) = task {
            task.abort();
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.inner.lock().state
    }

    /// The event ID that the next connection will send as `Last-Event-ID`.
    pub fn last_event_id(&self) -> Option<String> {
        self.shared.inner.lock().last_event_id.clone()
    }

    /// Delay before the next reconnection, including any server `retry:`
    /// override.
    pub fn reconnect_interval(&self) -> Duration {
        self.shared.inner.lock().reconnect_interval
    }

    /// The configuration this controller was built with.
    pub fn config(&self) -> &SseConfig {
        &self.config
    }
}

impl Drop for EventSource {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("url", &self.config.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Internal: background driver
// ---------------------------------------------------------------------------

/// How one connection attempt ended.
enum Outcome {
    /// The server closed the stream cleanly.
    Ended,
    /// The transport failed.
    Failed(SseError),
    /// Superseded by `close()`/`connect()` or the handler is gone.
    Stopped,
}

/// The task that drives one epoch: connects, decodes, dispatches and
/// reconnects.
struct Driver {
    config: Arc<SseConfig>,
    transport: Arc<dyn SseTransport>,
    handler: Weak<dyn SseHandler>,
    shared: Arc<Shared>,
    epoch: ConnectionEpoch,
}

impl Driver {
    async fn run(self) {
        loop {
            match self.run_attempt().await {
                Outcome::Stopped => return,
                Outcome::Ended => {
                    info!(url = %self.config.url, "SSE stream ended");
                    if self.transition(ConnectionState::Closed) {
                        self.notify(|handler| handler.on_complete(None));
                    }
                    return;
                }
                Outcome::Failed(err) => {
                    error!(url = %self.config.url, error = %err, "SSE connection failed");
                    if !self.notify(|handler| handler.on_error(&err)) {
                        return;
                    }

                    if !self.config.retry_on_disconnect {
                        if self.transition(ConnectionState::Closed) {
                            self.notify(|handler| handler.on_complete(Some(&err)));
                        }
                        return;
                    }

                    let Some(delay) = self.begin_reconnect() else {
                        return;
                    };
                    warn!(
                        url = %self.config.url,
                        delay_ms = delay.as_millis() as u64,
                        "SSE reconnecting after delay"
                    );
                    sleep(delay).await;

                    if !self.restart() {
                        return;
                    }
                }
            }
        }
    }

    async fn run_attempt(&self) -> Outcome {
        let Some(request) = self.request() else {
            return Outcome::Stopped;
        };
        info!(
            url = %request.url,
            epoch = self.epoch.0,
            last_event_id = ?request.last_event_id(),
            "SSE connecting"
        );

        let limit = self.config.timeout_interval;
        let mut body = match timeout(limit, self.transport.open(request)).await {
            Err(_) => return Outcome::Failed(SseError::timeout(limit)),
            Ok(Err(err)) => return Outcome::Failed(err),
            Ok(Ok(body)) => body,
        };

        info!(url = %self.config.url, "SSE connection established");
        if !self.mark_open() {
            return Outcome::Stopped;
        }

        loop {
            match timeout(limit, body.next()).await {
                Err(_) => return Outcome::Failed(SseError::timeout(limit)),
                Ok(None) => return Outcome::Ended,
                Ok(Some(Err(err))) => return Outcome::Failed(err),
                Ok(Some(Ok(chunk))) => {
                    if !self.receive(&chunk) {
                        return Outcome::Stopped;
                    }
                }
            }
        }
    }

    /// Build the request for this attempt from the latest known event ID.
    fn request(&self) -> Option<SseRequest> {
        let inner = self.shared.inner.lock();
        if inner.epoch != self.epoch {
            return None;
        }
        Some(SseRequest::from_config(
            &self.config,
            inner.last_event_id.as_deref(),
        ))
    }

    /// Decode one chunk and dispatch what it completed.
    fn receive(&self, chunk: &[u8]) -> bool {
        if !self.mark_open() {
            return false;
        }

        let (items, retry) = {
            let mut decoding = self.shared.decoding.lock();
            if decoding.epoch != self.epoch {
                return false;
            }
            let items = decoding.pipeline.feed(chunk);
            (items, decoding.pipeline.take_retry())
        };

        if let Some(retry) = retry
            && self.config.honor_retry_field
        {
            let mut inner = self.shared.inner.lock();
            if inner.epoch == self.epoch {
                debug!(retry_ms = retry.as_millis() as u64, "SSE server set reconnect interval");
                inner.reconnect_interval = retry;
            }
        }

        let Some(items) = items else {
            return true;
        };

        for item in items {
            let delivered = match item {
                ParsedItem::Event(event) => {
                    debug!(
                        event_type = %event.event,
                        id = ?event.last_event_id,
                        "SSE event received"
                    );
                    {
                        let mut inner = self.shared.inner.lock();
                        if inner.epoch != self.epoch {
                            return false;
                        }
                        inner.last_event_id.clone_from(&event.last_event_id);
                    }
                    self.notify(|handler| handler.on_message(event))
                }
                ParsedItem::Comment(comment) => {
                    trace!(comment = %comment, "SSE comment received");
                    self.notify(|handler| handler.on_comment(&comment))
                }
            };
            if !delivered {
                return false;
            }
        }
        true
    }

    /// Enter `Open` if not already there, firing `on_open` once per attempt.
    fn mark_open(&self) -> bool {
        {
            let mut inner = self.shared.inner.lock();
            if inner.epoch != self.epoch {
                return false;
            }
            if inner.state.is_open() {
                return true;
            }
            debug!(from = ?inner.state, "SSE state -> Open");
            inner.state = ConnectionState::Open;
        }
        self.notify(|handler| handler.on_open())
    }

    fn begin_reconnect(&self) -> Option<Duration> {
        let mut inner = self.shared.inner.lock();
        if inner.epoch != self.epoch {
            return None;
        }
        inner.state = ConnectionState::Reconnecting;
        Some(inner.reconnect_interval)
    }

    /// Reset the pipeline for a fresh attempt so nothing from the dropped
    /// connection is spliced into the new one.
    fn restart(&self) -> bool {
        let mut inner = self.shared.inner.lock();
        if inner.epoch != self.epoch {
            return false;
        }
        inner.state = ConnectionState::Connecting;

        let mut decoding = self.shared.decoding.lock();
        decoding.pipeline.reset(inner.last_event_id.clone());
        true
    }

    fn transition(&self, to: ConnectionState) -> bool {
        let mut inner = self.shared.inner.lock();
        if inner.epoch != self.epoch {
            return false;
        }
        debug!(from = ?inner.state, to = ?to, "SSE state transition");
        inner.state = to;
        true
    }

    /// Call the handler if this epoch is still current and the handler is
    /// alive. A dropped handler shuts the connection down.
    fn notify(&self, f: impl FnOnce(&dyn SseHandler)) -> bool {
        if self.shared.inner.lock().epoch != self.epoch {
            return false;
        }

        match self.handler.upgrade() {
            Some(handler) => {
                f(handler.as_ref());
                true
            }
            None => {
                info!(url = %self.config.url, "SSE handler dropped, shutting down");
                self.transition(ConnectionState::Closed);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_predicates() {
        assert!(ConnectionState::Open.is_open());
        assert!(!ConnectionState::Connecting.is_open());

        assert!(ConnectionState::Closed.is_closed());
        assert!(!ConnectionState::Idle.is_closed());

        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Open.is_active());
        assert!(ConnectionState::Reconnecting.is_active());
        assert!(!ConnectionState::Idle.is_active());
        assert!(!ConnectionState::Closed.is_active());
    }

    #[test]
    fn epoch_advances() {
        let epoch = ConnectionEpoch::default();
        assert_eq!(epoch.next(), ConnectionEpoch(1));
        assert_eq!(ConnectionEpoch(u64::MAX).next(), ConnectionEpoch(0));
    }

    #[test]
    fn new_requires_runtime() {
        struct Noop;
        impl SseHandler for Noop {
            fn on_message(&self, _event: crate::MessageEvent) {}
        }

        let handler = Arc::new(Noop);
        let err = EventSource::new(SseConfig::new("https://example.com/events"), &handler)
            .expect_err("no runtime");
        assert!(matches!(err, SseError::Config { .. }));
    }

    #[tokio::test]
    async fn new_accepts_concrete_handler() {
        struct Noop;
        impl SseHandler for Noop {
            fn on_message(&self, _event: crate::MessageEvent) {}
        }

        let handler = Arc::new(Noop);
        let source = EventSource::new(
            SseConfig::new("https://example.com/events").last_event_id("7"),
            &handler,
        )
        .expect("valid config");

        assert_eq!(source.state(), ConnectionState::Idle);
        assert_eq!(source.last_event_id().as_deref(), Some("7"));
        assert_eq!(Arc::strong_count(&handler), 1);
    }

    #[tokio::test]
    async fn new_rejects_invalid_config() {
        struct Noop;
        impl SseHandler for Noop {
            fn on_message(&self, _event: crate::MessageEvent) {}
        }

        let handler = Arc::new(Noop);
        let err = EventSource::new(SseConfig::default(), &handler).expect_err("empty url");
        assert!(matches!(err, SseError::Config { .. }));
    }
}
