//! Consumer interface for an [`EventSource`](crate::EventSource).

use crate::{error::SseError, parse::MessageEvent};

/// Receives everything an SSE connection produces.
///
/// The controller only holds a weak reference to its handler: once the last
/// `Arc` is dropped, pending notifications are discarded and the connection
/// shuts down. Callbacks run on the connection's driver task, one at a time
/// and in stream order, so they should return quickly.
///
/// Calling [`EventSource::close`](crate::EventSource::close) from inside a
/// callback is allowed.
pub trait SseHandler: Send + Sync + 'static {
    /// The server accepted the request and the stream is open.
    ///
    /// Default implementation does nothing.
    fn on_open(&self) {}

    /// An event was dispatched.
    fn on_message(&self, event: MessageEvent);

    /// A comment line arrived (usually a keep-alive).
    ///
    /// Default implementation does nothing.
    fn on_comment(&self, _comment: &str) {}

    /// A transport failure ended the current connection attempt. Called before
    /// the reconnect-or-complete decision.
    ///
    /// Default implementation does nothing.
    fn on_error(&self, _error: &SseError) {}

    /// The connection finished for good: `None` on a clean end of stream, or
    /// the error that was not retried.
    ///
    /// Default implementation does nothing.
    fn on_complete(&self, _error: Option<&SseError>) {}
}
