//! Channel-backed handler that turns callbacks into a [`Stream`].

use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::trace;

use crate::{error::SseError, handler::SseHandler, parse::MessageEvent};

/// One handler callback, as an owned value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SseNotification {
    /// The stream opened.
    Open,
    /// An event was dispatched.
    Message(MessageEvent),
    /// A comment line arrived.
    Comment(String),
    /// A transport failure, rendered with `Display`.
    Error(String),
    /// The connection finished, with the terminal error if any.
    Complete(Option<String>),
}

impl SseNotification {
    /// Returns the event if this is a message notification.
    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            Self::Message(event) => Some(event),
            _ => None,
        }
    }

    /// Returns true if this notification ends the connection.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// Forwards every notification into an unbounded channel.
///
/// The returned `Arc` is the only strong reference: keep it alive for as long
/// as the connection should run.
///
/// ```rust,no_run
/// use hpx_sse::{EventSource, SseConfig, handlers::ChannelHandler};
///
/// # async fn example() -> Result<(), hpx_sse::SseError> {
/// let (handler, mut stream) = ChannelHandler::new();
/// let source = EventSource::new(SseConfig::new("https://example.com/events"), &handler)?;
/// source.connect();
///
/// while let Some(notification) = stream.next_notification().await {
///     if let Some(event) = notification.as_message() {
///         println!("{}: {}", event.event_type(), event.data());
///     }
///     if notification.is_complete() {
///         break;
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<SseNotification>,
}

impl ChannelHandler {
    /// Create a handler and the stream that receives its notifications.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Arc<Self>, SseStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), SseStream { rx })
    }

    fn forward(&self, notification: SseNotification) {
        if self.tx.send(notification).is_err() {
            trace!("SSE notification dropped, stream receiver is gone");
        }
    }
}

impl SseHandler for ChannelHandler {
    fn on_open(&self) {
        self.forward(SseNotification::Open);
    }

    fn on_message(&self, event: MessageEvent) {
        self.forward(SseNotification::Message(event));
    }

    fn on_comment(&self, comment: &str) {
        self.forward(SseNotification::Comment(comment.to_owned()));
    }

    fn on_error(&self, error: &SseError) {
        self.forward(SseNotification::Error(error.to_string()));
    }

    fn on_complete(&self, error: Option<&SseError>) {
        self.forward(SseNotification::Complete(error.map(ToString::to_string)));
    }
}

/// Stream of [`SseNotification`]s fed by a [`ChannelHandler`].
///
/// Ends once the handler has been dropped and all queued notifications have
/// been read.
#[derive(Debug)]
pub struct SseStream {
    rx: mpsc::UnboundedReceiver<SseNotification>,
}

impl SseStream {
    /// Receive the next notification.
    pub async fn next_notification(&mut self) -> Option<SseNotification> {
        self.rx.recv().await
    }
}

impl Stream for SseStream {
    type Item = SseNotification;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[tokio::test]
    async fn forwards_callbacks_in_order() {
        let (handler, stream) = ChannelHandler::new();

        handler.on_open();
        handler.on_comment("ping");
        handler.on_message(MessageEvent::new("message", "hi", Some("1".to_string())));
        handler.on_error(&SseError::transport("reset"));
        handler.on_complete(None);
        drop(handler);

        let received: Vec<_> = stream.collect().await;
        assert_eq!(
            received,
            vec![
                SseNotification::Open,
                SseNotification::Comment("ping".to_string()),
                SseNotification::Message(MessageEvent::new(
                    "message",
                    "hi",
                    Some("1".to_string())
                )),
                SseNotification::Error("Transport error: reset".to_string()),
                SseNotification::Complete(None),
            ]
        );
    }

    #[tokio::test]
    async fn complete_with_error_is_rendered() {
        let (handler, mut stream) = ChannelHandler::new();
        handler.on_complete(Some(&SseError::config("bad")));

        let notification = stream.next_notification().await.expect("notification");
        assert!(notification.is_complete());
        assert_eq!(
            notification,
            SseNotification::Complete(Some("Configuration error: bad".to_string()))
        );
    }

    #[test]
    fn send_after_receiver_dropped_is_silent() {
        let (handler, stream) = ChannelHandler::new();
        drop(stream);
        handler.on_open();
    }
}
