//! Items produced by the [`EventAssembler`](super::EventAssembler).

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::SseResult;

/// A dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// The event type (`"message"` unless an `event:` field said otherwise).
    pub event: String,
    /// The data payload, multiple `data:` lines joined with `\n`.
    pub data: String,
    /// The last event ID in effect when this event was dispatched.
    pub last_event_id: Option<String>,
}

impl MessageEvent {
    /// Create an event.
    pub fn new(
        event: impl Into<String>,
        data: impl Into<String>,
        last_event_id: Option<String>,
    ) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            last_event_id,
        }
    }

    /// Convenience accessor for the event type.
    pub fn event_type(&self) -> &str {
        &self.event
    }

    /// Convenience accessor for the data payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Convenience accessor for the last event ID.
    pub fn id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Deserialize the data payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SseError::Serialization`](crate::SseError::Serialization) if
    /// the payload is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> SseResult<T> {
        Ok(serde_json::from_str(&self.data)?)
    }
}

/// One assembled item, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedItem {
    /// A dispatched event.
    Event(MessageEvent),
    /// A comment line, without its leading `:`.
    Comment(String),
}

impl ParsedItem {
    /// Returns the event if this item is one.
    pub fn as_event(&self) -> Option<&MessageEvent> {
        match self {
            Self::Event(event) => Some(event),
            Self::Comment(_) => None,
        }
    }

    /// Returns true if this is a comment.
    pub fn is_comment(&self) -> bool {
        matches!(self, Self::Comment(_))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::error::SseError;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Price {
        symbol: String,
        price: u64,
    }

    #[test]
    fn test_accessors() {
        let event = MessageEvent::new("update", "hello", Some("evt-7".to_string()));
        assert_eq!(event.event_type(), "update");
        assert_eq!(event.data(), "hello");
        assert_eq!(event.id(), Some("evt-7"));
    }

    #[test]
    fn test_json_payload() {
        let event = MessageEvent::new("message", r#"{"symbol":"BTC","price":42000}"#, None);
        let price: Price = event.json().expect("valid json");
        assert_eq!(
            price,
            Price {
                symbol: "BTC".to_string(),
                price: 42000
            }
        );
    }

    #[test]
    fn test_json_payload_error() {
        let event = MessageEvent::new("message", "not json", None);
        let err = event.json::<Price>().expect_err("should fail");
        assert!(matches!(err, SseError::Serialization(_)));
    }

    #[test]
    fn test_parsed_item_helpers() {
        let item = ParsedItem::Comment("keep-alive".to_string());
        assert!(item.is_comment());
        assert!(item.as_event().is_none());

        let item = ParsedItem::Event(MessageEvent::new("message", "x", None));
        assert!(!item.is_comment());
        assert_eq!(item.as_event().map(MessageEvent::data), Some("x"));
    }
}
