//! Line → event assembly following the SSE field grammar.

use std::{mem, time::Duration};

use tracing::trace;

use super::{
    constants::{COLON, CR, FIELD_DATA, FIELD_EVENT, FIELD_ID, FIELD_RETRY, MESSAGE_TYPE},
    event::{MessageEvent, ParsedItem},
};

/// Accumulates SSE fields into events.
///
/// Feed lines with [`parse`](Self::parse), then collect completed items with
/// [`drain`](Self::drain). The last event ID is carried from one event to the
/// next; only [`reset`](Self::reset) clears it.
#[derive(Debug)]
pub struct EventAssembler {
    event_type: String,
    data: String,
    last_event_id: Option<String>,
    retry: Option<Duration>,
    queue: Vec<ParsedItem>,
}

impl Default for EventAssembler {
    fn default() -> Self {
        Self {
            event_type: MESSAGE_TYPE.to_owned(),
            data: String::new(),
            last_event_id: None,
            retry: None,
            queue: Vec::new(),
        }
    }
}

impl EventAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line (without its `\n`).
    pub fn parse(&mut self, line: &str) {
        let line = line.strip_suffix(CR).unwrap_or(line);

        if line.is_empty() {
            self.dispatch();
            return;
        }

        if let Some(comment) = line.strip_prefix(COLON) {
            self.queue.push(ParsedItem::Comment(comment.to_owned()));
            return;
        }

        let (field, value) = match line.split_once(COLON) {
            Some((field, value)) => (field, value.trim()),
            None => (line, ""),
        };

        match field {
            FIELD_EVENT => value.clone_into(&mut self.event_type),
            FIELD_DATA => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            FIELD_ID => self.last_event_id = Some(value.to_owned()),
            FIELD_RETRY => match value.parse::<u64>() {
                Ok(millis) => self.retry = Some(Duration::from_millis(millis)),
                Err(_) => trace!(value, "Ignoring non-numeric SSE retry field"),
            },
            _ => trace!(field, "Ignoring unknown SSE field"),
        }
    }

    /// Take every item completed since the last drain, or `None` if there are
    /// none.
    pub fn drain(&mut self) -> Option<Vec<ParsedItem>> {
        if self.queue.is_empty() {
            None
        } else {
            Some(mem::take(&mut self.queue))
        }
    }

    /// Take the most recent `retry:` value, if one arrived since the last call.
    pub fn take_retry(&mut self) -> Option<Duration> {
        self.retry.take()
    }

    /// The ID that the next dispatched event will carry.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Seed the carried event ID, typically right after [`reset`](Self::reset)
    /// when resuming a stream.
    pub fn set_last_event_id(&mut self, id: Option<String>) {
        self.last_event_id = id;
    }

    /// Clear the in-progress event, the carried ID and any undrained items.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn dispatch(&mut self) {
        if self.data.is_empty() {
            return;
        }

        let mut data = mem::take(&mut self.data);
        data.pop();

        let event = mem::replace(&mut self.event_type, MESSAGE_TYPE.to_owned());

        self.queue.push(ParsedItem::Event(MessageEvent {
            event,
            data,
            last_event_id: self.last_event_id.clone(),
        }));
    }
}
