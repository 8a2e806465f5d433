//! Decoder + assembler pair owned by one connection.

use std::time::Duration;

use super::{assembler::EventAssembler, event::ParsedItem, line_decoder::LineDecoder};

/// The full byte → item pipeline for one event stream.
#[derive(Debug, Default)]
pub struct Pipeline {
    decoder: LineDecoder,
    assembler: EventAssembler,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the items it completed, if any.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<Vec<ParsedItem>> {
        for line in self.decoder.append(chunk) {
            self.assembler.parse(&line);
        }
        self.assembler.drain()
    }

    /// Take the latest `retry:` hint seen by the assembler.
    pub fn take_retry(&mut self) -> Option<Duration> {
        self.assembler.take_retry()
    }

    /// Clear both stages and seed the carried event ID for the next
    /// connection.
    pub fn reset(&mut self, last_event_id: Option<String>) {
        self.decoder.reset();
        self.assembler.reset();
        self.assembler.set_last_event_id(last_event_id);
    }
}
