//! Byte chunk → UTF-8 → line decoding.

use bytes::{Buf, BytesMut};
use tracing::debug;

use super::constants::{BOM, LF};

/// Turns an ordered sequence of byte chunks into complete `\n`-terminated
/// lines.
///
/// Multi-byte characters and lines may be split anywhere across chunks. Lines
/// are split on `\n` only; a trailing `\r` stays part of the line.
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Bytes that do not yet form a complete UTF-8 sequence. Never holds a
    /// decodable prefix.
    pending_bytes: BytesMut,
    /// Decoded text after the last `\n`.
    pending_text: String,
    /// Set once text has been decoded, so only a leading BOM is stripped.
    started: bool,
}

impl LineDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the lines it completed, in order.
    ///
    /// Bytes that can never become valid UTF-8 are dropped.
    pub fn append(&mut self, chunk: &[u8]) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }

        self.pending_bytes.extend_from_slice(chunk);
        self.decode_pending();
        self.take_lines()
    }

    /// Drop all buffered bytes and text.
    pub fn reset(&mut self) {
        self.pending_bytes.clear();
        self.pending_text.clear();
        self.started = false;
    }

    /// Number of bytes waiting for the rest of a multi-byte character.
    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes.len()
    }

    /// Decoded text still waiting for its line feed.
    pub fn pending_text(&self) -> &str {
        &self.pending_text
    }

    /// Move the longest valid UTF-8 prefix of `pending_bytes` into
    /// `pending_text`, skipping over invalid sequences.
    fn decode_pending(&mut self) {
        while !self.pending_bytes.is_empty() {
            let err = match std::str::from_utf8(&self.pending_bytes) {
                Ok(text) => {
                    Self::push_text(&mut self.pending_text, &mut self.started, text);
                    self.pending_bytes.clear();
                    return;
                }
                Err(err) => err,
            };

            let valid = err.valid_up_to();
            if let Ok(text) = std::str::from_utf8(&self.pending_bytes[..valid]) {
                Self::push_text(&mut self.pending_text, &mut self.started, text);
            }
            self.pending_bytes.advance(valid);

            match err.error_len() {
                // Incomplete sequence at the tail: wait for more bytes.
                None => return,
                Some(invalid) => {
                    debug!(
                        dropped = invalid,
                        "Dropping invalid UTF-8 sequence from SSE stream"
                    );
                    self.pending_bytes.advance(invalid);
                }
            }
        }
    }

    fn push_text(pending_text: &mut String, started: &mut bool, text: &str) {
        if text.is_empty() {
            return;
        }
        if *started {
            pending_text.push_str(text);
        } else {
            *started = true;
            pending_text.push_str(text.strip_prefix(BOM).unwrap_or(text));
        }
    }

    fn take_lines(&mut self) -> Vec<String> {
        let Some(last_lf) = memchr::memrchr(LF, self.pending_text.as_bytes()) else {
            return Vec::new();
        };

        let rest = self.pending_text.split_off(last_lf + 1);
        let complete = std::mem::replace(&mut self.pending_text, rest);

        complete[..last_lf].split('\n').map(str::to_owned).collect()
    }
}
