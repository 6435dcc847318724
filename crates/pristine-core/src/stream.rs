//! Incremental parsing of the chat reply stream.
//!
//! The reply body is a sequence of newline-delimited records:
//!
//! ```text
//! data: {"content":"Hel"}
//! data: {"content":"lo"}
//! data: [DONE]
//! ```
//!
//! Chunk boundaries are arbitrary: a record, or a multi-byte character, may be
//! split across reads. [`StreamDecoder`] reassembles lines, [`StreamRecord`]
//! interprets them and [`AssistantAccumulator`] builds the reply text.

use crate::followups::{find_marker, split_followups, AssistantReply};
use pristine_types::StreamChunk;
use tracing::warn;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Stateful UTF-8 decoder and line splitter.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Undecoded bytes (an incomplete trailing character).
    pending: Vec<u8>,
    /// Decoded text not yet terminated by a newline.
    line: String,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completes, without terminators.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        self.decode_pending(false);
        self.drain_lines()
    }

    /// Flush at end of stream, returning the unterminated last line if any.
    pub fn finish(&mut self) -> Option<String> {
        self.decode_pending(true);
        let mut last = std::mem::take(&mut self.line);
        if last.ends_with('\r') {
            last.pop();
        }
        (!last.is_empty()).then_some(last)
    }

    fn decode_pending(&mut self, eof: bool) {
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.line.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.line
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            self.line.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None if eof => {
                            self.line.push(char::REPLACEMENT_CHARACTER);
                            self.pending.clear();
                            return;
                        }
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(newline_pos) = self.line.find('\n') {
            let rest = self.line.split_off(newline_pos + 1);
            let mut line = std::mem::replace(&mut self.line, rest);
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }
}

/// One meaningful record of the reply stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRecord {
    /// A piece of reply text.
    Delta(String),
    /// End-of-stream sentinel.
    Done,
}

impl StreamRecord {
    /// Interpret one line.
    ///
    /// Returns `None` for lines that carry nothing: blanks, non-`data:` lines,
    /// payloads without content, and malformed JSON (logged and skipped).
    pub fn parse(line: &str) -> Option<Self> {
        let payload = line.strip_prefix(DATA_PREFIX)?.trim();
        if payload == DONE_SENTINEL {
            return Some(StreamRecord::Done);
        }

        match serde_json::from_str::<StreamChunk>(payload) {
            Ok(StreamChunk {
                content: Some(content),
            }) if !content.is_empty() => Some(StreamRecord::Delta(content)),
            Ok(_) => None,
            Err(e) => {
                warn!(target: "pristine::stream", "Failed to parse stream chunk: {}: {}", e, payload);
                None
            }
        }
    }
}

/// Whether deltas still extend the visible answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Deltas are answer text and update the display.
    Message,
    /// The marker was seen; the rest is the follow-up block.
    Followup,
}

/// Accumulates reply deltas and tracks the answer/follow-up boundary.
#[derive(Debug, Clone)]
pub struct AssistantAccumulator {
    text: String,
    phase: Phase,
}

impl Default for AssistantAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl AssistantAccumulator {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            phase: Phase::Message,
        }
    }

    /// Append a delta. Returns the new display text while still in the answer.
    ///
    /// The delta that completes the marker switches to [`Phase::Followup`]
    /// and returns the text with the marker removed; later deltas return `None`.
    pub fn push(&mut self, delta: &str) -> Option<String> {
        self.text.push_str(delta);
        if self.phase == Phase::Followup {
            return None;
        }

        let mut display = self.text.clone();
        if let Some(range) = find_marker(&display) {
            self.phase = Phase::Followup;
            display.replace_range(range, "");
        }
        Some(display)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Everything received so far, marker included.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn finish(&self) -> AssistantReply {
        split_followups(&self.text)
    }
}
