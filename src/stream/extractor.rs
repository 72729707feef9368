//! Channel demultiplexer.
//!
//! A two-state machine (idle / capturing) that keeps the fragments of one
//! labeled channel and drops everything else. Parsing lives in
//! [`super::event`]; this module only decides what to accumulate.

use futures::{Stream, StreamExt};

use crate::domain::TaskFailure;
use crate::stream::event::{ParsedLine, StreamEvent, parse_line};
use crate::stream::lines::{RawLine, StreamError};

/// Label of the workflow channel that carries the structured result
pub const DEFAULT_TARGET_LABEL: &str = "data_with_index";

/// Whether fragments are currently being kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing,
}

/// Accumulates the fragments of a single target channel
#[derive(Debug)]
pub struct ChannelExtractor {
    target: String,
    state: CaptureState,
    buffer: String,
    fragments: usize,
    malformed: usize,
}

impl ChannelExtractor {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            state: CaptureState::Idle,
            buffer: String::new(),
            fragments: 0,
            malformed: 0,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Number of fragments kept so far
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Number of lines skipped because they did not parse
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    pub fn feed(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::ChannelMarker { label } => {
                self.state = if label == self.target {
                    CaptureState::Capturing
                } else {
                    CaptureState::Idle
                };
            }
            StreamEvent::DataFragment { text } => {
                if self.state == CaptureState::Capturing {
                    self.buffer.push_str(&text);
                    self.fragments += 1;
                }
            }
        }
    }

    /// Parse a raw line and feed it; malformed lines are counted and skipped
    pub fn feed_line(&mut self, line: impl AsRef<[u8]>) {
        match parse_line(line) {
            ParsedLine::Event(event) => self.feed(event),
            ParsedLine::Ignored | ParsedLine::Blank => {}
            ParsedLine::Malformed(reason) => {
                self.malformed += 1;
                log::debug!("Skipping malformed stream line: {}", reason);
            }
        }
    }

    /// Consume the extractor and return the assembled channel text
    ///
    /// Whitespace-only output counts as no output.
    pub fn finish(self) -> Result<String, TaskFailure> {
        if self.buffer.trim().is_empty() {
            return Err(TaskFailure::NoOutputProduced);
        }
        Ok(self.buffer)
    }
}

/// Drive a live line stream through a [`ChannelExtractor`]
///
/// Any transport error discards what was accumulated.
pub async fn extract_channel<S>(mut lines: S, target: &str) -> Result<String, TaskFailure>
where
    S: Stream<Item = Result<RawLine, StreamError>> + Unpin,
{
    let mut extractor = ChannelExtractor::new(target);
    let mut count = 0usize;

    while let Some(line) = lines.next().await {
        let line = line.map_err(|e| TaskFailure::IncompleteStream(e.to_string()))?;
        extractor.feed_line(line);
        count += 1;
    }

    log::debug!(
        "Stream closed after {} lines: {} fragments kept, {} malformed",
        count,
        extractor.fragments(),
        extractor.malformed()
    );
    extractor.finish()
}

/// Synchronous variant over lines that are already in memory
pub fn extract_from_lines<I, L>(lines: I, target: &str) -> Result<String, TaskFailure>
where
    I: IntoIterator<Item = L>,
    L: AsRef<[u8]>,
{
    let mut extractor = ChannelExtractor::new(target);
    for line in lines {
        extractor.feed_line(line);
    }
    extractor.finish()
}
