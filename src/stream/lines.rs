//! Splitting a chunked byte stream into text lines.
//!
//! Network reads do not respect line boundaries, so partial lines are carried
//! over to the next chunk. Lines stay raw bytes; decoding (and rejecting
//! invalid UTF-8) happens when a line is parsed.

use std::collections::VecDeque;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use thiserror::Error;

/// Transport failure while reading the event stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StreamError(pub String);

/// One line without its terminator
pub type RawLine = Vec<u8>;

/// Ordered stream of raw lines from one remote connection
pub type LineStream = BoxStream<'static, Result<RawLine, StreamError>>;

/// Incremental `\n`-delimited decoder
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completes, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawLine> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            lines.push(strip_cr(&self.buffer[start..end]));
            start = end + 1;
        }
        self.buffer.drain(..start);
        lines
    }

    /// Flush an unterminated final line, if any
    pub fn finish(&mut self) -> Option<RawLine> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = strip_cr(&self.buffer);
        self.buffer.clear();
        Some(line)
    }

    /// Bytes held back waiting for a newline
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

fn strip_cr(raw: &[u8]) -> RawLine {
    raw.strip_suffix(b"\r").unwrap_or(raw).to_vec()
}

/// Split an in-memory log into lines, flushing an unterminated last line
pub fn split_lines(bytes: &[u8]) -> Vec<RawLine> {
    let mut decoder = LineDecoder::new();
    let mut lines = decoder.push(bytes);
    lines.extend(decoder.finish());
    lines
}

/// Turn a stream of byte chunks into a stream of lines
///
/// A transport error is forwarded once and ends the stream; the partial line
/// held in the decoder at that point is dropped.
pub fn decode_lines<S, B, E>(bytes: S) -> LineStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = (bytes, LineDecoder::new(), VecDeque::new(), false);

    stream::unfold(state, |(mut bytes, mut decoder, mut ready, mut finished)| async move {
        loop {
            if let Some(line) = ready.pop_front() {
                return Some((Ok(line), (bytes, decoder, ready, finished)));
            }
            if finished {
                return None;
            }
            match bytes.next().await {
                Some(Ok(chunk)) => ready.extend(decoder.push(chunk.as_ref())),
                Some(Err(e)) => {
                    finished = true;
                    let err = StreamError(e.to_string());
                    return Some((Err(err), (bytes, decoder, ready, finished)));
                }
                None => {
                    finished = true;
                    ready.extend(decoder.finish());
                }
            }
        }
    })
    .boxed()
}

/// Wrap already-split lines as a [`LineStream`]
pub fn lines_from_vec(lines: Vec<String>) -> LineStream {
    stream::iter(lines.into_iter().map(|line| Ok(line.into_bytes()))).boxed()
}
