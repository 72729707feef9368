//! Stream demultiplexing and extraction
//!
//! - event: parsing one wire line into a channel marker or data fragment
//! - lines: splitting a chunked byte stream into lines
//! - extractor: keeping the fragments of one labeled channel

pub mod event;
pub mod extractor;
pub mod lines;

pub use event::{ParsedLine, StreamEvent, parse_line};
pub use extractor::{
    CaptureState, ChannelExtractor, DEFAULT_TARGET_LABEL, extract_channel, extract_from_lines,
};
pub use lines::{
    LineDecoder, LineStream, RawLine, StreamError, decode_lines, lines_from_vec, split_lines,
};
