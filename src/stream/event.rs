//! Stream events emitted by the remote workflow.
//!
//! The workflow writes one JSON object per line:
//!
//! ```text
//! {"type": "chunk", "value": {"type": "generation", "label": "data_with_index", "state": "start"}}
//! {"type": "chunk", "value": {"type": "chunk", "value": "{\"name\": "}}
//! ```
//!
//! Only `generation` (a channel marker) and `chunk` (a data fragment) matter
//! here; every other inner type is ignored.

use serde::Deserialize;
use serde_json::json;

/// One parsed unit from the remote connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Opens a channel; subsequent fragments belong to `label`
    ChannelMarker { label: String },
    /// Text belonging to the most recently opened channel
    DataFragment { text: String },
}

impl StreamEvent {
    pub fn marker(label: impl Into<String>) -> Self {
        StreamEvent::ChannelMarker { label: label.into() }
    }

    pub fn fragment(text: impl Into<String>) -> Self {
        StreamEvent::DataFragment { text: text.into() }
    }

    /// Render this event in the remote wire format
    pub fn to_line(&self) -> String {
        let value = match self {
            StreamEvent::ChannelMarker { label } => {
                json!({"type": "generation", "label": label, "state": "start"})
            }
            StreamEvent::DataFragment { text } => json!({"type": "chunk", "value": text}),
        };
        json!({"type": "chunk", "value": value}).to_string()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    value: WireValue,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireValue {
    Generation { label: String },
    Chunk { value: String },
    #[serde(other)]
    Other,
}

/// Outcome of parsing a single raw line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// A marker or fragment
    Event(StreamEvent),
    /// Well-formed, but of a type the extractor does not care about
    Ignored,
    /// Empty or whitespace-only line
    Blank,
    /// Not a JSON event of the expected shape
    Malformed(String),
}

/// Parse one raw line into an event
///
/// Lines that are not valid UTF-8 are malformed.
pub fn parse_line(line: impl AsRef<[u8]>) -> ParsedLine {
    let trimmed = line.as_ref().trim_ascii();
    if trimmed.is_empty() {
        return ParsedLine::Blank;
    }

    match serde_json::from_slice::<Envelope>(trimmed) {
        Ok(Envelope {
            value: WireValue::Generation { label },
        }) => ParsedLine::Event(StreamEvent::ChannelMarker { label }),
        Ok(Envelope {
            value: WireValue::Chunk { value },
        }) => ParsedLine::Event(StreamEvent::DataFragment { text: value }),
        Ok(Envelope {
            value: WireValue::Other,
        }) => ParsedLine::Ignored,
        Err(e) => ParsedLine::Malformed(e.to_string()),
    }
}
