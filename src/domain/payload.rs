//! Result document of a completed task.
//!
//! The channel text is validated as JSON but stored as written, so key order
//! and formatting survive serialization.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use serde_json::Value;
use serde_json::value::RawValue;

#[derive(Clone)]
pub struct Payload(Box<RawValue>);

impl Payload {
    /// Validate `text` as one JSON document and keep it verbatim
    ///
    /// Whitespace around the document is dropped; whitespace inside it is not.
    pub fn parse(text: impl Into<String>) -> serde_json::Result<Self> {
        RawValue::from_string(text.into()).map(Self)
    }

    /// The document exactly as it was streamed
    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::from_str(self.as_str())
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload").field(&self.as_str()).finish()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Payload {
    // Records are tagged and flattened, so serde hands us buffered content
    // that RawValue cannot borrow from; go through Value (insertion ordered).
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let raw = RawValue::from_string(value.to_string()).map_err(D::Error::custom)?;
        Ok(Self(raw))
    }
}
