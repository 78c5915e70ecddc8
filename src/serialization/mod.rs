//! Versioned JSON document encoding for store records.
//!
//! Every document written by split-kit is a JSON object carrying the record's
//! fields plus a `schema_version` stamp:
//!
//! ```text
//! {
//!   "name": "Nasi Goreng",
//!   "quantity": 2,
//!   "unitPrice": 1000,
//!   "totalPrice": 2000,
//!   "schema_version": 1
//! }
//! ```
//!
//! The record id is never part of the document; it is the last segment of the
//! document path.
//!
//! # Guarantees
//!
//! - **Validated:** A stamped version other than `CURRENT_SCHEMA_VERSION` is rejected
//! - **Lenient on foreign writes:** A document without a stamp decodes as current
//! - **Deterministic:** Field order follows the record's declaration order
//!
//! # Example
//!
//! ```rust
//! use split_kit::serialization::{from_document, to_document};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Note {
//!     text: String,
//! }
//!
//! # fn main() -> split_kit::Result<()> {
//! let note = Note { text: "lunch".to_string() };
//! let doc = to_document(&note)?;
//! assert_eq!(doc["schema_version"], 1);
//!
//! let back: Note = from_document(doc)?;
//! assert_eq!(note, back);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored document: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Field carrying the schema version stamp.
pub const SCHEMA_VERSION_FIELD: &str = "schema_version";

/// Current schema version.
///
/// Increment when a record's stored fields change incompatibly.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Encode a value into a stamped document.
///
/// # Errors
///
/// - `Error::SerializationError`: the value does not serialize to a JSON object
pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(mut doc) => {
            doc.insert(
                SCHEMA_VERSION_FIELD.to_string(),
                Value::from(CURRENT_SCHEMA_VERSION),
            );
            Ok(doc)
        }
        other => Err(Error::SerializationError(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

/// Decode a document, checking its schema version stamp.
///
/// # Errors
///
/// - `Error::VersionMismatch`: stamp differs from `CURRENT_SCHEMA_VERSION`
/// - `Error::DeserializationError`: missing or mistyped fields
pub fn from_document<T: for<'de> Deserialize<'de>>(mut doc: Document) -> Result<T> {
    if let Some(stamp) = doc.remove(SCHEMA_VERSION_FIELD) {
        let found = stamp
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| {
                Error::DeserializationError(format!("invalid {} field", SCHEMA_VERSION_FIELD))
            })?;
        if found != CURRENT_SCHEMA_VERSION {
            return Err(Error::VersionMismatch {
                expected: CURRENT_SCHEMA_VERSION,
                found,
            });
        }
    }

    serde_json::from_value(Value::Object(doc))
        .map_err(|e| Error::DeserializationError(e.to_string()))
}

/// Encode a field-subset update. Not stamped: updates merge into an existing document.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::SerializationError(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

/// Approximate stored size of a document in bytes.
pub fn encoded_len(doc: &Document) -> usize {
    serde_json::to_vec(doc).map(|bytes| bytes.len()).unwrap_or(0)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
