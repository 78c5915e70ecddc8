//! Core record trait implemented by every stored type.

use crate::error::Result;
use crate::serialization::Document;
use serde::{Deserialize, Serialize};

/// Trait for records stored as documents.
///
/// The record id lives in the document path, not in the document body, so
/// implementors skip it during serialization and receive it back through
/// `with_id` after decoding.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use split_kit::entity::Record;
///
/// #[derive(Clone, Serialize, Deserialize)]
/// pub struct Receipt {
///     #[serde(skip)]
///     pub id: String,
///     pub merchant: String,
/// }
///
/// impl Record for Receipt {
///     fn collection() -> &'static str {
///         "receipts"
///     }
///
///     fn record_id(&self) -> &str {
///         &self.id
///     }
///
///     fn with_id(mut self, id: &str) -> Self {
///         self.id = id.to_string();
///         self
///     }
/// }
/// ```
pub trait Record: Send + Sync + Serialize + for<'de> Deserialize<'de> + Clone {
    /// Collection name used in document paths. Example: "items", "participants".
    fn collection() -> &'static str;

    /// Return the record's id.
    fn record_id(&self) -> &str;

    /// Attach the id read from the document path.
    fn with_id(self, id: &str) -> Self;

    /// Encode this record as a versioned document.
    ///
    /// See `crate::serialization` for the document format.
    fn to_document(&self) -> Result<Document> {
        crate::serialization::to_document(self)
    }

    /// Decode a record from a document stored under `id`.
    ///
    /// # Errors
    ///
    /// - `Error::VersionMismatch`: schema version changed
    /// - `Error::DeserializationError`: malformed document
    /// - Whatever `validate()` returns
    fn from_document(id: &str, doc: Document) -> Result<Self> {
        let record: Self = crate::serialization::from_document(doc)?;
        let record = record.with_id(id);
        record.validate()?;
        Ok(record)
    }

    /// Optional: Validate record after decoding.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Clone, Serialize, Deserialize)]
    struct TestRecord {
        #[serde(skip)]
        id: String,
        value: i64,
    }

    impl Record for TestRecord {
        fn collection() -> &'static str {
            "tests"
        }

        fn record_id(&self) -> &str {
            &self.id
        }

        fn with_id(mut self, id: &str) -> Self {
            self.id = id.to_string();
            self
        }

        fn validate(&self) -> Result<()> {
            if self.value < 0 {
                return Err(Error::ValidationError("negative value".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_id_is_not_stored() {
        let record = TestRecord {
            id: "rec_1".to_string(),
            value: 5,
        };

        let doc = record.to_document().unwrap();
        assert!(!doc.contains_key("id"));

        let decoded = TestRecord::from_document("rec_1", doc).unwrap();
        assert_eq!(decoded.record_id(), "rec_1");
        assert_eq!(decoded.value, 5);
    }

    #[test]
    fn test_validate_runs_after_decode() {
        let record = TestRecord {
            id: "rec_2".to_string(),
            value: -1,
        };

        let doc = record.to_document().unwrap();
        let result = TestRecord::from_document("rec_2", doc);
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }
}
