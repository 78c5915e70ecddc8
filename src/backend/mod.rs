//! Document store backends.

use crate::error::{Error, Result};
use crate::key::DocumentPath;
use crate::serialization::Document;

pub mod inmemory;

pub use inmemory::{InMemoryStore, StoreStats};

/// A single write in a batch.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// Create or replace the whole document.
    Set { path: String, doc: Document },
    /// Merge fields into an existing document.
    Update { path: String, fields: Document },
    /// Remove the document. Removing an absent document is not an error.
    Delete { path: String },
}

impl WriteOp {
    pub fn path(&self) -> &str {
        match self {
            WriteOp::Set { path, .. } | WriteOp::Update { path, .. } | WriteOp::Delete { path } => {
                path
            }
        }
    }
}

/// Ordered group of writes committed together.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, doc: Document) -> &mut Self {
        self.ops.push(WriteOp::Set {
            path: path.into(),
            doc,
        });
        self
    }

    pub fn update(&mut self, path: impl Into<String>, fields: Document) -> &mut Self {
        self.ops.push(WriteOp::Update {
            path: path.into(),
            fields,
        });
        self
    }

    pub fn delete(&mut self, path: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Delete { path: path.into() });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Paths touched by `Set` ops, in order. Used for compensating deletes.
    pub fn created_paths(&self) -> Vec<String> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                WriteOp::Set { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }
}

impl IntoIterator for WriteBatch {
    type Item = WriteOp;
    type IntoIter = std::vec::IntoIter<WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// Trait for document store implementations.
///
/// Abstracts a remote key/sub-collection document store (Firestore-like), so
/// the coordinator can run against any backend, including the in-memory one
/// used in tests.
///
/// **IMPORTANT:** All methods use `&self` instead of `&mut self` to allow concurrent access.
/// Implementations should use interior mutability or external storage.
///
/// **ASYNC:** All methods are async and must be awaited.
#[allow(async_fn_in_trait)]
pub trait DocumentStore: Send + Sync + Clone {
    /// Read a document by path.
    ///
    /// # Returns
    /// - `Ok(Some(doc))` - Document found
    /// - `Ok(None)` - No document at this path
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs (connection lost, etc.)
    async fn get(&self, path: &str) -> Result<Option<Document>>;

    /// List the direct children of a collection path, ordered by path.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>>;

    /// Create or replace a document.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    async fn set(&self, path: &str, doc: Document) -> Result<()>;

    /// Merge fields into an existing document.
    ///
    /// # Errors
    /// - `Error::NotFound` if no document exists at `path`
    /// - `Err` if backend error occurs
    async fn update(&self, path: &str, fields: Document) -> Result<()>;

    /// Remove a document. Absent documents are ignored.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    async fn delete(&self, path: &str) -> Result<()>;

    /// Apply a batch of writes.
    ///
    /// Default implementation applies ops one by one and stops at the first
    /// failure, leaving earlier writes in place. Override with a native batch
    /// or transaction where the backend has one, and report it via `is_atomic`.
    ///
    /// # Errors
    /// Returns the first failing op's error
    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        for op in batch {
            match op {
                WriteOp::Set { path, doc } => self.set(&path, doc).await?,
                WriteOp::Update { path, fields } => self.update(&path, fields).await?,
                WriteOp::Delete { path } => self.delete(&path).await?,
            }
        }
        Ok(())
    }

    /// Whether `commit` is all-or-nothing.
    fn is_atomic(&self) -> bool {
        false
    }

    /// Health check - verify backend is accessible.
    ///
    /// # Errors
    /// Returns `Err` if backend is not accessible
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Check a path is a well-formed document path (even number of non-empty segments).
pub fn check_document_path(path: &str) -> Result<()> {
    let parts = DocumentPath::parse(path);
    if parts.len() % 2 != 0 || parts.iter().any(|part| part.is_empty()) {
        return Err(Error::ValidationError(format!(
            "invalid document path: {:?}",
            path
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    #[test]
    fn test_batch_builder() {
        let mut batch = WriteBatch::new();
        batch
            .set("events/e1", doc(json!({ "a": 1 })))
            .update("events/e1", doc(json!({ "b": 2 })))
            .delete("events/e2");

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.ops()[2].path(), "events/e2");
        assert_eq!(batch.created_paths(), vec!["events/e1".to_string()]);
    }

    #[test]
    fn test_document_path_check() {
        assert!(check_document_path("events/e1").is_ok());
        assert!(check_document_path("events/e1/items/i1").is_ok());
        assert!(check_document_path("events").is_err());
        assert!(check_document_path("events//items/i1").is_err());
    }

    #[tokio::test]
    async fn test_default_commit_is_sequential() {
        let store = InMemoryStore::new();
        store.set("events/e1", doc(json!({ "a": 1 }))).await.unwrap();

        let mut batch = WriteBatch::new();
        batch
            .set("events/e2", doc(json!({ "a": 2 })))
            .update("events/missing", doc(json!({ "b": 2 })));

        // Go through the trait's default body rather than the atomic override.
        struct Sequential(InMemoryStore);
        impl Clone for Sequential {
            fn clone(&self) -> Self {
                Sequential(self.0.clone())
            }
        }
        impl DocumentStore for Sequential {
            async fn get(&self, path: &str) -> Result<Option<Document>> {
                self.0.get(path).await
            }
            async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>> {
                self.0.list(collection).await
            }
            async fn set(&self, path: &str, doc: Document) -> Result<()> {
                self.0.set(path, doc).await
            }
            async fn update(&self, path: &str, fields: Document) -> Result<()> {
                self.0.update(path, fields).await
            }
            async fn delete(&self, path: &str) -> Result<()> {
                self.0.delete(path).await
            }
        }

        let sequential = Sequential(store.clone());
        assert!(!sequential.is_atomic());
        let result = sequential.commit(batch).await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        // First op landed before the failure.
        assert!(store.get("events/e2").await.unwrap().is_some());
    }
}
