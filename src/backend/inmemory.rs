//! In-memory document store (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! Batch commits are validated in full before any op is applied.

use super::{check_document_path, DocumentStore, WriteBatch, WriteOp};
use crate::error::{Error, Result};
use crate::key::DocumentPath;
use crate::serialization::{encoded_len, Document};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Thread-safe async in-memory document store.
///
/// Clones share the same underlying map.
///
/// # Example
///
/// ```no_run
/// use split_kit::backend::{DocumentStore, InMemoryStore};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///
///     let doc = json!({ "event_name": "Dinner" }).as_object().cloned().unwrap_or_default();
///     store.set("events/e1", doc).await?;
///
///     let loaded = store.get("events/e1").await?;
///     assert!(loaded.is_some());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryStore {
    docs: Arc<DashMap<String, Document>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        InMemoryStore {
            docs: Arc::new(DashMap::new()),
        }
    }

    /// Get the current number of documents.
    pub async fn len(&self) -> usize {
        self.docs.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Get storage statistics.
    pub async fn stats(&self) -> StoreStats {
        let total_bytes: usize = self.docs.iter().map(|entry| encoded_len(entry.value())).sum();
        let event_count = self
            .docs
            .iter()
            .filter(|entry| DocumentPath::parse(entry.key()).len() == 2)
            .count();

        StoreStats {
            total_documents: self.docs.len(),
            event_documents: event_count,
            total_bytes,
        }
    }

    /// Print store statistics to debug log.
    pub async fn log_stats(&self) {
        let stats = self.stats().await;
        debug!(
            "Store Stats: {} documents ({} events), {} bytes",
            stats.total_documents, stats.event_documents, stats.total_bytes
        );
    }

    /// Remove every document (use with caution).
    pub async fn clear_all(&self) {
        self.docs.clear();
        warn!("⚠ InMemory CLEAR_ALL executed - all documents removed!");
    }

    fn merge(&self, path: &str, fields: Document) -> Result<()> {
        match self.docs.get_mut(path) {
            Some(mut doc) => {
                for (field, value) in fields {
                    doc.insert(field, value);
                }
                Ok(())
            }
            None => Err(Error::NotFound(format!("document {}", path))),
        }
    }

    /// Reject the batch if any op would fail, before touching the map.
    fn precheck(&self, batch: &WriteBatch) -> Result<()> {
        let mut overlay: HashMap<&str, bool> = HashMap::new();

        for op in batch.ops() {
            let path = op.path();
            check_document_path(path)?;

            match op {
                WriteOp::Set { .. } => {
                    overlay.insert(path, true);
                }
                WriteOp::Delete { .. } => {
                    overlay.insert(path, false);
                }
                WriteOp::Update { .. } => {
                    let exists = overlay
                        .get(path)
                        .copied()
                        .unwrap_or_else(|| self.docs.contains_key(path));
                    if !exists {
                        return Err(Error::NotFound(format!("document {}", path)));
                    }
                }
            }
        }

        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Document>> {
        let doc = self.docs.get(path).map(|entry| entry.value().clone());
        debug!(
            "✓ InMemory GET {} -> {}",
            path,
            if doc.is_some() { "FOUND" } else { "ABSENT" }
        );
        Ok(doc)
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>> {
        let mut children: Vec<(String, Document)> = self
            .docs
            .iter()
            .filter(|entry| DocumentPath::is_child_of(entry.key(), collection))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        children.sort_by(|a, b| a.0.cmp(&b.0));

        debug!("✓ InMemory LIST {} -> {} documents", collection, children.len());
        Ok(children)
    }

    async fn set(&self, path: &str, doc: Document) -> Result<()> {
        check_document_path(path)?;
        self.docs.insert(path.to_string(), doc);
        debug!("✓ InMemory SET {}", path);
        Ok(())
    }

    async fn update(&self, path: &str, fields: Document) -> Result<()> {
        self.merge(path, fields)?;
        debug!("✓ InMemory UPDATE {}", path);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.docs.remove(path);
        debug!("✓ InMemory DELETE {}", path);
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.precheck(&batch)?;

        let count = batch.len();
        for op in batch {
            match op {
                WriteOp::Set { path, doc } => {
                    self.docs.insert(path, doc);
                }
                WriteOp::Update { path, fields } => self.merge(&path, fields)?,
                WriteOp::Delete { path } => {
                    self.docs.remove(&path);
                }
            }
        }

        debug!("✓ InMemory COMMIT {} ops", count);
        Ok(())
    }

    fn is_atomic(&self) -> bool {
        true
    }

    async fn health_check(&self) -> Result<bool> {
        // In-memory store is always healthy
        Ok(true)
    }
}

/// Store statistics.
#[derive(Clone, Debug)]
pub struct StoreStats {
    pub total_documents: usize,
    pub event_documents: usize,
    pub total_bytes: usize,
}
