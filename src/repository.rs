//! Typed event repository over a document store.
//!
//! `EventRepository` turns path-and-document store calls into reads and writes
//! of `Event`, `Item`, and `Participant` records, and owns the retry policy for
//! transient store failures.
//!
//! # Retries
//!
//! With `with_retry(n)`, a store call failing with `Error::BackendError` is
//! retried up to `n` more times with exponential backoff (100ms, 200ms,
//! 400ms, ...). Other errors are returned immediately. Every call retried here
//! is a whole-document read, set, merge, delete, or batch commit, so repeating
//! it cannot produce a second, different outcome.

use crate::backend::{DocumentStore, WriteBatch};
use crate::entity::Record;
use crate::error::{Error, Result};
use crate::key::DocumentPath;
use crate::model::{Event, EventSnapshot, Item, Participant};
use crate::serialization::Document;
use std::future::Future;

/// Record-level access to one document store.
#[derive(Clone)]
pub struct EventRepository<S: DocumentStore> {
    store: S,
    retry_count: u32,
}

impl<S: DocumentStore> EventRepository<S> {
    pub fn new(store: S) -> Self {
        EventRepository {
            store,
            retry_count: 0,
        }
    }

    /// Retry transient store failures up to `count` times.
    pub fn with_retry(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    /// Get store reference (for advanced use).
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn retrying<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0;
        let max_attempts = self.retry_count + 1; // +1 for initial attempt

        loop {
            attempts += 1;

            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempts < max_attempts => {
                    warn!(
                        "Store {} failed (attempt {}/{}): {}, retrying...",
                        what, attempts, max_attempts, e
                    );

                    // Exponential backoff
                    let delay = tokio::time::Duration::from_millis(100 * 2_u64.pow(attempts - 1));
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch an event by id.
    ///
    /// # Returns
    /// - `Ok(Some(event))` - Event found
    /// - `Ok(None)` - No such event (not an error)
    pub async fn fetch_event(&self, event_id: &str) -> Result<Option<Event>> {
        let path = DocumentPath::event(event_id);
        let doc = self.retrying("get", || self.store.get(&path)).await?;
        doc.map(|doc| Event::from_document(event_id, doc)).transpose()
    }

    /// Fetch an event, failing with `Error::NotFound` if absent.
    pub async fn require_event(&self, event_id: &str) -> Result<Event> {
        self.fetch_event(event_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("event {}", event_id)))
    }

    /// Fetch every record of one collection under an event, ordered by id.
    pub async fn fetch_all<T: Record>(&self, event_id: &str) -> Result<Vec<T>> {
        let collection = DocumentPath::collection::<T>(event_id);
        let docs = self.retrying("list", || self.store.list(&collection)).await?;

        docs.into_iter()
            .map(|(path, doc)| T::from_document(DocumentPath::id_of(&path), doc))
            .collect()
    }

    pub async fn fetch_items(&self, event_id: &str) -> Result<Vec<Item>> {
        self.fetch_all::<Item>(event_id).await
    }

    pub async fn fetch_participants(&self, event_id: &str) -> Result<Vec<Participant>> {
        self.fetch_all::<Participant>(event_id).await
    }

    /// Fetch a participant, failing with `Error::NotFound` if absent.
    pub async fn require_participant(
        &self,
        event_id: &str,
        participant_id: &str,
    ) -> Result<Participant> {
        let path = DocumentPath::record::<Participant>(event_id, participant_id);
        let doc = self.retrying("get", || self.store.get(&path)).await?;
        match doc {
            Some(doc) => Participant::from_document(participant_id, doc),
            None => Err(Error::NotFound(format!(
                "participant {} in event {}",
                participant_id, event_id
            ))),
        }
    }

    /// Paths of every record of one collection under an event, without decoding them.
    pub async fn child_paths<T: Record>(&self, event_id: &str) -> Result<Vec<String>> {
        let collection = DocumentPath::collection::<T>(event_id);
        let docs = self.retrying("list", || self.store.list(&collection)).await?;
        Ok(docs.into_iter().map(|(path, _)| path).collect())
    }

    /// Read an event with its items and participants.
    ///
    /// The three reads run concurrently. Returns `Ok(None)` if the event is absent.
    pub async fn fetch_snapshot(&self, event_id: &str) -> Result<Option<EventSnapshot>> {
        let (event, items, participants) = futures::try_join!(
            self.fetch_event(event_id),
            self.fetch_items(event_id),
            self.fetch_participants(event_id),
        )?;

        Ok(event.map(|event| EventSnapshot {
            event,
            items,
            participants,
        }))
    }

    /// Read an event snapshot, failing with `Error::NotFound` if absent.
    pub async fn require_snapshot(&self, event_id: &str) -> Result<EventSnapshot> {
        self.fetch_snapshot(event_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("event {}", event_id)))
    }

    /// Merge fields into one document.
    pub async fn update_fields(&self, path: &str, fields: Document) -> Result<()> {
        self.retrying("update", || self.store.update(path, fields.clone()))
            .await
    }

    /// Commit a batch of writes.
    pub async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.retrying("commit", || self.store.commit(batch.clone()))
            .await
    }

    /// Best-effort removal of documents, used to undo a failed non-atomic batch.
    ///
    /// Returns the number of paths that could not be removed.
    pub async fn compensate(&self, paths: &[String]) -> usize {
        let mut failed = 0;
        for path in paths.iter().rev() {
            if let Err(e) = self.retrying("delete", || self.store.delete(path)).await {
                warn!("Compensating delete of {} failed: {}", path, e);
                failed += 1;
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryStore;
    use crate::model::EventStatus;
    use chrono::Utc;

    fn sample_event(id: &str) -> Event {
        Event {
            id: id.to_string(),
            creator_id: "u1".to_string(),
            creator_name: "Ayu".to_string(),
            name: "Dinner".to_string(),
            subtotal: 1000,
            total_amount: 1100,
            tax_amount: 100,
            service_fee: 0,
            status: EventStatus::Ongoing,
            created_at: Utc::now(),
            share_link: String::new(),
        }
    }

    async fn seeded() -> EventRepository<InMemoryStore> {
        let repo = EventRepository::new(InMemoryStore::new());
        let event = sample_event("e1");

        let mut batch = WriteBatch::new();
        batch
            .set(DocumentPath::event("e1"), event.to_document().unwrap())
            .set(
                DocumentPath::record::<Item>("e1", "i1"),
                Item::new("i1", "Soto", 1, 1000).to_document().unwrap(),
            )
            .set(
                DocumentPath::record::<Participant>("e1", "p1"),
                Participant::new("p1", "Ayu").as_creator().to_document().unwrap(),
            );
        repo.commit(batch).await.expect("Failed to seed");
        repo
    }

    #[tokio::test]
    async fn test_fetch_snapshot() {
        let repo = seeded().await;

        let snapshot = repo
            .fetch_snapshot("e1")
            .await
            .expect("Failed to fetch")
            .expect("Snapshot missing");

        assert_eq!(snapshot.event.id, "e1");
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].id, "i1");
        assert_eq!(snapshot.participants[0].id, "p1");
    }

    #[tokio::test]
    async fn test_missing_event() {
        let repo = EventRepository::new(InMemoryStore::new());

        assert!(repo.fetch_snapshot("nope").await.unwrap().is_none());
        assert!(matches!(
            repo.require_event("nope").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_require_participant() {
        let repo = seeded().await;

        let creator = repo.require_participant("e1", "p1").await.unwrap();
        assert!(creator.is_creator);
        assert!(matches!(
            repo.require_participant("e1", "p9").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_compensate_removes_paths() {
        let repo = seeded().await;
        let paths = vec![
            DocumentPath::event("e1"),
            DocumentPath::record::<Item>("e1", "i1"),
        ];

        assert_eq!(repo.compensate(&paths).await, 0);
        assert!(repo.fetch_event("e1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_limit() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let repo = EventRepository::new(InMemoryStore::new()).with_retry(2);
        let calls = AtomicU32::new(0);

        tokio::time::pause();
        let result: Result<()> = repo
            .retrying("probe", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::BackendError("unavailable".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(Error::BackendError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_transient_errors_are_not_retried() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let repo = EventRepository::new(InMemoryStore::new()).with_retry(5);
        let calls = AtomicU32::new(0);

        let result: Result<()> = repo
            .retrying("probe", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::NotFound("doc".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
