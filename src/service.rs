//! High-level split service for web applications.
//!
//! Provides a convenient wrapper around EventCoordinator with Arc for easy sharing.

use crate::backend::DocumentStore;
use crate::coordinator::{CoordinatorConfig, EventCoordinator};
use crate::error::Result;
use crate::model::{EventSnapshot, EventStatus, Money, NewEvent, NewParticipant, Participant};
use crate::observability::SplitMetrics;
use crate::scan::{BillPayload, BillScanner};
use std::sync::Arc;

/// High-level split service for web applications.
///
/// Wraps `EventCoordinator` in `Arc` so request handlers can share one
/// coordinator, and with it one set of per-event locks, without external
/// `Arc<Mutex<>>` wrappers.
///
/// # Example
///
/// ```ignore
/// use split_kit::{SplitService, backend::InMemoryStore};
///
/// let splits = SplitService::new(InMemoryStore::new());
///
/// pub struct EventHandlers {
///     splits: SplitService<InMemoryStore>,
/// }
///
/// impl EventHandlers {
///     pub async fn mark_paid(&self, event_id: &str, participant_id: &str) -> Result<EventStatus> {
///         self.splits.update_payment_status(event_id, participant_id, true).await
///     }
/// }
/// ```
#[derive(Clone)]
pub struct SplitService<S: DocumentStore> {
    coordinator: Arc<EventCoordinator<S>>,
}

impl<S: DocumentStore> SplitService<S> {
    /// Create a new split service with the given store.
    pub fn new(store: S) -> Self {
        SplitService {
            coordinator: Arc::new(EventCoordinator::new(store)),
        }
    }

    /// Create a split service with a custom configuration.
    ///
    /// # Errors
    ///
    /// - `Error::ConfigError`: `config.validate()` failed
    pub fn with_config(store: S, config: CoordinatorConfig) -> Result<Self> {
        Ok(SplitService {
            coordinator: Arc::new(EventCoordinator::with_config(store, config)?),
        })
    }

    /// Create a new split service with custom metrics.
    pub fn with_metrics(store: S, metrics: Box<dyn SplitMetrics>) -> Self {
        SplitService {
            coordinator: Arc::new(EventCoordinator::new(store).with_metrics(metrics)),
        }
    }

    pub async fn create_event(&self, request: NewEvent) -> Result<String> {
        self.coordinator.create_event(request).await
    }

    /// Scan a bill and create an event from it.
    ///
    /// # Errors
    ///
    /// Scanner failures are returned as-is; see `EventCoordinator::create_event`
    /// for the rest.
    pub async fn create_event_from_scanner<B: BillScanner>(
        &self,
        request: NewEvent,
        scanner: &B,
    ) -> Result<String> {
        let payload = scanner.scan().await?;
        scanner.validate(&payload)?;
        self.coordinator.create_event_from_scan(request, payload).await
    }

    pub async fn create_event_from_scan(
        &self,
        request: NewEvent,
        payload: BillPayload,
    ) -> Result<String> {
        self.coordinator.create_event_from_scan(request, payload).await
    }

    pub async fn add_participant(
        &self,
        event_id: &str,
        participant: NewParticipant,
    ) -> Result<String> {
        self.coordinator.add_participant(event_id, participant).await
    }

    pub async fn recalculate_event_total(&self, event_id: &str) -> Result<Money> {
        self.coordinator.recalculate_event_total(event_id).await
    }

    pub async fn update_participant_items<I, T>(
        &self,
        event_id: &str,
        participant_id: &str,
        items: I,
    ) -> Result<Participant>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.coordinator
            .update_participant_items(event_id, participant_id, items)
            .await
    }

    pub async fn update_payment_status(
        &self,
        event_id: &str,
        participant_id: &str,
        paid: bool,
    ) -> Result<EventStatus> {
        self.coordinator
            .update_payment_status(event_id, participant_id, paid)
            .await
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<()> {
        self.coordinator.delete_event(event_id).await
    }

    pub async fn get_event(&self, event_id: &str) -> Result<EventSnapshot> {
        self.coordinator.get_event(event_id).await
    }

    pub async fn share_link(&self, event_id: &str) -> Result<String> {
        self.coordinator.share_link(event_id).await
    }

    /// Get a reference to the underlying coordinator.
    pub fn coordinator(&self) -> &EventCoordinator<S> {
        &self.coordinator
    }
}
