//! Event mutation coordinator - main entry point for event operations.
//!
//! Every mutation is a read-recompute-write sequence against the document
//! store. Two rules keep those sequences safe:
//!
//! - **Single writer per event.** A mutation holds its event's lock from its
//!   first read to its last write. Mutations of different events run in
//!   parallel. A lock entry lives only while some mutation holds or awaits it.
//! - **One commit per mutation.** All records a mutation writes go into one
//!   `WriteBatch`. On an atomic store a failure leaves nothing behind; on a
//!   non-atomic store, a failed create is undone with compensating deletes.

use crate::allocation::{compute_shares, even_split, AllocationPolicy, Shares};
use crate::backend::{DocumentStore, WriteBatch};
use crate::entity::Record;
use crate::error::{Error, Result};
use crate::key::DocumentPath;
use crate::model::{
    Event, EventSnapshot, EventStatus, Item, Money, NewEvent, NewParticipant, Participant,
};
use crate::observability::{NoOpMetrics, SplitMetrics};
use crate::repository::EventRepository;
use crate::scan::BillPayload;
use crate::serialization::to_fields;
use crate::strategy::{ProrationPolicy, ReassignPolicy, RemainderPolicy, SplitMode};
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Default base of event share links.
pub const DEFAULT_SHARE_LINK_BASE: &str = "https://billbuddy.app/event";

/// Coordinator configuration.
///
/// Every default reproduces the established behavior of the bill-splitting
/// flows; the alternatives have to be asked for.
///
/// # Example
///
/// ```
/// use split_kit::coordinator::CoordinatorConfig;
/// use split_kit::strategy::ReassignPolicy;
///
/// let config = CoordinatorConfig::default()
///     .with_reassign(ReassignPolicy::RecomputeAll)
///     .with_retry(3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// How tax and service fee follow the subtotal share.
    pub proration: ProrationPolicy,

    /// What happens to the Even-mode remainder.
    pub remainder: RemainderPolicy,

    /// Who gets recomputed when a participant's items change.
    pub reassign: ReassignPolicy,

    /// Number of retry attempts for transient store failures (0 = no retry).
    pub retry_count: u32,

    /// Share links are `{share_link_base}?eventId={event_id}`.
    pub share_link_base: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            proration: ProrationPolicy::default(),
            remainder: RemainderPolicy::default(),
            reassign: ReassignPolicy::default(),
            retry_count: 0,
            share_link_base: DEFAULT_SHARE_LINK_BASE.to_string(),
        }
    }
}

impl CoordinatorConfig {
    pub fn with_proration(mut self, proration: ProrationPolicy) -> Self {
        self.proration = proration;
        self
    }

    pub fn with_remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }

    pub fn with_reassign(mut self, reassign: ReassignPolicy) -> Self {
        self.reassign = reassign;
        self
    }

    /// Set retry count for store calls.
    pub fn with_retry(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    pub fn with_share_link_base(mut self, base: impl Into<String>) -> Self {
        self.share_link_base = base.into();
        self
    }

    /// # Errors
    ///
    /// - `Error::ConfigError`: blank share link base
    pub fn validate(&self) -> Result<()> {
        if self.share_link_base.trim().is_empty() {
            return Err(Error::ConfigError(
                "share link base must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    pub fn allocation_policy(&self) -> AllocationPolicy {
        AllocationPolicy {
            proration: self.proration,
            remainder: self.remainder,
        }
    }

    pub fn share_link(&self, event_id: &str) -> String {
        format!(
            "{}?eventId={}",
            self.share_link_base.trim_end_matches('/'),
            event_id
        )
    }
}

/// Per-event single-writer locks.
#[derive(Default)]
struct EventLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl EventLocks {
    async fn acquire(&self, event_id: &str) -> EventGuard<'_> {
        let lock = self.locks.entry(event_id.to_string()).or_default().clone();
        EventGuard {
            locks: self,
            event_id: event_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Drop the entry unless another task still holds a handle to it.
    fn release(&self, event_id: &str) {
        self.locks
            .remove_if(event_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Held lock on one event. Unlocks, then prunes the registry entry, on drop.
struct EventGuard<'a> {
    locks: &'a EventLocks,
    event_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EventGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.event_id);
    }
}

#[derive(Serialize)]
struct AmountUpdate {
    amount: Money,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignmentUpdate<'a> {
    items_assigned: &'a BTreeSet<String>,
    amount: Money,
}

#[derive(Serialize)]
struct PaidUpdate {
    paid: bool,
}

#[derive(Serialize)]
struct StatusUpdate {
    status: EventStatus,
}

/// Core event coordinator.
///
/// # Example
///
/// ```ignore
/// use split_kit::{EventCoordinator, backend::InMemoryStore};
/// use split_kit::model::{Item, NewEvent, NewParticipant};
///
/// let coordinator = EventCoordinator::new(InMemoryStore::new());
/// let event_id = coordinator
///     .create_event(
///         NewEvent::new("user_1", "Ayu", "Dinner")
///             .with_items(vec![Item::new("a", "Soto", 2, 1000)])
///             .with_participant(NewParticipant::creator("Ayu").with_items(["a"]))
///             .with_participant(NewParticipant::new("Budi").with_items(["a"])),
///     )
///     .await?;
/// ```
pub struct EventCoordinator<S: DocumentStore> {
    repo: EventRepository<S>,
    config: CoordinatorConfig,
    metrics: Box<dyn SplitMetrics>,
    locks: EventLocks,
}

impl<S: DocumentStore> EventCoordinator<S> {
    /// Create a coordinator with the default configuration.
    pub fn new(store: S) -> Self {
        EventCoordinator {
            repo: EventRepository::new(store),
            config: CoordinatorConfig::default(),
            metrics: Box::new(NoOpMetrics),
            locks: EventLocks::default(),
        }
    }

    /// Create a coordinator with a custom configuration.
    ///
    /// # Errors
    ///
    /// - `Error::ConfigError`: `config.validate()` failed
    pub fn with_config(store: S, config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(EventCoordinator {
            repo: EventRepository::new(store).with_retry(config.retry_count),
            config,
            metrics: Box::new(NoOpMetrics),
            locks: EventLocks::default(),
        })
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn SplitMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn repository(&self) -> &EventRepository<S> {
        &self.repo
    }

    /// Get store reference (for advanced use).
    pub fn store(&self) -> &S {
        self.repo.store()
    }

    async fn instrumented<T, Fut>(&self, op: &str, event_id: &str, work: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let timer = Instant::now();
        debug!("» {} for event {}", op, event_id);

        match work.await {
            Ok(value) => {
                self.metrics.record_operation(op, event_id, timer.elapsed());
                info!("✓ {} for event {} succeeded in {:?}", op, event_id, timer.elapsed());
                Ok(value)
            }
            Err(e) => {
                self.metrics.record_error(op, event_id, &e.to_string());
                warn!("✗ {} for event {} failed: {}", op, event_id, e);
                Err(e)
            }
        }
    }

    fn shares(
        &self,
        items: &[Item],
        participants: &[Participant],
        mode: SplitMode,
        tax_amount: Money,
        service_fee: Money,
    ) -> Shares {
        compute_shares(
            items,
            participants,
            mode,
            tax_amount,
            service_fee,
            &self.config.allocation_policy(),
        )
    }

    /// Create an event with its items and participants. Returns the new event id.
    ///
    /// The creator is marked paid and every other participant unpaid, whatever
    /// the input says. Amounts come from the allocation engine under
    /// `request.mode`.
    ///
    /// # Errors
    ///
    /// - `Error::ValidationError`: bad items, fees, creator count, or assignments
    /// - `Error::BackendError`: the store rejected the commit
    pub async fn create_event(&self, request: NewEvent) -> Result<String> {
        let event_id = Uuid::new_v4().to_string();
        self.instrumented("create_event", &event_id, self.create_event_inner(&event_id, request))
            .await?;
        Ok(event_id)
    }

    /// Create an event from a scanned bill.
    ///
    /// The payload's items, tax, and service fee replace those in `request`.
    pub async fn create_event_from_scan(
        &self,
        request: NewEvent,
        payload: BillPayload,
    ) -> Result<String> {
        payload.validate()?;

        let request = NewEvent {
            items: payload.items,
            tax_amount: payload.tax,
            service_fee: payload.service_fee,
            ..request
        };
        self.create_event(request).await
    }

    async fn create_event_inner(&self, event_id: &str, request: NewEvent) -> Result<()> {
        let (subtotal, total_amount) = validate_new_event(&request)?;

        let event = Event {
            id: event_id.to_string(),
            creator_id: request.creator_id,
            creator_name: request.creator_name,
            name: request.name,
            subtotal,
            total_amount,
            tax_amount: request.tax_amount,
            service_fee: request.service_fee,
            status: EventStatus::Ongoing,
            created_at: Utc::now(),
            share_link: self.config.share_link(event_id),
        };

        let mut participants: Vec<Participant> = request
            .participants
            .into_iter()
            .map(|p| {
                let mut participant = p.into_participant(Uuid::new_v4().to_string());
                participant.paid = participant.is_creator;
                participant
            })
            .collect();

        let shares = self.shares(
            &request.items,
            &participants,
            request.mode,
            event.tax_amount,
            event.service_fee,
        );
        for participant in &mut participants {
            participant.amount = shares.get(&participant.id).map_or(0, |s| s.total);
        }

        debug!(
            "Event {}: subtotal {}, total {}, {} items, {} participants ({})",
            event_id,
            event.subtotal,
            event.total_amount,
            request.items.len(),
            participants.len(),
            request.mode
        );

        let mut batch = WriteBatch::new();
        batch.set(DocumentPath::event(event_id), event.to_document()?);
        for item in &request.items {
            batch.set(
                DocumentPath::record::<Item>(event_id, &item.id),
                item.to_document()?,
            );
        }
        for participant in &participants {
            batch.set(
                DocumentPath::record::<Participant>(event_id, &participant.id),
                participant.to_document()?,
            );
        }

        let created = batch.created_paths();
        if let Err(e) = self.repo.commit(batch).await {
            if !self.store().is_atomic() {
                warn!(
                    "Create of event {} failed part-way, removing {} written documents",
                    event_id,
                    created.len()
                );
                let leftover = self.repo.compensate(&created).await;
                if leftover > 0 {
                    warn!("{} documents of event {} could not be removed", leftover, event_id);
                }
            }
            return Err(e);
        }

        Ok(())
    }

    /// Add a participant to an event. Returns the new participant id.
    ///
    /// Only the new participant's share is computed (itemized arithmetic, with
    /// selection counts that include them). When `participant.items_assigned`
    /// is empty, every non-creator participant, the new one included, is then
    /// reset to an even split of the event total; see `recalculate_event_total`.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound`: no such event
    /// - `Error::ValidationError`: blank name, a second creator, or unknown item ids
    pub async fn add_participant(
        &self,
        event_id: &str,
        participant: NewParticipant,
    ) -> Result<String> {
        self.instrumented(
            "add_participant",
            event_id,
            self.add_participant_inner(event_id, participant),
        )
        .await
    }

    async fn add_participant_inner(
        &self,
        event_id: &str,
        request: NewParticipant,
    ) -> Result<String> {
        let _guard = self.locks.acquire(event_id).await;

        if request.name.trim().is_empty() {
            return Err(Error::ValidationError(
                "participant name must not be blank".to_string(),
            ));
        }
        if request.is_creator {
            return Err(Error::ValidationError(format!(
                "event {} already has a creator",
                event_id
            )));
        }

        let snapshot = self.repo.require_snapshot(event_id).await?;
        check_assignments(&snapshot.items, &request.items_assigned)?;

        let participant_id = Uuid::new_v4().to_string();
        let mut participant = request.into_participant(participant_id.clone());

        let mut everyone = snapshot.participants.clone();
        everyone.push(participant.clone());
        let shares = self.shares(
            &snapshot.items,
            &everyone,
            SplitMode::Itemized,
            snapshot.event.tax_amount,
            snapshot.event.service_fee,
        );
        participant.amount = shares.get(&participant_id).map_or(0, |s| s.total);

        let reset = participant.items_assigned.is_empty();
        let mut batch = WriteBatch::new();

        if reset {
            let per_head = even_split(snapshot.event.total_amount, everyone.len());
            debug!(
                "Participant {} has no items, resetting event {} to {} per head",
                participant_id, event_id, per_head
            );
            participant.amount = per_head;
            self.append_even_reset(&mut batch, event_id, &snapshot.participants, per_head)?;
        }

        batch.set(
            DocumentPath::record::<Participant>(event_id, &participant_id),
            participant.to_document()?,
        );
        self.repo.commit(batch).await?;

        Ok(participant_id)
    }

    /// Overwrite every non-creator participant's amount with
    /// `total_amount / participant_count`, the count including the creator.
    ///
    /// Item assignments are left as they are; this is the reset that adding
    /// an unassigned participant triggers.
    pub async fn recalculate_event_total(&self, event_id: &str) -> Result<Money> {
        self.instrumented(
            "recalculate_event_total",
            event_id,
            self.recalculate_event_total_inner(event_id),
        )
        .await
    }

    async fn recalculate_event_total_inner(&self, event_id: &str) -> Result<Money> {
        let _guard = self.locks.acquire(event_id).await;

        let event = self.repo.require_event(event_id).await?;
        let participants = self.repo.fetch_participants(event_id).await?;
        let per_head = even_split(event.total_amount, participants.len());

        let mut batch = WriteBatch::new();
        self.append_even_reset(&mut batch, event_id, &participants, per_head)?;
        self.repo.commit(batch).await?;

        Ok(per_head)
    }

    fn append_even_reset(
        &self,
        batch: &mut WriteBatch,
        event_id: &str,
        participants: &[Participant],
        per_head: Money,
    ) -> Result<()> {
        for other in participants.iter().filter(|p| !p.is_creator) {
            batch.update(
                DocumentPath::record::<Participant>(event_id, &other.id),
                to_fields(&AmountUpdate { amount: per_head })?,
            );
        }
        Ok(())
    }

    /// Replace a participant's item assignment and recompute their amount.
    ///
    /// Under `ReassignPolicy::TargetOnly` only this participant is written;
    /// others sharing the same items keep their previous amounts. Under
    /// `ReassignPolicy::RecomputeAll` every participant's amount is rewritten.
    /// Returns the updated participant.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound`: no such event or participant
    /// - `Error::ValidationError`: unknown item ids
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
        let items: BTreeSet<String> = items.into_iter().map(Into::into).collect();
        self.instrumented(
            "update_participant_items",
            event_id,
            self.update_participant_items_inner(event_id, participant_id, items),
        )
        .await
    }

    async fn update_participant_items_inner(
        &self,
        event_id: &str,
        participant_id: &str,
        items: BTreeSet<String>,
    ) -> Result<Participant> {
        let _guard = self.locks.acquire(event_id).await;

        let snapshot = self.repo.require_snapshot(event_id).await?;
        check_assignments(&snapshot.items, &items)?;

        let mut participants = snapshot.participants;
        let target = participants
            .iter_mut()
            .find(|p| p.id == participant_id)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "participant {} in event {}",
                    participant_id, event_id
                ))
            })?;
        target.items_assigned = items;

        let shares = self.shares(
            &snapshot.items,
            &participants,
            SplitMode::Itemized,
            snapshot.event.tax_amount,
            snapshot.event.service_fee,
        );

        let mut batch = WriteBatch::new();
        let mut updated = None;
        for participant in &mut participants {
            let is_target = participant.id == participant_id;
            if !is_target && self.config.reassign == ReassignPolicy::TargetOnly {
                continue;
            }

            participant.amount = shares.get(&participant.id).map_or(0, |s| s.total);
            let path = DocumentPath::record::<Participant>(event_id, &participant.id);
            if is_target {
                batch.update(
                    path,
                    to_fields(&AssignmentUpdate {
                        items_assigned: &participant.items_assigned,
                        amount: participant.amount,
                    })?,
                );
                updated = Some(participant.clone());
            } else {
                batch.update(
                    path,
                    to_fields(&AmountUpdate {
                        amount: participant.amount,
                    })?,
                );
            }
        }

        debug!(
            "Reassigning items of {} in event {} ({}, {} writes)",
            participant_id,
            event_id,
            self.config.reassign,
            batch.len()
        );
        self.repo.commit(batch).await?;

        updated.ok_or_else(|| Error::Other(format!("participant {} vanished", participant_id)))
    }

    /// Set a participant's paid flag and complete the event once every
    /// non-creator has paid. Returns the event's resulting status.
    ///
    /// The paid flag and the status change are committed together.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound`: no such event or participant
    /// - `Error::Forbidden`: the participant is the event creator
    pub async fn update_payment_status(
        &self,
        event_id: &str,
        participant_id: &str,
        paid: bool,
    ) -> Result<EventStatus> {
        self.instrumented(
            "update_payment_status",
            event_id,
            self.update_payment_status_inner(event_id, participant_id, paid),
        )
        .await
    }

    async fn update_payment_status_inner(
        &self,
        event_id: &str,
        participant_id: &str,
        paid: bool,
    ) -> Result<EventStatus> {
        let _guard = self.locks.acquire(event_id).await;

        let snapshot = self.repo.require_snapshot(event_id).await?;
        let participant = snapshot.participant(participant_id).ok_or_else(|| {
            Error::NotFound(format!(
                "participant {} in event {}",
                participant_id, event_id
            ))
        })?;
        if participant.is_creator {
            return Err(Error::Forbidden(format!(
                "paid status of creator {} cannot be changed",
                participant_id
            )));
        }

        // Paid flags as they will be once this write lands.
        let all_paid = snapshot
            .non_creators()
            .all(|p| if p.id == participant_id { paid } else { p.paid });
        let completes = all_paid && snapshot.event.status.can_transition_to(EventStatus::Completed);

        let mut batch = WriteBatch::new();
        batch.update(
            DocumentPath::record::<Participant>(event_id, participant_id),
            to_fields(&PaidUpdate { paid })?,
        );
        if completes {
            batch.update(
                DocumentPath::event(event_id),
                to_fields(&StatusUpdate {
                    status: EventStatus::Completed,
                })?,
            );
        }
        self.repo.commit(batch).await?;

        if completes {
            self.metrics
                .record_status_change(event_id, EventStatus::Completed);
            return Ok(EventStatus::Completed);
        }
        Ok(snapshot.event.status)
    }

    /// Delete an event with all its items and participants.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound`: no such event
    /// - `Error::BackendError`: the store rejected the commit. On a non-atomic
    ///   store some children may already be gone while the event remains.
    pub async fn delete_event(&self, event_id: &str) -> Result<()> {
        self.instrumented("delete_event", event_id, self.delete_event_inner(event_id))
            .await
    }

    async fn delete_event_inner(&self, event_id: &str) -> Result<()> {
        let _guard = self.locks.acquire(event_id).await;

        self.repo.require_event(event_id).await?;
        let (items, participants) = futures::try_join!(
            self.repo.child_paths::<Item>(event_id),
            self.repo.child_paths::<Participant>(event_id),
        )?;

        let mut batch = WriteBatch::new();
        for path in items.iter().chain(participants.iter()) {
            batch.delete(path.as_str());
        }
        batch.delete(DocumentPath::event(event_id));
        self.repo.commit(batch).await
    }

    /// Read an event with its items and participants.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound`: no such event
    pub async fn get_event(&self, event_id: &str) -> Result<EventSnapshot> {
        self.repo.require_snapshot(event_id).await
    }

    /// The stored share link of an event.
    pub async fn share_link(&self, event_id: &str) -> Result<String> {
        Ok(self.repo.require_event(event_id).await?.share_link)
    }
}

/// Checks a create request and returns its `(subtotal, total)`.
fn validate_new_event(request: &NewEvent) -> Result<(Money, Money)> {
    let totals = BillPayload::new(request.items.clone(), request.tax_amount, request.service_fee)
        .checked_totals()?;

    let mut seen = HashSet::new();
    for item in &request.items {
        if item.id.trim().is_empty() || item.id.contains('/') {
            return Err(Error::ValidationError(format!(
                "item {:?} needs an id without '/'",
                item.name
            )));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(Error::ValidationError(format!(
                "duplicate item id {:?}",
                item.id
            )));
        }
    }

    let creators = request.participants.iter().filter(|p| p.is_creator).count();
    if creators != 1 {
        return Err(Error::ValidationError(format!(
            "an event needs exactly one creator, got {}",
            creators
        )));
    }

    for participant in &request.participants {
        if participant.name.trim().is_empty() {
            return Err(Error::ValidationError(
                "participant name must not be blank".to_string(),
            ));
        }
        check_assignments(&request.items, &participant.items_assigned)?;
    }

    Ok(totals)
}

fn check_assignments(items: &[Item], assigned: &BTreeSet<String>) -> Result<()> {
    for item_id in assigned {
        if !items.iter().any(|item| &item.id == item_id) {
            return Err(Error::ValidationError(format!(
                "unknown item id {:?}",
                item_id
            )));
        }
    }
    Ok(())
}
