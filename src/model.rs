//! Stored records and request types.
//!
//! Amounts are integers in the smallest currency unit.

use crate::entity::Record;
use crate::error::{Error, Result};
use crate::strategy::SplitMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Monetary amount in the smallest currency unit.
pub type Money = i64;

/// Lifecycle status of an event.
///
/// `Ongoing --(all non-creator participants paid)--> Completed`; no way back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Ongoing,
    Completed,
}

impl EventStatus {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        matches!((self, next), (EventStatus::Ongoing, EventStatus::Completed))
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Ongoing => write!(f, "ongoing"),
            EventStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A shared expense.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(skip)]
    pub id: String,
    pub creator_id: String,
    pub creator_name: String,
    #[serde(rename = "event_name")]
    pub name: String,
    pub subtotal: Money,
    pub total_amount: Money,
    pub tax_amount: Money,
    pub service_fee: Money,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub share_link: String,
}

impl Record for Event {
    fn collection() -> &'static str {
        crate::key::EVENTS
    }

    fn record_id(&self) -> &str {
        &self.id
    }

    fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    fn validate(&self) -> Result<()> {
        let expected = self
            .subtotal
            .checked_add(self.tax_amount)
            .and_then(|sum| sum.checked_add(self.service_fee));
        if expected != Some(self.total_amount) {
            return Err(Error::ValidationError(format!(
                "event {}: total {} != subtotal {} + tax {} + service fee {}",
                self.id, self.total_amount, self.subtotal, self.tax_amount, self.service_fee
            )));
        }
        Ok(())
    }
}

/// A line item on the bill. Immutable once the event exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
}

impl Item {
    /// Create an item, deriving `total_price` from quantity and unit price.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> Self {
        Item {
            id: id.into(),
            name: name.into(),
            quantity,
            unit_price,
            total_price: quantity * unit_price,
        }
    }

    /// Item validity: non-blank name, `quantity > 0`, `unit_price >= 0`,
    /// `total_price == quantity * unit_price`.
    pub fn check(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::ValidationError(format!(
                "item {:?} has a blank name",
                self.id
            )));
        }
        if self.quantity <= 0 {
            return Err(Error::ValidationError(format!(
                "item {:?} has non-positive quantity {}",
                self.name, self.quantity
            )));
        }
        if self.unit_price < 0 {
            return Err(Error::ValidationError(format!(
                "item {:?} has negative unit price {}",
                self.name, self.unit_price
            )));
        }
        if self.quantity.checked_mul(self.unit_price) != Some(self.total_price) {
            return Err(Error::ValidationError(format!(
                "item {:?}: total price {} != {} x {}",
                self.name, self.total_price, self.quantity, self.unit_price
            )));
        }
        Ok(())
    }
}

impl Record for Item {
    fn collection() -> &'static str {
        "items"
    }

    fn record_id(&self) -> &str {
        &self.id
    }

    fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    fn validate(&self) -> Result<()> {
        self.check()
    }
}

/// A person sharing the bill.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Computed share; never authoritative input.
    #[serde(default)]
    pub amount: Money,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub items_assigned: BTreeSet<String>,
    #[serde(default)]
    pub is_creator: bool,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Participant {
            id: id.into(),
            name: name.into(),
            user_id: None,
            amount: 0,
            paid: false,
            items_assigned: BTreeSet::new(),
            is_creator: false,
        }
    }

    pub fn with_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items_assigned = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn as_creator(mut self) -> Self {
        self.is_creator = true;
        self
    }

    pub fn is_assigned(&self, item_id: &str) -> bool {
        self.items_assigned.contains(item_id)
    }
}

impl Record for Participant {
    fn collection() -> &'static str {
        "participants"
    }

    fn record_id(&self) -> &str {
        &self.id
    }

    fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }
}

/// An event with its owned items and participants, as read from the store.
#[derive(Clone, Debug, PartialEq)]
pub struct EventSnapshot {
    pub event: Event,
    pub items: Vec<Item>,
    pub participants: Vec<Participant>,
}

impl EventSnapshot {
    pub fn participant(&self, participant_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == participant_id)
    }

    pub fn creator(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_creator)
    }

    pub fn non_creators(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| !p.is_creator)
    }

    /// True when every non-creator participant has paid.
    pub fn all_non_creators_paid(&self) -> bool {
        self.non_creators().all(|p| p.paid)
    }

    /// Sum of stored participant amounts.
    pub fn amount_total(&self) -> Money {
        self.participants.iter().map(|p| p.amount).sum()
    }
}

/// A participant to be added to an event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewParticipant {
    pub name: String,
    pub user_id: Option<String>,
    pub items_assigned: BTreeSet<String>,
    pub is_creator: bool,
}

impl NewParticipant {
    pub fn new(name: impl Into<String>) -> Self {
        NewParticipant {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The event creator. Exactly one per event.
    pub fn creator(name: impl Into<String>) -> Self {
        NewParticipant {
            is_creator: true,
            ..Self::new(name)
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items_assigned = items.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn into_participant(self, id: String) -> Participant {
        Participant {
            id,
            name: self.name,
            user_id: self.user_id,
            amount: 0,
            paid: false,
            items_assigned: self.items_assigned,
            is_creator: self.is_creator,
        }
    }
}

/// Input to `EventCoordinator::create_event`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewEvent {
    pub creator_id: String,
    pub creator_name: String,
    pub name: String,
    pub items: Vec<Item>,
    pub participants: Vec<NewParticipant>,
    pub mode: SplitMode,
    pub tax_amount: Money,
    pub service_fee: Money,
}

impl NewEvent {
    pub fn new(
        creator_id: impl Into<String>,
        creator_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        NewEvent {
            creator_id: creator_id.into(),
            creator_name: creator_name.into(),
            name: name.into(),
            items: Vec::new(),
            participants: Vec::new(),
            mode: SplitMode::default(),
            tax_amount: 0,
            service_fee: 0,
        }
    }

    pub fn with_items(mut self, items: Vec<Item>) -> Self {
        self.items = items;
        self
    }

    pub fn with_participant(mut self, participant: NewParticipant) -> Self {
        self.participants.push(participant);
        self
    }

    pub fn with_mode(mut self, mode: SplitMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_tax(mut self, tax_amount: Money) -> Self {
        self.tax_amount = tax_amount;
        self
    }

    pub fn with_service_fee(mut self, service_fee: Money) -> Self {
        self.service_fee = service_fee;
        self
    }

    /// Sum of item totals, `None` on overflow.
    pub fn subtotal(&self) -> Option<Money> {
        self.items
            .iter()
            .try_fold(0 as Money, |sum, item| sum.checked_add(item.total_price))
    }
}
