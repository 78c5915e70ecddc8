//! # split-kit
//!
//! Bill splitting for shared expenses: an allocation engine that decides who
//! owes what, and an event coordinator that keeps events, items, and
//! participants consistent in an async document store.
//!
//! ## Features
//!
//! - **Integer Money:** Amounts are `i64` in the smallest currency unit; no floats anywhere
//! - **Three Split Modes:** Even, itemized, and divide-evenly (see [`strategy`])
//! - **Store Agnostic:** Any [`DocumentStore`]; an in-memory store ships by default
//! - **Consistent Writes:** One batch per mutation and a single writer per event
//! - **Production Ready:** Built-in logging, metrics hooks, retries, and error handling
//!
//! ## Quick Start
//!
//! ### For Web Applications (Recommended)
//!
//! Use [`SplitService`] for easy sharing across threads:
//!
//! ```ignore
//! use split_kit::{
//!     SplitService,
//!     backend::InMemoryStore,
//!     model::{Item, NewEvent, NewParticipant},
//! };
//!
//! let splits = SplitService::new(InMemoryStore::new());
//!
//! // 1. Create an event from the bill
//! let event_id = splits
//!     .create_event(
//!         NewEvent::new("user_1", "Ayu", "Dinner")
//!             .with_items(vec![
//!                 Item::new("A", "Ayam", 2, 1000),
//!                 Item::new("B", "Bakso", 1, 500),
//!             ])
//!             .with_tax(250)
//!             .with_service_fee(250)
//!             .with_participant(NewParticipant::creator("Ayu").with_items(["A", "B"]))
//!             .with_participant(NewParticipant::new("Budi").with_items(["A"])),
//!     )
//!     .await?;
//!
//! // 2. Read it back: Ayu owes 1800, Budi owes 1200
//! let snapshot = splits.get_event(&event_id).await?;
//!
//! // 3. Budi pays, the event completes
//! let budi = snapshot.non_creators().next().unwrap();
//! splits.update_payment_status(&event_id, &budi.id, true).await?;
//! ```
//!
//! ### Allocation Only
//!
//! [`compute_shares`] is a pure function and needs no store:
//!
//! ```
//! use split_kit::allocation::{compute_shares, AllocationPolicy};
//! use split_kit::model::{Item, Participant};
//! use split_kit::strategy::SplitMode;
//!
//! let items = vec![Item::new("a", "Nasi", 1, 3000)];
//! let people = vec![
//!     Participant::new("p1", "Ayu").with_items(["a"]).as_creator(),
//!     Participant::new("p2", "Budi").with_items(["a"]),
//! ];
//!
//! let shares = compute_shares(&items, &people, SplitMode::Itemized, 0, 0, &AllocationPolicy::default());
//! assert_eq!(shares["p1"].total, 1500);
//! assert_eq!(shares["p2"].total, 1500);
//! ```

#[macro_use]
extern crate log;

pub mod allocation;
pub mod backend;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod key;
pub mod model;
pub mod observability;
pub mod repository;
pub mod scan;
pub mod serialization;
pub mod service;
pub mod strategy;

// Re-exports for convenience
pub use allocation::{compute_shares, Share, Shares};
pub use backend::{DocumentStore, InMemoryStore};
pub use coordinator::{CoordinatorConfig, EventCoordinator};
pub use entity::Record;
pub use error::{Error, Result};
pub use model::{
    Event, EventSnapshot, EventStatus, Item, Money, NewEvent, NewParticipant, Participant,
};
pub use scan::{BillPayload, BillScanner};
pub use service::SplitService;
pub use strategy::SplitMode;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
