//! Split strategies and the policies that shape allocation.
//!
//! Enum-based strategies replace ad-hoc boolean flags, so how a bill is split
//! is always explicit and type-safe.
//!
//! # Split Modes
//!
//! ```
//! use split_kit::strategy::SplitMode;
//!
//! // 1. Even - total divided by head count
//! let _m = SplitMode::Even;
//!
//! // 2. Itemized - each participant pays for the items they had (default)
//! let _m = SplitMode::Itemized;
//!
//! // 3. DivideEvenly - every item shared by everyone, itemized arithmetic
//! let _m = SplitMode::DivideEvenly;
//! ```
//!
//! | Mode | Subtotal share | Tax / service fee |
//! |------|----------------|-------------------|
//! | **Even** | `total / n` | `tax / n`, `fee / n` |
//! | **Itemized** | Σ `item / selection_count` | per `ProrationPolicy` |
//! | **DivideEvenly** | Itemized with all items assigned to all | per `ProrationPolicy` |
//!
//! # Policies
//!
//! Three policies settle behaviors where more than one answer is defensible.
//! Each default reproduces the established behavior; the alternatives are
//! opt-in through `CoordinatorConfig`.
//!
//! - `ProrationPolicy`: how tax and service fee follow the subtotal share
//! - `RemainderPolicy`: what happens to the Even-mode division remainder
//! - `ReassignPolicy`: who gets recomputed when one participant's items change

/// How a bill is split between participants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SplitMode {
    /// **Even**: every participant owes `total_amount / n`, floor division.
    ///
    /// The remainder is handled by `RemainderPolicy`.
    Even,

    /// **Itemized**: each item's price is divided between the participants
    /// assigned to it; tax and service fee follow `ProrationPolicy`.
    #[default]
    Itemized,

    /// **DivideEvenly**: every item is treated as assigned to every
    /// participant, then the Itemized computation runs.
    DivideEvenly,
}

impl std::fmt::Display for SplitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SplitMode::Even => write!(f, "Even"),
            SplitMode::Itemized => write!(f, "Itemized"),
            SplitMode::DivideEvenly => write!(f, "DivideEvenly"),
        }
    }
}

/// How tax and service fee are apportioned in itemized splits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProrationPolicy {
    /// `share = floor(subtotal_share * amount / event_subtotal)`.
    #[default]
    Proportional,

    /// `share = amount / n` regardless of item assignment.
    ///
    /// Legacy behavior of some older recompute paths.
    Equal,
}

impl std::fmt::Display for ProrationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProrationPolicy::Proportional => write!(f, "Proportional"),
            ProrationPolicy::Equal => write!(f, "Equal"),
        }
    }
}

/// What to do with the remainder of an Even split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RemainderPolicy {
    /// Remainder is discarded; `Σ shares` may fall short of the total by less than `n`.
    #[default]
    Drop,

    /// Remainder is added to the creator's share.
    AssignToCreator,
}

impl std::fmt::Display for RemainderPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemainderPolicy::Drop => write!(f, "Drop"),
            RemainderPolicy::AssignToCreator => write!(f, "AssignToCreator"),
        }
    }
}

/// Which participants are recomputed when one participant's items change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReassignPolicy {
    /// Only the reassigned participant is recomputed and written.
    ///
    /// Co-assigned participants keep their previous amounts until their own
    /// record is next recomputed.
    #[default]
    TargetOnly,

    /// Every participant is recomputed and written in one batch.
    RecomputeAll,
}

impl std::fmt::Display for ReassignPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReassignPolicy::TargetOnly => write!(f, "TargetOnly"),
            ReassignPolicy::RecomputeAll => write!(f, "RecomputeAll"),
        }
    }
}
