//! Allocation engine: turns items, assignments, tax, and service fee into
//! per-participant shares.
//!
//! Everything here is pure. No store access, no clocks, no randomness, and
//! output is an ordered map, so identical input always gives identical output.
//!
//! # Example
//!
//! ```
//! use split_kit::allocation::{compute_shares, AllocationPolicy};
//! use split_kit::model::{Item, Participant};
//! use split_kit::strategy::SplitMode;
//!
//! let items = vec![
//!     Item::new("a", "Nasi Goreng", 2, 1000),
//!     Item::new("b", "Es Teh", 1, 500),
//! ];
//! let participants = vec![
//!     Participant::new("p1", "Ayu").with_items(["a", "b"]),
//!     Participant::new("p2", "Budi").with_items(["a"]),
//! ];
//!
//! let shares = compute_shares(
//!     &items,
//!     &participants,
//!     SplitMode::Itemized,
//!     250,
//!     250,
//!     &AllocationPolicy::default(),
//! );
//! assert_eq!(shares["p1"].total, 1800);
//! assert_eq!(shares["p2"].total, 1200);
//! ```

use crate::model::{Item, Money, Participant};
use crate::strategy::{ProrationPolicy, RemainderPolicy, SplitMode};
use serde::Serialize;
use std::collections::BTreeMap;

/// One participant's computed obligation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Share {
    pub subtotal_share: Money,
    pub tax_share: Money,
    pub service_fee_share: Money,
    /// Always `subtotal_share + tax_share + service_fee_share`.
    pub total: Money,
}

impl Share {
    fn new(subtotal_share: Money, tax_share: Money, service_fee_share: Money) -> Self {
        Share {
            subtotal_share,
            tax_share,
            service_fee_share,
            total: subtotal_share + tax_share + service_fee_share,
        }
    }
}

/// Shares keyed by participant id.
pub type Shares = BTreeMap<String, Share>;

/// Policies the engine consults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocationPolicy {
    pub proration: ProrationPolicy,
    pub remainder: RemainderPolicy,
}

/// Compute every participant's share of the bill.
///
/// `tax_amount` and `service_fee` are event-level amounts; the event subtotal
/// is the sum of item totals.
pub fn compute_shares(
    items: &[Item],
    participants: &[Participant],
    mode: SplitMode,
    tax_amount: Money,
    service_fee: Money,
    policy: &AllocationPolicy,
) -> Shares {
    match mode {
        SplitMode::Even => even_shares(items, participants, tax_amount, service_fee, policy),
        SplitMode::Itemized => {
            itemized_shares(items, participants, tax_amount, service_fee, policy)
        }
        SplitMode::DivideEvenly => {
            let everyone: Vec<Participant> = participants
                .iter()
                .map(|p| Participant {
                    items_assigned: items.iter().map(|item| item.id.clone()).collect(),
                    ..p.clone()
                })
                .collect();
            itemized_shares(items, &everyone, tax_amount, service_fee, policy)
        }
    }
}

/// Number of participants assigned to each item, floored at 1.
pub fn selection_counts(items: &[Item], participants: &[Participant]) -> BTreeMap<String, i64> {
    items
        .iter()
        .map(|item| {
            let assigned = participants.iter().filter(|p| p.is_assigned(&item.id)).count() as i64;
            (item.id.clone(), assigned.max(1))
        })
        .collect()
}

/// `total / count` with floor division; 0 when there is nobody to split between.
pub fn even_split(total: Money, count: usize) -> Money {
    if count == 0 {
        return 0;
    }
    total.div_euclid(count as Money)
}

/// Sum of item totals, saturating at `Money::MAX`.
///
/// Validated bills never reach the bound; see `BillPayload::checked_totals`.
pub fn subtotal_of(items: &[Item]) -> Money {
    items
        .iter()
        .fold(0 as Money, |sum, item| sum.saturating_add(item.total_price))
}

fn even_shares(
    items: &[Item],
    participants: &[Participant],
    tax_amount: Money,
    service_fee: Money,
    policy: &AllocationPolicy,
) -> Shares {
    let count = participants.len();
    if count == 0 {
        return Shares::new();
    }

    let total_amount = subtotal_of(items)
        .saturating_add(tax_amount)
        .saturating_add(service_fee);
    let per_head = even_split(total_amount, count);
    let tax_share = even_split(tax_amount, count);
    let fee_share = even_split(service_fee, count);
    let base = Share::new(per_head - tax_share - fee_share, tax_share, fee_share);

    let mut shares: Shares = participants
        .iter()
        .map(|p| (p.id.clone(), base))
        .collect();

    let remainder = total_amount - per_head * count as Money;
    if remainder > 0 && policy.remainder == RemainderPolicy::AssignToCreator {
        match participants.iter().find(|p| p.is_creator) {
            Some(creator) => {
                if let Some(share) = shares.get_mut(&creator.id) {
                    *share = Share::new(
                        share.subtotal_share + remainder,
                        share.tax_share,
                        share.service_fee_share,
                    );
                }
            }
            None => debug!("No creator to take even-split remainder {}", remainder),
        }
    }

    shares
}

fn itemized_shares(
    items: &[Item],
    participants: &[Participant],
    tax_amount: Money,
    service_fee: Money,
    policy: &AllocationPolicy,
) -> Shares {
    let counts = selection_counts(items, participants);
    let event_subtotal = subtotal_of(items);
    let head_count = participants.len();

    participants
        .iter()
        .map(|p| {
            let subtotal_share: Money = items
                .iter()
                .filter(|item| p.is_assigned(&item.id))
                .map(|item| {
                    let count = counts.get(&item.id).copied().unwrap_or(1);
                    item.total_price.div_euclid(count)
                })
                .sum();

            let (tax_share, fee_share) = match policy.proration {
                ProrationPolicy::Proportional => (
                    prorate(subtotal_share, tax_amount, event_subtotal),
                    prorate(subtotal_share, service_fee, event_subtotal),
                ),
                ProrationPolicy::Equal => (
                    even_split(tax_amount, head_count),
                    even_split(service_fee, head_count),
                ),
            };

            (p.id.clone(), Share::new(subtotal_share, tax_share, fee_share))
        })
        .collect()
}

/// `floor(part * amount / whole)` in exact integer arithmetic.
fn prorate(part: Money, amount: Money, whole: Money) -> Money {
    if whole == 0 {
        return 0;
    }
    let scaled = (part as i128 * amount as i128).div_euclid(whole as i128);
    scaled as Money
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_a() -> (Vec<Item>, Vec<Participant>) {
        let items = vec![Item::new("A", "Ayam", 2, 1000), Item::new("B", "Bakso", 1, 500)];
        let participants = vec![
            Participant::new("P1", "Ayu").with_items(["A", "B"]),
            Participant::new("P2", "Budi").with_items(["A"]),
        ];
        (items, participants)
    }

    #[test]
    fn test_itemized_proportional_scenario() {
        let (items, participants) = scenario_a();
        let shares = compute_shares(
            &items,
            &participants,
            SplitMode::Itemized,
            250,
            250,
            &AllocationPolicy::default(),
        );

        assert_eq!(
            shares["P1"],
            Share {
                subtotal_share: 1500,
                tax_share: 150,
                service_fee_share: 150,
                total: 1800
            }
        );
        assert_eq!(
            shares["P2"],
            Share {
                subtotal_share: 1000,
                tax_share: 100,
                service_fee_share: 100,
                total: 1200
            }
        );
        assert_eq!(shares.values().map(|s| s.total).sum::<Money>(), 3000);
    }

    #[test]
    fn test_selection_counts_floor_at_one() {
        let (mut items, participants) = scenario_a();
        items.push(Item::new("C", "Cendol", 1, 300));

        let counts = selection_counts(&items, &participants);
        assert_eq!(counts["A"], 2);
        assert_eq!(counts["B"], 1);
        assert_eq!(counts["C"], 1);
    }

    #[test]
    fn test_unassigned_item_cost_is_unclaimed() {
        let items = vec![Item::new("A", "Ayam", 1, 1000), Item::new("C", "Cendol", 1, 1000)];
        let participants = vec![Participant::new("P1", "Ayu").with_items(["A"])];

        let shares = compute_shares(
            &items,
            &participants,
            SplitMode::Itemized,
            200,
            0,
            &AllocationPolicy::default(),
        );
        assert_eq!(shares["P1"].subtotal_share, 1000);
        assert_eq!(shares["P1"].tax_share, 100);
        assert_eq!(shares["P1"].total, 1100);
    }

    #[test]
    fn test_even_split_drops_remainder() {
        let items = vec![Item::new("A", "Ayam", 1, 2500)];
        let participants: Vec<Participant> = (0..7)
            .map(|i| Participant::new(format!("P{}", i), format!("Guest {}", i)))
            .collect();

        let shares = compute_shares(
            &items,
            &participants,
            SplitMode::Even,
            250,
            250,
            &AllocationPolicy::default(),
        );

        assert!(shares.values().all(|s| s.total == 428));
        assert_eq!(shares.values().map(|s| s.total).sum::<Money>(), 2996);
    }

    #[test]
    fn test_even_split_remainder_to_creator() {
        let items = vec![Item::new("A", "Ayam", 1, 3000)];
        let mut participants: Vec<Participant> = (1..7)
            .map(|i| Participant::new(format!("P{}", i), format!("Guest {}", i)))
            .collect();
        participants.push(Participant::new("C", "Host").as_creator());

        let policy = AllocationPolicy {
            remainder: RemainderPolicy::AssignToCreator,
            ..Default::default()
        };
        let shares = compute_shares(&items, &participants, SplitMode::Even, 0, 0, &policy);

        assert_eq!(shares["C"].total, 432);
        assert_eq!(shares["P1"].total, 428);
        assert_eq!(shares.values().map(|s| s.total).sum::<Money>(), 3000);
    }

    #[test]
    fn test_even_split_breakdown_adds_up() {
        let items = vec![Item::new("A", "Ayam", 1, 1000)];
        let participants = vec![Participant::new("P1", "Ayu"), Participant::new("P2", "Budi")];

        let shares = compute_shares(
            &items,
            &participants,
            SplitMode::Even,
            101,
            51,
            &AllocationPolicy::default(),
        );
        let share = shares["P1"];
        assert_eq!(share.total, 576);
        assert_eq!(share.tax_share, 50);
        assert_eq!(share.service_fee_share, 25);
        assert_eq!(
            share.subtotal_share + share.tax_share + share.service_fee_share,
            share.total
        );
    }

    #[test]
    fn test_even_split_without_participants() {
        let shares = compute_shares(
            &[Item::new("A", "Ayam", 1, 1000)],
            &[],
            SplitMode::Even,
            0,
            0,
            &AllocationPolicy::default(),
        );
        assert!(shares.is_empty());
    }

    #[test]
    fn test_divide_evenly_ignores_assignments() {
        let (items, participants) = scenario_a();
        let shares = compute_shares(
            &items,
            &participants,
            SplitMode::DivideEvenly,
            250,
            250,
            &AllocationPolicy::default(),
        );

        assert_eq!(shares["P1"].subtotal_share, 1250);
        assert_eq!(shares["P2"].subtotal_share, 1250);
        assert_eq!(shares["P1"].total, 1500);
        assert_eq!(shares["P2"].total, 1500);
    }

    #[test]
    fn test_equal_proration_ignores_subtotal() {
        let (items, participants) = scenario_a();
        let policy = AllocationPolicy {
            proration: ProrationPolicy::Equal,
            ..Default::default()
        };
        let shares = compute_shares(&items, &participants, SplitMode::Itemized, 250, 250, &policy);

        assert_eq!(shares["P1"].tax_share, 125);
        assert_eq!(shares["P2"].tax_share, 125);
        assert_eq!(shares["P1"].total, 1750);
        assert_eq!(shares["P2"].total, 1250);
    }

    #[test]
    fn test_zero_subtotal_prorates_nothing() {
        let items = vec![Item::new("A", "Air Putih", 1, 0)];
        let participants = vec![Participant::new("P1", "Ayu").with_items(["A"])];

        let shares = compute_shares(
            &items,
            &participants,
            SplitMode::Itemized,
            100,
            100,
            &AllocationPolicy::default(),
        );
        assert_eq!(shares["P1"], Share::default());
    }

    #[test]
    fn test_itemized_is_deterministic() {
        let (items, participants) = scenario_a();
        let policy = AllocationPolicy::default();
        let first = compute_shares(&items, &participants, SplitMode::Itemized, 250, 250, &policy);
        let second = compute_shares(&items, &participants, SplitMode::Itemized, 250, 250, &policy);

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn test_even_split_helper() {
        assert_eq!(even_split(3000, 7), 428);
        assert_eq!(even_split(3000, 0), 0);
    }
}
