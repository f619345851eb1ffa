//! Reagent mixtures.
//!
//! A [`Solution`] is the value type that moves between a smokable's
//! reservoir and its wearer. Storage of reservoirs belongs to the host; the
//! core only needs clamped proportional splitting and a cached total.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Volume, saturating_mul};
use crate::id::ReagentId;

/// A mixture of reagents with a cached total volume and an optional
/// capacity.
///
/// Reagents are kept in a `BTreeMap` so iteration (and therefore rounding
/// during [`split`](Solution::split)) is deterministic. With a capacity set,
/// the total never exceeds it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    reagents: BTreeMap<ReagentId, Volume>,
    total: Volume,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    capacity: Option<Volume>,
}

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper for seeding reservoirs.
    pub fn with_reagent(mut self, reagent: impl Into<ReagentId>, quantity: Volume) -> Self {
        self.add_reagent(reagent, quantity);
        self
    }

    /// An empty solution that holds at most `max_volume`.
    pub fn with_capacity(max_volume: Volume) -> Self {
        Self {
            capacity: Some(max_volume.max(Volume::ZERO)),
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> Option<Volume> {
        self.capacity
    }

    /// Room left before the capacity is reached. `None` when unbounded.
    pub fn available_volume(&self) -> Option<Volume> {
        self.capacity.map(|max| (max - self.total).max(Volume::ZERO))
    }

    /// Add a reagent, clamped to the remaining capacity. Returns the
    /// quantity actually added; non-positive quantities add nothing.
    pub fn add_reagent(&mut self, reagent: impl Into<ReagentId>, quantity: Volume) -> Volume {
        let quantity = match self.available_volume() {
            Some(room) => quantity.min(room),
            None => quantity,
        };
        if quantity <= Volume::ZERO {
            return Volume::ZERO;
        }
        *self.reagents.entry(reagent.into()).or_insert(Volume::ZERO) += quantity;
        self.total += quantity;
        quantity
    }

    /// Quantity of a single reagent, zero if absent.
    pub fn quantity(&self, reagent: &ReagentId) -> Volume {
        self.reagents.get(reagent).copied().unwrap_or(Volume::ZERO)
    }

    pub fn total_volume(&self) -> Volume {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == Volume::ZERO
    }

    /// Iterate reagents in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ReagentId, Volume)> {
        self.reagents.iter().map(|(id, qty)| (id, *qty))
    }

    /// Number of distinct reagents present.
    pub fn reagent_count(&self) -> usize {
        self.reagents.len()
    }

    /// Move every reagent of `other` into this solution. Returns the volume
    /// that did not fit.
    pub fn merge(&mut self, other: Solution) -> Volume {
        other
            .reagents
            .into_iter()
            .fold(Volume::ZERO, |overflow, (reagent, quantity)| {
                overflow + (quantity - self.add_reagent(reagent, quantity))
            })
    }

    /// Multiply every quantity by `factor`. A non-positive factor empties
    /// the solution. Growth past the capacity is cut off in reagent order.
    pub fn scale(&mut self, factor: Fixed64) {
        let reagents = std::mem::take(&mut self.reagents);
        self.total = Volume::ZERO;
        if factor <= Fixed64::ZERO {
            return;
        }
        for (reagent, quantity) in reagents {
            self.add_reagent(reagent, saturating_mul(quantity, factor));
        }
    }

    /// Withdraw `amount` proportionally across reagents.
    ///
    /// The withdrawal is clamped: asking for more than is present takes
    /// everything and leaves the total at exactly zero. Non-positive amounts
    /// take nothing.
    pub fn split(&mut self, amount: Volume) -> Solution {
        if amount <= Volume::ZERO || self.is_empty() {
            return Solution::new();
        }
        if amount >= self.total {
            // Capacity stays with the reservoir.
            let total = std::mem::replace(&mut self.total, Volume::ZERO);
            return Solution {
                reagents: std::mem::take(&mut self.reagents),
                total,
                capacity: None,
            };
        }

        let total = self.total;
        let mut outstanding = amount;
        let mut taken = Solution::new();

        for (reagent, quantity) in self.reagents.iter_mut() {
            // quantity * amount / total, dividing first once the product
            // no longer fits.
            let share = match quantity.checked_mul(amount) {
                Some(product) => product / total,
                None => saturating_mul(*quantity, amount / total),
            }
            .min(*quantity)
            .min(outstanding);

            *quantity -= share;
            outstanding -= share;
            taken.add_reagent(reagent.clone(), share);
        }

        // Rounding remainder goes to the first reagents with room left.
        // amount < total, so it is always absorbed.
        for (reagent, quantity) in self.reagents.iter_mut() {
            if outstanding == Volume::ZERO {
                break;
            }
            let share = (*quantity).min(outstanding);
            *quantity -= share;
            outstanding -= share;
            taken.add_reagent(reagent.clone(), share);
        }

        self.reagents.retain(|_, quantity| *quantity > Volume::ZERO);
        self.total -= taken.total;
        taken
    }
}
