//! Priority keys and per-side order sets
//!
//! Each side of the book keeps two ordered sets of [`Priority`] keys:
//! orders currently matched and orders resting unmatched. Lower keys have
//! better priority, so the best unmatched order is `first()` and the worst
//! matched order is `last()`.

use std::collections::BTreeSet;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};
use types::time::TimeStamp;

/// Sort key for one resting order.
///
/// Ordered by price rank (negated for buys, so higher bids sort first),
/// then arrival time, then arrival sequence. The sequence is unique per
/// market, so the order is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority {
    rank: i64,
    time: TimeStamp,
    sequence: u64,
    pub id: OrderId,
    pub price: Price,
}

impl Priority {
    pub fn of(order: &Order) -> Self {
        let rank = match order.side {
            Side::BUY => -order.price.ticks(),
            Side::SELL => order.price.ticks(),
        };
        Self {
            rank,
            time: order.submitted_at,
            sequence: order.sequence,
            id: order.id,
            price: order.price,
        }
    }
}

/// Matched and unmatched orders for one side of the book
#[derive(Debug, Clone)]
pub struct HeapSide {
    side: Side,
    pub(crate) matched: BTreeSet<Priority>,
    pub(crate) unmatched: BTreeSet<Priority>,
    /// Total remaining quantity across `matched`
    pub(crate) matched_quantity: Quantity,
}

impl HeapSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            matched: BTreeSet::new(),
            unmatched: BTreeSet::new(),
            matched_quantity: Quantity::ZERO,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Best-priority order not currently matched
    pub fn best_unmatched(&self) -> Option<Priority> {
        self.unmatched.first().copied()
    }

    /// Lowest-priority order currently matched
    pub fn worst_matched(&self) -> Option<Priority> {
        self.matched.last().copied()
    }

    pub fn matched_quantity(&self) -> Quantity {
        self.matched_quantity
    }

    pub fn matched_len(&self) -> usize {
        self.matched.len()
    }

    pub fn unmatched_len(&self) -> usize {
        self.unmatched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matched.is_empty() && self.unmatched.is_empty()
    }

    /// Matched orders from worst to best priority
    pub fn matched_worst_first(&self) -> impl Iterator<Item = &Priority> {
        self.matched.iter().rev()
    }

    pub(crate) fn promote(&mut self, key: Priority, quantity: Quantity) {
        self.unmatched.remove(&key);
        self.matched.insert(key);
        self.matched_quantity += quantity;
    }

    pub(crate) fn demote(&mut self, key: Priority, quantity: Quantity) {
        self.matched.remove(&key);
        self.unmatched.insert(key);
        self.matched_quantity -= quantity;
    }
}
