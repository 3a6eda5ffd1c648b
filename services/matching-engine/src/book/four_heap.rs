//! Four-heap order book
//!
//! Holds every resting order in exactly one of four sets: matched buys,
//! matched sells, unmatched buys, unmatched sells. After every insert and
//! remove the matched sets hold the maximal mutually profitable match, so a
//! clear only has to pair them off.
//!
//! Entries are whole orders. When the matched quantities differ, the surplus
//! is carried by the worst matched order on the heavier side and is split
//! off only when the book clears.

use std::collections::{BTreeSet, HashMap};
use types::errors::EngineError;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

use super::priority::{HeapSide, Priority};
use crate::events::MatchedPair;
use crate::matching::crossing::{can_match, incoming_can_match};

#[derive(Debug, Clone, Copy)]
struct Resting {
    order: Order,
    matched: bool,
}

/// Order ids per set, in priority order (best first)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookSnapshot {
    pub matched_buys: Vec<OrderId>,
    pub matched_sells: Vec<OrderId>,
    pub unmatched_buys: Vec<OrderId>,
    pub unmatched_sells: Vec<OrderId>,
}

/// Four-heap book for one market
#[derive(Debug, Clone)]
pub struct FourHeap {
    orders: HashMap<OrderId, Resting>,
    buys: HeapSide,
    sells: HeapSide,
    buy_depth: Quantity,
    sell_depth: Quantity,
}

impl Default for FourHeap {
    fn default() -> Self {
        Self::new()
    }
}

/// Split the two sides into (`side`, opposite of `side`)
fn pick<'a>(
    buys: &'a mut HeapSide,
    sells: &'a mut HeapSide,
    side: Side,
) -> (&'a mut HeapSide, &'a mut HeapSide) {
    match side {
        Side::BUY => (buys, sells),
        Side::SELL => (sells, buys),
    }
}

fn invariant(reason: impl Into<String>) -> EngineError {
    EngineError::InvariantViolation { reason: reason.into() }
}

fn quantity_of(orders: &HashMap<OrderId, Resting>, key: &Priority) -> Result<Quantity, EngineError> {
    orders
        .get(&key.id)
        .map(|resting| resting.order.quantity)
        .ok_or_else(|| invariant(format!("{} is indexed but not stored", key.id)))
}

fn mark(orders: &mut HashMap<OrderId, Resting>, id: OrderId, matched: bool) {
    if let Some(resting) = orders.get_mut(&id) {
        resting.matched = matched;
    }
}

impl FourHeap {
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
            buys: HeapSide::new(Side::BUY),
            sells: HeapSide::new(Side::SELL),
            buy_depth: Quantity::ZERO,
            sell_depth: Quantity::ZERO,
        }
    }

    /// Number of resting orders
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.orders.contains_key(&id)
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id).map(|resting| &resting.order)
    }

    /// `Some(true)` if the order is currently matched
    pub fn is_matched(&self, id: OrderId) -> Option<bool> {
        self.orders.get(&id).map(|resting| resting.matched)
    }

    pub fn heap_side(&self, side: Side) -> &HeapSide {
        match side {
            Side::BUY => &self.buys,
            Side::SELL => &self.sells,
        }
    }

    /// Total remaining quantity resting on one side
    pub fn depth(&self, side: Side) -> Quantity {
        match side {
            Side::BUY => self.buy_depth,
            Side::SELL => self.sell_depth,
        }
    }

    fn depth_mut(&mut self, side: Side) -> &mut Quantity {
        match side {
            Side::BUY => &mut self.buy_depth,
            Side::SELL => &mut self.sell_depth,
        }
    }

    /// Insert a new order and restore the maximal match.
    ///
    /// The order joins the matched set on its side when it outranks the
    /// worst matched order there, or when it crosses an order on the other
    /// side that is available to match.
    pub fn insert(&mut self, order: Order) -> Result<(), EngineError> {
        if !order.quantity.is_positive() {
            return Err(EngineError::InvalidQuantity {
                order_id: order.id,
                quantity: order.quantity,
            });
        }
        if self.orders.contains_key(&order.id) {
            return Err(EngineError::DuplicateOrder { order_id: order.id });
        }

        let key = Priority::of(&order);
        let side = order.side;
        let (this, other) = pick(&mut self.buys, &mut self.sells, side);

        let joins_matched = this.worst_matched().is_some_and(|worst| key < worst)
            || (this.matched_quantity == other.matched_quantity
                && other
                    .best_unmatched()
                    .is_some_and(|best| incoming_can_match(side, key.price, best.price)))
            || (other.matched_quantity > this.matched_quantity
                && other
                    .worst_matched()
                    .is_some_and(|worst| incoming_can_match(side, key.price, worst.price)));

        if joins_matched {
            this.matched.insert(key);
            this.matched_quantity += order.quantity;
        } else {
            this.unmatched.insert(key);
        }

        self.orders.insert(order.id, Resting { order, matched: joins_matched });
        *self.depth_mut(side) += order.quantity;

        if joins_matched {
            self.restore(side)?;
        }
        debug_assert!(self.invariants_hold(), "four-heap invariants broken by insert");
        Ok(())
    }

    /// Remove up to `quantity` from an order.
    ///
    /// Returns the quantity actually removed, which is clamped to what
    /// remains. An order that reaches zero leaves the book.
    pub fn remove(&mut self, id: OrderId, quantity: Quantity) -> Result<Quantity, EngineError> {
        if !quantity.is_positive() {
            return Err(EngineError::InvalidQuantity { order_id: id, quantity });
        }
        let resting = self
            .orders
            .get_mut(&id)
            .ok_or(EngineError::OrderNotFound { order_id: id })?;

        let removed = quantity.min(resting.order.quantity);
        resting.order.quantity -= removed;
        let emptied = resting.order.quantity.is_zero();
        let matched = resting.matched;
        let side = resting.order.side;
        let key = Priority::of(&resting.order);

        let (this, _) = pick(&mut self.buys, &mut self.sells, side);
        if matched {
            this.matched_quantity -= removed;
            if emptied {
                this.matched.remove(&key);
            }
        } else if emptied {
            this.unmatched.remove(&key);
        }
        if emptied {
            self.orders.remove(&id);
        }
        *self.depth_mut(side) -= removed;

        // Losing matched quantity on this side can leave the other side heavy
        if matched {
            self.restore(side.opposite())?;
        }
        debug_assert!(self.invariants_hold(), "four-heap invariants broken by remove");
        Ok(removed)
    }

    /// Move orders between matched and unmatched until `heavy_side` no
    /// longer carries more matched quantity than it can justify.
    fn restore(&mut self, heavy_side: Side) -> Result<(), EngineError> {
        loop {
            let (heavy, light) = pick(&mut self.buys, &mut self.sells, heavy_side);
            if heavy.matched_quantity <= light.matched_quantity {
                return Ok(());
            }
            let worst = heavy
                .worst_matched()
                .ok_or_else(|| invariant("matched quantity without matched orders"))?;

            let promotable = light
                .best_unmatched()
                .filter(|best| incoming_can_match(heavy_side, worst.price, best.price));
            if let Some(best) = promotable {
                let quantity = quantity_of(&self.orders, &best)?;
                light.promote(best, quantity);
                mark(&mut self.orders, best.id, true);
                continue;
            }

            let worst_quantity = quantity_of(&self.orders, &worst)?;
            if heavy.matched_quantity - worst_quantity >= light.matched_quantity {
                heavy.demote(worst, worst_quantity);
                mark(&mut self.orders, worst.id, false);
            } else {
                return Ok(());
            }
        }
    }

    /// Pair off the matched sets.
    ///
    /// The worst matched order on the heavier side is split first, so the
    /// paired quantities balance exactly; its residual keeps its handle,
    /// price and time and drops to the unmatched set. Pairs are produced
    /// from the worst matched priority inward. Afterwards both matched sets
    /// are empty.
    pub fn clear(&mut self) -> Result<Vec<MatchedPair>, EngineError> {
        if self.buys.matched.is_empty() || self.sells.matched.is_empty() {
            return Ok(Vec::new());
        }

        let mut buys = self.clearable(Side::BUY)?;
        let mut sells = self.clearable(Side::SELL)?;
        let surplus = self.buys.matched_quantity - self.sells.matched_quantity;
        if surplus.is_positive() {
            buys[0].1 -= surplus;
        } else if (-surplus).is_positive() {
            sells[0].1 -= -surplus;
        }

        let mut pairs = Vec::with_capacity(buys.len().max(sells.len()));
        let (mut i, mut j) = (0, 0);
        while i < buys.len() && j < sells.len() {
            let quantity = buys[i].1.min(sells[j].1);
            if quantity.is_positive() {
                pairs.push(MatchedPair {
                    buy: buys[i].0,
                    sell: sells[j].0,
                    quantity,
                });
            }
            buys[i].1 -= quantity;
            sells[j].1 -= quantity;
            if !buys[i].1.is_positive() {
                i += 1;
            }
            if !sells[j].1.is_positive() {
                j += 1;
            }
        }

        for pair in &pairs {
            self.fill(pair.buy.id, pair.quantity)?;
            self.fill(pair.sell.id, pair.quantity)?;
        }

        for side in [Side::BUY, Side::SELL] {
            let heap = match side {
                Side::BUY => &mut self.buys,
                Side::SELL => &mut self.sells,
            };
            let matched = std::mem::take(&mut heap.matched);
            heap.matched_quantity = Quantity::ZERO;
            for key in matched {
                let residual = self
                    .orders
                    .get(&key.id)
                    .is_some_and(|resting| resting.order.quantity.is_positive());
                if residual {
                    mark(&mut self.orders, key.id, false);
                    heap.unmatched.insert(key);
                } else {
                    self.orders.remove(&key.id);
                }
            }
        }

        debug_assert!(self.invariants_hold(), "four-heap invariants broken by clear");
        Ok(pairs)
    }

    /// Matched orders on one side, worst first, with their clearable quantity
    fn clearable(&self, side: Side) -> Result<Vec<(Order, Quantity)>, EngineError> {
        self.heap_side(side)
            .matched_worst_first()
            .map(|key| {
                self.orders
                    .get(&key.id)
                    .map(|resting| (resting.order, resting.order.quantity))
                    .ok_or_else(|| invariant(format!("{} is indexed but not stored", key.id)))
            })
            .collect()
    }

    fn fill(&mut self, id: OrderId, quantity: Quantity) -> Result<(), EngineError> {
        let resting = self
            .orders
            .get_mut(&id)
            .ok_or(EngineError::OrderNotFound { order_id: id })?;
        resting.order.quantity -= quantity;
        let side = resting.order.side;
        *self.depth_mut(side) -= quantity;
        Ok(())
    }

    /// Highest price at which a new sell is guaranteed to match
    pub fn bid_quote(&self) -> Option<Price> {
        let surplus = (self.buys.matched_quantity > self.sells.matched_quantity)
            .then(|| self.buys.worst_matched())
            .flatten();
        [self.sells.worst_matched(), self.buys.best_unmatched(), surplus]
            .into_iter()
            .flatten()
            .map(|key| key.price)
            .max()
    }

    /// Lowest price at which a new buy is guaranteed to match
    pub fn ask_quote(&self) -> Option<Price> {
        let surplus = (self.sells.matched_quantity > self.buys.matched_quantity)
            .then(|| self.sells.worst_matched())
            .flatten();
        [self.buys.worst_matched(), self.sells.best_unmatched(), surplus]
            .into_iter()
            .flatten()
            .map(|key| key.price)
            .min()
    }

    pub fn snapshot(&self) -> BookSnapshot {
        let ids = |set: &BTreeSet<Priority>| -> Vec<OrderId> { set.iter().map(|key| key.id).collect() };
        BookSnapshot {
            matched_buys: ids(&self.buys.matched),
            matched_sells: ids(&self.sells.matched),
            unmatched_buys: ids(&self.buys.unmatched),
            unmatched_sells: ids(&self.sells.unmatched),
        }
    }

    pub fn invariants_hold(&self) -> bool {
        self.check_invariants().is_ok()
    }

    /// Verify every structural invariant of the book
    pub fn check_invariants(&self) -> Result<(), EngineError> {
        let mut indexed = 0;
        for heap in [&self.buys, &self.sells] {
            let mut matched_total = Quantity::ZERO;
            let mut depth = Quantity::ZERO;
            for (set, matched) in [(&heap.matched, true), (&heap.unmatched, false)] {
                for key in set {
                    let resting = self
                        .orders
                        .get(&key.id)
                        .ok_or_else(|| invariant(format!("{} is indexed but not stored", key.id)))?;
                    if resting.order.side != heap.side() || resting.matched != matched {
                        return Err(invariant(format!("{} is filed in the wrong set", key.id)));
                    }
                    if !resting.order.quantity.is_positive() {
                        return Err(invariant(format!("{} has no remaining quantity", key.id)));
                    }
                    if matched {
                        matched_total += resting.order.quantity;
                    }
                    depth += resting.order.quantity;
                    indexed += 1;
                }
            }
            if matched_total != heap.matched_quantity {
                return Err(invariant("matched quantity out of sync"));
            }
            if depth != self.depth(heap.side()) {
                return Err(invariant("depth out of sync"));
            }
            if let (Some(worst), Some(best)) = (heap.worst_matched(), heap.best_unmatched()) {
                if best < worst {
                    return Err(invariant("an unmatched order outranks a matched one"));
                }
            }
        }
        if indexed != self.orders.len() {
            return Err(invariant("stored orders missing from every set"));
        }
        if self.buys.matched.is_empty() != self.sells.matched.is_empty() {
            return Err(invariant("one matched set is empty and the other is not"));
        }
        if let (Some(buy), Some(sell)) = (self.buys.worst_matched(), self.sells.worst_matched()) {
            if !can_match(buy.price, sell.price) {
                return Err(invariant("matched buy below matched sell"));
            }
        }
        if let (Some(buy), Some(sell)) = (self.buys.best_unmatched(), self.sells.best_unmatched()) {
            if can_match(buy.price, sell.price) {
                return Err(invariant("unmatched buy crosses unmatched sell"));
            }
        }

        let (heavy, light) = if self.buys.matched_quantity >= self.sells.matched_quantity {
            (&self.buys, &self.sells)
        } else {
            (&self.sells, &self.buys)
        };
        let surplus = heavy.matched_quantity - light.matched_quantity;
        if surplus.is_positive() {
            let worst = heavy
                .worst_matched()
                .ok_or_else(|| invariant("matched quantity without matched orders"))?;
            if surplus >= quantity_of(&self.orders, &worst)? {
                return Err(invariant("surplus exceeds the worst matched order"));
            }
            if let Some(best) = light.best_unmatched() {
                if incoming_can_match(heavy.side(), worst.price, best.price) {
                    return Err(invariant("surplus could match an unmatched order"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::time::TimeStamp;

    /// Build orders with increasing sequence numbers
    struct Feed {
        next: u64,
    }

    impl Feed {
        fn new() -> Self {
            Self { next: 0 }
        }

        fn order(&mut self, side: Side, price: i64, quantity: i64) -> Order {
            let sequence = self.next;
            self.next += 1;
            Order::new(
                OrderId::new(sequence),
                side,
                Price::new(price),
                Quantity::new(quantity),
                TimeStamp::new(sequence as i64),
                sequence,
            )
        }
    }

    #[test]
    fn test_simple_cross_clears_one_pair() {
        let mut book = FourHeap::new();
        let mut feed = Feed::new();
        let buy = feed.order(Side::BUY, 100, 1);
        let sell = feed.order(Side::SELL, 90, 1);
        book.insert(buy).unwrap();
        book.insert(sell).unwrap();

        assert_eq!(book.is_matched(buy.id), Some(true));
        assert_eq!(book.is_matched(sell.id), Some(true));

        let pairs = book.clear().unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].buy.id, buy.id);
        assert_eq!(pairs[0].sell.id, sell.id);
        assert_eq!(pairs[0].quantity, Quantity::new(1));
        assert!(book.is_empty());
    }

    #[test]
    fn test_no_cross_stays_unmatched() {
        let mut book = FourHeap::new();
        let mut feed = Feed::new();
        book.insert(feed.order(Side::BUY, 90, 1)).unwrap();
        book.insert(feed.order(Side::SELL, 100, 1)).unwrap();

        assert_eq!(book.bid_quote(), Some(Price::new(90)));
        assert_eq!(book.ask_quote(), Some(Price::new(100)));
        assert!(book.clear().unwrap().is_empty());
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_partial_fill_splits_worst_buy() {
        let mut book = FourHeap::new();
        let mut feed = Feed::new();
        let buy = feed.order(Side::BUY, 100, 3);
        let sell = feed.order(Side::SELL, 90, 2);
        book.insert(buy).unwrap();
        book.insert(sell).unwrap();

        // Whole buy is matched and carries one unit of surplus
        assert_eq!(book.heap_side(Side::BUY).matched_quantity(), Quantity::new(3));
        assert_eq!(book.heap_side(Side::SELL).matched_quantity(), Quantity::new(2));

        let pairs = book.clear().unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].quantity, Quantity::new(2));

        // Residual keeps its handle and drops to unmatched
        assert_eq!(book.get(buy.id).map(|o| o.quantity), Some(Quantity::new(1)));
        assert_eq!(book.is_matched(buy.id), Some(false));
        assert!(!book.contains(sell.id));
        assert_eq!(book.bid_quote(), Some(Price::new(100)));
        assert_eq!(book.ask_quote(), None);
    }

    #[test]
    fn test_clear_twice_is_idempotent() {
        let mut book = FourHeap::new();
        let mut feed = Feed::new();
        book.insert(feed.order(Side::BUY, 105, 4)).unwrap();
        book.insert(feed.order(Side::SELL, 95, 3)).unwrap();
        book.insert(feed.order(Side::SELL, 101, 2)).unwrap();

        assert!(!book.clear().unwrap().is_empty());
        assert!(book.clear().unwrap().is_empty());
        assert_eq!(book.heap_side(Side::BUY).matched_quantity(), Quantity::ZERO);
        assert_eq!(book.heap_side(Side::SELL).matched_quantity(), Quantity::ZERO);
    }

    #[test]
    fn test_pairs_run_from_worst_inward() {
        let mut book = FourHeap::new();
        let mut feed = Feed::new();
        let b_high = feed.order(Side::BUY, 110, 1);
        let b_low = feed.order(Side::BUY, 104, 1);
        let s_low = feed.order(Side::SELL, 100, 1);
        let s_high = feed.order(Side::SELL, 103, 1);
        for order in [b_high, b_low, s_low, s_high] {
            book.insert(order).unwrap();
        }

        let pairs = book.clear().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[0].buy.id, pairs[0].sell.id), (b_low.id, s_high.id));
        assert_eq!((pairs[1].buy.id, pairs[1].sell.id), (b_high.id, s_low.id));
    }

    #[test]
    fn test_better_buy_displaces_worst_matched() {
        let mut book = FourHeap::new();
        let mut feed = Feed::new();
        let sell = feed.order(Side::SELL, 90, 1);
        let first = feed.order(Side::BUY, 100, 1);
        let better = feed.order(Side::BUY, 105, 1);
        book.insert(sell).unwrap();
        book.insert(first).unwrap();
        book.insert(better).unwrap();

        let snap = book.snapshot();
        assert_eq!(snap.matched_buys, vec![better.id]);
        assert_eq!(snap.unmatched_buys, vec![first.id]);
        assert_eq!(book.bid_quote(), Some(Price::new(100)));
        assert_eq!(book.ask_quote(), Some(Price::new(105)));
    }

    #[test]
    fn test_withdraw_matched_promotes_next_buy() {
        let mut book = FourHeap::new();
        let mut feed = Feed::new();
        let sell = feed.order(Side::SELL, 90, 1);
        let best = feed.order(Side::BUY, 100, 1);
        let next = feed.order(Side::BUY, 95, 1);
        book.insert(sell).unwrap();
        book.insert(best).unwrap();
        book.insert(next).unwrap();
        assert_eq!(book.is_matched(next.id), Some(false));

        assert_eq!(book.remove(best.id, Quantity::new(1)).unwrap(), Quantity::new(1));
        assert_eq!(book.snapshot().matched_buys, vec![next.id]);
        assert_eq!(book.snapshot().matched_sells, vec![sell.id]);
    }

    #[test]
    fn test_equal_price_earlier_order_has_priority() {
        let mut book = FourHeap::new();
        let mut feed = Feed::new();
        let early = feed.order(Side::BUY, 100, 1);
        let late = feed.order(Side::BUY, 100, 1);
        let sell = feed.order(Side::SELL, 100, 1);
        book.insert(early).unwrap();
        book.insert(late).unwrap();
        book.insert(sell).unwrap();

        assert_eq!(book.snapshot().matched_buys, vec![early.id]);
        assert_eq!(book.snapshot().unmatched_buys, vec![late.id]);
    }

    #[test]
    fn test_insert_then_withdraw_restores_book() {
        let mut book = FourHeap::new();
        let mut feed = Feed::new();
        book.insert(feed.order(Side::BUY, 100, 5)).unwrap();
        book.insert(feed.order(Side::SELL, 95, 3)).unwrap();
        book.insert(feed.order(Side::SELL, 105, 4)).unwrap();
        book.insert(feed.order(Side::BUY, 90, 2)).unwrap();

        let before = book.snapshot();
        let quotes = (book.bid_quote(), book.ask_quote());
        assert_eq!(quotes, (Some(Price::new(100)), Some(Price::new(100))));

        let extra = feed.order(Side::BUY, 101, 1);
        book.insert(extra).unwrap();
        assert_eq!(book.is_matched(extra.id), Some(true));
        book.remove(extra.id, Quantity::new(1)).unwrap();

        assert_eq!(book.snapshot(), before);
        assert_eq!((book.bid_quote(), book.ask_quote()), quotes);
    }

    #[test]
    fn test_partial_withdraw_clamps() {
        let mut book = FourHeap::new();
        let mut feed = Feed::new();
        let buy = feed.order(Side::BUY, 100, 3);
        book.insert(buy).unwrap();

        assert_eq!(book.remove(buy.id, Quantity::new(1)).unwrap(), Quantity::new(1));
        assert_eq!(book.depth(Side::BUY), Quantity::new(2));
        assert_eq!(book.remove(buy.id, Quantity::new(10)).unwrap(), Quantity::new(2));
        assert!(book.is_empty());
    }

    #[test]
    fn test_remove_unknown_order_fails() {
        let mut book = FourHeap::new();
        let err = book.remove(OrderId::new(42), Quantity::new(1)).unwrap_err();
        assert_eq!(err, EngineError::OrderNotFound { order_id: OrderId::new(42) });
    }

    #[test]
    fn test_rejects_bad_inserts() {
        let mut book = FourHeap::new();
        let mut feed = Feed::new();
        let zero = feed.order(Side::BUY, 100, 0);
        assert!(matches!(book.insert(zero), Err(EngineError::InvalidQuantity { .. })));

        let buy = feed.order(Side::BUY, 100, 1);
        book.insert(buy).unwrap();
        assert_eq!(book.insert(buy), Err(EngineError::DuplicateOrder { order_id: buy.id }));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_self_cross_is_allowed() {
        // The book has no notion of ownership; both orders may come from one agent
        let mut book = FourHeap::new();
        let mut feed = Feed::new();
        book.insert(feed.order(Side::SELL, 50, 2)).unwrap();
        book.insert(feed.order(Side::BUY, 50, 2)).unwrap();
        assert_eq!(book.clear().unwrap().len(), 1);
    }

    #[test]
    fn test_infinite_buy_matches_any_sell() {
        let mut book = FourHeap::new();
        let mut feed = Feed::new();
        book.insert(feed.order(Side::SELL, 1_000_000, 1)).unwrap();
        book.insert(feed.order(Side::BUY, i64::MAX, 1)).unwrap();
        assert_eq!(book.clear().unwrap().len(), 1);
    }
}
