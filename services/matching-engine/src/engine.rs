//! Matching engine core
//!
//! Couples one four-heap book with the pricing rule of its market and
//! stamps incoming orders with the market's arrival sequence.

use types::errors::{ConfigError, EngineError};
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};
use types::time::TimeStamp;

use crate::book::FourHeap;
use crate::events::PricedMatch;
use crate::matching::PricingRule;

/// Main matching engine for a single market
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    book: FourHeap,
    rule: PricingRule,
    /// Next arrival sequence number
    sequence: u64,
}

impl MatchingEngine {
    /// Create an engine, rejecting an invalid pricing rule
    pub fn new(rule: PricingRule) -> Result<Self, ConfigError> {
        rule.validate()?;
        Ok(Self {
            book: FourHeap::new(),
            rule,
            sequence: 0,
        })
    }

    pub fn rule(&self) -> &PricingRule {
        &self.rule
    }

    pub fn book(&self) -> &FourHeap {
        &self.book
    }

    /// Build an order stamped with `now` and a fresh sequence number, then insert it
    pub fn submit(
        &mut self,
        id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
        now: TimeStamp,
    ) -> Result<Order, EngineError> {
        let order = Order::new(id, side, price, quantity, now, self.sequence);
        self.book.insert(order)?;
        self.sequence += 1;
        Ok(order)
    }

    /// Withdraw up to `quantity`; returns what was actually removed
    pub fn withdraw(&mut self, id: OrderId, quantity: Quantity) -> Result<Quantity, EngineError> {
        self.book.remove(id, quantity)
    }

    /// Clear the book and price the resulting pairs
    pub fn clear(&mut self) -> Result<Vec<PricedMatch>, EngineError> {
        let pairs = self.book.clear()?;
        Ok(self.rule.price(pairs))
    }

    pub fn bid_quote(&self) -> Option<Price> {
        self.book.bid_quote()
    }

    pub fn ask_quote(&self) -> Option<Price> {
        self.book.ask_quote()
    }

    pub fn depth(&self, side: Side) -> Quantity {
        self.book.depth(side)
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.book.contains(id)
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.book.get(id)
    }

    pub fn order_count(&self) -> usize {
        self.book.len()
    }
}
