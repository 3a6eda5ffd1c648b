//! Records produced by a clear
//!
//! A `MatchedPair` exists only between the book's clear and the pricing
//! rule; a `PricedMatch` is what the market turns into a transaction.

use serde::{Deserialize, Serialize};
use types::numeric::{Price, Quantity};
use types::order::Order;

/// A buy and a sell paired by a clear.
///
/// The orders are copies taken at match time, so their `quantity` is the
/// remaining quantity before this clear was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub buy: Order,
    pub sell: Order,
    pub quantity: Quantity,
}

impl MatchedPair {
    /// The order that reached the book first
    pub fn earlier(&self) -> &Order {
        if self.buy.arrival() <= self.sell.arrival() {
            &self.buy
        } else {
            &self.sell
        }
    }
}

/// A matched pair with its transaction price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedMatch {
    pub pair: MatchedPair,
    pub price: Price,
}
