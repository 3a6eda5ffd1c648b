//! Order types
//!
//! An order is immutable once created except for its remaining quantity,
//! which shrinks as it fills or is withdrawn. Identity is the `OrderId`
//! handle, never the value.

use crate::ids::OrderId;
use crate::numeric::{Price, Quantity};
use crate::time::TimeStamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }

    /// +1 for buys, -1 for sells
    pub fn sign(&self) -> i64 {
        match self {
            Side::BUY => 1,
            Side::SELL => -1,
        }
    }

    /// Signed quantity as seen by holdings
    pub fn signed(&self, quantity: Quantity) -> Quantity {
        Quantity::new(self.sign() * quantity.value())
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::BUY => write!(f, "BUY"),
            Side::SELL => write!(f, "SELL"),
        }
    }
}

/// An order resting in (or entering) a book.
///
/// `submitted_at` is the time the order reached the book and `sequence` is
/// the market's strictly increasing arrival counter; together they break
/// price ties deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub price: Price,
    /// Remaining quantity, always positive while the order is in a book
    pub quantity: Quantity,
    pub submitted_at: TimeStamp,
    pub sequence: u64,
}

impl Order {
    pub fn new(
        id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
        submitted_at: TimeStamp,
        sequence: u64,
    ) -> Self {
        Self {
            id,
            side,
            price,
            quantity,
            submitted_at,
            sequence,
        }
    }

    /// Time priority key: earlier time first, then lower sequence
    pub fn arrival(&self) -> (TimeStamp, u64) {
        (self.submitted_at, self.sequence)
    }
}
