//! Bid/ask quotes
//!
//! A quote is derived from a book and stamped with the time it was computed.
//! Absent sides are `None`, never a sentinel price.

use crate::ids::MarketId;
use crate::numeric::{Price, Quantity};
use crate::time::TimeStamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub market: MarketId,
    pub bid: Option<Price>,
    pub bid_depth: Quantity,
    pub ask: Option<Price>,
    pub ask_depth: Quantity,
    pub quoted_at: TimeStamp,
}

impl Quote {
    /// Quote for a market nobody has seen any book state of yet
    pub fn empty(market: MarketId) -> Self {
        Self {
            market,
            bid: None,
            bid_depth: Quantity::ZERO,
            ask: None,
            ask_depth: Quantity::ZERO,
            quoted_at: TimeStamp::IMMEDIATE,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.bid.is_some() && self.ask.is_some()
    }

    /// Ask minus bid, when both sides exist
    pub fn spread(&self) -> Option<Price> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) if !bid.is_infinite() && !ask.is_infinite() => Some(ask - bid),
            _ => None,
        }
    }

    /// Midpoint of bid and ask in fractional ticks
    pub fn midquote(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) if !bid.is_infinite() && !ask.is_infinite() => {
                Some((bid.as_decimal() + ask.as_decimal()) / Decimal::TWO)
            }
            _ => None,
        }
    }

    /// True if `other` was computed later than this quote
    pub fn is_older_than(&self, other: &Quote) -> bool {
        self.quoted_at < other.quoted_at
    }
}
