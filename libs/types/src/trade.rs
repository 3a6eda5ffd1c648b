//! Transaction records
//!
//! A transaction is appended to its market's history when a clear prices a
//! matched pair. It is never mutated or deleted afterwards.

use crate::ids::{MarketId, OrderId};
use crate::numeric::{Price, Quantity};
use crate::time::TimeStamp;
use serde::{Deserialize, Serialize};

/// One priced execution between a buy and a sell order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub market: MarketId,
    pub price: Price,
    pub quantity: Quantity,
    pub executed_at: TimeStamp,
    pub buy_order: OrderId,
    pub sell_order: OrderId,
}

impl Transaction {
    /// Cash value exchanged
    pub fn notional(&self) -> i64 {
        self.price.notional(self.quantity)
    }
}
