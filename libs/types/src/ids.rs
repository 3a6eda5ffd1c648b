//! Identifier types for simulation entities
//!
//! All ids are dense `u64` counters handed out by an [`IdSource`] owned by
//! one simulation run. Nothing is process-global, so two runs built from the
//! same inputs hand out the same ids in the same order.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw id value
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Raw id value
            pub const fn value(&self) -> u64 {
                self.0
            }

            /// Position of this id in a densely allocated table
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

sequential_id!(
    /// Handle for an order, stable for the order's whole life
    OrderId,
    "order"
);

sequential_id!(
    /// Identifier for an agent (trading strategy instance)
    AgentId,
    "agent"
);

sequential_id!(
    /// Identifier for a market
    MarketId,
    "market"
);

sequential_id!(
    /// Identifier for one agent's view onto one market
    ViewId,
    "view"
);

/// Per-run source of fresh identifiers.
///
/// Each id kind has its own counter starting at zero, so agent, market and
/// view ids double as indices into the tables that own them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSource {
    next_order: u64,
    next_agent: u64,
    next_market: u64,
    next_view: u64,
}

impl IdSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order);
        self.next_order += 1;
        id
    }

    pub fn next_agent_id(&mut self) -> AgentId {
        let id = AgentId(self.next_agent);
        self.next_agent += 1;
        id
    }

    pub fn next_market_id(&mut self) -> MarketId {
        let id = MarketId(self.next_market);
        self.next_market += 1;
        id
    }

    pub fn next_view_id(&mut self) -> ViewId {
        let id = ViewId(self.next_view);
        self.next_view += 1;
        id
    }

    /// Number of orders handed out so far
    pub fn orders_issued(&self) -> u64 {
        self.next_order
    }
}
