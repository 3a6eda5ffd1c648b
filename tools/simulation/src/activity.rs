//! Scheduled activities and agent notices
//!
//! Everything the scheduler runs is an [`Activity`]. Notices travel from a
//! market to an agent, either straight away (immediate views) or wrapped in
//! a `Deliver` activity that fires one latency later.

use serde::{Deserialize, Serialize};
use types::ids::{AgentId, MarketId, OrderId, ViewId};
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::quote::Quote;
use types::trade::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activity {
    /// Hand control to an agent
    Wake { agent: AgentId },
    /// A latent submission reaches the book
    SubmitArrival { view: ViewId, order: OrderId },
    /// A latent withdrawal reaches the book
    WithdrawArrival {
        view: ViewId,
        order: OrderId,
        quantity: Quantity,
    },
    /// Periodic call-market clear
    Clear { market: MarketId },
    /// A notice reaches a latent view
    Deliver { view: ViewId, notice: Notice },
}

/// Something an agent is told about through one of its views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// The order is in the book
    Submitted { order: OrderId },
    Withdrawn { order: OrderId, quantity: Quantity },
    /// One of the agent's own orders traded
    Transacted {
        order: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
    },
    QuoteUpdated { quote: Quote },
    /// Any trade in the market
    Transaction { transaction: Transaction },
}

impl Notice {
    pub fn kind(&self) -> &'static str {
        match self {
            Notice::Submitted { .. } => "submitted",
            Notice::Withdrawn { .. } => "withdrawn",
            Notice::Transacted { .. } => "transacted",
            Notice::QuoteUpdated { .. } => "quote_updated",
            Notice::Transaction { .. } => "transaction",
        }
    }
}
