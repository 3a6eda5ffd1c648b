//! Error types for the simulator
//!
//! Comprehensive error taxonomy using thiserror

use crate::ids::{AgentId, OrderId, ViewId, MarketId};
use crate::numeric::{Price, Quantity};
use thiserror::Error;

/// Top-level simulation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Market closed: {market}")]
    MarketClosed { market: MarketId },

    #[error("Unknown {kind}: {id}")]
    UnknownEntity { kind: &'static str, id: u64 },

    #[error("Agent {agent} is already executing")]
    AgentBusy { agent: AgentId },

    #[error("Invalid schedule: {reason}")]
    InvalidSchedule { reason: String },

    #[error("Agent failure: {message}")]
    Agent { message: String },
}

/// Construction-time errors, raised before a simulation starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Pricing ratio must be within [0, 1]: {0}")]
    InvalidPricingRatio(String),

    #[error("Latency must be non-negative: {0}")]
    InvalidLatency(i64),

    #[error("Clearing interval must be positive: {0}")]
    InvalidClearInterval(i64),

    #[error("End time must be non-negative: {0}")]
    InvalidEndTime(i64),

    #[error("Invalid agent settings: {reason}")]
    InvalidAgent { reason: String },

    #[error("Unknown market index: {index}")]
    UnknownMarket { index: usize },

    #[error("Invalid fundamental settings: {reason}")]
    InvalidFundamental { reason: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors at the order entry boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Invalid price: {0}")]
    InvalidPrice(Price),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(Quantity),

    #[error("Order not found: {order_id}")]
    NotFound { order_id: OrderId },

    #[error("View {view} is not owned by {agent}")]
    NotOwned { view: ViewId, agent: AgentId },
}

/// Matching engine errors. Apart from bad input these indicate a logic bug.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Order not found in book: {order_id}")]
    OrderNotFound { order_id: OrderId },

    #[error("Order already in book: {order_id}")]
    DuplicateOrder { order_id: OrderId },

    #[error("Invalid quantity {quantity} for {order_id}")]
    InvalidQuantity { order_id: OrderId, quantity: Quantity },

    #[error("Book invariant violated: {reason}")]
    InvariantViolation { reason: String },
}

impl SimError {
    pub fn unknown_market(id: MarketId) -> Self {
        SimError::UnknownEntity { kind: "market", id: id.value() }
    }

    pub fn unknown_view(id: ViewId) -> Self {
        SimError::UnknownEntity { kind: "view", id: id.value() }
    }

    pub fn unknown_agent(id: AgentId) -> Self {
        SimError::UnknownEntity { kind: "agent", id: id.value() }
    }
}
