//! Per-agent market views
//!
//! A view is one agent's window onto one market. It keeps two sets of
//! books: the true holdings and profit, updated the moment a clear happens,
//! and the observed ones the agent can query, updated when the matching
//! notice reaches the view. For an immediate view both move together; a
//! latent view's observed state trails the true state by its latency.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;
use types::errors::{ConfigError, OrderError};
use types::ids::{AgentId, MarketId, OrderId, ViewId};
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::quote::Quote;
use types::time::TimeStamp;

use crate::activity::Notice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewKind {
    Immediate,
    Latent { latency: TimeStamp },
}

/// The agent's own record of an order it submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveOrder {
    pub side: Side,
    pub price: Price,
    /// Quantity the agent believes is still open
    pub quantity: Quantity,
    pub submitted_at: TimeStamp,
    /// Set once the agent has heard the order reached the book
    pub acknowledged: bool,
}

#[derive(Debug, Clone)]
pub struct MarketView {
    id: ViewId,
    agent: AgentId,
    market: MarketId,
    kind: ViewKind,
    active_orders: BTreeMap<OrderId, ActiveOrder>,
    holdings: Quantity,
    profit: i64,
    volume: Quantity,
    observed_holdings: Quantity,
    observed_profit: i64,
    observed_volume: Quantity,
    quote: Quote,
}

impl MarketView {
    pub fn new(id: ViewId, agent: AgentId, market: MarketId, latency: TimeStamp) -> Result<Self, ConfigError> {
        if !latency.is_valid_delay() {
            return Err(ConfigError::InvalidLatency(latency.ticks()));
        }
        let kind = if latency == TimeStamp::ZERO {
            ViewKind::Immediate
        } else {
            ViewKind::Latent { latency }
        };
        Ok(Self {
            id,
            agent,
            market,
            kind,
            active_orders: BTreeMap::new(),
            holdings: Quantity::ZERO,
            profit: 0,
            volume: Quantity::ZERO,
            observed_holdings: Quantity::ZERO,
            observed_profit: 0,
            observed_volume: Quantity::ZERO,
            quote: Quote::empty(market),
        })
    }

    /// Reject orders that must never reach a book
    pub fn check_order(price: Price, quantity: Quantity) -> Result<(), OrderError> {
        if !quantity.is_positive() {
            return Err(OrderError::InvalidQuantity(quantity));
        }
        if price < Price::ZERO {
            return Err(OrderError::InvalidPrice(price));
        }
        Ok(())
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn market(&self) -> MarketId {
        self.market
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn latency(&self) -> TimeStamp {
        match self.kind {
            ViewKind::Immediate => TimeStamp::ZERO,
            ViewKind::Latent { latency } => latency,
        }
    }

    pub fn is_immediate(&self) -> bool {
        self.kind == ViewKind::Immediate
    }

    /// Latest quote the view has seen
    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    pub fn active_orders(&self) -> &BTreeMap<OrderId, ActiveOrder> {
        &self.active_orders
    }

    pub fn active_order(&self, order: OrderId) -> Option<&ActiveOrder> {
        self.active_orders.get(&order)
    }

    /// Observed holdings
    pub fn holdings(&self) -> Quantity {
        self.observed_holdings
    }

    /// Observed cash profit in ticks
    pub fn profit(&self) -> i64 {
        self.observed_profit
    }

    pub fn volume(&self) -> Quantity {
        self.observed_volume
    }

    pub fn true_holdings(&self) -> Quantity {
        self.holdings
    }

    pub fn true_profit(&self) -> i64 {
        self.profit
    }

    pub fn true_volume(&self) -> Quantity {
        self.volume
    }

    pub(crate) fn open_order(&mut self, order: OrderId, side: Side, price: Price, quantity: Quantity, now: TimeStamp) {
        self.active_orders.insert(
            order,
            ActiveOrder {
                side,
                price,
                quantity,
                submitted_at: now,
                acknowledged: false,
            },
        );
    }

    pub(crate) fn forget_order(&mut self, order: OrderId) {
        self.active_orders.remove(&order);
    }

    /// Book a fill against the true position
    pub(crate) fn record_fill(&mut self, side: Side, price: Price, quantity: Quantity) {
        self.holdings += side.signed(quantity);
        self.profit -= side.sign() * price.notional(quantity);
        self.volume += quantity;
    }

    /// Apply a notice to the observed state.
    ///
    /// Returns false when the notice should not be passed on to the agent,
    /// which only happens for a quote older than the one already seen.
    pub(crate) fn observe(&mut self, notice: &Notice) -> bool {
        match *notice {
            Notice::Submitted { order } => {
                if let Some(record) = self.active_orders.get_mut(&order) {
                    record.acknowledged = true;
                }
            }
            Notice::Withdrawn { order, quantity } => self.reduce(order, quantity),
            Notice::Transacted { order, side, price, quantity } => {
                self.reduce(order, quantity);
                self.observed_holdings += side.signed(quantity);
                self.observed_profit -= side.sign() * price.notional(quantity);
                self.observed_volume += quantity;
            }
            Notice::QuoteUpdated { quote } => {
                if quote.is_older_than(&self.quote) {
                    warn!(view = %self.id, quoted_at = %quote.quoted_at, seen = %self.quote.quoted_at, "dropping stale quote");
                    return false;
                }
                self.quote = quote;
            }
            Notice::Transaction { .. } => {}
        }
        true
    }

    fn reduce(&mut self, order: OrderId, quantity: Quantity) {
        if let Some(record) = self.active_orders.get_mut(&order) {
            record.quantity -= quantity;
            if !record.quantity.is_positive() {
                self.active_orders.remove(&order);
            }
        }
    }
}
