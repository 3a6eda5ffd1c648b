//! Markets
//!
//! A market couples a [`MatchingEngine`] with the views registered on it.
//! Every operation returns a [`MarketUpdate`] describing what has to be fanned
//! out to views: executions, a quote to broadcast, and a clear to schedule.
//!
//! Continuous markets clear after every submission and broadcast a quote
//! after every change. Call markets only clear on their schedule, at
//! multiples of the clearing interval, and broadcast quotes at those clears.

use matching_engine::{MatchingEngine, PricedMatch, PricingRule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use types::errors::{ConfigError, EngineError, OrderError, SimError};
use types::ids::{MarketId, OrderId, ViewId};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};
use types::quote::Quote;
use types::time::TimeStamp;
use types::trade::Transaction;

use crate::metrics::MarketStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketKind {
    Continuous,
    Call { clear_interval: TimeStamp },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketState {
    Open,
    Clearing,
    Closed,
}

/// One side of an execution, routed back to the owning view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub view: ViewId,
    pub order: OrderId,
    pub side: Side,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    pub transaction: Transaction,
    pub buy: Fill,
    pub sell: Fill,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketUpdate {
    pub executions: Vec<Execution>,
    /// Quote to broadcast to every registered view
    pub quote: Option<Quote>,
    /// Time of a clear the caller must schedule
    pub clear_at: Option<TimeStamp>,
}

#[derive(Debug, Clone, Copy)]
struct RestingOrder {
    view: ViewId,
    side: Side,
}

#[derive(Debug)]
pub struct Market {
    id: MarketId,
    kind: MarketKind,
    engine: MatchingEngine,
    /// Owner of every order in the book, by handle
    resting: HashMap<OrderId, RestingOrder>,
    views: Vec<ViewId>,
    quote: Quote,
    transactions: Vec<Transaction>,
    stats: MarketStats,
    state: MarketState,
    clear_pending: bool,
}

impl Market {
    pub fn new(id: MarketId, kind: MarketKind, rule: PricingRule) -> Result<Self, ConfigError> {
        if let MarketKind::Call { clear_interval } = kind {
            if clear_interval.ticks() <= 0 {
                return Err(ConfigError::InvalidClearInterval(clear_interval.ticks()));
            }
        }
        Ok(Self {
            id,
            kind,
            engine: MatchingEngine::new(rule)?,
            resting: HashMap::new(),
            views: Vec::new(),
            quote: Quote::empty(id),
            transactions: Vec::new(),
            stats: MarketStats::new(),
            state: MarketState::Open,
            clear_pending: false,
        })
    }

    pub fn id(&self) -> MarketId {
        self.id
    }

    pub fn kind(&self) -> MarketKind {
        self.kind
    }

    pub fn state(&self) -> MarketState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == MarketState::Closed
    }

    pub fn rule(&self) -> &PricingRule {
        self.engine.rule()
    }

    /// Last computed quote
    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    pub fn stats(&self) -> &MarketStats {
        &self.stats
    }

    pub fn views(&self) -> &[ViewId] {
        &self.views
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Transactions executed at or before `time`
    pub fn transactions_until(&self, time: TimeStamp) -> &[Transaction] {
        let end = self.transactions.partition_point(|t| t.executed_at <= time);
        &self.transactions[..end]
    }

    pub fn contains(&self, order: OrderId) -> bool {
        self.engine.contains(order)
    }

    /// The order as it currently rests in the book
    pub fn order(&self, order: OrderId) -> Option<&Order> {
        self.engine.order(order)
    }

    pub fn order_count(&self) -> usize {
        self.engine.order_count()
    }

    pub fn depth(&self, side: Side) -> Quantity {
        self.engine.depth(side)
    }

    pub(crate) fn register_view(&mut self, view: ViewId) {
        if !self.views.contains(&view) {
            self.views.push(view);
        }
    }

    fn ensure_open(&self) -> Result<(), SimError> {
        if self.is_closed() {
            return Err(SimError::MarketClosed { market: self.id });
        }
        Ok(())
    }

    /// Put an order in the book on behalf of `view`
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        &mut self,
        view: ViewId,
        order: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
        now: TimeStamp,
        fundamental: Price,
    ) -> Result<MarketUpdate, SimError> {
        self.ensure_open()?;
        if !quantity.is_positive() {
            return Err(OrderError::InvalidQuantity(quantity).into());
        }
        if price < Price::ZERO {
            return Err(OrderError::InvalidPrice(price).into());
        }

        self.engine.submit(order, side, price, quantity, now)?;
        self.resting.insert(order, RestingOrder { view, side });
        debug!(market = %self.id, order = %order, side = %side, price = %price, quantity = %quantity, time = %now, "order entered book");

        let mut update = MarketUpdate::default();
        match self.kind {
            MarketKind::Continuous => {
                update.executions = self.run_clear(now, fundamental)?;
                update.quote = Some(self.refresh_quote(now));
            }
            MarketKind::Call { clear_interval } => {
                self.refresh_quote(now);
                update.clear_at = self.request_clear(now, clear_interval);
            }
        }
        Ok(update)
    }

    /// Withdraw up to `quantity` of an order; returns what was removed
    pub fn withdraw(
        &mut self,
        order: OrderId,
        quantity: Quantity,
        now: TimeStamp,
    ) -> Result<(Quantity, MarketUpdate), SimError> {
        self.ensure_open()?;
        let removed = self.engine.withdraw(order, quantity)?;
        if !self.engine.contains(order) {
            self.resting.remove(&order);
        }
        debug!(market = %self.id, order = %order, removed = %removed, time = %now, "order withdrawn");

        let quote = self.refresh_quote(now);
        let mut update = MarketUpdate::default();
        if self.kind == MarketKind::Continuous {
            update.quote = Some(quote);
        }
        Ok((removed, update))
    }

    /// Clear the book and broadcast a fresh quote.
    ///
    /// A clear on a closed market does nothing. Call markets also ask for
    /// their next clear.
    pub fn clear(&mut self, now: TimeStamp, fundamental: Price) -> Result<MarketUpdate, SimError> {
        if self.is_closed() {
            debug!(market = %self.id, time = %now, "clear skipped, market closed");
            return Ok(MarketUpdate::default());
        }
        let mut update = MarketUpdate {
            executions: self.run_clear(now, fundamental)?,
            quote: Some(self.refresh_quote(now)),
            clear_at: None,
        };
        if let MarketKind::Call { clear_interval } = self.kind {
            self.clear_pending = false;
            update.clear_at = self.request_clear(now, clear_interval);
        }
        Ok(update)
    }

    pub fn close(&mut self) {
        self.state = MarketState::Closed;
    }

    /// At most one clear is pending at a time
    fn request_clear(&mut self, now: TimeStamp, interval: TimeStamp) -> Option<TimeStamp> {
        if self.clear_pending {
            return None;
        }
        self.clear_pending = true;
        Some(now.next_multiple_of(interval))
    }

    fn run_clear(&mut self, now: TimeStamp, fundamental: Price) -> Result<Vec<Execution>, SimError> {
        self.state = MarketState::Clearing;
        let cleared = self.engine.clear();
        self.state = MarketState::Open;

        let matches = cleared?;
        let mut executions = Vec::with_capacity(matches.len());
        for PricedMatch { pair, price } in matches {
            let buy = self.fill_for(&pair.buy, pair.quantity)?;
            let sell = self.fill_for(&pair.sell, pair.quantity)?;
            let transaction = Transaction {
                market: self.id,
                price,
                quantity: pair.quantity,
                executed_at: now,
                buy_order: pair.buy.id,
                sell_order: pair.sell.id,
            };
            self.stats.record_transaction(
                &transaction,
                fundamental,
                pair.buy.submitted_at,
                pair.sell.submitted_at,
            );
            self.transactions.push(transaction);
            executions.push(Execution { transaction, buy, sell });

            for id in [pair.buy.id, pair.sell.id] {
                if !self.engine.contains(id) {
                    self.resting.remove(&id);
                }
            }
        }

        if !executions.is_empty() {
            debug!(market = %self.id, time = %now, executions = executions.len(), "market cleared");
        }
        Ok(executions)
    }

    fn fill_for(&self, order: &Order, quantity: Quantity) -> Result<Fill, EngineError> {
        let resting = self.resting.get(&order.id).ok_or_else(|| EngineError::InvariantViolation {
            reason: format!("{} has no owning view", order.id),
        })?;
        Ok(Fill {
            view: resting.view,
            order: order.id,
            side: resting.side,
            quantity,
        })
    }

    fn refresh_quote(&mut self, now: TimeStamp) -> Quote {
        let quote = Quote {
            market: self.id,
            bid: self.engine.bid_quote(),
            bid_depth: self.engine.depth(Side::BUY),
            ask: self.engine.ask_quote(),
            ask_depth: self.engine.depth(Side::SELL),
            quoted_at: now,
        };
        self.stats.record_quote(&quote);
        self.quote = quote;
        quote
    }
}
