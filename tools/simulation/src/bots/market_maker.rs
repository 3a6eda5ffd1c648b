//! Market maker bot: ladder quoting with inventory limits
//!
//! On each wake the maker withdraws its ladder and lays a new one: `rungs`
//! buy orders stepping down from the last bid and `rungs` sell orders
//! stepping up from the last ask. With no quote to anchor on it centres the
//! ladder on the fundamental. Inventory shifts both anchors toward unwinding.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::errors::{ConfigError, SimError};
use types::ids::{AgentId, OrderId, ViewId};
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::quote::Quote;
use types::time::TimeStamp;

use crate::agent::{Agent, AgentContext};

/// Configuration for the market maker bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketMakerConfig {
    /// Orders per side
    pub rungs: usize,
    /// Distance between rungs, in ticks
    pub rung_spacing: i64,
    /// Quantity of each rung
    pub rung_size: i64,
    /// Spread around the fundamental when the book has no quote
    pub spread: i64,
    /// Maximum net inventory (absolute value of net position)
    pub max_inventory: i64,
    /// Ticks between ladder refreshes
    pub wake_interval: i64,
}

impl Default for MarketMakerConfig {
    fn default() -> Self {
        Self {
            rungs: 3,
            rung_spacing: 5,
            rung_size: 1,
            spread: 20,
            max_inventory: 10,
            wake_interval: 10,
        }
    }
}

impl MarketMakerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let reason = if self.rungs == 0 {
            "rungs must be positive"
        } else if self.rung_spacing <= 0 {
            "rung_spacing must be positive"
        } else if self.rung_size <= 0 {
            "rung_size must be positive"
        } else if self.spread < 0 {
            "spread must be non-negative"
        } else if self.max_inventory <= 0 {
            "max_inventory must be positive"
        } else if self.wake_interval <= 0 {
            "wake_interval must be positive"
        } else {
            return Ok(());
        };
        Err(ConfigError::InvalidAgent { reason: reason.to_string() })
    }
}

/// Market maker bot state.
pub struct MarketMaker {
    pub agent: AgentId,
    pub view: ViewId,
    pub config: MarketMakerConfig,
    pub orders_placed: usize,
    pub fills: usize,
}

impl MarketMaker {
    pub fn new(agent: AgentId, view: ViewId, config: MarketMakerConfig) -> Self {
        Self {
            agent,
            view,
            config,
            orders_placed: 0,
            fills: 0,
        }
    }

    /// Inventory skew in ticks: adjusts quotes toward reducing exposure.
    ///
    /// Positive inventory → positive skew → bid lower, ask lower (encourage sells).
    /// At max inventory the skew is half the fallback spread.
    pub fn inventory_skew(&self, inventory: Quantity) -> i64 {
        if self.config.max_inventory <= 0 {
            return 0;
        }
        let ratio = Decimal::from(inventory.value()) / Decimal::from(self.config.max_inventory);
        let skew = ratio * Decimal::from(self.config.spread) / Decimal::TWO;
        Price::from_decimal(skew).map_or(0, |p| p.ticks())
    }

    /// Bid and ask anchors before skew
    pub fn anchors(&self, quote: &Quote, fundamental: Price) -> (i64, i64) {
        let half = self.config.spread / 2;
        let bid = quote
            .bid
            .filter(|p| !p.is_infinite())
            .map_or(fundamental.ticks() - half, |p| p.ticks());
        let ask = quote
            .ask
            .filter(|p| !p.is_infinite())
            .map_or(fundamental.ticks() + half, |p| p.ticks());
        (bid, ask)
    }

    /// Check if inventory allows quoting `side`.
    pub fn can_quote(&self, side: Side, inventory: Quantity) -> bool {
        match side {
            Side::BUY => inventory.value() < self.config.max_inventory,
            Side::SELL => inventory.value() > -self.config.max_inventory,
        }
    }

    /// Prices of the ladder, best rung first on each side
    pub fn ladder(&self, quote: &Quote, fundamental: Price, inventory: Quantity) -> Vec<(Side, Price)> {
        let (bid, ask) = self.anchors(quote, fundamental);
        let skew = self.inventory_skew(inventory);
        let mut rungs = Vec::with_capacity(2 * self.config.rungs);

        if self.can_quote(Side::BUY, inventory) {
            for i in 1..=self.config.rungs as i64 {
                let price = bid - skew - i * self.config.rung_spacing;
                if price >= 0 {
                    rungs.push((Side::BUY, Price::new(price)));
                }
            }
        }
        if self.can_quote(Side::SELL, inventory) {
            for i in 1..=self.config.rungs as i64 {
                let price = (ask - skew + i * self.config.rung_spacing).max(0);
                rungs.push((Side::SELL, Price::new(price)));
            }
        }
        rungs
    }
}

impl Agent for MarketMaker {
    fn name(&self) -> &str {
        "market_maker"
    }

    fn on_wake(&mut self, ctx: &mut AgentContext<'_>) -> Result<(), SimError> {
        ctx.withdraw_all(self.view)?;

        let quote = ctx.quote(self.view)?;
        let inventory = ctx.holdings(self.view)?;
        let now = ctx.now();
        let fundamental = ctx.fundamental(now);
        let size = Quantity::new(self.config.rung_size);
        for (side, price) in self.ladder(&quote, fundamental, inventory) {
            ctx.submit_order(self.view, side, price, size)?;
            self.orders_placed += 1;
        }

        ctx.wake_in(TimeStamp::new(self.config.wake_interval))
    }

    fn on_order_transacted(
        &mut self,
        _ctx: &mut AgentContext<'_>,
        _view: ViewId,
        _order: OrderId,
        _price: Price,
        _quantity: Quantity,
    ) -> Result<(), SimError> {
        self.fills += 1;
        Ok(())
    }
}
