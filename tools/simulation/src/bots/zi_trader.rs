//! Zero-intelligence trader bot
//!
//! On every arrival the trader withdraws what it has open, picks a side at
//! random, values one unit at the fundamental plus its private value, and
//! shades that value by a random surplus. Deterministic for a given seed.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use types::errors::{ConfigError, SimError};
use types::ids::{AgentId, ViewId};
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::time::TimeStamp;

use crate::agent::{Agent, AgentContext};
use crate::bots::private_value::PrivateValues;

/// Configuration for the zero-intelligence trader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZiConfig {
    /// Largest absolute position the trader will take
    pub max_position: i64,
    /// Private values are drawn from `[-private_value_spread, private_value_spread]`
    pub private_value_spread: i64,
    /// Smallest surplus demanded, in ticks
    pub shade_min: i64,
    /// Largest surplus demanded, in ticks
    pub shade_max: i64,
    /// Per-tick arrival probability (0.0 to 1.0]
    pub arrival_rate: f64,
}

impl Default for ZiConfig {
    fn default() -> Self {
        Self {
            max_position: 10,
            private_value_spread: 50,
            shade_min: 0,
            shade_max: 100,
            arrival_rate: 0.05,
        }
    }
}

impl ZiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let reason = if self.max_position <= 0 {
            "max_position must be positive"
        } else if self.private_value_spread < 0 {
            "private_value_spread must be non-negative"
        } else if self.shade_min < 0 || self.shade_min > self.shade_max {
            "shade range must satisfy 0 <= shade_min <= shade_max"
        } else if !(self.arrival_rate > 0.0 && self.arrival_rate <= 1.0) {
            "arrival_rate must be within (0, 1]"
        } else {
            return Ok(());
        };
        Err(ConfigError::InvalidAgent { reason: reason.to_string() })
    }
}

/// Order parameters chosen by the trader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZiOrder {
    pub side: Side,
    pub price: Price,
}

/// Zero-intelligence trader with deterministic seeded RNG.
pub struct ZiTrader {
    pub agent: AgentId,
    pub view: ViewId,
    pub config: ZiConfig,
    pub orders_submitted: usize,
    values: PrivateValues,
    rng: ChaCha8Rng,
}

impl ZiTrader {
    /// Create a new trader with a deterministic seed.
    pub fn new(agent: AgentId, view: ViewId, config: ZiConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let values = PrivateValues::draw(config.max_position, config.private_value_spread, &mut rng);
        Self {
            agent,
            view,
            config,
            orders_submitted: 0,
            values,
            rng,
        }
    }

    pub fn private_values(&self) -> &PrivateValues {
        &self.values
    }

    /// Pick the next order, or `None` when the chosen side would breach the
    /// position limit.
    pub fn generate_order(&mut self, holdings: Quantity, fundamental: Price) -> Option<ZiOrder> {
        let side = if self.rng.gen_bool(0.5) { Side::BUY } else { Side::SELL };
        let position = holdings.value();
        let at_limit = match side {
            Side::BUY => position >= self.config.max_position,
            Side::SELL => position <= -self.config.max_position,
        };
        if at_limit {
            return None;
        }

        let value = fundamental.ticks() + self.values.value_for_exchange(holdings, side)?;
        let surplus = self.rng.gen_range(self.config.shade_min..=self.config.shade_max);
        let limit = match side {
            Side::BUY => value - surplus,
            Side::SELL => value + surplus,
        };
        Some(ZiOrder {
            side,
            price: Price::new(limit).non_negative(),
        })
    }

    /// Ticks until the next arrival, `1 + Geometric(arrival_rate)`
    pub fn next_arrival(&mut self) -> TimeStamp {
        let p = self.config.arrival_rate;
        if p >= 1.0 {
            return TimeStamp::new(1);
        }
        let u: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        let failures = (u.ln() / (1.0 - p).ln()).floor();
        TimeStamp::new(1 + failures.min(i64::MAX as f64 / 2.0) as i64)
    }
}

impl Agent for ZiTrader {
    fn name(&self) -> &str {
        "zi"
    }

    fn private_value(&self, holdings: Quantity) -> i64 {
        self.values.total(holdings)
    }

    fn on_wake(&mut self, ctx: &mut AgentContext<'_>) -> Result<(), SimError> {
        ctx.withdraw_all(self.view)?;

        let holdings = ctx.holdings(self.view)?;
        let now = ctx.now();
        let fundamental = ctx.fundamental(now);
        if let Some(order) = self.generate_order(holdings, fundamental) {
            ctx.submit_order(self.view, order.side, order.price, Quantity::new(1))?;
            self.orders_submitted += 1;
        }

        let gap = self.next_arrival();
        ctx.wake_in(gap)
    }
}
