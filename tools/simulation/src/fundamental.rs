//! Fundamental value processes
//!
//! Agents price orders off a fundamental value. The mean-reverting process
//! is generated tick by tick from its own seeded RNG and cached, so a value
//! depends only on the seed and the time asked for.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::errors::ConfigError;
use types::numeric::Price;
use types::time::TimeStamp;

pub trait Fundamental {
    fn value_at(&mut self, time: TimeStamp) -> Price;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantFundamental {
    value: Price,
}

impl ConstantFundamental {
    pub fn new(value: Price) -> Self {
        Self { value }
    }
}

impl Fundamental for ConstantFundamental {
    fn value_at(&mut self, _time: TimeStamp) -> Price {
        self.value
    }
}

/// Ticks generated and cached when no horizon is given
pub const DEFAULT_HORIZON: i64 = 1 << 20;

/// How a jump of the mean-reverting process is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShockDistribution {
    /// Whole ticks uniform on `[-shock, shock]`
    #[default]
    Uniform,
    /// Normal with mean 0 and variance `shock`, truncated toward zero
    Gaussian,
}

/// `r_t = max(0, kappa * mean + (1 - kappa) * r_{t-1} + shock_t)` where
/// `shock_t` follows a [`ShockDistribution`].
///
/// With a shock probability below one the process only jumps on some ticks
/// and holds its value on the others. Values up to the horizon are sampled
/// and cached; later times get the expected path from the value at the
/// horizon, so a far-future lookup costs no memory.
#[derive(Debug, Clone)]
pub struct MeanRevertingFundamental {
    mean: Price,
    kappa: Decimal,
    shock: i64,
    distribution: ShockDistribution,
    shock_probability: Decimal,
    horizon: i64,
    rng: ChaCha8Rng,
    series: Vec<Price>,
}

impl MeanRevertingFundamental {
    pub fn new(mean: Price, kappa: Decimal, shock: i64, seed: u64) -> Result<Self, ConfigError> {
        if mean < Price::ZERO || mean.is_infinite() {
            return Err(ConfigError::InvalidFundamental {
                reason: format!("mean must be a finite non-negative price, got {}", mean),
            });
        }
        if kappa < Decimal::ZERO || kappa > Decimal::ONE {
            return Err(ConfigError::InvalidFundamental {
                reason: format!("kappa must be within [0, 1], got {}", kappa),
            });
        }
        if shock < 0 {
            return Err(ConfigError::InvalidFundamental {
                reason: format!("shock must be non-negative, got {}", shock),
            });
        }
        Ok(Self {
            mean,
            kappa,
            shock,
            distribution: ShockDistribution::Uniform,
            shock_probability: Decimal::ONE,
            horizon: DEFAULT_HORIZON,
            rng: ChaCha8Rng::seed_from_u64(seed),
            series: vec![mean],
        })
    }

    /// Jump on each tick with `probability` instead of on every tick
    pub fn with_shock_probability(mut self, probability: Decimal) -> Result<Self, ConfigError> {
        if probability < Decimal::ZERO || probability > Decimal::ONE {
            return Err(ConfigError::InvalidFundamental {
                reason: format!("shock probability must be within [0, 1], got {}", probability),
            });
        }
        self.shock_probability = probability;
        Ok(self)
    }

    pub fn with_distribution(mut self, distribution: ShockDistribution) -> Self {
        self.distribution = distribution;
        self
    }

    /// Last tick that is sampled rather than extrapolated
    pub fn with_horizon(mut self, horizon: TimeStamp) -> Self {
        self.horizon = horizon.ticks().clamp(0, DEFAULT_HORIZON);
        self
    }

    pub fn horizon(&self) -> TimeStamp {
        TimeStamp::new(self.horizon)
    }

    fn jumps(&mut self) -> bool {
        if self.shock_probability >= Decimal::ONE {
            return true;
        }
        let p = self.shock_probability.to_f64().unwrap_or(0.0);
        p > 0.0 && self.rng.gen_bool(p)
    }

    fn step(&mut self, previous: Price) -> Price {
        if !self.jumps() {
            return previous;
        }
        let shock = self.draw_shock();
        let reverted = self.kappa * self.mean.as_decimal()
            + (Decimal::ONE - self.kappa) * previous.as_decimal()
            + shock;
        Price::from_decimal(reverted)
            .unwrap_or(previous)
            .non_negative()
    }

    fn draw_shock(&mut self) -> Decimal {
        if self.shock == 0 {
            return Decimal::ZERO;
        }
        match self.distribution {
            ShockDistribution::Uniform => Decimal::from(self.rng.gen_range(-self.shock..=self.shock)),
            ShockDistribution::Gaussian => Normal::new(0.0, (self.shock as f64).sqrt())
                .ok()
                .and_then(|normal| Decimal::from_f64(normal.sample(&mut self.rng).trunc()))
                .unwrap_or(Decimal::ZERO),
        }
    }

    /// Expected value `ticks` after `from`: the gap to the mean shrinks by
    /// `1 - p * kappa` per tick
    fn expected_after(&self, from: Price, ticks: u64) -> Price {
        let retained = Decimal::ONE - self.shock_probability * self.kappa;
        let gap = (from.as_decimal() - self.mean.as_decimal()) * decay(retained, ticks);
        Price::from_decimal(self.mean.as_decimal() + gap)
            .unwrap_or(from)
            .non_negative()
    }
}

/// `factor^steps` by repeated squaring, for `factor` in `[0, 1]`
fn decay(factor: Decimal, mut steps: u64) -> Decimal {
    let mut result = Decimal::ONE;
    let mut base = factor;
    while steps > 0 {
        if steps & 1 == 1 {
            result *= base;
        }
        base *= base;
        steps >>= 1;
    }
    result
}

impl Fundamental for MeanRevertingFundamental {
    fn value_at(&mut self, time: TimeStamp) -> Price {
        let ticks = time.ticks().max(0);
        let index = ticks.min(self.horizon) as usize;
        while self.series.len() <= index {
            let previous = self.series[self.series.len() - 1];
            let next = self.step(previous);
            self.series.push(next);
        }
        let sampled = self.series[index];
        if ticks <= self.horizon {
            return sampled;
        }
        self.expected_after(sampled, (ticks - self.horizon) as u64)
    }
}
