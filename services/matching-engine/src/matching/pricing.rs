//! Pricing rules
//!
//! A pricing rule assigns exactly one price to every matched pair of a
//! clear. It sees only the pairs, never the book, so it can be tested in
//! isolation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::errors::ConfigError;
use types::numeric::Price;

use crate::events::{MatchedPair, PricedMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PricingRule {
    /// Continuous markets: the order that reached the book first sets the price
    #[default]
    EarliestOrder,
    /// Call markets: one price for the whole batch,
    /// `ratio * max(sell prices) + (1 - ratio) * min(buy prices)`
    Uniform { ratio: Decimal },
}

impl PricingRule {
    /// Uniform rule with a blend ratio in `[0, 1]`
    pub fn uniform(ratio: Decimal) -> Result<Self, ConfigError> {
        let rule = PricingRule::Uniform { ratio };
        rule.validate()?;
        Ok(rule)
    }

    /// Uniform rule splitting the difference
    pub fn split_difference() -> Self {
        PricingRule::Uniform { ratio: Decimal::new(5, 1) }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            PricingRule::EarliestOrder => Ok(()),
            PricingRule::Uniform { ratio } => {
                if *ratio < Decimal::ZERO || *ratio > Decimal::ONE {
                    Err(ConfigError::InvalidPricingRatio(ratio.to_string()))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Price every pair, preserving the input order
    pub fn price(&self, pairs: Vec<MatchedPair>) -> Vec<PricedMatch> {
        match self {
            PricingRule::EarliestOrder => pairs
                .into_iter()
                .map(|pair| PricedMatch { price: pair.earlier().price, pair })
                .collect(),
            PricingRule::Uniform { ratio } => {
                let Some(price) = uniform_price(*ratio, &pairs) else {
                    return Vec::new();
                };
                pairs
                    .into_iter()
                    .map(|pair| PricedMatch { pair, price })
                    .collect()
            }
        }
    }
}

/// Batch clearing price, rounded to the nearest tick (ties to even).
///
/// An infinite side has no finite bound to blend, so the finite side's
/// price is used alone.
fn uniform_price(ratio: Decimal, pairs: &[MatchedPair]) -> Option<Price> {
    let max_sell = pairs.iter().map(|pair| pair.sell.price).max()?;
    let min_buy = pairs.iter().map(|pair| pair.buy.price).min()?;

    if min_buy.is_infinite() {
        return Some(max_sell);
    }
    let blended = ratio * max_sell.as_decimal() + (Decimal::ONE - ratio) * min_buy.as_decimal();
    Some(Price::from_decimal(blended).unwrap_or(min_buy))
}
