//! Private values
//!
//! A trader's private value for each unit it could hold, drawn once and
//! sorted so that every extra unit is worth no more than the one before.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use types::numeric::Quantity;
use types::order::Side;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateValues {
    max_position: i64,
    /// Marginal values, descending. Entry `max_position + p` is the value of
    /// moving from position `p` to `p + 1`.
    values: Vec<i64>,
}

impl PrivateValues {
    /// Draw `2 * max_position` values uniformly from `[-spread, spread]`
    pub fn draw(max_position: i64, spread: i64, rng: &mut ChaCha8Rng) -> Self {
        let count = (2 * max_position.max(0)) as usize;
        let spread = spread.max(0);
        let mut values: Vec<i64> = (0..count).map(|_| rng.gen_range(-spread..=spread)).collect();
        values.sort_unstable_by(|a, b| b.cmp(a));
        Self { max_position, values }
    }

    pub fn zero(max_position: i64) -> Self {
        Self {
            max_position,
            values: vec![0; (2 * max_position.max(0)) as usize],
        }
    }

    pub fn max_position(&self) -> i64 {
        self.max_position
    }

    /// Value of trading one more unit on `side` from `position`; `None`
    /// past the position limit
    pub fn value_for_exchange(&self, position: Quantity, side: Side) -> Option<i64> {
        let index = match side {
            Side::BUY => self.max_position + position.value(),
            Side::SELL => self.max_position + position.value() - 1,
        };
        usize::try_from(index).ok().and_then(|i| self.values.get(i).copied())
    }

    /// Total private value of holding `holdings` units
    pub fn total(&self, holdings: Quantity) -> i64 {
        let units = holdings.value().clamp(-self.max_position, self.max_position);
        let origin = self.max_position;
        let (from, to) = if units >= 0 {
            (origin, origin + units)
        } else {
            (origin + units, origin)
        };
        let sum: i64 = self.values[from as usize..to as usize].iter().sum();
        if units >= 0 {
            sum
        } else {
            -sum
        }
    }
}
