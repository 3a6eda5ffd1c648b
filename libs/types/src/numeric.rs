//! Integer tick types for prices and quantities
//!
//! Prices are whole ticks so that book comparisons are exact and totally
//! ordered. Conversions from `Decimal` round HALF_EVEN.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Price in integer ticks.
///
/// `Price::INF` is an unbounded willingness to transact. Arithmetic
/// saturates, and anything involving `INF` stays `INF`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);
    pub const INF: Price = Price(i64::MAX);

    pub const fn new(ticks: i64) -> Self {
        Self(ticks)
    }

    pub const fn ticks(&self) -> i64 {
        self.0
    }

    pub fn is_infinite(&self) -> bool {
        self.0 == i64::MAX
    }

    /// Clamp negative prices to zero
    pub fn non_negative(self) -> Self {
        Self(self.0.max(0))
    }

    /// Round a decimal tick count to the nearest tick (ties to even)
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        value
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            .to_i64()
            .map(Self)
    }

    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }

    /// Cash value of trading `quantity` units at this price
    pub fn notional(&self, quantity: Quantity) -> i64 {
        self.0.saturating_mul(quantity.value())
    }
}

impl Add for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Price {
        if self.is_infinite() || rhs.is_infinite() {
            return Price::INF;
        }
        Price(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Price {
    type Output = Price;

    fn sub(self, rhs: Price) -> Price {
        if self.is_infinite() {
            return Price::INF;
        }
        Price(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            write!(f, "INF")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Signed unit count.
///
/// Order quantities are positive at the book layer (side carries the
/// direction); holdings use the sign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub const fn new(units: i64) -> Self {
        Self(units)
    }

    pub const fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn abs(&self) -> Self {
        Self(self.0.saturating_abs())
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 - rhs.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Quantity) {
        self.0 -= rhs.0;
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Quantity {
        Quantity(-self.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Quantity {
        Quantity(iter.map(|q| q.0).sum())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
