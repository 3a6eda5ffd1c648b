//! Simulated time
//!
//! Time is an integer tick count. It is also used for delays and latencies,
//! which are non-negative tick counts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A point in simulated time, or a non-negative delay.
///
/// `TimeStamp::IMMEDIATE` is a distinguished value meaning "process before
/// the clock advances"; it is never a valid delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeStamp(i64);

impl TimeStamp {
    pub const ZERO: TimeStamp = TimeStamp(0);
    pub const IMMEDIATE: TimeStamp = TimeStamp(-1);

    pub const fn new(ticks: i64) -> Self {
        Self(ticks)
    }

    pub const fn ticks(&self) -> i64 {
        self.0
    }

    pub fn is_immediate(&self) -> bool {
        *self == Self::IMMEDIATE
    }

    /// True for values usable as a scheduling delay
    pub fn is_valid_delay(&self) -> bool {
        self.0 >= 0
    }

    /// Next multiple of `interval` strictly after this time
    pub fn next_multiple_of(&self, interval: TimeStamp) -> TimeStamp {
        if interval.0 <= 0 {
            return *self;
        }
        TimeStamp((self.0.div_euclid(interval.0) + 1) * interval.0)
    }
}

impl Add for TimeStamp {
    type Output = TimeStamp;

    fn add(self, rhs: TimeStamp) -> TimeStamp {
        TimeStamp(self.0.saturating_add(rhs.0))
    }
}

impl Sub for TimeStamp {
    type Output = TimeStamp;

    fn sub(self, rhs: TimeStamp) -> TimeStamp {
        TimeStamp(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_immediate() {
            write!(f, "immediate")
        } else {
            write!(f, "t{}", self.0)
        }
    }
}
