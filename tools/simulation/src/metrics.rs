//! Market statistics
//!
//! Tracks trade count, volume, deviation of prices from the fundamental,
//! how long orders waited in the book, and the spread of every quote.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::numeric::Price;
use types::quote::Quote;
use types::time::TimeStamp;
use types::trade::Transaction;

/// Running statistics for one market.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketStats {
    pub transactions: u64,
    pub volume: i64,
    pub notional: i64,
    squared_deviation: i128,
    execution_time_total: i64,
    execution_samples: u64,
    spreads: Vec<i64>,
}

/// Serializable view of [`MarketStats`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub transactions: u64,
    pub volume: i64,
    pub vwap: Option<Decimal>,
    pub rmsd: Option<f64>,
    pub mean_execution_time: Option<f64>,
    pub median_spread: Option<f64>,
    pub quotes_sampled: usize,
}

impl MarketStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one transaction.
    ///
    /// `buy_arrival` and `sell_arrival` are the times the two orders reached
    /// the book; each contributes one execution-time sample.
    pub fn record_transaction(
        &mut self,
        transaction: &Transaction,
        fundamental: Price,
        buy_arrival: TimeStamp,
        sell_arrival: TimeStamp,
    ) {
        self.transactions += 1;
        self.volume += transaction.quantity.value();
        self.notional = self.notional.saturating_add(transaction.notional());

        let deviation = i128::from(transaction.price.ticks()) - i128::from(fundamental.ticks());
        self.squared_deviation = self.squared_deviation.saturating_add(deviation * deviation);

        for arrival in [buy_arrival, sell_arrival] {
            self.execution_time_total += (transaction.executed_at - arrival).ticks();
            self.execution_samples += 1;
        }
    }

    /// Sample the spread of a freshly computed quote
    pub fn record_quote(&mut self, quote: &Quote) {
        if let Some(spread) = quote.spread() {
            self.spreads.push(spread.ticks());
        }
    }

    /// Root mean squared deviation of trade prices from the fundamental
    pub fn rmsd(&self) -> Option<f64> {
        if self.transactions == 0 {
            return None;
        }
        Some((self.squared_deviation as f64 / self.transactions as f64).sqrt())
    }

    pub fn mean_execution_time(&self) -> Option<f64> {
        if self.execution_samples == 0 {
            return None;
        }
        Some(self.execution_time_total as f64 / self.execution_samples as f64)
    }

    pub fn median_spread(&self) -> Option<f64> {
        if self.spreads.is_empty() {
            return None;
        }
        let mut sorted = self.spreads.clone();
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            Some(sorted[mid] as f64)
        } else {
            Some((sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0)
        }
    }

    /// Volume-weighted average price
    pub fn vwap(&self) -> Option<Decimal> {
        if self.volume == 0 {
            return None;
        }
        Some(Decimal::from(self.notional) / Decimal::from(self.volume))
    }

    pub fn quotes_sampled(&self) -> usize {
        self.spreads.len()
    }

    pub fn summarize(&self) -> StatsSummary {
        StatsSummary {
            transactions: self.transactions,
            volume: self.volume,
            vwap: self.vwap(),
            rmsd: self.rmsd(),
            mean_execution_time: self.mean_execution_time(),
            median_spread: self.median_spread(),
            quotes_sampled: self.quotes_sampled(),
        }
    }

    /// Build a summary string.
    pub fn summary(&self) -> String {
        format!(
            "Trades: {} | Volume: {} | RMSD: {} | Exec time: {} | Median spread: {}",
            self.transactions,
            self.volume,
            fmt_opt(self.rmsd()),
            fmt_opt(self.mean_execution_time()),
            fmt_opt(self.median_spread()),
        )
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}
