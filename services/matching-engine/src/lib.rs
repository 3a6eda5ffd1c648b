//! Matching Engine Service
//!
//! Four-heap order book for call and continuous double auctions.
//!
//! Orders are partitioned into four ordered sets (matched buys, matched
//! sells, unmatched buys, unmatched sells). The matched sets always hold the
//! maximal mutually profitable match, so quotes and clears are read straight
//! off the set boundaries.
//!
//! **Key Invariants:**
//! - Every matched order outranks every unmatched order on its side
//! - Every matched buy price >= every matched sell price
//! - The best unmatched buy never crosses the best unmatched sell
//! - Deterministic matching (same inputs → same outputs)
//! - Conservation of quantity

pub mod book;
pub mod matching;
pub mod engine;
pub mod events;

pub use book::FourHeap;
pub use engine::MatchingEngine;
pub use events::{MatchedPair, PricedMatch};
pub use matching::PricingRule;
