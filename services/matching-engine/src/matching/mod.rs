//! Matching logic module
//!
//! Crossing predicates and the pricing rules applied to cleared matches

pub mod crossing;
pub mod pricing;

pub use crossing::{can_match, incoming_can_match};
pub use pricing::PricingRule;
