//! Types library for the market simulator
//!
//! This library provides the core type definitions shared by the matching
//! engine and the simulation driver, so both sides agree on ordering,
//! identity and arithmetic.
//!
//! # Modules
//! - `ids`: Identifiers (OrderId, AgentId, MarketId, ViewId) and their source
//! - `numeric`: Integer tick types (Price, Quantity)
//! - `time`: Simulated time (TimeStamp)
//! - `order`: Side and the resting order record
//! - `trade`: Transaction records
//! - `quote`: Bid/ask quotes
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod numeric;
pub mod time;
pub mod order;
pub mod trade;
pub mod quote;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::time::*;
    pub use crate::order::*;
    pub use crate::trade::*;
    pub use crate::quote::*;
    pub use crate::errors::*;
}
