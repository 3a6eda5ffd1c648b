//! Order book infrastructure module
//!
//! Contains the priority keys, the per-side matched/unmatched sets and the
//! four-heap book built from them.

pub mod priority;
pub mod four_heap;

pub use priority::{HeapSide, Priority};
pub use four_heap::{BookSnapshot, FourHeap};
