//! Discrete-event market simulator
//!
//! Agents trade through market views on continuous or call double auctions.
//! A single scheduler drives every wake-up, order arrival, clear and notice
//! delivery, so a run is fully determined by its configuration and seed.
//!
//! # Modules
//! - `scheduler`: Time-ordered activity queue with immediate draining
//! - `activity`: Scheduled activities and agent notices
//! - `market`: Continuous and call markets over the four-heap book
//! - `view`: Immediate and latent market views
//! - `agent`: Agent trait and the context agents act through
//! - `engine`: World state, dispatch, and the `Simulation` driver
//! - `fundamental`: Fundamental value processes
//! - `bots`: Zero-intelligence traders and a market maker
//! - `config`: JSON run configuration
//! - `metrics`: Per-market trading statistics
//! - `replay`: Transaction log and deterministic replay validation
//! - `export`: Run report JSON export

pub mod scheduler;
pub mod activity;
pub mod market;
pub mod view;
pub mod agent;
pub mod engine;
pub mod fundamental;
pub mod bots;
pub mod config;
pub mod metrics;
pub mod replay;
pub mod export;

/// Crate version constant
pub const VERSION: &str = "1.0.0";
