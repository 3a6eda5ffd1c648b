//! Transaction log and determinism validation
//!
//! Two runs built from the same configuration must produce byte-identical
//! transaction logs.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use types::errors::SimError;
use types::trade::Transaction;

use crate::config::SimulationConfig;
use crate::engine::Simulation;

/// Build, run to the configured end time, and close a simulation
pub fn run_to_end(config: &SimulationConfig) -> Result<Simulation, SimError> {
    let mut sim = Simulation::from_config(config)?;
    sim.run_until(config.end_time)?;
    sim.finish();
    Ok(sim)
}

/// Run a configuration and return its transaction log
pub fn run_logged(config: &SimulationConfig) -> Result<Vec<Transaction>, SimError> {
    Ok(run_to_end(config)?.transaction_log().to_vec())
}

/// Export a transaction log as JSON.
pub fn export_transaction_log(transactions: &[Transaction]) -> String {
    serde_json::to_string_pretty(transactions).unwrap_or_default()
}

/// Import a transaction log from JSON.
pub fn import_transaction_log(json: &str) -> Result<Vec<Transaction>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Result of a determinism check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminismCheck {
    pub matches: bool,
    pub original_transactions: usize,
    pub replayed_transactions: usize,
    /// Index of the first transaction that differs
    pub first_divergence: Option<usize>,
}

/// Run `config` twice and compare the serialized logs
pub fn validate_determinism(config: &SimulationConfig) -> Result<DeterminismCheck, SimError> {
    let original = run_logged(config)?;
    let replayed = run_logged(config)?;

    let matches = export_transaction_log(&original) == export_transaction_log(&replayed);
    let first_divergence = if matches {
        None
    } else {
        Some(
            original
                .iter()
                .zip(&replayed)
                .position(|(a, b)| a != b)
                .unwrap_or(original.len().min(replayed.len())),
        )
    };

    if matches {
        info!(seed = config.seed, transactions = original.len(), "replay matched");
    } else {
        warn!(seed = config.seed, divergence = ?first_divergence, "replay diverged");
    }
    Ok(DeterminismCheck {
        matches,
        original_transactions: original.len(),
        replayed_transactions: replayed.len(),
        first_divergence,
    })
}
