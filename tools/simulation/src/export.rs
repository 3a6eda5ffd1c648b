//! Report export
//!
//! Gathers per-market statistics, per-agent outcomes and scheduler counters
//! into one serializable report.

use serde::{Deserialize, Serialize};
use types::ids::{AgentId, MarketId};
use types::numeric::{Price, Quantity};
use types::quote::Quote;
use types::time::TimeStamp;

use crate::engine::Simulation;
use crate::market::MarketKind;
use crate::metrics::StatsSummary;
use crate::scheduler::SchedulerStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketReport {
    pub market: MarketId,
    pub kind: MarketKind,
    pub stats: StatsSummary,
    pub final_quote: Quote,
    pub resting_orders: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent: AgentId,
    pub name: String,
    /// True holdings summed over the agent's views
    pub holdings: Quantity,
    /// True cash profit in ticks
    pub profit: i64,
    pub private_value: i64,
    /// profit + holdings * final fundamental + private value
    pub payoff: i64,
}

/// Combined export containing all simulation outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub version: String,
    pub end_time: TimeStamp,
    pub final_fundamental: Price,
    pub transactions: usize,
    pub markets: Vec<MarketReport>,
    pub agents: Vec<AgentReport>,
    pub scheduler: SchedulerStats,
}

/// Build a complete simulation report.
pub fn build_report(sim: &mut Simulation) -> SimulationReport {
    let end_time = sim.current_time();
    let final_fundamental = sim.fundamental_at(end_time);

    let markets = sim
        .markets()
        .iter()
        .map(|market| MarketReport {
            market: market.id(),
            kind: market.kind(),
            stats: market.stats().summarize(),
            final_quote: *market.quote(),
            resting_orders: market.order_count(),
        })
        .collect();

    let mut positions = vec![(Quantity::ZERO, 0i64); sim.agent_count()];
    for view in sim.views() {
        if let Some(slot) = positions.get_mut(view.agent().index()) {
            slot.0 += view.true_holdings();
            slot.1 += view.true_profit();
        }
    }

    let agents = positions
        .into_iter()
        .enumerate()
        .map(|(index, (holdings, profit))| {
            let id = AgentId::new(index as u64);
            let (name, private_value) = sim
                .agent(id)
                .map_or((String::new(), 0), |agent| (agent.name().to_string(), agent.private_value(holdings)));
            let payoff = profit
                .saturating_add(final_fundamental.notional(holdings))
                .saturating_add(private_value);
            AgentReport {
                agent: id,
                name,
                holdings,
                profit,
                private_value,
                payoff,
            }
        })
        .collect();

    SimulationReport {
        version: crate::VERSION.to_string(),
        end_time,
        final_fundamental,
        transactions: sim.transaction_log().len(),
        markets,
        agents,
        scheduler: sim.scheduler_stats(),
    }
}

/// Export a report as JSON.
pub fn export_json(report: &SimulationReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_default()
}

/// Write a report to a file path.
pub fn write_to_file(report: &SimulationReport, path: &str) -> std::io::Result<()> {
    let json = export_json(report);
    std::fs::write(path, json)
}
