//! Stress test: large zero-intelligence populations
//!
//! Runs many seeded traders through the full event loop and checks the
//! books stay consistent.

use simulation::bots::zi_trader::ZiConfig;
use simulation::bots::BotConfig;
use simulation::config::{AgentConfig, SimulationConfig};
use simulation::export::build_report;
use simulation::replay::run_to_end;
use std::time::Instant;
use types::numeric::Quantity;
use types::time::TimeStamp;

fn zi_population(count: usize, end_time: i64) -> SimulationConfig {
    SimulationConfig {
        end_time: TimeStamp::new(end_time),
        agents: vec![AgentConfig {
            bot: BotConfig::Zi(ZiConfig::default()),
            count,
            latency: TimeStamp::ZERO,
            market: 0,
        }],
        ..SimulationConfig::default()
    }
}

fn run_and_check(config: &SimulationConfig) -> usize {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let start = Instant::now();
    let mut sim = run_to_end(config).unwrap();
    let elapsed = start.elapsed();
    let report = build_report(&mut sim);

    println!(
        "{} agents, {} transactions, {} activities in {:.2?}",
        report.agents.len(),
        report.transactions,
        report.scheduler.executed,
        elapsed
    );

    assert!(sim.is_finished());
    assert_eq!(report.scheduler.failed, 0);

    // Every unit bought was sold by someone
    let net: i64 = sim.views().iter().map(|v| v.true_holdings().value()).sum();
    assert_eq!(net, 0);
    let cash: i64 = sim.views().iter().map(|v| v.true_profit()).sum();
    assert_eq!(cash, 0);

    // With zero latency the observed state is the true state
    for view in sim.views() {
        assert_eq!(view.holdings(), view.true_holdings());
        assert_eq!(view.profit(), view.true_profit());
    }

    // ZI traders never exceed their position limit
    let limit = ZiConfig::default().max_position;
    assert!(sim.views().iter().all(|v| v.true_holdings().abs() <= Quantity::new(limit)));

    let market = &sim.markets()[0];
    if let (Some(bid), Some(ask)) = (market.quote().bid, market.quote().ask) {
        assert!(bid < ask, "book left crossed: {} / {}", bid, ask);
    }
    report.transactions
}

#[test]
fn test_500_agents_quick() {
    let transactions = run_and_check(&zi_population(500, 500));
    assert!(transactions > 0);
}

#[test]
#[ignore] // Run with: cargo test --test stress -- --ignored
fn test_10k_agents() {
    let transactions = run_and_check(&zi_population(10_000, 5_000));
    assert!(transactions > 1_000);
}
