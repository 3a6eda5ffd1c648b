//! Latent views: orders, withdrawals and information all travel with delay

use matching_engine::PricingRule;
use simulation::agent::Agent;
use simulation::engine::Simulation;
use simulation::fundamental::ConstantFundamental;
use simulation::market::MarketKind;
use simulation::scheduler::{ErrorPolicy, TieBreak};
use types::errors::SimError;
use types::ids::{AgentId, MarketId, ViewId};
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::time::TimeStamp;

struct Passive;

impl Agent for Passive {
    fn name(&self) -> &str {
        "passive"
    }
}

struct Setup {
    sim: Simulation,
    market: MarketId,
    slow: (AgentId, ViewId),
    fast: (AgentId, ViewId),
}

/// One agent behind a five-tick view, one with an immediate view
fn setup() -> Setup {
    let mut sim = Simulation::new(
        TieBreak::Fifo,
        ErrorPolicy::Abort,
        9,
        Box::new(ConstantFundamental::new(Price::new(100))),
    );
    let market = sim.add_market(MarketKind::Continuous, PricingRule::EarliestOrder).unwrap();
    let slow_agent = sim.add_agent(Box::new(Passive));
    let slow_view = sim.open_view(slow_agent, market, TimeStamp::new(5)).unwrap();
    let fast_agent = sim.add_agent(Box::new(Passive));
    let fast_view = sim.open_view(fast_agent, market, TimeStamp::ZERO).unwrap();
    Setup {
        sim,
        market,
        slow: (slow_agent, slow_view),
        fast: (fast_agent, fast_view),
    }
}

fn submit(sim: &mut Simulation, who: (AgentId, ViewId), side: Side, price: i64) {
    let (agent, view) = who;
    sim.act(agent, |ctx| ctx.submit_order(view, side, Price::new(price), Quantity::new(1)))
        .unwrap();
}

#[test]
fn test_order_reaches_book_after_latency() {
    let Setup { mut sim, market, slow, fast } = setup();

    submit(&mut sim, slow, Side::BUY, 100);
    assert_eq!(sim.market(market).unwrap().order_count(), 0);
    assert_eq!(sim.view(slow.1).unwrap().active_orders().len(), 1);

    sim.run_until(TimeStamp::new(3)).unwrap();
    submit(&mut sim, fast, Side::SELL, 90);
    assert!(sim.transaction_log().is_empty());

    sim.run_until(TimeStamp::new(4)).unwrap();
    assert!(sim.transaction_log().is_empty());
    assert_eq!(sim.view(slow.1).unwrap().true_holdings(), Quantity::ZERO);

    // The buy arrives at 5 and meets the resting sell at its price
    sim.run_until(TimeStamp::new(5)).unwrap();
    let log = sim.transaction_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].price, Price::new(90));
    assert_eq!(log[0].executed_at, TimeStamp::new(5));

    let slow_view = sim.view(slow.1).unwrap();
    assert_eq!(slow_view.true_holdings(), Quantity::new(1));
    assert_eq!(slow_view.holdings(), Quantity::ZERO);
    assert_eq!(sim.view(fast.1).unwrap().holdings(), Quantity::new(-1));

    sim.run_until(TimeStamp::new(9)).unwrap();
    assert_eq!(sim.view(slow.1).unwrap().holdings(), Quantity::ZERO);

    sim.run_until(TimeStamp::new(10)).unwrap();
    let slow_view = sim.view(slow.1).unwrap();
    assert_eq!(slow_view.holdings(), Quantity::new(1));
    assert_eq!(slow_view.profit(), -90);
    assert!(slow_view.active_orders().is_empty());
}

#[test]
fn test_withdrawal_loses_race_with_fill() {
    let Setup { mut sim, market, slow, fast } = setup();

    submit(&mut sim, slow, Side::BUY, 100);
    sim.run_until(TimeStamp::new(6)).unwrap();
    submit(&mut sim, fast, Side::SELL, 100);
    assert_eq!(sim.transaction_log().len(), 1);

    // The fill has not been heard of yet, so the withdrawal is accepted
    sim.run_until(TimeStamp::new(7)).unwrap();
    let (agent, view) = slow;
    sim.act(agent, |ctx| ctx.withdraw_all(view)).unwrap();

    sim.run_until(TimeStamp::new(12)).unwrap();
    assert_eq!(sim.scheduler_stats().failed, 0);
    assert_eq!(sim.market(market).unwrap().order_count(), 0);
    let slow_view = sim.view(slow.1).unwrap();
    assert_eq!(slow_view.holdings(), Quantity::new(1));
    assert!(slow_view.active_orders().is_empty());
}

#[test]
fn test_withdrawal_before_arrival_is_a_no_op() {
    let Setup { mut sim, market, slow, .. } = setup();
    let (agent, view) = slow;

    let order = sim
        .act(agent, |ctx| ctx.submit_order(view, Side::SELL, Price::new(105), Quantity::new(2)))
        .unwrap();
    sim.run_until(TimeStamp::new(2)).unwrap();
    sim.act(agent, |ctx| ctx.withdraw_order(view, order, None)).unwrap();

    // The order rests from 5 until the withdrawal lands at 7
    sim.run_until(TimeStamp::new(5)).unwrap();
    assert!(sim.market(market).unwrap().contains(order));
    sim.run_until(TimeStamp::new(7)).unwrap();
    assert!(!sim.market(market).unwrap().contains(order));

    sim.run_until(TimeStamp::new(12)).unwrap();
    assert!(sim.view(view).unwrap().active_orders().is_empty());
}

#[test]
fn test_same_action_withdrawal_follows_submit_under_shuffle() {
    for seed in 0..20 {
        let mut sim = Simulation::new(
            TieBreak::Shuffled,
            ErrorPolicy::Abort,
            seed,
            Box::new(ConstantFundamental::new(Price::new(100))),
        );
        let market = sim.add_market(MarketKind::Continuous, PricingRule::EarliestOrder).unwrap();
        let agent = sim.add_agent(Box::new(Passive));
        let view = sim.open_view(agent, market, TimeStamp::new(5)).unwrap();

        let order = sim
            .act(agent, |ctx| {
                let order = ctx.submit_order(view, Side::BUY, Price::new(100), Quantity::new(1))?;
                ctx.withdraw_order(view, order, None)?;
                Ok(order)
            })
            .unwrap();
        sim.run_until(TimeStamp::new(20)).unwrap();

        let book = sim.market(market).unwrap();
        assert!(!book.contains(order), "seed {seed}");
        assert_eq!(book.order_count(), 0, "seed {seed}");
        assert!(sim.view(view).unwrap().active_orders().is_empty(), "seed {seed}");
    }
}

#[test]
fn test_order_arriving_at_closed_market_is_forgotten() {
    let Setup { mut sim, market, slow, .. } = setup();

    submit(&mut sim, slow, Side::BUY, 100);
    assert_eq!(sim.view(slow.1).unwrap().active_orders().len(), 1);
    sim.finish();

    let err = sim.run_until(TimeStamp::new(5)).unwrap_err();
    assert_eq!(err, SimError::MarketClosed { market });
    assert!(sim.view(slow.1).unwrap().active_orders().is_empty());
    assert_eq!(sim.market(market).unwrap().order_count(), 0);
}

#[test]
fn test_quotes_arrive_late() {
    let Setup { mut sim, slow, fast, .. } = setup();

    sim.run_until(TimeStamp::new(2)).unwrap();
    submit(&mut sim, fast, Side::BUY, 95);
    assert_eq!(sim.view(fast.1).unwrap().quote().bid, Some(Price::new(95)));
    assert_eq!(sim.view(slow.1).unwrap().quote().bid, None);

    sim.run_until(TimeStamp::new(6)).unwrap();
    assert_eq!(sim.view(slow.1).unwrap().quote().bid, None);

    sim.run_until(TimeStamp::new(7)).unwrap();
    let quote = *sim.view(slow.1).unwrap().quote();
    assert_eq!(quote.bid, Some(Price::new(95)));
    assert_eq!(quote.quoted_at, TimeStamp::new(2));
}

#[test]
fn test_transaction_history_is_lagged() {
    let Setup { mut sim, slow, fast, .. } = setup();

    submit(&mut sim, fast, Side::SELL, 100);
    submit(&mut sim, slow, Side::BUY, 100);
    sim.run_until(TimeStamp::new(5)).unwrap();
    assert_eq!(sim.transaction_log().len(), 1);

    let (agent, view) = slow;
    sim.run_until(TimeStamp::new(9)).unwrap();
    let seen = sim.act(agent, |ctx| Ok(ctx.transactions(view)?.len())).unwrap();
    assert_eq!(seen, 0);

    sim.run_until(TimeStamp::new(10)).unwrap();
    let seen = sim.act(agent, |ctx| Ok(ctx.transactions(view)?.len())).unwrap();
    assert_eq!(seen, 1);

    let (agent, view) = fast;
    let seen = sim.act(agent, |ctx| Ok(ctx.transactions(view)?.len())).unwrap();
    assert_eq!(seen, 1);
}
