//! End-to-end trading scenarios through the public simulation API

use matching_engine::PricingRule;
use simulation::agent::Agent;
use simulation::engine::Simulation;
use simulation::fundamental::ConstantFundamental;
use simulation::market::MarketKind;
use simulation::scheduler::{ErrorPolicy, TieBreak};
use types::errors::{OrderError, SimError};
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

fn simulation(kind: MarketKind, rule: PricingRule) -> (Simulation, MarketId) {
    let mut sim = Simulation::new(
        TieBreak::Fifo,
        ErrorPolicy::Abort,
        3,
        Box::new(ConstantFundamental::new(Price::new(100))),
    );
    let market = sim.add_market(kind, rule).unwrap();
    (sim, market)
}

fn trader(sim: &mut Simulation, market: MarketId) -> (AgentId, ViewId) {
    let agent = sim.add_agent(Box::new(Passive));
    let view = sim.open_view(agent, market, TimeStamp::ZERO).unwrap();
    (agent, view)
}

fn submit(sim: &mut Simulation, agent: AgentId, view: ViewId, side: Side, price: i64, qty: i64) -> Result<(), SimError> {
    sim.act(agent, |ctx| ctx.submit_order(view, side, Price::new(price), Quantity::new(qty)))
        .map(|_| ())
}

#[test]
fn test_simple_cross_trades_at_resting_price() {
    let (mut sim, market) = simulation(MarketKind::Continuous, PricingRule::EarliestOrder);
    let (seller, sell_view) = trader(&mut sim, market);
    let (buyer, buy_view) = trader(&mut sim, market);

    submit(&mut sim, seller, sell_view, Side::SELL, 100, 1).unwrap();
    submit(&mut sim, buyer, buy_view, Side::BUY, 110, 1).unwrap();

    let log = sim.transaction_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].price, Price::new(100));
    assert_eq!(log[0].executed_at, TimeStamp::ZERO);

    let buyer_view = sim.view(buy_view).unwrap();
    assert_eq!(buyer_view.holdings(), Quantity::new(1));
    assert_eq!(buyer_view.profit(), -100);
    let seller_view = sim.view(sell_view).unwrap();
    assert_eq!(seller_view.holdings(), Quantity::new(-1));
    assert_eq!(seller_view.profit(), 100);

    let quote = sim.market(market).unwrap().quote();
    assert_eq!(quote.bid, None);
    assert_eq!(quote.ask, None);
}

#[test]
fn test_call_market_clears_at_interval() {
    let kind = MarketKind::Call { clear_interval: TimeStamp::new(10) };
    let (mut sim, market) = simulation(kind, PricingRule::split_difference());
    let (buyer, buy_view) = trader(&mut sim, market);
    let (seller, sell_view) = trader(&mut sim, market);

    submit(&mut sim, buyer, buy_view, Side::BUY, 120, 1).unwrap();
    submit(&mut sim, seller, sell_view, Side::SELL, 100, 1).unwrap();
    assert!(sim.transaction_log().is_empty());

    sim.run_until(TimeStamp::new(9)).unwrap();
    assert!(sim.transaction_log().is_empty());
    assert_eq!(sim.market(market).unwrap().order_count(), 2);

    sim.run_until(TimeStamp::new(10)).unwrap();
    let log = sim.transaction_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].price, Price::new(110));
    assert_eq!(log[0].executed_at, TimeStamp::new(10));
    assert_eq!(sim.view(buy_view).unwrap().profit(), -110);
}

#[test]
fn test_repeated_clears_do_not_trade_twice() {
    let kind = MarketKind::Call { clear_interval: TimeStamp::new(5) };
    let (mut sim, market) = simulation(kind, PricingRule::split_difference());
    let (buyer, buy_view) = trader(&mut sim, market);
    let (seller, sell_view) = trader(&mut sim, market);

    submit(&mut sim, buyer, buy_view, Side::BUY, 120, 1).unwrap();
    submit(&mut sim, seller, sell_view, Side::SELL, 100, 1).unwrap();
    sim.run_until(TimeStamp::new(30)).unwrap();

    assert_eq!(sim.transaction_log().len(), 1);
    assert_eq!(sim.market(market).unwrap().stats().volume, 1);
}

#[test]
fn test_partial_fill_keeps_the_residual_order() {
    let (mut sim, market) = simulation(MarketKind::Continuous, PricingRule::EarliestOrder);
    let (seller, sell_view) = trader(&mut sim, market);
    let (buyer, buy_view) = trader(&mut sim, market);

    submit(&mut sim, seller, sell_view, Side::SELL, 100, 3).unwrap();
    submit(&mut sim, buyer, buy_view, Side::BUY, 100, 2).unwrap();

    assert_eq!(sim.transaction_log()[0].quantity, Quantity::new(2));
    let active = sim.view(sell_view).unwrap().active_orders().clone();
    assert_eq!(active.len(), 1);
    let (order, record) = active.iter().next().unwrap();
    assert_eq!(record.quantity, Quantity::new(1));
    assert_eq!(sim.market(market).unwrap().order(*order).unwrap().quantity, Quantity::new(1));
    assert_eq!(sim.market(market).unwrap().depth(Side::SELL), Quantity::new(1));
    assert_eq!(sim.market(market).unwrap().quote().ask, Some(Price::new(100)));
    assert!(sim.view(buy_view).unwrap().active_orders().is_empty());
}

#[test]
fn test_invalid_orders_leave_the_book_untouched() {
    let (mut sim, market) = simulation(MarketKind::Continuous, PricingRule::EarliestOrder);
    let (agent, view) = trader(&mut sim, market);

    assert_eq!(
        submit(&mut sim, agent, view, Side::BUY, 100, 0),
        Err(SimError::Order(OrderError::InvalidQuantity(Quantity::ZERO)))
    );
    assert_eq!(
        submit(&mut sim, agent, view, Side::SELL, -5, 1),
        Err(SimError::Order(OrderError::InvalidPrice(Price::new(-5))))
    );
    assert_eq!(sim.market(market).unwrap().order_count(), 0);
    assert!(sim.view(view).unwrap().active_orders().is_empty());
}

#[test]
fn test_withdraw_through_the_view() {
    let (mut sim, market) = simulation(MarketKind::Continuous, PricingRule::EarliestOrder);
    let (agent, view) = trader(&mut sim, market);

    let order = sim
        .act(agent, |ctx| ctx.submit_order(view, Side::BUY, Price::new(95), Quantity::new(4)))
        .unwrap();
    sim.act(agent, |ctx| ctx.withdraw_order(view, order, Some(Quantity::new(1)))).unwrap();
    assert_eq!(sim.view(view).unwrap().active_order(order).unwrap().quantity, Quantity::new(3));
    assert_eq!(sim.market(market).unwrap().depth(Side::BUY), Quantity::new(3));

    sim.act(agent, |ctx| ctx.withdraw_all(view)).unwrap();
    assert!(sim.view(view).unwrap().active_orders().is_empty());
    assert!(!sim.market(market).unwrap().contains(order));
    assert_eq!(sim.view(view).unwrap().quote().bid, None);
}

#[test]
fn test_closed_market_rejects_orders() {
    let (mut sim, market) = simulation(MarketKind::Continuous, PricingRule::EarliestOrder);
    let (agent, view) = trader(&mut sim, market);
    sim.run_until(TimeStamp::new(4)).unwrap();
    sim.finish();

    assert_eq!(
        submit(&mut sim, agent, view, Side::BUY, 100, 1),
        Err(SimError::MarketClosed { market })
    );
    assert_eq!(sim.current_time(), TimeStamp::new(4));
}
