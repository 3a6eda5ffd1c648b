//! Simulation driver
//!
//! [`Simulation`] owns the scheduler, the markets, the views, and the agents.
//! Activities are executed against a [`World`] holding everything except
//! the agents. Agents are taken out of their slot while they run, so an
//! agent can never be re-entered.
//!
//! Notices bound for an agent are queued in the world's outbox and handed
//! to the agent after the activity or action that produced them returns.

use matching_engine::PricingRule;
use std::collections::VecDeque;
use tracing::{debug, error, info, trace, warn};
use types::errors::{ConfigError, OrderError, SimError};
use types::ids::{AgentId, IdSource, MarketId, OrderId, ViewId};
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::time::TimeStamp;
use types::trade::Transaction;

use crate::activity::{Activity, Notice};
use crate::agent::{Agent, AgentContext};
use crate::fundamental::Fundamental;
use crate::market::{Market, MarketKind, MarketUpdate};
use crate::scheduler::{ErrorPolicy, Execute, Scheduler, SchedulerStats, TieBreak};
use crate::view::{MarketView, ViewKind};

/// Everything activities act on, apart from the agents
pub struct World {
    ids: IdSource,
    markets: Vec<Market>,
    views: Vec<MarketView>,
    fundamental: Box<dyn Fundamental>,
    outbox: VecDeque<(ViewId, Notice)>,
    log: Vec<Transaction>,
}

impl World {
    fn new(fundamental: Box<dyn Fundamental>) -> Self {
        Self {
            ids: IdSource::new(),
            markets: Vec::new(),
            views: Vec::new(),
            fundamental,
            outbox: VecDeque::new(),
            log: Vec::new(),
        }
    }

    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    pub fn views(&self) -> &[MarketView] {
        &self.views
    }

    pub fn market(&self, id: MarketId) -> Result<&Market, SimError> {
        self.markets.get(id.index()).ok_or(SimError::unknown_market(id))
    }

    pub fn view(&self, id: ViewId) -> Result<&MarketView, SimError> {
        self.views.get(id.index()).ok_or(SimError::unknown_view(id))
    }

    fn market_mut(&mut self, id: MarketId) -> Result<&mut Market, SimError> {
        self.markets.get_mut(id.index()).ok_or(SimError::unknown_market(id))
    }

    fn view_mut(&mut self, id: ViewId) -> Result<&mut MarketView, SimError> {
        self.views.get_mut(id.index()).ok_or(SimError::unknown_view(id))
    }

    pub(crate) fn fundamental_at(&mut self, time: TimeStamp) -> Price {
        self.fundamental.value_at(time)
    }

    pub(crate) fn submit(
        &mut self,
        view: ViewId,
        side: Side,
        price: Price,
        quantity: Quantity,
        scheduler: &mut Scheduler<Activity>,
    ) -> Result<OrderId, SimError> {
        MarketView::check_order(price, quantity)?;
        let (market, latency) = {
            let found = self.view(view)?;
            (found.market(), found.latency())
        };
        if self.market(market)?.is_closed() {
            return Err(SimError::MarketClosed { market });
        }

        let now = scheduler.current_time();
        let order = self.ids.next_order_id();
        self.view_mut(view)?.open_order(order, side, price, quantity, now);
        trace!(view = %view, order = %order, side = %side, price = %price, quantity = %quantity, time = %now, "order submitted");

        if latency == TimeStamp::ZERO {
            self.arrive(view, order, scheduler)?;
        } else {
            scheduler.schedule_in(latency, Activity::SubmitArrival { view, order })?;
        }
        Ok(order)
    }

    pub(crate) fn withdraw(
        &mut self,
        view: ViewId,
        order: OrderId,
        quantity: Option<Quantity>,
        scheduler: &mut Scheduler<Activity>,
    ) -> Result<(), SimError> {
        let found = self.view(view)?;
        let record = found
            .active_order(order)
            .ok_or(OrderError::NotFound { order_id: order })?;
        let quantity = quantity.unwrap_or(record.quantity);
        if !quantity.is_positive() {
            return Err(OrderError::InvalidQuantity(quantity).into());
        }

        let latency = found.latency();
        if latency == TimeStamp::ZERO {
            self.withdraw_arrival(view, order, quantity, scheduler)
        } else {
            scheduler.schedule_in(latency, Activity::WithdrawArrival { view, order, quantity })
        }
    }

    /// A submission reaches the book
    fn arrive(&mut self, view: ViewId, order: OrderId, scheduler: &mut Scheduler<Activity>) -> Result<(), SimError> {
        let now = scheduler.current_time();
        let found = self.view(view)?;
        let Some(record) = found.active_order(order).copied() else {
            warn!(view = %view, order = %order, time = %now, "order gone before reaching the book");
            return Ok(());
        };
        let market = found.market();

        let fundamental = self.fundamental.value_at(now);
        let entered = self.market_mut(market)?.submit(
            view,
            order,
            record.side,
            record.price,
            record.quantity,
            now,
            fundamental,
        );
        let update = match entered {
            Ok(update) => update,
            Err(err) => {
                // Rejected at the book: the view stops tracking it
                self.view_mut(view)?.forget_order(order);
                return Err(err);
            }
        };
        self.publish(view, Notice::Submitted { order }, scheduler)?;
        self.apply_update(market, update, scheduler)
    }

    /// A withdrawal reaches the book
    fn withdraw_arrival(
        &mut self,
        view: ViewId,
        order: OrderId,
        quantity: Quantity,
        scheduler: &mut Scheduler<Activity>,
    ) -> Result<(), SimError> {
        let now = scheduler.current_time();
        let market = self.view(view)?.market();
        let target = self.market_mut(market)?;
        if !target.contains(order) {
            warn!(view = %view, order = %order, time = %now, "withdrawal arrived after the order left the book");
            return Ok(());
        }

        let (removed, update) = target.withdraw(order, quantity, now)?;
        self.publish(view, Notice::Withdrawn { order, quantity: removed }, scheduler)?;
        self.apply_update(market, update, scheduler)
    }

    fn clear_market(&mut self, market: MarketId, scheduler: &mut Scheduler<Activity>) -> Result<(), SimError> {
        let now = scheduler.current_time();
        let fundamental = self.fundamental.value_at(now);
        let update = self.market_mut(market)?.clear(now, fundamental)?;
        self.apply_update(market, update, scheduler)
    }

    /// A notice reaches a latent view
    fn deliver(&mut self, view: ViewId, notice: Notice) -> Result<(), SimError> {
        if self.view_mut(view)?.observe(&notice) {
            self.outbox.push_back((view, notice));
        }
        Ok(())
    }

    /// Fan a market update out to the views concerned
    fn apply_update(
        &mut self,
        market: MarketId,
        update: MarketUpdate,
        scheduler: &mut Scheduler<Activity>,
    ) -> Result<(), SimError> {
        for execution in &update.executions {
            let price = execution.transaction.price;
            for fill in [execution.buy, execution.sell] {
                self.view_mut(fill.view)?.record_fill(fill.side, price, fill.quantity);
                let notice = Notice::Transacted {
                    order: fill.order,
                    side: fill.side,
                    price,
                    quantity: fill.quantity,
                };
                self.publish(fill.view, notice, scheduler)?;
            }
            self.log.push(execution.transaction);
        }

        let subscribers = self.market(market)?.views().to_vec();
        for execution in &update.executions {
            for view in &subscribers {
                self.publish(*view, Notice::Transaction { transaction: execution.transaction }, scheduler)?;
            }
        }
        if let Some(quote) = update.quote {
            for view in &subscribers {
                self.publish(*view, Notice::QuoteUpdated { quote }, scheduler)?;
            }
        }
        if let Some(at) = update.clear_at {
            scheduler.schedule_activities(at, [Activity::Clear { market }]);
        }
        Ok(())
    }

    /// Route a notice through a view: at once when immediate, one latency
    /// later when latent
    fn publish(&mut self, view: ViewId, notice: Notice, scheduler: &mut Scheduler<Activity>) -> Result<(), SimError> {
        let kind = self.view(view)?.kind();
        match kind {
            ViewKind::Immediate => self.deliver(view, notice),
            ViewKind::Latent { latency } => scheduler.schedule_in(latency, Activity::Deliver { view, notice }),
        }
    }
}

struct Dispatch {
    world: World,
    agents: Vec<Option<Box<dyn Agent>>>,
}

impl Dispatch {
    fn call<F>(&mut self, agent: AgentId, scheduler: &mut Scheduler<Activity>, f: F) -> Result<(), SimError>
    where
        F: FnOnce(&mut dyn Agent, &mut AgentContext<'_>) -> Result<(), SimError>,
    {
        let slot = self
            .agents
            .get_mut(agent.index())
            .ok_or(SimError::unknown_agent(agent))?;
        let mut taken = slot.take().ok_or(SimError::AgentBusy { agent })?;

        let result = {
            let mut ctx = AgentContext::new(&mut self.world, scheduler, agent);
            f(taken.as_mut(), &mut ctx)
        };
        self.agents[agent.index()] = Some(taken);
        result
    }

    fn notify(&mut self, view: ViewId, notice: Notice, scheduler: &mut Scheduler<Activity>) -> Result<(), SimError> {
        let agent = self.world.view(view)?.agent();
        trace!(agent = %agent, view = %view, notice = notice.kind(), time = %scheduler.current_time(), "notice");
        self.call(agent, scheduler, |target, ctx| match notice {
            Notice::Submitted { order } => target.on_order_submitted(ctx, view, order),
            Notice::Withdrawn { order, quantity } => target.on_order_withdrawn(ctx, view, order, quantity),
            Notice::Transacted { order, price, quantity, .. } => {
                target.on_order_transacted(ctx, view, order, price, quantity)
            }
            Notice::QuoteUpdated { quote } => target.on_quote_updated(ctx, view, &quote),
            Notice::Transaction { transaction } => target.on_transaction(ctx, view, &transaction),
        })
    }

    /// Hand every queued notice to its agent.
    ///
    /// A failing callback does not hold back the remaining notices; the first
    /// error is returned once the queue is empty.
    fn flush(&mut self, scheduler: &mut Scheduler<Activity>) -> Result<(), SimError> {
        let mut first_error = None;
        while let Some((view, notice)) = self.world.outbox.pop_front() {
            if let Err(err) = self.notify(view, notice, scheduler) {
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    error!(view = %view, error = %err, "notice callback failed");
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Execute<Activity> for Dispatch {
    fn execute(&mut self, activity: Activity, scheduler: &mut Scheduler<Activity>) -> Result<(), SimError> {
        let result = match activity {
            Activity::Wake { agent } => self.call(agent, scheduler, |target, ctx| target.on_wake(ctx)),
            Activity::SubmitArrival { view, order } => self.world.arrive(view, order, scheduler),
            Activity::WithdrawArrival { view, order, quantity } => {
                self.world.withdraw_arrival(view, order, quantity, scheduler)
            }
            Activity::Clear { market } => self.world.clear_market(market, scheduler),
            Activity::Deliver { view, notice } => self.world.deliver(view, notice),
        };
        let flushed = self.flush(scheduler);
        result.and(flushed)
    }
}

pub struct Simulation {
    scheduler: Scheduler<Activity>,
    dispatch: Dispatch,
    finished: bool,
}

impl Simulation {
    pub fn new(tie_break: TieBreak, error_policy: ErrorPolicy, seed: u64, fundamental: Box<dyn Fundamental>) -> Self {
        Self {
            scheduler: Scheduler::new(tie_break, error_policy, seed),
            dispatch: Dispatch {
                world: World::new(fundamental),
                agents: Vec::new(),
            },
            finished: false,
        }
    }

    pub fn add_market(&mut self, kind: MarketKind, rule: PricingRule) -> Result<MarketId, SimError> {
        let world = &mut self.dispatch.world;
        let id = world.ids.next_market_id();
        world.markets.push(Market::new(id, kind, rule)?);
        debug!(market = %id, kind = ?kind, "market added");
        Ok(id)
    }

    pub fn add_agent(&mut self, agent: Box<dyn Agent>) -> AgentId {
        let id = self.dispatch.world.ids.next_agent_id();
        self.dispatch.agents.push(Some(agent));
        id
    }

    /// Give `agent` a view onto `market` with the given one-way latency
    pub fn open_view(&mut self, agent: AgentId, market: MarketId, latency: TimeStamp) -> Result<ViewId, SimError> {
        if agent.index() >= self.dispatch.agents.len() {
            return Err(SimError::unknown_agent(agent));
        }
        self.attach_view(agent, market, latency)
    }

    /// Add an agent that is built knowing its own id and its view
    pub fn spawn_agent<F>(
        &mut self,
        market: MarketId,
        latency: TimeStamp,
        build: F,
    ) -> Result<(AgentId, ViewId), SimError>
    where
        F: FnOnce(AgentId, ViewId) -> Box<dyn Agent>,
    {
        self.dispatch.world.market(market)?;
        if !latency.is_valid_delay() {
            return Err(ConfigError::InvalidLatency(latency.ticks()).into());
        }
        let agent = self.dispatch.world.ids.next_agent_id();
        self.dispatch.agents.push(None);
        let view = self.attach_view(agent, market, latency)?;
        self.dispatch.agents[agent.index()] = Some(build(agent, view));
        Ok((agent, view))
    }

    fn attach_view(&mut self, agent: AgentId, market: MarketId, latency: TimeStamp) -> Result<ViewId, SimError> {
        let world = &mut self.dispatch.world;
        world.market(market)?;
        // Validate before taking an id so a rejected view leaves no gap
        if !latency.is_valid_delay() {
            return Err(ConfigError::InvalidLatency(latency.ticks()).into());
        }
        let id = world.ids.next_view_id();
        world.views.push(MarketView::new(id, agent, market, latency)?);
        world.market_mut(market)?.register_view(id);
        Ok(id)
    }

    pub fn wake_at(&mut self, agent: AgentId, time: TimeStamp) -> Result<(), SimError> {
        if agent.index() >= self.dispatch.agents.len() {
            return Err(SimError::unknown_agent(agent));
        }
        self.scheduler.schedule_activities(time, [Activity::Wake { agent }]);
        Ok(())
    }

    /// Run every activity up to and including `time`
    pub fn run_until(&mut self, time: TimeStamp) -> Result<(), SimError> {
        self.scheduler.execute_until(time, &mut self.dispatch)
    }

    /// Act as `agent` from outside the event loop, then deliver any
    /// immediate notices the action produced
    pub fn act<R, F>(&mut self, agent: AgentId, f: F) -> Result<R, SimError>
    where
        F: FnOnce(&mut AgentContext<'_>) -> Result<R, SimError>,
    {
        if agent.index() >= self.dispatch.agents.len() {
            return Err(SimError::unknown_agent(agent));
        }
        let result = {
            let mut ctx = AgentContext::new(&mut self.dispatch.world, &mut self.scheduler, agent);
            f(&mut ctx)
        };
        let flushed = self.dispatch.flush(&mut self.scheduler);
        let value = result?;
        flushed?;
        Ok(value)
    }

    /// Close every market; nothing can trade afterwards
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        for market in &mut self.dispatch.world.markets {
            market.close();
        }
        self.finished = true;
        let stats = self.scheduler.stats();
        info!(
            time = %self.scheduler.current_time(),
            transactions = self.dispatch.world.log.len(),
            executed = stats.executed,
            failed = stats.failed,
            "simulation finished"
        );
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn current_time(&self) -> TimeStamp {
        self.scheduler.current_time()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn market(&self, id: MarketId) -> Result<&Market, SimError> {
        self.dispatch.world.market(id)
    }

    pub fn markets(&self) -> &[Market] {
        self.dispatch.world.markets()
    }

    pub fn view(&self, id: ViewId) -> Result<&MarketView, SimError> {
        self.dispatch.world.view(id)
    }

    pub fn views(&self) -> &[MarketView] {
        self.dispatch.world.views()
    }

    pub fn agent_count(&self) -> usize {
        self.dispatch.agents.len()
    }

    /// The agent in slot `id`, unless it is currently running
    pub fn agent(&self, id: AgentId) -> Option<&dyn Agent> {
        self.dispatch.agents.get(id.index())?.as_deref()
    }

    /// Every transaction of every market, in execution order
    pub fn transaction_log(&self) -> &[Transaction] {
        &self.dispatch.world.log
    }

    pub fn fundamental_at(&mut self, time: TimeStamp) -> Price {
        self.dispatch.world.fundamental_at(time)
    }
}
