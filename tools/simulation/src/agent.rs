//! Agent callbacks and the context agents act through
//!
//! Strategies implement [`Agent`]. Every callback has a no-op default, so a
//! strategy only overrides what it reacts to. All actions go through an
//! [`AgentContext`], which checks that the agent owns the view it names.
//!
//! Notices are never delivered while the agent is still inside a callback
//! or an action. They are queued and handed over once control returns, so
//! an agent always holds the handle of an order before hearing that it
//! traded.

use types::errors::{OrderError, SimError};
use types::ids::{AgentId, OrderId, ViewId};
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::quote::Quote;
use types::time::TimeStamp;
use types::trade::Transaction;

use crate::activity::Activity;
use crate::engine::World;
use crate::scheduler::Scheduler;
use crate::view::{ActiveOrder, MarketView};

pub trait Agent {
    fn name(&self) -> &str;

    /// Value the agent places on holding `holdings` units at the end
    fn private_value(&self, _holdings: Quantity) -> i64 {
        0
    }

    fn on_wake(&mut self, _ctx: &mut AgentContext<'_>) -> Result<(), SimError> {
        Ok(())
    }

    fn on_order_submitted(
        &mut self,
        _ctx: &mut AgentContext<'_>,
        _view: ViewId,
        _order: OrderId,
    ) -> Result<(), SimError> {
        Ok(())
    }

    fn on_order_withdrawn(
        &mut self,
        _ctx: &mut AgentContext<'_>,
        _view: ViewId,
        _order: OrderId,
        _quantity: Quantity,
    ) -> Result<(), SimError> {
        Ok(())
    }

    fn on_order_transacted(
        &mut self,
        _ctx: &mut AgentContext<'_>,
        _view: ViewId,
        _order: OrderId,
        _price: Price,
        _quantity: Quantity,
    ) -> Result<(), SimError> {
        Ok(())
    }

    fn on_quote_updated(
        &mut self,
        _ctx: &mut AgentContext<'_>,
        _view: ViewId,
        _quote: &Quote,
    ) -> Result<(), SimError> {
        Ok(())
    }

    fn on_transaction(
        &mut self,
        _ctx: &mut AgentContext<'_>,
        _view: ViewId,
        _transaction: &Transaction,
    ) -> Result<(), SimError> {
        Ok(())
    }
}

pub struct AgentContext<'a> {
    world: &'a mut World,
    scheduler: &'a mut Scheduler<Activity>,
    agent: AgentId,
}

impl<'a> AgentContext<'a> {
    pub(crate) fn new(world: &'a mut World, scheduler: &'a mut Scheduler<Activity>, agent: AgentId) -> Self {
        Self { world, scheduler, agent }
    }

    pub fn now(&self) -> TimeStamp {
        self.scheduler.current_time()
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent
    }

    /// Schedule this agent's next wake-up
    pub fn wake_in(&mut self, delay: TimeStamp) -> Result<(), SimError> {
        self.scheduler.schedule_in(delay, Activity::Wake { agent: self.agent })
    }

    /// Views owned by this agent, in creation order
    pub fn views(&self) -> Vec<ViewId> {
        self.world
            .views()
            .iter()
            .filter(|view| view.agent() == self.agent)
            .map(|view| view.id())
            .collect()
    }

    pub fn view(&self, view: ViewId) -> Result<&MarketView, SimError> {
        let found = self.world.view(view)?;
        if found.agent() != self.agent {
            return Err(OrderError::NotOwned { view, agent: self.agent }.into());
        }
        Ok(found)
    }

    pub fn quote(&self, view: ViewId) -> Result<Quote, SimError> {
        Ok(*self.view(view)?.quote())
    }

    pub fn active_orders(&self, view: ViewId) -> Result<Vec<(OrderId, ActiveOrder)>, SimError> {
        Ok(self
            .view(view)?
            .active_orders()
            .iter()
            .map(|(id, order)| (*id, *order))
            .collect())
    }

    pub fn holdings(&self, view: ViewId) -> Result<Quantity, SimError> {
        Ok(self.view(view)?.holdings())
    }

    pub fn profit(&self, view: ViewId) -> Result<i64, SimError> {
        Ok(self.view(view)?.profit())
    }

    pub fn latency(&self, view: ViewId) -> Result<TimeStamp, SimError> {
        Ok(self.view(view)?.latency())
    }

    /// Market transactions the view can already know about
    pub fn transactions(&self, view: ViewId) -> Result<&[Transaction], SimError> {
        let found = self.view(view)?;
        let visible_until = self.now() - found.latency();
        Ok(self.world.market(found.market())?.transactions_until(visible_until))
    }

    pub fn fundamental(&mut self, time: TimeStamp) -> Price {
        self.world.fundamental_at(time)
    }

    /// Submit an order through `view`, returning its handle
    pub fn submit_order(
        &mut self,
        view: ViewId,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Result<OrderId, SimError> {
        self.view(view)?;
        self.world.submit(view, side, price, quantity, self.scheduler)
    }

    /// Withdraw `quantity` of an order, or all of what the view believes is open
    pub fn withdraw_order(
        &mut self,
        view: ViewId,
        order: OrderId,
        quantity: Option<Quantity>,
    ) -> Result<(), SimError> {
        self.view(view)?;
        self.world.withdraw(view, order, quantity, self.scheduler)
    }

    pub fn withdraw_all(&mut self, view: ViewId) -> Result<(), SimError> {
        let orders: Vec<OrderId> = self.view(view)?.active_orders().keys().copied().collect();
        for order in orders {
            self.world.withdraw(view, order, None, self.scheduler)?;
        }
        Ok(())
    }
}
