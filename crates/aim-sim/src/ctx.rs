//! `EngineCtx` — the engine surface handed to blocks and callbacks.
//!
//! Every block `take`/`tick` and every scheduled callback runs with one of
//! these.  It is a bundle of disjoint `&mut` borrows over the simulator's
//! state, minus whichever block is currently checked out of the arena, so a
//! block can synchronously deliver agents into other blocks
//! ([`EngineCtx::send`]) while mutating itself.

use aim_agent::{Agent, AgentStore};
use aim_core::{AgentId, BlockId, EntityId, SimRng, SpaceId, Tick};
use aim_schedule::CallbackQueue;
use aim_spatial::{ConveyorSpace, Placement, SpaceManager};

use crate::block::{Block, BlockArena, BlockCommon};
use crate::bus::EventBus;
use crate::hooks::{AgentSpec, HookCtx, HookMap};
use crate::{SimError, SimResult};

// ── Scheduled callbacks ───────────────────────────────────────────────────────

/// The payload type of the simulator's callback queue.  Callbacks receive
/// the current tick and the full engine context, and may schedule further
/// callbacks; entries queued during a tick fire at `t + 1` at the earliest.
pub type ScheduledCallback = Box<dyn FnMut(Tick, &mut EngineCtx<'_>) -> SimResult<()>>;

/// Validate and queue a callback relative to `now`.
///
/// A recurring entry with a zero period would fire forever within one drain
/// cycle, so it is refused outright.
pub fn schedule_into<F>(
    queue: &mut CallbackQueue<ScheduledCallback>,
    now: Tick,
    callback: F,
    delay_ticks: u64,
    recurring: bool,
) -> SimResult<()>
where
    F: FnMut(Tick, &mut EngineCtx<'_>) -> SimResult<()> + 'static,
{
    if recurring && delay_ticks == 0 {
        return Err(SimError::ZeroPeriod);
    }
    queue.push(now + delay_ticks, Box::new(callback), recurring, delay_ticks);
    Ok(())
}

// ── SpaceRegistry ─────────────────────────────────────────────────────────────

/// Id-indexed registry of spatial substrates, in registration order.
#[derive(Default)]
pub struct SpaceRegistry {
    spaces: Vec<Box<dyn SpaceManager>>,
}

impl SpaceRegistry {
    pub fn add(&mut self, space: Box<dyn SpaceManager>) -> SpaceId {
        let id = SpaceId(self.spaces.len() as u32);
        self.spaces.push(space);
        id
    }

    pub fn get(&self, id: SpaceId) -> SimResult<&dyn SpaceManager> {
        self.spaces
            .get(id.index())
            .map(|s| s.as_ref())
            .ok_or_else(|| aim_core::CoreError::SpaceNotFound(id).into())
    }

    pub fn get_mut(&mut self, id: SpaceId) -> SimResult<&mut Box<dyn SpaceManager>> {
        self.spaces
            .get_mut(id.index())
            .ok_or_else(|| aim_core::CoreError::SpaceNotFound(id).into())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn SpaceManager>> {
        self.spaces.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }
}

// ── EngineCtx ─────────────────────────────────────────────────────────────────

/// Mutable engine state visible to the currently executing block or
/// callback.
pub struct EngineCtx<'a> {
    pub now: Tick,
    pub agents: &'a mut AgentStore,
    pub hooks: &'a mut HookMap,
    pub blocks: &'a mut BlockArena,
    pub spaces: &'a mut SpaceRegistry,
    pub bus: &'a mut EventBus,
    pub scheduler: &'a mut CallbackQueue<ScheduledCallback>,
    pub rng: &'a mut SimRng,
}

impl EngineCtx<'_> {
    // ── Agent delivery ────────────────────────────────────────────────────

    /// Deliver `agent` into block `to` by invoking its `take`.
    ///
    /// The target is checked out of the arena for the duration of the call,
    /// so `take` implementations may themselves `send` onward (routing
    /// blocks).  A chain that re-enters a checked-out block fails with
    /// `RoutingCycle`.
    pub fn send(&mut self, to: BlockId, agent: AgentId) -> SimResult<()> {
        let mut block = self.blocks.checkout(to)?;
        let result = block.take(agent, self);
        self.blocks.restore(to, block);
        result
    }

    /// Withdraw an agent from whichever block currently holds it, leaving
    /// it unowned.  Rollback support for all-or-nothing deliveries.
    pub fn reclaim(&mut self, agent: AgentId) -> SimResult<()> {
        let holder = self
            .agents
            .agent(agent)?
            .current_block
            .ok_or(SimError::NotHeld { agent })?;
        let mut block = self.blocks.checkout(holder)?;
        let removed = block.reclaim(agent, self);
        self.blocks.restore(holder, block);
        if !removed? {
            return Err(SimError::NotHeld { agent });
        }
        self.agents.agent_mut(agent)?.current_block = None;
        Ok(())
    }

    // ── Admission / ejection bookkeeping ──────────────────────────────────

    /// Standard acceptance: push to the held list, repoint ownership, fire
    /// the block's `on_enter`, then the agent's `on_enter_block`.
    pub fn admit(&mut self, common: &mut BlockCommon, agent: AgentId) -> SimResult<()> {
        common.held.push_back(agent);
        self.agents.agent_mut(agent)?.current_block = Some(common.id);
        if let Some(hook) = common.on_enter.as_mut() {
            let agent_ref = self.agents.agent_mut(agent)?;
            let mut hctx = HookCtx {
                now: self.now,
                bus: &mut *self.bus,
                scheduler: &mut *self.scheduler,
                rng: &mut *self.rng,
            };
            hook(agent_ref, &mut hctx);
        }
        self.fire_agent_enter(agent, common.id)
    }

    /// Post-handoff bookkeeping on the upstream side: fire `on_exit`, then
    /// release the agent from the held list.  Call only after a successful
    /// `send`.
    pub fn finish_eject(&mut self, common: &mut BlockCommon, agent: AgentId) -> SimResult<()> {
        if let Some(hook) = common.on_exit.as_mut() {
            let agent_ref = self.agents.agent_mut(agent)?;
            let mut hctx = HookCtx {
                now: self.now,
                bus: &mut *self.bus,
                scheduler: &mut *self.scheduler,
                rng: &mut *self.rng,
            };
            hook(agent_ref, &mut hctx);
        }
        common.remove_held(agent);
        Ok(())
    }

    /// Fire the agent's `on_enter_block` hook, if one is registered.
    pub fn fire_agent_enter(&mut self, agent: AgentId, block: BlockId) -> SimResult<()> {
        if let Some(mut hooks) = self.hooks.remove(&agent) {
            let result = (|| -> SimResult<()> {
                let agent_ref = self.agents.agent_mut(agent)?;
                let mut hctx = HookCtx {
                    now: self.now,
                    bus: &mut *self.bus,
                    scheduler: &mut *self.scheduler,
                    rng: &mut *self.rng,
                };
                hooks.on_enter_block(agent_ref, block, &mut hctx);
                Ok(())
            })();
            self.hooks.insert(agent, hooks);
            result?;
        }
        Ok(())
    }

    // ── Agent lifecycle ───────────────────────────────────────────────────

    /// Create an agent from a spec.  The new agent is unowned until some
    /// block admits it.
    pub fn spawn(&mut self, spec: AgentSpec) -> AgentId {
        spawn_into(self.agents, self.hooks, spec)
    }

    /// Destroy an agent together with every child it still owns.
    pub fn destroy(&mut self, agent: AgentId) {
        let mut stack = vec![agent];
        while let Some(id) = stack.pop() {
            if let Some(removed) = self.agents.remove(id) {
                stack.extend(removed.children);
            }
            self.hooks.remove(&id);
        }
    }

    // ── Event / schedule access ───────────────────────────────────────────

    /// Subscribe `agent` to the exact tag `event`.
    pub fn subscribe(&mut self, agent: AgentId, event: &str) -> SimResult<()> {
        if event.is_empty() {
            return Err(SimError::EmptyEvent);
        }
        self.bus.subscribe(agent, event);
        Ok(())
    }

    /// Queue a callback `delay_ticks` from now.
    pub fn schedule_event<F>(&mut self, callback: F, delay_ticks: u64, recurring: bool) -> SimResult<()>
    where
        F: FnMut(Tick, &mut EngineCtx<'_>) -> SimResult<()> + 'static,
    {
        schedule_into(self.scheduler, self.now, callback, delay_ticks, recurring)
    }

    // ── Space access ──────────────────────────────────────────────────────

    /// Place `agent` into `space`; `Ok(false)` is the routine "does not fit"
    /// answer the caller converts into a rejection.
    pub fn register_in_space(
        &mut self,
        space: SpaceId,
        agent: AgentId,
        placement: &Placement,
    ) -> SimResult<bool> {
        let sp = self.spaces.get_mut(space)?;
        Ok(sp.register(self.agents, agent, placement))
    }

    /// Remove `agent` from `space` unconditionally.
    pub fn unregister_in_space(&mut self, space: SpaceId, agent: AgentId) -> SimResult<bool> {
        let sp = self.spaces.get_mut(space)?;
        Ok(sp.unregister(self.agents, agent))
    }

    /// Conveyor-specific unregister that leaves the agent alone if its
    /// transit has already moved off `entity` (same-space chaining).
    pub fn unregister_from_conveyor(
        &mut self,
        space: SpaceId,
        agent: AgentId,
        entity: EntityId,
    ) -> SimResult<bool> {
        let sp = self.spaces.get_mut(space)?;
        match sp.as_any_mut().downcast_mut::<ConveyorSpace>() {
            Some(conveyor) => Ok(conveyor.unregister_from(self.agents, agent, entity)),
            None => Err(SimError::SpaceTypeMismatch {
                space,
                expected: "ConveyorSpace",
            }),
        }
    }

    /// `true` once `agent` finished its registered transit in `space`.
    pub fn movement_complete(&self, space: SpaceId, agent: AgentId) -> SimResult<bool> {
        Ok(self.spaces.get(space)?.is_movement_complete(agent))
    }

    // ── Block access ──────────────────────────────────────────────────────

    /// Typed mutable access to a block; what scheduled callbacks use to
    /// reach toggles and counters.
    pub fn block_mut<B: Block>(&mut self, id: BlockId) -> SimResult<&mut B> {
        let block = self.blocks.get_mut(id)?;
        block
            .as_any_mut()
            .downcast_mut::<B>()
            .ok_or(SimError::BlockTypeMismatch {
                block: id,
                expected: std::any::type_name::<B>(),
            })
    }

    /// Shared access to an agent.
    pub fn agent(&self, id: AgentId) -> SimResult<&Agent> {
        Ok(self.agents.agent(id)?)
    }

    /// Exclusive access to an agent.
    pub fn agent_mut(&mut self, id: AgentId) -> SimResult<&mut Agent> {
        Ok(self.agents.agent_mut(id)?)
    }
}

/// Shared spawn path for `EngineCtx::spawn` and `Simulator::add_agent`.
pub(crate) fn spawn_into(agents: &mut AgentStore, hooks: &mut HookMap, spec: AgentSpec) -> AgentId {
    let id = agents.insert(spec.width, spec.length);
    if let Some(agent) = agents.get_mut(id) {
        agent.props = spec.props;
    }
    if let Some(h) = spec.hooks {
        hooks.insert(id, h);
    }
    id
}
