//! The `Simulator` — owns all state and drives the five-phase tick loop.

use aim_agent::{Agent, AgentStore};
use aim_core::{AgentId, BlockId, EntityId, SimConfig, SimRng, SpaceId, Tick};
use aim_schedule::CallbackQueue;
use aim_spatial::{ConveyorSpace, SpaceManager};

use crate::block::{Block, BlockArena, BlockHook};
use crate::blocks::{
    Combine, CombineHandles, CombinePort, ConveyorBlock, PortRole, RestrictedAreaEnd,
    RestrictedAreaStart, Switch,
};
use crate::bus::EventBus;
use crate::ctx::{schedule_into, spawn_into, EngineCtx, ScheduledCallback, SpaceRegistry};
use crate::hooks::{AgentSpec, HookMap};
use crate::observer::{NoopObserver, SimObserver};
use crate::{SimError, SimResult};

/// Central simulation controller.
///
/// Owns the blocks, spaces, agents, event bus, callback queue and RNG, and
/// advances them through ticks `0 .. max_ticks`.  Each tick runs a fixed
/// phase sequence:
///
/// ```text
/// ① callbacks   — fire queue entries with due_tick ≤ t, (due, seq) order
/// ② spaces      — every SpaceManager advances by Δt = 1
/// ③ delivery    — events staged last tick reach their subscribers
/// ④ block ticks — registration order; ejections, retries, spawns
/// ⑤ rotation    — events emitted during ①–④ become next tick's delivery
/// ```
///
/// Delivery before block ticks lets agents react to last tick's events
/// before they are advanced this tick; callbacks first lets timers drive
/// state the block ticks will observe.
pub struct Simulator {
    config: SimConfig,
    now: Tick,
    agents: AgentStore,
    hooks: HookMap,
    blocks: BlockArena,
    spaces: SpaceRegistry,
    bus: EventBus,
    scheduler: CallbackQueue<ScheduledCallback>,
    rng: SimRng,
}

impl Simulator {
    pub fn new(max_ticks: u64, seed: u64) -> Self {
        Self::from_config(SimConfig::new(max_ticks, seed))
    }

    pub fn from_config(config: SimConfig) -> Self {
        let rng = SimRng::new(config.seed);
        Self {
            config,
            now: Tick::ZERO,
            agents: AgentStore::new(),
            hooks: HookMap::new(),
            blocks: BlockArena::new(),
            spaces: SpaceRegistry::default(),
            bus: EventBus::new(),
            scheduler: CallbackQueue::new(),
            rng,
        }
    }

    // ── Registration ──────────────────────────────────────────────────────

    /// Register a block; registration order is tick order.
    pub fn add_block<B: Block>(&mut self, block: B) -> BlockId {
        self.blocks.add(Box::new(block))
    }

    /// Register a conveyor block after validating that `space` is a
    /// conveyor space and both entities belong to its graph.
    pub fn add_conveyor_block(
        &mut self,
        space: SpaceId,
        start: EntityId,
        end: EntityId,
    ) -> SimResult<BlockId> {
        let sp = self.spaces.get(space)?;
        let conveyor = sp
            .as_any()
            .downcast_ref::<ConveyorSpace>()
            .ok_or(SimError::SpaceTypeMismatch {
                space,
                expected: "ConveyorSpace",
            })?;
        conveyor.graph().entity(start)?;
        conveyor.graph().entity(end)?;
        Ok(self.add_block(ConveyorBlock::new(space, start, end)))
    }

    /// Register a combine block together with its two input ports.
    pub fn add_combine(&mut self, max_pickups: usize) -> CombineHandles {
        let block = self.add_block(Combine::new(max_pickups));
        let container = self.add_block(CombinePort::new(block, PortRole::Container));
        let pickup = self.add_block(CombinePort::new(block, PortRole::Pickup));
        CombineHandles {
            block,
            container,
            pickup,
        }
    }

    /// Register a spatial substrate.
    pub fn add_space<S: SpaceManager>(&mut self, space: S) -> SpaceId {
        self.spaces.add(Box::new(space))
    }

    /// Create an agent outside any source block.
    pub fn add_agent(&mut self, spec: AgentSpec) -> AgentId {
        spawn_into(&mut self.agents, &mut self.hooks, spec)
    }

    // ── Wiring ────────────────────────────────────────────────────────────

    /// Connect `from`'s slot 0 to `to`.
    pub fn connect(&mut self, from: BlockId, to: BlockId) -> SimResult<()> {
        self.connect_slot(from, 0, to)
    }

    /// Connect an explicit output slot.
    pub fn connect_slot(&mut self, from: BlockId, slot: usize, to: BlockId) -> SimResult<()> {
        self.blocks.get(to)?;
        self.blocks.get_mut(from)?.common_mut().set_output(slot, to);
        Ok(())
    }

    /// Branching sugar: slot 0 (the "true" / container branch).
    pub fn connect_first(&mut self, from: BlockId, to: BlockId) -> SimResult<()> {
        self.connect_slot(from, 0, to)
    }

    /// Branching sugar: slot 1 (the "false" / children branch).
    pub fn connect_second(&mut self, from: BlockId, to: BlockId) -> SimResult<()> {
        self.connect_slot(from, 1, to)
    }

    /// Register a switch route for `key`.
    pub fn connect_keyed(&mut self, switch: BlockId, key: &str, to: BlockId) -> SimResult<()> {
        self.blocks.get(to)?;
        let block = self.blocks.get_mut(switch)?;
        let switch_ref =
            block
                .as_any_mut()
                .downcast_mut::<Switch>()
                .ok_or(SimError::BlockTypeMismatch {
                    block: switch,
                    expected: "Switch",
                })?;
        switch_ref.route(key, to);
        Ok(())
    }

    /// Bind a restricted-area pair: they share the occupancy counter from
    /// here on.
    pub fn bind_restricted(&mut self, start: BlockId, end: BlockId) -> SimResult<()> {
        let counter = {
            let block = self.blocks.get_mut(start)?;
            let start_ref = block
                .as_any_mut()
                .downcast_mut::<RestrictedAreaStart>()
                .ok_or(SimError::BlockTypeMismatch {
                    block: start,
                    expected: "RestrictedAreaStart",
                })?;
            start_ref.bind_end(end);
            start_ref.counter()
        };
        let block = self.blocks.get_mut(end)?;
        let end_ref = block
            .as_any_mut()
            .downcast_mut::<RestrictedAreaEnd>()
            .ok_or(SimError::BlockTypeMismatch {
                block: end,
                expected: "RestrictedAreaEnd",
            })?;
        end_ref.bind(counter);
        Ok(())
    }

    /// Install a block-level `on_enter` callback.
    pub fn set_on_enter<F>(&mut self, block: BlockId, hook: F) -> SimResult<()>
    where
        F: FnMut(&mut Agent, &mut crate::HookCtx<'_>) + 'static,
    {
        self.blocks.get_mut(block)?.common_mut().on_enter = Some(Box::new(hook) as BlockHook);
        Ok(())
    }

    /// Install a block-level `on_exit` callback.
    pub fn set_on_exit<F>(&mut self, block: BlockId, hook: F) -> SimResult<()>
    where
        F: FnMut(&mut Agent, &mut crate::HookCtx<'_>) + 'static,
    {
        self.blocks.get_mut(block)?.common_mut().on_exit = Some(Box::new(hook) as BlockHook);
        Ok(())
    }

    // ── Events and schedules ──────────────────────────────────────────────

    /// Subscribe an agent to the exact tag `event`.
    pub fn subscribe(&mut self, agent: AgentId, event: &str) -> SimResult<()> {
        if event.is_empty() {
            return Err(SimError::EmptyEvent);
        }
        self.agents.agent(agent)?;
        self.bus.subscribe(agent, event);
        Ok(())
    }

    /// Queue `callback` to fire `delay_ticks` from the current tick; with
    /// `recurring`, re-fire every `delay_ticks` thereafter.  Entries due at
    /// or beyond `max_ticks` never fire.
    pub fn schedule_event<F>(
        &mut self,
        callback: F,
        delay_ticks: u64,
        recurring: bool,
    ) -> SimResult<()>
    where
        F: FnMut(Tick, &mut EngineCtx<'_>) -> SimResult<()> + 'static,
    {
        schedule_into(&mut self.scheduler, self.now, callback, delay_ticks, recurring)
    }

    // ── Inspection ────────────────────────────────────────────────────────

    pub fn current_tick(&self) -> Tick {
        self.now
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn agents(&self) -> &AgentStore {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> SimResult<&Agent> {
        Ok(self.agents.agent(id)?)
    }

    /// Number of registered blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Untyped shared access to a block.
    pub fn block_dyn(&self, id: BlockId) -> SimResult<&dyn Block> {
        self.blocks.get(id)
    }

    /// Typed shared access to a block (observer/test inspection).
    pub fn block<B: Block>(&self, id: BlockId) -> SimResult<&B> {
        let block = self.blocks.get(id)?;
        block
            .as_any()
            .downcast_ref::<B>()
            .ok_or(SimError::BlockTypeMismatch {
                block: id,
                expected: std::any::type_name::<B>(),
            })
    }

    /// Typed exclusive access to a block (wiring-time configuration).
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

    /// Typed shared access to a space.
    pub fn space<S: SpaceManager>(&self, id: SpaceId) -> SimResult<&S> {
        let space = self.spaces.get(id)?;
        space
            .as_any()
            .downcast_ref::<S>()
            .ok_or(SimError::SpaceTypeMismatch {
                space: id,
                expected: std::any::type_name::<S>(),
            })
    }

    // ── Running ───────────────────────────────────────────────────────────

    /// Run to completion without observation.
    pub fn run(&mut self) -> SimResult<()> {
        self.run_with(&mut NoopObserver)
    }

    /// Run to completion, reporting tick boundaries to `observer`.
    pub fn run_with<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        while self.now < self.config.end_tick() {
            observer.on_tick_start(self.now);
            self.process_tick()?;
            observer.on_tick_end(self.now, &self.agents);
            self.now = self.now + 1;
        }
        observer.on_sim_end(self.now);
        Ok(())
    }

    /// Step exactly `n` ticks from the current position, ignoring
    /// `max_ticks`.  Useful for tests and incremental observation.
    pub fn run_ticks<O: SimObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<()> {
        for _ in 0..n {
            observer.on_tick_start(self.now);
            self.process_tick()?;
            observer.on_tick_end(self.now, &self.agents);
            self.now = self.now + 1;
        }
        Ok(())
    }

    // ── Tick phases ───────────────────────────────────────────────────────

    fn process_tick(&mut self) -> SimResult<()> {
        self.fire_callbacks()?;
        self.update_spaces();
        self.deliver_events()?;
        self.tick_blocks()?;
        // Phase ⑤: everything emitted this tick is staged for the next.
        self.bus.collect(&mut self.agents);
        Ok(())
    }

    /// Phase ①.  The due batch is drawn before any callback runs, so
    /// entries scheduled during the batch — even with zero delay — wait
    /// for the next tick.
    fn fire_callbacks(&mut self) -> SimResult<()> {
        let batch = self.scheduler.pop_due(self.now);
        for mut entry in batch {
            {
                let mut ctx = self.engine_ctx();
                let now = ctx.now;
                (entry.callback)(now, &mut ctx)?;
            }
            if entry.recurring {
                self.scheduler
                    .push(entry.due + entry.period, entry.callback, true, entry.period);
            }
        }
        Ok(())
    }

    /// Phase ②.
    fn update_spaces(&mut self) {
        for space in self.spaces.iter_mut() {
            space.update(&mut self.agents, 1.0);
        }
    }

    /// Phase ③.  Delivery order: emission order × subscriber registration
    /// order.  Destroyed subscribers are skipped silently.
    fn deliver_events(&mut self) -> SimResult<()> {
        let staged = self.bus.take_staged();
        for (event, _emitter) in staged {
            let subscribers = self.bus.subscribers(&event).to_vec();
            for agent in subscribers {
                let Some(agent_ref) = self.agents.get_mut(agent) else {
                    continue;
                };
                agent_ref.record_delivery(self.now, &event);

                if let Some(mut agent_hooks) = self.hooks.remove(&agent) {
                    let mut hctx = crate::HookCtx {
                        now: self.now,
                        bus: &mut self.bus,
                        scheduler: &mut self.scheduler,
                        rng: &mut self.rng,
                    };
                    if let Some(agent_ref) = self.agents.get_mut(agent) {
                        agent_hooks.on_event(agent_ref, &event, &mut hctx);
                    }
                    self.hooks.insert(agent, agent_hooks);
                }
            }
        }
        Ok(())
    }

    /// Phase ④.  Blocks tick in registration order; the active block is
    /// checked out of the arena so its `tick` can send agents into others.
    fn tick_blocks(&mut self) -> SimResult<()> {
        let count = self.blocks.len();
        for index in 0..count {
            let id = BlockId(index as u32);
            let mut block = self.blocks.checkout(id)?;
            let result = {
                let mut ctx = self.engine_ctx();
                block.tick(&mut ctx)
            };
            self.blocks.restore(id, block);
            result?;
        }
        Ok(())
    }

    fn engine_ctx(&mut self) -> EngineCtx<'_> {
        EngineCtx {
            now: self.now,
            agents: &mut self.agents,
            hooks: &mut self.hooks,
            blocks: &mut self.blocks,
            spaces: &mut self.spaces,
            bus: &mut self.bus,
            scheduler: &mut self.scheduler,
            rng: &mut self.rng,
        }
    }
}
