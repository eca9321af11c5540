//! Agent hooks — the capability surface through which the engine calls
//! back into user code on behalf of an agent.
//!
//! Agents themselves are plain data; anything reactive about them lives in
//! an `AgentHooks` implementation registered alongside the agent.  Hooks
//! run synchronously inside the engine phase that triggered them and get a
//! [`HookCtx`] limited to the facilities user code may safely touch there:
//! subscriptions, scheduling, and the simulation RNG.  Emitting events goes
//! through the agent itself (`Agent::emit_event`), which only stages them.

use std::collections::{BTreeMap, HashMap};

use aim_agent::{Agent, PropValue};
use aim_core::{AgentId, BlockId, SimRng, Tick};
use aim_schedule::CallbackQueue;

use crate::bus::EventBus;
use crate::ctx::{schedule_into, ScheduledCallback};
use crate::{SimError, SimResult};

// ── AgentHooks ────────────────────────────────────────────────────────────────

/// Per-agent reaction hooks.  All methods default to no-ops.
pub trait AgentHooks: 'static {
    /// Called after the agent has been accepted into `block`.
    fn on_enter_block(&mut self, _agent: &mut Agent, _block: BlockId, _ctx: &mut HookCtx<'_>) {}

    /// Called when a subscribed event is delivered to the agent.
    fn on_event(&mut self, _agent: &mut Agent, _event: &str, _ctx: &mut HookCtx<'_>) {}
}

/// Hook registry, parallel to the agent store.
pub type HookMap = HashMap<AgentId, Box<dyn AgentHooks>>;

// ── HookCtx ───────────────────────────────────────────────────────────────────

/// Engine facilities available to user hooks and block callbacks.
pub struct HookCtx<'a> {
    pub now: Tick,
    pub bus: &'a mut EventBus,
    pub scheduler: &'a mut CallbackQueue<ScheduledCallback>,
    pub rng: &'a mut SimRng,
}

impl HookCtx<'_> {
    /// Subscribe `agent` to the exact tag `event`.
    pub fn subscribe(&mut self, agent: AgentId, event: &str) -> SimResult<()> {
        if event.is_empty() {
            return Err(SimError::EmptyEvent);
        }
        self.bus.subscribe(agent, event);
        Ok(())
    }

    /// Queue a callback `delay_ticks` from now; see
    /// [`Simulator::schedule_event`][crate::Simulator::schedule_event].
    pub fn schedule_event<F>(&mut self, callback: F, delay_ticks: u64, recurring: bool) -> SimResult<()>
    where
        F: FnMut(Tick, &mut crate::EngineCtx<'_>) -> SimResult<()> + 'static,
    {
        schedule_into(self.scheduler, self.now, callback, delay_ticks, recurring)
    }
}

// ── AgentSpec ─────────────────────────────────────────────────────────────────

/// Blueprint for a new agent: dimensions, user properties, hooks.
///
/// Source blocks hold a factory returning these; scenario code passes them
/// to [`Simulator::add_agent`][crate::Simulator::add_agent] directly.
#[derive(Default)]
pub struct AgentSpec {
    pub width: f64,
    pub length: f64,
    pub props: BTreeMap<String, PropValue>,
    pub hooks: Option<Box<dyn AgentHooks>>,
}

impl AgentSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blueprint with spatial dimensions.
    pub fn sized(width: f64, length: f64) -> Self {
        Self {
            width,
            length,
            ..Self::default()
        }
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn hooks(mut self, hooks: impl AgentHooks) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }
}
