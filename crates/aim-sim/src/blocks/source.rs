//! `Source` — spawns agents into the network.

use std::any::Any;

use aim_core::{AgentId, SimRng, Tick};

use crate::block::{Block, BlockCommon};
use crate::ctx::EngineCtx;
use crate::hooks::AgentSpec;
use crate::{SimError, SimResult};

/// Per-tick spawn count.  Receives the current tick and the simulation RNG
/// so schedules may be bursty or stochastic while staying deterministic.
pub type SpawnSchedule = Box<dyn FnMut(Tick, &mut SimRng) -> u32>;

/// Blueprint factory invoked once per spawned agent.
pub type AgentFactory = Box<dyn FnMut() -> AgentSpec>;

/// Spawns agents each tick and feeds them into its sole output.
///
/// A source has no buffer: if the downstream block rejects a fresh agent,
/// that agent is destroyed on the spot rather than retried.  Sources never
/// accept incoming agents.
pub struct Source {
    common: BlockCommon,
    schedule: SpawnSchedule,
    factory: AgentFactory,
}

impl Source {
    /// Constant-rate source: `rate` agents per tick, default blueprints.
    pub fn new(rate: u32) -> Self {
        Self {
            common: BlockCommon::new(),
            schedule: Box::new(move |_, _| rate),
            factory: Box::new(AgentSpec::new),
        }
    }

    /// Replace the spawn schedule.
    pub fn schedule(mut self, schedule: impl FnMut(Tick, &mut SimRng) -> u32 + 'static) -> Self {
        self.schedule = Box::new(schedule);
        self
    }

    /// Replace the agent blueprint factory.
    pub fn factory(mut self, factory: impl FnMut() -> AgentSpec + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }
}

impl Block for Source {
    fn kind(&self) -> &'static str {
        "Source"
    }

    fn common(&self) -> &BlockCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut BlockCommon {
        &mut self.common
    }

    fn take(&mut self, _agent: AgentId, _ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        Err(SimError::SourceInput(self.common.id))
    }

    fn tick(&mut self, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        let to = self.common.require_output(0)?;
        let count = (self.schedule)(ctx.now, &mut *ctx.rng);
        for _ in 0..count {
            let spec = (self.factory)();
            let agent = ctx.spawn(spec);

            // A fresh agent is born inside the source, then handed on.
            ctx.agent_mut(agent)?.current_block = Some(self.common.id);
            ctx.fire_agent_enter(agent, self.common.id)?;

            match ctx.send(to, agent) {
                Ok(()) => {}
                // No buffer: a rejected spawn is dropped, not retried.
                Err(e) if e.is_rejection() => ctx.destroy(agent),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
