//! `Delay` — holds agents for a fixed tick count or until an event.

use std::any::Any;
use std::collections::HashMap;

use aim_core::{AgentId, Tick};

use crate::block::{Block, BlockCommon};
use crate::ctx::EngineCtx;
use crate::SimResult;

/// What releases a delayed agent.
pub enum DelayMode {
    /// Hold for exactly this many full ticks after acceptance; the first
    /// ejection attempt happens on the tick after the release tick.
    Ticks(u64),

    /// Hold until the agent receives this exact event.  The block
    /// subscribes each accepted agent at `take` time; since event delivery
    /// precedes block ticks within a tick, release happens the same tick
    /// the event arrives.
    UntilEvent(String),
}

/// Time- or event-gated buffer.
pub struct Delay {
    common: BlockCommon,
    mode: DelayMode,
    /// Release tick per held agent (fixed mode only).
    release: HashMap<AgentId, Tick>,
}

impl Delay {
    /// Hold every accepted agent for `ticks` full ticks.
    pub fn fixed(ticks: u64) -> Self {
        Self {
            common: BlockCommon::new(),
            mode: DelayMode::Ticks(ticks),
            release: HashMap::new(),
        }
    }

    /// Hold agents until they receive `event`.
    pub fn until_event(event: impl Into<String>) -> Self {
        Self {
            common: BlockCommon::new(),
            mode: DelayMode::UntilEvent(event.into()),
            release: HashMap::new(),
        }
    }

    /// Agents currently being delayed.
    pub fn len(&self) -> usize {
        self.common.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.common.held.is_empty()
    }
}

impl Block for Delay {
    fn kind(&self) -> &'static str {
        "Delay"
    }

    fn common(&self) -> &BlockCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut BlockCommon {
        &mut self.common
    }

    fn take(&mut self, agent: AgentId, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        ctx.admit(&mut self.common, agent)?;
        match &self.mode {
            DelayMode::Ticks(d) => {
                self.release.insert(agent, ctx.now + *d);
            }
            DelayMode::UntilEvent(event) => {
                ctx.subscribe(agent, event)?;
            }
        }
        Ok(())
    }

    fn tick(&mut self, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        let Some(to) = self.common.output(0) else {
            return Ok(());
        };
        match &self.mode {
            // Uniform delays keep the held list sorted by release tick, so
            // scanning stops at the first agent still being held.
            DelayMode::Ticks(_) => loop {
                let Some(&front) = self.common.held.front() else {
                    break;
                };
                let due = match self.release.get(&front) {
                    Some(&due) => due,
                    None => break,
                };
                if ctx.now <= due {
                    break;
                }
                match ctx.send(to, front) {
                    Ok(()) => {
                        self.release.remove(&front);
                        ctx.finish_eject(&mut self.common, front)?;
                    }
                    Err(e) if e.is_rejection() => break,
                    Err(e) => return Err(e),
                }
            },

            // Event release is independent per agent; released agents may
            // overtake held ones.
            DelayMode::UntilEvent(event) => {
                let event = event.clone();
                let held: Vec<AgentId> = self.common.held.iter().copied().collect();
                for agent in held {
                    if !ctx.agent(agent)?.received(ctx.now, &event) {
                        continue;
                    }
                    match ctx.send(to, agent) {
                        Ok(()) => ctx.finish_eject(&mut self.common, agent)?,
                        Err(e) if e.is_rejection() => break,
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        Ok(())
    }

    fn reclaim(&mut self, agent: AgentId, _ctx: &mut EngineCtx<'_>) -> SimResult<bool> {
        self.release.remove(&agent);
        Ok(self.common.remove_held(agent))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
