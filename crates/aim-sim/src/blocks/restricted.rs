//! `RestrictedAreaStart` / `RestrictedAreaEnd` — bounded-occupancy zone.
//!
//! The pair brackets a stretch of the network and caps how many agents may
//! be inside it at once.  The occupancy counter is shared through an
//! `Rc<Cell<_>>` rather than a back-reference: the engine is single
//! threaded, and a plain shared cell avoids any ownership edge between the
//! two blocks.  Pair them with
//! [`Simulator::bind_restricted`][crate::Simulator::bind_restricted] before
//! running; an unbound half is a wiring error at first use.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use aim_core::{AgentId, BlockId};

use crate::block::{Block, BlockCommon};
use crate::ctx::EngineCtx;
use crate::{SimError, SimResult};

// ── RestrictedAreaStart ───────────────────────────────────────────────────────

/// Admits agents into the zone only while `active < max_agents`; the rest
/// wait in its buffer.
pub struct RestrictedAreaStart {
    common: BlockCommon,
    max_agents: u32,
    active: Rc<Cell<u32>>,
    end: Option<BlockId>,
}

impl RestrictedAreaStart {
    pub fn new(max_agents: u32) -> Self {
        Self {
            common: BlockCommon::new(),
            max_agents,
            active: Rc::new(Cell::new(0)),
            end: None,
        }
    }

    /// Agents currently inside the zone.
    pub fn active(&self) -> u32 {
        self.active.get()
    }

    /// Agents waiting for a slot.
    pub fn waiting(&self) -> usize {
        self.common.held.len()
    }

    pub fn max_agents(&self) -> u32 {
        self.max_agents
    }

    pub(crate) fn counter(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.active)
    }

    pub(crate) fn bind_end(&mut self, end: BlockId) {
        self.end = Some(end);
    }
}

impl Block for RestrictedAreaStart {
    fn kind(&self) -> &'static str {
        "RestrictedAreaStart"
    }

    fn common(&self) -> &BlockCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut BlockCommon {
        &mut self.common
    }

    fn take(&mut self, agent: AgentId, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        ctx.admit(&mut self.common, agent)
    }

    fn tick(&mut self, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        if self.end.is_none() {
            return Err(SimError::UnboundArea {
                block: self.common.id,
            });
        }
        let Some(to) = self.common.output(0) else {
            return Ok(());
        };
        while let Some(&front) = self.common.held.front() {
            if self.active.get() >= self.max_agents {
                break;
            }
            match ctx.send(to, front) {
                Ok(()) => {
                    self.active.set(self.active.get() + 1);
                    ctx.finish_eject(&mut self.common, front)?;
                }
                Err(e) if e.is_rejection() => break,
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

// ── RestrictedAreaEnd ─────────────────────────────────────────────────────────

/// Marks the zone exit: forwards the agent, then frees its slot.
///
/// The forward happens first so a downstream rejection leaves the agent —
/// and the occupancy count — inside the zone.
#[derive(Default)]
pub struct RestrictedAreaEnd {
    common: BlockCommon,
    active: Option<Rc<Cell<u32>>>,
}

impl RestrictedAreaEnd {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bind(&mut self, counter: Rc<Cell<u32>>) {
        self.active = Some(counter);
    }
}

impl Block for RestrictedAreaEnd {
    fn kind(&self) -> &'static str {
        "RestrictedAreaEnd"
    }

    fn common(&self) -> &BlockCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut BlockCommon {
        &mut self.common
    }

    fn take(&mut self, agent: AgentId, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        let counter = self
            .active
            .clone()
            .ok_or(SimError::UnboundArea {
                block: self.common.id,
            })?;
        let to = self.common.require_output(0)?;
        ctx.send(to, agent)?;
        counter.set(counter.get().saturating_sub(1));
        Ok(())
    }

    fn tick(&mut self, _ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
