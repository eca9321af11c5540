//! `Sink` — terminal counter.

use std::any::Any;

use aim_core::AgentId;

use crate::block::{Block, BlockCommon};
use crate::ctx::EngineCtx;
use crate::SimResult;

/// Accepts unconditionally, counts arrivals, and destroys agents (together
/// with any children they still own) on its next tick.
///
/// Destruction is deferred to the tick so that an arrival can still be
/// rolled back within the call chain that delivered it.
#[derive(Default)]
pub struct Sink {
    common: BlockCommon,
    count: u64,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agents absorbed so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Block for Sink {
    fn kind(&self) -> &'static str {
        "Sink"
    }

    fn common(&self) -> &BlockCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut BlockCommon {
        &mut self.common
    }

    fn take(&mut self, agent: AgentId, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        ctx.admit(&mut self.common, agent)?;
        self.count += 1;
        Ok(())
    }

    fn tick(&mut self, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        let absorbed: Vec<AgentId> = self.common.held.drain(..).collect();
        for agent in absorbed {
            ctx.destroy(agent);
        }
        Ok(())
    }

    fn reclaim(&mut self, agent: AgentId, _ctx: &mut EngineCtx<'_>) -> SimResult<bool> {
        if self.common.remove_held(agent) {
            self.count -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
