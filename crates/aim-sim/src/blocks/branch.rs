//! `IfBlock` — two-way predicate router.

use std::any::Any;

use aim_agent::Agent;
use aim_core::AgentId;

use crate::block::{Block, BlockCommon};
use crate::ctx::EngineCtx;
use crate::SimResult;

/// Routes each offered agent to slot 0 (condition true) or slot 1 (false)
/// with no internal buffering.  A rejection from the chosen branch
/// propagates upstream as this block's own rejection; a missing branch is
/// a wiring error surfaced at first use.
pub struct IfBlock {
    common: BlockCommon,
    condition: Box<dyn Fn(&Agent) -> bool>,
}

impl IfBlock {
    pub fn new(condition: impl Fn(&Agent) -> bool + 'static) -> Self {
        Self {
            common: BlockCommon::new(),
            condition: Box::new(condition),
        }
    }
}

impl Block for IfBlock {
    fn kind(&self) -> &'static str {
        "If"
    }

    fn common(&self) -> &BlockCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut BlockCommon {
        &mut self.common
    }

    fn take(&mut self, agent: AgentId, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        let verdict = (self.condition)(ctx.agent(agent)?);
        let slot = if verdict { 0 } else { 1 };
        let to = self.common.require_output(slot)?;
        ctx.send(to, agent)
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
