//! `Queue` — unbounded FIFO buffer.

use std::any::Any;

use aim_core::AgentId;

use crate::block::{Block, BlockCommon};
use crate::ctx::EngineCtx;
use crate::SimResult;

/// Accepts unconditionally and retries the head against its output every
/// tick until the downstream stops rejecting.  The default block `tick`
/// already does exactly that.
#[derive(Default)]
pub struct Queue {
    common: BlockCommon,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agents currently waiting.
    pub fn len(&self) -> usize {
        self.common.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.common.held.is_empty()
    }
}

impl Block for Queue {
    fn kind(&self) -> &'static str {
        "Queue"
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

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
