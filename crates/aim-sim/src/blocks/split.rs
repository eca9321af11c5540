//! `Split` — unfolds a container, all-or-nothing.

use std::any::Any;

use aim_core::AgentId;

use crate::block::{Block, BlockCommon};
use crate::ctx::EngineCtx;
use crate::{SimError, SimResult};

/// Routes a container to slot 0 and each of its children to slot 1.
///
/// The split is atomic: if any delivery rejects, everything already
/// delivered is reclaimed, the container's links are left intact, and the
/// rejection propagates upstream so the caller retries the whole split
/// next tick.  An agent with no children is not a container; offering one
/// here indicates a wiring bug and aborts the run.
#[derive(Default)]
pub struct Split {
    common: BlockCommon,
}

impl Split {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Block for Split {
    fn kind(&self) -> &'static str {
        "Split"
    }

    fn common(&self) -> &BlockCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut BlockCommon {
        &mut self.common
    }

    fn take(&mut self, agent: AgentId, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        let (children, previous_owner) = {
            let a = ctx.agent(agent)?;
            (a.children.clone(), a.current_block)
        };
        if children.is_empty() {
            return Err(SimError::NotAContainer { agent });
        }
        let to_container = self.common.require_output(0)?;
        let to_children = self.common.require_output(1)?;

        // Container first; a rejection here moved nothing yet.
        ctx.send(to_container, agent)?;

        let mut delivered: Vec<AgentId> = Vec::new();
        for &child in &children {
            match ctx.send(to_children, child) {
                Ok(()) => delivered.push(child),
                Err(e) if e.is_rejection() => {
                    // Roll back: children return to container ownership,
                    // the container returns to its previous owner.
                    for &d in &delivered {
                        ctx.reclaim(d)?;
                    }
                    ctx.reclaim(agent)?;
                    ctx.agent_mut(agent)?.current_block = previous_owner;
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }

        // Children are on their own now; parent links stay as history.
        ctx.agent_mut(agent)?.children.clear();
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
