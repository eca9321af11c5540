//! `MoveBlock` — transit across an open space.

use std::any::Any;

use aim_core::{AgentId, SpaceId, Tick};
use aim_spatial::Placement;

use crate::block::{Block, BlockCommon};
use crate::ctx::EngineCtx;
use crate::{RejectReason, SimError, SimResult};

/// Carries agents in a straight line through an [`aim_spatial::OpenSpace`]
/// from a fixed start point to a fixed target.
///
/// Admission is one agent per tick, matching the conveyor block, even
/// though the open space itself never collides.
pub struct MoveBlock {
    common: BlockCommon,
    space: SpaceId,
    from: [f64; 3],
    to: [f64; 3],
    speed: f64,
    last_entry: Option<Tick>,
}

impl MoveBlock {
    pub fn new(space: SpaceId, from: [f64; 3], to: [f64; 3], speed: f64) -> Self {
        Self {
            common: BlockCommon::new(),
            space,
            from,
            to,
            speed,
            last_entry: None,
        }
    }

    /// Agents currently in transit under this block.
    pub fn moving(&self) -> usize {
        self.common.held.len()
    }
}

impl Block for MoveBlock {
    fn kind(&self) -> &'static str {
        "Move"
    }

    fn common(&self) -> &BlockCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut BlockCommon {
        &mut self.common
    }

    fn take(&mut self, agent: AgentId, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        if self.last_entry == Some(ctx.now) {
            return Err(SimError::Rejected {
                block: self.common.id,
                agent,
                reason: RejectReason::EntryPerTick,
            });
        }
        let placement = Placement::Line {
            from: self.from,
            to: self.to,
            speed: self.speed,
        };
        if !ctx.register_in_space(self.space, agent, &placement)? {
            return Err(SimError::Rejected {
                block: self.common.id,
                agent,
                reason: RejectReason::SpaceDenied,
            });
        }
        ctx.admit(&mut self.common, agent)?;
        self.last_entry = Some(ctx.now);
        Ok(())
    }

    fn tick(&mut self, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        let movers: Vec<AgentId> = self.common.held.iter().copied().collect();
        for agent in movers {
            if !ctx.movement_complete(self.space, agent)? {
                continue;
            }
            let to = self.common.require_output(0)?;
            match ctx.send(to, agent) {
                Ok(()) => {
                    ctx.unregister_in_space(self.space, agent)?;
                    ctx.finish_eject(&mut self.common, agent)?;
                }
                Err(e) if e.is_rejection() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn reclaim(&mut self, agent: AgentId, ctx: &mut EngineCtx<'_>) -> SimResult<bool> {
        if self.common.remove_held(agent) {
            ctx.unregister_in_space(self.space, agent)?;
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
