//! `ConveyorBlock` / `ConveyorExit` — transit across a conveyor space.

use std::any::Any;

use aim_core::{AgentId, EntityId, SpaceId, Tick};
use aim_spatial::Placement;

use crate::block::{Block, BlockCommon};
use crate::ctx::EngineCtx;
use crate::{RejectReason, SimError, SimResult};

// ── ConveyorBlock ─────────────────────────────────────────────────────────────

/// Carries agents through a conveyor space from `start` to `end`.
///
/// `take` enforces two admission rules:
///
/// - **one agent per tick** — the entry interval on the start entity can
///   only be claimed once per tick, so a second entrant would collide with
///   the first before the belt has moved;
/// - **space placement** — the space itself may refuse (entry occupied,
///   destination unreachable).
///
/// Both surface as rejections for the upstream to retry.  Held agents ride
/// the space until their movement completes; a successful downstream
/// handoff unregisters them immediately afterwards.
pub struct ConveyorBlock {
    common: BlockCommon,
    space: SpaceId,
    start: EntityId,
    end: EntityId,
    last_entry: Option<Tick>,
}

impl ConveyorBlock {
    /// Prefer [`Simulator::add_conveyor_block`][crate::Simulator::add_conveyor_block],
    /// which validates the space and entities at wiring time.
    pub fn new(space: SpaceId, start: EntityId, end: EntityId) -> Self {
        Self {
            common: BlockCommon::new(),
            space,
            start,
            end,
            last_entry: None,
        }
    }

    /// Agents currently riding the space under this block.
    pub fn riding(&self) -> usize {
        self.common.held.len()
    }
}

impl Block for ConveyorBlock {
    fn kind(&self) -> &'static str {
        "ConveyorBlock"
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
        let placement = Placement::Conveyor {
            start: self.start,
            end: self.end,
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
        let riders: Vec<AgentId> = self.common.held.iter().copied().collect();
        for agent in riders {
            if !ctx.movement_complete(self.space, agent)? {
                continue;
            }
            let to = self.common.require_output(0)?;
            match ctx.send(to, agent) {
                Ok(()) => {
                    // Free the spatial slot the moment the handoff lands;
                    // a same-space downstream registration is left alone.
                    ctx.unregister_from_conveyor(self.space, agent, self.end)?;
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

// ── ConveyorExit ──────────────────────────────────────────────────────────────

/// Pass-through marking "this agent no longer needs a spatial slot".
///
/// It does not touch the space — the conveyor block upstream unregisters on
/// handoff — so a rejection from its output simply propagates back and the
/// agent keeps its place on the belt.
#[derive(Default)]
pub struct ConveyorExit {
    common: BlockCommon,
}

impl ConveyorExit {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Block for ConveyorExit {
    fn kind(&self) -> &'static str {
        "ConveyorExit"
    }

    fn common(&self) -> &BlockCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut BlockCommon {
        &mut self.common
    }

    fn take(&mut self, agent: AgentId, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        let to = self.common.require_output(0)?;
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
