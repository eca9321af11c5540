//! The block execution contract and its shared state.
//!
//! # Contract
//!
//! A block does exactly two things for the engine:
//!
//! - `take(agent, ctx)` — accept the agent or fail.  A rejection
//!   (`SimError::Rejected`) means "not this tick, try again"; the caller
//!   keeps the agent.  Any other error is fatal.  Never silently drop.
//! - `tick(ctx)` — advance held agents once per simulator tick.  The
//!   default drains the held list FIFO into slot 0, stopping at the first
//!   rejection, which is exactly what queues and buffers want.
//!
//! # Ownership choreography on a handoff
//!
//! The upstream block calls `ctx.send(to, agent)`.  On success the
//! downstream `take` has already pushed the agent into its own held list
//! and repointed `current_block`; the upstream then runs its `on_exit`
//! hook and removes the agent from its held list
//! (`ctx.finish_eject`).  On rejection nothing moved.

use std::any::Any;
use std::collections::VecDeque;

use aim_agent::Agent;
use aim_core::{AgentId, BlockId, CoreError};

use crate::ctx::EngineCtx;
use crate::hooks::HookCtx;
use crate::{SimError, SimResult};

// ── Hook aliases ──────────────────────────────────────────────────────────────

/// Block-level user callback (`on_enter` / `on_exit`).
pub type BlockHook = Box<dyn FnMut(&mut Agent, &mut HookCtx<'_>)>;

// ── BlockCommon ───────────────────────────────────────────────────────────────

/// State every block carries: identity, output slots, held agents, user
/// callbacks.  Blocks embed one and expose it through
/// [`Block::common`]/[`Block::common_mut`].
pub struct BlockCommon {
    /// Assigned by the arena at registration; INVALID until then.
    pub id: BlockId,

    outputs: Vec<Option<BlockId>>,

    /// Agents owned by this block, oldest first.
    pub held: VecDeque<AgentId>,

    pub on_enter: Option<BlockHook>,
    pub on_exit: Option<BlockHook>,
}

impl Default for BlockCommon {
    fn default() -> Self {
        Self {
            id: BlockId::INVALID,
            outputs: Vec::new(),
            held: VecDeque::new(),
            on_enter: None,
            on_exit: None,
        }
    }
}

impl BlockCommon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self, slot: usize) -> Option<BlockId> {
        self.outputs.get(slot).copied().flatten()
    }

    /// Like [`output`](Self::output) but failing with `MissingConnection`.
    pub fn require_output(&self, slot: usize) -> SimResult<BlockId> {
        self.output(slot).ok_or(SimError::MissingConnection {
            block: self.id,
            slot,
        })
    }

    pub fn set_output(&mut self, slot: usize, to: BlockId) {
        if self.outputs.len() <= slot {
            self.outputs.resize(slot + 1, None);
        }
        self.outputs[slot] = Some(to);
    }

    /// Remove one occurrence of `agent` from the held list.
    pub fn remove_held(&mut self, agent: AgentId) -> bool {
        match self.held.iter().position(|&a| a == agent) {
            Some(pos) => {
                self.held.remove(pos);
                true
            }
            None => false,
        }
    }
}

// ── Block trait ───────────────────────────────────────────────────────────────

/// A process node owning zero or more agents and routing them downstream.
pub trait Block: Any {
    /// Short type name for error messages and observer output.
    fn kind(&self) -> &'static str;

    fn common(&self) -> &BlockCommon;
    fn common_mut(&mut self) -> &mut BlockCommon;

    /// Accept `agent` or fail; see the module docs for the contract.
    fn take(&mut self, agent: AgentId, ctx: &mut EngineCtx<'_>) -> SimResult<()>;

    /// Advance held agents.  Default: FIFO drain into slot 0, stopping at
    /// the first rejection.
    fn tick(&mut self, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        drain_fifo(self.common_mut(), ctx, usize::MAX)?;
        Ok(())
    }

    /// Withdraw an agent accepted earlier in the same call chain (rollback
    /// support).  Returns `Ok(false)` if this block does not hold it.
    fn reclaim(&mut self, agent: AgentId, _ctx: &mut EngineCtx<'_>) -> SimResult<bool> {
        Ok(self.common_mut().remove_held(agent))
    }

    fn id(&self) -> BlockId {
        self.common().id
    }

    /// Agents currently owned, oldest first.
    fn held(&self) -> &VecDeque<AgentId> {
        &self.common().held
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Eject up to `limit` agents from the front of `common.held` into slot 0.
///
/// Stops at the first rejection to preserve FIFO order downstream.  Returns
/// how many agents moved.  A block with no slot-0 connection simply holds.
pub fn drain_fifo(
    common: &mut BlockCommon,
    ctx: &mut EngineCtx<'_>,
    limit: usize,
) -> SimResult<usize> {
    let Some(to) = common.output(0) else {
        return Ok(0);
    };
    let mut moved = 0;
    while moved < limit {
        let Some(&front) = common.held.front() else {
            break;
        };
        match ctx.send(to, front) {
            Ok(()) => {
                ctx.finish_eject(common, front)?;
                moved += 1;
            }
            Err(e) if e.is_rejection() => break,
            Err(e) => return Err(e),
        }
    }
    Ok(moved)
}

// ── BlockArena ────────────────────────────────────────────────────────────────

/// Id-indexed arena of all registered blocks.
///
/// During `take`/`tick` the active block is *checked out* of its slot so it
/// can hold `&mut self` while the engine context still reaches every other
/// block.  A `take` chain that loops back into a checked-out block finds an
/// empty slot and fails with `RoutingCycle` instead of aliasing.
#[derive(Default)]
pub struct BlockArena {
    slots: Vec<Option<Box<dyn Block>>>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block, assigning the next id.  Registration order is tick
    /// order.
    pub fn add(&mut self, mut block: Box<dyn Block>) -> BlockId {
        let id = BlockId(self.slots.len() as u32);
        block.common_mut().id = id;
        self.slots.push(Some(block));
        id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Take the block out of its slot for exclusive use.
    pub fn checkout(&mut self, id: BlockId) -> SimResult<Box<dyn Block>> {
        match self.slots.get_mut(id.index()) {
            None => Err(CoreError::BlockNotFound(id).into()),
            Some(slot) => slot.take().ok_or(SimError::RoutingCycle { block: id }),
        }
    }

    /// Put a checked-out block back.
    pub fn restore(&mut self, id: BlockId, block: Box<dyn Block>) {
        self.slots[id.index()] = Some(block);
    }

    /// Non-reentrant shared access (inspection between ticks).
    pub fn get(&self, id: BlockId) -> SimResult<&dyn Block> {
        match self.slots.get(id.index()) {
            None => Err(CoreError::BlockNotFound(id).into()),
            Some(slot) => slot
                .as_deref()
                .ok_or(SimError::RoutingCycle { block: id }),
        }
    }

    /// Non-reentrant exclusive access (wiring, scheduled callbacks).
    pub fn get_mut(&mut self, id: BlockId) -> SimResult<&mut Box<dyn Block>> {
        match self.slots.get_mut(id.index()) {
            None => Err(CoreError::BlockNotFound(id).into()),
            Some(slot) => slot.as_mut().ok_or(SimError::RoutingCycle { block: id }),
        }
    }
}
