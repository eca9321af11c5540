//! `Combine` — folds pickups into a container.
//!
//! A combine block has two input ports (container, pickup), each a small
//! forwarding block with its own id so upstream wiring stays uniform:
//! `connect` the container lane to the container port, the pickup lane to
//! the pickup port.  Ports reject when their side is saturated, so both
//! lanes want a queue upstream.
//!
//! Once a container is held and `max_pickups` pickups have accumulated,
//! the tick assembles the load: pickups become the container's children
//! (ownership passes to the container) and the container is ejected to
//! slot 0.  A downstream rejection unwinds the links and retries next
//! tick.

use std::any::Any;
use std::collections::VecDeque;

use aim_core::{AgentId, BlockId};

use crate::block::{Block, BlockCommon};
use crate::ctx::EngineCtx;
use crate::{RejectReason, SimError, SimResult};

// ── Port plumbing ─────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum PortRole {
    Container,
    Pickup,
}

/// Forwarding block standing in front of one combine input.
pub struct CombinePort {
    common: BlockCommon,
    parent: BlockId,
    role: PortRole,
}

impl CombinePort {
    pub(crate) fn new(parent: BlockId, role: PortRole) -> Self {
        Self {
            common: BlockCommon::new(),
            parent,
            role,
        }
    }
}

impl Block for CombinePort {
    fn kind(&self) -> &'static str {
        "CombinePort"
    }

    fn common(&self) -> &BlockCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut BlockCommon {
        &mut self.common
    }

    fn take(&mut self, agent: AgentId, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        let mut parent = ctx.blocks.checkout(self.parent)?;
        let result = match parent.as_any_mut().downcast_mut::<Combine>() {
            Some(combine) => combine.take_port(self.role, agent, ctx),
            None => Err(SimError::BlockTypeMismatch {
                block: self.parent,
                expected: "Combine",
            }),
        };
        ctx.blocks.restore(self.parent, parent);
        result
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

/// Ids returned by [`Simulator::add_combine`][crate::Simulator::add_combine]:
/// the combine block itself plus its two input ports.
#[derive(Copy, Clone, Debug)]
pub struct CombineHandles {
    pub block: BlockId,
    pub container: BlockId,
    pub pickup: BlockId,
}

// ── Combine ───────────────────────────────────────────────────────────────────

/// Holds at most one container and up to `max_pickups` pickups.
pub struct Combine {
    common: BlockCommon,
    max_pickups: usize,
    container: Option<AgentId>,
    pickups: VecDeque<AgentId>,
}

impl Combine {
    pub(crate) fn new(max_pickups: usize) -> Self {
        Self {
            common: BlockCommon::new(),
            max_pickups,
            container: None,
            pickups: VecDeque::new(),
        }
    }

    pub fn container_held(&self) -> bool {
        self.container.is_some()
    }

    pub fn pickups_buffered(&self) -> usize {
        self.pickups.len()
    }

    fn take_port(
        &mut self,
        role: PortRole,
        agent: AgentId,
        ctx: &mut EngineCtx<'_>,
    ) -> SimResult<()> {
        match role {
            PortRole::Container => {
                if self.container.is_some() {
                    return Err(SimError::Rejected {
                        block: self.common.id,
                        agent,
                        reason: RejectReason::ContainerOccupied,
                    });
                }
                ctx.admit(&mut self.common, agent)?;
                self.container = Some(agent);
            }
            PortRole::Pickup => {
                if self.pickups.len() >= self.max_pickups {
                    return Err(SimError::Rejected {
                        block: self.common.id,
                        agent,
                        reason: RejectReason::PickupBufferFull,
                    });
                }
                ctx.admit(&mut self.common, agent)?;
                self.pickups.push_back(agent);
            }
        }
        Ok(())
    }
}

impl Block for Combine {
    fn kind(&self) -> &'static str {
        "Combine"
    }

    fn common(&self) -> &BlockCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut BlockCommon {
        &mut self.common
    }

    fn take(&mut self, _agent: AgentId, _ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        Err(SimError::PortOnly(self.common.id))
    }

    fn tick(&mut self, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        let Some(container) = self.container else {
            return Ok(());
        };
        if self.pickups.len() < self.max_pickups {
            return Ok(());
        }
        let to = self.common.require_output(0)?;
        let batch: Vec<AgentId> = self.pickups.iter().take(self.max_pickups).copied().collect();

        // Hand the pickups to the container before the ejection attempt, so
        // the downstream sees a fully-formed assembly and a split can route
        // the children without this block's ownership in the way.
        for &pickup in &batch {
            ctx.agent_mut(container)?.children.push(pickup);
            let p = ctx.agent_mut(pickup)?;
            p.parents.push(container);
            p.current_block = None;
            self.common.remove_held(pickup);
        }

        match ctx.send(to, container) {
            Ok(()) => {
                self.pickups.drain(..batch.len());
                ctx.finish_eject(&mut self.common, container)?;
                self.container = None;
            }
            Err(e) if e.is_rejection() => {
                // Put everything back exactly as it was for a retry.
                for &pickup in &batch {
                    let c = ctx.agent_mut(container)?;
                    if let Some(pos) = c.children.iter().rposition(|&x| x == pickup) {
                        c.children.remove(pos);
                    }
                    let p = ctx.agent_mut(pickup)?;
                    if let Some(pos) = p.parents.iter().rposition(|&x| x == container) {
                        p.parents.remove(pos);
                    }
                    p.current_block = Some(self.common.id);
                    self.common.held.push_back(pickup);
                }
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn reclaim(&mut self, agent: AgentId, _ctx: &mut EngineCtx<'_>) -> SimResult<bool> {
        if self.container == Some(agent) {
            self.container = None;
        }
        if let Some(pos) = self.pickups.iter().position(|&p| p == agent) {
            self.pickups.remove(pos);
        }
        Ok(self.common.remove_held(agent))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
