//! Engine error taxonomy.
//!
//! Three classes, one enum:
//!
//! 1. **Rejection** — `SimError::Rejected`, the expected backpressure
//!    signal.  `take` returns it when a block cannot accept an agent this
//!    tick; the upstream block absorbs it inside its own `tick` and keeps
//!    the agent for retry.  Check with [`SimError::is_rejection`].
//! 2. **Misconfiguration** — missing connections, routing cycles, type
//!    mismatches.  Surfaced at wiring time where possible, otherwise at
//!    first use, and never caught by the engine.
//! 3. **Invariant violations** — zero-period recurring callbacks, splits on
//!    non-containers, unknown ids.  These indicate bugs and abort the run.

use aim_core::{AgentId, BlockId, CoreError, SpaceId};
use aim_spatial::SpatialError;
use thiserror::Error;

// ── RejectReason ──────────────────────────────────────────────────────────────

/// Why a block refused an agent this tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("only one agent may enter per tick")]
    EntryPerTick,

    #[error("space denied the placement (collision or unreachable)")]
    SpaceDenied,

    #[error("no output connected for key '{0}'")]
    MissingKey(String),

    #[error("a container is already held")]
    ContainerOccupied,

    #[error("the pickup buffer is full")]
    PickupBufferFull,
}

// ── SimError ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SimError {
    #[error("block {block} rejected agent {agent}: {reason}")]
    Rejected {
        block: BlockId,
        agent: AgentId,
        reason: RejectReason,
    },

    #[error("block {block} has no connection at slot {slot}")]
    MissingConnection { block: BlockId, slot: usize },

    #[error("routing cycle detected at block {block}")]
    RoutingCycle { block: BlockId },

    #[error("source block {0} does not accept agents")]
    SourceInput(BlockId),

    #[error("combine block {0} accepts agents only through its ports")]
    PortOnly(BlockId),

    #[error("agent {agent} is not a container (no children to split)")]
    NotAContainer { agent: AgentId },

    #[error("agent {agent} is not held by any block")]
    NotHeld { agent: AgentId },

    #[error("restricted area block {block} has no bound counterpart")]
    UnboundArea { block: BlockId },

    #[error("recurring callbacks need a period of at least one tick")]
    ZeroPeriod,

    #[error("event tags must be non-empty")]
    EmptyEvent,

    #[error("block {block} is not a {expected}")]
    BlockTypeMismatch {
        block: BlockId,
        expected: &'static str,
    },

    #[error("space {space} is not a {expected}")]
    SpaceTypeMismatch {
        space: SpaceId,
        expected: &'static str,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

impl SimError {
    /// `true` for the backpressure signal the upstream-retry pattern absorbs.
    pub fn is_rejection(&self) -> bool {
        matches!(self, SimError::Rejected { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;
