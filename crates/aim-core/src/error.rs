//! Framework error type.
//!
//! Sub-crates define their own error enums and either convert `CoreError`
//! into them via `From` impls or wrap it as one variant.  Lookup failures on
//! the id-indexed arenas all funnel through here.

use thiserror::Error;

use crate::{AgentId, BlockId, SpaceId};

/// The top-level error type for `aim-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("block {0} not found")]
    BlockNotFound(BlockId),

    #[error("space {0} not found")]
    SpaceNotFound(SpaceId),
}

/// Shorthand result type for `aim-core` operations.
pub type CoreResult<T> = Result<T, CoreError>;
