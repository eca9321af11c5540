//! `Gate` — open/closed valve.

use std::any::Any;

use aim_core::AgentId;

use crate::block::{drain_fifo, Block, BlockCommon};
use crate::ctx::EngineCtx;
use crate::SimResult;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GateState {
    Open,
    Closed,
}

/// How many buffered agents an open gate releases per tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReleaseMode {
    /// At most one per tick.
    One,
    /// Drain until the downstream rejects.
    All,
}

/// Accumulates agents while closed; releases per `ReleaseMode` while open.
/// Toggling is typically driven by scheduled callbacks.
pub struct Gate {
    common: BlockCommon,
    state: GateState,
    mode: ReleaseMode,
}

impl Gate {
    pub fn new(state: GateState, mode: ReleaseMode) -> Self {
        Self {
            common: BlockCommon::new(),
            state,
            mode,
        }
    }

    /// Closed gate in one-per-tick release mode, the common starting point.
    pub fn closed() -> Self {
        Self::new(GateState::Closed, ReleaseMode::One)
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn toggle(&mut self) {
        self.state = match self.state {
            GateState::Open => GateState::Closed,
            GateState::Closed => GateState::Open,
        };
    }

    pub fn open(&mut self) {
        self.state = GateState::Open;
    }

    pub fn close(&mut self) {
        self.state = GateState::Closed;
    }

    /// Agents waiting at the gate.
    pub fn waiting(&self) -> usize {
        self.common.held.len()
    }
}

impl Block for Gate {
    fn kind(&self) -> &'static str {
        "Gate"
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

    fn tick(&mut self, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        if self.state == GateState::Closed {
            return Ok(());
        }
        let limit = match self.mode {
            ReleaseMode::One => 1,
            ReleaseMode::All => usize::MAX,
        };
        drain_fifo(&mut self.common, ctx, limit)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
