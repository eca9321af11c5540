//! `Switch` — keyed multi-way router.

use std::any::Any;
use std::collections::HashMap;

use aim_agent::Agent;
use aim_core::{AgentId, BlockId};

use crate::block::{Block, BlockCommon};
use crate::ctx::EngineCtx;
use crate::{RejectReason, SimError, SimResult};

/// Routes agents by `key_fn(agent)`, like a switch-case over outputs.
///
/// A key with no registered output rejects the agent — the upstream holds
/// it and retries, so late wiring (a route added by a scheduled callback)
/// can still pick it up.
pub struct Switch {
    common: BlockCommon,
    key_fn: Box<dyn Fn(&Agent) -> String>,
    routes: HashMap<String, BlockId>,
}

impl Switch {
    pub fn new(key_fn: impl Fn(&Agent) -> String + 'static) -> Self {
        Self {
            common: BlockCommon::new(),
            key_fn: Box::new(key_fn),
            routes: HashMap::new(),
        }
    }

    /// Register the output for `key`, replacing any previous route.
    pub fn route(&mut self, key: impl Into<String>, to: BlockId) {
        self.routes.insert(key.into(), to);
    }

    /// Number of registered routes.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

impl Block for Switch {
    fn kind(&self) -> &'static str {
        "Switch"
    }

    fn common(&self) -> &BlockCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut BlockCommon {
        &mut self.common
    }

    fn take(&mut self, agent: AgentId, ctx: &mut EngineCtx<'_>) -> SimResult<()> {
        let key = (self.key_fn)(ctx.agent(agent)?);
        match self.routes.get(&key) {
            Some(&to) => ctx.send(to, agent),
            None => Err(SimError::Rejected {
                block: self.common.id,
                agent,
                reason: RejectReason::MissingKey(key),
            }),
        }
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
