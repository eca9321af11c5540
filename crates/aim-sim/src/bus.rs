//! The two-phase agent event bus.
//!
//! # Next-tick delivery
//!
//! Agents stage events in their own outbox; at the end of every tick the
//! simulator collects all outboxes into the bus's staging buffer, and at the
//! delivery phase of the *next* tick that buffer is drained.  Nothing
//! emitted during tick `t` can reach a subscriber during tick `t` — not
//! even the emitter itself.
//!
//! # Determinism
//!
//! Collection walks agents in ascending id order and preserves each outbox's
//! emission order; delivery walks subscribers in first-subscription order.
//! The resulting delivery sequence is a pure function of the scenario.

use std::collections::HashMap;

use aim_agent::AgentStore;
use aim_core::AgentId;

/// Exact-string subscription table plus the staged-delivery buffer.
#[derive(Default)]
pub struct EventBus {
    /// Event tag → subscribers in first-subscription order.
    subscriptions: HashMap<String, Vec<AgentId>>,

    /// `(event, emitter)` pairs awaiting delivery at the next tick.
    staged: Vec<(String, AgentId)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `agent` to the exact tag `event`.  Idempotent; the first
    /// subscription fixes the agent's delivery position.
    pub fn subscribe(&mut self, agent: AgentId, event: &str) {
        let subs = self.subscriptions.entry(event.to_string()).or_default();
        if !subs.contains(&agent) {
            subs.push(agent);
        }
    }

    /// Subscribers of `event` in delivery order.
    pub fn subscribers(&self, event: &str) -> &[AgentId] {
        self.subscriptions
            .get(event)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Drain every live agent's outbox into the staging buffer, in ascending
    /// agent-id order.  Runs as the final phase of each tick.
    pub fn collect(&mut self, agents: &mut AgentStore) {
        let ids: Vec<AgentId> = agents.ids().collect();
        for id in ids {
            if let Some(agent) = agents.get_mut(id) {
                for event in agent.drain_outbox() {
                    self.staged.push((event, id));
                }
            }
        }
    }

    /// Take the buffer staged by the previous tick for delivery now.
    pub fn take_staged(&mut self) -> Vec<(String, AgentId)> {
        std::mem::take(&mut self.staged)
    }

    /// Number of events currently awaiting delivery.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }
}
