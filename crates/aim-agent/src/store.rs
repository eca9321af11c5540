//! `AgentStore` — the id-indexed agent arena.
//!
//! Blocks and spaces hold `AgentId`s, never agent values; every access goes
//! through the store.  Slots are never reused after destruction, so an id
//! observed anywhere in a run always refers to the same (possibly destroyed)
//! agent and two runs of the same scenario assign identical ids.

use aim_core::{AgentId, CoreError, CoreResult};

use crate::Agent;

/// Arena of all agents ever created in one simulation.
#[derive(Default)]
pub struct AgentStore {
    slots: Vec<Option<Agent>>,
    live: usize,
}

impl AgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh agent and return its id.
    pub fn insert(&mut self, width: f64, length: f64) -> AgentId {
        let id = AgentId(self.slots.len() as u32);
        self.slots.push(Some(Agent::new(id, width, length)));
        self.live += 1;
        id
    }

    /// Destroy an agent, freeing its slot.  Returns the agent, or `None` if
    /// it was already destroyed or never existed.
    pub fn remove(&mut self, id: AgentId) -> Option<Agent> {
        let slot = self.slots.get_mut(id.index())?;
        let agent = slot.take();
        if agent.is_some() {
            self.live -= 1;
        }
        agent
    }

    /// `true` if `id` refers to a live agent.
    pub fn contains(&self, id: AgentId) -> bool {
        matches!(self.slots.get(id.index()), Some(Some(_)))
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.slots.get(id.index())?.as_ref()
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    /// Like [`get`](Self::get) but failing with `CoreError::AgentNotFound`.
    pub fn agent(&self, id: AgentId) -> CoreResult<&Agent> {
        self.get(id).ok_or(CoreError::AgentNotFound(id))
    }

    /// Like [`get_mut`](Self::get_mut) but failing with `CoreError::AgentNotFound`.
    pub fn agent_mut(&mut self, id: AgentId) -> CoreResult<&mut Agent> {
        self.get_mut(id).ok_or(CoreError::AgentNotFound(id))
    }

    /// Number of live agents.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Total slots ever allocated, including destroyed ones.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterator over live agent ids in ascending order.
    ///
    /// This is the canonical iteration order for outbox collection, which is
    /// what makes cross-agent emission order deterministic.
    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| AgentId(i as u32))
    }

    /// Iterator over live agents in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }
}
