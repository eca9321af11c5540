//! `OpenSpace` — collision-free straight-line transit.
//!
//! The simplest `SpaceManager`: each registered agent travels from a start
//! point to a target point at constant speed, ignoring every other agent.
//! Useful for forklifts crossing a hall, operators walking between stations,
//! and as the minimal reference implementation of the space contract.

use std::collections::BTreeMap;

use aim_agent::{AgentStore, SpaceState};
use aim_core::AgentId;

use crate::space::{Placement, SpaceManager};

// ── LineTransit ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct LineTransit {
    from: [f64; 3],
    to: [f64; 3],
    speed: f64,
    total_dist: f64,
    /// Fraction of the line covered, in `[0, 1]`.
    progress: f64,
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let dz = b[2] - a[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

fn lerp(a: [f64; 3], b: [f64; 3], f: f64) -> [f64; 3] {
    [
        a[0] + (b[0] - a[0]) * f,
        a[1] + (b[1] - a[1]) * f,
        a[2] + (b[2] - a[2]) * f,
    ]
}

// ── OpenSpace ─────────────────────────────────────────────────────────────────

/// A space with no collision model.
#[derive(Default)]
pub struct OpenSpace {
    transits: BTreeMap<AgentId, LineTransit>,
}

impl OpenSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transits.is_empty()
    }
}

impl SpaceManager for OpenSpace {
    fn register(
        &mut self,
        agents: &mut AgentStore,
        agent: AgentId,
        placement: &Placement,
    ) -> bool {
        let Placement::Line { from, to, speed } = *placement else {
            return false;
        };
        if speed <= 0.0 || agents.get(agent).is_none() {
            return false;
        }

        let total_dist = distance(from, to);
        // Zero-length trips complete immediately.
        let progress = if total_dist <= 0.0 { 1.0 } else { 0.0 };
        self.transits.insert(
            agent,
            LineTransit {
                from,
                to,
                speed,
                total_dist,
                progress,
            },
        );

        if let Some(agent_ref) = agents.get_mut(agent) {
            agent_ref.space.position = Some(from);
            agent_ref.space.entity = None;
            agent_ref.space.progress_on_entity = progress;
            agent_ref.space.progress_on_path = progress;
        }
        true
    }

    fn unregister(&mut self, agents: &mut AgentStore, agent: AgentId) -> bool {
        if self.transits.remove(&agent).is_none() {
            return false;
        }
        if let Some(agent_ref) = agents.get_mut(agent) {
            agent_ref.space = SpaceState::default();
        }
        true
    }

    fn update(&mut self, agents: &mut AgentStore, delta_time: f64) {
        for (&id, t) in self.transits.iter_mut() {
            if t.progress < 1.0 && t.total_dist > 0.0 {
                t.progress = (t.progress + t.speed * delta_time / t.total_dist).min(1.0);
            }
            if let Some(agent_ref) = agents.get_mut(id) {
                agent_ref.space.position = Some(lerp(t.from, t.to, t.progress));
                agent_ref.space.progress_on_entity = t.progress;
                agent_ref.space.progress_on_path = t.progress;
            }
        }
    }

    fn is_movement_complete(&self, agent: AgentId) -> bool {
        self.transits.get(&agent).is_some_and(|t| t.progress >= 1.0)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
