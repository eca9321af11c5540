//! `ConveyorSpace` — agents on a graph of belts and turntables.
//!
//! # Occupancy model
//!
//! An agent on an entity covers the closed progress interval
//! `[p, min(p + length_ratio, 1)]`, where `length_ratio` is the agent's
//! length divided by the entity's length and `p` is the agent's progress.
//! Intervals of distinct agents on one entity must stay disjoint; touching
//! endpoints counts as a collision.  Admission (entry and junction handoff)
//! therefore requires every existing occupant's interval start to lie
//! strictly beyond the candidate interval `[0, length_ratio]`.
//!
//! # Advancement order
//!
//! Each update processes entities in id order and, within an entity, agents
//! from the front of the belt backwards, so a follower sees the space its
//! leader just vacated.  A follower never advances into its leader: its
//! progress is clamped a small fixed gap behind, which keeps the interval
//! disjointness invariant intact under the closed-interval convention.
//!
//! # Junctions
//!
//! When an agent's progress reaches 1 with path legs remaining, it attempts
//! a handoff onto the next entity at `[0, length_ratio]`.  If that entry is
//! blocked the agent stalls at the boundary (progress clamped to 1) and
//! retries on the next update.  Progress on the final leg reaching 1 marks
//! the movement complete; the agent keeps occupying the belt end until its
//! owning block unregisters it.

use std::collections::{BTreeMap, BTreeSet};

use aim_agent::{AgentStore, SpaceState};
use aim_core::{AgentId, EntityId};

use crate::graph::ConveyorGraph;
use crate::router::shortest_route;
use crate::space::{Placement, SpaceManager};

/// Minimum separation kept between occupancy intervals while following.
const OCCUPANCY_GAP: f64 = 1e-9;

// ── Transit ───────────────────────────────────────────────────────────────────

/// Movement state of one registered agent.
#[derive(Debug, Clone)]
struct Transit {
    /// Entities to traverse, in order.  Never empty.
    path: Vec<EntityId>,
    /// Index of the current entity within `path`.
    leg: usize,
    /// Progress on the current entity in `[0, 1]`.
    progress: f64,
    /// Set once progress reaches 1 on the final leg.
    done: bool,
    /// Agent length, cached so occupancy scans need no store access.
    agent_length: f64,
    /// Nominal traversal time of completed legs, in ticks.
    time_done: f64,
    /// Nominal traversal time of the whole path, in ticks.
    total_time: f64,
}

impl Transit {
    fn entity(&self) -> EntityId {
        self.path[self.leg]
    }

    fn on_last_leg(&self) -> bool {
        self.leg + 1 == self.path.len()
    }
}

// ── ConveyorSpace ─────────────────────────────────────────────────────────────

/// The conveyor-graph implementation of [`SpaceManager`].
pub struct ConveyorSpace {
    graph: ConveyorGraph,
    transits: BTreeMap<AgentId, Transit>,
}

impl ConveyorSpace {
    pub fn new(graph: ConveyorGraph) -> Self {
        Self {
            graph,
            transits: BTreeMap::new(),
        }
    }

    pub fn graph(&self) -> &ConveyorGraph {
        &self.graph
    }

    /// Number of agents currently in transit.
    pub fn len(&self) -> usize {
        self.transits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transits.is_empty()
    }

    /// Occupancy intervals on `entity`, ascending by interval start.
    pub fn occupancy(&self, entity: EntityId) -> Vec<(AgentId, f64, f64)> {
        let Some(length) = self.graph.get(entity).map(|e| e.length()) else {
            return Vec::new();
        };
        let mut spans: Vec<(AgentId, f64, f64)> = self
            .transits
            .iter()
            .filter(|(_, t)| t.entity() == entity)
            .map(|(&id, t)| {
                let ratio = t.agent_length / length;
                (id, t.progress, (t.progress + ratio).min(1.0))
            })
            .collect();
        spans.sort_by(|x, y| x.1.total_cmp(&y.1).then(x.0.cmp(&y.0)));
        spans
    }

    /// Overall path progress of a registered agent, in `[0, 1]`.
    pub fn progress_of(&self, agent: AgentId) -> Option<f64> {
        let t = self.transits.get(&agent)?;
        Some(self.path_progress(t))
    }

    /// Unregister only if the agent's transit currently sits on `entity`.
    ///
    /// Conveyor blocks use this after a successful downstream handoff: if
    /// the downstream block already re-registered the agent elsewhere in
    /// this same space, the stale unregister must not disturb it.
    pub fn unregister_from(
        &mut self,
        agents: &mut AgentStore,
        agent: AgentId,
        entity: EntityId,
    ) -> bool {
        match self.transits.get(&agent) {
            Some(t) if t.entity() == entity => self.unregister(agents, agent),
            _ => false,
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn path_progress(&self, t: &Transit) -> f64 {
        if t.done || t.total_time <= 0.0 {
            return 1.0;
        }
        let leg_time = self
            .graph
            .get(t.entity())
            .map(|e| e.traversal_time())
            .unwrap_or(0.0);
        ((t.time_done + t.progress * leg_time) / t.total_time).min(1.0)
    }

    /// `true` if the entry interval `[0, ratio]` on `entity` intersects any
    /// existing occupancy (closed intervals: touching blocks entry).
    fn entry_blocked(&self, entity: EntityId, ratio: f64) -> bool {
        self.occupancy(entity)
            .iter()
            .any(|(_, a, _)| *a <= ratio + OCCUPANCY_GAP)
    }

    /// Interval start of the nearest occupant ahead of `progress` on
    /// `entity`, excluding done scans of the querying agent (the caller
    /// removes its own transit from the map first).
    fn nearest_leader(&self, entity: EntityId, progress: f64) -> Option<f64> {
        self.occupancy(entity)
            .iter()
            .map(|(_, a, _)| *a)
            .filter(|a| *a >= progress)
            .min_by(|a, b| a.total_cmp(b))
    }

    fn attempt_place(
        &self,
        agents: &AgentStore,
        agent: AgentId,
        start: EntityId,
        end: EntityId,
    ) -> Option<Transit> {
        let agent_ref = agents.get(agent)?;
        let route = shortest_route(&self.graph, start, end).ok()?;

        // The agent must fit on every leg, not just the first; a mid-path
        // leg shorter than the agent would stall it forever.
        for &leg in &route.entities {
            let length = self.graph.get(leg)?.length();
            if agent_ref.length > length {
                return None;
            }
        }

        let first_len = self.graph.get(start)?.length();
        let ratio = agent_ref.length / first_len;
        if self.entry_blocked(start, ratio) {
            return None;
        }

        Some(Transit {
            total_time: route.total_time,
            path: route.entities,
            leg: 0,
            progress: 0.0,
            done: false,
            agent_length: agent_ref.length,
            time_done: 0.0,
        })
    }

    /// Advance a single transit by `delta_time`, handling junction handoffs.
    /// The transit is passed out-of-map so occupancy scans exclude it.
    fn advance(&self, t: &mut Transit, delta_time: f64) {
        let mut time_left = delta_time;
        // Bounded by path length plus one junction stall per call.
        while time_left > 0.0 && !t.done {
            let Some(entity) = self.graph.get(t.entity()) else {
                return;
            };
            let length = entity.length();
            let ratio = t.agent_length / length;

            let target = t.progress + entity.speed() * time_left / length;

            // Never advance into the agent ahead on this entity.
            if let Some(leader) = self.nearest_leader(t.entity(), t.progress) {
                let limit = leader - ratio - OCCUPANCY_GAP;
                if target > limit {
                    t.progress = limit.max(t.progress);
                    return;
                }
            }

            if target < 1.0 {
                t.progress = target;
                return;
            }

            // Boundary reached: spend the time it took to get there.
            let used = (1.0 - t.progress) * length / entity.speed();
            time_left = (time_left - used).max(0.0);

            if t.on_last_leg() {
                t.progress = 1.0;
                t.done = true;
                return;
            }

            let next = t.path[t.leg + 1];
            let Some(next_len) = self.graph.get(next).map(|e| e.length()) else {
                return;
            };
            if self.entry_blocked(next, t.agent_length / next_len) {
                // Stall at the junction; retry next update.
                t.progress = 1.0;
                return;
            }

            let Some(time) = self.graph.get(t.entity()).map(|e| e.traversal_time()) else {
                return;
            };
            t.time_done += time;
            t.leg += 1;
            t.progress = 0.0;
        }
    }

    fn sync_mirror(&self, agents: &mut AgentStore, agent: AgentId, t: &Transit) {
        if let Some(agent_ref) = agents.get_mut(agent) {
            let entity = t.entity();
            agent_ref.space.entity = Some(entity);
            agent_ref.space.progress_on_entity = t.progress;
            agent_ref.space.progress_on_path = self.path_progress(t);
            agent_ref.space.position = self.graph.get(entity).map(|e| e.position_at(t.progress));
        }
    }
}

// ── SpaceManager impl ─────────────────────────────────────────────────────────

impl SpaceManager for ConveyorSpace {
    fn register(
        &mut self,
        agents: &mut AgentStore,
        agent: AgentId,
        placement: &Placement,
    ) -> bool {
        let Placement::Conveyor { start, end } = *placement else {
            return false;
        };
        if !self.graph.contains(start) || !self.graph.contains(end) {
            return false;
        }

        // An agent re-registering (conveyor-to-conveyor chain within one
        // space) frees its old span first; on failure the old transit is
        // restored untouched.
        let prior = self.transits.remove(&agent);
        match self.attempt_place(agents, agent, start, end) {
            Some(transit) => {
                self.transits.insert(agent, transit);
                let t = self.transits[&agent].clone();
                self.sync_mirror(agents, agent, &t);
                true
            }
            None => {
                if let Some(p) = prior {
                    self.transits.insert(agent, p);
                }
                false
            }
        }
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
        let mut advanced: BTreeSet<AgentId> = BTreeSet::new();

        for entity in self.graph.ids().collect::<Vec<_>>() {
            // Front of the belt first, so followers advance into freed space.
            let mut on_entity: Vec<(AgentId, f64)> = self
                .transits
                .iter()
                .filter(|(_, t)| t.entity() == entity)
                .map(|(&id, t)| (id, t.progress))
                .collect();
            on_entity.sort_by(|x, y| y.1.total_cmp(&x.1).then(x.0.cmp(&y.0)));

            for (id, _) in on_entity {
                if !advanced.insert(id) {
                    continue;
                }
                let Some(mut t) = self.transits.remove(&id) else {
                    continue;
                };
                if !t.done {
                    self.advance(&mut t, delta_time);
                }
                self.sync_mirror(agents, id, &t);
                self.transits.insert(id, t);
            }
        }
    }

    fn is_movement_complete(&self, agent: AgentId) -> bool {
        self.transits.get(&agent).is_some_and(|t| t.done)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
