//! The `SpaceManager` contract.
//!
//! A space exclusively owns the spatial-transit state of an agent between
//! `register` and the moment `is_movement_complete` turns true and the
//! owning block unregisters it.  The simulator calls `update` exactly once
//! per tick, before event delivery and block ticks; blocks call
//! `register`/`unregister` during the block-tick phase.  The two never
//! overlap in time, so a space needs no interior synchronization.

use std::any::Any;

use aim_agent::AgentStore;
use aim_core::{AgentId, EntityId};

// ── Placement ─────────────────────────────────────────────────────────────────

/// Where a block wants an agent to travel within a space.
///
/// Each space implementation understands the variants that match its model
/// and returns `false` from `register` for the rest.
#[derive(Clone, Debug)]
pub enum Placement {
    /// Travel across a conveyor graph from `start` to `end`.
    Conveyor { start: EntityId, end: EntityId },

    /// Travel in a straight line at constant speed (distance/tick).
    Line {
        from: [f64; 3],
        to: [f64; 3],
        speed: f64,
    },
}

// ── SpaceManager ──────────────────────────────────────────────────────────────

/// Abstract spatial substrate.
///
/// `register` answers with a plain `bool`: `false` is the routine "does not
/// fit right now" signal (collision, unreachable destination) that the
/// calling block converts into a rejection for its upstream to retry.
/// Spaces keep the agent's [`SpaceState`][aim_agent::SpaceState] mirror
/// current so observers can read positions between ticks.
pub trait SpaceManager: Any {
    /// Begin a transit.  Returns `false` if the agent cannot be placed.
    fn register(&mut self, agents: &mut AgentStore, agent: AgentId, placement: &Placement)
        -> bool;

    /// End a transit and clear the agent's spatial mirror.  Returns `false`
    /// if the agent was not registered.
    fn unregister(&mut self, agents: &mut AgentStore, agent: AgentId) -> bool;

    /// Advance all owned agents by `delta_time` ticks.
    fn update(&mut self, agents: &mut AgentStore, delta_time: f64);

    /// `true` once the agent has finished its registered transit.
    fn is_movement_complete(&self, agent: AgentId) -> bool;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
