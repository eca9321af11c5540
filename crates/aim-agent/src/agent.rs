//! The `Agent` — a passive mobile entity moving between blocks and spaces.
//!
//! # Ownership model
//!
//! At any instant a live agent is owned by exactly one block
//! (`current_block = Some(..)`) or held by a space mid-transit — never both.
//! A pickup that has been folded into a container is owned by that container
//! (`current_block = None`, a non-empty `parents` list) until a split block
//! releases it or a sink destroys the container.
//!
//! # Event staging
//!
//! `emit_event` only stages the event in the agent's outbox; the simulator
//! collects all outboxes at the end of the tick and delivers at the start of
//! the next.  An event emitted during tick `t` is therefore never seen by a
//! subscriber during tick `t` — including the emitter itself.

use std::collections::BTreeMap;

use aim_core::{AgentId, BlockId, EntityId, Tick};

// ── PropValue ─────────────────────────────────────────────────────────────────

/// A user-defined agent property.
///
/// Scenario code attaches routing flags, payload sizes and the like to
/// agents; `If` conditions and `Switch` key functions read them back.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int(v)
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Float(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Text(v.to_string())
    }
}

// ── SpaceState ────────────────────────────────────────────────────────────────

/// Spatial mirror maintained by the owning space while an agent is in
/// transit.  Observers read it between ticks; nothing else does.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpaceState {
    /// Interpolated world position, when the space tracks one.
    pub position: Option<[f64; 3]>,

    /// Entity the agent currently occupies (conveyor spaces only).
    pub entity: Option<EntityId>,

    /// Progress along the current entity in `[0, 1]`.
    pub progress_on_entity: f64,

    /// Time-weighted progress along the whole stored path in `[0, 1]`.
    /// Monotonically non-decreasing until the agent is unregistered.
    pub progress_on_path: f64,
}

// ── Agent ─────────────────────────────────────────────────────────────────────

/// A passive mobile entity.
///
/// Created through the agent store (directly or by a source block's factory)
/// and destroyed by a sink.  All behavior lives outside: blocks route it,
/// spaces move it, hooks registered with the simulator react for it.
#[derive(Debug)]
pub struct Agent {
    pub id: AgentId,

    /// Spatial footprint.  `length` drives conveyor occupancy intervals;
    /// both default to 0 for non-spatial agents.
    pub width: f64,
    pub length: f64,

    /// Block currently owning this agent, or `None` while it is in a space,
    /// folded into a container, or freshly spawned.
    pub current_block: Option<BlockId>,

    /// Pickups folded into this agent by a combine block.
    pub children: Vec<AgentId>,

    /// Containers this agent has been folded into (most recent last).
    pub parents: Vec<AgentId>,

    /// User-defined properties, readable by conditions and key functions.
    pub props: BTreeMap<String, PropValue>,

    /// Spatial mirror; owned by the registered space.
    pub space: SpaceState,

    /// Events staged for next-tick delivery (drained by the simulator).
    outbox: Vec<String>,

    /// Events delivered to this agent during `inbox_tick`.
    inbox: Vec<String>,
    inbox_tick: Tick,
}

impl Agent {
    pub fn new(id: AgentId, width: f64, length: f64) -> Self {
        Self {
            id,
            width,
            length,
            current_block: None,
            children: Vec::new(),
            parents: Vec::new(),
            props: BTreeMap::new(),
            space: SpaceState::default(),
            outbox: Vec::new(),
            inbox: Vec::new(),
            inbox_tick: Tick::ZERO,
        }
    }

    /// Read a user property.
    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    /// Set a user property, replacing any previous value.
    pub fn set_prop(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.props.insert(key.into(), value.into());
    }

    // ── Event staging ─────────────────────────────────────────────────────

    /// Stage `event` for delivery at the start of the next tick.
    ///
    /// Events are non-empty string tags; an empty tag is ignored in release
    /// builds and flagged in debug builds.
    pub fn emit_event(&mut self, event: impl Into<String>) {
        let event = event.into();
        debug_assert!(!event.is_empty(), "event tags must be non-empty");
        if !event.is_empty() {
            self.outbox.push(event);
        }
    }

    /// Drain everything staged since the last collection, in emission order.
    pub fn drain_outbox(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbox)
    }

    // ── Delivery trace ────────────────────────────────────────────────────

    /// Record a delivered event.  Called by the simulator during the
    /// delivery phase; the trace for older ticks is discarded lazily.
    pub fn record_delivery(&mut self, now: Tick, event: &str) {
        if self.inbox_tick != now {
            self.inbox.clear();
            self.inbox_tick = now;
        }
        self.inbox.push(event.to_string());
    }

    /// `true` if `event` was delivered to this agent during tick `now`.
    ///
    /// Event-released delay blocks poll this during the block-tick phase,
    /// which runs after delivery within the same tick.
    pub fn received(&self, now: Tick, event: &str) -> bool {
        self.inbox_tick == now && self.inbox.iter().any(|e| e == event)
    }
}
