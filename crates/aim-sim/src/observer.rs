//! Simulation observer trait for progress reporting and data collection.

use aim_agent::AgentStore;
use aim_core::Tick;

/// Callbacks invoked by [`Simulator::run_with`][crate::Simulator::run_with]
/// at tick boundaries.
///
/// Observers see a consistent snapshot — every phase of the tick has
/// completed when `on_tick_end` fires — and must treat it as read-only.
/// All methods have default no-op implementations.
///
/// # Example — throughput printer
///
/// ```rust,ignore
/// struct Throughput;
///
/// impl SimObserver for Throughput {
///     fn on_tick_end(&mut self, tick: Tick, agents: &AgentStore) {
///         println!("{tick}: {} live agents", agents.len());
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called at the very start of each tick, before any phase runs.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called after the final phase of each tick.
    fn on_tick_end(&mut self, _tick: Tick, _agents: &AgentStore) {}

    /// Called once after the final tick completes.
    fn on_sim_end(&mut self, _final_tick: Tick) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
