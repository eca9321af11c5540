//! `aim-sim` — the AIM engine: tick loop, event bus, blocks.
//!
//! # Five-phase tick loop
//!
//! ```text
//! for tick in 0..max_ticks:
//!   ① Callbacks — scheduled entries with due_tick ≤ t fire in (due, seq)
//!                 order; recurring entries re-queue at due + period.
//!   ② Spaces    — every SpaceManager advances its agents by Δt = 1.
//!   ③ Delivery  — events staged last tick reach subscribers: emission
//!                 order × subscriber registration order, exact match.
//!   ④ Blocks    — registration order.  Blocks eject held agents by
//!                 calling the downstream take; a rejection means "retry
//!                 next tick" and is absorbed by the upstream.
//!   ⑤ Rotation  — agent outboxes are collected; everything emitted during
//!                 ①–④ becomes the next tick's delivery buffer.
//! ```
//!
//! # Crate layout
//!
//! | Module        | Contents                                              |
//! |---------------|-------------------------------------------------------|
//! | [`simulator`] | `Simulator` — state owner and tick driver             |
//! | [`block`]     | `Block` trait, `BlockCommon`, `BlockArena`            |
//! | [`blocks`]    | The canonical block family                            |
//! | [`bus`]       | `EventBus` — two-phase, exact-match                   |
//! | [`ctx`]       | `EngineCtx` — the surface blocks and callbacks run on |
//! | [`hooks`]     | `AgentHooks`, `HookCtx`, `AgentSpec`                  |
//! | [`observer`]  | `SimObserver`, `NoopObserver`                         |
//! | [`error`]     | `SimError`, `RejectReason`, `SimResult`               |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use aim_sim::{blocks::{Sink, Source}, Simulator};
//!
//! let mut sim = Simulator::new(10, 42);
//! let source = sim.add_block(Source::new(1));
//! let sink = sim.add_block(Sink::new());
//! sim.connect(source, sink)?;
//! sim.run()?;
//! assert_eq!(sim.block::<Sink>(sink)?.count(), 10);
//! ```

pub mod block;
pub mod blocks;
pub mod bus;
pub mod ctx;
pub mod error;
pub mod hooks;
pub mod observer;
pub mod simulator;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use block::{drain_fifo, Block, BlockArena, BlockCommon, BlockHook};
pub use bus::EventBus;
pub use ctx::{EngineCtx, ScheduledCallback, SpaceRegistry};
pub use error::{RejectReason, SimError, SimResult};
pub use hooks::{AgentHooks, AgentSpec, HookCtx, HookMap};
pub use observer::{NoopObserver, SimObserver};
pub use simulator::Simulator;
