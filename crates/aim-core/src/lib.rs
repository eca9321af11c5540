//! `aim-core` — foundational types for the AIM flow-network simulation engine.
//!
//! This crate is a dependency of every other `aim-*` crate.  It intentionally
//! has no `aim-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module    | Contents                                          |
//! |-----------|---------------------------------------------------|
//! | [`ids`]   | `AgentId`, `BlockId`, `SpaceId`, `EntityId`       |
//! | [`time`]  | `Tick`, `SimConfig`                               |
//! | [`rng`]   | `SimRng` (the single per-simulator RNG)           |
//! | [`error`] | `CoreError`, `CoreResult`                         |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                               |
//! |---------|------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to ids and `Tick`.    |

pub mod error;
pub mod ids;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use ids::{AgentId, BlockId, EntityId, SpaceId};
pub use rng::SimRng;
pub use time::{SimConfig, Tick};
