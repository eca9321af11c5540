//! `aim-spatial` — spatial substrates for the AIM engine.
//!
//! A *space* owns the physical side of agent movement: position, progress,
//! collision.  Blocks decide *where* agents go; spaces decide *how fast* and
//! *whether they fit*.  The two meet at the [`SpaceManager`] trait: a block
//! registers an agent with a placement, the simulator advances every space
//! once per tick, and the block polls [`SpaceManager::is_movement_complete`]
//! to learn when the agent may be ejected downstream.
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`entity`]    | `Entity`, `EntityKind` (belts and turntables)             |
//! | [`graph`]     | `ConveyorGraph` + builder (adjacency over entities)       |
//! | [`router`]    | `Route`, time-weighted Dijkstra over the entity graph     |
//! | [`space`]     | `SpaceManager` trait, `Placement`                         |
//! | [`conveyor`]  | `ConveyorSpace` — occupancy intervals, junction handoff   |
//! | [`open`]      | `OpenSpace` — collision-free straight-line transit        |
//! | [`error`]     | `SpatialError`, `SpatialResult`                           |

pub mod conveyor;
pub mod entity;
pub mod error;
pub mod graph;
pub mod open;
pub mod router;
pub mod space;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use conveyor::ConveyorSpace;
pub use entity::{Entity, EntityKind};
pub use error::{SpatialError, SpatialResult};
pub use graph::{ConveyorGraph, ConveyorGraphBuilder};
pub use open::OpenSpace;
pub use router::{shortest_route, Route};
pub use space::{Placement, SpaceManager};
