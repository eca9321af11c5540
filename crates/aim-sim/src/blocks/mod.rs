//! The canonical block family.
//!
//! | Block                               | Role |
//! |-------------------------------------|------|
//! | [`Source`]                          | Spawns agents into the network each tick. |
//! | [`Queue`]                           | Unbounded FIFO buffer. |
//! | [`Delay`]                           | Holds agents for a fixed tick count or until an event. |
//! | [`Gate`]                            | Open/closed valve with one-per-tick or drain release. |
//! | [`IfBlock`]                         | Two-way predicate router. |
//! | [`Switch`]                          | Keyed multi-way router. |
//! | [`RestrictedAreaStart`] / [`RestrictedAreaEnd`] | Bounded-occupancy zone pair. |
//! | [`Combine`]                         | Folds pickups into a container. |
//! | [`Split`]                           | Unfolds a container, all-or-nothing. |
//! | [`Sink`]                            | Terminal counter; destroys agents. |
//! | [`ConveyorBlock`] / [`ConveyorExit`]| Transit across a conveyor space. |
//! | [`MoveBlock`]                       | Transit across an open space. |

mod branch;
mod combine;
mod conveyor;
mod delay;
mod gate;
mod move_block;
mod queue;
mod restricted;
mod sink;
mod source;
mod split;
mod switch;

pub use branch::IfBlock;
pub use combine::{Combine, CombineHandles, CombinePort};
pub(crate) use combine::PortRole;
pub use conveyor::{ConveyorBlock, ConveyorExit};
pub use delay::{Delay, DelayMode};
pub use gate::{Gate, GateState, ReleaseMode};
pub use move_block::MoveBlock;
pub use queue::Queue;
pub use restricted::{RestrictedAreaEnd, RestrictedAreaStart};
pub use sink::Sink;
pub use source::{AgentFactory, Source, SpawnSchedule};
pub use split::Split;
pub use switch::Switch;
