//! Core simulation data structures and the event-driven engine.
//!
//! Leaf-first: vectors, entities (particles, walls, vertices), collision prediction,
//! the lazily invalidated event queue, collision response, and the simulation loop.

pub mod event;
pub mod particle;
pub mod placement;
pub mod predict;
pub mod queue;
pub mod resolve;
pub mod sim;
pub mod vector;
pub mod wall;

pub use event::{Event, EventKind};
pub use particle::Particle;
pub use placement::{place_particles, Placement};
pub use queue::{EventQueue, QueueStats};
pub use sim::{Collision, Phase, RunOptions, RunSummary, Simulation, StopReason};
pub use vector::Vector;
pub use wall::{Enclosure, Orientation, Vertex, Wall};
