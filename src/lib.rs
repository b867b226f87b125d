//! Event-driven hard-disk gas simulation in a two-chamber polygonal enclosure.
//!
//! Particles fly freely between collisions; the engine jumps from one predicted
//! collision to the next using a lazily invalidated priority queue.

pub mod config;
pub mod core;
pub mod error;
pub mod input;
pub mod output;
pub mod stream;
pub mod verify;

#[cfg(feature = "python")]
mod python;

pub use crate::config::SimConfig;
pub use crate::core::Simulation;
pub use crate::error::{Error, Result};
