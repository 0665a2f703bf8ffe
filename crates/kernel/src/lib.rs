//! World kernel: the authoritative set of spawned objects.
//!
//! # Invariants
//! - All spawns and despawns flow through explicit operations and are logged.
//! - The tile manager only mutates the world from its commit phase.

pub mod world;

pub use world::{EntityData, World, WorldEvent};
