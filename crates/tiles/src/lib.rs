//! Procedural placement tile manager.
//!
//! Discovers which tiles of each placement layer are needed around reported
//! observers, runs a bounded number of external placement jobs for them,
//! caches finished tiles in a pooled slot array and evicts them when their
//! resource or sources change.
//!
//! # Invariants
//! - At most `max_processing_tiles` jobs are in flight after admission.
//! - A tile key is discovered at most once until its resource is invalidated.
//! - A committed key always points at an occupied slot holding that tile.
//! - Only [`TileManager::place_objects`] mutates the world.

mod config;
mod discovery;
mod emitter;
mod error;
mod job;
mod key;
mod layer_index;
mod manager;
mod pool;
mod registry;
mod slot;
mod visibility;

#[cfg(test)]
mod testing;

pub use config::ManagerConfig;
pub use discovery::{MAX_SCAN_RADIUS, discover_tiles, disc_offsets};
pub use emitter::{PlacementEmitter, PlacementVolume};
pub use error::ConfigError;
pub use job::{JobStatus, TileExecutor, TileJob};
pub use key::SpatialKey;
pub use layer_index::{LayerIndex, TileEntry};
pub use manager::{ManagerStats, TileManager};
pub use pool::TilePool;
pub use registry::{ActiveLayer, RegistryEntry, ResourceRegistry, SourceBounds};
pub use slot::{SlotState, TileDescriptor, TileSlot};
pub use visibility::{VisibilityQueue, VisibilityReporter, VisibilityRequest};
