//! Contract with the external tile job executor.
//!
//! The manager never runs placement itself. It starts a job per admitted
//! tile, polls it once per update, asks a finished job to place its objects
//! during the commit phase, and discards jobs whose tiles are invalidated.

use std::sync::Arc;

use placement_assets::Layer;
use placement_common::EntityId;
use placement_kernel::World;

use crate::slot::TileDescriptor;

/// Result of polling a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Finished,
}

/// Handle to the background work for one tile.
pub trait TileJob {
    /// Advance or check the job. Must not block.
    fn poll(&mut self) -> JobStatus;

    /// Spawn the job's results into the world and return what was spawned.
    ///
    /// Only called once, after `poll` has returned [`JobStatus::Finished`].
    /// An empty result frees the tile for reuse.
    fn place(&mut self, world: &mut World) -> Vec<EntityId>;

    /// Abandon the job. Nothing may be spawned for it afterwards.
    fn discard(self);
}

/// Starts jobs for admitted tiles.
pub trait TileExecutor {
    type Job: TileJob;

    fn start(&mut self, desc: &TileDescriptor, layer: &Arc<Layer>) -> Self::Job;
}
