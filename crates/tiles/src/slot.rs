use glam::{Affine3A, Vec3};
use placement_assets::ResourceId;
use placement_common::{Aabb, Color, EntityId};

use crate::key::SpatialKey;

/// A tile found by discovery, waiting for admission.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDescriptor {
    pub resource: ResourceId,
    /// Position of the layer within its resource.
    pub layer_index: usize,
    pub x: i32,
    pub y: i32,
    pub min_z: f32,
    pub max_z: f32,
    /// World-to-unit-box transforms of every source overlapping the tile.
    pub local_bounds: Vec<Affine3A>,
}

impl TileDescriptor {
    pub fn key(&self) -> SpatialKey {
        SpatialKey::tile(self.x, self.y)
    }

    /// World-space box covered by the tile.
    pub fn world_bounds(&self, tile_size: f32) -> Aabb {
        Aabb::new(
            Vec3::new(self.x as f32 * tile_size, self.y as f32 * tile_size, self.min_z),
            Vec3::new(
                (self.x + 1) as f32 * tile_size,
                (self.y + 1) as f32 * tile_size,
                self.max_z,
            ),
        )
    }
}

/// Lifecycle of a pooled tile slot.
///
/// `Free -> Pending -> Finished -> Committed | Free`. Any non-free slot
/// returns to `Free` when its resource is invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    /// Job started and not yet finished.
    Pending,
    /// Job finished; waiting for the commit phase.
    Finished,
    /// Objects placed and the tile is recorded in its layer index.
    Committed,
}

impl SlotState {
    /// Counts against the concurrency ceiling.
    pub fn is_in_flight(self) -> bool {
        matches!(self, SlotState::Pending | SlotState::Finished)
    }
}

/// One reusable cache entry in the tile pool.
#[derive(Debug)]
pub struct TileSlot<J> {
    pub(crate) state: SlotState,
    pub(crate) desc: Option<TileDescriptor>,
    pub(crate) job: Option<J>,
    pub(crate) bounds: Aabb,
    pub(crate) debug_color: Color,
    pub(crate) placed: Vec<EntityId>,
}

impl<J> Default for TileSlot<J> {
    fn default() -> Self {
        Self {
            state: SlotState::Free,
            desc: None,
            job: None,
            bounds: Aabb::new(Vec3::ZERO, Vec3::ZERO),
            debug_color: Color::default(),
            placed: Vec::new(),
        }
    }
}

impl<J> TileSlot<J> {
    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn is_free(&self) -> bool {
        self.state == SlotState::Free
    }

    /// Descriptor of the tile occupying this slot; `None` while free.
    pub fn desc(&self) -> Option<&TileDescriptor> {
        self.desc.as_ref()
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn debug_color(&self) -> Color {
        self.debug_color
    }

    /// Objects this tile spawned into the world.
    pub fn placed(&self) -> &[EntityId] {
        &self.placed
    }

    pub(crate) fn belongs_to(&self, resource: ResourceId) -> bool {
        self.desc.as_ref().is_some_and(|d| d.resource == resource)
    }

    pub(crate) fn initialize(&mut self, desc: TileDescriptor, job: J, tile_size: f32) {
        debug_assert!(self.is_free(), "initializing a slot that is in use");
        self.bounds = desc.world_bounds(tile_size);
        self.debug_color = Color::from_hash(desc.key().raw() ^ desc.layer_index as u64);
        self.desc = Some(desc);
        self.job = Some(job);
        self.placed.clear();
        self.state = SlotState::Pending;
    }

    /// Reset to free. Returns the job (if still held) and the placed objects
    /// so the caller can discard and despawn them.
    pub(crate) fn deinitialize(&mut self) -> (Option<J>, Vec<EntityId>) {
        self.state = SlotState::Free;
        self.desc = None;
        (self.job.take(), std::mem::take(&mut self.placed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(x: i32, y: i32) -> TileDescriptor {
        TileDescriptor {
            resource: ResourceId(7),
            layer_index: 0,
            x,
            y,
            min_z: -1.0,
            max_z: 4.0,
            local_bounds: vec![Affine3A::IDENTITY],
        }
    }

    #[test]
    fn world_bounds_span_one_tile() {
        let b = desc(1, -2).world_bounds(10.0);
        assert_eq!(b.min, Vec3::new(10.0, -20.0, -1.0));
        assert_eq!(b.max, Vec3::new(20.0, -10.0, 4.0));
    }

    #[test]
    fn slot_lifecycle() {
        let mut slot: TileSlot<&'static str> = TileSlot::default();
        assert!(slot.is_free());
        assert!(slot.desc().is_none());

        slot.initialize(desc(0, 0), "job", 10.0);
        assert_eq!(slot.state(), SlotState::Pending);
        assert!(slot.state().is_in_flight());
        assert!(slot.belongs_to(ResourceId(7)));
        assert!(!slot.belongs_to(ResourceId(8)));
        assert_eq!(slot.bounds().max.x, 10.0);

        let (job, placed) = slot.deinitialize();
        assert_eq!(job, Some("job"));
        assert!(placed.is_empty());
        assert!(slot.is_free());
        assert!(slot.desc().is_none());
        assert!(!slot.belongs_to(ResourceId(7)));
    }

    #[test]
    fn debug_color_follows_key() {
        let mut a: TileSlot<()> = TileSlot::default();
        let mut b: TileSlot<()> = TileSlot::default();
        a.initialize(desc(3, 4), (), 1.0);
        b.initialize(desc(3, 4), (), 1.0);
        assert_eq!(a.debug_color(), b.debug_color());
    }

    #[test]
    fn committed_is_not_in_flight() {
        assert!(!SlotState::Committed.is_in_flight());
        assert!(!SlotState::Free.is_in_flight());
        assert!(SlotState::Finished.is_in_flight());
    }
}
