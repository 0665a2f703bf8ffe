use placement_common::EntityId;

use crate::slot::{TileDescriptor, TileSlot};

/// Growable pool of tile slots with free-list reuse.
///
/// Slots are addressed by index and never move, so indices held by layer
/// indices and the in-flight list stay valid while the pool grows.
#[derive(Debug)]
pub struct TilePool<J> {
    slots: Vec<TileSlot<J>>,
    free: Vec<usize>,
}

impl<J> Default for TilePool<J> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<J> TilePool<J> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupy a slot with a freshly started tile. Reuses the most recently
    /// freed slot; the pool only grows when the free list is empty.
    pub fn admit(&mut self, desc: TileDescriptor, job: J, tile_size: f32) -> usize {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(TileSlot::default());
                self.slots.len() - 1
            }
        };
        self.slots[index].initialize(desc, job, tile_size);
        index
    }

    /// Return a slot to the free list. Hands back the job, if the slot still
    /// held one, and the objects it had placed.
    ///
    /// # Panics
    /// Panics if the slot is already free.
    pub fn release(&mut self, index: usize) -> (Option<J>, Vec<EntityId>) {
        let slot = &mut self.slots[index];
        assert!(!slot.is_free(), "double release of tile slot {index}");
        let released = slot.deinitialize();
        self.free.push(index);
        released
    }

    pub fn get(&self, index: usize) -> Option<&TileSlot<J>> {
        self.slots.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut TileSlot<J>> {
        self.slots.get_mut(index)
    }

    /// Total number of slots, free or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &TileSlot<J>)> {
        self.slots.iter().enumerate()
    }
}
