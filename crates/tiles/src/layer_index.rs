use std::collections::HashMap;

use crate::key::SpatialKey;

/// What a layer knows about one tile key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileEntry {
    /// Discovered; waiting for admission or for its job to finish.
    Pending,
    /// Committed in the given pool slot.
    Slot(usize),
    /// Processed and produced nothing; kept so the tile is not rediscovered.
    Empty,
}

/// Per-layer spatial index of tiles that are known, in flight or committed.
///
/// Discovery consults it to stay idempotent: a key present in any state is
/// never discovered again until the layer is invalidated.
#[derive(Debug, Default, Clone)]
pub struct LayerIndex {
    entries: HashMap<SpatialKey, TileEntry>,
}

impl LayerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: SpatialKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get(&self, key: SpatialKey) -> Option<TileEntry> {
        self.entries.get(&key).copied()
    }

    /// Mark a key as discovered. Returns `false` if it was already present.
    pub fn mark_pending(&mut self, key: SpatialKey) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, TileEntry::Pending);
        true
    }

    /// Replace the pending marker of `key` with its committed slot.
    ///
    /// # Panics
    /// Panics if the key is not pending: the index and the pool disagree.
    pub fn commit(&mut self, key: SpatialKey, slot: usize) {
        match self.entries.get_mut(&key) {
            Some(entry) if *entry == TileEntry::Pending => *entry = TileEntry::Slot(slot),
            other => panic!(
                "tile index inconsistency: committing {:?} into slot {slot} but entry is {other:?}",
                key.coords()
            ),
        }
    }

    /// Record that the pending tile at `key` produced nothing.
    ///
    /// # Panics
    /// Panics if the key is not pending.
    pub fn mark_empty(&mut self, key: SpatialKey) {
        match self.entries.get_mut(&key) {
            Some(entry) if *entry == TileEntry::Pending => *entry = TileEntry::Empty,
            other => panic!(
                "tile index inconsistency: marking {:?} empty but entry is {other:?}",
                key.coords()
            ),
        }
    }

    pub fn remove(&mut self, key: SpatialKey) -> Option<TileEntry> {
        self.entries.remove(&key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, TileEntry::Pending))
            .count()
    }

    /// Committed keys and the slots that hold them.
    pub fn committed(&self) -> impl Iterator<Item = (SpatialKey, usize)> + '_ {
        self.entries.iter().filter_map(|(k, e)| match e {
            TileEntry::Slot(slot) => Some((*k, *slot)),
            TileEntry::Pending | TileEntry::Empty => None,
        })
    }
}
