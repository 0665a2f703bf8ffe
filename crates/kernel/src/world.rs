use placement_common::{EntityId, Transform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An event record produced by every mutation to the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorldEvent {
    /// Object was spawned with the given transform.
    Spawned {
        id: EntityId,
        prefab: String,
        transform: Transform,
    },
    /// Object was despawned.
    Despawned { id: EntityId },
    /// Simulation advanced one tick.
    Stepped { tick: u64 },
}

/// Per-object data stored in the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityData {
    /// Name of the object template that was instantiated.
    pub prefab: String,
    pub transform: Transform,
}

/// The authoritative world state.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    entities: BTreeMap<EntityId, EntityData>,
    tick: u64,
    /// Append-only event log of all mutations.
    #[serde(skip)]
    event_log: Vec<WorldEvent>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulation tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of objects in the world.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    pub fn entities(&self) -> &BTreeMap<EntityId, EntityData> {
        &self.entities
    }

    /// Spawn a new object. Returns its id.
    pub fn spawn(&mut self, prefab: impl Into<String>, transform: Transform) -> EntityId {
        let id = EntityId::new();
        let prefab = prefab.into();
        self.entities.insert(
            id,
            EntityData {
                prefab: prefab.clone(),
                transform,
            },
        );
        self.event_log.push(WorldEvent::Spawned {
            id,
            prefab,
            transform,
        });
        id
    }

    /// Remove an object. Returns its data if it existed.
    pub fn despawn(&mut self, id: EntityId) -> Option<EntityData> {
        let data = self.entities.remove(&id);
        if data.is_some() {
            self.event_log.push(WorldEvent::Despawned { id });
        } else {
            tracing::trace!(?id, "despawn of unknown entity ignored");
        }
        data
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityData> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) {
        self.tick += 1;
        self.event_log.push(WorldEvent::Stepped { tick: self.tick });
    }
}
