use std::sync::Arc;
use std::time::{Duration, Instant};

use placement_assets::{ResourceEvent, ResourceEventKind, ResourceId, ResourceStore};
use placement_common::{Aabb, Color, EntityId};
use placement_kernel::World;

use crate::config::ManagerConfig;
use crate::discovery::discover_tiles;
use crate::emitter::PlacementEmitter;
use crate::error::ConfigError;
use crate::job::{JobStatus, TileExecutor, TileJob};
use crate::layer_index::TileEntry;
use crate::pool::TilePool;
use crate::registry::{ResourceRegistry, SourceBounds};
use crate::slot::{SlotState, TileDescriptor};
use crate::visibility::{VisibilityQueue, VisibilityReporter};

/// Counters from the most recent update and commit.
#[derive(Debug, Clone, Default)]
pub struct ManagerStats {
    pub refreshed_resources: usize,
    pub discovered: usize,
    pub admitted: usize,
    pub finished: usize,
    pub committed: usize,
    pub released_empty: usize,
    pub invalidated: usize,
    /// Discovered tiles still waiting for admission.
    pub pending_tiles: usize,
    /// Admitted tiles not yet committed or released.
    pub processing_tiles: usize,
    pub pool_size: usize,
    pub free_slots: usize,
    pub update_time: Duration,
}

/// Streams procedurally placed content around observers.
///
/// Each tick runs in two phases. [`TileManager::update`] refreshes resources,
/// discovers tiles around reported observers, admits them up to the
/// configured ceiling and polls their jobs. [`TileManager::place_objects`]
/// then commits finished tiles into the world; it is the only phase that
/// touches the world and must not overlap with other world mutation.
pub struct TileManager<E: TileExecutor> {
    config: ManagerConfig,
    executor: E,
    registry: ResourceRegistry,
    pool: TilePool<E::Job>,
    visibility: Arc<VisibilityQueue>,
    resources_to_update: Vec<ResourceId>,
    /// Discovered tiles awaiting admission; admitted last-in first-out.
    new_tiles: Vec<TileDescriptor>,
    /// Slots whose jobs are in flight or finished but not yet committed.
    processing: Vec<usize>,
    /// Objects of freed tiles, despawned in the next commit phase.
    despawn_queue: Vec<EntityId>,
    stats: ManagerStats,
}

impl<E: TileExecutor> TileManager<E> {
    pub fn new(config: ManagerConfig, executor: E) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            executor,
            registry: ResourceRegistry::new(),
            pool: TilePool::new(),
            visibility: Arc::new(VisibilityQueue::new()),
            resources_to_update: Vec::new(),
            new_tiles: Vec::new(),
            processing: Vec::new(),
            despawn_queue: Vec::new(),
            stats: ManagerStats::default(),
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Replace the configuration. Takes effect from the next update.
    pub fn set_config(&mut self, config: ManagerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Handle for render-time code to report observers.
    pub fn reporter(&self) -> VisibilityReporter {
        VisibilityReporter::new(self.visibility.clone())
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &TilePool<E::Job> {
        &self.pool
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn pending_tiles(&self) -> &[TileDescriptor] {
        &self.new_tiles
    }

    pub fn processing_count(&self) -> usize {
        self.processing.len()
    }

    pub fn stats(&self) -> &ManagerStats {
        &self.stats
    }

    // --- Emitters and resource events ---

    /// An emitter became active: remember its bounds and schedule a layer
    /// refresh for its resource.
    pub fn add_component(&mut self, emitter: &impl PlacementEmitter) {
        let Some(resource) = emitter.resource() else {
            return;
        };
        self.request_refresh(resource);
        self.registry
            .register_source(resource, SourceBounds::from_emitter(emitter));
        tracing::debug!(?resource, component = ?emitter.component_id(), "placement source added");
    }

    /// An emitter was deactivated: drop its bounds and every tile of its
    /// resource. The remaining sources repopulate on the next discovery.
    pub fn remove_component(&mut self, emitter: &impl PlacementEmitter) {
        let Some(resource) = emitter.resource() else {
            return;
        };
        self.registry
            .unregister_source(resource, emitter.component_id());
        self.invalidate_all_tiles(resource);
        tracing::debug!(?resource, component = ?emitter.component_id(), "placement source removed");
    }

    /// An emitter's extents or transform changed.
    pub fn update_component(&mut self, emitter: &impl PlacementEmitter) {
        self.remove_component(emitter);
        self.add_component(emitter);
    }

    /// React to resource content being replaced or dropped.
    pub fn on_resource_event(&mut self, event: &ResourceEvent) {
        if event.kind != ResourceEventKind::ContentUnloading {
            return;
        }
        if self.registry.contains(event.resource) {
            self.request_refresh(event.resource);
        }
    }

    /// Queue a layer refresh and full invalidation for the next update.
    pub fn request_refresh(&mut self, resource: ResourceId) {
        if !self.resources_to_update.contains(&resource) {
            self.resources_to_update.push(resource);
        }
    }

    /// Forget every tile of `resource`: layer indices are cleared, queued
    /// descriptors dropped, and every occupied slot freed with its job
    /// discarded. Returns the number of slots freed.
    pub fn invalidate_all_tiles(&mut self, resource: ResourceId) -> usize {
        self.registry.clear_indices(resource);
        self.new_tiles.retain(|d| d.resource != resource);

        let owned: Vec<usize> = self
            .pool
            .iter()
            .filter(|(_, slot)| slot.belongs_to(resource))
            .map(|(index, _)| index)
            .collect();
        for &index in &owned {
            self.free_slot(index);
        }
        self.processing.retain(|index| !owned.contains(index));

        if !owned.is_empty() {
            tracing::debug!(?resource, freed = owned.len(), "invalidated placement tiles");
        }
        owned.len()
    }

    // --- Phase A ---

    /// Discovery, admission and job polling. Does not touch the world.
    pub fn update(&mut self, resources: &ResourceStore) {
        let _span = tracing::info_span!("placement_update").entered();
        let start = Instant::now();
        let mut stats = ManagerStats::default();

        for resource in std::mem::take(&mut self.resources_to_update) {
            let layers = match resources.layers(resource) {
                Ok(layers) => layers,
                Err(err) => {
                    tracing::warn!(?resource, %err, "placement resource unavailable, dropping its layers");
                    Vec::new()
                }
            };
            tracing::debug!(?resource, layers = layers.len(), "refreshing placement layers");
            self.registry.refresh_layers(resource, layers);
            stats.invalidated += self.invalidate_all_tiles(resource);
            stats.refreshed_resources += 1;
        }

        for request in self.visibility.drain_all() {
            let (entry, created) = self.registry.entry(request.resource);
            if created {
                // First sighting: layers arrive with the refresh next update.
                if !self.resources_to_update.contains(&request.resource) {
                    self.resources_to_update.push(request.resource);
                }
                continue;
            }
            stats.discovered += discover_tiles(
                &request,
                entry,
                self.config.cull_distance_scale,
                &mut self.new_tiles,
            );
        }

        stats.admitted = self.admit_new_tiles();

        for &index in &self.processing {
            let Some(slot) = self.pool.get_mut(index) else {
                continue;
            };
            if slot.state != SlotState::Pending {
                continue;
            }
            if let Some(job) = slot.job.as_mut() {
                if job.poll() == JobStatus::Finished {
                    slot.state = SlotState::Finished;
                    stats.finished += 1;
                }
            }
        }

        stats.pending_tiles = self.new_tiles.len();
        stats.processing_tiles = self.processing.len();
        stats.pool_size = self.pool.len();
        stats.free_slots = self.pool.free_count();
        stats.update_time = start.elapsed();

        tracing::trace!(
            discovered = stats.discovered,
            admitted = stats.admitted,
            finished = stats.finished,
            pending = stats.pending_tiles,
            processing = stats.processing_tiles,
            "placement update complete"
        );
        self.stats = stats;
    }

    fn admit_new_tiles(&mut self) -> usize {
        let mut admitted = 0;
        while self.processing.len() < self.config.max_processing_tiles {
            let Some(desc) = self.new_tiles.pop() else {
                break;
            };
            let Some(active) = self.registry.layer(desc.resource, desc.layer_index) else {
                panic!(
                    "tile ({}, {}) refers to missing layer {} of {:?}",
                    desc.x, desc.y, desc.layer_index, desc.resource
                );
            };
            let layer = active.layer.clone();

            let job = self.executor.start(&desc, &layer);
            let (x, y) = (desc.x, desc.y);
            let index = self.pool.admit(desc, job, layer.tile_size());
            self.processing.push(index);
            admitted += 1;
            tracing::debug!(x, y, layer = %layer.name, slot = index, "admitted placement tile");
        }
        admitted
    }

    // --- Phase B ---

    /// Commit finished tiles into the world and despawn objects of tiles
    /// freed since the last call.
    pub fn place_objects(&mut self, world: &mut World) {
        let _span = tracing::info_span!("placement_place_objects").entered();

        for id in self.despawn_queue.drain(..) {
            world.despawn(id);
        }

        let mut i = 0;
        while i < self.processing.len() {
            let index = self.processing[i];
            let Some(slot) = self.pool.get_mut(index) else {
                self.processing.swap_remove(i);
                continue;
            };
            if slot.state != SlotState::Finished {
                i += 1;
                continue;
            }

            let placed = match slot.job.as_mut() {
                Some(job) => job.place(world),
                None => Vec::new(),
            };
            let Some(desc) = slot.desc.as_ref() else {
                panic!("finished tile slot {index} has no descriptor");
            };
            let (resource, layer_index, key) = (desc.resource, desc.layer_index, desc.key());

            let Some(active) = self.registry.layer_mut(resource, layer_index) else {
                panic!("finished tile slot {index} refers to missing layer {layer_index} of {resource:?}");
            };

            if placed.is_empty() {
                active.index.mark_empty(key);
                self.free_slot(index);
                self.stats.released_empty += 1;
                tracing::debug!(slot = index, "placement tile produced nothing, slot released");
            } else {
                active.index.commit(key, index);
                tracing::debug!(slot = index, placed = placed.len(), "placement tile committed");
                if let Some(slot) = self.pool.get_mut(index) {
                    slot.placed = placed;
                    slot.state = SlotState::Committed;
                }
                self.stats.committed += 1;
            }
            self.processing.swap_remove(i);
        }

        self.stats.processing_tiles = self.processing.len();
        self.stats.free_slots = self.pool.free_count();
    }

    /// Run both phases back to back.
    pub fn tick(&mut self, resources: &ResourceStore, world: &mut World) {
        self.update(resources);
        self.place_objects(world);
    }

    /// Discard every job and despawn every placed object.
    pub fn shutdown(&mut self, world: &mut World) {
        let resources: Vec<ResourceId> = self.registry.iter().map(|(id, _)| *id).collect();
        for resource in resources {
            self.invalidate_all_tiles(resource);
        }
        for id in self.despawn_queue.drain(..) {
            world.despawn(id);
        }
        self.resources_to_update.clear();
        self.visibility.drain_all();
    }

    // --- Debugging ---

    /// Bounds and color of every occupied slot, for a debug-draw layer.
    pub fn debug_tiles(&self) -> impl Iterator<Item = (Aabb, Color)> + '_ {
        self.pool
            .iter()
            .filter(|(_, slot)| !slot.is_free())
            .map(|(_, slot)| (slot.bounds(), slot.debug_color()))
    }

    /// Verify that the layer indices, the pool and the in-flight list agree.
    ///
    /// # Panics
    /// Panics on the first inconsistency found.
    pub fn check_invariants(&self) {
        for (resource, entry) in self.registry.iter() {
            for (layer_index, active) in entry.layers.iter().enumerate() {
                for (key, index) in active.index.committed() {
                    let Some(slot) = self.pool.get(index) else {
                        panic!("{key:?} of {resource:?} points past the pool at slot {index}");
                    };
                    assert!(
                        !slot.is_free(),
                        "{key:?} of {resource:?} is committed to free slot {index}"
                    );
                    assert_eq!(slot.state(), SlotState::Committed, "slot {index} state");
                    let desc = slot.desc().filter(|d| {
                        d.resource == *resource && d.layer_index == layer_index && d.key() == key
                    });
                    assert!(desc.is_some(), "slot {index} does not hold {key:?} of {resource:?}");
                }
            }
        }

        assert!(
            self.processing.len() <= self.pool.active_count(),
            "more tiles in flight than occupied slots"
        );
        for &index in &self.processing {
            let state = self.pool.get(index).map(|s| s.state());
            assert!(
                state.is_some_and(SlotState::is_in_flight),
                "in-flight slot {index} is {state:?}"
            );
        }

        for (index, slot) in self.pool.iter() {
            if slot.state() == SlotState::Committed {
                let desc = slot.desc().unwrap_or_else(|| panic!("committed slot {index} has no descriptor"));
                let entry = self
                    .registry
                    .layer(desc.resource, desc.layer_index)
                    .and_then(|l| l.index.get(desc.key()));
                assert_eq!(entry, Some(TileEntry::Slot(index)), "committed slot {index} is not indexed");
            }
        }
    }

    fn free_slot(&mut self, index: usize) {
        let (job, placed) = self.pool.release(index);
        if let Some(job) = job {
            job.discard();
        }
        self.despawn_queue.extend(placed);
    }
}
