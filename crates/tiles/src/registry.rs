use std::collections::HashMap;
use std::sync::Arc;

use glam::Affine3A;
use placement_assets::{Layer, ResourceId};
use placement_common::{Aabb, ComponentId};

use crate::emitter::PlacementEmitter;
use crate::layer_index::LayerIndex;

/// Bounds contributed by one active emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBounds {
    pub global: Aabb,
    pub local: Affine3A,
    pub component: ComponentId,
}

impl SourceBounds {
    pub fn from_emitter(emitter: &impl PlacementEmitter) -> Self {
        Self {
            global: emitter.global_bounds(),
            local: emitter.local_bounds(),
            component: emitter.component_id(),
        }
    }
}

/// A resource layer together with the tiles known for it.
#[derive(Debug, Clone)]
pub struct ActiveLayer {
    pub layer: Arc<Layer>,
    pub index: LayerIndex,
}

impl ActiveLayer {
    pub fn new(layer: Arc<Layer>) -> Self {
        Self {
            layer,
            index: LayerIndex::new(),
        }
    }
}

/// Everything the manager tracks for one placement resource.
#[derive(Debug, Clone, Default)]
pub struct RegistryEntry {
    pub layers: Vec<ActiveLayer>,
    pub sources: Vec<SourceBounds>,
}

/// Loaded placement resources, their active layers and source bounds.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    entries: HashMap<ResourceId, RegistryEntry>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, resource: ResourceId) -> Option<&RegistryEntry> {
        self.entries.get(&resource)
    }

    pub fn get_mut(&mut self, resource: ResourceId) -> Option<&mut RegistryEntry> {
        self.entries.get_mut(&resource)
    }

    /// Entry for `resource`, created empty on first use. The flag is `true`
    /// when the entry was just created.
    pub fn entry(&mut self, resource: ResourceId) -> (&mut RegistryEntry, bool) {
        let created = !self.entries.contains_key(&resource);
        (self.entries.entry(resource).or_default(), created)
    }

    pub fn contains(&self, resource: ResourceId) -> bool {
        self.entries.contains_key(&resource)
    }

    /// Add or replace the bounds of one emitter.
    pub fn register_source(&mut self, resource: ResourceId, bounds: SourceBounds) {
        let (entry, _) = self.entry(resource);
        match entry
            .sources
            .iter_mut()
            .find(|s| s.component == bounds.component)
        {
            Some(existing) => *existing = bounds,
            None => entry.sources.push(bounds),
        }
    }

    /// Remove the bounds of one emitter. The entry itself stays, even when
    /// empty, until the resource is invalidated.
    pub fn unregister_source(&mut self, resource: ResourceId, component: ComponentId) -> bool {
        let Some(entry) = self.entries.get_mut(&resource) else {
            return false;
        };
        match entry.sources.iter().position(|s| s.component == component) {
            Some(i) => {
                entry.sources.swap_remove(i);
                true
            }
            None => false,
        }
    }

    /// Replace the active layers with the resource's current layer list.
    ///
    /// Indices are rebuilt empty; the caller must invalidate the resource's
    /// tiles afterwards so no slot refers to a stale layer.
    pub fn refresh_layers(&mut self, resource: ResourceId, layers: Vec<Arc<Layer>>) {
        let (entry, _) = self.entry(resource);
        entry.layers = layers.into_iter().map(ActiveLayer::new).collect();
    }

    /// Forget every tile known to the resource's layers.
    pub fn clear_indices(&mut self, resource: ResourceId) {
        if let Some(entry) = self.entries.get_mut(&resource) {
            for layer in &mut entry.layers {
                layer.index.clear();
            }
        }
    }

    pub fn layer(&self, resource: ResourceId, layer_index: usize) -> Option<&ActiveLayer> {
        self.entries.get(&resource)?.layers.get(layer_index)
    }

    pub fn layer_mut(&mut self, resource: ResourceId, layer_index: usize) -> Option<&mut ActiveLayer> {
        self.entries.get_mut(&resource)?.layers.get_mut(layer_index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &RegistryEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::SpatialKey;
    use glam::Vec3;

    fn source(component: ComponentId, x: f32) -> SourceBounds {
        SourceBounds {
            global: Aabb::new(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 1.0, 1.0)),
            local: Affine3A::IDENTITY,
            component,
        }
    }

    fn layer() -> Arc<Layer> {
        Arc::new(Layer::new("grass", 10.0, 25.0, "tuft").unwrap())
    }

    #[test]
    fn register_creates_entry_and_replaces_by_identity() {
        let mut registry = ResourceRegistry::new();
        let r = ResourceId(1);
        let c = ComponentId::new();

        registry.register_source(r, source(c, 0.0));
        registry.register_source(r, source(c, 5.0));
        registry.register_source(r, source(ComponentId::new(), 9.0));

        let entry = registry.get(r).unwrap();
        assert_eq!(entry.sources.len(), 2);
        assert_eq!(entry.sources[0].global.min.x, 5.0);
    }

    #[test]
    fn unregister_keeps_entry() {
        let mut registry = ResourceRegistry::new();
        let r = ResourceId(1);
        let c = ComponentId::new();
        registry.register_source(r, source(c, 0.0));

        assert!(registry.unregister_source(r, c));
        assert!(!registry.unregister_source(r, c));
        assert!(!registry.unregister_source(ResourceId(2), c));
        assert!(registry.contains(r));
        assert!(registry.get(r).unwrap().sources.is_empty());
    }

    #[test]
    fn refresh_replaces_layers_positionally() {
        let mut registry = ResourceRegistry::new();
        let r = ResourceId(1);
        registry.refresh_layers(r, vec![layer(), layer()]);
        registry
            .layer_mut(r, 1)
            .unwrap()
            .index
            .mark_pending(SpatialKey::tile(0, 0));

        registry.refresh_layers(r, vec![layer()]);
        let entry = registry.get(r).unwrap();
        assert_eq!(entry.layers.len(), 1);
        assert!(entry.layers[0].index.is_empty());
        assert!(registry.layer(r, 1).is_none());
    }

    #[test]
    fn clear_indices_empties_every_layer() {
        let mut registry = ResourceRegistry::new();
        let r = ResourceId(1);
        registry.refresh_layers(r, vec![layer(), layer()]);
        for i in 0..2 {
            registry
                .layer_mut(r, i)
                .unwrap()
                .index
                .mark_pending(SpatialKey::tile(i as i32, 0));
        }
        registry.clear_indices(r);
        assert!(registry.get(r).unwrap().layers.iter().all(|l| l.index.is_empty()));
    }

    #[test]
    fn entry_reports_creation() {
        let mut registry = ResourceRegistry::new();
        assert!(registry.entry(ResourceId(3)).1);
        assert!(!registry.entry(ResourceId(3)).1);
        assert_eq!(registry.len(), 1);
    }
}
