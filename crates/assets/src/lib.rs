//! Placement resources and their layers.
//!
//! A placement resource is identified by a hash of its path and owns an
//! ordered list of [`Layer`]s. The tile manager never reads resource files;
//! it only asks the [`ResourceStore`] for the current layers and reacts to
//! [`ResourceEvent`]s when content is reloaded or unloaded.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Path-addressed resource id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub u64);

impl ResourceId {
    /// Derive the id for a resource path.
    pub fn from_path(path: &str) -> Self {
        let digest = Sha256::digest(path.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        ResourceId(u64::from_le_bytes(bytes))
    }
}

/// Errors from resource operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("resource not loaded: {0:?}")]
    NotLoaded(ResourceId),
    #[error("invalid layer '{name}': {reason}")]
    InvalidLayer { name: String, reason: String },
}

/// One set of placement rules inside a resource.
///
/// Immutable once loaded; shared with in-flight tile jobs through `Arc`.
/// Deserialization goes through [`Layer::new`], so stored layers are
/// validated the same way as constructed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LayerDef")]
pub struct Layer {
    pub name: String,
    /// Edge length of one square tile, in world units.
    tile_size: f32,
    /// Distance from the observer beyond which tiles are not generated.
    pub cull_distance: f32,
    /// Object template instantiated by this layer.
    pub prefab: String,
    /// Target number of objects per square world unit.
    pub density: f32,
    /// Opaque parameters consumed by the tile job.
    #[serde(default)]
    pub parameters: BTreeMap<String, f32>,
}

#[derive(Deserialize)]
struct LayerDef {
    name: String,
    tile_size: f32,
    cull_distance: f32,
    prefab: String,
    density: Option<f32>,
    #[serde(default)]
    parameters: BTreeMap<String, f32>,
}

impl TryFrom<LayerDef> for Layer {
    type Error = AssetError;

    fn try_from(def: LayerDef) -> Result<Self, AssetError> {
        let mut layer = Layer::new(def.name, def.tile_size, def.cull_distance, def.prefab)?;
        if let Some(density) = def.density {
            layer = layer.with_density(density);
        }
        layer.parameters = def.parameters;
        Ok(layer)
    }
}

impl Layer {
    pub fn new(
        name: impl Into<String>,
        tile_size: f32,
        cull_distance: f32,
        prefab: impl Into<String>,
    ) -> Result<Self, AssetError> {
        let name = name.into();
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(AssetError::InvalidLayer {
                name,
                reason: format!("tile size must be positive, got {tile_size}"),
            });
        }
        if !cull_distance.is_finite() || cull_distance < 0.0 {
            return Err(AssetError::InvalidLayer {
                name,
                reason: format!("cull distance must be non-negative, got {cull_distance}"),
            });
        }
        Ok(Self {
            name,
            tile_size,
            cull_distance,
            prefab: prefab.into(),
            density: 0.01,
            parameters: BTreeMap::new(),
        })
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density.max(0.0);
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: f32) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }
}

/// What happened to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceEventKind {
    /// Fresh content became available.
    Loaded,
    /// Current content is about to be replaced or dropped. Anything derived
    /// from the old layers must be invalidated.
    ContentUnloading,
    /// The resource was removed from the store.
    Unloaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEvent {
    pub resource: ResourceId,
    pub kind: ResourceEventKind,
}

#[derive(Debug, Clone)]
struct ResourceEntry {
    path: String,
    layers: Vec<Arc<Layer>>,
    generation: u32,
}

/// In-memory placement resource store.
///
/// Every mutation is recorded as a [`ResourceEvent`]; consumers drain them
/// once per tick.
#[derive(Debug, Default)]
pub struct ResourceStore {
    resources: BTreeMap<ResourceId, ResourceEntry>,
    events: Vec<ResourceEvent>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a resource under `path`. Loading an already loaded path
    /// replaces its layers the same way [`ResourceStore::reload`] does.
    pub fn load(&mut self, path: &str, layers: Vec<Layer>) -> ResourceId {
        let id = ResourceId::from_path(path);
        if self.resources.contains_key(&id) {
            self.replace_layers(id, layers);
            return id;
        }

        tracing::debug!(path, ?id, layers = layers.len(), "loading placement resource");
        self.resources.insert(
            id,
            ResourceEntry {
                path: path.to_string(),
                layers: layers.into_iter().map(Arc::new).collect(),
                generation: 0,
            },
        );
        self.push_event(id, ResourceEventKind::Loaded);
        id
    }

    /// Replace the layers of a loaded resource (hot reload).
    pub fn reload(&mut self, id: ResourceId, layers: Vec<Layer>) -> Result<(), AssetError> {
        if !self.resources.contains_key(&id) {
            return Err(AssetError::NotLoaded(id));
        }
        self.replace_layers(id, layers);
        Ok(())
    }

    /// Remove a resource from the store.
    pub fn unload(&mut self, id: ResourceId) -> Result<(), AssetError> {
        let entry = self.resources.remove(&id).ok_or(AssetError::NotLoaded(id))?;
        tracing::debug!(path = %entry.path, "unloading placement resource");

        self.push_event(id, ResourceEventKind::ContentUnloading);
        self.push_event(id, ResourceEventKind::Unloaded);
        Ok(())
    }

    /// Current layers of a resource.
    pub fn layers(&self, id: ResourceId) -> Result<Vec<Arc<Layer>>, AssetError> {
        self.resources
            .get(&id)
            .map(|e| e.layers.clone())
            .ok_or(AssetError::NotLoaded(id))
    }

    pub fn path(&self, id: ResourceId) -> Option<&str> {
        self.resources.get(&id).map(|e| e.path.as_str())
    }

    /// How many times the resource content has been replaced.
    pub fn generation(&self, id: ResourceId) -> Option<u32> {
        self.resources.get(&id).map(|e| e.generation)
    }

    pub fn is_loaded(&self, id: ResourceId) -> bool {
        self.resources.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Drain pending resource events.
    pub fn drain_events(&mut self) -> Vec<ResourceEvent> {
        std::mem::take(&mut self.events)
    }

    fn replace_layers(&mut self, id: ResourceId, layers: Vec<Layer>) {
        if let Some(entry) = self.resources.get_mut(&id) {
            entry.layers = layers.into_iter().map(Arc::new).collect();
            entry.generation += 1;
            tracing::debug!(path = %entry.path, generation = entry.generation, "reloading placement resource");

            self.push_event(id, ResourceEventKind::ContentUnloading);
            self.push_event(id, ResourceEventKind::Loaded);
        }
    }

    fn push_event(&mut self, resource: ResourceId, kind: ResourceEventKind) {
        self.events.push(ResourceEvent { resource, kind });
    }
}
