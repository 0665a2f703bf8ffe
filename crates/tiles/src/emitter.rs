use glam::{Affine3A, Vec3};
use placement_assets::ResourceId;
use placement_common::{Aabb, ComponentId, Transform};

/// Anything that emits procedurally placed content over a volume.
///
/// The manager calls into this on activation and deactivation; it keeps
/// only the bounds it was given and the identity to revoke them by.
pub trait PlacementEmitter {
    fn component_id(&self) -> ComponentId;

    /// Placement resource driving this emitter, if one is assigned.
    fn resource(&self) -> Option<ResourceId>;

    /// World-space bounds used to find overlapping tiles.
    fn global_bounds(&self) -> Aabb;

    /// Transform from world space into the emitter's unit box `[-1, 1]^3`.
    fn local_bounds(&self) -> Affine3A;
}

/// Box-shaped placement volume.
#[derive(Debug, Clone)]
pub struct PlacementVolume {
    id: ComponentId,
    resource: Option<ResourceId>,
    transform: Transform,
    extents: Vec3,
}

impl PlacementVolume {
    pub const DEFAULT_EXTENTS: Vec3 = Vec3::splat(10.0);

    pub fn new(resource: Option<ResourceId>, transform: Transform) -> Self {
        Self {
            id: ComponentId::new(),
            resource,
            transform,
            extents: Self::DEFAULT_EXTENTS,
        }
    }

    /// Full edge lengths of the volume. Negative components are clamped to zero.
    pub fn with_extents(mut self, extents: Vec3) -> Self {
        self.set_extents(extents);
        self
    }

    pub fn set_extents(&mut self, extents: Vec3) {
        self.extents = extents.max(Vec3::ZERO);
    }

    pub fn extents(&self) -> Vec3 {
        self.extents
    }

    pub fn set_resource(&mut self, resource: Option<ResourceId>) {
        self.resource = resource;
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    fn unit_to_world(&self, half_extents: Vec3) -> Affine3A {
        self.transform.to_affine() * Affine3A::from_scale(half_extents)
    }
}

impl PlacementEmitter for PlacementVolume {
    fn component_id(&self) -> ComponentId {
        self.id
    }

    fn resource(&self) -> Option<ResourceId> {
        self.resource
    }

    fn global_bounds(&self) -> Aabb {
        let to_world = self.unit_to_world(self.extents * 0.5);
        let unit = Aabb::new(Vec3::NEG_ONE, Vec3::ONE);
        Aabb::from_points(unit.corners().map(|c| to_world.transform_point3(c)))
            .unwrap_or(Aabb::new(self.transform.position, self.transform.position))
    }

    fn local_bounds(&self) -> Affine3A {
        // A flat volume would not be invertible.
        let half = (self.extents * 0.5).max(Vec3::splat(f32::EPSILON));
        self.unit_to_world(half).inverse()
    }
}
