//! Stand-in placement computation: jittered points inside the tile, kept
//! where they fall inside at least one contributing source volume.

use std::sync::atomic::{AtomicBool, Ordering};

use glam::{Quat, Vec3};
use placement_assets::Layer;
use placement_common::Transform;
use placement_tiles::TileDescriptor;

/// How often the cancel flag is checked while scattering.
const CANCEL_CHECK_INTERVAL: usize = 64;

/// Scatter objects for one tile. Returns an empty list when cancelled.
pub fn scatter(desc: &TileDescriptor, layer: &Layer, seed: u64, cancel: &AtomicBool) -> Vec<Transform> {
    let tile_size = layer.tile_size();
    let bounds = desc.world_bounds(tile_size);
    let count = (layer.density * tile_size * tile_size).round() as usize;
    let min_scale = layer.parameters.get("min_scale").copied().unwrap_or(1.0);
    let max_scale = layer.parameters.get("max_scale").copied().unwrap_or(min_scale);

    let mut state = seed ^ desc.key().raw() ^ ((desc.layer_index as u64) << 56);
    let mut next = || {
        state = splitmix64(state);
        (state >> 40) as f32 / (1u64 << 24) as f32
    };

    let mut placed = Vec::new();
    for i in 0..count {
        if i % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Acquire) {
            return Vec::new();
        }

        let x = bounds.min.x + next() * tile_size;
        let y = bounds.min.y + next() * tile_size;
        let angle = next() * std::f32::consts::TAU;
        let scale = min_scale + next() * (max_scale - min_scale);

        let inside = desc.local_bounds.iter().any(|local| {
            // Height comes from a ground trace in a real setup; test against
            // the volume's mid plane instead.
            let p = local.transform_point3(Vec3::new(x, y, (desc.min_z + desc.max_z) * 0.5));
            p.x.abs() <= 1.0 && p.y.abs() <= 1.0
        });
        if inside {
            placed.push(Transform {
                position: Vec3::new(x, y, desc.max_z),
                rotation: Quat::from_rotation_z(angle),
                scale: Vec3::splat(scale),
            });
        }
    }
    placed
}

fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Affine3A;
    use placement_assets::ResourceId;

    fn layer(density: f32) -> Layer {
        Layer::new("grass", 10.0, 25.0, "tuft")
            .unwrap()
            .with_density(density)
            .with_parameter("min_scale", 0.5)
            .with_parameter("max_scale", 2.0)
    }

    fn desc(local: Affine3A) -> TileDescriptor {
        TileDescriptor {
            resource: ResourceId(1),
            layer_index: 0,
            x: 0,
            y: 0,
            min_z: 0.0,
            max_z: 2.0,
            local_bounds: vec![local],
        }
    }

    #[test]
    fn fully_covered_tile_gets_every_point() {
        // Unit box scaled to cover [-50, 50]^2.
        let local = Affine3A::from_scale(Vec3::new(50.0, 50.0, 50.0)).inverse();
        let points = scatter(&desc(local), &layer(1.0), 7, &AtomicBool::new(false));
        assert_eq!(points.len(), 100);
        for t in &points {
            assert!((0.0..=10.0).contains(&t.position.x));
            assert!((0.0..=10.0).contains(&t.position.y));
            assert_eq!(t.position.z, 2.0);
            assert!((0.5..=2.0).contains(&t.scale.x));
        }
    }

    #[test]
    fn points_outside_sources_are_dropped() {
        // Source covers only x in [0, 5].
        let local = (Affine3A::from_translation(Vec3::new(2.5, 5.0, 1.0))
            * Affine3A::from_scale(Vec3::new(2.5, 50.0, 50.0)))
        .inverse();
        let points = scatter(&desc(local), &layer(1.0), 7, &AtomicBool::new(false));
        assert!(!points.is_empty());
        assert!(points.len() < 100);
        assert!(points.iter().all(|t| t.position.x <= 5.0 + 1e-4));
    }

    #[test]
    fn deterministic_per_seed() {
        let local = Affine3A::from_scale(Vec3::splat(50.0)).inverse();
        let a = scatter(&desc(local), &layer(0.5), 1, &AtomicBool::new(false));
        let b = scatter(&desc(local), &layer(0.5), 1, &AtomicBool::new(false));
        let c = scatter(&desc(local), &layer(0.5), 2, &AtomicBool::new(false));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn cancelled_scatter_is_empty() {
        let local = Affine3A::from_scale(Vec3::splat(50.0)).inverse();
        assert!(scatter(&desc(local), &layer(1.0), 1, &AtomicBool::new(true)).is_empty());
    }
}
