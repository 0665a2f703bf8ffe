use glam::Vec3;

use crate::key::SpatialKey;
use crate::registry::RegistryEntry;
use crate::slot::TileDescriptor;
use crate::visibility::VisibilityRequest;

/// Initial z extent of a tile before any source widens it.
const INITIAL_MIN_Z: f32 = 10000.0;
const INITIAL_MAX_Z: f32 = -10000.0;

/// Largest scan radius, in tiles, around one observer.
pub const MAX_SCAN_RADIUS: i32 = 256;

/// Cell offsets inside a disc of `radius` cells, scanned row by row.
pub fn disc_offsets(radius: i32) -> impl Iterator<Item = (i32, i32)> {
    let radius = radius.max(0);
    let radius_sqr = i64::from(radius) * i64::from(radius);
    (-radius..=radius).flat_map(move |dy| {
        (-radius..=radius)
            .filter(move |&dx| {
                let (dx, dy) = (i64::from(dx), i64::from(dy));
                dx * dx + dy * dy <= radius_sqr
            })
            .map(move |dx| (dx, dy))
    })
}

/// Find tiles around one observer that overlap the resource's sources and
/// are not yet known to their layer.
///
/// New tiles are marked pending in their layer index before being pushed to
/// `out`, so later requests in the same or following updates skip them.
/// Returns the number of descriptors added.
pub fn discover_tiles(
    request: &VisibilityRequest,
    entry: &mut RegistryEntry,
    cull_distance_scale: f32,
    out: &mut Vec<TileDescriptor>,
) -> usize {
    let RegistryEntry { layers, sources } = entry;
    if sources.is_empty() {
        return 0;
    }

    let before = out.len();

    for (layer_index, active) in layers.iter_mut().enumerate() {
        let tile_size = active.layer.tile_size();
        let cull_distance = active.layer.cull_distance * cull_distance_scale;

        let camera = request.camera_position / tile_size;
        let pos_x = camera.x.round() as i32;
        let pos_y = camera.y.round() as i32;
        let radius = ((cull_distance / tile_size).ceil() as i32).min(MAX_SCAN_RADIUS);

        // Each source counts for a tile whose center lies within half a
        // tile of its box.
        let extended: Vec<_> = sources
            .iter()
            .map(|s| s.global.grown(tile_size * 0.5))
            .collect();

        for (dx, dy) in disc_offsets(radius) {
            // Far observers wrap, like their keys.
            let x = pos_x.wrapping_add(dx);
            let y = pos_y.wrapping_add(dy);
            let test_pos = Vec3::new(
                (x as f32 + 0.5) * tile_size,
                (y as f32 + 0.5) * tile_size,
                0.0,
            );

            let mut min_z = INITIAL_MIN_Z;
            let mut max_z = INITIAL_MAX_Z;
            let mut local_bounds = Vec::new();

            for (source, grown) in sources.iter().zip(&extended) {
                if grown.contains_xy(test_pos) {
                    min_z = min_z.min(source.global.min.z);
                    max_z = max_z.max(source.global.max.z);
                    local_bounds.push(source.local);
                }
            }

            if local_bounds.is_empty() {
                continue;
            }

            if active.index.mark_pending(SpatialKey::tile(x, y)) {
                out.push(TileDescriptor {
                    resource: request.resource,
                    layer_index,
                    x,
                    y,
                    min_z,
                    max_z,
                    local_bounds,
                });
            }
        }
    }

    out.len() - before
}
