/// Largest tile index representable on one axis; also the bias added before packing.
const MAX_TILE_INDEX: i32 = (1 << 20) - 1;
const TILE_INDEX_BITS: u32 = 21;
const TILE_INDEX_MASK: u64 = (1 << TILE_INDEX_BITS) - 1;

/// Packed 3D tile coordinate.
///
/// Each axis is biased by [`MAX_TILE_INDEX`], masked to 21 bits and packed as
/// `x << 42 | y << 21 | z`. Coordinates in `[-2^20, 2^20 - 1]` round-trip;
/// anything outside wraps into that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpatialKey(u64);

impl SpatialKey {
    pub const MIN_COORD: i32 = -(1 << 20);
    pub const MAX_COORD: i32 = (1 << 20) - 1;

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        let pack = |c: i32| (c.wrapping_add(MAX_TILE_INDEX) as u32 as u64) & TILE_INDEX_MASK;
        Self((pack(x) << (2 * TILE_INDEX_BITS)) | (pack(y) << TILE_INDEX_BITS) | pack(z))
    }

    /// Key of a 2D tile on the ground plane.
    pub fn tile(x: i32, y: i32) -> Self {
        Self::new(x, y, 0)
    }

    pub fn coords(self) -> (i32, i32, i32) {
        // The bias leaves one spare value at the top of the field; it is the
        // slot that MIN_COORD wraps into.
        let unpack = |shift: u32| {
            let c = ((self.0 >> shift) & TILE_INDEX_MASK) as i32 - MAX_TILE_INDEX;
            if c > Self::MAX_COORD { c - (1 << TILE_INDEX_BITS) } else { c }
        };
        (
            unpack(2 * TILE_INDEX_BITS),
            unpack(TILE_INDEX_BITS),
            unpack(0),
        )
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}
