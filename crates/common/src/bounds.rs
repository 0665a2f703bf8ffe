use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered on `center` with the given half extents.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Return a copy grown by `amount` on every side.
    pub fn grown(&self, amount: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(amount),
            max: self.max + Vec3::splat(amount),
        }
    }

    /// Inclusive point test on the x and y axes only.
    pub fn contains_xy(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The eight corners, used when transforming a box into another space.
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Smallest box containing all `points`. Returns `None` for an empty set.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first, first);
        for p in iter {
            bounds.min = bounds.min.min(p);
            bounds.max = bounds.max.max(p);
        }
        Some(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_expands_every_side() {
        let b = Aabb::new(Vec3::ZERO, Vec3::splat(2.0)).grown(1.0);
        assert_eq!(b.min, Vec3::splat(-1.0));
        assert_eq!(b.max, Vec3::splat(3.0));
    }

    #[test]
    fn contains_xy_ignores_z_and_is_inclusive() {
        let b = Aabb::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(10.0, 10.0, 6.0));
        assert!(b.contains_xy(Vec3::new(0.0, 10.0, 0.0)));
        assert!(b.contains_xy(Vec3::new(5.0, 5.0, -100.0)));
        assert!(!b.contains_xy(Vec3::new(10.01, 5.0, 5.5)));
        assert!(!b.contains(Vec3::new(5.0, 5.0, 0.0)));
    }

    #[test]
    fn from_points_covers_all() {
        let b = Aabb::from_center_half_extents(Vec3::new(1.0, 2.0, 3.0), Vec3::ONE);
        let rebuilt = Aabb::from_points(b.corners()).unwrap();
        assert_eq!(rebuilt, b);
        assert_eq!(b.center(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.size(), Vec3::splat(2.0));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }
}
