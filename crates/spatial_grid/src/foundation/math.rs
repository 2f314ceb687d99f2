//! Math utilities and types
//!
//! Provides the vector and box types the grid is built from, plus the
//! lattice index helpers used while laying out child cells.

pub use nalgebra::Vector3;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Axis-Aligned Bounding Box with inclusive bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents (half-size)
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Full edge lengths of the AABB
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Check if this AABB contains a point, boundaries included
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Point of the box closest to `point` (the point itself when inside)
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        )
    }

    /// Squared distance from `point` to the nearest point of the box
    pub fn distance_squared_to(&self, point: Vec3) -> f32 {
        (self.closest_point(point) - point).magnitude_squared()
    }

    /// Check if a sphere overlaps this box
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.distance_squared_to(center) <= radius * radius
    }

    /// Check if two boxes overlap or share a face, edge or corner.
    ///
    /// `tolerance` absorbs rounding on shared boundaries.
    pub fn touches(&self, other: &Self, tolerance: f32) -> bool {
        self.min.x <= other.max.x + tolerance
            && self.max.x + tolerance >= other.min.x
            && self.min.y <= other.max.y + tolerance
            && self.max.y + tolerance >= other.min.y
            && self.min.z <= other.max.z + tolerance
            && self.max.z + tolerance >= other.min.z
    }
}

/// Lattice index helpers for `width × height × depth` child layouts.
///
/// Cells are stored with x outermost and z innermost, so the flat index of
/// `(x, y, z)` is `x * (height * depth) + y * depth + z`.
pub mod lattice {
    /// Flatten a lattice coordinate
    pub const fn to_1d(x: u32, y: u32, z: u32, height: u32, depth: u32) -> usize {
        (z + y * depth + x * depth * height) as usize
    }

    /// Expand a flat index back into a lattice coordinate
    pub const fn from_1d(index: usize, height: u32, depth: u32) -> [u32; 3] {
        let index = index as u32;
        let plane = height * depth;
        [index / plane, (index % plane) / depth, index % depth]
    }

    /// Chebyshev distance between two lattice coordinates
    pub fn chebyshev(a: [u32; 3], b: [u32; 3]) -> u32 {
        a.iter()
            .zip(b.iter())
            .map(|(&a, &b)| a.abs_diff(b))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_aabb_contains_is_inclusive() {
        let aabb = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 2.0, 3.0));
        assert!(aabb.contains_point(Vec3::new(1.0, -2.0, 3.0)));
        assert!(aabb.contains_point(Vec3::zeros()));
        assert!(!aabb.contains_point(Vec3::new(1.001, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_sphere_overlap() {
        let aabb = Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let corner_probe = Vec3::new(2.0, 2.0, 2.0);
        assert_relative_eq!(aabb.distance_squared_to(corner_probe), 3.0);
        assert!(!aabb.intersects_sphere(corner_probe, 1.7));
        assert!(aabb.intersects_sphere(corner_probe, 1.74));
        assert!(aabb.intersects_sphere(Vec3::new(0.5, 0.5, 0.5), 0.0));
    }

    #[test]
    fn test_aabb_touching_boxes() {
        let a = Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let corner = Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(2.0, 2.0, 2.0));
        let apart = Aabb::new(Vec3::new(1.5, 0.0, 0.0), Vec3::new(2.5, 1.0, 1.0));
        assert!(a.touches(&corner, 1e-6));
        assert!(corner.touches(&a, 1e-6));
        assert!(!a.touches(&apart, 1e-6));
    }

    #[test]
    fn test_lattice_round_trip_matches_row_major_order() {
        let (height, depth) = (3, 4);
        let mut expected = 0;
        for x in 0..2 {
            for y in 0..height {
                for z in 0..depth {
                    assert_eq!(lattice::to_1d(x, y, z, height, depth), expected);
                    assert_eq!(lattice::from_1d(expected, height, depth), [x, y, z]);
                    expected += 1;
                }
            }
        }
        assert_eq!(lattice::chebyshev([0, 0, 0], [1, 1, 0]), 1);
        assert_eq!(lattice::chebyshev([0, 2, 0], [1, 0, 0]), 2);
    }
}
