//! Grid cells
//!
//! A cell is an axis-aligned box in the grid tree. Leaves hold the objects
//! registered inside them; internal cells only route lookups to their
//! children. Cells at the same depth are linked into an undirected neighbor
//! graph which range queries walk.

use crate::foundation::collections::{CellId, ObjectHandle};
use crate::foundation::math::{Aabb, Vec3};
use crate::spatial::builder::LevelSpec;
use serde::{Deserialize, Serialize};

/// Cell-level overlap test used while walking the neighbor graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadPhase {
    /// Closest-point test between the query sphere and the cell box.
    ///
    /// Never prunes a cell that overlaps the query sphere.
    #[default]
    Exact,

    /// Inscribed/circumscribed sphere test with a single probe point for the
    /// shell between them.
    ///
    /// Cheaper, but both false positives and false negatives are possible
    /// in that shell. False positives are removed by the per-object distance
    /// filter; cells pruned by a false negative are not visited at all, so
    /// objects inside them can be missing from results.
    Approximate,
}

/// Single node in the grid hierarchy
#[derive(Debug, Clone)]
pub struct SpatialCell {
    /// World-space bounds of this cell
    pub(crate) bounds: Aabb,
    pub(crate) center: Vec3,
    pub(crate) half_size: Vec3,
    /// Inscribed sphere radius
    pub(crate) range_min: f32,
    /// Circumscribed sphere radius
    pub(crate) range_max: f32,
    /// Depth in the tree (0 = root)
    pub(crate) depth: u32,
    /// Coordinate inside the parent's child lattice
    pub(crate) lattice: [u32; 3],
    pub(crate) parent: Option<CellId>,
    pub(crate) children: Vec<CellId>,
    /// Lattice dimensions of `children`, if subdivided
    pub(crate) child_dims: Option<LevelSpec>,
    pub(crate) neighbors: Vec<CellId>,
    pub(crate) members: Vec<ObjectHandle>,
}

impl SpatialCell {
    /// Create a cell from its center and full edge lengths
    pub fn new(center: Vec3, size: Vec3, parent: Option<CellId>) -> Self {
        Self::from_bounds(Aabb::from_center_extents(center, size / 2.0), parent)
    }

    /// Create a cell covering exactly `bounds`.
    ///
    /// Children are built this way so that siblings share bit-identical
    /// boundary coordinates.
    pub(crate) fn from_bounds(bounds: Aabb, parent: Option<CellId>) -> Self {
        let center = bounds.center();
        let half_size = bounds.extents();

        Self {
            bounds,
            center,
            half_size,
            range_min: half_size.x.min(half_size.y).min(half_size.z),
            range_max: half_size.magnitude(),
            depth: 0,
            lattice: [0, 0, 0],
            parent,
            children: Vec::new(),
            child_dims: None,
            neighbors: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Check if this cell is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Center of the cell
    pub const fn center(&self) -> Vec3 {
        self.center
    }

    /// Half of the cell's edge lengths
    pub const fn half_size(&self) -> Vec3 {
        self.half_size
    }

    /// Full edge lengths of the cell
    pub fn size(&self) -> Vec3 {
        self.half_size * 2.0
    }

    /// World-space bounds
    pub const fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Radius of the largest sphere inside the cell
    pub const fn range_min(&self) -> f32 {
        self.range_min
    }

    /// Radius of the smallest sphere containing the cell
    pub const fn range_max(&self) -> f32 {
        self.range_max
    }

    /// Depth in the tree (0 = root)
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Coordinate of this cell inside its parent's child lattice
    pub const fn lattice(&self) -> [u32; 3] {
        self.lattice
    }

    /// Parent cell, `None` for roots
    pub const fn parent(&self) -> Option<CellId> {
        self.parent
    }

    /// Children in lattice order (x outermost, z innermost)
    pub fn children(&self) -> &[CellId] {
        &self.children
    }

    /// Lattice dimensions of the children, if this cell is subdivided
    pub const fn child_dims(&self) -> Option<LevelSpec> {
        self.child_dims
    }

    /// Same-depth cells adjacent to this one
    pub fn neighbors(&self) -> &[CellId] {
        &self.neighbors
    }

    /// Objects registered on this cell
    pub fn members(&self) -> &[ObjectHandle] {
        &self.members
    }

    /// Check if the point lies inside the cell, boundaries included
    pub fn contains(&self, point: Vec3) -> bool {
        self.bounds.contains_point(point)
    }

    /// Check if the cell may overlap the sphere at `point` with radius `range`
    pub fn in_range(&self, point: Vec3, range: f32, mode: BroadPhase) -> bool {
        match mode {
            BroadPhase::Exact => self.bounds.intersects_sphere(point, range),
            BroadPhase::Approximate => self.in_range_approximate(point, range),
        }
    }

    /// Early-exit sphere test.
    ///
    /// The checks run in a fixed order and the first decisive one wins. The
    /// last step probes the single point at distance `range` from `point`
    /// toward the cell center.
    pub fn in_range_approximate(&self, point: Vec3, range: f32) -> bool {
        let distance = (point - self.center).magnitude();

        // Point inside the inscribed sphere
        if distance <= self.range_min {
            return true;
        }

        if range - self.range_min <= distance {
            return true;
        }

        // Query sphere and circumscribed sphere are disjoint
        if distance - self.range_max > range {
            return false;
        }

        let probe = point + (self.center - point).normalize() * range;
        self.contains(probe)
    }

    /// Tolerance used when deciding whether two cells share a boundary
    pub(crate) fn touch_tolerance(&self, other: &Self) -> f32 {
        self.range_min.min(other.range_min) * 1e-4
    }

    pub(crate) fn touches(&self, other: &Self) -> bool {
        self.bounds.touches(&other.bounds, self.touch_tolerance(other))
    }

    pub(crate) fn add_neighbor(&mut self, neighbor: CellId) {
        if !self.neighbors.contains(&neighbor) {
            self.neighbors.push(neighbor);
        }
    }

    pub(crate) fn remove_neighbor(&mut self, neighbor: CellId) {
        self.neighbors.retain(|&n| n != neighbor);
    }

    pub(crate) fn add_member(&mut self, handle: ObjectHandle) {
        self.members.push(handle);
    }

    /// Remove a member, returning whether it was present
    pub(crate) fn remove_member(&mut self, handle: ObjectHandle) -> bool {
        if let Some(index) = self.members.iter().position(|&m| m == handle) {
            self.members.swap_remove(index);
            true
        } else {
            false
        }
    }
}
