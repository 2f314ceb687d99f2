//! Spatial index over one or more independent grid trees
//!
//! Range queries run in two phases. The broad phase walks the neighbor
//! graph outward from the querying object's leaf and collects the leaves
//! that pass the cell-level test. The narrow phase then checks every
//! member of those leaves against the exact distance and the caller's
//! filter.

use crate::config::GridConfig;
use crate::foundation::collections::{CellId, ObjectHandle, SlotMap};
use crate::foundation::math::Vec3;
use crate::spatial::builder::LevelSpec;
use crate::spatial::cell::{BroadPhase, SpatialCell};
use crate::spatial::error::IndexError;
use crate::spatial::handle::TrackedObject;
use crate::spatial::hierarchy::CellHierarchy;
use std::fmt;

/// Position of a root grid inside a [`SpatialIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootIndex(pub usize);

impl fmt::Display for RootIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hierarchical grid index of point objects carrying a payload `T`
#[derive(Debug, Clone)]
pub struct SpatialIndex<T = ()> {
    pub(crate) hierarchy: CellHierarchy,
    pub(crate) roots: Vec<CellId>,
    pub(crate) objects: SlotMap<ObjectHandle, TrackedObject<T>>,
    broad_phase: BroadPhase,
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SpatialIndex<T> {
    /// Create an index with no grids, using the exact broad phase
    pub fn new() -> Self {
        Self::with_broad_phase(BroadPhase::default())
    }

    /// Create an index with no grids and the given broad phase
    pub fn with_broad_phase(broad_phase: BroadPhase) -> Self {
        Self {
            hierarchy: CellHierarchy::new(),
            roots: Vec::new(),
            objects: SlotMap::with_key(),
            broad_phase,
        }
    }

    /// Build every grid described by `config`
    pub fn from_config(config: &GridConfig) -> Result<Self, IndexError> {
        let mut index = Self::with_broad_phase(config.broad_phase);
        for root in &config.roots {
            index.add_root(root.center(), root.size(), &root.levels)?;
        }
        log::info!(
            "Spatial index ready: {} grids, {} cells",
            index.root_count(),
            index.hierarchy.len()
        );
        Ok(index)
    }

    /// Add an independent grid and return its position
    pub fn add_root(
        &mut self,
        center: Vec3,
        size: Vec3,
        levels: &[LevelSpec],
    ) -> Result<RootIndex, IndexError> {
        let cell = self.hierarchy.create_root(center, size, levels)?;
        self.roots.push(cell);
        let root = RootIndex(self.roots.len() - 1);
        log::debug!("Added grid {root} centered at {center:?}, size {size:?}");
        Ok(root)
    }

    /// Rebuild the subtree under `cell` with new level specifications.
    ///
    /// Refused while any object is registered in that subtree, and when the
    /// new leaves would not line up in depth with the surrounding leaves.
    pub fn generate_grid(&mut self, cell: CellId, levels: &[LevelSpec]) -> Result<(), IndexError> {
        self.hierarchy.generate_grid(cell, levels)
    }

    /// Root cell of a grid
    pub fn root(&self, root: RootIndex) -> Result<CellId, IndexError> {
        self.roots
            .get(root.0)
            .copied()
            .ok_or(IndexError::UnknownRoot(root))
    }

    /// Root cells in insertion order
    pub fn roots(&self) -> &[CellId] {
        &self.roots
    }

    /// Number of grids
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// The cell arena
    pub const fn hierarchy(&self) -> &CellHierarchy {
        &self.hierarchy
    }

    /// Look up a cell
    pub fn cell(&self, id: CellId) -> Result<&SpatialCell, IndexError> {
        self.hierarchy.cell(id)
    }

    /// Cell-level test used by range queries
    pub const fn broad_phase(&self) -> BroadPhase {
        self.broad_phase
    }

    /// Switch the cell-level test used by range queries
    pub fn set_broad_phase(&mut self, broad_phase: BroadPhase) {
        self.broad_phase = broad_phase;
    }

    /// Leaf of grid `root` containing `point`, or `None` when the point lies
    /// outside that grid
    pub fn resolve(&self, root: RootIndex, point: Vec3) -> Result<Option<CellId>, IndexError> {
        let root_cell = self.root(root)?;
        if !self.hierarchy.cell(root_cell)?.contains(point) {
            return Ok(None);
        }
        self.hierarchy.find_leaf(root_cell, point).map(Some)
    }

    /// Objects within `range` of `handle` whose payload passes `filter`.
    ///
    /// The querying object is part of the result when it passes `filter`.
    pub fn query_range<F>(
        &self,
        handle: ObjectHandle,
        range: f32,
        filter: F,
    ) -> Result<Vec<ObjectHandle>, IndexError>
    where
        F: FnMut(&T) -> bool,
    {
        let (leaf, object) = self.registered(handle)?;
        self.collect_in_range(leaf, object.position, range, filter)
    }

    /// Objects within `range` of an arbitrary point of grid `root`
    pub fn query_point<F>(
        &self,
        root: RootIndex,
        point: Vec3,
        range: f32,
        filter: F,
    ) -> Result<Vec<ObjectHandle>, IndexError>
    where
        F: FnMut(&T) -> bool,
    {
        let leaf = self
            .resolve(root, point)?
            .ok_or(IndexError::OutOfBounds { root, point })?;
        self.collect_in_range(leaf, point, range, filter)
    }

    /// All objects registered on `cells` whose payload passes `filter`
    pub fn objects_in_cells<F>(
        &self,
        cells: &[CellId],
        mut filter: F,
    ) -> Result<Vec<ObjectHandle>, IndexError>
    where
        F: FnMut(&T) -> bool,
    {
        let mut found = Vec::new();
        for &cell in cells {
            for &member in self.hierarchy.cell(cell)?.members() {
                if self.objects.get(member).is_some_and(|o| filter(&o.payload)) {
                    found.push(member);
                }
            }
        }
        Ok(found)
    }

    fn collect_in_range<F>(
        &self,
        leaf: CellId,
        point: Vec3,
        range: f32,
        mut filter: F,
    ) -> Result<Vec<ObjectHandle>, IndexError>
    where
        F: FnMut(&T) -> bool,
    {
        if range.is_nan() || range < 0.0 {
            return Ok(Vec::new());
        }

        let candidates = self
            .hierarchy
            .cells_in_range(leaf, point, range, self.broad_phase)?;

        let mut found = Vec::new();
        for cell in candidates {
            for &member in self.hierarchy.cell(cell)?.members() {
                let object = self.objects.get(member).ok_or(IndexError::StaleHandle(member))?;
                if (object.position - point).magnitude() <= range && filter(&object.payload) {
                    found.push(member);
                }
            }
        }

        log::trace!("Range query at {point:?} (r = {range}) matched {} objects", found.len());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eight_cell_index() -> (SpatialIndex<&'static str>, RootIndex) {
        let mut index = SpatialIndex::new();
        let root = index
            .add_root(Vec3::zeros(), Vec3::new(10.0, 10.0, 10.0), &[LevelSpec::new(2, 2, 2)])
            .unwrap();
        (index, root)
    }

    #[test]
    fn test_resolve_inside_and_outside() {
        let (index, root) = eight_cell_index();
        let leaf = index.resolve(root, Vec3::new(1.0, 1.0, 1.0)).unwrap().unwrap();
        let root_cell = index.root(root).unwrap();
        assert_eq!(index.hierarchy().child_at(root_cell, [1, 1, 1]).unwrap(), Some(leaf));

        assert_eq!(index.resolve(root, Vec3::new(5.1, 0.0, 0.0)).unwrap(), None);
        assert_eq!(
            index.resolve(RootIndex(3), Vec3::zeros()),
            Err(IndexError::UnknownRoot(RootIndex(3)))
        );
    }

    #[test]
    fn test_independent_roots() {
        let (mut index, first) = eight_cell_index();
        let second = index
            .add_root(Vec3::new(100.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 10.0), &[])
            .unwrap();
        assert_eq!(second, RootIndex(1));
        assert_eq!(index.root_count(), 2);

        let far = Vec3::new(101.0, 0.0, 0.0);
        assert_eq!(index.resolve(first, far).unwrap(), None);
        assert_eq!(index.resolve(second, far).unwrap(), Some(index.root(second).unwrap()));
    }

    #[test]
    fn test_query_point_filters_payload() {
        let (mut index, root) = eight_cell_index();
        index.place(root, Vec3::new(1.0, 1.0, 1.0), "oak").unwrap();
        let birch = index.place(root, Vec3::new(-1.0, 1.0, 1.0), "birch").unwrap();
        index.place(root, Vec3::new(-4.0, -4.0, -4.0), "birch").unwrap();

        let found = index
            .query_point(root, Vec3::new(0.0, 1.0, 1.0), 1.5, |kind| *kind == "birch")
            .unwrap();
        assert_eq!(found, vec![birch]);

        let outside = index.query_point(root, Vec3::new(0.0, 9.0, 0.0), 1.0, |_| true);
        assert!(matches!(outside, Err(IndexError::OutOfBounds { .. })));
    }

    #[test]
    fn test_negative_range_matches_nothing() {
        let (mut index, root) = eight_cell_index();
        let handle = index.place(root, Vec3::new(1.0, 1.0, 1.0), "oak").unwrap();
        assert!(index.query_range(handle, -1.0, |_| true).unwrap().is_empty());
        assert!(index.query_range(handle, f32::NAN, |_| true).unwrap().is_empty());
    }

    #[test]
    fn test_objects_in_cells() {
        let (mut index, root) = eight_cell_index();
        let a = index.place(root, Vec3::new(1.0, 1.0, 1.0), "oak").unwrap();
        index.place(root, Vec3::new(-1.0, -1.0, -1.0), "fern").unwrap();
        let leaf = index.leaf_of(a).unwrap();
        assert_eq!(index.objects_in_cells(&[leaf], |_| true).unwrap(), vec![a]);
        assert!(index.objects_in_cells(&[leaf], |kind| *kind == "fern").unwrap().is_empty());
    }
}
