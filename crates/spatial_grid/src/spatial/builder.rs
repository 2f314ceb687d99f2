//! Uniform grid construction
//!
//! A root cell is filled with a `width × height × depth` lattice of equal
//! children, each of which is filled again by the next level specification,
//! and so on. For example, a 70×70×70 root built with `[(10, 10, 10)]` gets
//! 1000 children of 7×7×7.
//!
//! Siblings are linked to every sibling within one lattice step in each
//! axis. After the whole subtree exists, cells that touch across a parent
//! boundary are stitched together level by level, so the neighbor graph at
//! every depth follows geometric adjacency rather than tree structure.

use crate::foundation::collections::CellId;
use crate::foundation::math::{lattice, Aabb, Vec3};
use crate::spatial::cell::SpatialCell;
use crate::spatial::error::IndexError;
use crate::spatial::hierarchy::CellHierarchy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Child lattice dimensions for one level of subdivision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelSpec {
    /// Children along x
    pub width: u32,
    /// Children along y
    pub height: u32,
    /// Children along z
    pub depth: u32,
}

impl LevelSpec {
    /// Create a level specification
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self { width, height, depth }
    }

    /// Number of children a cell gets at this level
    pub const fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    /// Dimensions as a float vector, for dividing sizes
    fn as_vec3(self) -> Vec3 {
        Vec3::new(self.width as f32, self.height as f32, self.depth as f32)
    }
}

impl From<(u32, u32, u32)> for LevelSpec {
    fn from((width, height, depth): (u32, u32, u32)) -> Self {
        Self::new(width, height, depth)
    }
}

impl fmt::Display for LevelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// Reject any level with an empty lattice before anything is built
pub fn validate_levels(levels: &[LevelSpec]) -> Result<(), IndexError> {
    match levels.iter().position(|spec| spec.cell_count() == 0) {
        Some(level) => Err(IndexError::InvalidLevelSpec {
            level,
            spec: levels[level],
        }),
        None => Ok(()),
    }
}

/// Lower bound of lattice slot `i` out of `n` along one axis.
///
/// Both ends snap to the parent bounds so that children tile the parent
/// exactly and adjacent slots share the same computed value.
fn slot_bound(min: f32, max: f32, step: f32, i: u32, n: u32) -> f32 {
    if i == 0 {
        min
    } else if i == n {
        max
    } else {
        step.mul_add(i as f32, min)
    }
}

impl CellHierarchy {
    /// Create a root cell and subdivide it by `levels`
    pub fn create_root(
        &mut self,
        center: Vec3,
        size: Vec3,
        levels: &[LevelSpec],
    ) -> Result<CellId, IndexError> {
        let finite = center.iter().chain(size.iter()).all(|v| v.is_finite());
        if !finite || size.iter().any(|&v| v <= 0.0) {
            return Err(IndexError::InvalidRoot { center, size });
        }
        validate_levels(levels)?;

        let root = self.cells.insert(SpatialCell::new(center, size, None));
        self.generate_grid(root, levels)?;
        Ok(root)
    }

    /// Replace the children of `cell` with a fresh uniform subtree.
    ///
    /// An empty `levels` leaves the cell untouched. Fails without changing
    /// anything if a level is empty, if the cell or any descendant holds
    /// registered objects, or if the new leaves would sit at a different
    /// depth than the leaves of the cell's neighbors.
    pub fn generate_grid(&mut self, cell: CellId, levels: &[LevelSpec]) -> Result<(), IndexError> {
        self.cell(cell)?;
        if levels.is_empty() {
            return Ok(());
        }
        validate_levels(levels)?;
        if self.subtree_has_members(cell)? {
            return Err(IndexError::OccupiedSubtree(cell));
        }
        self.check_leaf_depth(cell, levels.len())?;

        self.clear_children(cell)?;
        self.subdivide(cell, levels)?;
        self.stitch_subtree(cell)?;

        // Reconnect the new subtree to whatever surrounds it
        let outside = self.cell(cell)?.neighbors.clone();
        for neighbor in outside {
            self.stitch_pair(cell, neighbor);
        }

        log::debug!(
            "Generated {} levels under {:?}: {} cells in hierarchy",
            levels.len(),
            cell,
            self.len()
        );
        Ok(())
    }

    /// Leaves of the rebuilt subtree must sit at the same depth as the
    /// leaves around it, or walks could not cross its boundary
    fn check_leaf_depth(&self, cell: CellId, level_count: usize) -> Result<(), IndexError> {
        let target = self.cell(cell)?;
        let requested = target.depth + level_count as u32;

        for &neighbor in &target.neighbors {
            let mismatch = self
                .leaves(neighbor)?
                .into_iter()
                .map(|leaf| self.cells[leaf].depth)
                .find(|&depth| depth != requested);
            if let Some(expected) = mismatch {
                log::warn!(
                    "Refusing to rebuild {cell:?} with leaves at depth {requested}, neighbor {neighbor:?} has leaves at depth {expected}"
                );
                return Err(IndexError::LeafDepthMismatch {
                    cell,
                    expected,
                    requested,
                });
            }
        }
        Ok(())
    }

    /// Drop every descendant of `cell` along with its neighbor edges
    fn clear_children(&mut self, cell: CellId) -> Result<(), IndexError> {
        let descendants = self.subtree(cell)?;
        for &id in descendants.iter().skip(1) {
            self.disconnect_all(id);
            self.cells.remove(id);
        }

        let cell = self.cell_mut(cell)?;
        cell.children.clear();
        cell.child_dims = None;
        Ok(())
    }

    fn subdivide(&mut self, cell: CellId, levels: &[LevelSpec]) -> Result<(), IndexError> {
        let Some((&spec, rest)) = levels.split_first() else {
            return Ok(());
        };

        let (bounds, depth) = {
            let parent = self.cell(cell)?;
            (parent.bounds, parent.depth)
        };
        let step = bounds.size().component_div(&spec.as_vec3());

        let mut children = Vec::with_capacity(spec.cell_count());
        for x in 0..spec.width {
            for y in 0..spec.height {
                for z in 0..spec.depth {
                    let min = Vec3::new(
                        slot_bound(bounds.min.x, bounds.max.x, step.x, x, spec.width),
                        slot_bound(bounds.min.y, bounds.max.y, step.y, y, spec.height),
                        slot_bound(bounds.min.z, bounds.max.z, step.z, z, spec.depth),
                    );
                    let max = Vec3::new(
                        slot_bound(bounds.min.x, bounds.max.x, step.x, x + 1, spec.width),
                        slot_bound(bounds.min.y, bounds.max.y, step.y, y + 1, spec.height),
                        slot_bound(bounds.min.z, bounds.max.z, step.z, z + 1, spec.depth),
                    );

                    let mut child = SpatialCell::from_bounds(Aabb::new(min, max), Some(cell));
                    child.depth = depth + 1;
                    child.lattice = [x, y, z];
                    children.push(self.cells.insert(child));
                }
            }
        }

        {
            let parent = self.cell_mut(cell)?;
            parent.children.clone_from(&children);
            parent.child_dims = Some(spec);
        }

        self.wire_siblings(&children, spec);

        if !rest.is_empty() {
            for child in children {
                self.subdivide(child, rest)?;
            }
        }
        Ok(())
    }

    /// Link each child to every sibling within Chebyshev distance 1
    fn wire_siblings(&mut self, children: &[CellId], spec: LevelSpec) {
        for (index, &child) in children.iter().enumerate() {
            let [x, y, z] = lattice::from_1d(index, spec.height, spec.depth);

            for nx in x.saturating_sub(1)..=(x + 1).min(spec.width - 1) {
                for ny in y.saturating_sub(1)..=(y + 1).min(spec.height - 1) {
                    for nz in z.saturating_sub(1)..=(z + 1).min(spec.depth - 1) {
                        let other = lattice::to_1d(nx, ny, nz, spec.height, spec.depth);
                        // Each pair once, from its lower index
                        if other > index {
                            self.connect(child, children[other]);
                        }
                    }
                }
            }
        }
    }

    /// Stitch grandchildren across every pair of adjacent siblings in the
    /// subtree rooted at `root`
    fn stitch_subtree(&mut self, root: CellId) -> Result<(), IndexError> {
        for parent in self.subtree(root)? {
            let cell = self.cell(parent)?;
            let Some(dims) = cell.child_dims else {
                continue;
            };

            let mut pairs = Vec::new();
            for (index, &child) in cell.children.iter().enumerate() {
                for &neighbor in &self.cells[child].neighbors {
                    let other = &self.cells[neighbor];
                    if other.parent != Some(parent) {
                        continue;
                    }
                    let [x, y, z] = other.lattice;
                    if lattice::to_1d(x, y, z, dims.height, dims.depth) > index {
                        pairs.push((child, neighbor));
                    }
                }
            }

            for (a, b) in pairs {
                self.stitch_pair(a, b);
            }
        }
        Ok(())
    }

    /// Link the children of two touching cells wherever they touch, then
    /// recurse into each newly linked pair.
    fn stitch_pair(&mut self, a: CellId, b: CellId) {
        let facing_a = self.children_touching(a, b);
        if facing_a.is_empty() {
            return;
        }
        let facing_b = self.children_touching(b, a);

        let mut pairs = Vec::new();
        for &child_a in &facing_a {
            for &child_b in &facing_b {
                if self.cells[child_a].touches(&self.cells[child_b]) {
                    pairs.push((child_a, child_b));
                }
            }
        }

        for (child_a, child_b) in pairs {
            self.connect(child_a, child_b);
            self.stitch_pair(child_a, child_b);
        }
    }

    /// Children of `cell` whose boxes touch the box of `other`
    fn children_touching(&self, cell: CellId, other: CellId) -> Vec<CellId> {
        let (Some(cell), Some(other)) = (self.cells.get(cell), self.cells.get(other)) else {
            return Vec::new();
        };
        cell.children
            .iter()
            .copied()
            .filter(|&child| self.cells[child].touches(other))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::lattice::chebyshev;
    use approx::assert_relative_eq;

    fn build(size: f32, levels: &[LevelSpec]) -> (CellHierarchy, CellId) {
        let mut hierarchy = CellHierarchy::new();
        let root = hierarchy
            .create_root(Vec3::zeros(), Vec3::new(size, size, size), levels)
            .unwrap();
        (hierarchy, root)
    }

    /// Integer coordinate of a cell in the lattice of all cells at its depth
    fn global_coord(hierarchy: &CellHierarchy, id: CellId) -> [u32; 3] {
        let cell = hierarchy.cell(id).unwrap();
        match cell.parent() {
            None => [0, 0, 0],
            Some(parent) => {
                let dims = hierarchy.cell(parent).unwrap().child_dims().unwrap();
                let base = global_coord(hierarchy, parent);
                let local = cell.lattice();
                [
                    base[0] * dims.width + local[0],
                    base[1] * dims.height + local[1],
                    base[2] * dims.depth + local[2],
                ]
            }
        }
    }

    #[test]
    fn test_empty_levels_is_noop() {
        let (hierarchy, root) = build(10.0, &[]);
        assert_eq!(hierarchy.len(), 1);
        assert!(hierarchy.cell(root).unwrap().is_leaf());
    }

    #[test]
    fn test_zero_dimension_rejected_before_building() {
        let mut hierarchy = CellHierarchy::new();
        let err = hierarchy
            .create_root(
                Vec3::zeros(),
                Vec3::new(10.0, 10.0, 10.0),
                &[LevelSpec::new(2, 2, 2), LevelSpec::new(3, 0, 3)],
            )
            .unwrap_err();
        assert_eq!(
            err,
            IndexError::InvalidLevelSpec {
                level: 1,
                spec: LevelSpec::new(3, 0, 3),
            }
        );
        assert!(hierarchy.is_empty());
    }

    #[test]
    fn test_invalid_root_box_rejected() {
        let mut hierarchy = CellHierarchy::new();
        let result = hierarchy.create_root(Vec3::zeros(), Vec3::new(10.0, 0.0, 10.0), &[]);
        assert!(matches!(result, Err(IndexError::InvalidRoot { .. })));
        let result = hierarchy.create_root(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0), &[]);
        assert!(matches!(result, Err(IndexError::InvalidRoot { .. })));
    }

    #[test]
    fn test_children_partition_parent_in_row_major_order() {
        let (hierarchy, root) = build(12.0, &[LevelSpec::new(2, 3, 4)]);
        let children = hierarchy.cell(root).unwrap().children().to_vec();
        assert_eq!(children.len(), 24);

        for (index, &child) in children.iter().enumerate() {
            let cell = hierarchy.cell(child).unwrap();
            assert_eq!(lattice::from_1d(index, 3, 4), cell.lattice());
            assert_eq!(cell.parent(), Some(root));
            assert_eq!(cell.depth(), 1);
            assert_relative_eq!(cell.size(), Vec3::new(6.0, 4.0, 3.0), epsilon = 1e-5);
        }

        // Slot (1, 2, 3) is the far corner
        let far = hierarchy.child_at(root, [1, 2, 3]).unwrap().unwrap();
        assert_eq!(far, children[23]);
        assert_relative_eq!(
            hierarchy.cell(far).unwrap().bounds().max,
            Vec3::new(6.0, 6.0, 6.0)
        );
        assert_eq!(hierarchy.child_at(root, [2, 0, 0]).unwrap(), None);

        // Shared faces are bit-identical
        let left = hierarchy.cell(children[0]).unwrap();
        let right = hierarchy.cell(hierarchy.child_at(root, [1, 0, 0]).unwrap().unwrap()).unwrap();
        assert_eq!(left.bounds().max.x.to_bits(), right.bounds().min.x.to_bits());
    }

    #[test]
    fn test_two_by_two_by_two_everyone_is_a_neighbor() {
        let (hierarchy, root) = build(10.0, &[LevelSpec::new(2, 2, 2)]);
        let children = hierarchy.cell(root).unwrap().children().to_vec();
        assert_eq!(children.len(), 8);

        let corner = hierarchy.cell(children[0]).unwrap();
        assert_eq!(corner.neighbors().len(), 7);
        assert_relative_eq!(corner.size(), Vec3::new(5.0, 5.0, 5.0));
        assert_relative_eq!(corner.center(), Vec3::new(-2.5, -2.5, -2.5));
    }

    #[test]
    fn test_sibling_neighbor_counts() {
        let (hierarchy, root) = build(30.0, &[LevelSpec::new(3, 3, 3)]);
        let counts: Vec<usize> = hierarchy
            .cell(root)
            .unwrap()
            .children()
            .iter()
            .map(|&c| hierarchy.cell(c).unwrap().neighbors().len())
            .collect();
        // corner, edge, face, centre
        assert_eq!(counts[lattice::to_1d(0, 0, 0, 3, 3)], 7);
        assert_eq!(counts[lattice::to_1d(1, 0, 0, 3, 3)], 11);
        assert_eq!(counts[lattice::to_1d(1, 1, 0, 3, 3)], 17);
        assert_eq!(counts[lattice::to_1d(1, 1, 1, 3, 3)], 26);
    }

    #[test]
    fn test_neighbor_graph_matches_geometric_adjacency() {
        let levels = [LevelSpec::new(2, 1, 2), LevelSpec::new(3, 2, 3), LevelSpec::new(2, 2, 2)];
        let (hierarchy, root) = build(60.0, &levels);

        for depth in 1..=3 {
            let cells = hierarchy.cells_at_depth(root, depth).unwrap();
            for &a in &cells {
                let coord_a = global_coord(&hierarchy, a);
                let neighbors = hierarchy.cell(a).unwrap().neighbors();
                for &b in &cells {
                    let adjacent = a != b && chebyshev(coord_a, global_coord(&hierarchy, b)) <= 1;
                    assert_eq!(
                        neighbors.contains(&b),
                        adjacent,
                        "depth {depth}: {coord_a:?} vs {:?}",
                        global_coord(&hierarchy, b)
                    );
                }
            }
        }
    }

    #[test]
    fn test_neighbor_relation_is_symmetric() {
        let levels = [LevelSpec::new(3, 2, 2), LevelSpec::new(2, 2, 3)];
        let (hierarchy, root) = build(24.0, &levels);

        for id in hierarchy.subtree(root).unwrap() {
            for &n in hierarchy.cell(id).unwrap().neighbors() {
                assert!(hierarchy.cell(n).unwrap().neighbors().contains(&id));
                assert_eq!(hierarchy.cell(n).unwrap().depth(), hierarchy.cell(id).unwrap().depth());
            }
        }
    }

    #[test]
    fn test_construction_is_deterministic() {
        let levels = [LevelSpec::new(2, 3, 2), LevelSpec::new(3, 2, 2)];
        let (first, first_root) = build(50.0, &levels);
        let (second, second_root) = build(50.0, &levels);

        let a = first.subtree(first_root).unwrap();
        let b = second.subtree(second_root).unwrap();
        assert_eq!(a.len(), b.len());
        for (&x, &y) in a.iter().zip(b.iter()) {
            let (x, y) = (first.cell(x).unwrap(), second.cell(y).unwrap());
            assert_eq!(x.lattice(), y.lattice());
            assert_eq!(x.depth(), y.depth());
            assert_eq!(x.children().len(), y.children().len());
            assert_eq!(x.neighbors().len(), y.neighbors().len());
            assert_eq!(x.bounds(), y.bounds());
        }
    }

    #[test]
    fn test_regenerating_subtree_restitches_surroundings() {
        let (mut hierarchy, root) = build(40.0, &[LevelSpec::new(2, 2, 2), LevelSpec::new(2, 2, 2)]);
        let first = hierarchy.cell(root).unwrap().children()[0];
        let before = hierarchy.len();

        hierarchy.generate_grid(first, &[LevelSpec::new(2, 2, 2)]).unwrap();
        assert_eq!(hierarchy.len(), before);

        // The rebuilt subtree is linked to its surroundings just like before
        let leaves = hierarchy.cells_at_depth(root, 2).unwrap();
        for &a in &leaves {
            for &n in hierarchy.cell(a).unwrap().neighbors() {
                assert!(hierarchy.get(n).is_some(), "dangling neighbor edge");
                assert!(hierarchy.cell(n).unwrap().neighbors().contains(&a));
            }
        }
        let corner = hierarchy.child_at(first, [1, 1, 1]).unwrap().unwrap();
        assert_eq!(hierarchy.cell(corner).unwrap().neighbors().len(), 26);
    }

    #[test]
    fn test_regenerating_at_another_leaf_depth_is_refused() {
        let two = LevelSpec::new(2, 2, 2);
        let (mut hierarchy, root) = build(40.0, &[two, two, two]);
        let first = hierarchy.cell(root).unwrap().children()[0];
        let before = hierarchy.len();
        let old_leaves = hierarchy.leaves(first).unwrap();

        let deeper = hierarchy.generate_grid(first, &[two, two, two]);
        assert_eq!(
            deeper,
            Err(IndexError::LeafDepthMismatch {
                cell: first,
                expected: 3,
                requested: 4,
            })
        );

        let shallower = hierarchy.generate_grid(first, &[two]);
        assert_eq!(
            shallower,
            Err(IndexError::LeafDepthMismatch {
                cell: first,
                expected: 3,
                requested: 2,
            })
        );

        let split_leaf = hierarchy.generate_grid(old_leaves[0], &[LevelSpec::new(3, 3, 3)]);
        assert!(matches!(split_leaf, Err(IndexError::LeafDepthMismatch { requested: 4, .. })));

        // Nothing was torn down by the refused rebuilds
        assert_eq!(hierarchy.len(), before);
        assert_eq!(hierarchy.leaves(first).unwrap(), old_leaves);

        hierarchy.generate_grid(first, &[LevelSpec::new(3, 1, 2), two]).unwrap();
        assert!(hierarchy
            .leaves(first)
            .unwrap()
            .iter()
            .all(|&l| hierarchy.cell(l).unwrap().depth() == 3));
    }

    #[test]
    fn test_regenerating_root_may_change_depth() {
        let (mut hierarchy, root) = build(40.0, &[LevelSpec::new(2, 2, 2)]);
        hierarchy
            .generate_grid(root, &[LevelSpec::new(2, 2, 2), LevelSpec::new(3, 3, 3)])
            .unwrap();
        let leaves = hierarchy.leaves(root).unwrap();
        assert_eq!(leaves.len(), 8 * 27);
        assert!(leaves.iter().all(|&l| hierarchy.cell(l).unwrap().depth() == 2));
    }

    #[test]
    fn test_find_leaf_descends_to_containing_leaf() {
        let (hierarchy, root) = build(10.0, &[LevelSpec::new(2, 2, 2), LevelSpec::new(5, 5, 5)]);
        let point = Vec3::new(1.2, -3.7, 4.9);
        let leaf = hierarchy.find_leaf(root, point).unwrap();
        let cell = hierarchy.cell(leaf).unwrap();
        assert!(cell.is_leaf());
        assert!(cell.contains(point));
        assert_eq!(cell.depth(), 2);
    }
}
