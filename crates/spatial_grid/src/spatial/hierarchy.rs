//! Cell arena and tree/graph traversal
//!
//! Every cell of every root grid lives in one slot map. Parent, child and
//! neighbor links are [`CellId`] keys into that map.

use crate::foundation::collections::{CellId, ObjectHandle, SlotMap};
use crate::foundation::math::{lattice, Vec3};
use crate::spatial::cell::{BroadPhase, SpatialCell};
use crate::spatial::error::IndexError;
use std::collections::HashSet;

/// Arena holding the cells of one or more grid trees
#[derive(Debug, Clone, Default)]
pub struct CellHierarchy {
    pub(crate) cells: SlotMap<CellId, SpatialCell>,
}

impl CellHierarchy {
    /// Create an empty hierarchy
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of cells across all trees
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the hierarchy holds no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Look up a cell
    pub fn get(&self, id: CellId) -> Option<&SpatialCell> {
        self.cells.get(id)
    }

    /// Look up a cell, failing on unknown keys
    pub fn cell(&self, id: CellId) -> Result<&SpatialCell, IndexError> {
        self.cells.get(id).ok_or(IndexError::UnknownCell(id))
    }

    pub(crate) fn cell_mut(&mut self, id: CellId) -> Result<&mut SpatialCell, IndexError> {
        self.cells.get_mut(id).ok_or(IndexError::UnknownCell(id))
    }

    /// Link two cells as neighbors in both directions
    pub(crate) fn connect(&mut self, a: CellId, b: CellId) {
        if a == b {
            return;
        }
        if let Some([cell_a, cell_b]) = self.cells.get_disjoint_mut([a, b]) {
            cell_a.add_neighbor(b);
            cell_b.add_neighbor(a);
        }
    }

    /// Unlink a cell from all of its neighbors
    pub(crate) fn disconnect_all(&mut self, id: CellId) {
        let neighbors = match self.cells.get_mut(id) {
            Some(cell) => std::mem::take(&mut cell.neighbors),
            None => return,
        };
        for neighbor in neighbors {
            if let Some(cell) = self.cells.get_mut(neighbor) {
                cell.remove_neighbor(id);
            }
        }
    }

    /// Child of `cell` at lattice coordinate `[x, y, z]`
    pub fn child_at(&self, cell: CellId, coord: [u32; 3]) -> Result<Option<CellId>, IndexError> {
        let cell = self.cell(cell)?;
        let Some(dims) = cell.child_dims else {
            return Ok(None);
        };
        let [x, y, z] = coord;
        if x >= dims.width || y >= dims.height || z >= dims.depth {
            return Ok(None);
        }
        let index = lattice::to_1d(x, y, z, dims.height, dims.depth);
        Ok(cell.children.get(index).copied())
    }

    /// Descend from `start` to the leaf containing `point`.
    ///
    /// `start` is assumed to contain the point. When children share a
    /// boundary the first one in lattice order wins.
    pub fn find_leaf(&self, start: CellId, point: Vec3) -> Result<CellId, IndexError> {
        let mut current = start;
        loop {
            let cell = self.cell(current)?;
            if cell.is_leaf() {
                return Ok(current);
            }
            current = cell
                .children
                .iter()
                .copied()
                .find(|&child| self.cells.get(child).is_some_and(|c| c.contains(point)))
                .ok_or_else(|| {
                    log::error!("Cell {current:?} contains {point:?} but none of its children do");
                    IndexError::InconsistentHierarchy { cell: current, point }
                })?;
        }
    }

    /// Collect the leaves reachable from `start` whose boxes pass the
    /// broad-phase test against the sphere at `point` with radius `range`.
    ///
    /// The walk follows neighbor edges, and child links when it meets an
    /// internal cell. A cell that fails the test is not expanded, so the
    /// result is the connected region around `start` that overlaps the
    /// sphere.
    pub fn cells_in_range(
        &self,
        start: CellId,
        point: Vec3,
        range: f32,
        mode: BroadPhase,
    ) -> Result<Vec<CellId>, IndexError> {
        self.cell(start)?;

        let mut visited = HashSet::new();
        let mut stack = vec![start];
        let mut leaves = Vec::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }

            let cell = self.cell(id)?;
            if !cell.in_range(point, range, mode) {
                continue;
            }

            stack.extend(cell.neighbors.iter().rev().filter(|n| !visited.contains(*n)));
            if cell.is_leaf() {
                leaves.push(id);
            } else {
                stack.extend(cell.children.iter().rev().filter(|c| !visited.contains(*c)));
            }
        }

        log::trace!(
            "Range walk from {start:?} (r = {range}): visited {} cells, {} leaves",
            visited.len(),
            leaves.len()
        );
        Ok(leaves)
    }

    /// All cells of the subtree rooted at `root`, parents before children
    pub fn subtree(&self, root: CellId) -> Result<Vec<CellId>, IndexError> {
        self.cell(root)?;
        let mut cells = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            cells.push(id);
            if let Some(cell) = self.cells.get(id) {
                stack.extend(cell.children.iter().rev());
            }
        }
        Ok(cells)
    }

    /// Get all leaf cells under `root`
    pub fn leaves(&self, root: CellId) -> Result<Vec<CellId>, IndexError> {
        Ok(self
            .subtree(root)?
            .into_iter()
            .filter(|&id| self.cells[id].is_leaf())
            .collect())
    }

    /// Get all cells under `root` at an absolute depth
    pub fn cells_at_depth(&self, root: CellId, depth: u32) -> Result<Vec<CellId>, IndexError> {
        Ok(self
            .subtree(root)?
            .into_iter()
            .filter(|&id| self.cells[id].depth == depth)
            .collect())
    }

    /// Count registered objects in a subtree
    pub fn count_members(&self, root: CellId) -> Result<usize, IndexError> {
        Ok(self
            .subtree(root)?
            .into_iter()
            .map(|id| self.cells[id].members.len())
            .sum())
    }

    pub(crate) fn subtree_has_members(&self, root: CellId) -> Result<bool, IndexError> {
        Ok(self
            .subtree(root)?
            .into_iter()
            .any(|id| !self.cells[id].members.is_empty()))
    }

    /// Check whether `handle` is listed on `cell`
    pub fn is_member(&self, cell: CellId, handle: ObjectHandle) -> bool {
        self.cells
            .get(cell)
            .is_some_and(|c| c.members.contains(&handle))
    }

    pub(crate) fn register(&mut self, cell: CellId, handle: ObjectHandle) -> Result<(), IndexError> {
        self.cell_mut(cell)?.add_member(handle);
        Ok(())
    }

    pub(crate) fn unregister(&mut self, cell: CellId, handle: ObjectHandle) -> Result<(), IndexError> {
        if self.cell_mut(cell)?.remove_member(handle) {
            Ok(())
        } else {
            Err(IndexError::NotRegistered { handle, cell })
        }
    }
}
