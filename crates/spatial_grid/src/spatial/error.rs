//! Errors raised by grid construction, resolution and object bookkeeping

use crate::foundation::collections::{CellId, ObjectHandle};
use crate::foundation::math::Vec3;
use crate::spatial::builder::LevelSpec;
use crate::spatial::index::RootIndex;
use thiserror::Error;

/// Spatial index errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    /// A level specification has a zero dimension
    #[error("Level {level} has an empty lattice: {spec}")]
    InvalidLevelSpec {
        /// Position of the offending spec in the level sequence
        level: usize,
        /// The offending spec
        spec: LevelSpec,
    },

    /// A root box is degenerate or not finite
    #[error("Invalid root box: center {center:?}, size {size:?}")]
    InvalidRoot {
        /// Requested center
        center: Vec3,
        /// Requested size
        size: Vec3,
    },

    /// No root grid at this index
    #[error("Unknown root grid {0}")]
    UnknownRoot(RootIndex),

    /// The cell key does not belong to this hierarchy
    #[error("Unknown cell {0:?}")]
    UnknownCell(CellId),

    /// A point lies outside the bounds of the root it was resolved against
    #[error("Point {point:?} lies outside root grid {root}")]
    OutOfBounds {
        /// Root grid the point was resolved against
        root: RootIndex,
        /// Offending point
        point: Vec3,
    },

    /// An internal cell contains a point that none of its children contain
    #[error("Cell {cell:?} contains {point:?} but none of its children do")]
    InconsistentHierarchy {
        /// Internal cell where resolution stopped
        cell: CellId,
        /// Point being resolved
        point: Vec3,
    },

    /// The handle is not tracked by this index (never placed, or removed)
    #[error("Object handle {0:?} is not tracked")]
    StaleHandle(ObjectHandle),

    /// The handle's leaf does not list it as a member
    #[error("Object handle {handle:?} is not registered on cell {cell:?}")]
    NotRegistered {
        /// Offending handle
        handle: ObjectHandle,
        /// Leaf the handle claims to live on
        cell: CellId,
    },

    /// Rebuilding a subtree would leave its leaves at a different depth
    /// than the leaves next to it
    #[error("Cell {cell:?} would get leaves at depth {requested}, its neighbors have leaves at depth {expected}")]
    LeafDepthMismatch {
        /// Cell whose subtree was to be rebuilt
        cell: CellId,
        /// Leaf depth found next to the cell
        expected: u32,
        /// Leaf depth the new levels would produce
        requested: u32,
    },

    /// Subdividing would orphan registered objects
    #[error("Cell {0:?} or one of its descendants still holds objects")]
    OccupiedSubtree(CellId),
}
