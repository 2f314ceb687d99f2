//! Spatial partitioning data structures
//!
//! A fixed multi-resolution grid: each root box is split into a uniform
//! lattice of cells, each cell again by the next level, down to the leaves
//! that objects register on. Cells at the same depth are joined into a
//! neighbor graph that radius queries walk outward from the querying
//! object's leaf.

mod builder;
mod cell;
mod error;
mod handle;
mod hierarchy;
mod index;
mod spatial_query;

pub use builder::{validate_levels, LevelSpec};
pub use cell::{BroadPhase, SpatialCell};
pub use error::IndexError;
pub use handle::{ObjectHandle, TrackedObject};
pub use hierarchy::CellHierarchy;
pub use index::{RootIndex, SpatialIndex};
pub use spatial_query::SpatialQuery;

pub use crate::foundation::collections::CellId;
