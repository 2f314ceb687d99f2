//! # Spatial Grid
//!
//! A hierarchical uniform-grid index for large numbers of moving point
//! objects inside a bounded 3D volume.
//!
//! ## Features
//!
//! - **Multi-resolution grids**: each root box is split into a lattice of
//!   cells, level by level, from a static list of level specifications
//! - **Neighbor graph**: same-depth cells are linked wherever they touch,
//!   including across subtree boundaries
//! - **Radius queries**: a pruned walk over the neighbor graph picks the
//!   candidate leaves, then an exact distance check picks the objects
//! - **Cheap movement**: an object only changes leaf when it leaves its
//!   current one
//!
//! ## Query accuracy
//!
//! The broad phase decides which leaves a range query looks at. Two modes
//! are available through [`spatial::BroadPhase`]:
//!
//! - `Exact` (the default) keeps every cell whose box overlaps the query
//!   sphere, so results always match a brute-force distance scan
//! - `Approximate` applies the classic inscribed/circumscribed sphere test
//!   with a single probe point toward the cell center. It is cheaper per
//!   cell but can skip cells that overlap the sphere, so objects in range
//!   may be missed. It never reports objects out of range.
//!
//! ## Quick Start
//!
//! ```rust
//! use spatial_grid::prelude::*;
//!
//! fn main() -> Result<(), IndexError> {
//!     let mut index = SpatialIndex::new();
//!     let root = index.add_root(
//!         Vec3::zeros(),
//!         Vec3::new(100.0, 100.0, 100.0),
//!         &[LevelSpec::new(4, 4, 4), LevelSpec::new(5, 5, 5)],
//!     )?;
//!
//!     let oak = index.place(root, Vec3::new(1.0, 2.0, 3.0), "oak")?;
//!     let fern = index.place(root, Vec3::new(4.0, 2.0, 3.0), "fern")?;
//!
//!     let nearby = index.query_range(oak, 5.0, |kind| *kind == "fern")?;
//!     assert_eq!(nearby, vec![fern]);
//!
//!     index.update(fern, Vec3::new(40.0, 2.0, 3.0))?;
//!     assert!(index.query_range(oak, 5.0, |kind| *kind == "fern")?.is_empty());
//!
//!     index.remove(fern)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]

pub mod config;
pub mod foundation;
pub mod spatial;

/// Common imports for index users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, ConfigFormat, GridConfig, RootConfig},
        foundation::math::{Aabb, Vec3},
        spatial::{
            BroadPhase, CellHierarchy, CellId, IndexError, LevelSpec, ObjectHandle, RootIndex,
            SpatialCell, SpatialIndex, SpatialQuery, TrackedObject,
        },
    };
}
