//! Object-safe query interface for placement and simulation code
//!
//! Placement policies only need to drop objects into the world, move them,
//! ask what is nearby and take them out again. This trait is that surface,
//! so callers can hold a `Box<dyn SpatialQuery<T>>` without depending on
//! the grid internals.

use crate::foundation::collections::ObjectHandle;
use crate::foundation::math::Vec3;
use crate::spatial::error::IndexError;
use crate::spatial::index::{RootIndex, SpatialIndex};

/// Interface for placing, moving and querying point objects
pub trait SpatialQuery<T>: Send + Sync {
    /// Register a new object at `point` in grid `root`
    fn place_point(&mut self, root: RootIndex, point: Vec3, payload: T) -> Result<ObjectHandle, IndexError>;

    /// Move an object
    fn update_position(&mut self, handle: ObjectHandle, point: Vec3) -> Result<(), IndexError>;

    /// Objects within `radius` of `handle` whose payload passes `filter`
    fn query_range(
        &self,
        handle: ObjectHandle,
        radius: f32,
        filter: &mut dyn FnMut(&T) -> bool,
    ) -> Result<Vec<ObjectHandle>, IndexError>;

    /// Unregister an object before its owner is destroyed
    fn remove_handle(&mut self, handle: ObjectHandle) -> Result<T, IndexError>;

    /// Current position of an object, if tracked
    fn position(&self, handle: ObjectHandle) -> Option<Vec3>;

    /// Number of tracked objects
    fn object_count(&self) -> usize;
}

impl<T: Send + Sync> SpatialQuery<T> for SpatialIndex<T> {
    fn place_point(&mut self, root: RootIndex, point: Vec3, payload: T) -> Result<ObjectHandle, IndexError> {
        self.place(root, point, payload)
    }

    fn update_position(&mut self, handle: ObjectHandle, point: Vec3) -> Result<(), IndexError> {
        self.update(handle, point)
    }

    fn query_range(
        &self,
        handle: ObjectHandle,
        radius: f32,
        filter: &mut dyn FnMut(&T) -> bool,
    ) -> Result<Vec<ObjectHandle>, IndexError> {
        Self::query_range(self, handle, radius, |payload| filter(payload))
    }

    fn remove_handle(&mut self, handle: ObjectHandle) -> Result<T, IndexError> {
        self.remove(handle)
    }

    fn position(&self, handle: ObjectHandle) -> Option<Vec3> {
        Self::position(self, handle)
    }

    fn object_count(&self) -> usize {
        Self::object_count(self)
    }
}
