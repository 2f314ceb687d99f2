//! Object registration and movement
//!
//! Each tracked object records the leaf it is registered on, and that leaf
//! lists the object's handle among its members. Only `place`, `update` and
//! `remove` touch either side of that link, and they always change both
//! together.

use crate::foundation::collections::CellId;
pub use crate::foundation::collections::ObjectHandle;
use crate::foundation::math::Vec3;
use crate::spatial::error::IndexError;
use crate::spatial::index::{RootIndex, SpatialIndex};

/// An object registered in a [`SpatialIndex`]
#[derive(Debug, Clone)]
pub struct TrackedObject<T> {
    pub(crate) payload: T,
    pub(crate) position: Vec3,
    pub(crate) root: RootIndex,
    pub(crate) leaf: CellId,
}

impl<T> TrackedObject<T> {
    /// Caller data attached at placement
    pub const fn payload(&self) -> &T {
        &self.payload
    }

    /// Current position
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Grid the object was placed in
    pub const fn root(&self) -> RootIndex {
        self.root
    }

    /// Leaf the object is registered on
    pub const fn leaf(&self) -> CellId {
        self.leaf
    }
}

impl<T> SpatialIndex<T> {
    /// Register a new object at `point` in grid `root`
    pub fn place(&mut self, root: RootIndex, point: Vec3, payload: T) -> Result<ObjectHandle, IndexError> {
        let leaf = self
            .resolve(root, point)?
            .ok_or(IndexError::OutOfBounds { root, point })?;

        let handle = self.objects.insert(TrackedObject {
            payload,
            position: point,
            root,
            leaf,
        });
        self.hierarchy.register(leaf, handle)?;

        log::trace!("Placed {handle:?} at {point:?} in grid {root}");
        Ok(handle)
    }

    /// Move an object, migrating it to a new leaf when it leaves its current one.
    ///
    /// Moving outside the object's grid fails and leaves the object where
    /// it was.
    pub fn update(&mut self, handle: ObjectHandle, position: Vec3) -> Result<(), IndexError> {
        let (leaf, object) = self.registered(handle)?;
        let root = object.root;

        if self.hierarchy.cell(leaf)?.contains(position) {
            if let Some(object) = self.objects.get_mut(handle) {
                object.position = position;
            }
            return Ok(());
        }

        let new_leaf = self
            .resolve(root, position)?
            .ok_or(IndexError::OutOfBounds { root, point: position })?;

        self.hierarchy.unregister(leaf, handle)?;
        self.hierarchy.register(new_leaf, handle)?;
        if let Some(object) = self.objects.get_mut(handle) {
            object.position = position;
            object.leaf = new_leaf;
        }

        log::trace!("Moved {handle:?} from {leaf:?} to {new_leaf:?}");
        Ok(())
    }

    /// Unregister an object and hand back its payload
    pub fn remove(&mut self, handle: ObjectHandle) -> Result<T, IndexError> {
        let (leaf, _) = self.registered(handle)?;
        self.hierarchy.unregister(leaf, handle)?;
        self.objects
            .remove(handle)
            .map(|object| object.payload)
            .ok_or(IndexError::StaleHandle(handle))
    }

    /// Look up a tracked object
    pub fn object(&self, handle: ObjectHandle) -> Option<&TrackedObject<T>> {
        self.objects.get(handle)
    }

    /// Current position of an object
    pub fn position(&self, handle: ObjectHandle) -> Option<Vec3> {
        self.objects.get(handle).map(|o| o.position)
    }

    /// Payload of an object
    pub fn payload(&self, handle: ObjectHandle) -> Option<&T> {
        self.objects.get(handle).map(|o| &o.payload)
    }

    /// Mutable payload of an object
    pub fn payload_mut(&mut self, handle: ObjectHandle) -> Option<&mut T> {
        self.objects.get_mut(handle).map(|o| &mut o.payload)
    }

    /// Leaf an object is registered on
    pub fn leaf_of(&self, handle: ObjectHandle) -> Option<CellId> {
        self.objects.get(handle).map(|o| o.leaf)
    }

    /// Check whether a handle is tracked by this index
    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.objects.contains_key(handle)
    }

    /// Number of tracked objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Iterate over all tracked objects
    pub fn objects(&self) -> impl Iterator<Item = (ObjectHandle, &TrackedObject<T>)> {
        self.objects.iter()
    }

    /// Tracked object and its leaf, after checking both sides of the
    /// membership link agree
    pub(crate) fn registered(&self, handle: ObjectHandle) -> Result<(CellId, &TrackedObject<T>), IndexError> {
        let object = self.objects.get(handle).ok_or_else(|| {
            log::warn!("Use of untracked object handle {handle:?}");
            IndexError::StaleHandle(handle)
        })?;

        if !self.hierarchy.is_member(object.leaf, handle) {
            log::warn!("{handle:?} is not listed on its leaf {:?}", object.leaf);
            return Err(IndexError::NotRegistered {
                handle,
                cell: object.leaf,
            });
        }
        Ok((object.leaf, object))
    }
}
