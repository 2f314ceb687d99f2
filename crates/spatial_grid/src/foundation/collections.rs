//! Arena collection types
//!
//! Cells and tracked objects live in slot maps and refer to each other by
//! key, so parent, neighbor and membership links never borrow.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable key of a cell inside a [`crate::spatial::CellHierarchy`]
    pub struct CellId;

    /// Stable key of an object tracked by a [`crate::spatial::SpatialIndex`]
    pub struct ObjectHandle;
}
