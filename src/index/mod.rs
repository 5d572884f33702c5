//! Spatial indexing of object locations.

mod quadtree;

pub use quadtree::SpatialIndex;
