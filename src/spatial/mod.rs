//! Spatial indexing for O(log n) hit testing.
//!
//! This module provides an R-tree based spatial index over a computed layout,
//! so a renderer can map a pointer position back to a node value.

mod rtree;

pub use rtree::{LayoutIndex, NodePoint};
