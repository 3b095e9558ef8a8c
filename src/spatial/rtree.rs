//! R-tree over laid-out node centers, using the rstar crate.
//!
//! Provides O(log n) hit testing for renderers:
//! - Nearest node
//! - Nearest node within a distance
//! - Nodes in a rectangle or radius
//!
//! Results are the slots the points were loaded with, typically indices into
//! a scene's node list.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

/// A node center with its layout slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePoint {
    /// Slot in the source layout.
    pub slot: usize,
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl NodePoint {
    /// Create a new NodePoint.
    pub fn new(slot: usize, x: f64, y: f64) -> Self {
        Self { slot, x, y }
    }
}

impl RTreeObject for NodePoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for NodePoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// Spatial index over one layout snapshot.
#[derive(Debug, Clone)]
pub struct LayoutIndex {
    tree: RTree<NodePoint>,
}

impl LayoutIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk load `(slot, x, y)` tuples.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (usize, f64, f64)>,
    {
        let node_points: Vec<_> = points
            .into_iter()
            .map(|(slot, x, y)| NodePoint::new(slot, x, y))
            .collect();
        Self {
            tree: RTree::bulk_load(node_points),
        }
    }

    /// Find the nearest node to a point.
    pub fn nearest(&self, x: f64, y: f64) -> Option<usize> {
        self.tree.nearest_neighbor(&[x, y]).map(|point| point.slot)
    }

    /// Find the nearest node within a maximum distance.
    pub fn nearest_within(&self, x: f64, y: f64, max_distance: f64) -> Option<usize> {
        let max_distance_sq = max_distance * max_distance;
        self.tree
            .nearest_neighbor(&[x, y])
            .filter(|point| point.distance_2(&[x, y]) <= max_distance_sq)
            .map(|point| point.slot)
    }

    /// Find all nodes within a rectangle.
    pub fn in_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<usize> {
        let envelope = AABB::from_corners([min_x, min_y], [max_x, max_y]);
        self.tree
            .locate_in_envelope(&envelope)
            .map(|point| point.slot)
            .collect()
    }

    /// Find all nodes within a radius of a point.
    pub fn in_radius(&self, x: f64, y: f64, radius: f64) -> Vec<usize> {
        self.tree
            .locate_within_distance([x, y], radius * radius)
            .map(|point| point.slot)
            .collect()
    }

    /// Get the number of nodes in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for LayoutIndex {
    fn default() -> Self {
        Self::new()
    }
}
