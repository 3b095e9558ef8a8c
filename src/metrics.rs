//! Per-node structural metrics: depth and subtree leaf weight.
//!
//! Computes two values per node from the canonical tree:
//! - **Path length**: BFS depth from the root (root = 0).
//! - **Traversal weight**: leaves in the node's subtree, filled bottom-up via
//!   a post-order walk. Stands in for how many trajectories pass through.
//!
//! The two passes write disjoint maps, so with the `parallel` feature they run
//! concurrently under `rayon::join`. Both walks use petgraph's iterative
//! visitors and never recurse on the call stack.

use std::collections::HashMap;

use num_bigint::BigUint;
use petgraph::visit::{Bfs, DfsPostOrder};
use tracing::debug;

use crate::tree::CollatzTreeBuilder;

/// Immutable metrics snapshot for one revision of the tree.
///
/// Goes stale as soon as the tree grows; recompute after any addition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeMetrics {
    path_length: HashMap<BigUint, u32>,
    traversal_weight: HashMap<BigUint, u64>,
    furthest_distance: u32,
    max_traversal_weight: u64,
}

impl TreeMetrics {
    /// Compute metrics for every node reachable from the root.
    pub fn compute(tree: &CollatzTreeBuilder) -> Self {
        #[cfg(feature = "parallel")]
        let (path_length, traversal_weight) =
            rayon::join(|| path_lengths(tree), || traversal_weights(tree));
        #[cfg(not(feature = "parallel"))]
        let (path_length, traversal_weight) = (path_lengths(tree), traversal_weights(tree));

        let furthest_distance = path_length.values().copied().max().unwrap_or(0);
        let max_traversal_weight = traversal_weight.values().copied().max().unwrap_or(0);

        debug!(
            nodes = path_length.len(),
            furthest_distance,
            max_traversal_weight,
            "computed tree metrics"
        );

        Self {
            path_length,
            traversal_weight,
            furthest_distance,
            max_traversal_weight,
        }
    }

    /// Depth of `value`, if present.
    pub fn path_length(&self, value: &BigUint) -> Option<u32> {
        self.path_length.get(value).copied()
    }

    /// Leaf count under `value`, if present.
    pub fn traversal_weight(&self, value: &BigUint) -> Option<u64> {
        self.traversal_weight.get(value).copied()
    }

    /// Maximum path length. Drives geometric and color scale.
    #[inline]
    pub fn furthest_distance(&self) -> u32 {
        self.furthest_distance
    }

    /// Maximum traversal weight (the root's weight for a full tree).
    #[inline]
    pub fn max_traversal_weight(&self) -> u64 {
        self.max_traversal_weight
    }

    /// Number of values covered.
    pub fn len(&self) -> usize {
        self.path_length.len()
    }

    /// True when no values are covered.
    pub fn is_empty(&self) -> bool {
        self.path_length.is_empty()
    }

    /// Check whether `value` is covered.
    pub fn contains(&self, value: &BigUint) -> bool {
        self.path_length.contains_key(value)
    }

    /// Iterate covered values with their path length and traversal weight.
    pub fn iter(&self) -> impl Iterator<Item = (&BigUint, u32, u64)> + '_ {
        self.path_length.iter().map(|(value, &depth)| {
            let weight = self.traversal_weight.get(value).copied().unwrap_or(0);
            (value, depth, weight)
        })
    }

    /// View restricted to `values`, keeping the global scale.
    ///
    /// `furthest_distance` and `max_traversal_weight` are carried over from
    /// `self` unchanged so a filtered rendering shares the color and width
    /// scale of the full one.
    pub fn restricted_to<'a, I>(&self, values: I) -> Self
    where
        I: IntoIterator<Item = &'a BigUint>,
    {
        let mut path_length = HashMap::new();
        let mut traversal_weight = HashMap::new();
        for value in values {
            if let Some(&depth) = self.path_length.get(value) {
                path_length.insert(value.clone(), depth);
            }
            if let Some(&weight) = self.traversal_weight.get(value) {
                traversal_weight.insert(value.clone(), weight);
            }
        }
        Self {
            path_length,
            traversal_weight,
            furthest_distance: self.furthest_distance,
            max_traversal_weight: self.max_traversal_weight,
        }
    }
}

fn path_lengths(tree: &CollatzTreeBuilder) -> HashMap<BigUint, u32> {
    let graph = tree.graph();
    let mut depth_by_node = HashMap::with_capacity(tree.len());
    let mut result = HashMap::with_capacity(tree.len());

    // BFS reaches every parent before its children.
    let mut bfs = Bfs::new(graph, tree.root());
    while let Some(node) = bfs.next(graph) {
        let depth = tree
            .parent_index(node)
            .and_then(|parent| depth_by_node.get(&parent))
            .map_or(0, |&d: &u32| d + 1);
        depth_by_node.insert(node, depth);
        result.insert(tree.value_of(node).clone(), depth);
    }
    result
}

fn traversal_weights(tree: &CollatzTreeBuilder) -> HashMap<BigUint, u64> {
    let graph = tree.graph();
    let mut weight_by_node = HashMap::with_capacity(tree.len());
    let mut result = HashMap::with_capacity(tree.len());

    let mut dfs = DfsPostOrder::new(graph, tree.root());
    while let Some(node) = dfs.next(graph) {
        let mut weight = 0u64;
        let mut has_children = false;
        for child in tree.ordered_children(node) {
            has_children = true;
            weight += weight_by_node.get(&child).copied().unwrap_or(0);
        }
        let weight = if has_children { weight } else { 1 };
        weight_by_node.insert(node, weight);
        result.insert(tree.value_of(node).clone(), weight);
    }
    result
}
