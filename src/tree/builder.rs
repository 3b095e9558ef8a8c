//! CollatzTreeBuilder - the canonical predecessor tree.
//!
//! The tree is stored in petgraph's StableGraph: node weights carry the value,
//! edges point parent → child and carry the [`ChildSlot`] they occupy. A
//! value → index map gives O(1) membership checks while trajectories are
//! merged onto existing structure.

use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::One;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use tracing::{debug, trace};

use super::node::{ChildSlot, CollatzNode, Trajectory, ensure_positive, parse_value};
use crate::error::{CollatzError, Result};

/// Graph type backing the canonical tree.
pub type CollatzGraph = StableGraph<CollatzNode, ChildSlot, Directed>;

/// Owns the canonical Collatz tree, rooted at 1.
///
/// The tree only ever grows. Derived views (metrics, layouts, selections) read
/// it through shared references and never write back.
#[derive(Debug, Clone)]
pub struct CollatzTreeBuilder {
    /// The underlying graph. Edges point from a value to its predecessor.
    pub(super) graph: CollatzGraph,

    /// Map from value to petgraph NodeIndex
    pub(super) index: HashMap<BigUint, NodeIndex>,

    /// Index of the node holding 1
    pub(super) root: NodeIndex,
}

impl CollatzTreeBuilder {
    /// Create a tree holding only the root.
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Create a tree with pre-allocated capacity.
    pub fn with_capacity(node_capacity: usize) -> Self {
        let capacity = node_capacity.max(1);
        let mut graph = CollatzGraph::with_capacity(capacity, capacity - 1);
        let mut index = HashMap::with_capacity(capacity);
        let one = BigUint::one();
        let root = graph.add_node(CollatzNode::new(one.clone()));
        index.insert(one, root);
        Self { graph, index, root }
    }

    // =========================================================================
    // Growth
    // =========================================================================

    /// Ensure the trajectory of `value` is represented in the tree.
    ///
    /// Walks forward until a value already in the tree is reached, then
    /// attaches the new values in reverse. Returns the number of nodes added;
    /// re-adding a known value adds nothing.
    pub fn add(&mut self, value: BigUint) -> Result<usize> {
        ensure_positive(&value)?;
        if self.index.contains_key(&value) {
            trace!(value = %value, "value already present");
            return Ok(0);
        }

        let mut path = Vec::new();
        let mut anchor = self.root;
        for step in Trajectory::new(value) {
            if let Some(&existing) = self.index.get(&step) {
                anchor = existing;
                break;
            }
            path.push(step);
        }

        // Only the anchor can be full; every later parent is freshly created,
        // so a failed add attaches nothing.
        if let Some(nearest) = path.last() {
            if self.free_slot(anchor).is_none() {
                return Err(CollatzError::StructuralInvariant {
                    parent: self.graph[anchor].value.to_string(),
                    child: nearest.to_string(),
                });
            }
        }

        let added = path.len();
        let mut parent = anchor;
        for step in path.into_iter().rev() {
            parent = self.attach(parent, step)?;
        }

        debug!(
            new_nodes = added,
            total_nodes = self.graph.node_count(),
            "merged trajectory into tree"
        );
        Ok(added)
    }

    /// Parse a decimal string and add it.
    pub fn add_str(&mut self, value: &str) -> Result<usize> {
        self.add(parse_value(value)?)
    }

    /// Add every value in `start..=end`. Returns the number of nodes added.
    pub fn add_range(&mut self, start: u64, end: u64) -> Result<usize> {
        self.extend_values((start..=end).map(BigUint::from))
    }

    /// Add every value yielded by `values`, stopping at the first error.
    pub fn extend_values<I>(&mut self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = BigUint>,
    {
        let mut added = 0;
        for value in values {
            added += self.add(value)?;
        }
        Ok(added)
    }

    /// Create a node for `value` and hang it from `parent`'s first free slot.
    pub(super) fn attach(&mut self, parent: NodeIndex, value: BigUint) -> Result<NodeIndex> {
        let slot = self.free_slot(parent).ok_or_else(|| CollatzError::StructuralInvariant {
            parent: self.graph[parent].value.to_string(),
            child: value.to_string(),
        })?;

        let child = self.graph.add_node(CollatzNode::new(value.clone()));
        self.graph.add_edge(parent, child, slot);
        self.index.insert(value, child);
        Ok(child)
    }

    fn free_slot(&self, node: NodeIndex) -> Option<ChildSlot> {
        let children = self.child_indices(node);
        ChildSlot::ALL
            .into_iter()
            .find(|slot| children[slot.index()].is_none())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Always false: the root is present from construction.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Check whether `value` is in the tree.
    pub fn contains(&self, value: &BigUint) -> bool {
        self.index.contains_key(value)
    }

    /// Graph index of the root node.
    #[inline]
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Read-only access to the backing graph.
    #[inline]
    pub fn graph(&self) -> &CollatzGraph {
        &self.graph
    }

    /// Graph index holding `value`.
    pub fn node_index(&self, value: &BigUint) -> Option<NodeIndex> {
        self.index.get(value).copied()
    }

    /// Value stored at `node`.
    ///
    /// Panics if `node` does not belong to this tree.
    #[inline]
    pub fn value_of(&self, node: NodeIndex) -> &BigUint {
        &self.graph[node].value
    }

    /// Children of `node` by slot.
    pub fn child_indices(&self, node: NodeIndex) -> [Option<NodeIndex>; 2] {
        let mut slots = [None, None];
        for edge in self.graph.edges_directed(node, Direction::Outgoing) {
            slots[edge.weight().index()] = Some(edge.target());
        }
        slots
    }

    /// Children of `node` in slot order, skipping empty slots.
    pub fn ordered_children(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + use<> {
        self.child_indices(node).into_iter().flatten()
    }

    /// Parent of `node`, or `None` for the root.
    pub fn parent_index(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .next()
    }

    /// Child values of `value` in slot order. Empty if `value` is absent.
    pub fn children(&self, value: &BigUint) -> Vec<BigUint> {
        self.node_index(value)
            .map(|node| {
                self.ordered_children(node)
                    .map(|child| self.value_of(child).clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parent value of `value`. `None` for the root or an absent value.
    pub fn parent(&self, value: &BigUint) -> Option<&BigUint> {
        let node = self.node_index(value)?;
        self.parent_index(node).map(|parent| self.value_of(parent))
    }
}

impl Default for CollatzTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
