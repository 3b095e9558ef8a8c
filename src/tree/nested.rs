//! Nested value/left/right representation of the canonical tree.
//!
//! This is the shape a persistence layer reads and writes. The crate does not
//! pick an encoding; `NestedNode` derives serde traits and the caller chooses
//! JSON, bincode or a JS object. Both directions use explicit work stacks so
//! deep trees do not exhaust the call stack.

use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::One;
use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::builder::CollatzTreeBuilder;
use super::node::next_value;
use crate::error::{CollatzError, Result};

/// One node of the nested form. `left` holds the first child slot, `right`
/// the second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedNode {
    /// Node value, encoded as a decimal string.
    #[serde(with = "super::node::decimal")]
    pub value: BigUint,
    /// First child.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Box<NestedNode>>,
    /// Second child.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Box<NestedNode>>,
}

impl NestedNode {
    /// A childless node.
    pub fn leaf(value: BigUint) -> Self {
        Self {
            value,
            left: None,
            right: None,
        }
    }
}

impl CollatzTreeBuilder {
    /// Export the tree in nested form.
    pub fn to_nested(&self) -> NestedNode {
        // Post-order: a node is assembled once both children are finished.
        let mut finished: HashMap<NodeIndex, NestedNode> = HashMap::with_capacity(self.len());
        let mut stack = vec![(self.root, false)];

        while let Some((node, expanded)) = stack.pop() {
            let [first, second] = self.child_indices(node);
            if !expanded {
                stack.push((node, true));
                stack.extend(second.map(|c| (c, false)));
                stack.extend(first.map(|c| (c, false)));
                continue;
            }

            let mut nested = NestedNode::leaf(self.value_of(node).clone());
            nested.left = first.and_then(|c| finished.remove(&c)).map(Box::new);
            nested.right = second.and_then(|c| finished.remove(&c)).map(Box::new);
            finished.insert(node, nested);
        }

        finished
            .remove(&self.root)
            .unwrap_or_else(|| NestedNode::leaf(BigUint::one()))
    }

    /// Rebuild a tree from nested form.
    ///
    /// The root must be 1, every child must step forward to its parent, and no
    /// value may appear twice. A `right` child without a `left` child is
    /// accepted and lands in the first slot.
    pub fn from_nested(root: &NestedNode) -> Result<Self> {
        if !root.value.is_one() {
            return Err(CollatzError::invalid_tree(format!(
                "root must be 1, found {}",
                root.value
            )));
        }

        let mut tree = Self::new();
        let mut stack: Vec<(&NestedNode, NodeIndex)> = Vec::new();
        push_children(&mut stack, root, tree.root);

        while let Some((nested, parent)) = stack.pop() {
            let parent_value = tree.value_of(parent);
            if next_value(&nested.value) != *parent_value {
                return Err(CollatzError::invalid_tree(format!(
                    "{} is not a predecessor of {}",
                    nested.value, parent_value
                )));
            }
            if tree.contains(&nested.value) {
                return Err(CollatzError::invalid_tree(format!(
                    "value {} appears more than once",
                    nested.value
                )));
            }
            let node = tree.attach(parent, nested.value.clone())?;
            push_children(&mut stack, nested, node);
        }

        debug!(nodes = tree.len(), "rebuilt tree from nested form");
        Ok(tree)
    }
}

fn push_children<'a>(
    stack: &mut Vec<(&'a NestedNode, NodeIndex)>,
    nested: &'a NestedNode,
    node: NodeIndex,
) {
    // Right first so the left child is popped, and attached, first.
    if let Some(right) = nested.right.as_deref() {
        stack.push((right, node));
    }
    if let Some(left) = nested.left.as_deref() {
        stack.push((left, node));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_single_root() {
        let tree = CollatzTreeBuilder::new();
        assert_eq!(tree.to_nested(), NestedNode::leaf(big(1)));
    }

    #[test]
    fn test_nested_preserves_slots() {
        let mut tree = CollatzTreeBuilder::new();
        tree.add(big(5)).unwrap();
        tree.add(big(32)).unwrap();

        let nested = tree.to_nested();
        let rebuilt = CollatzTreeBuilder::from_nested(&nested).unwrap();

        assert_eq!(rebuilt.len(), tree.len());
        assert_eq!(rebuilt.children(&big(16)), vec![big(5), big(32)]);
        assert_eq!(rebuilt.to_nested(), nested);
    }

    #[test]
    fn test_nested_shape() {
        let mut tree = CollatzTreeBuilder::new();
        tree.add(big(4)).unwrap();
        let nested = tree.to_nested();

        assert_eq!(nested.value, big(1));
        let two = nested.left.as_deref().expect("1 has child 2");
        assert_eq!(two.value, big(2));
        assert!(nested.right.is_none());
        assert_eq!(two.left.as_deref().map(|n| n.value.clone()), Some(big(4)));
    }

    #[test]
    fn test_rejects_wrong_root() {
        let err = CollatzTreeBuilder::from_nested(&NestedNode::leaf(big(2))).unwrap_err();
        assert!(matches!(err, CollatzError::InvalidTree { .. }));
    }

    #[test]
    fn test_rejects_non_predecessor() {
        let mut root = NestedNode::leaf(big(1));
        root.left = Some(Box::new(NestedNode::leaf(big(3))));
        let err = CollatzTreeBuilder::from_nested(&root).unwrap_err();
        assert!(
            err.to_string().contains("3 is not a predecessor of 1"),
            "unexpected message: {err}"
        );
    }

    #[test]
    fn test_rejects_duplicate_value() {
        // 2 under 1 is fine; a second 2 under 1 is a duplicate.
        let mut root = NestedNode::leaf(big(1));
        root.left = Some(Box::new(NestedNode::leaf(big(2))));
        root.right = Some(Box::new(NestedNode::leaf(big(2))));
        let err = CollatzTreeBuilder::from_nested(&root).unwrap_err();
        assert!(matches!(err, CollatzError::InvalidTree { .. }), "got {err:?}");
    }

    #[test]
    fn test_deep_chain_round_trip() {
        let mut tree = CollatzTreeBuilder::new();
        // 2^2000 is a straight chain of 2000 doublings.
        tree.add(BigUint::one() << 2000u32).unwrap();
        assert_eq!(tree.len(), 2001);

        let rebuilt = CollatzTreeBuilder::from_nested(&tree.to_nested()).unwrap();
        assert_eq!(rebuilt.len(), 2001);
    }
}
