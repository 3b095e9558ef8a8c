//! Path selection: render a connected subset of a laid-out tree.
//!
//! A policy picks K candidate values; the root is always added. The pruned
//! tree keeps every selected node plus all of its ancestors, so it is the
//! smallest subtree spanning the root and the selection. Positions are copied
//! unchanged, and the returned metrics keep the unfiltered global scale.

use std::cmp::Reverse;

use num_bigint::BigUint;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::angular::{LayoutNode, LayoutTree};
use crate::error::{CollatzError, Result};
use crate::metrics::TreeMetrics;

/// Which nodes to keep when rendering a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// The K deepest nodes.
    Longest(usize),
    /// The K nodes with the highest traversal weight.
    MostTraversed(usize),
    /// The K nodes with the lowest traversal weight.
    LeastTraversed(usize),
    /// K nodes drawn uniformly without replacement.
    Random {
        /// Number of nodes to draw.
        count: usize,
        /// Seed for reproducible draws; `None` draws from entropy.
        seed: Option<u64>,
    },
}

impl SelectionPolicy {
    /// Number of nodes the policy asks for, root excluded.
    pub fn count(&self) -> usize {
        match *self {
            Self::Longest(k) | Self::MostTraversed(k) | Self::LeastTraversed(k) => k,
            Self::Random { count, .. } => count,
        }
    }
}

/// Selection counts as they arrive from configuration. At most one may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectionConfig {
    /// Keep the K deepest nodes.
    pub longest: Option<usize>,
    /// Keep the K most traversed nodes.
    pub most_traversed: Option<usize>,
    /// Keep the K least traversed nodes.
    pub least_traversed: Option<usize>,
    /// Keep K random nodes.
    pub random: Option<usize>,
    /// Seed for `random`.
    pub seed: Option<u64>,
}

impl SelectionConfig {
    /// Resolve the configured policy, or `None` to render the whole tree.
    pub fn policy(&self) -> Result<Option<SelectionPolicy>> {
        let requested = [
            ("selection.longest", self.longest),
            ("selection.most_traversed", self.most_traversed),
            ("selection.least_traversed", self.least_traversed),
            ("selection.random", self.random),
        ];

        let set: Vec<(&'static str, usize)> = requested
            .into_iter()
            .filter_map(|(field, count)| count.map(|k| (field, k)))
            .collect();

        if self.seed.is_some() && self.random.is_none() {
            return Err(CollatzError::config(
                "selection.seed",
                "seed only applies to random selection",
            ));
        }

        match set.as_slice() {
            [] => Ok(None),
            [(field, 0)] => Err(CollatzError::config(*field, "count must be a positive integer")),
            [(field, k)] => Ok(Some(match *field {
                "selection.longest" => SelectionPolicy::Longest(*k),
                "selection.most_traversed" => SelectionPolicy::MostTraversed(*k),
                "selection.least_traversed" => SelectionPolicy::LeastTraversed(*k),
                _ => SelectionPolicy::Random {
                    count: *k,
                    seed: self.seed,
                },
            })),
            many => {
                let names: Vec<&str> = many.iter().map(|(field, _)| *field).collect();
                Err(CollatzError::config(
                    "selection",
                    format!("only one selection policy may be set, got {}", names.join(", ")),
                ))
            }
        }
    }
}

/// Output of a selection: the pruned layout and its metrics view.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Pruned layout, pre-order, positions unchanged.
    pub layout: LayoutTree,
    /// Metrics for the surviving values, with the unfiltered global scale.
    pub metrics: TreeMetrics,
    /// Values chosen by the policy, root included, in selection order.
    pub selected: Vec<BigUint>,
}

/// Applies a [`SelectionPolicy`] to a laid-out tree.
#[derive(Debug, Clone)]
pub struct PathSelector {
    policy: SelectionPolicy,
}

impl PathSelector {
    /// Create a selector for `policy`.
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    /// The active policy.
    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Candidate values chosen by the policy, with the root appended if the
    /// policy did not pick it.
    pub fn select_values(&self, layout: &LayoutTree, metrics: &TreeMetrics) -> Vec<BigUint> {
        let mut candidates: Vec<(&BigUint, u32, u64)> = layout
            .values()
            .map(|value| {
                (
                    value,
                    metrics.path_length(value).unwrap_or(0),
                    metrics.traversal_weight(value).unwrap_or(0),
                )
            })
            .collect();

        let mut selected: Vec<BigUint> = match self.policy {
            SelectionPolicy::Longest(k) => {
                candidates.sort_by_key(|&(value, depth, _)| (Reverse(depth), value));
                take_values(&candidates, k)
            }
            SelectionPolicy::MostTraversed(k) => {
                candidates.sort_by_key(|&(value, _, weight)| (Reverse(weight), value));
                take_values(&candidates, k)
            }
            SelectionPolicy::LeastTraversed(k) => {
                candidates.sort_by_key(|&(value, _, weight)| (weight, value));
                take_values(&candidates, k)
            }
            SelectionPolicy::Random { count, seed } => {
                // Sorted first so a fixed seed gives the same draw regardless
                // of layout order.
                candidates.sort_by_key(|&(value, _, _)| value);
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                candidates
                    .choose_multiple(&mut rng, count)
                    .map(|&(value, _, _)| value.clone())
                    .collect()
            }
        };

        if let Some(root) = layout.root() {
            if !selected.contains(&root.value) {
                selected.push(root.value.clone());
            }
        }
        selected
    }

    /// Prune `layout` to the minimal subtree spanning the root and the
    /// selected values.
    pub fn apply(&self, layout: &LayoutTree, metrics: &TreeMetrics) -> Selection {
        let selected = self.select_values(layout, metrics);

        let mut retained = vec![false; layout.len()];
        for value in &selected {
            let mut cursor = layout.find(value);
            while let Some(slot) = cursor {
                if retained[slot] {
                    break;
                }
                retained[slot] = true;
                cursor = layout.get(slot).and_then(|node| node.parent);
            }
        }

        // The arena is pre-order and `retained` is closed under parents, so a
        // single forward pass rebuilds a valid pre-order arena.
        let mut pruned = LayoutTree::with_capacity(retained.iter().filter(|&&r| r).count());
        let mut remap: Vec<Option<usize>> = vec![None; layout.len()];
        for (slot, node) in layout.nodes().iter().enumerate() {
            if !retained[slot] {
                continue;
            }
            let parent = node.parent.and_then(|p| remap[p]);
            remap[slot] = Some(pruned.push(LayoutNode {
                value: node.value.clone(),
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                parent,
                children: Vec::new(),
            }));
        }

        let metrics = metrics.restricted_to(pruned.values());
        debug!(
            policy = ?self.policy,
            selected = selected.len(),
            retained = pruned.len(),
            of = layout.len(),
            "applied path selection"
        );

        Selection {
            layout: pruned,
            metrics,
            selected,
        }
    }
}

fn take_values(candidates: &[(&BigUint, u32, u64)], k: usize) -> Vec<BigUint> {
    candidates
        .iter()
        .take(k)
        .map(|&(value, _, _)| value.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::AngularLayoutEngine;
    use crate::tree::CollatzTreeBuilder;

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    fn fixture(values: &[u64]) -> (LayoutTree, TreeMetrics) {
        let mut tree = CollatzTreeBuilder::new();
        for &v in values {
            tree.add(big(v)).unwrap();
        }
        let metrics = TreeMetrics::compute(&tree);
        let layout = AngularLayoutEngine::with_defaults().compute(&tree, &metrics);
        (layout, metrics)
    }

    fn assert_connected(layout: &LayoutTree) {
        assert_eq!(layout.root().map(|r| r.value.clone()), Some(big(1)), "root retained");
        for (slot, node) in layout.nodes().iter().enumerate().skip(1) {
            let parent = node.parent.expect("non-root node has a parent");
            assert!(parent < slot);
            assert!(layout.get(parent).unwrap().children.contains(&slot));
        }
    }

    #[test]
    fn test_most_traversed_top_one_is_root() {
        let (layout, metrics) = fixture(&[3, 7, 9]);
        let selection = PathSelector::new(SelectionPolicy::MostTraversed(1)).apply(&layout, &metrics);
        assert_eq!(selection.selected, vec![big(1)]);
        assert_eq!(selection.layout.len(), 1);
        assert_eq!(selection.metrics.len(), 1);
    }

    #[test]
    fn test_longest_keeps_deepest_path() {
        let (layout, metrics) = fixture(&[27, 6]);
        let selection = PathSelector::new(SelectionPolicy::Longest(1)).apply(&layout, &metrics);

        // 27 has the longest trajectory of the two; its whole path survives.
        assert_eq!(selection.selected, vec![big(27), big(1)]);
        assert_eq!(
            selection.layout.len() as u32,
            metrics.path_length(&big(27)).unwrap() + 1
        );
        assert!(selection.layout.find(&big(6)).is_none());
        assert_connected(&selection.layout);
    }

    #[test]
    fn test_least_traversed_ties_break_by_value() {
        let (layout, metrics) = fixture(&[5, 32]);
        // 5 and 32 are the only leaves, both weight 1.
        let selection = PathSelector::new(SelectionPolicy::LeastTraversed(1)).apply(&layout, &metrics);
        assert_eq!(selection.selected, vec![big(5), big(1)]);
        assert!(selection.layout.find(&big(32)).is_none());
        assert!(selection.layout.find(&big(16)).is_some());
        assert_connected(&selection.layout);
    }

    #[test]
    fn test_furthest_distance_preserved() {
        let (layout, metrics) = fixture(&[27, 6, 7]);
        let selection = PathSelector::new(SelectionPolicy::MostTraversed(3)).apply(&layout, &metrics);
        assert_eq!(selection.metrics.furthest_distance(), metrics.furthest_distance());
        for value in selection.layout.values() {
            assert!(selection.metrics.contains(value));
        }
        assert_eq!(selection.metrics.len(), selection.layout.len());
    }

    #[test]
    fn test_positions_unchanged() {
        let (layout, metrics) = fixture(&[27]);
        let selection = PathSelector::new(SelectionPolicy::Longest(1)).apply(&layout, &metrics);
        for node in selection.layout.nodes() {
            let original = layout.node_for(&node.value).unwrap();
            assert_eq!(node.x, original.x);
            assert_eq!(node.y, original.y);
        }
    }

    #[test]
    fn test_random_is_seeded() {
        let (layout, metrics) = fixture(&[27, 31, 41]);
        let policy = SelectionPolicy::Random {
            count: 5,
            seed: Some(7),
        };
        let a = PathSelector::new(policy).apply(&layout, &metrics);
        let b = PathSelector::new(policy).apply(&layout, &metrics);
        assert_eq!(a.selected, b.selected);
        assert!(a.selected.len() == 5 || a.selected.len() == 6);
        assert_connected(&a.layout);
    }

    #[test]
    fn test_count_larger_than_tree() {
        let (layout, metrics) = fixture(&[6]);
        let selection = PathSelector::new(SelectionPolicy::Longest(1000)).apply(&layout, &metrics);
        assert_eq!(selection.layout.len(), layout.len());
    }

    #[test]
    fn test_policy_resolution() {
        assert_eq!(SelectionConfig::default().policy().unwrap(), None);

        let config = SelectionConfig {
            least_traversed: Some(4),
            ..Default::default()
        };
        assert_eq!(config.policy().unwrap(), Some(SelectionPolicy::LeastTraversed(4)));

        let config = SelectionConfig {
            random: Some(3),
            seed: Some(11),
            ..Default::default()
        };
        assert_eq!(
            config.policy().unwrap(),
            Some(SelectionPolicy::Random {
                count: 3,
                seed: Some(11)
            })
        );
    }

    #[test]
    fn test_multiple_policies_rejected() {
        let config = SelectionConfig {
            longest: Some(2),
            random: Some(3),
            ..Default::default()
        };
        let err = config.policy().unwrap_err();
        assert!(matches!(err, CollatzError::Configuration { field: "selection", .. }));
        assert!(err.to_string().contains("selection.longest"), "{err}");
    }

    #[test]
    fn test_zero_count_rejected() {
        let config = SelectionConfig {
            most_traversed: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            config.policy(),
            Err(CollatzError::Configuration { field: "selection.most_traversed", .. })
        ));
    }

    #[test]
    fn test_seed_without_random_rejected() {
        let seed_only = SelectionConfig {
            seed: Some(3),
            ..Default::default()
        };
        assert!(matches!(
            seed_only.policy(),
            Err(CollatzError::Configuration { field: "selection.seed", .. })
        ));

        let with_longest = SelectionConfig {
            longest: Some(2),
            seed: Some(3),
            ..Default::default()
        };
        assert!(matches!(
            with_longest.policy(),
            Err(CollatzError::Configuration { field: "selection.seed", .. })
        ));
    }
}
