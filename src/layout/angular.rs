//! Turn-based angular layout for the Collatz tree.
//!
//! Every edge leaves its parent at the parent's heading plus a turn that
//! depends only on the child's parity: even values turn by `left_angle`, odd
//! values by `right_angle`. Edge length is uniform for a given tree and shrinks
//! as the tree gets deeper, which keeps large trees on a bounded canvas.
//!
//! # Coordinate system
//!
//! Angles are in degrees, 0° points along +x and angles grow counter-clockwise,
//! with +y pointing up. The root starts at the origin heading 90° (straight
//! up). After placement the whole figure is shifted so that its minimum x and
//! minimum y both equal `margin`, anchoring it to a bottom-left origin.
//! Renderers with a y-down raster flip y against the canvas height.
//!
//! # Algorithm Overview
//!
//! 1. **Scale:** `edge_length_scale / ln(furthest_distance + 1)`, or
//!    `fallback_edge_length` when the tree is at most one edge deep.
//! 2. **Placement (pre-order):** place a node, then push its children with
//!    their own heading. An explicit stack replaces recursion.
//! 3. **Anchor:** one pass for bounds, then one exact offset applied to every
//!    node so edges stay continuous.

use std::collections::HashMap;

use num_bigint::BigUint;
use num_integer::Integer;
use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CollatzError, Result};
use crate::metrics::TreeMetrics;
use crate::tree::CollatzTreeBuilder;

/// Default turn for even children, in degrees.
pub const DEFAULT_LEFT_ANGLE: f64 = -8.65;
/// Default turn for odd children, in degrees.
pub const DEFAULT_RIGHT_ANGLE: f64 = 16.0;
/// Heading of the root, in degrees.
pub const DEFAULT_START_HEADING: f64 = 90.0;

/// Configuration for the angular layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AngularLayoutConfig {
    /// Turn applied to even children, in degrees.
    pub left_angle: f64,
    /// Turn applied to odd children, in degrees.
    pub right_angle: f64,
    /// Heading the root's outgoing edges turn from, in degrees.
    pub start_heading: f64,
    /// Numerator of the depth-scaled edge length.
    pub edge_length_scale: f64,
    /// Edge length for trees at most one edge deep.
    pub fallback_edge_length: f64,
    /// Width and height of each node's box.
    pub node_size: f64,
    /// Distance between the figure and the canvas origin on both axes.
    pub margin: f64,
}

impl Default for AngularLayoutConfig {
    fn default() -> Self {
        Self {
            left_angle: DEFAULT_LEFT_ANGLE,
            right_angle: DEFAULT_RIGHT_ANGLE,
            start_heading: DEFAULT_START_HEADING,
            edge_length_scale: 120.0,
            fallback_edge_length: 40.0,
            node_size: 8.0,
            margin: 10.0,
        }
    }
}

impl AngularLayoutConfig {
    /// Check every field, naming the first offending one.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("layout.left_angle", self.left_angle),
            ("layout.right_angle", self.right_angle),
            ("layout.start_heading", self.start_heading),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(CollatzError::config(field, format!("must be finite, got {value}")));
            }
        }

        let positive = [
            ("layout.edge_length_scale", self.edge_length_scale),
            ("layout.fallback_edge_length", self.fallback_edge_length),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CollatzError::config(field, format!("must be > 0, got {value}")));
            }
        }

        let non_negative = [
            ("layout.node_size", self.node_size),
            ("layout.margin", self.margin),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CollatzError::config(field, format!("must be >= 0, got {value}")));
            }
        }
        Ok(())
    }
}

/// A placed node. Mirrors one canonical tree node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    /// Value of the mirrored tree node.
    #[serde(serialize_with = "crate::tree::decimal::serialize")]
    pub value: BigUint,
    /// Center x.
    pub x: f64,
    /// Center y.
    pub y: f64,
    /// Box width.
    pub width: f64,
    /// Box height.
    pub height: f64,
    /// Parent index in the owning [`LayoutTree`], `None` for the root.
    pub parent: Option<usize>,
    /// Child indices in the source tree's slot order.
    pub children: Vec<usize>,
}

/// Axis-aligned bounds of node centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    /// Smallest x.
    pub min_x: f64,
    /// Smallest y.
    pub min_y: f64,
    /// Largest x.
    pub max_x: f64,
    /// Largest y.
    pub max_y: f64,
}

impl Bounds {
    /// Horizontal extent.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Vertical extent.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Positional tree stored as an arena.
///
/// Nodes are kept in pre-order: index 0 is the root and every parent precedes
/// its children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutTree {
    nodes: Vec<LayoutNode>,
    index: HashMap<BigUint, usize>,
}

impl LayoutTree {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Append a node and link it under its parent. Callers must push in
    /// pre-order.
    pub(crate) fn push(&mut self, node: LayoutNode) -> usize {
        let slot = self.nodes.len();
        if let Some(parent) = node.parent {
            self.nodes[parent].children.push(slot);
        }
        self.index.insert(node.value.clone(), slot);
        self.nodes.push(node);
        slot
    }

    /// The root node, if any.
    pub fn root(&self) -> Option<&LayoutNode> {
        self.nodes.first()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when there are no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at `slot`.
    pub fn get(&self, slot: usize) -> Option<&LayoutNode> {
        self.nodes.get(slot)
    }

    /// All nodes in pre-order.
    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    /// Slot holding `value`.
    pub fn find(&self, value: &BigUint) -> Option<usize> {
        self.index.get(value).copied()
    }

    /// Node holding `value`.
    pub fn node_for(&self, value: &BigUint) -> Option<&LayoutNode> {
        self.find(value).map(|slot| &self.nodes[slot])
    }

    /// Values in pre-order.
    pub fn values(&self) -> impl Iterator<Item = &BigUint> + '_ {
        self.nodes.iter().map(|node| &node.value)
    }

    /// `(parent, child)` slot pairs, one per edge.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(slot, node)| node.parent.map(|parent| (parent, slot)))
    }

    /// Bounds of all node centers, `None` when empty.
    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.nodes.first()?;
        let mut bounds = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for node in &self.nodes[1..] {
            bounds.min_x = bounds.min_x.min(node.x);
            bounds.min_y = bounds.min_y.min(node.y);
            bounds.max_x = bounds.max_x.max(node.x);
            bounds.max_y = bounds.max_y.max(node.y);
        }
        Some(bounds)
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        for node in &mut self.nodes {
            node.x += dx;
            node.y += dy;
        }
    }
}

/// Pending placement on the work stack.
struct Placement {
    node: NodeIndex,
    parent: Option<usize>,
    x: f64,
    y: f64,
    heading: f64,
}

/// The angular layout engine.
#[derive(Debug, Clone, Default)]
pub struct AngularLayoutEngine {
    config: AngularLayoutConfig,
}

impl AngularLayoutEngine {
    /// Create a layout engine with the given configuration.
    pub fn new(config: AngularLayoutConfig) -> Self {
        Self { config }
    }

    /// Create a layout engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(AngularLayoutConfig::default())
    }

    /// The active configuration.
    pub fn config(&self) -> &AngularLayoutConfig {
        &self.config
    }

    /// Uniform edge length for a tree whose deepest node is `furthest_distance`
    /// edges from the root.
    pub fn edge_length(&self, furthest_distance: u32) -> f64 {
        if furthest_distance <= 1 {
            return self.config.fallback_edge_length;
        }
        self.config.edge_length_scale / (f64::from(furthest_distance) + 1.0).ln()
    }

    /// Turn, in degrees, for an edge leading to `value`.
    pub fn turn_for(&self, value: &BigUint) -> f64 {
        if value.is_even() {
            self.config.left_angle
        } else {
            self.config.right_angle
        }
    }

    /// Lay out `tree`. `metrics` must describe the same tree revision.
    pub fn compute(&self, tree: &CollatzTreeBuilder, metrics: &TreeMetrics) -> LayoutTree {
        let length = self.edge_length(metrics.furthest_distance());
        let size = self.config.node_size;
        let mut layout = LayoutTree::with_capacity(tree.len());

        let mut stack = vec![Placement {
            node: tree.root(),
            parent: None,
            x: 0.0,
            y: 0.0,
            heading: self.config.start_heading,
        }];

        while let Some(placement) = stack.pop() {
            let slot = layout.push(LayoutNode {
                value: tree.value_of(placement.node).clone(),
                x: placement.x,
                y: placement.y,
                width: size,
                height: size,
                parent: placement.parent,
                children: Vec::new(),
            });

            // Reverse so the first slot is popped, and placed, first.
            let children: Vec<NodeIndex> = tree.ordered_children(placement.node).collect();
            for child in children.into_iter().rev() {
                let heading = placement.heading + self.turn_for(tree.value_of(child));
                let (sin, cos) = heading.to_radians().sin_cos();
                stack.push(Placement {
                    node: child,
                    parent: Some(slot),
                    x: placement.x + length * cos,
                    y: placement.y + length * sin,
                    heading,
                });
            }
        }

        if let Some(bounds) = layout.bounds() {
            layout.translate(self.config.margin - bounds.min_x, self.config.margin - bounds.min_y);
            debug!(
                nodes = layout.len(),
                edge_length = length,
                width = bounds.width(),
                height = bounds.height(),
                "computed angular layout"
            );
        }
        layout
    }
}
