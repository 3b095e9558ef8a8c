//! Scene assembly: the full pipeline from tree to render-ready nodes.
//!
//! `Scene::prepare` validates the configuration, computes metrics, lays the
//! tree out, applies the optional selection and maps visual properties. The
//! result carries everything an external renderer needs to issue its line,
//! circle and label primitives; nothing here draws.

use num_bigint::BigUint;
use serde::Serialize;
use tracing::debug;

use crate::config::RenderConfig;
use crate::error::Result;
use crate::layout::{AngularLayoutEngine, Bounds, LayoutTree, PathSelector};
use crate::metrics::TreeMetrics;
use crate::spatial::LayoutIndex;
use crate::style::{VisualProperties, VisualPropertyMapper};
use crate::tree::CollatzTreeBuilder;

/// One render-ready node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNode {
    /// Node value, as a decimal string on the wire.
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
    /// Parent index in [`Scene::nodes`], `None` for the root.
    pub parent: Option<usize>,
    /// Depth below the root.
    pub path_length: u32,
    /// Leaves below this node in the full tree.
    pub traversal_weight: u64,
    /// Edge color, `#rrggbb`.
    pub color: String,
    /// Node fill color, `#rrggbb`.
    pub fill: String,
    /// Edge stroke width.
    pub stroke_width: f64,
    /// Node radius.
    pub radius: f64,
}

/// A laid-out, styled and possibly pruned tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Nodes in pre-order; the root is first.
    pub nodes: Vec<SceneNode>,
    /// `[parent, child]` index pairs into `nodes`.
    pub edges: Vec<[usize; 2]>,
    /// Bounds of node centers.
    pub bounds: Option<Bounds>,
    /// Canvas width: right-most center plus margin.
    pub canvas_width: f64,
    /// Canvas height: top-most center plus margin.
    pub canvas_height: f64,
    /// Depth of the full tree, kept even when a selection prunes it.
    pub furthest_distance: u32,
}

impl Scene {
    /// Run the whole pipeline over `tree`.
    pub fn prepare(tree: &CollatzTreeBuilder, config: &RenderConfig) -> Result<Self> {
        let policy = config.validate()?;

        let metrics = TreeMetrics::compute(tree);
        let layout = AngularLayoutEngine::new(config.layout.clone()).compute(tree, &metrics);

        let (layout, metrics) = match policy {
            Some(policy) => {
                let selection = PathSelector::new(policy).apply(&layout, &metrics);
                (selection.layout, selection.metrics)
            }
            None => (layout, metrics),
        };

        let mut mapper = VisualPropertyMapper::new(config.style.clone());
        mapper.prepare(metrics);

        let scene = Self::assemble(&layout, &mapper, config.layout.margin);
        debug!(
            nodes = scene.nodes.len(),
            canvas_width = scene.canvas_width,
            canvas_height = scene.canvas_height,
            "prepared scene"
        );
        Ok(scene)
    }

    /// Combine a layout with the metrics and properties of a prepared mapper.
    pub fn assemble(layout: &LayoutTree, mapper: &VisualPropertyMapper, margin: f64) -> Self {
        let metrics = mapper.metrics();
        let fallback = VisualProperties {
            color: mapper.config().start_color,
            fill: mapper.config().start_color,
            stroke_width: 0.0,
            radius: 0.0,
        };

        let nodes: Vec<SceneNode> = layout
            .nodes()
            .iter()
            .map(|node| {
                let props = mapper.properties(&node.value).unwrap_or(fallback);
                SceneNode {
                    value: node.value.clone(),
                    x: node.x,
                    y: node.y,
                    width: node.width,
                    height: node.height,
                    parent: node.parent,
                    path_length: metrics.path_length(&node.value).unwrap_or(0),
                    traversal_weight: metrics.traversal_weight(&node.value).unwrap_or(0),
                    color: props.color.to_hex(),
                    fill: props.fill.to_hex(),
                    stroke_width: props.stroke_width,
                    radius: props.radius,
                }
            })
            .collect();

        let edges = layout.edges().map(|(parent, child)| [parent, child]).collect();
        let bounds = layout.bounds();
        let (canvas_width, canvas_height) = bounds
            .map(|b| (b.max_x + margin, b.max_y + margin))
            .unwrap_or((2.0 * margin, 2.0 * margin));

        Self {
            nodes,
            edges,
            bounds,
            canvas_width,
            canvas_height,
            furthest_distance: metrics.furthest_distance(),
        }
    }

    /// Interleaved `[x0, y0, x1, y1, ...]` centers in node order.
    pub fn positions(&self) -> Vec<f64> {
        self.nodes.iter().flat_map(|node| [node.x, node.y]).collect()
    }

    /// Spatial index over the node centers.
    pub fn hit_index(&self) -> LayoutIndex {
        LayoutIndex::from_points(
            self.nodes
                .iter()
                .enumerate()
                .map(|(slot, node)| (slot, node.x, node.y)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollatzError;

    fn tree_of(values: &[u64]) -> CollatzTreeBuilder {
        let mut tree = CollatzTreeBuilder::new();
        for &v in values {
            tree.add(BigUint::from(v)).unwrap();
        }
        tree
    }

    #[test]
    fn test_full_scene() {
        let tree = tree_of(&[27]);
        let scene = Scene::prepare(&tree, &RenderConfig::default()).unwrap();

        assert_eq!(scene.nodes.len(), tree.len());
        assert_eq!(scene.edges.len(), tree.len() - 1);
        assert_eq!(scene.nodes[0].value, BigUint::from(1u32));
        assert!(scene.nodes.iter().all(|n| n.color.starts_with('#') && n.color.len() == 7));
        assert_eq!(scene.positions().len(), 2 * scene.nodes.len());

        let bounds = scene.bounds.unwrap();
        assert!((scene.canvas_width - (bounds.max_x + 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_selected_scene_keeps_scale() {
        let tree = tree_of(&[27, 6]);
        let full = Scene::prepare(&tree, &RenderConfig::default()).unwrap();

        let mut config = RenderConfig::default();
        config.selection.least_traversed = Some(1);
        let pruned = Scene::prepare(&tree, &config).unwrap();

        assert!(pruned.nodes.len() < full.nodes.len());
        assert_eq!(pruned.furthest_distance, full.furthest_distance);

        // Styling of a surviving node matches the unfiltered rendering.
        for node in &pruned.nodes {
            let same = full.nodes.iter().find(|n| n.value == node.value).unwrap();
            assert_eq!(node.color, same.color);
            assert_eq!(node.stroke_width, same.stroke_width);
            assert_eq!((node.x, node.y), (same.x, same.y));
        }
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let tree = tree_of(&[7]);
        let mut config = RenderConfig::default();
        config.selection.most_traversed = Some(2);
        config.selection.longest = Some(2);
        assert!(matches!(
            Scene::prepare(&tree, &config),
            Err(CollatzError::Configuration { field: "selection", .. })
        ));
    }

    #[test]
    fn test_hit_index() {
        let tree = tree_of(&[9]);
        let scene = Scene::prepare(&tree, &RenderConfig::default()).unwrap();
        let index = scene.hit_index();
        let nine = scene
            .nodes
            .iter()
            .position(|n| n.value == BigUint::from(9u32))
            .unwrap();
        assert_eq!(index.nearest(scene.nodes[nine].x, scene.nodes[nine].y), Some(nine));
    }
}
