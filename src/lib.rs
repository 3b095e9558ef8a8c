//! Collatz Tree - WASM Module
//!
//! This module builds the predecessor tree of the Collatz (3n + 1) recurrence
//! and computes a deterministic planar embedding of it for visualization. It
//! is compiled to WebAssembly and exposes a JavaScript-friendly API via
//! wasm-bindgen; the same pipeline is available as a plain Rust library.
//!
//! # Architecture
//!
//! - `tree`: Canonical tree using petgraph's StableGraph, deduplicating trajectories
//! - `metrics`: Depth and subtree leaf weight per node
//! - `layout`: Turn-based angular layout and path selection
//! - `style`: Color, stroke width and radius per node, memoized in a concurrent map
//! - `scene`: The full pipeline, producing render-ready nodes
//! - `spatial`: R-tree spatial indexing for O(log n) hit testing
//!
//! Data flows one way: tree → metrics → layout → selection → style → renderer.
//! Drawing itself happens outside this crate.

use js_sys::{Array, Float64Array};
use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod scene;
pub mod spatial;
pub mod style;
pub mod tree;

pub use config::RenderConfig;
pub use error::CollatzError;
pub use metrics::TreeMetrics;
pub use scene::{Scene, SceneNode};
pub use tree::CollatzTreeBuilder;

use spatial::LayoutIndex;
use tree::NestedNode;

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(err: impl std::fmt::Display) -> JsError {
    JsError::new(&err.to_string())
}

/// Counts cross the JS boundary as `u32`; larger values saturate.
fn count_to_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn decode_config(config: JsValue) -> Result<RenderConfig, JsError> {
    if config.is_undefined() || config.is_null() {
        return Ok(RenderConfig::default());
    }
    serde_wasm_bindgen::from_value(config).map_err(js_error)
}

/// Main entry point for the Collatz tree.
///
/// Wraps the canonical tree and the hit index of the last computed scene.
#[wasm_bindgen]
pub struct CollatzTreeWasm {
    tree: CollatzTreeBuilder,
    last_scene: Option<(LayoutIndex, Vec<String>)>,
}

#[wasm_bindgen]
impl CollatzTreeWasm {
    /// Create a tree holding only the root.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            tree: CollatzTreeBuilder::new(),
            last_scene: None,
        }
    }

    /// Create a tree with pre-allocated capacity.
    #[wasm_bindgen(js_name = withCapacity)]
    pub fn with_capacity(node_capacity: usize) -> Self {
        Self {
            tree: CollatzTreeBuilder::with_capacity(node_capacity),
            last_scene: None,
        }
    }

    // =========================================================================
    // Tree Operations
    // =========================================================================

    /// Add a start value given as a decimal string.
    ///
    /// Returns the number of nodes added.
    #[wasm_bindgen(js_name = addValue)]
    pub fn add_value(&mut self, value: &str) -> Result<u32, JsError> {
        let added = self.tree.add_str(value).map_err(js_error)?;
        Ok(count_to_u32(added))
    }

    /// Add every start value in `start..=end`.
    ///
    /// Returns the number of nodes added.
    #[wasm_bindgen(js_name = addRange)]
    pub fn add_range(&mut self, start: u32, end: u32) -> Result<u32, JsError> {
        let added = self
            .tree
            .add_range(u64::from(start), u64::from(end))
            .map_err(js_error)?;
        Ok(count_to_u32(added))
    }

    /// Get the number of nodes in the tree, root included.
    #[wasm_bindgen(js_name = nodeCount)]
    pub fn node_count(&self) -> u32 {
        count_to_u32(self.tree.len())
    }

    /// Check whether a decimal value is in the tree.
    pub fn contains(&self, value: &str) -> bool {
        tree::parse_value(value).is_ok_and(|v| self.tree.contains(&v))
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Export the tree as nested `{ value, left, right }` objects.
    #[wasm_bindgen(js_name = toNested)]
    pub fn to_nested(&self) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(&self.tree.to_nested()).map_err(js_error)
    }

    /// Rebuild a tree from nested `{ value, left, right }` objects.
    #[wasm_bindgen(js_name = fromNested)]
    pub fn from_nested(nested: JsValue) -> Result<CollatzTreeWasm, JsError> {
        let nested: NestedNode = serde_wasm_bindgen::from_value(nested).map_err(js_error)?;
        let tree = CollatzTreeBuilder::from_nested(&nested).map_err(js_error)?;
        Ok(Self {
            tree,
            last_scene: None,
        })
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Compute a styled, laid-out scene.
    ///
    /// `config` is an optional render configuration object; missing fields
    /// take their defaults. Returns `{ nodes, edges, bounds, canvasWidth,
    /// canvasHeight, furthestDistance }`.
    #[wasm_bindgen(js_name = computeScene)]
    pub fn compute_scene(&mut self, config: JsValue) -> Result<JsValue, JsError> {
        let scene = self.prepare(config)?;
        serde_wasm_bindgen::to_value(&scene).map_err(js_error)
    }

    /// Compute node centers only, as `[x0, y0, x1, y1, ...]` in pre-order.
    #[wasm_bindgen(js_name = computePositions)]
    pub fn compute_positions(&mut self, config: JsValue) -> Result<Float64Array, JsError> {
        let scene = self.prepare(config)?;
        Ok(Float64Array::from(&scene.positions()[..]))
    }

    // =========================================================================
    // Spatial Queries
    // =========================================================================

    /// Find the value of the node nearest to a point in the last scene.
    #[wasm_bindgen(js_name = findNearestValue)]
    pub fn find_nearest_value(&self, x: f64, y: f64) -> Option<String> {
        let (index, values) = self.last_scene.as_ref()?;
        index.nearest(x, y).map(|slot| values[slot].clone())
    }

    /// Find the nearest value within a maximum distance in the last scene.
    #[wasm_bindgen(js_name = findNearestValueWithin)]
    pub fn find_nearest_value_within(&self, x: f64, y: f64, max_distance: f64) -> Option<String> {
        let (index, values) = self.last_scene.as_ref()?;
        index
            .nearest_within(x, y, max_distance)
            .map(|slot| values[slot].clone())
    }

    /// Find all values whose node lies within a rectangle in the last scene.
    #[wasm_bindgen(js_name = findValuesInRect)]
    pub fn find_values_in_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Array {
        self.values_where(|index| index.in_rect(min_x, min_y, max_x, max_y))
            .iter()
            .map(|value| JsValue::from_str(value))
            .collect()
    }

    /// Find all values whose node lies within `radius` of a point in the last
    /// scene.
    #[wasm_bindgen(js_name = findValuesInRadius)]
    pub fn find_values_in_radius(&self, x: f64, y: f64, radius: f64) -> Array {
        self.values_where(|index| index.in_radius(x, y, radius))
            .iter()
            .map(|value| JsValue::from_str(value))
            .collect()
    }
}

impl CollatzTreeWasm {
    fn prepare(&mut self, config: JsValue) -> Result<Scene, JsError> {
        let config = decode_config(config)?;
        self.prepare_scene(&config).map_err(js_error)
    }

    /// Run the pipeline and remember its hit index for spatial queries.
    fn prepare_scene(&mut self, config: &RenderConfig) -> error::Result<Scene> {
        let scene = Scene::prepare(&self.tree, config)?;
        let values = scene.nodes.iter().map(|n| n.value.to_string()).collect();
        self.last_scene = Some((scene.hit_index(), values));
        Ok(scene)
    }

    /// Values of the last scene at the slots returned by `query`.
    fn values_where<F>(&self, query: F) -> Vec<String>
    where
        F: FnOnce(&LayoutIndex) -> Vec<usize>,
    {
        self.last_scene
            .as_ref()
            .map(|(index, values)| {
                query(index)
                    .into_iter()
                    .map(|slot| values[slot].clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for CollatzTreeWasm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use layout::{AngularLayoutEngine, PathSelector, SelectionPolicy};
    use num_bigint::BigUint;
    use style::{StyleConfig, VisualPropertyMapper};

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    /// Test the full pipeline stage by stage: builder → metrics → layout →
    /// selection → mapper, without wasm_bindgen JS types.
    #[test]
    fn test_builder_to_styled_selection() {
        let mut tree = CollatzTreeBuilder::new();
        let added = tree.add_range(1, 1000).unwrap();
        assert_eq!(added + 1, tree.len());

        let metrics = TreeMetrics::compute(&tree);
        assert_eq!(metrics.len(), tree.len());

        let layout = AngularLayoutEngine::with_defaults().compute(&tree, &metrics);
        assert_eq!(layout.len(), tree.len());
        assert_eq!(layout.edges().count(), tree.len() - 1);

        let selection = PathSelector::new(SelectionPolicy::Longest(5)).apply(&layout, &metrics);
        assert!(selection.layout.len() < layout.len());
        assert_eq!(selection.metrics.furthest_distance(), metrics.furthest_distance());

        let mut mapper = VisualPropertyMapper::new(StyleConfig::default());
        mapper.prepare(selection.metrics.clone());
        assert_eq!(mapper.cached(), selection.layout.len());
        for node in selection.layout.nodes() {
            let props = mapper.properties(&node.value).unwrap();
            assert!(props.stroke_width >= style::MIN_LINE_WIDTH);
            assert!(props.radius >= style::MIN_NODE_RADIUS);
        }
    }

    /// The deepest start value below 1000 is 871 (178 steps).
    #[test]
    fn test_longest_selection_finds_871() {
        let mut tree = CollatzTreeBuilder::new();
        tree.add_range(1, 999).unwrap();
        let metrics = TreeMetrics::compute(&tree);
        assert_eq!(metrics.path_length(&big(871)), Some(178));

        let layout = AngularLayoutEngine::with_defaults().compute(&tree, &metrics);
        let selection = PathSelector::new(SelectionPolicy::Longest(1)).apply(&layout, &metrics);
        assert_eq!(selection.selected[0], big(871));
        assert_eq!(selection.layout.len(), 179);
    }

    /// Rebuilding from the nested form gives the same scene.
    #[test]
    fn test_nested_round_trip_preserves_scene() {
        let mut tree = CollatzTreeBuilder::new();
        tree.extend_values([27u64, 97, 31, 5, 32].into_iter().map(big)).unwrap();

        let rebuilt = CollatzTreeBuilder::from_nested(&tree.to_nested()).unwrap();
        let config = RenderConfig::default();
        let a = Scene::prepare(&tree, &config).unwrap();
        let b = Scene::prepare(&rebuilt, &config).unwrap();
        assert_eq!(a, b);
    }

    /// Insertion order only changes slot order, never metrics.
    #[test]
    fn test_insertion_order_only_affects_slot_order() {
        let mut forward = CollatzTreeBuilder::new();
        forward.extend_values((1..=200u64).map(big)).unwrap();
        let mut backward = CollatzTreeBuilder::new();
        backward.extend_values((1..=200u64).rev().map(big)).unwrap();

        assert_eq!(forward.len(), backward.len());
        assert_eq!(TreeMetrics::compute(&forward), TreeMetrics::compute(&backward));
    }

    #[test]
    fn test_wrapper_spatial_queries() {
        let mut wasm = CollatzTreeWasm::new();
        wasm.tree.add(big(9)).unwrap();
        let scene = wasm.prepare_scene(&RenderConfig::default()).unwrap();
        let nine = scene.nodes.iter().find(|n| n.value == big(9)).unwrap();

        assert_eq!(wasm.find_nearest_value(nine.x, nine.y).as_deref(), Some("9"));
        assert_eq!(
            wasm.find_nearest_value_within(nine.x + 1e6, nine.y, 1.0),
            None
        );

        let near = wasm.values_where(|index| index.in_radius(nine.x, nine.y, 1e-6));
        assert_eq!(near, vec!["9".to_string()]);
        let everything = wasm.values_where(|index| index.in_radius(nine.x, nine.y, 1e9));
        assert_eq!(everything.len(), scene.nodes.len());
    }

    #[test]
    fn test_counts_saturate_at_u32_max() {
        assert_eq!(count_to_u32(0), 0);
        assert_eq!(count_to_u32(u32::MAX as usize), u32::MAX);
        if let Ok(huge) = usize::try_from(u64::from(u32::MAX) + 1) {
            assert_eq!(count_to_u32(huge), u32::MAX);
        }
    }

    #[test]
    fn test_wrapper_tree_operations() {
        let wasm = CollatzTreeWasm::new();
        assert_eq!(wasm.node_count(), 1);
        assert!(wasm.contains("1"));
        assert!(!wasm.contains("0"));
        assert!(!wasm.contains("not a number"));
        assert!(wasm.find_nearest_value(0.0, 0.0).is_none());
    }
}
