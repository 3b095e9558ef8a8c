//! Per-node visual properties: color, fill, stroke width and radius.
//!
//! Color follows depth (`path_length / furthest_distance`), width and radius
//! follow traversal weight (`traversal_weight / max_traversal_weight`). Both
//! ratios are taken on a log scale and then raised to `1 / impact`, with the
//! impact floored at 0.1.
//!
//! Every property is a pure function of (value, metrics, config), so results
//! are memoized in a `DashMap` keyed by value. Writes are idempotent: two
//! workers computing the same value store the same result. With the
//! `parallel` feature the cache is populated with rayon.

use dashmap::DashMap;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CollatzError, Result};
use crate::metrics::TreeMetrics;

/// Thinnest stroke, also used when thickness impact is zero.
pub const MIN_LINE_WIDTH: f64 = 1.0;
/// Smallest node radius.
pub const MIN_NODE_RADIUS: f64 = 1.5;
/// Node radius as a fraction of the node's stroke width.
pub const NODE_RADIUS_FACTOR: f64 = 0.75;
/// Impacts below this are treated as this.
pub const IMPACT_FLOOR: f64 = 0.1;
/// Thickness impacts within this of zero disable width scaling.
pub const THICKNESS_EPSILON: f64 = 1e-6;
/// How far node fills are mixed toward white.
pub const FILL_LIGHTEN: f64 = 0.35;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Build a color from channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear blend toward `other`; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| {
            let v = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
            v.round().clamp(0.0, 255.0) as u8
        };
        Self::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    /// Blend toward white by `amount`.
    pub fn lighten(self, amount: f64) -> Self {
        self.lerp(Self::new(255, 255, 255), amount)
    }

    /// `#rrggbb` form for SVG and canvas renderers.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Styling knobs consumed by the mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleConfig {
    /// Exponent shaping width/radius by traversal weight. Zero disables it.
    pub thickness_impact: f64,
    /// Exponent shaping color by depth. Must be positive.
    pub color_impact: f64,
    /// Widest stroke, reached by the most traversed node.
    pub max_line_width: f64,
    /// Color at depth 0, and the fallback for shallow trees.
    pub start_color: Rgb,
    /// Color at the furthest depth.
    pub end_color: Rgb,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            thickness_impact: 1.0,
            color_impact: 1.0,
            max_line_width: 12.0,
            start_color: Rgb::new(0x1b, 0x3a, 0x6b),
            end_color: Rgb::new(0xf2, 0xb7, 0x05),
        }
    }
}

impl StyleConfig {
    /// Check every field, naming the first offending one.
    pub fn validate(&self) -> Result<()> {
        if !(self.color_impact.is_finite() && self.color_impact > 0.0) {
            return Err(CollatzError::config(
                "style.color_impact",
                format!("must be > 0, got {}", self.color_impact),
            ));
        }
        if !(self.thickness_impact.is_finite() && self.thickness_impact >= 0.0) {
            return Err(CollatzError::config(
                "style.thickness_impact",
                format!("must be >= 0, got {}", self.thickness_impact),
            ));
        }
        if !(self.max_line_width.is_finite() && self.max_line_width > 0.0) {
            return Err(CollatzError::config(
                "style.max_line_width",
                format!("must be > 0, got {}", self.max_line_width),
            ));
        }
        Ok(())
    }
}

/// Derived drawing attributes for one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualProperties {
    /// Edge color.
    pub color: Rgb,
    /// Node fill color.
    pub fill: Rgb,
    /// Edge stroke width.
    pub stroke_width: f64,
    /// Node radius.
    pub radius: f64,
}

/// Maps one metrics snapshot to visual properties, memoizing per value.
///
/// The mapper owns the snapshot it was prepared with, so every cached entry
/// was computed from the metrics it is served against.
#[derive(Debug)]
pub struct VisualPropertyMapper {
    config: StyleConfig,
    metrics: TreeMetrics,
    cache: DashMap<BigUint, VisualProperties>,
}

impl VisualPropertyMapper {
    /// Create a mapper with an empty snapshot and cache.
    pub fn new(config: StyleConfig) -> Self {
        Self {
            config,
            metrics: TreeMetrics::default(),
            cache: DashMap::new(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &StyleConfig {
        &self.config
    }

    /// The snapshot the cache belongs to.
    pub fn metrics(&self) -> &TreeMetrics {
        &self.metrics
    }

    /// Number of cached entries.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Replace the snapshot, clear the cache and fill it for every value.
    ///
    /// Call once per export.
    pub fn prepare(&mut self, metrics: TreeMetrics) {
        self.metrics = metrics;
        self.cache.clear();

        let this = &*self;
        let entries: Vec<(&BigUint, u32, u64)> = this.metrics.iter().collect();

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            entries.par_iter().for_each(|&(value, depth, weight)| {
                this.cache
                    .entry(value.clone())
                    .or_insert_with(|| this.compute(depth, weight));
            });
        }
        #[cfg(not(feature = "parallel"))]
        {
            for &(value, depth, weight) in &entries {
                this.cache
                    .entry(value.clone())
                    .or_insert_with(|| this.compute(depth, weight));
            }
        }

        debug!(entries = this.cache.len(), "populated visual property cache");
    }

    /// Properties for `value`, computed on first request. `None` when the
    /// value is not covered by the prepared snapshot.
    pub fn properties(&self, value: &BigUint) -> Option<VisualProperties> {
        if let Some(cached) = self.cache.get(value) {
            return Some(*cached);
        }
        let depth = self.metrics.path_length(value)?;
        let weight = self.metrics.traversal_weight(value)?;
        let props = *self
            .cache
            .entry(value.clone())
            .or_insert_with(|| self.compute(depth, weight));
        Some(props)
    }

    fn compute(&self, depth: u32, weight: u64) -> VisualProperties {
        let color = self.color_for(depth, self.metrics.furthest_distance());
        let stroke_width = self.stroke_width_for(weight, self.metrics.max_traversal_weight());
        VisualProperties {
            color,
            fill: color.lighten(FILL_LIGHTEN),
            stroke_width,
            radius: self.radius_for(stroke_width),
        }
    }

    /// Color for a node `depth` edges below the root.
    pub fn color_for(&self, depth: u32, furthest_distance: u32) -> Rgb {
        if furthest_distance <= 1 {
            return self.config.start_color;
        }
        let ratio = log_ratio(f64::from(depth), f64::from(furthest_distance));
        let t = ratio.powf(1.0 / self.config.color_impact.max(IMPACT_FLOOR));
        self.config.start_color.lerp(self.config.end_color, t)
    }

    /// Stroke width for a node with `weight` leaves below it.
    pub fn stroke_width_for(&self, weight: u64, max_weight: u64) -> f64 {
        let min_width = MIN_LINE_WIDTH.min(self.config.max_line_width);
        if self.config.thickness_impact.abs() < THICKNESS_EPSILON || max_weight <= 1 {
            return min_width;
        }
        let ratio = log_ratio(weight as f64, max_weight as f64);
        let t = ratio.powf(1.0 / self.config.thickness_impact.max(IMPACT_FLOOR));
        min_width + t * (self.config.max_line_width - min_width)
    }

    /// Node radius matching a stroke width.
    pub fn radius_for(&self, stroke_width: f64) -> f64 {
        if self.config.thickness_impact.abs() < THICKNESS_EPSILON {
            return MIN_NODE_RADIUS;
        }
        (stroke_width * NODE_RADIUS_FACTOR).max(MIN_NODE_RADIUS)
    }
}

/// `ln(1 + value) / ln(1 + max)`, clamped to `[0, 1]`.
fn log_ratio(value: f64, max: f64) -> f64 {
    ((1.0 + value).ln() / (1.0 + max).ln()).clamp(0.0, 1.0)
}
