//! Layout algorithms for the Collatz tree.
//!
//! This module turns the canonical tree into positions: the angular engine
//! places every node, and the path selector prunes a placed tree down to a
//! connected subset without moving anything.

pub mod angular;
pub mod selection;

pub use angular::{AngularLayoutConfig, AngularLayoutEngine, Bounds, LayoutNode, LayoutTree};
pub use selection::{PathSelector, Selection, SelectionConfig, SelectionPolicy};
