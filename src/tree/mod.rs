//! The canonical Collatz predecessor tree.
//!
//! This module owns the only mutable structure in the crate. Trajectories
//! are merged into a petgraph StableGraph rooted at 1; every later stage
//! reads it and builds its own output.

mod builder;
mod nested;
mod node;

pub use builder::{CollatzGraph, CollatzTreeBuilder};
pub use nested::NestedNode;
pub use node::{ChildSlot, CollatzNode, Trajectory, next_value, parse_value, predecessors};

pub(crate) use node::decimal;
