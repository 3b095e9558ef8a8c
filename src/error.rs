//! Error types shared by the tree builder, configuration and persistence layers.
//!
//! Degenerate scale inputs (a shallow tree, uniform traversal weights) are not
//! errors: the layout and style stages fall back to fixed defaults instead.

/// Errors produced by the Collatz tree pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollatzError {
    /// A node already holds two children and a third predecessor was about to
    /// be attached. Indicates broken trajectory arithmetic or bookkeeping.
    #[error("structural invariant violated: node {parent} already has two children, cannot attach {child}")]
    StructuralInvariant {
        /// Value of the node whose child slots are full.
        parent: String,
        /// Value that was about to be attached.
        child: String,
    },

    /// A configuration field is outside its valid range, or more than one
    /// selection policy was requested.
    #[error("invalid configuration for `{field}`: {reason}")]
    Configuration {
        /// Dotted path of the offending field, e.g. `style.color_impact`.
        field: &'static str,
        /// Human readable explanation.
        reason: String,
    },

    /// A start value that cannot seed a trajectory.
    #[error("invalid start value `{value}`: {reason}")]
    InvalidValue {
        /// The rejected input, as given.
        value: String,
        /// Human readable explanation.
        reason: &'static str,
    },

    /// A nested tree handed in for reconstruction is not a Collatz
    /// predecessor tree.
    #[error("invalid nested tree: {reason}")]
    InvalidTree {
        /// Human readable explanation.
        reason: String,
    },
}

impl CollatzError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_tree(reason: impl Into<String>) -> Self {
        Self::InvalidTree {
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CollatzError>;
