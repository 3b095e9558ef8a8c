//! Render configuration: layout, style and selection settings in one place.
//!
//! Field names are camelCase on the wire so a JS object can be handed straight
//! to the WASM surface. Missing fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::{AngularLayoutConfig, SelectionConfig, SelectionPolicy};
use crate::style::StyleConfig;

/// Everything the pipeline needs after the tree has been built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    /// Angular layout settings.
    pub layout: AngularLayoutConfig,
    /// Color and width settings.
    pub style: StyleConfig,
    /// Optional subset selection.
    pub selection: SelectionConfig,
}

impl RenderConfig {
    /// Validate every section and resolve the selection policy.
    ///
    /// Runs before any tree work so misconfiguration surfaces with the
    /// offending field named and nothing computed.
    pub fn validate(&self) -> Result<Option<SelectionPolicy>> {
        self.layout.validate()?;
        self.style.validate()?;
        self.selection.policy()
    }
}
