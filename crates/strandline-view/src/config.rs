//! Layout configuration.
//!
//! All distances are in layout units (one unit is one pixel at zoom 1).
//! Every field has a default, so a configuration file only needs to list the
//! values it changes.

use serde::{Deserialize, Serialize};

use crate::error::ViewError;

/// Geometry and merge constants used by strand building and layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Height of one row of tokens.
    pub line_height: f64,
    /// Vertical gap added before and after every item.
    pub line_margin: f64,
    /// Width of one production-stack column.
    pub stack_spacing: f64,
    /// Extra indentation, in stack columns, before an item's tokens.
    pub indent: f64,
    /// Vertical gap between a guard and the code it guards.
    pub guard_gap: f64,
    /// Width of the trailing "append here" mark of a list.
    pub tail_width: f64,
    /// Estimated advance of one character of token text.
    pub char_width: f64,
    /// Distance from the bottom of a row to the text baseline.
    pub text_bump: f64,
    /// Radius of a branch-mismatch marker.
    pub marker_radius: f64,
    /// Width of the header mark drawn before a lambda or conditional.
    pub header_width: f64,
    /// Height reserved for the module title.
    pub title_height: f64,
    /// Items wider than this (in characters, one extra per token) are never
    /// merged.
    pub max_merge_width: usize,
    /// Minimum share of the combined arity that must cancel for two items to
    /// merge.
    pub merge_complexity: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            line_height: 22.0,
            line_margin: 6.0,
            stack_spacing: 10.0,
            indent: 1.3,
            guard_gap: 10.0,
            tail_width: 10.0,
            char_width: 10.0,
            text_bump: 4.0,
            marker_radius: 6.0,
            header_width: 10.0,
            title_height: 32.0,
            max_merge_width: 20,
            merge_complexity: 0.5,
        }
    }
}

impl LayoutConfig {
    /// Parses a (possibly partial) JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ViewError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Estimated rendered width of a token label, including the trailing
    /// space.
    pub fn token_width(&self, label: &str) -> f64 {
        (label.chars().count() + 1) as f64 * self.char_width
    }
}
