//! Shared visual style of nodes
//!
//! Only the font metrics and slot radius take part in layout; colors are
//! carried for whatever renders the graph.

use serde::{Deserialize, Serialize};

use crate::constants::{font, layout};
use crate::nodes::value::Color;

/// Style shared by every node of a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStyle {
    /// Height of one line of text
    pub text_height: f64,
    /// Advance of one glyph; text extent is `chars * glyph_width`
    pub glyph_width: f64,
    /// Connector radius as a portion of text height
    pub slot_radius: f64,
    pub background: Color,
    pub foreground: Color,
    pub label_background: Color,
    pub selected_border: Color,
    pub connection: Color,
    pub error_border: Color,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            text_height: font::DEFAULT_TEXT_HEIGHT,
            glyph_width: font::DEFAULT_GLYPH_WIDTH,
            slot_radius: layout::DEFAULT_SLOT_RADIUS,
            background: Color::rgba(0.75, 0.75, 0.75, 1.0),
            foreground: Color::BLACK,
            label_background: Color::rgba(0.5, 0.5, 0.5, 1.0),
            selected_border: Color::rgba(1.0, 1.0, 0.0, 1.0),
            connection: Color::rgba(0.5, 0.5, 0.5, 1.0),
            error_border: Color::rgba(1.0, 0.0, 0.0, 1.0),
        }
    }
}

impl NodeStyle {
    /// Width of `text` under the monospace model
    pub fn extent(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.glyph_width
    }
}
