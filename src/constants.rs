//! Default values for node layout, styling and persistence
//!
//! Centralized location for the numbers the layout and file code fall back on

/// Font metrics used when no configuration overrides them
pub mod font {
    /// Height of one line of label text
    pub const DEFAULT_TEXT_HEIGHT: f64 = 12.0;

    /// Average advance of one glyph, for the monospace extent model
    pub const DEFAULT_GLYPH_WIDTH: f64 = 7.0;
}

/// Node layout constants
pub mod layout {
    /// Row height as a multiple of text height
    pub const ROW_HEIGHT_FACTOR: f64 = 1.5;

    /// Extra width reserved for numeric and color editors, in text heights
    pub const NUMBER_EDITOR_WIDTH: f64 = 3.0;

    /// Padding added to the widest row, in text heights
    pub const NODE_PADDING: f64 = 3.0;

    /// Connector radius as a portion of text height
    pub const DEFAULT_SLOT_RADIUS: f64 = 0.25;

    /// Offset applied to duplicated nodes so they do not sit on the original
    pub const DUPLICATE_OFFSET: [f64; 2] = [20.0, 20.0];

    /// Margin kept around nodes when fitting the view, as a portion of the
    /// smaller viewport side
    pub const FIT_MARGIN: f64 = 0.05;
}

/// Persistence constants
pub mod file {
    /// File used by the quick save and load actions
    pub const DEFAULT_NODES_FILE: &str = "nodes-TEMP.nodes";

    /// Directory under the user config dir holding editor settings
    pub const CONFIG_DIR: &str = "laidout";

    /// Settings file name inside [`CONFIG_DIR`]
    pub const CONFIG_FILE: &str = "nodes.json";
}

/// Type names of the built-in node kinds
pub mod node_types {
    pub const VALUE: &str = "Value";
    pub const COLOR: &str = "Color";
    pub const NEW_IMAGE: &str = "NewImage";
    pub const MATH: &str = "Math";
    pub const GROUP: &str = "Group";
    pub const GROUP_INPUTS: &str = "GroupInputs";
    pub const GROUP_OUTPUTS: &str = "GroupOutputs";
}
