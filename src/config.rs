//! Editor settings stored as JSON under the user config directory

use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::constants::file::{CONFIG_DIR, CONFIG_FILE, DEFAULT_NODES_FILE};
use crate::error::{GraphError, Result};
use crate::nodes::NodeStyle;

/// Settings for graphs created by an editor session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeEditorConfig {
    /// Style installed on new groups
    pub style: NodeStyle,
    /// File name used by the quick save and load actions
    pub nodes_file: String,
}

impl Default for NodeEditorConfig {
    fn default() -> Self {
        Self {
            style: NodeStyle::default(),
            nodes_file: DEFAULT_NODES_FILE.to_string(),
        }
    }
}

impl NodeEditorConfig {
    /// `<config dir>/laidout/nodes.json`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Settings from [`Self::default_path`]. A missing file gives the
    /// defaults; a broken one is logged and also gives the defaults.
    pub fn load_or_default() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from_or_default(&path),
            None => Self::default(),
        }
    }

    fn load_from_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!("No node settings at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring node settings: {}", e);
                Self::default()
            }
        }
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        let io_error = |source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(io_error)
    }
}
