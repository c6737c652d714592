//! File management for node groups
//!
//! Handles saving, loading, and file state for the attribute-text format.

use std::path::{Path, PathBuf};

use log::info;

use crate::constants::file::DEFAULT_NODES_FILE;
use crate::error::{GraphError, Result};
use crate::nodes::{LoadReport, NodeGroup, NodeRegistry};

/// Tracks the file a graph came from and whether it changed since
#[derive(Debug, Default)]
pub struct FileManager {
    /// Current file path (None if unsaved/new file)
    current_file_path: Option<PathBuf>,
    /// Whether the graph has been modified since last save
    is_modified: bool,
}

impl FileManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_file_path(&self) -> Option<&PathBuf> {
        self.current_file_path.as_ref()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.is_modified
    }

    pub fn mark_modified(&mut self) {
        self.is_modified = true;
    }

    pub fn mark_saved(&mut self) {
        self.is_modified = false;
    }

    /// Title-bar name: the file name, starred when modified
    pub fn get_file_display_name(&self) -> String {
        let name = match &self.current_file_path {
            Some(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("Unknown")
                .to_string(),
            None => "Untitled".to_string(),
        };
        if self.is_modified {
            format!("{}*", name)
        } else {
            name
        }
    }

    pub fn new_file(&mut self) {
        self.current_file_path = None;
        self.is_modified = false;
    }

    /// Path the quick save and load actions use, next to `dir`
    pub fn default_path(dir: &Path) -> PathBuf {
        dir.join(DEFAULT_NODES_FILE)
    }

    /// Write `group` as attribute text behind a dated header comment
    pub fn save_to_file(&mut self, file_path: &Path, group: &NodeGroup) -> Result<()> {
        let content = format!(
            "# Laidout nodes, saved {}\n{}",
            chrono::Utc::now().to_rfc3339(),
            group.to_text()
        );
        std::fs::write(file_path, content).map_err(|source| GraphError::Io {
            path: file_path.to_path_buf(),
            source,
        })?;

        info!("Saved nodes to {}", file_path.display());
        self.current_file_path = Some(file_path.to_path_buf());
        self.is_modified = false;
        Ok(())
    }

    /// Read a group from `file_path`. On error nothing is returned and the
    /// manager keeps its previous state, so the caller's graph stays as it was.
    pub fn load_from_file(
        &mut self,
        file_path: &Path,
        registry: &NodeRegistry,
    ) -> Result<(NodeGroup, LoadReport)> {
        let content = std::fs::read_to_string(file_path).map_err(|source| GraphError::Io {
            path: file_path.to_path_buf(),
            source,
        })?;
        let (group, report) = NodeGroup::from_text(&content, registry)?;

        info!(
            "Loaded {} nodes from {} ({} warnings)",
            group.len(),
            file_path.display(),
            report.warnings.len()
        );
        self.current_file_path = Some(file_path.to_path_buf());
        self.is_modified = false;
        Ok((group, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let mut manager = FileManager::new();
        assert_eq!(manager.get_file_display_name(), "Untitled");
        manager.mark_modified();
        assert_eq!(manager.get_file_display_name(), "Untitled*");
        manager.new_file();
        assert!(!manager.has_unsaved_changes());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = FileManager::default_path(dir.path());
        let registry = NodeRegistry::default();
        let mut group = NodeGroup::new("root");
        group.create_node(&registry, "Value").unwrap();

        let mut manager = FileManager::new();
        manager.mark_modified();
        manager.save_to_file(&path, &group).unwrap();
        assert!(!manager.has_unsaved_changes());
        assert_eq!(manager.get_file_display_name(), "nodes-TEMP.nodes");

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Laidout nodes, saved "));

        let (loaded, report) = manager.load_from_file(&path, &registry).unwrap();
        assert!(report.is_clean());
        assert_eq!(loaded.to_text(), group.to_text());
    }

    #[test]
    fn test_failed_load_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let registry = NodeRegistry::default();
        let mut manager = FileManager::new();

        let missing = dir.path().join("missing.nodes");
        assert!(matches!(
            manager.load_from_file(&missing, &registry),
            Err(GraphError::Io { .. })
        ));

        let broken = dir.path().join("broken.nodes");
        std::fs::write(&broken, "label \"unterminated\n").unwrap();
        assert!(matches!(
            manager.load_from_file(&broken, &registry),
            Err(GraphError::Attribute(_))
        ));
        assert!(manager.current_file_path().is_none());
    }
}
