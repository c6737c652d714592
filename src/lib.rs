//! Laidout node graph library
//!
//! Typed nodes connected property to property, an update engine that
//! pushes changes downstream, and an indentation-scoped attribute text
//! format for saving graphs.

pub mod attribute;
pub mod config;
pub mod constants;
pub mod error;
pub mod file_manager;
pub mod nodes;

// Re-export commonly used types
pub use attribute::{Attribute, AttributeError};
pub use config::NodeEditorConfig;
pub use error::{GraphError, Result};
pub use file_manager::FileManager;
pub use nodes::{
    Endpoint, LoadReport, Node, NodeGroup, NodeKey, NodeProperty, NodeRegistry, NodeStatus, Value,
};
