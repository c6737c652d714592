//! Error types shared by the node graph, the attribute format and file handling.

use std::path::PathBuf;

use crate::attribute::AttributeError;

/// Errors produced by graph edits, loading and saving.
///
/// Domain problems inside a node (division by zero and friends) are not
/// errors here; they surface as [`crate::nodes::NodeStatus::Error`].
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),
    #[error("node not found in this group")]
    UnknownNode,
    #[error("node {node} has no property {property}")]
    UnknownProperty { node: String, property: String },
    #[error("connection not found in this group")]
    UnknownConnection,
    #[error("property {0} does not allow outgoing links")]
    NotAnOutput(String),
    #[error("property {0} does not allow incoming links")]
    NotAnInput(String),
    #[error("property {property} does not accept {kind} values")]
    TypeMismatch { property: String, kind: String },
    #[error("connecting {from} to {to} would create a cycle")]
    WouldCycle { from: String, to: String },
    #[error("connection is missing an endpoint")]
    HalfConnection,
    #[error("node {0} is not a group")]
    NotAGroup(String),
    #[error("node {0} cannot be deleted")]
    NotDeletable(String),
    #[error("malformed node file: {0}")]
    Attribute(#[from] AttributeError),
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
