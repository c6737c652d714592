//! Node system - graph data structures, update engine and built-in nodes

// Core node system modules
pub mod value;
pub mod constraint;
pub mod style;
pub mod property;
pub mod hooks;
pub mod node;
pub mod layout;
pub mod graph;
pub mod execution_engine;
pub mod factory;
pub mod grouping;
pub mod serialize;

// Built-in node implementations
pub mod math;
pub mod data;

// Re-export core types
pub use graph::{Connection, ConnectionKey, Endpoint, NodeGroup, NodeKey, Side};
pub use node::{Node, NodeKind};
pub use property::{NodeProperty, PropertyDirection};
pub use value::{Color, ColorDepth, EnumDef, EnumValue, ImageValue, SharedValue, Value, ValueKind};
pub use constraint::ValueConstraint;
pub use layout::CollapseState;
pub use style::NodeStyle;

// Re-export factory types
pub use factory::{NodeCategory, NodeFactory, NodeMetadata, NodeRegistry};

// Re-export behavior hooks
pub use hooks::{NodeBehavior, NodeInputs, NodeOutputs};

// Re-export execution engine types
pub use execution_engine::{NodeStatus, Timestamp};

pub use serialize::LoadReport;
