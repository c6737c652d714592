//! Color node: a color literal

use crate::constants::node_types;
use crate::nodes::property::NodeProperty;
use crate::nodes::value::Color;
use crate::nodes::{Node, NodeCategory, NodeFactory, NodeMetadata};

/// Color literal node with one output `Color`, white by default
#[derive(Default)]
pub struct ColorNodeFactory;

impl NodeFactory for ColorNodeFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            node_types::COLOR,
            "Color",
            NodeCategory::Data,
            "Outputs a color set by hand",
        )
    }

    fn create() -> Node {
        Node::new(node_types::COLOR, "Color")
            .with_property(NodeProperty::output("Color", Color::WHITE).editable(true))
    }
}
