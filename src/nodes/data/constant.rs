//! Value node: a single editable number fed to other nodes

use crate::constants::node_types;
use crate::nodes::property::NodeProperty;
use crate::nodes::{Node, NodeCategory, NodeFactory, NodeMetadata};

/// Numeric literal node with one output `V`
#[derive(Default)]
pub struct ValueNodeFactory;

impl NodeFactory for ValueNodeFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            node_types::VALUE,
            "Value",
            NodeCategory::Data,
            "Outputs a number set by hand",
        )
    }

    fn create() -> Node {
        Node::new(node_types::VALUE, "Value").with_property(NodeProperty::output("V", 0.0).editable(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{NodeGroup, NodeStatus};

    #[test]
    fn test_value_node_output() {
        let node = ValueNodeFactory::create();
        assert_eq!(node.type_name, "Value");
        assert_eq!(node.properties.len(), 1);
        let v = &node.properties[0];
        assert!(v.allow_output());
        assert!(v.is_editable);
        assert_eq!(v.local_data().unwrap().as_real(), Some(0.0));
    }

    #[test]
    fn test_value_node_is_always_ok() {
        let mut group = NodeGroup::new("root");
        let key = group.add_node(ValueNodeFactory::create());
        group.node_mut(key).unwrap().set_property("V", 3.5);
        assert_eq!(group.status(key), NodeStatus::Ok);
        assert_eq!(group.update(key), NodeStatus::Ok);
    }
}
