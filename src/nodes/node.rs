//! Node types and core node functionality

use std::rc::Rc;

use glam::DVec2;

use super::execution_engine::Timestamp;
use super::graph::NodeGroup;
use super::hooks::{DefaultBehavior, NodeBehavior};
use super::property::NodeProperty;
use super::style::NodeStyle;
use super::value::{SharedValue, Value};

/// Type of node - regular node or a group containing its own graph
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Regular node, all work done by its behavior
    Regular,
    /// Group node wrapping a sub-graph
    Group(Box<NodeGroup>),
}

/// A single node of a graph
#[derive(Debug, Clone)]
pub struct Node {
    /// Stable id, unique within the owning group
    pub id: String,
    /// Display name
    pub name: String,
    /// Factory type tag
    pub type_name: String,
    pub properties: Vec<NodeProperty>,
    pub position: DVec2,
    /// Layout computed, not author set
    pub width: f64,
    pub height: f64,
    /// Expanded width remembered while collapsed
    pub fullwidth: f64,
    pub collapsed: bool,
    pub deletable: bool,
    pub modtime: Timestamp,
    pub style: Option<Rc<NodeStyle>>,
    pub kind: NodeKind,
    behavior: Box<dyn NodeBehavior>,
}

impl Node {
    /// Creates a new node with no properties and a pass-through behavior
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            type_name: type_name.into(),
            properties: Vec::new(),
            position: DVec2::ZERO,
            width: 0.0,
            height: 0.0,
            fullwidth: 0.0,
            collapsed: false,
            deletable: true,
            modtime: Timestamp::EPOCH,
            style: None,
            kind: NodeKind::Regular,
            behavior: Box::new(DefaultBehavior),
        }
    }

    /// Creates a group node owning `group`
    pub fn new_group(type_name: impl Into<String>, name: impl Into<String>, group: NodeGroup) -> Self {
        let mut node = Self::new(type_name, name);
        node.kind = NodeKind::Group(Box::new(group));
        node
    }

    pub fn with_behavior(mut self, behavior: impl NodeBehavior + 'static) -> Self {
        self.behavior = Box::new(behavior);
        self
    }

    pub fn with_property(mut self, property: NodeProperty) -> Self {
        self.add_property(property);
        self
    }

    /// Append a property. Names are not checked for duplicates.
    pub fn add_property(&mut self, property: NodeProperty) -> usize {
        self.properties.push(property);
        self.properties.len() - 1
    }

    /// First property called `name`
    pub fn find_property(&self, name: &str) -> Option<&NodeProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn find_property_mut(&mut self, name: &str) -> Option<&mut NodeProperty> {
        self.properties.iter_mut().find(|p| p.name == name)
    }

    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }

    /// Replace the value of property `name`, stamping it with a fresh time.
    /// Returns false for an unknown name.
    pub fn set_property(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.find_property_mut(name) {
            Some(prop) => {
                prop.set_data(value.into());
                prop.modtime = Timestamp::now();
                true
            }
            None => false,
        }
    }

    /// Like [`Node::set_property`] but shares an existing value
    pub fn share_property(&mut self, name: &str, value: SharedValue) -> bool {
        match self.find_property_mut(name) {
            Some(prop) => {
                prop.share_data(value);
                prop.modtime = Timestamp::now();
                true
            }
            None => false,
        }
    }

    pub fn behavior(&self) -> &dyn NodeBehavior {
        self.behavior.as_ref()
    }

    pub fn behavior_mut(&mut self) -> &mut dyn NodeBehavior {
        self.behavior.as_mut()
    }

    /// Split borrow of behavior and properties for an update pass
    pub(crate) fn parts_mut(&mut self) -> (&mut dyn NodeBehavior, &mut [NodeProperty]) {
        (self.behavior.as_mut(), &mut self.properties)
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group(_))
    }

    pub fn group(&self) -> Option<&NodeGroup> {
        match &self.kind {
            NodeKind::Group(g) => Some(g),
            NodeKind::Regular => None,
        }
    }

    pub fn group_mut(&mut self) -> Option<&mut NodeGroup> {
        match &mut self.kind {
            NodeKind::Group(g) => Some(g),
            NodeKind::Regular => None,
        }
    }

    /// Install a shared style and recompute layout
    pub fn install_style(&mut self, style: Rc<NodeStyle>) {
        self.style = Some(style);
        self.wrap();
    }

    /// Copy of this node with the same kind, values, style and geometry but
    /// no connections and no id. Group nodes copy their whole sub-graph.
    pub fn duplicate(&self) -> Node {
        Node {
            id: String::new(),
            properties: self.properties.iter().map(NodeProperty::duplicate).collect(),
            modtime: Timestamp::EPOCH,
            ..self.clone()
        }
    }

    /// Whether any input of this node currently has a producer
    pub fn has_connected_inputs(&self) -> bool {
        self.properties.iter().any(|p| p.is_input() && p.is_connected() != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::hooks::{NodeInputs, NodeOutputs};
    use crate::nodes::execution_engine::NodeStatus;

    #[derive(Debug, Clone)]
    struct Doubler;

    impl NodeBehavior for Doubler {
        fn update(&mut self, inputs: &NodeInputs, outputs: &mut NodeOutputs<'_>) -> NodeStatus {
            let v = inputs.real("In").unwrap_or(0.0);
            outputs.set("Out", v * 2.0);
            NodeStatus::Ok
        }

        fn clone_box(&self) -> Box<dyn NodeBehavior> {
            Box::new(self.clone())
        }
    }

    fn doubler() -> Node {
        Node::new("Doubler", "Doubler")
            .with_behavior(Doubler)
            .with_property(NodeProperty::input("In", true, 1.0))
            .with_property(NodeProperty::output("Out", 0.0))
    }

    #[test]
    fn test_find_and_set_property() {
        let mut node = doubler();
        assert_eq!(node.property_index("Out"), Some(1));
        assert!(node.find_property("Missing").is_none());

        assert!(node.set_property("In", 4.0));
        assert!(!node.set_property("Missing", 4.0));
        let prop = node.find_property("In").unwrap();
        assert_eq!(prop.local_data().unwrap().as_real(), Some(4.0));
        assert!(prop.modtime > Timestamp::EPOCH);
    }

    #[test]
    fn test_duplicate_keeps_behavior() {
        let mut node = doubler();
        node.id = "Doubler1".into();
        node.position = DVec2::new(10.0, 5.0);

        let mut copy = node.duplicate();
        assert!(copy.id.is_empty());
        assert_eq!(copy.position, node.position);
        assert_eq!(copy.type_name, "Doubler");

        let inputs = NodeInputs::new(vec![("In".into(), Some(Value::Real(3.0).shared()))]);
        let (behavior, props) = copy.parts_mut();
        let mut outputs = NodeOutputs::new(props, Timestamp::now());
        behavior.update(&inputs, &mut outputs);
        assert_eq!(copy.find_property("Out").unwrap().local_data().unwrap().as_real(), Some(6.0));
    }
}
