//! Per-kind node behavior
//!
//! Every node carries a boxed [`NodeBehavior`]. The update engine hands it an
//! owned snapshot of the node's input values and mutable access to the
//! node's own properties only, so a behavior can never reach into the graph
//! while a propagation pass is walking it.

use std::fmt::Debug;

use crate::nodes::execution_engine::{NodeStatus, Timestamp};
use crate::nodes::graph::Side;
use crate::nodes::property::NodeProperty;
use crate::nodes::value::{SharedValue, Value};

/// Input values of one node, resolved through connections
#[derive(Debug, Clone, Default)]
pub struct NodeInputs {
    values: Vec<(String, Option<SharedValue>)>,
}

impl NodeInputs {
    pub fn new(values: Vec<(String, Option<SharedValue>)>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn shared(&self, name: &str) -> Option<SharedValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.clone())
    }

    pub fn real(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_real)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_integer)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&SharedValue>)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_ref()))
    }
}

/// Write access to a node's outputs during one update pass.
///
/// Every write stamps the property with the pass time.
pub struct NodeOutputs<'a> {
    properties: &'a mut [NodeProperty],
    now: Timestamp,
}

impl<'a> NodeOutputs<'a> {
    pub fn new(properties: &'a mut [NodeProperty], now: Timestamp) -> Self {
        Self { properties, now }
    }

    /// Store `value` on the non-input property `name`
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> bool {
        let now = self.now;
        match self.slot(name) {
            Some(prop) => {
                prop.set_data(value.into());
                prop.modtime = now;
                true
            }
            None => false,
        }
    }

    pub fn share(&mut self, name: &str, value: SharedValue) -> bool {
        let now = self.now;
        match self.slot(name) {
            Some(prop) => {
                prop.share_data(value);
                prop.modtime = now;
                true
            }
            None => false,
        }
    }

    /// Current stored value of an output, for behaviors that adjust in place
    pub fn current(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|p| !p.is_input() && p.name == name)
            .and_then(|p| p.local_data().map(|v| v.as_ref()))
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    fn slot(&mut self, name: &str) -> Option<&mut NodeProperty> {
        self.properties
            .iter_mut()
            .find(|p| !p.is_input() && p.name == name)
    }
}

/// Trait for node-kind specific update logic and lifecycle notifications
pub trait NodeBehavior: Debug {
    /// Recompute outputs from inputs. Returning [`NodeStatus::Error`] leaves
    /// downstream nodes alone for this pass.
    fn update(&mut self, _inputs: &NodeInputs, _outputs: &mut NodeOutputs<'_>) -> NodeStatus {
        // Default: nothing to recompute
        NodeStatus::Ok
    }

    /// Kind-specific status on top of the timestamp check, e.g. domain errors
    fn status(&self, _inputs: &NodeInputs) -> NodeStatus {
        NodeStatus::Ok
    }

    /// A connection was attached to `property`. Returns whether the node
    /// wants to be redrawn.
    fn connected(&mut self, _property: &str) -> bool {
        false
    }

    /// A connection was removed from `property`, which was its `side` end
    fn disconnected(&mut self, _property: &str, _side: Side) -> bool {
        false
    }

    /// Whether files may add properties this node does not define
    fn accepts_dynamic_properties(&self) -> bool {
        false
    }

    /// Clone the behavior for node duplication
    fn clone_box(&self) -> Box<dyn NodeBehavior>;
}

impl Clone for Box<dyn NodeBehavior> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Behavior for nodes that only hold and pass on data
#[derive(Debug, Clone, Default)]
pub struct DefaultBehavior;

impl NodeBehavior for DefaultBehavior {
    fn clone_box(&self) -> Box<dyn NodeBehavior> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_lookup() {
        let inputs = NodeInputs::new(vec![
            ("A".into(), Some(Value::Integer(3).shared())),
            ("B".into(), None),
        ]);
        assert_eq!(inputs.real("A"), Some(3.0));
        assert_eq!(inputs.integer("A"), Some(3));
        assert!(inputs.get("B").is_none());
        assert!(inputs.get("C").is_none());
        assert_eq!(inputs.iter().count(), 2);
    }

    #[test]
    fn test_outputs_skip_inputs_and_stamp() {
        let mut props = vec![
            NodeProperty::input("A", true, 1.0),
            NodeProperty::output("Result", 0.0),
        ];
        let now = Timestamp::now();
        let mut outputs = NodeOutputs::new(&mut props, now);
        assert!(!outputs.set("A", 5.0));
        assert!(outputs.set("Result", 5.0));
        assert_eq!(outputs.current("Result"), Some(&Value::Real(5.0)));

        assert_eq!(props[0].modtime, Timestamp::EPOCH);
        assert_eq!(props[1].modtime, now);
    }
}
