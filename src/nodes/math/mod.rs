//! Math node: one operation picked from an enum, applied to inputs A and B
//!
//! - mod.rs: metadata, factory and update behavior
//! - functions.rs: the operations and their domains

pub mod functions;

pub use functions::{compute, math_op_def, MathOp};

use crate::constants::node_types;
use crate::nodes::execution_engine::NodeStatus;
use crate::nodes::hooks::{NodeBehavior, NodeInputs, NodeOutputs};
use crate::nodes::property::NodeProperty;
use crate::nodes::value::{Value, ValueKind};
use crate::nodes::{Node, NodeCategory, NodeFactory, NodeMetadata};

const NUMERIC: [ValueKind; 3] = [ValueKind::Real, ValueKind::Integer, ValueKind::Boolean];

/// Math node factory
#[derive(Default)]
pub struct MathNodeFactory;

impl NodeFactory for MathNodeFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            node_types::MATH,
            "Math",
            NodeCategory::Math,
            "Applies the selected operation to A and B",
        )
    }

    fn create() -> Node {
        Node::new(node_types::MATH, "Math")
            .with_behavior(MathBehavior)
            .with_property(
                NodeProperty::input("Op", false, MathOp::Add.enum_value())
                    .with_types(&[ValueKind::Enum]),
            )
            .with_property(NodeProperty::input("A", true, 0.0).with_types(&NUMERIC))
            .with_property(NodeProperty::input("B", true, 0.0).with_types(&NUMERIC))
            .with_property(NodeProperty::output("Result", 0.0))
    }
}

/// Reads `Op`, `A` and `B`, writes `Result`
#[derive(Debug, Clone, Default)]
pub struct MathBehavior;

impl MathBehavior {
    fn evaluate(inputs: &NodeInputs) -> Option<f64> {
        let op = inputs
            .get("Op")
            .and_then(Value::as_enum)
            .and_then(|e| e.value())
            .and_then(MathOp::from_value)?;
        let a = inputs.real("A").unwrap_or(0.0);
        let b = inputs.real("B").unwrap_or(0.0);
        compute(op, a, b)
    }
}

impl NodeBehavior for MathBehavior {
    fn update(&mut self, inputs: &NodeInputs, outputs: &mut NodeOutputs<'_>) -> NodeStatus {
        match Self::evaluate(inputs) {
            Some(result) => {
                outputs.set("Result", result);
                NodeStatus::Ok
            }
            None => NodeStatus::Error,
        }
    }

    fn status(&self, inputs: &NodeInputs) -> NodeStatus {
        match Self::evaluate(inputs) {
            Some(_) => NodeStatus::Ok,
            None => NodeStatus::Error,
        }
    }

    fn clone_box(&self) -> Box<dyn NodeBehavior> {
        Box::new(self.clone())
    }
}
