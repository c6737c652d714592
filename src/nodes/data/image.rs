//! NewImage node: describes an image to be created from its dimensions,
//! channel count, depth and fill color

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::constants::node_types;
use crate::nodes::constraint::ValueConstraint;
use crate::nodes::execution_engine::NodeStatus;
use crate::nodes::hooks::{NodeBehavior, NodeInputs, NodeOutputs};
use crate::nodes::property::NodeProperty;
use crate::nodes::value::{Color, ColorDepth, EnumDef, EnumValue, ImageValue, Value, ValueKind};
use crate::nodes::{Node, NodeCategory, NodeFactory, NodeMetadata};

static IMAGE_DEPTH_DEF: Lazy<Arc<EnumDef>> = Lazy::new(|| {
    let def = ColorDepth::ALL
        .into_iter()
        .enumerate()
        .fold(EnumDef::new("ColorDepth"), |def, (i, depth)| {
            def.with_field(depth.id(), depth.label(), i as i32)
        });
    Arc::new(def)
});

/// Shared definition of the `Depth` enum
pub fn image_depth_def() -> Arc<EnumDef> {
    IMAGE_DEPTH_DEF.clone()
}

/// NewImage node factory
#[derive(Default)]
pub struct NewImageNodeFactory;

impl NodeFactory for NewImageNodeFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            node_types::NEW_IMAGE,
            "New Image",
            NodeCategory::Image,
            "Describes a new image of the given size, depth and color",
        )
    }

    fn create() -> Node {
        let integer = [ValueKind::Integer, ValueKind::Real];
        let dimension = ValueConstraint::parse_range("[1 .. ]").unwrap_or_default().integer();
        let channels = ValueConstraint::parse_range("[1 .. 4]").unwrap_or_default().integer();

        Node::new(node_types::NEW_IMAGE, "New Image")
            .with_behavior(NewImageBehavior)
            .with_property(
                NodeProperty::input("Width", true, Value::Integer(100))
                    .with_types(&integer)
                    .with_constraint(dimension.clone()),
            )
            .with_property(
                NodeProperty::input("Height", true, Value::Integer(100))
                    .with_types(&integer)
                    .with_constraint(dimension),
            )
            .with_property(
                NodeProperty::input("Channels", true, Value::Integer(4))
                    .with_types(&integer)
                    .with_constraint(channels),
            )
            .with_property(
                NodeProperty::input("Depth", true, EnumValue::new(image_depth_def(), 0))
                    .with_types(&[ValueKind::Enum]),
            )
            .with_property(
                NodeProperty::input("Initial Color", true, Color::WHITE).with_types(&[ValueKind::Color]),
            )
            .with_property(NodeProperty::output("Image", ImageValue::default()))
    }
}

/// Builds the `Image` output from the inputs
#[derive(Debug, Clone, Default)]
pub struct NewImageBehavior;

impl NewImageBehavior {
    fn describe(inputs: &NodeInputs) -> Option<ImageValue> {
        let width = inputs.integer("Width")?;
        let height = inputs.integer("Height")?;
        let channels = inputs.integer("Channels")?;
        if width <= 0 || height <= 0 || !(1..=4).contains(&channels) {
            return None;
        }
        let depth = inputs
            .get("Depth")
            .and_then(Value::as_enum)
            .and_then(EnumValue::id)
            .and_then(ColorDepth::from_id)
            .unwrap_or(ColorDepth::D8);
        let color = inputs
            .get("Initial Color")
            .and_then(Value::as_color)
            .unwrap_or(Color::WHITE);

        Some(ImageValue {
            width,
            height,
            channels,
            depth,
            color,
        })
    }
}

impl NodeBehavior for NewImageBehavior {
    fn update(&mut self, inputs: &NodeInputs, outputs: &mut NodeOutputs<'_>) -> NodeStatus {
        match Self::describe(inputs) {
            Some(image) => {
                outputs.set("Image", image);
                NodeStatus::Ok
            }
            None => NodeStatus::Error,
        }
    }

    fn status(&self, inputs: &NodeInputs) -> NodeStatus {
        match Self::describe(inputs) {
            Some(_) => NodeStatus::Ok,
            None => NodeStatus::Error,
        }
    }

    fn clone_box(&self) -> Box<dyn NodeBehavior> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::NodeGroup;

    #[test]
    fn test_new_image_describes_inputs() {
        let mut group = NodeGroup::new("root");
        let key = group.add_node(NewImageNodeFactory::create());
        let node = group.node_mut(key).unwrap();
        node.set_property("Width", Value::Integer(640));
        node.set_property("Depth", EnumValue::new(image_depth_def(), 4));

        assert_eq!(group.update(key), NodeStatus::Ok);
        let image = group.node(key).unwrap().find_property("Image").unwrap();
        let image = image.local_data().unwrap().as_image().copied().unwrap();
        assert_eq!(image.width, 640);
        assert_eq!(image.height, 100);
        assert_eq!(image.depth, ColorDepth::D32f);
    }

    #[test]
    fn test_new_image_rejects_bad_channels() {
        let mut group = NodeGroup::new("root");
        let key = group.add_node(NewImageNodeFactory::create());
        group.node_mut(key).unwrap().set_property("Channels", Value::Integer(5));
        assert_eq!(group.update(key), NodeStatus::Error);
        assert_eq!(group.status(key), NodeStatus::Error);
    }

    #[test]
    fn test_channel_edits_are_clamped() {
        let mut node = NewImageNodeFactory::create();
        let prop = node.find_property_mut("Channels").unwrap();
        assert!(prop.edit(Value::Integer(7)));
        assert_eq!(prop.local_data().unwrap().as_integer(), Some(4));
    }
}
