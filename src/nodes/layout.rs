//! Node geometry: expanded and collapsed layouts and connector anchors
//!
//! Layout is a pure function of the node's properties and its installed
//! [`NodeStyle`](super::style::NodeStyle). Nodes without a style keep
//! their geometry and the wrap calls report `false`.

use glam::DVec2;

use crate::constants::layout::{NODE_PADDING, NUMBER_EDITOR_WIDTH, ROW_HEIGHT_FACTOR};
use crate::nodes::node::Node;
use crate::nodes::value::Value;

/// Requested collapse state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseState {
    Toggle,
    Expand,
    Collapse,
}

impl Node {
    /// Recompute bounds for the current collapse state
    pub fn wrap(&mut self) -> bool {
        if self.collapsed {
            self.wrap_collapsed()
        } else {
            self.wrap_full()
        }
    }

    /// Expanded layout: one row per property, inputs anchored on the left
    /// edge, everything else on the right.
    pub fn wrap_full(&mut self) -> bool {
        let Some(style) = self.style.clone() else {
            return false;
        };
        let th = style.text_height;
        let row = ROW_HEIGHT_FACTOR * th;

        let mut width = style.extent(&self.name);
        for prop in self.properties.iter_mut() {
            let mut w = style.extent(&prop.label);
            match prop.local_data().map(|v| v.as_ref()) {
                Some(value) => {
                    w += match value {
                        Value::Real(_) | Value::Integer(_) | Value::Color(_) => NUMBER_EDITOR_WIDTH * th,
                        Value::String(s) => th + style.extent(s),
                        Value::Enum(e) => e
                            .def
                            .fields
                            .iter()
                            .filter(|f| !f.label.trim().is_empty())
                            .map(|f| style.extent(f.label))
                            .fold(0.0, f64::max),
                        Value::Boolean(_) | Value::Image(_) => 0.0,
                    };
                    prop.height = row;
                }
                None => {
                    if prop.height == 0.0 {
                        prop.height = row;
                    }
                }
            }
            width = width.max(w);
        }

        width += NODE_PADDING * th;
        if self.fullwidth > width {
            width = self.fullwidth;
        }

        let mut y = row;
        for prop in self.properties.iter_mut() {
            prop.y = y;
            prop.width = width;
            y += prop.height;
        }
        self.width = width;
        self.height = y;
        self.update_link_positions();
        true
    }

    /// Collapsed layout: title only, with input anchors stacked on the left
    /// edge and output anchors on the right, spaced by the slot diameter.
    pub fn wrap_collapsed(&mut self) -> bool {
        let Some(style) = self.style.clone() else {
            return false;
        };
        let th = style.text_height;
        let slot = th * style.slot_radius;

        self.width = NODE_PADDING * th + style.extent(&self.name);
        self.height = ROW_HEIGHT_FACTOR * th;

        let num_in = self.properties.iter().filter(|p| p.allow_input()).count();
        let num_out = self.properties.iter().filter(|p| p.allow_output()).count();
        let most = num_in.max(num_out) as f64;
        let needed = th / 2.0 + most * 2.0 * slot;
        if self.height < needed {
            self.height = needed;
        }

        let mut in_y = self.height / 2.0 - num_in as f64 * slot;
        let mut out_y = self.height / 2.0 - num_out as f64 * slot;
        let width = self.width;
        for prop in self.properties.iter_mut() {
            if prop.allow_input() {
                prop.anchor = DVec2::new(0.0, in_y + slot);
                in_y += 2.0 * slot;
            } else if prop.allow_output() {
                prop.anchor = DVec2::new(width, out_y + slot);
                out_y += 2.0 * slot;
            }
        }
        true
    }

    /// Re-anchor connectors after a resize of an expanded node
    pub fn update_link_positions(&mut self) {
        let width = self.width;
        for prop in self.properties.iter_mut() {
            let x = if prop.is_input() { 0.0 } else { width };
            prop.anchor = DVec2::new(x, prop.y + prop.height / 2.0);
        }
    }

    /// Change collapse state, returning the resulting `collapsed` flag
    pub fn collapse(&mut self, state: CollapseState) -> bool {
        let want = match state {
            CollapseState::Toggle => !self.collapsed,
            CollapseState::Expand => false,
            CollapseState::Collapse => true,
        };
        if want && !self.collapsed {
            self.collapsed = true;
            self.fullwidth = self.width;
            self.wrap_collapsed();
        } else if !want && self.collapsed {
            self.collapsed = false;
            self.wrap();
        }
        self.collapsed
    }

    /// Anchor of property `index` in group coordinates
    pub fn anchor_position(&self, index: usize) -> Option<DVec2> {
        self.properties.get(index).map(|p| self.position + p.anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::property::NodeProperty;
    use crate::nodes::style::NodeStyle;
    use std::rc::Rc;

    fn sample() -> Node {
        let mut node = Node::new("Sample", "Sample")
            .with_property(NodeProperty::input("A", true, 1.0))
            .with_property(NodeProperty::input("Label", true, "hello"))
            .with_property(NodeProperty::output("Out", 0.0));
        node.install_style(Rc::new(NodeStyle::default()));
        node
    }

    #[test]
    fn test_wrap_without_style_fails() {
        let mut node = Node::new("Bare", "Bare");
        assert!(!node.wrap());
    }

    #[test]
    fn test_wrap_full_geometry() {
        let node = sample();
        let th = 12.0;
        // widest row: "Label" (5 glyphs) + th + "hello" (5 glyphs)
        let widest = 5.0 * 7.0 + th + 5.0 * 7.0;
        assert_eq!(node.width, widest + 3.0 * th);
        assert_eq!(node.height, 4.0 * 1.5 * th);

        let a = &node.properties[0];
        assert_eq!(a.y, 1.5 * th);
        assert_eq!(a.anchor, DVec2::new(0.0, 1.5 * th + 0.75 * th));
        let out = &node.properties[2];
        assert_eq!(out.anchor.x, node.width);
    }

    #[test]
    fn test_wrap_full_is_idempotent() {
        let mut node = sample();
        node.wrap_full();
        let first: Vec<_> = node.properties.iter().map(|p| (p.y, p.width, p.height, p.anchor)).collect();
        let size = (node.width, node.height);
        node.wrap_full();
        let second: Vec<_> = node.properties.iter().map(|p| (p.y, p.width, p.height, p.anchor)).collect();
        assert_eq!(first, second);
        assert_eq!(size, (node.width, node.height));
    }

    #[test]
    fn test_collapse_round_trip() {
        let mut node = sample();
        let expanded = node.width;

        assert!(node.collapse(CollapseState::Toggle));
        assert_eq!(node.fullwidth, expanded);
        let slot = 12.0 * 0.25;
        // two inputs stacked around the vertical center
        let mid = node.height / 2.0;
        assert_eq!(node.properties[0].anchor, DVec2::new(0.0, mid - slot));
        assert_eq!(node.properties[1].anchor, DVec2::new(0.0, mid + slot));
        assert_eq!(node.properties[2].anchor, DVec2::new(node.width, mid));

        assert!(!node.collapse(CollapseState::Expand));
        assert_eq!(node.width, expanded);
        assert!(!node.collapse(CollapseState::Expand));
    }
}
