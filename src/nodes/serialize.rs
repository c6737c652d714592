//! Attribute-text persistence for node groups
//!
//! ```text
//! id root
//! matrix 1 0 0 1 0 0
//! background 0 0 0 0
//! node Value
//!   id Value1
//!   label Value
//!   xywh 0 0 70 36
//!   out V
//!     real 2
//! node Math
//!   id Math1
//!   ...
//!   in A
//!   in B
//!     real 3
//! connections
//!   connect Value1,V -> Math1,A
//! ```
//!
//! Connected inputs are written bare since their value comes from the
//! producer. Group nodes nest their sub-graph under a `group` block.

use glam::{DAffine2, DVec2};
use log::debug;

use crate::attribute::{format_number, format_numbers, parse_bool, parse_numbers, Attribute};
use crate::error::Result;
use crate::nodes::execution_engine::Timestamp;
use crate::nodes::factory::NodeRegistry;
use crate::nodes::graph::{ConnectionKey, Endpoint, NodeGroup};
use crate::nodes::node::Node;
use crate::nodes::property::{NodeProperty, PropertyDirection};
use crate::nodes::value::{Color, ColorDepth, ImageValue, Value, ValueKind};

/// Entries skipped while loading. Each one was also logged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub warnings: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(message);
    }
}

impl NodeGroup {
    /// Attribute tree of this group, its nodes and finished connections
    pub fn dump_out(&self) -> Attribute {
        let mut att = Attribute::default();
        self.dump_into(&mut att);
        att
    }

    pub fn to_text(&self) -> String {
        self.dump_out().to_text()
    }

    fn dump_into(&self, att: &mut Attribute) {
        att.push("id", self.id.as_str());
        if !self.label.is_empty() {
            att.push("label", self.label.as_str());
        }
        att.push("matrix", format_numbers(&self.transform.to_cols_array()));
        att.push("background", format_numbers(&self.background.to_array()));
        if let Some(node) = self.output().and_then(|k| self.node(k)) {
            att.push("output", node.id.as_str());
        }
        if let Some(node) = self.input().and_then(|k| self.node(k)) {
            att.push("input", node.id.as_str());
        }

        for (_, node) in self.nodes() {
            self.dump_node(node, att.push_sub("node", Some(node.type_name.as_str())));
        }

        let links: Vec<String> = self
            .connections()
            .filter_map(|(_, c)| {
                let (from, to) = (c.from?, c.to?);
                let (from_node, to_node) = (self.node(from.node)?, self.node(to.node)?);
                Some(format!(
                    "{},{} -> {},{}",
                    from_node.id,
                    from_node.properties.get(from.property)?.name,
                    to_node.id,
                    to_node.properties.get(to.property)?.name
                ))
            })
            .collect();
        if !links.is_empty() {
            let block = att.push_sub("connections", None);
            for link in links {
                block.push("connect", link);
            }
        }
    }

    fn dump_node(&self, node: &Node, att: &mut Attribute) {
        att.push("id", node.id.as_str());
        att.push("label", node.name.as_str());
        att.push(
            "xywh",
            format_numbers(&[node.position.x, node.position.y, node.width, node.height]),
        );
        if node.collapsed {
            att.push_flag("collapsed");
        }

        for prop in &node.properties {
            let block = att.push_sub(prop.direction.tag(), Some(prop.name.as_str()));
            if prop.is_input() && self.has_producer(prop) {
                continue;
            }
            if let Some(value) = prop.local_data() {
                dump_value(value, block);
            }
        }

        if let Some(child) = node.group() {
            child.dump_into(att.push_sub("group", None));
        }
    }

    fn has_producer(&self, prop: &NodeProperty) -> bool {
        prop.connections()
            .iter()
            .any(|k| self.connection(*k).is_some_and(|c| c.is_complete()))
    }

    /// Parse attribute text into a new group. Only malformed text is an
    /// error; entries that do not resolve are skipped and reported.
    pub fn from_text(text: &str, registry: &NodeRegistry) -> Result<(NodeGroup, LoadReport)> {
        let att = Attribute::parse(text)?;
        Ok(NodeGroup::from_attribute(&att, registry))
    }

    pub fn from_attribute(att: &Attribute, registry: &NodeRegistry) -> (NodeGroup, LoadReport) {
        let mut group = NodeGroup::new("");
        let mut report = LoadReport::default();
        group.dump_in(att, registry, &mut report);
        (group, report)
    }

    /// Add the nodes and connections described by `att` to this group, then
    /// bring every node up to date.
    pub fn dump_in(&mut self, att: &Attribute, registry: &NodeRegistry, report: &mut LoadReport) {
        let mut output = None;
        let mut input = None;
        let mut links = Vec::new();

        for entry in &att.children {
            let value = entry.value_str();
            match entry.name.as_str() {
                "id" => self.id = value.unwrap_or_default().to_string(),
                "label" => self.label = value.unwrap_or_default().to_string(),
                "matrix" => {
                    let mut m = [0.0; 6];
                    if parse_numbers(value.unwrap_or_default(), &mut m) == 6 {
                        self.transform = DAffine2::from_cols_array(&m);
                    } else {
                        report.warn(format!("Bad group matrix {:?}", value.unwrap_or_default()));
                    }
                }
                "background" => match parse_color(value) {
                    Some(color) => self.background = color,
                    None => report.warn(format!("Bad background {:?}", value.unwrap_or_default())),
                },
                "output" => output = value,
                "input" => input = value,
                "node" => self.load_node(entry, registry, report),
                "connections" => links.extend(
                    entry
                        .children
                        .iter()
                        .filter(|c| c.name == "connect")
                        .map(|c| c.value_str().unwrap_or_default()),
                ),
                other => debug!("Ignoring group attribute {}", other),
            }
        }

        for link in links {
            let Some((from, to)) = split_link(link) else {
                report.warn(format!("Malformed connection {:?}", link));
                continue;
            };
            if let Err(e) = self.load_link(from, to) {
                report.warn(format!("Skipping connection {}: {}", link, e));
            }
        }

        for (id, designated_input) in [(output, false), (input, true)] {
            let Some(id) = id else { continue };
            let Some(key) = self.find_node(id) else {
                report.warn(format!("Designated node {} not found", id));
                continue;
            };
            let designated = if designated_input {
                self.designate_input(Some(key))
            } else {
                self.designate_output(Some(key))
            };
            if let Err(e) = designated {
                report.warn(e.to_string());
            }
        }

        self.update_sources();
    }

    fn load_link(&mut self, from: (&str, &str), to: (&str, &str)) -> Result<ConnectionKey> {
        let from: Endpoint = self.endpoint(from.0, from.1)?;
        let to = self.endpoint(to.0, to.1)?;
        self.link_quiet(from, to)
    }

    fn load_node(&mut self, att: &Attribute, registry: &NodeRegistry, report: &mut LoadReport) {
        let type_name = att.value_str().unwrap_or_default();
        let mut node = match registry.create(type_name) {
            Ok(node) => node,
            Err(e) => {
                report.warn(format!("Skipping node: {}", e));
                return;
            }
        };

        let now = Timestamp::now();
        let mut xywh = [node.position.x, node.position.y, node.width, node.height];
        for entry in &att.children {
            let value = entry.value_str();
            match entry.name.as_str() {
                "id" => node.id = value.unwrap_or_default().to_string(),
                "label" => node.name = value.unwrap_or_default().to_string(),
                "xywh" => {
                    parse_numbers(value.unwrap_or_default(), &mut xywh);
                }
                "x" => read_number(value, &mut xywh[0]),
                "y" => read_number(value, &mut xywh[1]),
                "width" => read_number(value, &mut xywh[2]),
                "height" => read_number(value, &mut xywh[3]),
                "collapsed" => node.collapsed = parse_bool(value),
                "group" => match node.group_mut() {
                    Some(child) => {
                        let mut loaded = NodeGroup::new("");
                        loaded.dump_in(entry, registry, report);
                        *child = loaded;
                    }
                    None => report.warn(format!("{} node cannot hold a group", type_name)),
                },
                tag => match PropertyDirection::from_tag(tag) {
                    Some(direction) => load_property(&mut node, direction, entry, now, report),
                    None => debug!("Ignoring node attribute {}", tag),
                },
            }
        }
        node.position = DVec2::new(xywh[0], xywh[1]);
        node.width = xywh[2];
        node.height = xywh[3];

        let wanted = node.id.clone();
        let key = self.add_node(node);
        if !wanted.is_empty() && self.node(key).is_some_and(|n| n.id != wanted) {
            report.warn(format!("Node id {} already in use, loaded under a new id", wanted));
        }
    }
}

fn load_property(
    node: &mut Node,
    direction: PropertyDirection,
    att: &Attribute,
    now: Timestamp,
    report: &mut LoadReport,
) {
    let name = att.value_str().unwrap_or_default();
    let index = match node.property_index(name) {
        Some(index) => index,
        None if node.behavior().accepts_dynamic_properties() => {
            let mut prop = NodeProperty::new(direction, true, name, None);
            prop.is_editable = direction != PropertyDirection::Output;
            node.add_property(prop)
        }
        None => {
            report.warn(format!("{} has no property {}", node.type_name, name));
            return;
        }
    };

    // Bare blocks are connected inputs, nothing to restore
    let Some(value_att) = att.children.first() else {
        return;
    };
    let owner = node.type_name.clone();
    let Some(prop) = node.properties.get_mut(index) else {
        return;
    };
    if prop.direction != direction {
        debug!("{}.{} stored as {}, kept as {:?}", owner, name, direction.tag(), prop.direction);
    }
    match parse_value(value_att, prop.local_data().map(|v| v.as_ref())) {
        Some(value) if prop.allow_type(&value) => {
            prop.set_data(value);
            prop.modtime = now;
        }
        Some(value) => report.warn(format!("{}.{} does not accept {} values", owner, name, value.kind())),
        None => report.warn(format!(
            "{}.{}: unreadable {} value {:?}",
            owner,
            name,
            value_att.name,
            value_att.value_str().unwrap_or_default()
        )),
    }
}

fn dump_value(value: &Value, att: &mut Attribute) {
    let kind = value.kind().name();
    match value {
        Value::Real(v) => {
            att.push(kind, format_number(*v));
        }
        Value::Integer(v) => {
            att.push(kind, v.to_string());
        }
        Value::String(s) => {
            att.push(kind, s.as_str());
        }
        Value::Boolean(b) => {
            att.push(kind, if *b { "yes" } else { "no" });
        }
        Value::Color(c) => {
            att.push(kind, format_numbers(&c.to_array()));
        }
        Value::Enum(e) => {
            att.push(kind, e.id().unwrap_or_default());
        }
        Value::Image(image) => {
            let block = att.push_sub(kind, None);
            block
                .push("width", image.width.to_string())
                .push("height", image.height.to_string())
                .push("channels", image.channels.to_string())
                .push("depth", image.depth.id())
                .push("color", format_numbers(&image.color.to_array()));
        }
    }
}

/// Rebuild a value from its block. Enums need the current value of the
/// property to know which definition the field id belongs to.
fn parse_value(att: &Attribute, current: Option<&Value>) -> Option<Value> {
    let text = att.value_str().unwrap_or_default().trim();
    match ValueKind::from_name(&att.name)? {
        ValueKind::Real => text.parse().ok().map(Value::Real),
        ValueKind::Integer => text.parse().ok().map(Value::Integer),
        ValueKind::String => Some(Value::String(att.value_str().unwrap_or_default().to_string())),
        ValueKind::Boolean => Some(Value::Boolean(parse_bool(att.value_str()))),
        ValueKind::Color => parse_color(att.value_str()).map(Value::Color),
        ValueKind::Enum => current?.as_enum()?.with_id(text).map(Value::Enum),
        ValueKind::Image => Some(Value::Image(parse_image(att))),
    }
}

fn parse_image(att: &Attribute) -> ImageValue {
    let mut image = ImageValue::default();
    for entry in &att.children {
        let text = entry.value_str().unwrap_or_default().trim();
        match entry.name.as_str() {
            "width" => image.width = text.parse().unwrap_or(image.width),
            "height" => image.height = text.parse().unwrap_or(image.height),
            "channels" => image.channels = text.parse().unwrap_or(image.channels),
            "depth" => image.depth = ColorDepth::from_id(text).unwrap_or(image.depth),
            "color" => image.color = parse_color(entry.value_str()).unwrap_or(image.color),
            _ => {}
        }
    }
    image
}

/// `r g b [a]` in 0..=1, or a `#rrggbb` hex string
fn parse_color(text: Option<&str>) -> Option<Color> {
    let text = text?.trim();
    if text.starts_with('#') {
        return Color::from_hex(text);
    }
    let mut c = [0.0, 0.0, 0.0, 1.0];
    (parse_numbers(text, &mut c) >= 3).then(|| Color::from_array(c))
}

fn read_number(text: Option<&str>, out: &mut f64) {
    if let Some(v) = text.and_then(|t| t.trim().parse().ok()) {
        *out = v;
    }
}

fn split_endpoint(text: &str) -> Option<(&str, &str)> {
    let (node, property) = text.trim().split_once(',')?;
    Some((node.trim(), property.trim()))
}

/// `A,p -> B,q`
fn split_link(text: &str) -> Option<((&str, &str), (&str, &str))> {
    let (from, to) = text.split_once("->")?;
    Some((split_endpoint(from)?, split_endpoint(to)?))
}
