//! Named, typed slots on a node

use glam::DVec2;

use crate::nodes::constraint::ValueConstraint;
use crate::nodes::execution_engine::Timestamp;
use crate::nodes::graph::ConnectionKey;
use crate::nodes::value::{SharedValue, Value, ValueKind};

/// Which way data flows through a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyDirection {
    /// Receives at most one connection
    Input,
    /// Feeds any number of connections
    Output,
    /// Stored data that is passed through; links out like an output
    Block,
}

impl PropertyDirection {
    /// Attribute block name used in node files
    pub fn tag(&self) -> &'static str {
        match self {
            PropertyDirection::Input => "in",
            PropertyDirection::Output => "out",
            PropertyDirection::Block => "block",
        }
    }

    pub fn from_tag(tag: &str) -> Option<PropertyDirection> {
        match tag {
            "in" => Some(PropertyDirection::Input),
            "out" => Some(PropertyDirection::Output),
            "block" => Some(PropertyDirection::Block),
            _ => None,
        }
    }
}

/// A property of a node, holding an optional value and the keys of the
/// connections attached to it.
///
/// Connection keys are non-owning: the group's connection arena owns the
/// connections and keeps these lists in sync.
#[derive(Debug, Clone)]
pub struct NodeProperty {
    pub name: String,
    pub label: String,
    pub tooltip: String,
    pub direction: PropertyDirection,
    pub is_linkable: bool,
    pub is_editable: bool,
    data: Option<SharedValue>,
    /// Accepted value kinds, `None` accepts anything
    pub datatypes: Option<Vec<ValueKind>>,
    pub constraint: Option<ValueConstraint>,
    connections: Vec<ConnectionKey>,
    pub modtime: Timestamp,

    // Layout, relative to the node origin
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Connector position
    pub anchor: DVec2,
}

impl NodeProperty {
    pub fn new(
        direction: PropertyDirection,
        is_linkable: bool,
        name: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            tooltip: String::new(),
            direction,
            is_linkable,
            is_editable: true,
            data: data.map(Value::shared),
            datatypes: None,
            constraint: None,
            connections: Vec::new(),
            modtime: Timestamp::EPOCH,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            anchor: DVec2::ZERO,
        }
    }

    pub fn input(name: impl Into<String>, linkable: bool, value: impl Into<Value>) -> Self {
        Self::new(PropertyDirection::Input, linkable, name, Some(value.into()))
    }

    pub fn output(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut prop = Self::new(PropertyDirection::Output, true, name, Some(value.into()));
        prop.is_editable = false;
        prop
    }

    pub fn block(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(PropertyDirection::Block, true, name, Some(value.into()))
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = tooltip.into();
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.is_editable = editable;
        self
    }

    pub fn with_types(mut self, kinds: &[ValueKind]) -> Self {
        self.datatypes = Some(kinds.to_vec());
        self
    }

    pub fn with_constraint(mut self, constraint: ValueConstraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn is_input(&self) -> bool {
        self.direction == PropertyDirection::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == PropertyDirection::Output
    }

    pub fn is_block(&self) -> bool {
        self.direction == PropertyDirection::Block
    }

    /// 0 when unconnected. Inputs report the negated connection count
    /// (0 or -1), outputs and blocks the fan-out.
    pub fn is_connected(&self) -> isize {
        let n = self.connections.len() as isize;
        if self.is_input() {
            -n
        } else {
            n
        }
    }

    pub fn allow_input(&self) -> bool {
        self.is_input() && self.is_linkable
    }

    pub fn allow_output(&self) -> bool {
        !self.is_input()
    }

    /// Whether `candidate` may be stored here or linked in
    pub fn allow_type(&self, candidate: &Value) -> bool {
        self.accepts_kind(candidate.kind())
    }

    pub fn accepts_kind(&self, kind: ValueKind) -> bool {
        match &self.datatypes {
            None => true,
            Some(kinds) => kinds.contains(&kind),
        }
    }

    pub fn connections(&self) -> &[ConnectionKey] {
        &self.connections
    }

    pub(crate) fn attach(&mut self, key: ConnectionKey) {
        if !self.connections.contains(&key) {
            self.connections.push(key);
        }
    }

    /// Drop `key` from this property's list. Returns false if it was not there.
    pub(crate) fn release(&mut self, key: ConnectionKey) -> bool {
        match self.connections.iter().position(|k| *k == key) {
            Some(at) => {
                self.connections.remove(at);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear_connections(&mut self) {
        self.connections.clear();
    }

    /// The locally stored value. For connected inputs this is stale; read
    /// through [`crate::nodes::NodeGroup::get_data`] instead.
    pub fn local_data(&self) -> Option<&SharedValue> {
        self.data.as_ref()
    }

    /// Store a freshly built value, taking ownership of it
    pub fn set_data(&mut self, value: Value) -> bool {
        self.data = Some(value.shared());
        true
    }

    /// Share an existing value. Storing the identical handle again is a
    /// no-op that still reports success.
    pub fn share_data(&mut self, value: SharedValue) -> bool {
        if let Some(current) = &self.data {
            if SharedValue::ptr_eq(current, &value) {
                return true;
            }
        }
        self.data = Some(value);
        true
    }

    pub fn clear_data(&mut self) {
        self.data = None;
    }

    /// Interactive edit: type checked and constrained. Rejected edits leave
    /// the value unchanged.
    pub fn edit(&mut self, value: Value) -> bool {
        if !self.is_editable || !self.allow_type(&value) {
            return false;
        }
        let value = match (&self.constraint, &value) {
            (Some(c), Value::Real(v)) => match c.check(*v) {
                Some(v) => Value::Real(v),
                None => return false,
            },
            (Some(c), Value::Integer(v)) => match c.check(*v as f64) {
                Some(v) => Value::Integer(v as i64),
                None => return false,
            },
            _ => value,
        };
        self.set_data(value)
    }

    /// Step a numeric value up or down according to its constraint
    pub fn nudge(&mut self, steps: i32) -> bool {
        if !self.is_editable {
            return false;
        }
        let constraint = self.constraint.clone().unwrap_or_default();
        let next = match self.data.as_deref() {
            Some(Value::Real(v)) => Value::Real(constraint.nudge(*v, steps)),
            Some(Value::Integer(v)) => Value::Integer(constraint.nudge(*v as f64, steps) as i64),
            _ => return false,
        };
        self.set_data(next)
    }

    /// Copy without connections or timestamps
    pub fn duplicate(&self) -> NodeProperty {
        NodeProperty {
            data: self.data.as_deref().cloned().map(Value::shared),
            connections: Vec::new(),
            modtime: Timestamp::EPOCH,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::value::Color;

    #[test]
    fn test_direction_rules() {
        let input = NodeProperty::input("A", true, 1.0);
        assert!(input.allow_input());
        assert!(!input.allow_output());

        let fixed = NodeProperty::input("Op", false, 1.0);
        assert!(!fixed.allow_input());

        let output = NodeProperty::output("Result", 0.0);
        assert!(output.allow_output());
        assert!(!output.allow_input());
        assert!(!output.is_editable);

        let block = NodeProperty::block("Data", "x");
        assert!(block.allow_output());
        assert!(!block.allow_input());
    }

    #[test]
    fn test_type_whitelist() {
        let any = NodeProperty::input("A", true, 1.0);
        assert!(any.allow_type(&Value::from("text")));

        let numeric = any.with_types(&[ValueKind::Real, ValueKind::Integer]);
        assert!(numeric.allow_type(&Value::Integer(2)));
        assert!(!numeric.allow_type(&Value::Color(Color::WHITE)));
    }

    #[test]
    fn test_share_same_handle_is_noop() {
        let mut prop = NodeProperty::output("V", 0.0);
        let shared = Value::Real(2.0).shared();
        assert!(prop.share_data(shared.clone()));
        assert!(prop.share_data(shared.clone()));
        assert_eq!(SharedValue::strong_count(&shared), 2);
        assert!(SharedValue::ptr_eq(prop.local_data().unwrap(), &shared));
    }

    #[test]
    fn test_edit_respects_constraint() {
        let mut prop = NodeProperty::input("Channels", true, Value::Integer(4))
            .with_constraint(ValueConstraint::parse_range("[1 .. 4]").unwrap().integer());
        assert!(prop.edit(Value::Integer(9)));
        assert_eq!(prop.local_data().unwrap().as_integer(), Some(4));
        assert!(prop.nudge(-2));
        assert_eq!(prop.local_data().unwrap().as_integer(), Some(2));

        let mut locked = NodeProperty::input("A", true, 1.0).editable(false);
        assert!(!locked.edit(Value::Real(3.0)));
    }

    #[test]
    fn test_duplicate_drops_connections() {
        let mut prop = NodeProperty::output("V", 1.5);
        let mut arena = slotmap::SlotMap::<ConnectionKey, ()>::with_key();
        prop.attach(arena.insert(()));
        assert_eq!(prop.is_connected(), 1);

        let copy = prop.duplicate();
        assert_eq!(copy.is_connected(), 0);
        assert_eq!(copy.local_data().unwrap().as_real(), Some(1.5));
        assert!(!SharedValue::ptr_eq(copy.local_data().unwrap(), prop.local_data().unwrap()));
    }
}
