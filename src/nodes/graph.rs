//! Node graph data structures and operations
//!
//! A [`NodeGroup`] owns its nodes and connections in two slot-map arenas.
//! Properties only hold [`ConnectionKey`]s, so removing a connection goes
//! through [`NodeGroup`] which clears both endpoint lists before the arena
//! entry is freed.

use std::collections::HashSet;
use std::rc::Rc;

use glam::{DAffine2, DVec2};
use log::{debug, warn};
use slotmap::{new_key_type, SlotMap};

use super::factory::NodeRegistry;
use super::node::Node;
use super::style::NodeStyle;
use super::value::{Color, SharedValue};
use crate::constants::layout::{DUPLICATE_OFFSET, FIT_MARGIN};
use crate::error::{GraphError, Result};

new_key_type! {
    /// Handle of a node inside one group
    pub struct NodeKey;
    /// Handle of a connection inside one group
    pub struct ConnectionKey;
}

/// A property of a node in the same group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub node: NodeKey,
    pub property: usize,
}

impl Endpoint {
    pub fn new(node: NodeKey, property: usize) -> Self {
        Self { node, property }
    }
}

/// One end of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    From,
    To,
}

/// Directed edge from an output-side property to an input property.
///
/// Either side may be empty while a link is being dragged out; finished
/// connections have both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connection {
    pub from: Option<Endpoint>,
    pub to: Option<Endpoint>,
}

impl Connection {
    pub fn new(from: Endpoint, to: Endpoint) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }

    pub fn side(&self, side: Side) -> Option<Endpoint> {
        match side {
            Side::From => self.from,
            Side::To => self.to,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut Option<Endpoint> {
        match side {
            Side::From => &mut self.from,
            Side::To => &mut self.to,
        }
    }

    pub fn touches(&self, node: NodeKey) -> bool {
        self.from.is_some_and(|e| e.node == node) || self.to.is_some_and(|e| e.node == node)
    }
}

/// A graph scope: nodes, the connections between them, and the group's
/// designated input and output nodes
#[derive(Debug, Clone)]
pub struct NodeGroup {
    pub id: String,
    pub label: String,
    nodes: SlotMap<NodeKey, Node>,
    order: Vec<NodeKey>,
    connections: SlotMap<ConnectionKey, Connection>,
    connection_order: Vec<ConnectionKey>,
    output: Option<NodeKey>,
    input: Option<NodeKey>,
    pub background: Color,
    /// View transform, group space to screen
    pub transform: DAffine2,
    style: Rc<NodeStyle>,
    /// Set when a connection hook asked for a redraw
    needs_redraw: bool,
}

impl Default for NodeGroup {
    fn default() -> Self {
        Self::new("")
    }
}

impl NodeGroup {
    /// Creates a new empty group
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_style(id, Rc::new(NodeStyle::default()))
    }

    pub fn with_style(id: impl Into<String>, style: Rc<NodeStyle>) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            nodes: SlotMap::with_key(),
            order: Vec::new(),
            connections: SlotMap::with_key(),
            connection_order: Vec::new(),
            output: None,
            input: None,
            background: Color::rgba(0.0, 0.0, 0.0, 0.0),
            transform: DAffine2::IDENTITY,
            style,
            needs_redraw: false,
        }
    }

    pub fn style(&self) -> &Rc<NodeStyle> {
        &self.style
    }

    /// Install `style` on the group and every node in it, recursing into
    /// sub-groups
    pub fn set_style(&mut self, style: Rc<NodeStyle>) {
        self.style = style.clone();
        for node in self.nodes.values_mut() {
            if let Some(child) = node.group_mut() {
                child.set_style(style.clone());
            }
            node.install_style(style.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Node keys in insertion order
    pub fn node_keys(&self) -> &[NodeKey] {
        &self.order
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &Node)> + '_ {
        self.order
            .iter()
            .filter_map(move |k| self.nodes.get(*k).map(|n| (*k, n)))
    }

    pub fn connection(&self, key: ConnectionKey) -> Option<&Connection> {
        self.connections.get(key)
    }

    /// Connection keys in creation order, half connections included
    pub fn connection_keys(&self) -> &[ConnectionKey] {
        &self.connection_order
    }

    pub fn connections(&self) -> impl Iterator<Item = (ConnectionKey, &Connection)> + '_ {
        self.connection_order
            .iter()
            .filter_map(move |k| self.connections.get(*k).map(|c| (*k, c)))
    }

    pub fn has_connection(&self, key: ConnectionKey) -> bool {
        self.connections.contains_key(key)
    }

    /// Signed connection count of a property, see [`super::NodeProperty::is_connected`]
    pub fn is_connected(&self, endpoint: Endpoint) -> isize {
        self.nodes
            .get(endpoint.node)
            .and_then(|n| n.properties.get(endpoint.property))
            .map_or(0, |p| p.is_connected())
    }

    /// Resolve `(node id, property name)`
    pub fn endpoint(&self, node_id: &str, property: &str) -> Result<Endpoint> {
        let node = self.find_node(node_id).ok_or(GraphError::UnknownNode)?;
        let index = self.nodes[node]
            .property_index(property)
            .ok_or_else(|| GraphError::UnknownProperty {
                node: node_id.to_string(),
                property: property.to_string(),
            })?;
        Ok(Endpoint::new(node, index))
    }

    /// Construct a node of `type_name` through the registry, not yet added
    pub fn new_node(&self, registry: &NodeRegistry, type_name: &str) -> Result<Node> {
        registry.create(type_name)
    }

    /// Construct and add a node of `type_name`
    pub fn create_node(&mut self, registry: &NodeRegistry, type_name: &str) -> Result<NodeKey> {
        let node = self.new_node(registry, type_name)?;
        Ok(self.add_node(node))
    }

    /// Add a node, giving it a unique id if it has none or a clashing one,
    /// installing the group style and computing its layout
    pub fn add_node(&mut self, mut node: Node) -> NodeKey {
        if node.id.is_empty() || self.find_node(&node.id).is_some() {
            node.id = self.unique_id(&node.type_name);
        }
        if let Some(child) = node.group_mut() {
            child.set_style(self.style.clone());
        }
        node.install_style(self.style.clone());
        let key = self.nodes.insert(node);
        self.order.push(key);
        key
    }

    fn unique_id(&self, base: &str) -> String {
        let base = if base.is_empty() { "node" } else { base };
        let mut n = 1;
        loop {
            let id = format!("{}{}", base, n);
            if self.find_node(&id).is_none() {
                return id;
            }
            n += 1;
        }
    }

    pub fn find_node(&self, id: &str) -> Option<NodeKey> {
        self.nodes().find(|(_, n)| n.id == id).map(|(k, _)| k)
    }

    pub fn output(&self) -> Option<NodeKey> {
        self.output
    }

    pub fn input(&self) -> Option<NodeKey> {
        self.input
    }

    /// Pin `key` as the group's output node, replacing any previous one
    pub fn designate_output(&mut self, key: Option<NodeKey>) -> Result<()> {
        if let Some(k) = key {
            if !self.contains(k) {
                return Err(GraphError::UnknownNode);
            }
        }
        self.output = key;
        Ok(())
    }

    /// Pin `key` as the group's input node, replacing any previous one
    pub fn designate_input(&mut self, key: Option<NodeKey>) -> Result<()> {
        if let Some(k) = key {
            if !self.contains(k) {
                return Err(GraphError::UnknownNode);
            }
        }
        self.input = key;
        Ok(())
    }

    /// Delete the deletable nodes of `selection` along with every connection
    /// touching them. Deleted nodes leave the selection; nodes that cannot be
    /// deleted stay in it. Returns the number deleted.
    pub fn delete_nodes(&mut self, selection: &mut Vec<NodeKey>) -> usize {
        let mut deleted = 0;
        let mut consumers = Vec::new();

        for i in (0..selection.len()).rev() {
            let key = selection[i];
            let Some(node) = self.nodes.get(key) else {
                selection.remove(i);
                continue;
            };
            if !node.deletable {
                debug!("Skipping non-deletable node {}", node.id);
                continue;
            }
            consumers.extend(self.downstream_of(key));
            self.remove_node(key);
            selection.remove(i);
            deleted += 1;
        }

        // Survivors that lost a producer fall back to their own values
        let mut seen = HashSet::new();
        for key in consumers {
            if self.contains(key) && seen.insert(key) {
                self.update(key);
            }
        }
        deleted
    }

    /// Remove a node and all its connections, returning it
    pub(crate) fn remove_node(&mut self, key: NodeKey) -> Option<Node> {
        let touching: Vec<ConnectionKey> = self
            .connection_order
            .iter()
            .copied()
            .filter(|k| self.connections.get(*k).is_some_and(|c| c.touches(key)))
            .collect();
        for conn in touching {
            self.remove_connection(conn);
        }
        if self.output == Some(key) {
            self.output = None;
        }
        if self.input == Some(key) {
            self.input = None;
        }
        self.order.retain(|k| *k != key);
        self.nodes.remove(key)
    }

    fn property(&self, endpoint: Endpoint) -> Result<&super::NodeProperty> {
        let node = self.nodes.get(endpoint.node).ok_or(GraphError::UnknownNode)?;
        node.properties
            .get(endpoint.property)
            .ok_or_else(|| GraphError::UnknownProperty {
                node: node.id.clone(),
                property: format!("#{}", endpoint.property),
            })
    }

    fn property_mut(&mut self, endpoint: Endpoint) -> Option<&mut super::NodeProperty> {
        self.nodes
            .get_mut(endpoint.node)
            .and_then(|n| n.properties.get_mut(endpoint.property))
    }

    fn describe(&self, endpoint: Endpoint) -> String {
        match self.nodes.get(endpoint.node) {
            Some(n) => match n.properties.get(endpoint.property) {
                Some(p) => format!("{},{}", n.id, p.name),
                None => format!("{},#{}", n.id, endpoint.property),
            },
            None => "?".to_string(),
        }
    }

    /// Check that `from -> to` may be linked without touching the graph
    pub fn validate_link(&self, from: Endpoint, to: Endpoint) -> Result<()> {
        let producer = self.property(from)?;
        let consumer = self.property(to)?;
        if !producer.allow_output() {
            return Err(GraphError::NotAnOutput(self.describe(from)));
        }
        if !consumer.allow_input() {
            return Err(GraphError::NotAnInput(self.describe(to)));
        }
        if let Some(value) = producer.local_data() {
            if !consumer.allow_type(value) {
                return Err(GraphError::TypeMismatch {
                    property: self.describe(to),
                    kind: value.kind().to_string(),
                });
            }
        }
        if from.node == to.node || self.reaches_forward(to.node, from.node) {
            return Err(GraphError::WouldCycle {
                from: self.describe(from),
                to: self.describe(to),
            });
        }
        Ok(())
    }

    /// Link `from` to `to`, replacing any producer `to` already had. With
    /// `reuse`, that existing (usually half) connection becomes the edge.
    /// On success the consumer node is updated.
    pub fn connect(
        &mut self,
        from: Endpoint,
        to: Endpoint,
        reuse: Option<ConnectionKey>,
    ) -> Result<ConnectionKey> {
        if let Some(k) = reuse {
            if !self.connections.contains_key(k) {
                return Err(GraphError::UnknownConnection);
            }
        }
        self.validate_link(from, to)?;

        let prior: Vec<ConnectionKey> = self
            .property(to)?
            .connections()
            .iter()
            .copied()
            .filter(|k| Some(*k) != reuse)
            .collect();
        for old in prior {
            debug!("Replacing producer of {}", self.describe(to));
            self.remove_connection(old);
        }

        let key = match reuse {
            Some(k) => {
                let old = self.connections.get(k).cloned().unwrap_or_default();
                for endpoint in [old.from, old.to].into_iter().flatten() {
                    if let Some(prop) = self.property_mut(endpoint) {
                        prop.release(k);
                    }
                }
                if let Some(conn) = self.connections.get_mut(k) {
                    *conn = Connection::new(from, to);
                }
                k
            }
            None => {
                let k = self.connections.insert(Connection::new(from, to));
                self.connection_order.push(k);
                k
            }
        };

        if let Some(prop) = self.property_mut(from) {
            prop.attach(key);
        }
        if let Some(prop) = self.property_mut(to) {
            prop.attach(key);
        }
        self.notify_connected(from);
        self.notify_connected(to);

        self.update(to.node);
        Ok(key)
    }

    /// Remove a connection entirely and update the node it fed
    pub fn disconnect(&mut self, key: ConnectionKey) -> Result<()> {
        let conn = self
            .connections
            .get(key)
            .cloned()
            .ok_or(GraphError::UnknownConnection)?;
        self.remove_connection(key);
        if let Some(to) = conn.to {
            self.update(to.node);
        }
        Ok(())
    }

    /// Free a connection after clearing it from both endpoint lists
    pub(crate) fn remove_connection(&mut self, key: ConnectionKey) -> Option<Connection> {
        let conn = self.connections.get(key).cloned()?;
        for side in [Side::From, Side::To] {
            if let Some(endpoint) = conn.side(side) {
                if self.property_mut(endpoint).is_some_and(|p| p.release(key)) {
                    self.notify_disconnected(endpoint, side);
                }
            }
        }
        self.connection_order.retain(|k| *k != key);
        self.connections.remove(key)
    }

    /// Detach one end of a connection, leaving a half connection. A
    /// connection with neither end left is removed.
    pub fn detach(&mut self, key: ConnectionKey, side: Side) -> Result<()> {
        let conn = self.connections.get_mut(key).ok_or(GraphError::UnknownConnection)?;
        let Some(endpoint) = conn.side_mut(side).take() else {
            return Ok(());
        };
        let empty = conn.from.is_none() && conn.to.is_none();

        if self.property_mut(endpoint).is_some_and(|p| p.release(key)) {
            self.notify_disconnected(endpoint, side);
        }
        if empty {
            self.connection_order.retain(|k| *k != key);
            self.connections.remove(key);
        }
        if side == Side::To {
            self.update(endpoint.node);
        }
        Ok(())
    }

    /// Start an interactive link from one property. `side` says which end
    /// of the new connection `endpoint` is.
    ///
    /// Starting at an input that already has a producer picks that edge up
    /// instead: its input end is detached and the edge is returned as a
    /// half connection still hanging off the producer.
    pub fn begin_connection(&mut self, endpoint: Endpoint, side: Side) -> Result<ConnectionKey> {
        let prop = self.property(endpoint)?;
        match side {
            Side::From if !prop.allow_output() => {
                return Err(GraphError::NotAnOutput(self.describe(endpoint)))
            }
            Side::To if !prop.allow_input() => {
                return Err(GraphError::NotAnInput(self.describe(endpoint)))
            }
            _ => {}
        }
        if side == Side::To && prop.is_input() {
            if let Some(existing) = prop.connections().first().copied() {
                debug!("Picking up producer link of {}", self.describe(endpoint));
                self.detach(existing, Side::To)?;
                return Ok(existing);
            }
        }

        let mut conn = Connection::default();
        *conn.side_mut(side) = Some(endpoint);
        let key = self.connections.insert(conn);
        self.connection_order.push(key);
        if let Some(prop) = self.property_mut(endpoint) {
            prop.attach(key);
        }
        Ok(key)
    }

    /// Finish a half connection at `endpoint`. A connection that cannot be
    /// completed is removed.
    pub fn complete_connection(&mut self, key: ConnectionKey, endpoint: Endpoint) -> Result<ConnectionKey> {
        let conn = self
            .connections
            .get(key)
            .cloned()
            .ok_or(GraphError::UnknownConnection)?;
        let (from, to) = match (conn.from, conn.to) {
            (Some(from), None) => (from, endpoint),
            (None, Some(to)) => (endpoint, to),
            _ => return Err(GraphError::HalfConnection),
        };
        match self.connect(from, to, Some(key)) {
            Ok(k) => Ok(k),
            Err(e) => {
                debug!("Dropping half connection: {}", e);
                self.remove_connection(key);
                Err(e)
            }
        }
    }

    /// Drop every connection missing an end
    pub fn clear_half_connections(&mut self) -> usize {
        let half: Vec<ConnectionKey> = self
            .connections()
            .filter(|(_, c)| !c.is_complete())
            .map(|(k, _)| k)
            .collect();
        for key in &half {
            self.remove_connection(*key);
        }
        half.len()
    }

    /// Whether a connection hook asked for a redraw since the last call.
    /// Clears the request.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    fn notify_connected(&mut self, endpoint: Endpoint) {
        if let Some(node) = self.nodes.get_mut(endpoint.node) {
            if let Some(name) = node.properties.get(endpoint.property).map(|p| p.name.clone()) {
                self.needs_redraw |= node.behavior_mut().connected(&name);
            }
        }
    }

    fn notify_disconnected(&mut self, endpoint: Endpoint, side: Side) {
        if let Some(node) = self.nodes.get_mut(endpoint.node) {
            if let Some(name) = node.properties.get(endpoint.property).map(|p| p.name.clone()) {
                self.needs_redraw |= node.behavior_mut().disconnected(&name, side);
            }
        }
    }

    /// Whether `target` is reachable downstream of `connection`'s consumer
    pub fn check_forward(&self, target: NodeKey, connection: ConnectionKey) -> bool {
        self.connections
            .get(connection)
            .and_then(|c| c.to)
            .is_some_and(|to| self.reaches_forward(to.node, target))
    }

    /// Whether `target` is reachable upstream of `connection`'s producer
    pub fn check_backward(&self, target: NodeKey, connection: ConnectionKey) -> bool {
        self.connections
            .get(connection)
            .and_then(|c| c.from)
            .is_some_and(|from| self.reaches_backward(from.node, target))
    }

    /// Depth-first search along outgoing connections
    pub fn reaches_forward(&self, start: NodeKey, target: NodeKey) -> bool {
        self.search(start, target, Side::To)
    }

    /// Depth-first search along incoming connections
    pub fn reaches_backward(&self, start: NodeKey, target: NodeKey) -> bool {
        self.search(start, target, Side::From)
    }

    fn search(&self, start: NodeKey, target: NodeKey, toward: Side) -> bool {
        let mut stack = vec![start];
        let mut seen = HashSet::new();
        while let Some(key) = stack.pop() {
            if key == target {
                return true;
            }
            if !seen.insert(key) {
                continue;
            }
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            for prop in &node.properties {
                // Forward walks leave through output-side lists, backward
                // walks through input lists
                if prop.is_input() != (toward == Side::From) {
                    continue;
                }
                for conn in prop.connections() {
                    if let Some(next) = self.connections.get(*conn).and_then(|c| c.side(toward)) {
                        stack.push(next.node);
                    }
                }
            }
        }
        false
    }

    /// Nodes fed by `key`, in connection order, each listed once. Half
    /// connections are skipped.
    pub fn downstream_of(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let Some(node) = self.nodes.get(key) else {
            return out;
        };
        for prop in node.properties.iter().filter(|p| !p.is_input()) {
            for conn in prop.connections() {
                if let Some(to) = self.connections.get(*conn).and_then(|c| c.to) {
                    if !out.contains(&to.node) {
                        out.push(to.node);
                    }
                }
            }
        }
        out
    }

    /// Value seen at `endpoint`. A connected input reads through to its
    /// producer; anything else returns its own stored value.
    pub fn get_data(&self, endpoint: Endpoint) -> Option<SharedValue> {
        let prop = self.property(endpoint).ok()?;
        if prop.is_input() {
            let producer = prop
                .connections()
                .first()
                .and_then(|k| self.connections.get(*k))
                .and_then(|c| c.from);
            if let Some(from) = producer {
                if from != endpoint {
                    return self.get_data(from);
                }
            }
        }
        prop.local_data().cloned()
    }

    /// For an input, its producer; for an output or block, its `index`-th
    /// consumer
    pub fn property_connection(&self, endpoint: Endpoint, index: usize) -> Option<Endpoint> {
        let prop = self.property(endpoint).ok()?;
        let conn = self.connections.get(*prop.connections().get(index)?)?;
        if prop.is_input() {
            conn.from
        } else {
            conn.to
        }
    }

    /// Add an unconnected copy of `key` next to it, returning the copy
    pub fn duplicate_node(&mut self, key: NodeKey) -> Result<NodeKey> {
        let node = self.nodes.get(key).ok_or(GraphError::UnknownNode)?;
        let mut copy = node.duplicate();
        copy.position += DVec2::from(DUPLICATE_OFFSET);
        Ok(self.add_node(copy))
    }

    /// Bounding box of `selection`, or of every node when it is empty
    pub fn bounds(&self, selection: &[NodeKey]) -> Option<(DVec2, DVec2)> {
        let keys: &[NodeKey] = if selection.is_empty() { &self.order } else { selection };
        let mut boxes = keys.iter().filter_map(|k| self.nodes.get(*k)).map(|n| {
            (n.position, n.position + DVec2::new(n.width, n.height))
        });
        let first = boxes.next()?;
        Some(boxes.fold(first, |(lo, hi), (a, b)| (lo.min(a), hi.max(b))))
    }

    /// Set the view transform so the bounds of `selection` fill the
    /// viewport `(min, max)` with a small margin. Returns false when there
    /// is nothing to fit.
    pub fn fit_view(&mut self, selection: &[NodeKey], viewport: (DVec2, DVec2)) -> bool {
        let Some((lo, hi)) = self.bounds(selection) else {
            return false;
        };
        let view = viewport.1 - viewport.0;
        let margin = FIT_MARGIN * view.x.min(view.y);
        let room = view - DVec2::splat(2.0 * margin);
        let size = hi - lo;
        if room.x <= 0.0 || room.y <= 0.0 {
            warn!("Viewport too small to fit nodes");
            return false;
        }

        let scale = match (size.x > 0.0, size.y > 0.0) {
            (true, true) => (room.x / size.x).min(room.y / size.y),
            (true, false) => room.x / size.x,
            (false, true) => room.y / size.y,
            (false, false) => 1.0,
        };
        let center = (lo + hi) / 2.0;
        let view_center = (viewport.0 + viewport.1) / 2.0;
        self.transform = DAffine2::from_translation(view_center)
            * DAffine2::from_scale(DVec2::splat(scale))
            * DAffine2::from_translation(-center);
        true
    }

    /// Insert an already-validated connection without hooks or updates.
    /// Used by loading and regrouping, which update once at the end.
    pub(crate) fn link_quiet(&mut self, from: Endpoint, to: Endpoint) -> Result<ConnectionKey> {
        self.validate_link(from, to)?;
        let prior: Vec<ConnectionKey> = self.property(to)?.connections().to_vec();
        for old in prior {
            self.remove_connection(old);
        }
        let key = self.connections.insert(Connection::new(from, to));
        self.connection_order.push(key);
        if let Some(prop) = self.property_mut(from) {
            prop.attach(key);
        }
        if let Some(prop) = self.property_mut(to) {
            prop.attach(key);
        }
        self.notify_connected(from);
        self.notify_connected(to);
        Ok(key)
    }

    /// Take a node out of this group with its connection lists cleared, for
    /// moving it into another group
    pub(crate) fn take_node(&mut self, key: NodeKey) -> Option<Node> {
        let mut node = self.remove_node(key)?;
        for prop in node.properties.iter_mut() {
            prop.clear_connections();
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::property::NodeProperty;

    fn pass(name: &str) -> Node {
        let mut node = Node::new("Pass", name)
            .with_property(NodeProperty::input("In", true, 0.0))
            .with_property(NodeProperty::output("Out", 0.0));
        node.id = name.to_string();
        node
    }

    fn group_of(names: &[&str]) -> (NodeGroup, Vec<NodeKey>) {
        let mut group = NodeGroup::new("root");
        let keys = names.iter().map(|n| group.add_node(pass(n))).collect();
        (group, keys)
    }

    fn out(k: NodeKey) -> Endpoint {
        Endpoint::new(k, 1)
    }

    fn inp(k: NodeKey) -> Endpoint {
        Endpoint::new(k, 0)
    }

    #[test]
    fn test_add_node_assigns_unique_ids() {
        let mut group = NodeGroup::new("root");
        let a = group.add_node(Node::new("Value", "Value"));
        let b = group.add_node(Node::new("Value", "Value"));
        let c = group.add_node(pass("Value1"));
        assert_eq!(group.node(a).unwrap().id, "Value1");
        assert_eq!(group.node(b).unwrap().id, "Value2");
        assert_eq!(group.node(c).unwrap().id, "Pass1");
        assert_eq!(group.find_node("Value2"), Some(b));
    }

    #[test]
    fn test_connect_validates_direction() {
        let (mut group, k) = group_of(&["a", "b"]);
        assert!(matches!(
            group.connect(inp(k[0]), inp(k[1]), None),
            Err(GraphError::NotAnOutput(_))
        ));
        assert!(matches!(
            group.connect(out(k[0]), out(k[1]), None),
            Err(GraphError::NotAnInput(_))
        ));
        assert!(group.connect(out(k[0]), Endpoint::new(k[1], 7), None).is_err());
        assert_eq!(group.connection_keys().len(), 0);
    }

    #[test]
    fn test_connect_rejects_type_mismatch() {
        let (mut group, k) = group_of(&["a", "b"]);
        group.node_mut(k[1]).unwrap().properties[0].datatypes = Some(vec![crate::nodes::ValueKind::String]);
        assert!(matches!(
            group.connect(out(k[0]), inp(k[1]), None),
            Err(GraphError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_connect_rejects_cycles() {
        let (mut group, k) = group_of(&["a", "b", "c"]);
        group.connect(out(k[0]), inp(k[1]), None).unwrap();
        group.connect(out(k[1]), inp(k[2]), None).unwrap();

        assert!(matches!(
            group.connect(out(k[2]), inp(k[0]), None),
            Err(GraphError::WouldCycle { .. })
        ));
        assert!(matches!(
            group.connect(out(k[0]), inp(k[0]), None),
            Err(GraphError::WouldCycle { .. })
        ));
        assert_eq!(group.connection_keys().len(), 2);
    }

    #[test]
    fn test_check_forward_and_backward() {
        let (mut group, k) = group_of(&["a", "b", "c"]);
        let ab = group.connect(out(k[0]), inp(k[1]), None).unwrap();
        let bc = group.connect(out(k[1]), inp(k[2]), None).unwrap();

        assert!(group.check_forward(k[2], ab));
        assert!(!group.check_forward(k[0], bc));
        assert!(group.check_backward(k[0], bc));
        assert!(!group.check_backward(k[2], ab));
    }

    #[test]
    fn test_get_data_reads_through_producer() {
        let (mut group, k) = group_of(&["a", "b"]);
        group.node_mut(k[0]).unwrap().set_property("Out", 7.0);
        group.node_mut(k[1]).unwrap().set_property("In", 1.0);
        assert_eq!(group.get_data(inp(k[1])).unwrap().as_real(), Some(1.0));

        group.connect(out(k[0]), inp(k[1]), None).unwrap();
        let seen = group.get_data(inp(k[1])).unwrap();
        let produced = group.node(k[0]).unwrap().properties[1].local_data().unwrap().clone();
        assert!(SharedValue::ptr_eq(&seen, &produced));

        assert_eq!(group.property_connection(inp(k[1]), 0), Some(out(k[0])));
        assert_eq!(group.property_connection(out(k[0]), 0), Some(inp(k[1])));
        assert_eq!(group.property_connection(out(k[0]), 1), None);
    }

    #[test]
    fn test_half_connection_lifecycle() {
        let (mut group, k) = group_of(&["a", "b"]);
        let half = group.begin_connection(out(k[0]), Side::From).unwrap();
        assert_eq!(group.is_connected(out(k[0])), 1);
        assert!(!group.connection(half).unwrap().is_complete());

        let done = group.complete_connection(half, inp(k[1])).unwrap();
        assert_eq!(done, half);
        assert_eq!(group.is_connected(out(k[0])), 1);
        assert_eq!(group.is_connected(inp(k[1])), -1);

        group.detach(done, Side::To).unwrap();
        assert_eq!(group.is_connected(inp(k[1])), 0);
        assert!(group.has_connection(done));
        group.detach(done, Side::From).unwrap();
        assert!(!group.has_connection(done));
        assert_eq!(group.is_connected(out(k[0])), 0);
    }

    #[test]
    fn test_failed_completion_drops_half_connection() {
        let (mut group, k) = group_of(&["a"]);
        let half = group.begin_connection(out(k[0]), Side::From).unwrap();
        assert!(group.complete_connection(half, inp(k[0])).is_err());
        assert!(!group.has_connection(half));
        assert_eq!(group.is_connected(out(k[0])), 0);
    }

    #[test]
    fn test_begin_at_connected_input_picks_up_edge() {
        let (mut group, k) = group_of(&["a", "b", "c"]);
        let ab = group.connect(out(k[0]), inp(k[1]), None).unwrap();

        let picked = group.begin_connection(inp(k[1]), Side::To).unwrap();
        assert_eq!(picked, ab);
        assert_eq!(group.is_connected(inp(k[1])), 0);
        assert_eq!(group.connection_keys().len(), 1);
        let conn = group.connection(ab).unwrap();
        assert_eq!((conn.from, conn.to), (Some(out(k[0])), None));

        group.complete_connection(picked, inp(k[2])).unwrap();
        assert_eq!(group.is_connected(inp(k[2])), -1);
        assert_eq!(group.is_connected(out(k[0])), 1);

        // Unconnected inputs still start a fresh half connection
        let fresh = group.begin_connection(inp(k[1]), Side::To).unwrap();
        assert_ne!(fresh, ab);
        for key in [k[1], k[2]] {
            assert!(group.node(key).unwrap().properties[0].connections().len() <= 1);
        }
    }

    /// Counts hook calls across clones
    #[derive(Debug, Clone, Default)]
    struct Counting {
        connected: Rc<std::cell::Cell<usize>>,
        disconnected: Rc<std::cell::Cell<usize>>,
    }

    impl crate::nodes::NodeBehavior for Counting {
        fn connected(&mut self, _property: &str) -> bool {
            self.connected.set(self.connected.get() + 1);
            true
        }

        fn disconnected(&mut self, _property: &str, _side: Side) -> bool {
            self.disconnected.set(self.disconnected.get() + 1);
            false
        }

        fn clone_box(&self) -> Box<dyn crate::nodes::NodeBehavior> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn test_hooks_fire_once_per_endpoint() {
        let counts = Counting::default();
        let mut group = NodeGroup::new("root");
        let k: Vec<NodeKey> = ["a", "b", "c"]
            .iter()
            .map(|n| group.add_node(pass(n).with_behavior(counts.clone())))
            .collect();
        let seen = || (counts.connected.get(), counts.disconnected.get());

        group.connect(out(k[0]), inp(k[2]), None).unwrap();
        assert_eq!(seen(), (2, 0));
        assert!(group.take_redraw());
        assert!(!group.take_redraw());

        // Replacing the producer tears the old edge down at both ends
        group.connect(out(k[1]), inp(k[2]), None).unwrap();
        assert_eq!(seen(), (4, 2));

        let mut selection = vec![k[2]];
        group.delete_nodes(&mut selection);
        assert_eq!(seen(), (4, 4));
        assert_eq!(group.is_connected(out(k[1])), 0);

        group.take_redraw();
        let half = group.begin_connection(out(k[0]), Side::From).unwrap();
        group.detach(half, Side::From).unwrap();
        assert_eq!(seen(), (4, 5));
        assert!(!group.take_redraw());
    }

    #[test]
    fn test_delete_keeps_undeletable_in_selection() {
        let (mut group, k) = group_of(&["a", "b"]);
        group.node_mut(k[1]).unwrap().deletable = false;
        group.designate_output(Some(k[0])).unwrap();
        let mut selection = vec![k[0], k[1]];
        assert_eq!(group.delete_nodes(&mut selection), 1);
        assert_eq!(selection, vec![k[1]]);
        assert_eq!(group.len(), 1);
        assert_eq!(group.output(), None);
    }

    #[test]
    fn test_designate_requires_member() {
        let (mut group, k) = group_of(&["a"]);
        let (_, foreign) = group_of(&["x", "y", "z"]);
        assert!(group.designate_input(Some(k[0])).is_ok());
        assert_eq!(group.input(), Some(k[0]));
        assert!(matches!(group.designate_input(Some(foreign[2])), Err(GraphError::UnknownNode)));
        assert_eq!(group.input(), Some(k[0]));
        group.designate_input(None).unwrap();
        assert_eq!(group.input(), None);
    }

    #[test]
    fn test_duplicate_and_bounds() {
        let (mut group, k) = group_of(&["a"]);
        group.node_mut(k[0]).unwrap().position = DVec2::new(10.0, 10.0);
        let copy = group.duplicate_node(k[0]).unwrap();
        let node = group.node(copy).unwrap();
        assert_eq!(node.position, DVec2::new(30.0, 30.0));
        assert_eq!(node.id, "Pass1");

        let (lo, hi) = group.bounds(&[]).unwrap();
        assert_eq!(lo, DVec2::new(10.0, 10.0));
        assert_eq!(hi, DVec2::new(30.0 + node.width, 30.0 + node.height));
        assert!(group.bounds(&[copy]).is_some());
    }

    #[test]
    fn test_fit_view_centers_bounds() {
        let (mut group, k) = group_of(&["a"]);
        let node = group.node_mut(k[0]).unwrap();
        node.position = DVec2::new(100.0, 100.0);
        let (lo, hi) = group.bounds(&[]).unwrap();

        let viewport = (DVec2::ZERO, DVec2::new(400.0, 300.0));
        assert!(group.fit_view(&[], viewport));
        let center = group.transform.transform_point2((lo + hi) / 2.0);
        assert!((center - DVec2::new(200.0, 150.0)).length() < 1e-9);

        let mapped = group.transform.transform_point2(lo);
        assert!(mapped.x >= 15.0 - 1e-9 && mapped.y >= 15.0 - 1e-9);
        assert!(!NodeGroup::new("empty").fit_view(&[], viewport));
    }
}
