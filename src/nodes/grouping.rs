//! Group nodes and moving nodes in and out of them
//!
//! A group node owns a child [`NodeGroup`] holding two bridge nodes: a
//! `GroupInputs` node (the child's designated input) whose outputs mirror
//! the group node's inputs, and a `GroupOutputs` node (the designated
//! output) whose inputs become the group node's outputs. Edges crossing the
//! group boundary run through matching ports on both.

use std::collections::{HashMap, HashSet};

use glam::DVec2;
use log::{debug, warn};

use crate::constants::node_types;
use crate::error::{GraphError, Result};
use crate::nodes::graph::{ConnectionKey, Endpoint, NodeGroup, NodeKey};
use crate::nodes::hooks::NodeBehavior;
use crate::nodes::property::{NodeProperty, PropertyDirection};
use crate::nodes::value::Value;
use crate::nodes::{Node, NodeCategory, NodeFactory, NodeMetadata};

/// Behavior of group and bridge nodes: no computation of their own, and
/// ports may be added by files and regrouping
#[derive(Debug, Clone, Default)]
pub struct PortBehavior;

impl NodeBehavior for PortBehavior {
    fn accepts_dynamic_properties(&self) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn NodeBehavior> {
        Box::new(self.clone())
    }
}

/// Inside end of a group's inputs
#[derive(Default)]
pub struct GroupInputsFactory;

impl NodeFactory for GroupInputsFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            node_types::GROUP_INPUTS,
            "Group Inputs",
            NodeCategory::Group,
            "Values entering the enclosing group",
        )
        .hidden()
    }

    fn create() -> Node {
        let mut node = Node::new(node_types::GROUP_INPUTS, "Inputs").with_behavior(PortBehavior);
        node.deletable = false;
        node
    }
}

/// Inside end of a group's outputs
#[derive(Default)]
pub struct GroupOutputsFactory;

impl NodeFactory for GroupOutputsFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            node_types::GROUP_OUTPUTS,
            "Group Outputs",
            NodeCategory::Group,
            "Values leaving the enclosing group",
        )
        .hidden()
    }

    fn create() -> Node {
        let mut node = Node::new(node_types::GROUP_OUTPUTS, "Outputs").with_behavior(PortBehavior);
        node.deletable = false;
        node
    }
}

/// Empty group node with its two bridge nodes
#[derive(Default)]
pub struct GroupNodeFactory;

impl NodeFactory for GroupNodeFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            node_types::GROUP,
            "Group",
            NodeCategory::Group,
            "A sub-graph shown as a single node",
        )
    }

    fn create() -> Node {
        Node::new_group(node_types::GROUP, "Group", new_child_group()).with_behavior(PortBehavior)
    }
}

/// Child group with fresh bridge nodes designated as input and output
pub(crate) fn new_child_group() -> NodeGroup {
    let mut child = NodeGroup::new("");
    let ins = child.add_node(GroupInputsFactory::create());
    let outs = child.add_node(GroupOutputsFactory::create());
    // Both keys were just inserted
    let _ = child.designate_input(Some(ins));
    let _ = child.designate_output(Some(outs));
    child
}

/// `base`, or `base` with the smallest numeric suffix not already used as
/// a property name on `node`
fn unique_port_name(node: &Node, base: &str) -> String {
    if node.find_property(base).is_none() {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let name = format!("{}{}", base, n);
        if node.find_property(&name).is_none() {
            return name;
        }
        n += 1;
    }
}

/// A finished connection described by names, valid across groups
#[derive(Debug, Clone)]
struct NamedLink {
    from: NodeKey,
    from_prop: String,
    to: NodeKey,
    to_prop: String,
}

impl NodeGroup {
    fn named_links(&self) -> Vec<(ConnectionKey, NamedLink)> {
        self.connections()
            .filter_map(|(key, c)| {
                let (from, to) = (c.from?, c.to?);
                let from_prop = self.node(from.node)?.properties.get(from.property)?.name.clone();
                let to_prop = self.node(to.node)?.properties.get(to.property)?.name.clone();
                Some((
                    key,
                    NamedLink {
                        from: from.node,
                        from_prop,
                        to: to.node,
                        to_prop,
                    },
                ))
            })
            .collect()
    }

    /// Link by node keys and property names, logging and skipping failures
    fn relink(&mut self, from: NodeKey, from_prop: &str, to: NodeKey, to_prop: &str) -> bool {
        let endpoints = (
            self.node(from).and_then(|n| n.property_index(from_prop)),
            self.node(to).and_then(|n| n.property_index(to_prop)),
        );
        let (Some(fi), Some(ti)) = endpoints else {
            warn!("Cannot relink {} -> {}: property missing", from_prop, to_prop);
            return false;
        };
        match self.link_quiet(Endpoint::new(from, fi), Endpoint::new(to, ti)) {
            Ok(_) => true,
            Err(e) => {
                warn!("Severing connection while regrouping: {}", e);
                false
            }
        }
    }

    /// Move the selected nodes into a new group node, bridging connections
    /// that cross the selection boundary through ports on the group.
    ///
    /// Returns the new group node, or `None` for an empty selection. The
    /// selection is cleared either way.
    pub fn encapsulate(&mut self, selection: &mut Vec<NodeKey>) -> Result<Option<NodeKey>> {
        let members: Vec<NodeKey> = self
            .node_keys()
            .iter()
            .copied()
            .filter(|k| selection.contains(k))
            .collect();
        selection.clear();
        if members.is_empty() {
            return Ok(None);
        }
        let inside: HashSet<NodeKey> = members.iter().copied().collect();

        // Half connections do not survive regrouping
        let half: Vec<ConnectionKey> = self
            .connections()
            .filter(|(_, c)| !c.is_complete() && members.iter().any(|m| c.touches(*m)))
            .map(|(k, _)| k)
            .collect();
        for key in half {
            self.remove_connection(key);
        }

        let links: Vec<NamedLink> = self.named_links().into_iter().map(|(_, l)| l).collect();
        let centroid = members
            .iter()
            .filter_map(|k| self.node(*k))
            .map(|n| n.position)
            .sum::<DVec2>()
            / members.len() as f64;

        let mut child = new_child_group();
        child.set_style(self.style().clone());
        let (Some(ins), Some(outs)) = (child.input(), child.output()) else {
            return Err(GraphError::UnknownNode);
        };

        let mut group_node = GroupNodeFactory::create();
        group_node.position = centroid;

        // Inner bridge outputs carry the producer's value so type checks
        // inside the group still hold. Bridged inputs read through their link.
        let value_of = |g: &NodeGroup, key: NodeKey, prop: &str| -> Value {
            g.node(key)
                .and_then(|n| n.find_property(prop))
                .and_then(|p| p.local_data())
                .map(|v| v.as_ref().clone())
                .unwrap_or(Value::Real(0.0))
        };

        let mut in_ports: HashMap<(NodeKey, String), String> = HashMap::new();
        let mut out_ports: HashMap<(NodeKey, String), String> = HashMap::new();
        let mut incoming = Vec::new();
        let mut outgoing = Vec::new();
        for link in &links {
            match (inside.contains(&link.from), inside.contains(&link.to)) {
                (false, true) => {
                    let id = (link.from, link.from_prop.clone());
                    let port = match in_ports.get(&id) {
                        Some(name) => name.clone(),
                        None => {
                            let name = unique_port_name(&group_node, &link.from_prop);
                            let value = value_of(self, link.from, &link.from_prop);
                            group_node.add_property(NodeProperty::new(
                                PropertyDirection::Input,
                                true,
                                name.clone(),
                                None,
                            ));
                            if let Some(bridge) = child.node_mut(ins) {
                                bridge.add_property(NodeProperty::output(name.clone(), value));
                            }
                            in_ports.insert(id, name.clone());
                            name
                        }
                    };
                    incoming.push((link.clone(), port));
                }
                (true, false) => {
                    let id = (link.from, link.from_prop.clone());
                    let port = match out_ports.get(&id) {
                        Some(name) => name.clone(),
                        None => {
                            let name = unique_port_name(&group_node, &link.from_prop);
                            let value = value_of(self, link.from, &link.from_prop);
                            group_node.add_property(NodeProperty::output(name.clone(), value));
                            if let Some(bridge) = child.node_mut(outs) {
                                bridge.add_property(NodeProperty::new(
                                    PropertyDirection::Input,
                                    true,
                                    name.clone(),
                                    None,
                                ));
                            }
                            out_ports.insert(id, name.clone());
                            name
                        }
                    };
                    outgoing.push((link.clone(), port));
                }
                _ => {}
            }
        }
        for bridge in [ins, outs] {
            if let Some(node) = child.node_mut(bridge) {
                node.wrap();
            }
        }

        // Move the nodes; take_node severs every edge touching them
        let mut moved: HashMap<NodeKey, NodeKey> = HashMap::new();
        for key in &members {
            if let Some(node) = self.take_node(*key) {
                moved.insert(*key, child.add_node(node));
            }
        }

        let at = |k: NodeKey| moved.get(&k).copied();
        for link in &links {
            if let (Some(from), Some(to)) = (at(link.from), at(link.to)) {
                child.relink(from, &link.from_prop, to, &link.to_prop);
            }
        }
        for (link, port) in &incoming {
            if let Some(to) = at(link.to) {
                child.relink(ins, port, to, &link.to_prop);
            }
        }
        for (link, port) in &outgoing {
            if let Some(from) = at(link.from) {
                child.relink(from, &link.from_prop, outs, port);
            }
        }
        if let Some(bridge) = child.node_mut(ins) {
            bridge.wrap();
        }
        if let Some(bridge) = child.node_mut(outs) {
            bridge.wrap();
        }

        if let Some(g) = group_node.group_mut() {
            *g = child;
        }
        let gkey = self.add_node(group_node);

        let mut linked_inputs = HashSet::new();
        for (link, port) in &incoming {
            if linked_inputs.insert(port.clone()) {
                self.relink(link.from, &link.from_prop, gkey, port);
            }
        }
        for (link, port) in &outgoing {
            // A consumer that also feeds the selection would close a cycle
            self.relink(gkey, port, link.to, &link.to_prop);
        }

        debug!(
            "Encapsulated {} nodes into {} ({} in, {} out)",
            moved.len(),
            self.node(gkey).map(|n| n.id.as_str()).unwrap_or("?"),
            in_ports.len(),
            out_ports.len()
        );
        self.update(gkey);
        Ok(Some(gkey))
    }

    /// Dissolve a group node, moving its nodes (minus the bridges) back into
    /// this group and joining bridged connections directly. Returns the keys
    /// of the moved nodes.
    pub fn ungroup(&mut self, key: NodeKey) -> Result<Vec<NodeKey>> {
        let node = self.node(key).ok_or(GraphError::UnknownNode)?;
        if !node.is_group() {
            return Err(GraphError::NotAGroup(node.id.clone()));
        }

        let outer: Vec<NamedLink> = self
            .named_links()
            .into_iter()
            .map(|(_, l)| l)
            .filter(|l| l.from == key || l.to == key)
            .collect();

        let Some(mut group_node) = self.take_node(key) else {
            return Err(GraphError::UnknownNode);
        };
        let Some(mut child) = group_node.group_mut().map(std::mem::take) else {
            return Err(GraphError::NotAGroup(group_node.id));
        };
        child.clear_half_connections();

        let bridges = [child.input(), child.output()];
        let is_bridge = |k: NodeKey| bridges.contains(&Some(k));
        let inner: Vec<NamedLink> = child.named_links().into_iter().map(|(_, l)| l).collect();

        let mut moved: HashMap<NodeKey, NodeKey> = HashMap::new();
        let mut order = Vec::new();
        for ckey in child.node_keys().to_vec() {
            if is_bridge(ckey) {
                continue;
            }
            if let Some(n) = child.take_node(ckey) {
                let pkey = self.add_node(n);
                moved.insert(ckey, pkey);
                order.push(pkey);
            }
        }

        let at = |k: NodeKey| moved.get(&k).copied();
        for link in &inner {
            match (at(link.from), at(link.to)) {
                (Some(from), Some(to)) => {
                    self.relink(from, &link.from_prop, to, &link.to_prop);
                }
                (None, Some(to)) if is_bridge(link.from) => {
                    // Bridge port -> inner consumer: join with the outer producer
                    for o in outer.iter().filter(|o| o.to == key && o.to_prop == link.from_prop) {
                        self.relink(o.from, &o.from_prop, to, &link.to_prop);
                    }
                }
                (Some(from), None) if is_bridge(link.to) => {
                    for o in outer.iter().filter(|o| o.from == key && o.from_prop == link.to_prop) {
                        self.relink(from, &link.from_prop, o.to, &o.to_prop);
                    }
                }
                _ => debug!("Dropping bridge-to-bridge link {}", link.from_prop),
            }
        }

        self.update_sources();
        Ok(order)
    }
}
