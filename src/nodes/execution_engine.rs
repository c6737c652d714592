//! Node graph update engine
//!
//! Staleness is tracked with logical timestamps:
//! - Every property and node carries a [`Timestamp`]
//! - A node needs an update when one of its outputs is older than the
//!   newest of its inputs (a connected input counts with its producer's time)
//! - [`NodeGroup::update`] recomputes a node and pushes forward through
//!   outgoing connections, stamping everything it touches with one tick

use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};

use super::graph::{Endpoint, NodeGroup, NodeKey};
use super::hooks::{NodeInputs, NodeOutputs};
use super::node::NodeKind;

static CLOCK: AtomicU64 = AtomicU64::new(0);

/// Logical modification time. Later ticks compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Never modified
    pub const EPOCH: Timestamp = Timestamp(0);

    /// A tick later than every tick handed out before
    pub fn now() -> Timestamp {
        Timestamp(CLOCK.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn is_epoch(&self) -> bool {
        self.0 == 0
    }
}

/// Represents the evaluation state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeStatus {
    /// Outputs are current
    Ok,
    /// Some output is older than an input
    NeedsUpdate,
    /// The node cannot compute from its current inputs
    Error,
}

impl NodeGroup {
    /// Recompute `key` and everything downstream of it. Returns the node's
    /// status afterwards.
    pub fn update(&mut self, key: NodeKey) -> NodeStatus {
        if !self.contains(key) {
            warn!("Update requested for a node outside this group");
            return NodeStatus::Error;
        }
        let tick = Timestamp::now();
        self.update_pass(key, tick)
    }

    fn update_pass(&mut self, key: NodeKey, tick: Timestamp) -> NodeStatus {
        if self.recompute(key, tick) == NodeStatus::Error {
            if let Some(node) = self.node(key) {
                debug!("Node {} reported an error, not propagating", node.id);
            }
            return NodeStatus::Error;
        }

        // Snapshot first: nothing below may change the graph's shape, but the
        // walk must not hold a borrow of it either
        for next in self.downstream_of(key) {
            self.update_pass(next, tick);
        }

        if let Some(node) = self.node_mut(key) {
            node.modtime = tick;
        }
        self.status(key)
    }

    /// Update every node with no connected input, in node order
    pub fn update_sources(&mut self) {
        let sources: Vec<NodeKey> = self
            .nodes()
            .filter(|(_, n)| !n.has_connected_inputs())
            .map(|(k, _)| k)
            .collect();
        for key in sources {
            if self.contains(key) {
                self.update(key);
            }
        }
    }

    /// Input values of `key`, resolved through connections
    pub fn gather_inputs(&self, key: NodeKey) -> NodeInputs {
        let Some(node) = self.node(key) else {
            return NodeInputs::default();
        };
        let values = node
            .properties
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_input())
            .map(|(i, p)| (p.name.clone(), self.get_data(Endpoint::new(key, i))))
            .collect();
        NodeInputs::new(values)
    }

    fn recompute(&mut self, key: NodeKey, tick: Timestamp) -> NodeStatus {
        let inputs = self.gather_inputs(key);
        let Some(node) = self.node_mut(key) else {
            return NodeStatus::Error;
        };

        if let NodeKind::Group(child) = &mut node.kind {
            let status = child.run_as_node(&inputs);
            let produced = child.produced_outputs();
            let mut outputs = NodeOutputs::new(&mut node.properties, tick);
            for (name, value) in produced {
                match value {
                    Some(v) => {
                        outputs.share(&name, v);
                    }
                    None => debug!("Group output {} has no value", name),
                }
            }
            return status;
        }

        let (behavior, properties) = node.parts_mut();
        let mut outputs = NodeOutputs::new(properties, tick);
        behavior.update(&inputs, &mut outputs)
    }

    /// Feed `inputs` to the designated input node, update the sub-graph,
    /// and report [`NodeStatus::Error`] if any node inside is in error.
    fn run_as_node(&mut self, inputs: &NodeInputs) -> NodeStatus {
        match self.input() {
            Some(bridge) => {
                if let Some(node) = self.node_mut(bridge) {
                    let now = Timestamp::now();
                    for (name, value) in inputs.iter() {
                        let Some(prop) = node.find_property_mut(name) else {
                            continue;
                        };
                        match value {
                            Some(v) => {
                                prop.share_data(v.clone());
                            }
                            // Port lost its producer, nothing stale flows in
                            None => prop.clear_data(),
                        }
                        prop.modtime = now;
                    }
                }
                self.update(bridge);
            }
            None => self.update_sources(),
        }

        if self.nodes().any(|(k, _)| self.status(k) == NodeStatus::Error) {
            NodeStatus::Error
        } else {
            NodeStatus::Ok
        }
    }

    /// Values arriving at the designated output node, by property name
    fn produced_outputs(&self) -> Vec<(String, Option<super::value::SharedValue>)> {
        let Some(bridge) = self.output() else {
            return Vec::new();
        };
        let Some(node) = self.node(bridge) else {
            return Vec::new();
        };
        node.properties
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_input())
            .map(|(i, p)| (p.name.clone(), self.get_data(Endpoint::new(bridge, i))))
            .collect()
    }

    /// Timestamp of the value seen at `endpoint`
    fn effective_modtime(&self, endpoint: Endpoint) -> Timestamp {
        let Some(prop) = self
            .node(endpoint.node)
            .and_then(|n| n.properties.get(endpoint.property))
        else {
            return Timestamp::EPOCH;
        };
        if prop.is_input() {
            if let Some(from) = self.property_connection(endpoint, 0) {
                if let Some(p) = self.node(from.node).and_then(|n| n.properties.get(from.property)) {
                    return p.modtime;
                }
            }
        }
        prop.modtime
    }

    /// Current status of `key`: the timestamp check, overridden by an error
    /// reported by the node itself
    pub fn status(&self, key: NodeKey) -> NodeStatus {
        let Some(node) = self.node(key) else {
            return NodeStatus::Error;
        };

        let latest = node
            .properties
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_input())
            .map(|(i, _)| self.effective_modtime(Endpoint::new(key, i)))
            .max()
            .unwrap_or(Timestamp::EPOCH);

        let timing = if latest.is_epoch() {
            NodeStatus::Ok
        } else if node
            .properties
            .iter()
            .any(|p| !p.is_input() && p.modtime < latest)
        {
            NodeStatus::NeedsUpdate
        } else {
            NodeStatus::Ok
        };

        let own = match &node.kind {
            NodeKind::Group(child) => {
                if child.nodes().any(|(k, _)| child.status(k) == NodeStatus::Error) {
                    NodeStatus::Error
                } else {
                    NodeStatus::Ok
                }
            }
            NodeKind::Regular => node.behavior().status(&self.gather_inputs(key)),
        };

        timing.max(own)
    }
}
