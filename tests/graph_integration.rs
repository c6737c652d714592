use laidout_nodes::nodes::math::MathOp;
use laidout_nodes::nodes::{Endpoint, NodeGroup, NodeKey, NodeRegistry, NodeStatus, Side};
use laidout_nodes::{FileManager, GraphError};
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn endpoint(group: &NodeGroup, node: NodeKey, property: &str) -> Endpoint {
    let index = group.node(node).unwrap().property_index(property).unwrap();
    Endpoint::new(node, index)
}

fn link(group: &mut NodeGroup, from: NodeKey, out: &str, to: NodeKey, input: &str) {
    let from = endpoint(group, from, out);
    let to = endpoint(group, to, input);
    group.connect(from, to, None).unwrap();
}

fn math(group: &mut NodeGroup, registry: &NodeRegistry, op: MathOp) -> NodeKey {
    let key = group.create_node(registry, "Math").unwrap();
    group.node_mut(key).unwrap().set_property("Op", op.enum_value());
    key
}

fn result(group: &NodeGroup, key: NodeKey) -> f64 {
    let prop = group.node(key).unwrap().find_property("Result").unwrap();
    prop.local_data().unwrap().as_real().unwrap()
}

/// Every input property holds at most one connection
fn assert_single_producers(group: &NodeGroup) {
    for (_, node) in group.nodes() {
        for prop in node.properties.iter().filter(|p| p.is_input()) {
            assert!(prop.connections().len() <= 1, "{}.{}", node.id, prop.name);
        }
    }
}

#[test]
fn single_producer_per_input() {
    init_logging();
    let registry = NodeRegistry::default();
    let mut group = NodeGroup::new("root");
    let a = group.create_node(&registry, "Value").unwrap();
    let b = group.create_node(&registry, "Value").unwrap();
    let m = math(&mut group, &registry, MathOp::Add);

    link(&mut group, a, "V", m, "A");
    link(&mut group, b, "V", m, "A");
    link(&mut group, a, "V", m, "B");
    assert_single_producers(&group);

    let key = group.node(m).unwrap().find_property("A").unwrap().connections()[0];
    group.disconnect(key).unwrap();
    link(&mut group, a, "V", m, "A");
    link(&mut group, b, "V", m, "A");
    assert_single_producers(&group);
    assert_eq!(group.connections().count(), 2);

    // Dragging from a fed input lifts its edge instead of adding one
    let a_in = endpoint(&group, m, "A");
    let lifted = group.begin_connection(a_in, Side::To).unwrap();
    assert_single_producers(&group);
    assert_eq!(group.is_connected(a_in), 0);
    group.complete_connection(lifted, a_in).unwrap();
    assert_single_producers(&group);
    assert_eq!(group.is_connected(a_in), -1);
    assert_eq!(group.connections().count(), 2);
}

#[test]
fn outputs_fan_out() {
    init_logging();
    let registry = NodeRegistry::default();
    let mut group = NodeGroup::new("root");
    let v = group.create_node(&registry, "Value").unwrap();
    let consumers: Vec<NodeKey> = (0..3).map(|_| math(&mut group, &registry, MathOp::Add)).collect();
    for c in &consumers {
        link(&mut group, v, "V", *c, "A");
    }
    let out = endpoint(&group, v, "V");
    assert_eq!(group.is_connected(out), 3);

    let first = group.node(v).unwrap().find_property("V").unwrap().connections()[0];
    group.disconnect(first).unwrap();
    assert_eq!(group.is_connected(out), 2);
    for c in &consumers[1..] {
        assert_eq!(group.is_connected(endpoint(&group, *c, "A")), -1);
    }
}

#[test]
fn update_propagates_along_a_chain() {
    init_logging();
    let registry = NodeRegistry::default();
    let mut group = NodeGroup::new("root");
    let a = group.create_node(&registry, "Value").unwrap();
    let b = math(&mut group, &registry, MathOp::Add);
    let c = math(&mut group, &registry, MathOp::Multiply);
    link(&mut group, a, "V", b, "A");
    link(&mut group, b, "Result", c, "A");
    group.node_mut(b).unwrap().set_property("B", 1.0);
    group.node_mut(c).unwrap().set_property("B", 10.0);

    group.node_mut(a).unwrap().set_property("V", 4.0);
    assert_eq!(group.status(b), NodeStatus::NeedsUpdate);
    assert_eq!(group.update(a), NodeStatus::Ok);

    let origin = group.node(a).unwrap().modtime;
    for key in [b, c] {
        assert!(group.node(key).unwrap().modtime >= origin);
        assert_eq!(group.status(key), NodeStatus::Ok);
    }
    assert_eq!(result(&group, c), 50.0);
}

#[test]
fn serialization_round_trips() {
    init_logging();
    let registry = NodeRegistry::default();
    let mut group = NodeGroup::new("root");
    let v = group.create_node(&registry, "Value").unwrap();
    let m = math(&mut group, &registry, MathOp::Subtract);
    let lone = group.create_node(&registry, "Value").unwrap();
    group.node_mut(v).unwrap().set_property("V", 9.5);
    group.node_mut(m).unwrap().set_property("B", 0.25);
    group.node_mut(lone).unwrap().set_property("V", -3.0);
    group.node_mut(lone).unwrap().collapse(laidout_nodes::nodes::CollapseState::Collapse);
    link(&mut group, v, "V", m, "A");

    let text = group.to_text();
    let (loaded, report) = NodeGroup::from_text(&text, &registry).unwrap();
    assert!(report.is_clean());
    assert_eq!(loaded.to_text(), text);

    let m2 = loaded.find_node("Math1").unwrap();
    assert_eq!(result(&loaded, m2), 9.25);
    assert!(loaded.node(loaded.find_node("Value2").unwrap()).unwrap().collapsed);
}

#[test]
fn division_by_zero_is_a_node_error() {
    init_logging();
    let registry = NodeRegistry::default();
    let mut group = NodeGroup::new("root");
    let m = math(&mut group, &registry, MathOp::Divide);
    let node = group.node_mut(m).unwrap();
    node.set_property("A", 4.0);
    node.set_property("B", 0.0);

    assert_eq!(group.update(m), NodeStatus::Error);
    assert_eq!(group.status(m), NodeStatus::Error);
    assert!(result(&group, m).is_finite());
}

#[test]
fn deleting_a_node_removes_its_edges() {
    init_logging();
    let registry = NodeRegistry::default();
    let mut group = NodeGroup::new("root");
    let src = group.create_node(&registry, "Value").unwrap();
    let mid = math(&mut group, &registry, MathOp::Add);
    let x = math(&mut group, &registry, MathOp::Add);
    let y = math(&mut group, &registry, MathOp::Add);
    link(&mut group, src, "V", mid, "A");
    link(&mut group, mid, "Result", x, "A");
    link(&mut group, mid, "Result", y, "B");
    assert_eq!(group.connections().count(), 3);

    let mut selection = vec![mid];
    assert_eq!(group.delete_nodes(&mut selection), 1);
    assert!(selection.is_empty());
    assert_eq!(group.connections().count(), 0);
    assert_eq!(group.is_connected(endpoint(&group, src, "V")), 0);
    assert_eq!(group.is_connected(endpoint(&group, x, "A")), 0);
    assert_eq!(group.is_connected(endpoint(&group, y, "B")), 0);
}

#[test]
fn connect_replaces_prior_producer() {
    init_logging();
    let registry = NodeRegistry::default();
    let mut group = NodeGroup::new("root");
    let first = group.create_node(&registry, "Value").unwrap();
    let second = group.create_node(&registry, "Value").unwrap();
    let m = math(&mut group, &registry, MathOp::Add);
    group.node_mut(second).unwrap().set_property("V", 5.0);

    link(&mut group, first, "V", m, "A");
    link(&mut group, second, "V", m, "A");

    let a = endpoint(&group, m, "A");
    assert_eq!(group.is_connected(a), -1);
    assert_eq!(group.is_connected(endpoint(&group, first, "V")), 0);
    assert_eq!(group.property_connection(a, 0).map(|e| e.node), Some(second));
    assert_eq!(result(&group, m), 5.0);
}

#[test]
fn layout_is_idempotent() {
    let registry = NodeRegistry::default();
    let mut group = NodeGroup::new("root");
    let key = group.create_node(&registry, "NewImage").unwrap();
    let node = group.node_mut(key).unwrap();

    assert!(node.wrap_full());
    let first = (node.width, node.height, node.properties.clone());
    assert!(node.wrap_full());
    assert_eq!(first.0.to_bits(), node.width.to_bits());
    assert_eq!(first.1.to_bits(), node.height.to_bits());
    for (a, b) in first.2.iter().zip(&node.properties) {
        assert_eq!((a.y, a.width, a.height, a.anchor), (b.y, b.width, b.height, b.anchor));
    }
}

#[test]
fn cycles_are_rejected() {
    init_logging();
    let registry = NodeRegistry::default();
    let mut group = NodeGroup::new("root");
    let a = math(&mut group, &registry, MathOp::Add);
    let b = math(&mut group, &registry, MathOp::Add);
    link(&mut group, a, "Result", b, "A");

    let from = endpoint(&group, b, "Result");
    let to = endpoint(&group, a, "A");
    assert!(matches!(group.connect(from, to, None), Err(GraphError::WouldCycle { .. })));
    assert_eq!(group.connections().count(), 1);
}

#[test]
fn grouping_keeps_results() {
    init_logging();
    let registry = NodeRegistry::default();
    let mut group = NodeGroup::new("root");
    let v = group.create_node(&registry, "Value").unwrap();
    let add = math(&mut group, &registry, MathOp::Add);
    let mul = math(&mut group, &registry, MathOp::Multiply);
    let tail = math(&mut group, &registry, MathOp::Subtract);
    link(&mut group, v, "V", add, "A");
    link(&mut group, add, "Result", mul, "A");
    link(&mut group, mul, "Result", tail, "A");
    group.node_mut(add).unwrap().set_property("B", 2.0);
    group.node_mut(mul).unwrap().set_property("B", 3.0);
    group.node_mut(v).unwrap().set_property("V", 1.0);
    group.update(v);
    assert_eq!(result(&group, tail), 9.0);

    let mut selection = vec![add, mul];
    let g = group.encapsulate(&mut selection).unwrap().unwrap();
    assert_eq!(group.len(), 3);

    group.node_mut(v).unwrap().set_property("V", 2.0);
    group.update(v);
    assert_eq!(result(&group, tail), 12.0);

    let (loaded, report) = NodeGroup::from_text(&group.to_text(), &registry).unwrap();
    assert!(report.is_clean());
    assert_eq!(result(&loaded, loaded.find_node("Math3").unwrap()), 12.0);

    let moved = group.ungroup(g).unwrap();
    assert_eq!(moved.len(), 2);
    assert_eq!(group.len(), 4);
    assert_eq!(group.connections().count(), 3);
    assert_eq!(result(&group, tail), 12.0);
}

#[test]
fn file_round_trip() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.nodes");
    let registry = NodeRegistry::default();

    let mut group = NodeGroup::new("root");
    let image = group.create_node(&registry, "NewImage").unwrap();
    let color = group.create_node(&registry, "Color").unwrap();
    link(&mut group, color, "Color", image, "Initial Color");
    group.node_mut(image).unwrap().set_property("Width", 640_i64);
    group.update(image);

    let mut files = FileManager::new();
    files.save_to_file(&path, &group).unwrap();
    let (loaded, report) = files.load_from_file(&path, &registry).unwrap();
    assert!(report.is_clean());
    assert_eq!(loaded.to_text(), group.to_text());

    let key = loaded.find_node("NewImage1").unwrap();
    let out = loaded.node(key).unwrap().find_property("Image").unwrap();
    assert_eq!(out.local_data().unwrap().as_image().unwrap().width, 640);
}
