use super::*;
use crate::value::{PinType, Value, ValueKind};

fn float_var(name: &str) -> VariableDef {
    VariableDef {
        name: name.to_string(),
        ty: PinType::scalar(ValueKind::Float),
        default: Value::Float(0.0),
        input: false,
        output: false,
    }
}

#[test]
fn ids_follow_insertion_order() {
    let mut g = Graph::new();
    let a = g.add_node("math.add", serde_json::Value::Null);
    let b = g.add_node("math.subtract", serde_json::Value::Null);
    assert_eq!(a, NodeId(0));
    assert_eq!(b, NodeId(1));
    let order: Vec<NodeId> = g.nodes().map(|(id, _)| id).collect();
    assert_eq!(order, vec![a, b]);
}

#[test]
fn removed_ids_are_never_reused() {
    let mut g = Graph::new();
    let a = g.add_node("math.add", serde_json::Value::Null);
    g.remove_node(a).unwrap();
    let b = g.add_node("math.add", serde_json::Value::Null);
    assert_ne!(a, b);
    assert!(g.node(a).is_none());
    assert_eq!(g.node_count(), 1);
}

#[test]
fn remove_cascades_links_edges_and_entry() {
    let mut g = Graph::new();
    let a = g.add_node("math.add", serde_json::Value::Null);
    let b = g.add_node("var.set", serde_json::json!({"name": "out"}));
    g.add_link(PinRef::new(a, "result"), PinRef::new(b, "value"))
        .unwrap();
    g.add_control_edge(b, "next", b).ok();
    g.set_entry(b).unwrap();

    g.remove_node(b).unwrap();
    assert!(g.links().is_empty());
    assert!(g.control_edges().is_empty());
    assert_eq!(g.entry(), None);
    assert!(g.node(a).is_some());
}

#[test]
fn endpoints_must_be_live() {
    let mut g = Graph::new();
    let a = g.add_node("math.add", serde_json::Value::Null);
    let dead = NodeId(7);
    assert!(
        g.add_link(PinRef::new(a, "result"), PinRef::new(dead, "value"))
            .is_err()
    );
    assert!(g.add_control_edge(a, "next", dead).is_err());
    assert!(g.set_entry(dead).is_err());
}

#[test]
fn duplicate_variable_names_are_rejected() {
    let mut g = Graph::new();
    g.declare_variable(float_var("speed")).unwrap();
    assert!(g.declare_variable(float_var("speed")).is_err());
    assert_eq!(g.variables().len(), 1);
}

#[test]
fn graph_roundtrips_through_json() {
    let mut g = Graph::new();
    g.declare_variable(float_var("speed")).unwrap();
    g.set_skeleton(Skeleton {
        bones: vec!["root".to_string(), "spine".to_string()],
    });
    let a = g.add_node("var.get", serde_json::json!({"name": "speed"}));
    let b = g.add_node("var.set", serde_json::json!({"name": "speed"}));
    g.add_link(PinRef::new(a, "value"), PinRef::new(b, "value"))
        .unwrap();
    g.set_entry(b).unwrap();

    let text = g.to_json().unwrap();
    let back = Graph::from_json(&text).unwrap();
    assert_eq!(back.node_count(), g.node_count());
    assert_eq!(back.links(), g.links());
    assert_eq!(back.entry(), g.entry());
    assert_eq!(back.variables(), g.variables());
    assert_eq!(back.skeleton(), g.skeleton());
}

#[test]
fn malformed_json_reports_a_serde_error() {
    assert!(matches!(
        Graph::from_json("{ not a graph"),
        Err(RigError::Serde(_))
    ));
}
