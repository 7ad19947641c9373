use super::*;
use crate::{
    foundation::error::ValidationReport,
    graph::model::{PinRef, VariableDef},
    units::UnitCatalog,
    value::{PinType, Value, ValueKind},
};

fn catalog() -> UnitCatalog {
    UnitCatalog::with_builtins()
}

fn has_issue(report: &ValidationReport, needle: &str) -> bool {
    report.issues.iter().any(|i| i.reason.contains(needle))
}

fn float_var(name: &str, default: f64) -> VariableDef {
    VariableDef {
        name: name.to_string(),
        ty: PinType::scalar(ValueKind::Float),
        default: Value::Float(default),
        input: false,
        output: false,
    }
}

/// Smallest graph that validates cleanly: copy one variable into another.
fn minimal_valid() -> Graph {
    let mut g = Graph::new();
    g.declare_variable(float_var("k", 5.0)).unwrap();
    g.declare_variable(float_var("out", 0.0)).unwrap();
    let get = g.add_node("var.get", serde_json::json!({"name": "k"}));
    let set = g.add_node("var.set", serde_json::json!({"name": "out"}));
    g.add_link(PinRef::new(get, "value"), PinRef::new(set, "value"))
        .unwrap();
    g.set_entry(set).unwrap();
    g
}

#[test]
fn clean_graph_produces_empty_report() {
    let report = minimal_valid().validate(&catalog());
    assert!(report.is_empty(), "unexpected issues: {report}");
}

#[test]
fn unknown_kind_and_missing_entry_are_reported() {
    let mut g = Graph::new();
    g.add_node("rig.frobnicate", serde_json::Value::Null);
    let report = g.validate(&catalog());
    assert!(has_issue(&report, "unknown unit kind"));
    assert!(has_issue(&report, "no entry node"));
}

#[test]
fn link_type_mismatch_is_reported() {
    let mut g = minimal_valid();
    let make = g.add_node("vec3.make", serde_json::Value::Null);
    let add = g.add_node("math.add", serde_json::Value::Null);
    g.add_link(PinRef::new(make, "result"), PinRef::new(add, "a"))
        .unwrap();
    let report = g.validate(&catalog());
    assert!(has_issue(&report, "incompatible type"));
}

#[test]
fn int_may_feed_float_inputs() {
    let mut g = minimal_valid();
    g.declare_variable(VariableDef {
        name: "n".to_string(),
        ty: PinType::scalar(ValueKind::Int),
        default: Value::Int(0),
        input: false,
        output: false,
    })
    .unwrap();
    let get = g.add_node("var.get", serde_json::json!({"name": "n"}));
    let add = g.add_node("math.add", serde_json::Value::Null);
    g.add_link(PinRef::new(get, "value"), PinRef::new(add, "a"))
        .unwrap();
    let report = g.validate(&catalog());
    assert!(report.is_empty(), "unexpected issues: {report}");
}

#[test]
fn second_link_into_same_input_is_reported() {
    let mut g = minimal_valid();
    let get2 = g.add_node("var.get", serde_json::json!({"name": "k"}));
    let set = NodeId(1);
    g.add_link(PinRef::new(get2, "value"), PinRef::new(set, "value"))
        .unwrap();
    let report = g.validate(&catalog());
    assert!(has_issue(&report, "more than one incoming link"));
}

#[test]
fn unknown_pins_are_reported() {
    let mut g = minimal_valid();
    let add = g.add_node("math.add", serde_json::Value::Null);
    g.add_link(PinRef::new(add, "sum"), PinRef::new(add, "nope"))
        .unwrap();
    let report = g.validate(&catalog());
    assert!(has_issue(&report, "no output pin named 'sum'"));
    assert!(has_issue(&report, "no input pin named 'nope'"));
}

#[test]
fn data_cycle_is_reported() {
    let mut g = minimal_valid();
    let a = g.add_node("math.add", serde_json::Value::Null);
    let b = g.add_node("math.add", serde_json::Value::Null);
    g.add_link(PinRef::new(a, "result"), PinRef::new(b, "a"))
        .unwrap();
    g.add_link(PinRef::new(b, "result"), PinRef::new(a, "a"))
        .unwrap();
    let report = g.validate(&catalog());
    assert!(has_issue(&report, "data links form a cycle"));
}

#[test]
fn control_cycle_is_reported() {
    let mut g = minimal_valid();
    let s1 = g.add_node("var.set", serde_json::json!({"name": "out"}));
    let s2 = g.add_node("var.set", serde_json::json!({"name": "out"}));
    g.add_control_edge(s1, "next", s2).unwrap();
    g.add_control_edge(s2, "next", s1).unwrap();
    let report = g.validate(&catalog());
    assert!(has_issue(&report, "control edges form a cycle"));
}

#[test]
fn control_slot_rules_are_enforced() {
    let mut g = minimal_valid();
    let set = NodeId(1);
    let get = NodeId(0);
    let branch = g.add_node("flow.branch", serde_json::Value::Null);
    g.add_control_edge(branch, "maybe", set).unwrap();
    g.add_control_edge(get, "next", set).unwrap();
    g.add_control_edge(branch, "then", get).unwrap();
    let report = g.validate(&catalog());
    assert!(has_issue(&report, "no control slot named 'maybe'"));
    assert!(has_issue(&report, "pure nodes have no control slots"));
    assert!(has_issue(&report, "targets a pure node"));
}

#[test]
fn pure_entry_is_reported() {
    let mut g = Graph::new();
    let add = g.add_node("math.add", serde_json::Value::Null);
    g.set_entry(add).unwrap();
    let report = g.validate(&catalog());
    assert!(has_issue(&report, "entry node must sit on the execution chain"));
}

#[test]
fn unknown_variable_is_reported() {
    let mut g = minimal_valid();
    g.add_node("var.get", serde_json::json!({"name": "ghost"}));
    let report = g.validate(&catalog());
    assert!(has_issue(&report, "unknown variable 'ghost'"));
}

#[test]
fn required_unlinked_input_is_reported() {
    let mut g = minimal_valid();
    g.add_node("var.set", serde_json::json!({"name": "out"}));
    let report = g.validate(&catalog());
    assert!(has_issue(&report, "required input 'value' is unlinked"));
}

#[test]
fn removal_leaves_a_cleanly_validating_graph() {
    let mut g = minimal_valid();
    let set = NodeId(1);
    g.remove_node(set).unwrap();
    let report = g.validate(&catalog());
    // The link died with the node; only the entry designation is gone.
    assert!(has_issue(&report, "no entry node"));
    assert_eq!(report.issues.len(), 1, "unexpected issues: {report}");
}
