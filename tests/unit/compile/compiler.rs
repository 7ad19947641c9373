use super::*;
use std::collections::BTreeSet;

use crate::{
    graph::model::VariableDef,
    value::{PinType, ValueKind},
};

fn catalog() -> UnitCatalog {
    UnitCatalog::with_builtins()
}

fn var(name: &str, ty: PinType, default: Value, input: bool, output: bool) -> VariableDef {
    VariableDef {
        name: name.to_string(),
        ty,
        default,
        input,
        output,
    }
}

fn float_var(name: &str, default: f64, input: bool, output: bool) -> VariableDef {
    var(
        name,
        PinType::scalar(ValueKind::Float),
        Value::Float(default),
        input,
        output,
    )
}

/// `out = k`, entirely lowered to copies.
fn constant_graph(k: f64) -> Graph {
    let mut g = Graph::new();
    g.declare_variable(float_var("k", k, false, false)).unwrap();
    g.declare_variable(float_var("out", 0.0, false, true)).unwrap();
    let get = g.add_node("var.get", serde_json::json!({"name": "k"}));
    let set = g.add_node("var.set", serde_json::json!({"name": "out"}));
    g.add_link(PinRef::new(get, "value"), PinRef::new(set, "value"))
        .unwrap();
    g.set_entry(set).unwrap();
    g
}

/// `out = ((x + one) + one) + one` through three pure adds.
fn chain_graph() -> Graph {
    let mut g = Graph::new();
    g.declare_variable(float_var("x", 2.0, true, false)).unwrap();
    g.declare_variable(float_var("one", 1.0, false, false)).unwrap();
    g.declare_variable(float_var("out", 0.0, false, true)).unwrap();
    let get_x = g.add_node("var.get", serde_json::json!({"name": "x"}));
    let get_one = g.add_node("var.get", serde_json::json!({"name": "one"}));
    let mut feed = PinRef::new(get_x, "value");
    for _ in 0..3 {
        let add = g.add_node("math.add", serde_json::Value::Null);
        g.add_link(feed, PinRef::new(add, "a")).unwrap();
        g.add_link(PinRef::new(get_one, "value"), PinRef::new(add, "b"))
            .unwrap();
        feed = PinRef::new(add, "result");
    }
    let set = g.add_node("var.set", serde_json::json!({"name": "out"}));
    g.add_link(feed, PinRef::new(set, "value")).unwrap();
    g.set_entry(set).unwrap();
    g
}

/// `out = flag ? x + one : x - one`.
fn branch_graph() -> Graph {
    let mut g = Graph::new();
    g.declare_variable(var(
        "flag",
        PinType::scalar(ValueKind::Bool),
        Value::Bool(false),
        true,
        false,
    ))
    .unwrap();
    g.declare_variable(float_var("x", 0.0, true, false)).unwrap();
    g.declare_variable(float_var("one", 1.0, false, false)).unwrap();
    g.declare_variable(float_var("out", 0.0, false, true)).unwrap();
    let get_flag = g.add_node("var.get", serde_json::json!({"name": "flag"}));
    let get_x = g.add_node("var.get", serde_json::json!({"name": "x"}));
    let get_one = g.add_node("var.get", serde_json::json!({"name": "one"}));
    let branch = g.add_node("flow.branch", serde_json::Value::Null);
    g.add_link(PinRef::new(get_flag, "value"), PinRef::new(branch, "condition"))
        .unwrap();

    let add = g.add_node("math.add", serde_json::Value::Null);
    g.add_link(PinRef::new(get_x, "value"), PinRef::new(add, "a"))
        .unwrap();
    g.add_link(PinRef::new(get_one, "value"), PinRef::new(add, "b"))
        .unwrap();
    let set_then = g.add_node("var.set", serde_json::json!({"name": "out"}));
    g.add_link(PinRef::new(add, "result"), PinRef::new(set_then, "value"))
        .unwrap();

    let sub = g.add_node("math.subtract", serde_json::Value::Null);
    g.add_link(PinRef::new(get_x, "value"), PinRef::new(sub, "a"))
        .unwrap();
    g.add_link(PinRef::new(get_one, "value"), PinRef::new(sub, "b"))
        .unwrap();
    let set_else = g.add_node("var.set", serde_json::json!({"name": "out"}));
    g.add_link(PinRef::new(sub, "result"), PinRef::new(set_else, "value"))
        .unwrap();

    g.add_control_edge(branch, "then", set_then).unwrap();
    g.add_control_edge(branch, "else", set_else).unwrap();
    g.set_entry(branch).unwrap();
    g
}

/// Sum the loop index over `n` iterations into `out` via an accumulator.
fn loop_graph() -> Graph {
    let mut g = Graph::new();
    g.declare_variable(var(
        "n",
        PinType::scalar(ValueKind::Int),
        Value::Int(4),
        true,
        false,
    ))
    .unwrap();
    g.declare_variable(float_var("out", 0.0, false, true)).unwrap();
    let get_n = g.add_node("var.get", serde_json::json!({"name": "n"}));
    let repeat = g.add_node("flow.for", serde_json::Value::Null);
    g.add_link(PinRef::new(get_n, "value"), PinRef::new(repeat, "count"))
        .unwrap();
    let acc = g.add_node("state.accumulate", serde_json::Value::Null);
    g.add_link(PinRef::new(repeat, "index"), PinRef::new(acc, "value"))
        .unwrap();
    let set = g.add_node("var.set", serde_json::json!({"name": "out"}));
    g.add_link(PinRef::new(acc, "result"), PinRef::new(set, "value"))
        .unwrap();
    g.add_control_edge(repeat, "body", acc).unwrap();
    g.add_control_edge(repeat, "next", set).unwrap();
    g.set_entry(repeat).unwrap();
    g
}

#[test]
fn recompiles_are_byte_identical() {
    let cat = catalog();
    for graph in [constant_graph(5.0), chain_graph(), branch_graph(), loop_graph()] {
        let p1 = compile(&graph, &cat).unwrap();
        let p2 = compile(&graph, &cat).unwrap();
        assert_eq!(p1.instructions, p2.instructions);
        assert_eq!(p1.layout.defaults, p2.layout.defaults);
        assert_eq!(p1.layout.types, p2.layout.types);
        assert_eq!(p1.fingerprint, p2.fingerprint);
    }
}

#[test]
fn fingerprint_tracks_graph_changes() {
    let cat = catalog();
    let p5 = compile(&constant_graph(5.0), &cat).unwrap();
    let p6 = compile(&constant_graph(6.0), &cat).unwrap();
    assert_ne!(p5.fingerprint, p6.fingerprint);
}

#[test]
fn validation_failure_blocks_compilation() {
    let mut g = constant_graph(5.0);
    let a = g.add_node("math.add", serde_json::Value::Null);
    let b = g.add_node("math.add", serde_json::Value::Null);
    g.add_link(PinRef::new(a, "result"), PinRef::new(b, "a"))
        .unwrap();
    g.add_link(PinRef::new(b, "result"), PinRef::new(a, "a"))
        .unwrap();
    match compile(&g, &catalog()) {
        Err(RigError::Validation(report)) => assert!(!report.is_empty()),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn variable_access_lowers_to_a_copy() {
    let p = compile(&constant_graph(5.0), &catalog()).unwrap();
    assert!(p.calls.is_empty());
    let k = p.layout.variable_slots["k"];
    let out = p.layout.variable_slots["out"];
    assert_eq!(
        p.instructions,
        vec![Instruction::Copy { src: k, dst: out }, Instruction::Halt]
    );
}

#[test]
fn branch_lowers_to_forward_jumps() {
    let p = compile(&branch_graph(), &catalog()).unwrap();
    let mut saw_conditional = false;
    let mut saw_jump = false;
    for (pc, inst) in p.instructions.iter().enumerate() {
        match *inst {
            Instruction::JumpIfFalse { target, .. } => {
                saw_conditional = true;
                assert!(target as usize > pc);
            }
            Instruction::Jump { target } => {
                saw_jump = true;
                assert!(target as usize > pc);
            }
            _ => {}
        }
    }
    assert!(saw_conditional && saw_jump);
}

#[test]
fn loop_lowers_to_a_backward_jump() {
    let p = compile(&loop_graph(), &catalog()).unwrap();
    let back_edges = p
        .instructions
        .iter()
        .enumerate()
        .filter(|(pc, inst)| matches!(**inst, Instruction::Jump { target } if (target as usize) < *pc))
        .count();
    assert_eq!(back_edges, 1);
}

#[test]
fn pure_intermediates_share_slots() {
    let p = compile(&chain_graph(), &catalog()).unwrap();
    assert_eq!(p.calls.len(), 3);
    let outputs: BTreeSet<SlotId> = p.calls.iter().map(|c| c.slots[2]).collect();
    assert_eq!(outputs.len(), 2, "dead add results should share a slot");
}

#[test]
fn fallible_outputs_keep_their_own_slots() {
    // Same chain shape, but through the fallible divide: no slot may be
    // recycled, or a failing tick could not retain the previous value.
    let mut g = Graph::new();
    g.declare_variable(float_var("x", 8.0, true, false)).unwrap();
    g.declare_variable(float_var("two", 2.0, false, false)).unwrap();
    g.declare_variable(float_var("out", 0.0, false, true)).unwrap();
    let get_x = g.add_node("var.get", serde_json::json!({"name": "x"}));
    let get_two = g.add_node("var.get", serde_json::json!({"name": "two"}));
    let mut feed = PinRef::new(get_x, "value");
    for _ in 0..3 {
        let div = g.add_node("math.divide", serde_json::Value::Null);
        g.add_link(feed, PinRef::new(div, "a")).unwrap();
        g.add_link(PinRef::new(get_two, "value"), PinRef::new(div, "b"))
            .unwrap();
        feed = PinRef::new(div, "result");
    }
    let set = g.add_node("var.set", serde_json::json!({"name": "out"}));
    g.add_link(feed, PinRef::new(set, "value")).unwrap();
    g.set_entry(set).unwrap();

    let p = compile(&g, &catalog()).unwrap();
    assert_eq!(p.calls.len(), 3);
    let outputs: BTreeSet<SlotId> = p.calls.iter().map(|c| c.slots[2]).collect();
    assert_eq!(outputs.len(), 3);
}
