//! Whole-graph validation.
//!
//! Validation never mutates and never stops at the first problem: it walks
//! the whole graph and aggregates every issue it can find, so an editor can
//! surface them all at once. A non-empty report blocks compilation.

use std::collections::{BTreeMap, VecDeque};

use crate::{
    foundation::error::{ValidationIssue, ValidationReport},
    graph::model::{Graph, NodeId, UnitNode},
    units::{ExecKind, PinDescriptor, SchemaCtx, UnitCatalog},
};

/// Resolved pin schemas for every live node, built once per validation or
/// compilation pass.
pub(crate) struct SchemaTable {
    by_node: BTreeMap<NodeId, NodeSchema>,
}

pub(crate) struct NodeSchema {
    pub pins: Vec<PinDescriptor>,
    pub exec_kind: ExecKind,
    pub fallible: bool,
    pub stateful: bool,
}

impl SchemaTable {
    /// Resolve every live node against the catalog. Nodes of unknown kind
    /// are skipped; validation reports them separately.
    pub(crate) fn resolve(graph: &Graph, catalog: &UnitCatalog) -> Self {
        let mut by_node = BTreeMap::new();
        for (id, node) in graph.nodes() {
            if let Some(unit) = catalog.get(&node.kind) {
                let ctx = SchemaCtx {
                    config: &node.config,
                    variables: graph.variables(),
                };
                by_node.insert(
                    id,
                    NodeSchema {
                        pins: unit.pins(&ctx),
                        exec_kind: unit.exec_kind(),
                        fallible: unit.fallible(),
                        stateful: unit.stateful(),
                    },
                );
            }
        }
        Self { by_node }
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&NodeSchema> {
        self.by_node.get(&id)
    }

    fn pin<'a>(&'a self, id: NodeId, name: &str) -> Option<&'a PinDescriptor> {
        self.get(id)?.pins.iter().find(|p| p.name == name)
    }
}

impl Graph {
    /// Check the whole graph against a catalog, aggregating every issue.
    #[tracing::instrument(skip_all, fields(nodes = self.node_count()))]
    pub fn validate(&self, catalog: &UnitCatalog) -> ValidationReport {
        let mut report = ValidationReport::default();
        let schemas = SchemaTable::resolve(self, catalog);

        for (id, node) in self.nodes() {
            if catalog.get(&node.kind).is_none() {
                report.push(ValidationIssue::node(
                    id,
                    format!("unknown unit kind '{}'", node.kind),
                ));
            }
        }

        self.check_entry(&schemas, &mut report);
        self.check_links(&schemas, &mut report);
        self.check_control_edges(&schemas, &mut report);
        self.check_required_inputs(&schemas, &mut report);
        self.check_variables(&mut report);
        self.check_data_cycles(&mut report);
        self.check_control_cycles(&mut report);

        report
    }

    fn check_entry(&self, schemas: &SchemaTable, report: &mut ValidationReport) {
        match self.entry() {
            None => report.push(ValidationIssue::graph("no entry node designated")),
            Some(entry) => {
                if let Some(schema) = schemas.get(entry) {
                    if !schema.exec_kind.is_executable() {
                        report.push(ValidationIssue::node(
                            entry,
                            "entry node must sit on the execution chain",
                        ));
                    }
                }
            }
        }
    }

    fn check_links(&self, schemas: &SchemaTable, report: &mut ValidationReport) {
        let mut seen_inputs: BTreeMap<(NodeId, &str), u32> = BTreeMap::new();
        for link in self.links() {
            let from = schemas.pin(link.from.node, &link.from.pin);
            let to = schemas.pin(link.to.node, &link.to.pin);
            if from.is_none() && schemas.get(link.from.node).is_some() {
                report.push(ValidationIssue::node(
                    link.from.node,
                    format!("no output pin named '{}'", link.from.pin),
                ));
            }
            if to.is_none() && schemas.get(link.to.node).is_some() {
                report.push(ValidationIssue::node(
                    link.to.node,
                    format!("no input pin named '{}'", link.to.pin),
                ));
            }
            let (Some(from), Some(to)) = (from, to) else {
                continue;
            };

            if !from.is_written() {
                report.push(ValidationIssue::node(
                    link.from.node,
                    format!("pin '{}' is not an output", link.from.pin),
                ));
            }
            if !to.is_read() {
                report.push(ValidationIssue::node(
                    link.to.node,
                    format!("pin '{}' is not an input", link.to.pin),
                ));
            }
            if !to.ty.accepts(from.ty) {
                report.push(ValidationIssue::node(
                    link.to.node,
                    format!(
                        "link into '{}' has incompatible type ({:?} does not accept {:?})",
                        link.to.pin, to.ty, from.ty
                    ),
                ));
            }

            let count = seen_inputs.entry((link.to.node, to.name)).or_insert(0);
            *count += 1;
            if *count == 2 {
                report.push(ValidationIssue::node(
                    link.to.node,
                    format!("input '{}' has more than one incoming link", link.to.pin),
                ));
            }
        }
    }

    fn check_control_edges(&self, schemas: &SchemaTable, report: &mut ValidationReport) {
        let mut seen_slots: BTreeMap<(NodeId, &str), u32> = BTreeMap::new();
        for edge in self.control_edges() {
            let Some(schema) = schemas.get(edge.from) else {
                continue;
            };
            let allowed = match schema.exec_kind {
                ExecKind::Pure => {
                    report.push(ValidationIssue::node(
                        edge.from,
                        "pure nodes have no control slots",
                    ));
                    continue;
                }
                ExecKind::Action => &["next"][..],
                ExecKind::Branch => &["then", "else", "next"][..],
                ExecKind::Loop => &["body", "next"][..],
                // Sequence slots are free-form names, run in name order.
                ExecKind::Sequence => &[][..],
            };
            if schema.exec_kind != ExecKind::Sequence && !allowed.contains(&edge.slot.as_str()) {
                report.push(ValidationIssue::node(
                    edge.from,
                    format!("no control slot named '{}'", edge.slot),
                ));
                continue;
            }

            if let Some(target) = schemas.get(edge.to) {
                if !target.exec_kind.is_executable() {
                    report.push(ValidationIssue::node(
                        edge.to,
                        "control edge targets a pure node",
                    ));
                }
            }

            let count = seen_slots.entry((edge.from, edge.slot.as_str())).or_insert(0);
            *count += 1;
            if *count == 2 {
                report.push(ValidationIssue::node(
                    edge.from,
                    format!("control slot '{}' has more than one outgoing edge", edge.slot),
                ));
            }
        }
    }

    fn check_required_inputs(&self, schemas: &SchemaTable, report: &mut ValidationReport) {
        for (id, _) in self.nodes() {
            let Some(schema) = schemas.get(id) else {
                continue;
            };
            for pin in &schema.pins {
                if !pin.is_read() || pin.optional || pin.default.is_some() {
                    continue;
                }
                let linked = self
                    .links()
                    .iter()
                    .any(|l| l.to.node == id && l.to.pin == pin.name);
                if !linked {
                    report.push(ValidationIssue::node(
                        id,
                        format!("required input '{}' is unlinked and has no default", pin.name),
                    ));
                }
            }
        }
    }

    fn check_variables(&self, report: &mut ValidationReport) {
        for (id, node) in self.nodes() {
            if !is_var_unit(node) {
                continue;
            }
            let name = node.config.get("name").and_then(|v| v.as_str());
            match name {
                None => report.push(ValidationIssue::node(
                    id,
                    "variable node config must name a variable",
                )),
                Some(name) => {
                    if !self.variables().iter().any(|v| v.name == name) {
                        report.push(ValidationIssue::node(
                            id,
                            format!("unknown variable '{name}'"),
                        ));
                    }
                }
            }
        }
    }

    /// Kahn over the data-link subgraph; anything left unprocessed is on a
    /// cycle.
    fn check_data_cycles(&self, report: &mut ValidationReport) {
        let mut indegree: BTreeMap<NodeId, usize> = self.nodes().map(|(id, _)| (id, 0)).collect();
        let mut successors: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for link in self.links() {
            if link.from.node == link.to.node {
                report.push(ValidationIssue::node(link.to.node, "self-referential link"));
                continue;
            }
            if !indegree.contains_key(&link.from.node) {
                continue;
            }
            if let Some(d) = indegree.get_mut(&link.to.node) {
                *d += 1;
                successors.entry(link.from.node).or_default().push(link.to.node);
            }
        }

        let mut queue: VecDeque<NodeId> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut processed = 0usize;
        while let Some(id) = queue.pop_front() {
            processed += 1;
            for next in successors.get(&id).into_iter().flatten() {
                if let Some(d) = indegree.get_mut(next) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(*next);
                    }
                }
            }
        }
        if processed < indegree.len() {
            report.push(ValidationIssue::graph("data links form a cycle"));
        }
    }

    /// Control edges must form a DAG; loop back edges are synthesized by the
    /// compiler, never authored.
    fn check_control_cycles(&self, report: &mut ValidationReport) {
        let mut indegree: BTreeMap<NodeId, usize> = self.nodes().map(|(id, _)| (id, 0)).collect();
        let mut successors: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for edge in self.control_edges() {
            if edge.from == edge.to {
                report.push(ValidationIssue::node(edge.from, "self-referential control edge"));
                continue;
            }
            if !indegree.contains_key(&edge.from) {
                continue;
            }
            if let Some(d) = indegree.get_mut(&edge.to) {
                *d += 1;
                successors.entry(edge.from).or_default().push(edge.to);
            }
        }
        let mut queue: VecDeque<NodeId> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut processed = 0usize;
        while let Some(id) = queue.pop_front() {
            processed += 1;
            for next in successors.get(&id).into_iter().flatten() {
                if let Some(d) = indegree.get_mut(next) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(*next);
                    }
                }
            }
        }
        if processed < indegree.len() {
            report.push(ValidationIssue::graph("control edges form a cycle"));
        }
    }
}

pub(crate) fn is_var_unit(node: &UnitNode) -> bool {
    node.kind == "var.get" || node.kind == "var.set"
}

#[cfg(test)]
#[path = "../../tests/unit/graph/validate.rs"]
mod tests;
