//! Graph-to-bytecode compiler.
//!
//! Compilation is deterministic by construction: nodes are visited in arena
//! order, data dependencies are scheduled by a min-heap Kahn order, and every
//! intermediate map is ordered. The same graph and catalog therefore produce
//! byte-identical programs, which makes the fingerprint usable for change
//! detection.
//!
//! Lowering rules:
//! * pure nodes become `CallUnit`s emitted on demand inside the control
//!   region that first needs them (re-emitted per branch arm, so an arm
//!   never depends on code the other arm ran);
//! * `flow.branch` becomes `JumpIfFalse`/`Jump` around its arms;
//! * `flow.for` resets its counter from a shared zero literal, then runs its
//!   header call and a conditional exit jump per iteration;
//! * `var.get` aliases the variable's slot, `var.set` becomes a `Copy`.
//!
//! A final liveness pass merges short-lived intermediate slots. Slots with
//! meaningful initial values, variable slots, in-place pins and the outputs
//! of fallible units are exempt, which is what lets a failing unit provably
//! leave its previous tick's outputs in place.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};

use smallvec::SmallVec;

use crate::{
    compile::{
        fingerprint,
        program::{Instruction, Program, RegisterLayout, SlotId, UnitCall},
    },
    foundation::error::{RigError, RigResult},
    graph::{
        model::{Graph, NodeId, PinRef},
        validate::SchemaTable,
    },
    units::{ExecKind, PinDescriptor, PinDir, UnitCatalog},
    value::{PinType, Value, ValueKind},
};

/// Compile a graph into an executable program.
///
/// Validation runs first; any issue aborts with [`RigError::Validation`] and
/// no partial program is produced.
#[tracing::instrument(skip_all, fields(nodes = graph.node_count()))]
pub fn compile(graph: &Graph, catalog: &UnitCatalog) -> RigResult<Program> {
    graph.validate(catalog).into_result()?;
    let schemas = SchemaTable::resolve(graph, catalog);
    let mut c = Compiler {
        graph,
        catalog,
        schemas: &schemas,
        instructions: Vec::new(),
        calls: Vec::new(),
        layout: RegisterLayout::default(),
        own: BTreeMap::new(),
        exempt: BTreeSet::new(),
        pure_frames: vec![BTreeSet::new()],
        topo_rank: topo_ranks(graph),
        zero_int: None,
    };
    c.allocate_variables();
    let entry = graph
        .entry()
        .ok_or_else(|| RigError::integrity("validated graph lost its entry node"))?;
    c.emit_chain(entry)?;
    c.instructions.push(Instruction::Halt);
    c.reuse_slots();

    let program = Program {
        fingerprint: fingerprint::fingerprint(&c.instructions, &c.calls, &c.layout),
        instructions: c.instructions,
        calls: c.calls,
        layout: c.layout,
        variables: graph.variables().to_vec(),
        bones: graph
            .skeleton()
            .bones
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect(),
    };
    program.verify()?;
    tracing::debug!(
        instructions = program.instructions.len(),
        slots = program.layout.slot_count(),
        fingerprint = %program.fingerprint,
        "compiled program"
    );
    Ok(program)
}

/// Min-heap Kahn order over the data-link subgraph. Ties break toward the
/// lower arena index, so the order is stable across recompiles.
fn topo_ranks(graph: &Graph) -> BTreeMap<NodeId, usize> {
    let mut indegree: BTreeMap<NodeId, usize> = graph.nodes().map(|(id, _)| (id, 0)).collect();
    let mut successors: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for link in graph.links() {
        if !indegree.contains_key(&link.from.node) {
            continue;
        }
        if let Some(d) = indegree.get_mut(&link.to.node) {
            *d += 1;
            successors.entry(link.from.node).or_default().push(link.to.node);
        }
    }
    let mut heap: BinaryHeap<Reverse<u32>> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| Reverse(id.0))
        .collect();
    let mut ranks = BTreeMap::new();
    while let Some(Reverse(raw)) = heap.pop() {
        let id = NodeId(raw);
        let rank = ranks.len();
        ranks.insert(id, rank);
        for next in successors.get(&id).cloned().unwrap_or_default() {
            if let Some(d) = indegree.get_mut(&next) {
                *d -= 1;
                if *d == 0 {
                    heap.push(Reverse(next.0));
                }
            }
        }
    }
    ranks
}

struct Compiler<'a> {
    graph: &'a Graph,
    catalog: &'a UnitCatalog,
    schemas: &'a SchemaTable,
    instructions: Vec<Instruction>,
    calls: Vec<UnitCall>,
    layout: RegisterLayout,
    // Slot owned by a (node, pin); aliases are recorded in layout.pin_slots.
    own: BTreeMap<(NodeId, &'static str), SlotId>,
    // Slots never merged by the reuse pass.
    exempt: BTreeSet<SlotId>,
    // Pure nodes already emitted, one frame per open control region.
    pure_frames: Vec<BTreeSet<NodeId>>,
    topo_rank: BTreeMap<NodeId, usize>,
    zero_int: Option<SlotId>,
}

impl<'a> Compiler<'a> {
    fn alloc_slot(&mut self, ty: PinType, init: Value, exempt: bool) -> SlotId {
        let slot = SlotId(self.layout.defaults.len() as u32);
        self.layout.types.push(ty);
        self.layout.defaults.push(init);
        if exempt {
            self.exempt.insert(slot);
        }
        slot
    }

    fn allocate_variables(&mut self) {
        for var in self.graph.variables() {
            let slot = self.alloc_slot(var.ty, var.default.clone(), true);
            self.layout.variable_slots.insert(var.name.clone(), slot);
        }
    }

    fn zero_int_slot(&mut self) -> SlotId {
        match self.zero_int {
            Some(slot) => slot,
            None => {
                let slot =
                    self.alloc_slot(PinType::scalar(ValueKind::Int), Value::Int(0), true);
                self.zero_int = Some(slot);
                slot
            }
        }
    }

    fn schema_of(&self, id: NodeId) -> RigResult<&'a crate::graph::validate::NodeSchema> {
        self.schemas
            .get(id)
            .ok_or_else(|| RigError::integrity(format!("node {} has no resolved schema", id.0)))
    }

    /// Slot owned by an output or in-place pin, allocated on first demand.
    fn pin_own_slot(&mut self, id: NodeId, pin: &PinDescriptor, exempt: bool) -> SlotId {
        if let Some(slot) = self.own.get(&(id, pin.name)) {
            return *slot;
        }
        let init = pin
            .default
            .clone()
            .unwrap_or_else(|| Value::default_for(pin.ty));
        let slot = self.alloc_slot(pin.ty, init, exempt);
        self.own.insert((id, pin.name), slot);
        slot
    }

    /// Slot holding an unlinked input's literal default.
    fn literal_slot(&mut self, id: NodeId, pin: &PinDescriptor) -> SlotId {
        self.pin_own_slot(id, pin, true)
    }

    /// Slot carrying the value of an output pin, emitting its pure producer
    /// chain first when needed.
    fn slot_of_output(&mut self, from: &PinRef) -> RigResult<SlotId> {
        let node = self
            .graph
            .node(from.node)
            .ok_or_else(|| RigError::integrity(format!("link from dead node {}", from.node.0)))?;
        if node.kind == "var.get" {
            let name = node
                .config
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| RigError::integrity("var.get without a variable name"))?;
            return self
                .layout
                .variable_slots
                .get(name)
                .copied()
                .ok_or_else(|| RigError::integrity(format!("unallocated variable '{name}'")));
        }
        let schema = self.schema_of(from.node)?;
        if schema.exec_kind == ExecKind::Pure {
            self.ensure_pure(from.node)?;
        }
        let pin = schema
            .pins
            .iter()
            .find(|p| p.name == from.pin)
            .ok_or_else(|| {
                RigError::integrity(format!("link from unknown pin '{}'", from.pin))
            })?;
        let exempt = schema.fallible || pin.dir == PinDir::InOut;
        Ok(self.pin_own_slot(from.node, pin, exempt))
    }

    /// Slot feeding a read pin: linked source, or the pin's literal default.
    fn read_pin_slot(&mut self, id: NodeId, pin: &PinDescriptor) -> RigResult<SlotId> {
        let pref = PinRef::new(id, pin.name);
        match self.graph.link_into(&pref) {
            Some(link) => self.slot_of_output(&link.from),
            None => Ok(self.literal_slot(id, pin)),
        }
    }

    fn pure_emitted(&self, id: NodeId) -> bool {
        self.pure_frames.iter().any(|frame| frame.contains(&id))
    }

    /// Emit a pure node and its not-yet-emitted pure dependencies, in Kahn
    /// order, into the current control region.
    fn ensure_pure(&mut self, id: NodeId) -> RigResult<()> {
        if self.pure_emitted(id) {
            return Ok(());
        }
        let mut needed = BTreeSet::new();
        self.collect_pure(id, &mut needed);
        let mut order: Vec<NodeId> = needed.into_iter().collect();
        order.sort_by_key(|n| self.topo_rank.get(n).copied().unwrap_or(usize::MAX));
        for n in order {
            self.emit_call(n)?;
            if let Some(frame) = self.pure_frames.last_mut() {
                frame.insert(n);
            }
        }
        Ok(())
    }

    fn collect_pure(&self, id: NodeId, out: &mut BTreeSet<NodeId>) {
        if self.pure_emitted(id) || !out.insert(id) {
            return;
        }
        for link in self.graph.links() {
            if link.to.node != id {
                continue;
            }
            let producer = link.from.node;
            let Some(node) = self.graph.node(producer) else {
                continue;
            };
            if node.kind == "var.get" {
                continue;
            }
            if let Some(schema) = self.schemas.get(producer) {
                if schema.exec_kind == ExecKind::Pure {
                    self.collect_pure(producer, out);
                }
            }
        }
    }

    /// Emit the `CallUnit` for one node: resolve every pin to a slot, copy
    /// linked in-place pins into their own slot, then call.
    fn emit_call(&mut self, id: NodeId) -> RigResult<()> {
        let node = self
            .graph
            .node(id)
            .ok_or_else(|| RigError::integrity(format!("emitting dead node {}", id.0)))?;
        let schema = self.schema_of(id)?;
        let unit = self
            .catalog
            .get(&node.kind)
            .ok_or_else(|| RigError::integrity(format!("unknown kind '{}'", node.kind)))?
            .clone();

        let mut slots: SmallVec<[SlotId; 8]> = SmallVec::new();
        let mut inplace_copies: Vec<(SlotId, SlotId)> = Vec::new();
        for pin in &schema.pins {
            let slot = match pin.dir {
                PinDir::Input => self.read_pin_slot(id, pin)?,
                PinDir::InOut => {
                    let own = self.pin_own_slot(id, pin, true);
                    let pref = PinRef::new(id, pin.name);
                    if let Some(link) = self.graph.link_into(&pref) {
                        let src = self.slot_of_output(&link.from)?;
                        inplace_copies.push((src, own));
                    }
                    own
                }
                PinDir::Output => self.pin_own_slot(id, pin, schema.fallible),
            };
            slots.push(slot);
            self.layout.pin_slots.insert((id, pin.name.to_string()), slot);
        }
        for (src, dst) in inplace_copies {
            self.instructions.push(Instruction::Copy { src, dst });
        }
        let call = self.calls.len() as u32;
        self.calls.push(UnitCall {
            node: id,
            unit,
            config: node.config.clone(),
            pins: schema.pins.clone(),
            slots,
            fallible: schema.fallible,
            stateful: schema.stateful,
        });
        self.instructions.push(Instruction::CallUnit { call });
        Ok(())
    }

    /// Emit the execution chain starting at `id`, following `next` edges.
    fn emit_chain(&mut self, start: NodeId) -> RigResult<()> {
        let mut id = start;
        loop {
            let node = self
                .graph
                .node(id)
                .ok_or_else(|| RigError::integrity(format!("chain reaches dead node {}", id.0)))?;
            let exec_kind = self.schema_of(id)?.exec_kind;
            match exec_kind {
                ExecKind::Pure => {
                    return Err(RigError::integrity(format!(
                        "pure node {} on the execution chain",
                        id.0
                    )));
                }
                ExecKind::Action => {
                    if node.kind == "var.set" {
                        self.emit_var_set(id)?;
                    } else {
                        self.emit_call(id)?;
                    }
                }
                ExecKind::Branch => self.emit_branch(id)?,
                ExecKind::Loop => self.emit_loop(id)?,
                ExecKind::Sequence => {
                    // Every outgoing slot runs in name order; no `next`.
                    self.emit_sequence(id)?;
                    return Ok(());
                }
            }
            match self.graph.control_edges_from(id, "next").next() {
                Some(edge) => id = edge.to,
                None => return Ok(()),
            }
        }
    }

    fn emit_var_set(&mut self, id: NodeId) -> RigResult<()> {
        let node = self
            .graph
            .node(id)
            .ok_or_else(|| RigError::integrity(format!("emitting dead node {}", id.0)))?;
        let schema = self.schema_of(id)?;
        let pin = schema
            .pins
            .first()
            .ok_or_else(|| RigError::integrity("var.set without a value pin"))?;
        let src = self.read_pin_slot(id, pin)?;
        let name = node
            .config
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RigError::integrity("var.set without a variable name"))?;
        let dst = self
            .layout
            .variable_slots
            .get(name)
            .copied()
            .ok_or_else(|| RigError::integrity(format!("unallocated variable '{name}'")))?;
        self.layout.pin_slots.insert((id, pin.name.to_string()), src);
        self.instructions.push(Instruction::Copy { src, dst });
        Ok(())
    }

    fn emit_branch(&mut self, id: NodeId) -> RigResult<()> {
        let schema = self.schema_of(id)?;
        let cond_pin = schema
            .pins
            .iter()
            .find(|p| p.name == "condition")
            .ok_or_else(|| RigError::integrity("branch without a condition pin"))?;
        let cond = self.read_pin_slot(id, cond_pin)?;
        self.layout
            .pin_slots
            .insert((id, cond_pin.name.to_string()), cond);

        let jif_pc = self.instructions.len();
        self.instructions.push(Instruction::JumpIfFalse {
            cond,
            target: u32::MAX,
        });
        self.emit_arm(id, "then")?;
        let jump_pc = self.instructions.len();
        self.instructions.push(Instruction::Jump { target: u32::MAX });
        self.patch_jump(jif_pc, self.instructions.len() as u32);
        self.emit_arm(id, "else")?;
        self.patch_jump(jump_pc, self.instructions.len() as u32);
        Ok(())
    }

    fn emit_loop(&mut self, id: NodeId) -> RigResult<()> {
        let schema = self.schema_of(id)?;
        let iter_pin = schema
            .pins
            .iter()
            .find(|p| p.name == "iter" && p.dir == PinDir::InOut)
            .ok_or_else(|| RigError::integrity("loop without an iteration counter pin"))?;
        let iter = self.pin_own_slot(id, iter_pin, true);
        let zero = self.zero_int_slot();
        self.instructions.push(Instruction::Copy {
            src: zero,
            dst: iter,
        });

        let header = self.instructions.len() as u32;
        self.emit_call(id)?;
        let proceed = self
            .own
            .get(&(id, "proceed"))
            .copied()
            .ok_or_else(|| RigError::integrity("loop without a continuation flag pin"))?;
        let jif_pc = self.instructions.len();
        self.instructions.push(Instruction::JumpIfFalse {
            cond: proceed,
            target: u32::MAX,
        });
        self.emit_arm(id, "body")?;
        self.instructions.push(Instruction::Jump { target: header });
        self.patch_jump(jif_pc, self.instructions.len() as u32);
        Ok(())
    }

    fn emit_sequence(&mut self, id: NodeId) -> RigResult<()> {
        let slots: BTreeSet<&str> = self
            .graph
            .control_edges()
            .iter()
            .filter(|e| e.from == id)
            .map(|e| e.slot.as_str())
            .collect();
        for slot in slots {
            if let Some(edge) = self.graph.control_edges_from(id, slot).next() {
                self.emit_chain(edge.to)?;
            }
        }
        Ok(())
    }

    /// Emit one control arm inside its own pure-node region, so pure work
    /// first needed in this arm is re-emitted in sibling arms that also
    /// need it.
    fn emit_arm(&mut self, id: NodeId, slot: &str) -> RigResult<()> {
        let Some(edge) = self.graph.control_edges_from(id, slot).next() else {
            return Ok(());
        };
        let target = edge.to;
        self.pure_frames.push(BTreeSet::new());
        let result = self.emit_chain(target);
        self.pure_frames.pop();
        result
    }

    fn patch_jump(&mut self, pc: usize, target: u32) {
        match &mut self.instructions[pc] {
            Instruction::JumpIfFalse { target: t, .. } | Instruction::Jump { target: t } => {
                *t = target;
            }
            _ => {}
        }
    }

    /// Liveness-based slot merging.
    ///
    /// A slot is mergeable only when it is always written before it is read
    /// and carries no meaningful initial value; everything else keeps its
    /// own storage. Live ranges intersecting a backward jump span are
    /// widened to the whole span, so loop-carried values never share.
    fn reuse_slots(&mut self) {
        let n = self.layout.slot_count();
        let len = self.instructions.len();
        let mut first_read = vec![usize::MAX; n];
        let mut first_write = vec![usize::MAX; n];
        let mut last = vec![0usize; n];

        let read = |slot: SlotId, pc: usize, first_read: &mut [usize], last: &mut [usize]| {
            first_read[slot.index()] = first_read[slot.index()].min(pc);
            last[slot.index()] = last[slot.index()].max(pc);
        };
        let write = |slot: SlotId, pc: usize, first_write: &mut [usize], last: &mut [usize]| {
            first_write[slot.index()] = first_write[slot.index()].min(pc);
            last[slot.index()] = last[slot.index()].max(pc);
        };
        for (pc, inst) in self.instructions.iter().enumerate() {
            match *inst {
                Instruction::Copy { src, dst } => {
                    read(src, pc, &mut first_read, &mut last);
                    write(dst, pc, &mut first_write, &mut last);
                }
                Instruction::CallUnit { call } => {
                    let call = &self.calls[call as usize];
                    for (pin, slot) in call.pins.iter().zip(&call.slots) {
                        if pin.is_read() {
                            read(*slot, pc, &mut first_read, &mut last);
                        }
                        if pin.is_written() {
                            write(*slot, pc, &mut first_write, &mut last);
                        }
                    }
                }
                Instruction::JumpIfFalse { cond, .. } => {
                    read(cond, pc, &mut first_read, &mut last);
                }
                Instruction::Jump { .. } | Instruction::Halt => {}
            }
        }
        let mut start: Vec<usize> = (0..n).map(|s| first_read[s].min(first_write[s])).collect();

        // Widen ranges crossing backward jumps until stable, so loop-carried
        // values never share storage.
        loop {
            let mut changed = false;
            for (pc, inst) in self.instructions.iter().enumerate() {
                let target = match *inst {
                    Instruction::Jump { target } | Instruction::JumpIfFalse { target, .. } => {
                        target as usize
                    }
                    _ => continue,
                };
                if target > pc {
                    continue;
                }
                for s in 0..n {
                    if start[s] == usize::MAX || start[s] > pc || last[s] < target {
                        continue;
                    }
                    if start[s] > target {
                        start[s] = target;
                        changed = true;
                    }
                    if last[s] < pc {
                        last[s] = pc;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        // Mergeable: not exempt, touched, and written strictly before read.
        let mut mergeable = vec![false; n];
        for s in 0..n {
            let slot = SlotId(s as u32);
            mergeable[s] = !self.exempt.contains(&slot)
                && start[s] != usize::MAX
                && first_write[s] < first_read[s];
        }

        let mut remap: Vec<Option<SlotId>> = vec![None; n];
        let mut new_types: Vec<PinType> = Vec::new();
        let mut new_defaults: Vec<Value> = Vec::new();

        // Keepers first, in old order.
        for s in 0..n {
            if !mergeable[s] {
                let slot = SlotId(new_types.len() as u32);
                new_types.push(self.layout.types[s]);
                new_defaults.push(self.layout.defaults[s].clone());
                remap[s] = Some(slot);
            }
        }

        let mut starts: Vec<Vec<usize>> = vec![Vec::new(); len];
        let mut ends: Vec<Vec<usize>> = vec![Vec::new(); len];
        for s in 0..n {
            if mergeable[s] {
                starts[start[s]].push(s);
                ends[last[s]].push(s);
            }
        }
        let mut free: HashMap<PinType, Vec<SlotId>> = HashMap::new();
        for pc in 0..len {
            for &s in &starts[pc] {
                let ty = self.layout.types[s];
                let slot = match free.get_mut(&ty).and_then(|pool| pool.pop()) {
                    Some(slot) => slot,
                    None => {
                        let slot = SlotId(new_types.len() as u32);
                        new_types.push(ty);
                        new_defaults.push(Value::default_for(ty));
                        slot
                    }
                };
                remap[s] = Some(slot);
            }
            for &s in &ends[pc] {
                if let Some(slot) = remap[s] {
                    free.entry(self.layout.types[s]).or_default().push(slot);
                }
            }
        }

        let map = |slot: SlotId, remap: &[Option<SlotId>]| remap[slot.index()].unwrap_or(slot);
        for inst in &mut self.instructions {
            match inst {
                Instruction::Copy { src, dst } => {
                    *src = map(*src, &remap);
                    *dst = map(*dst, &remap);
                }
                Instruction::JumpIfFalse { cond, .. } => *cond = map(*cond, &remap),
                _ => {}
            }
        }
        for call in &mut self.calls {
            for slot in call.slots.iter_mut() {
                *slot = map(*slot, &remap);
            }
        }
        for slot in self.layout.pin_slots.values_mut() {
            *slot = map(*slot, &remap);
        }
        for slot in self.layout.variable_slots.values_mut() {
            *slot = map(*slot, &remap);
        }
        self.layout.types = new_types;
        self.layout.defaults = new_defaults;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/compiler.rs"]
mod tests;
