//! Compiled program artifacts.
//!
//! A [`Program`] is immutable once built: a flat instruction stream, a call
//! table resolving each `CallUnit` to its unit implementation and slot
//! assignment, and the register layout describing every slot's type and
//! initial value. Executors instantiate register files from the layout and
//! never consult the authored graph again.

use std::collections::BTreeMap;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::{
    compile::fingerprint::ProgramFingerprint,
    foundation::error::{RigError, RigResult},
    graph::model::{NodeId, VariableDef},
    units::{BoneMap, PinDescriptor, Unit},
    value::{PinType, Value},
};

/// Index of one register slot in a program's register file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub u32);

impl SlotId {
    /// The slot as a vector index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One bytecode instruction. Targets are absolute instruction indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// `regs[dst] = regs[src]`.
    Copy {
        /// Source slot.
        src: SlotId,
        /// Destination slot.
        dst: SlotId,
    },
    /// Invoke entry `call` of the call table.
    CallUnit {
        /// Call-table index.
        call: u32,
    },
    /// Jump to `target` when `regs[cond]` holds `false`.
    JumpIfFalse {
        /// Boolean condition slot.
        cond: SlotId,
        /// Jump destination.
        target: u32,
    },
    /// Unconditional jump to `target`.
    Jump {
        /// Jump destination.
        target: u32,
    },
    /// End the tick.
    Halt,
}

/// Resolved target of one `CallUnit` instruction.
pub struct UnitCall {
    /// Authored node this call was emitted for; keys its state block, so
    /// recompiles keep stateful units' accumulated values.
    pub node: NodeId,
    /// Unit implementation.
    pub unit: Arc<dyn Unit>,
    /// Per-instance configuration.
    pub config: serde_json::Value,
    /// Pin schema resolved at compile time.
    pub pins: Vec<PinDescriptor>,
    /// Slot of each pin, in schema order.
    pub slots: SmallVec<[SlotId; 8]>,
    /// Whether the unit may signal a recoverable failure.
    pub fallible: bool,
    /// Whether the unit keeps a private state block.
    pub stateful: bool,
}

impl std::fmt::Debug for UnitCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitCall")
            .field("node", &self.node)
            .field("kind", &self.unit.kind())
            .field("slots", &self.slots)
            .finish()
    }
}

/// Slot assignment produced by compilation.
#[derive(Clone, Debug, Default)]
pub struct RegisterLayout {
    /// Value type of each slot.
    pub types: Vec<PinType>,
    /// Initial value of each slot, applied when a register file is built.
    pub defaults: Vec<Value>,
    /// Slot backing each materialized node pin.
    pub pin_slots: BTreeMap<(NodeId, String), SlotId>,
    /// Slot backing each graph variable.
    pub variable_slots: BTreeMap<String, SlotId>,
}

impl RegisterLayout {
    /// Number of slots in the layout.
    pub fn slot_count(&self) -> usize {
        self.defaults.len()
    }
}

/// An immutable compiled program.
pub struct Program {
    /// Flat instruction stream, ending in `Halt`.
    pub instructions: Vec<Instruction>,
    /// Call table indexed by `CallUnit` operands.
    pub calls: Vec<UnitCall>,
    /// Register layout.
    pub layout: RegisterLayout,
    /// Variable declarations carried over for host binding.
    pub variables: Vec<VariableDef>,
    /// Bone name to pose-array index, resolved once at compile time.
    pub bones: BoneMap,
    /// Content hash; equal for byte-identical compiles.
    pub fingerprint: ProgramFingerprint,
}

impl Program {
    /// Check internal consistency: every slot, jump target and call index in
    /// range, the stream terminated by `Halt`. A failure here is a compiler
    /// defect surfaced as [`RigError::Integrity`].
    pub fn verify(&self) -> RigResult<()> {
        let slots = self.layout.slot_count() as u32;
        let len = self.instructions.len() as u32;
        if self.layout.types.len() != self.layout.defaults.len() {
            return Err(RigError::integrity("layout type/default length mismatch"));
        }
        if !matches!(self.instructions.last(), Some(Instruction::Halt)) {
            return Err(RigError::integrity("instruction stream not terminated"));
        }
        let check_slot = |slot: SlotId| -> RigResult<()> {
            if slot.0 >= slots {
                return Err(RigError::integrity(format!(
                    "slot {} out of range ({slots} slots)",
                    slot.0
                )));
            }
            Ok(())
        };
        for (pc, inst) in self.instructions.iter().enumerate() {
            match *inst {
                Instruction::Copy { src, dst } => {
                    check_slot(src)?;
                    check_slot(dst)?;
                }
                Instruction::CallUnit { call } => {
                    if call as usize >= self.calls.len() {
                        return Err(RigError::integrity(format!(
                            "call index {call} out of range at pc {pc}"
                        )));
                    }
                }
                Instruction::JumpIfFalse { cond, target } => {
                    check_slot(cond)?;
                    if target >= len {
                        return Err(RigError::integrity(format!(
                            "jump target {target} out of range at pc {pc}"
                        )));
                    }
                }
                Instruction::Jump { target } => {
                    if target >= len {
                        return Err(RigError::integrity(format!(
                            "jump target {target} out of range at pc {pc}"
                        )));
                    }
                }
                Instruction::Halt => {}
            }
        }
        for call in &self.calls {
            if call.slots.len() != call.pins.len() {
                return Err(RigError::integrity(format!(
                    "call for node {} has {} slots for {} pins",
                    call.node.0,
                    call.slots.len(),
                    call.pins.len()
                )));
            }
            for slot in &call.slots {
                check_slot(*slot)?;
            }
        }
        for slot in self.layout.variable_slots.values() {
            check_slot(*slot)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("instructions", &self.instructions.len())
            .field("calls", &self.calls.len())
            .field("slots", &self.layout.slot_count())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}
