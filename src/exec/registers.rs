//! Register files and per-node state storage.

use std::collections::BTreeMap;

use crate::{
    compile::program::{RegisterLayout, SlotId},
    graph::model::NodeId,
    value::Value,
};

/// Dense value storage for one executor instance.
///
/// Slot ids must come from the layout of the program the file was built for;
/// [`crate::compile::program::Program::verify`] guarantees every slot a program
/// touches is in range.
#[derive(Clone, Debug)]
pub struct RegisterFile {
    slots: Vec<Value>,
}

impl RegisterFile {
    /// Build from a layout, applying every slot's initial value.
    pub fn from_layout(layout: &RegisterLayout) -> Self {
        Self {
            slots: layout.defaults.clone(),
        }
    }

    /// Read a slot.
    pub fn get(&self, slot: SlotId) -> &Value {
        &self.slots[slot.index()]
    }

    /// Overwrite a slot.
    pub fn set(&mut self, slot: SlotId, value: Value) {
        self.slots[slot.index()] = value;
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the file has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Private state blocks of stateful units, keyed by authored node id.
///
/// Keying by node id instead of call index is what lets accumulated state
/// survive recompiles and program swaps.
#[derive(Clone, Debug, Default)]
pub struct UnitStateStore {
    blocks: BTreeMap<NodeId, Option<Value>>,
}

impl UnitStateStore {
    /// The state block of `node`, created empty on first access.
    pub fn block_mut(&mut self, node: NodeId) -> &mut Option<Value> {
        self.blocks.entry(node).or_default()
    }

    /// Read a node's state, if any was ever written.
    pub fn get(&self, node: NodeId) -> Option<&Value> {
        self.blocks.get(&node).and_then(|b| b.as_ref())
    }

    /// Drop every state block.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}
