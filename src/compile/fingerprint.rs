//! Content fingerprinting of compiled programs.
//!
//! The fingerprint hashes everything that affects execution: instruction
//! stream, call table (node, kind, config, slots) and register layout.
//! Because compilation is deterministic, recompiling an unchanged graph
//! yields an equal fingerprint and hosts can skip the program swap.

use xxhash_rust::xxh3::Xxh3;

use crate::{
    compile::program::{Instruction, RegisterLayout, UnitCall},
    value::Value,
};

/// 128-bit xxh3 content hash of a compiled program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ProgramFingerprint(pub u128);

impl std::fmt::Display for ProgramFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

pub(crate) fn fingerprint(
    instructions: &[Instruction],
    calls: &[UnitCall],
    layout: &RegisterLayout,
) -> ProgramFingerprint {
    let mut h = Xxh3::new();
    for inst in instructions {
        match *inst {
            Instruction::Copy { src, dst } => {
                h.update(&[0]);
                h.update(&src.0.to_le_bytes());
                h.update(&dst.0.to_le_bytes());
            }
            Instruction::CallUnit { call } => {
                h.update(&[1]);
                h.update(&call.to_le_bytes());
            }
            Instruction::JumpIfFalse { cond, target } => {
                h.update(&[2]);
                h.update(&cond.0.to_le_bytes());
                h.update(&target.to_le_bytes());
            }
            Instruction::Jump { target } => {
                h.update(&[3]);
                h.update(&target.to_le_bytes());
            }
            Instruction::Halt => h.update(&[4]),
        }
    }
    for call in calls {
        h.update(&call.node.0.to_le_bytes());
        feed_str(&mut h, call.unit.kind());
        feed_str(&mut h, &call.config.to_string());
        for slot in &call.slots {
            h.update(&slot.0.to_le_bytes());
        }
    }
    for (ty, default) in layout.types.iter().zip(&layout.defaults) {
        h.update(&[ty.kind as u8, ty.array as u8]);
        feed_value(&mut h, default);
    }
    for (name, slot) in &layout.variable_slots {
        feed_str(&mut h, name);
        h.update(&slot.0.to_le_bytes());
    }
    ProgramFingerprint(h.digest128())
}

fn feed_str(h: &mut Xxh3, s: &str) {
    h.update(&(s.len() as u64).to_le_bytes());
    h.update(s.as_bytes());
}

fn feed_value(h: &mut Xxh3, value: &Value) {
    match value {
        Value::Bool(b) => h.update(&[0, *b as u8]),
        Value::Int(i) => {
            h.update(&[1]);
            h.update(&i.to_le_bytes());
        }
        Value::Float(f) => {
            h.update(&[2]);
            h.update(&f.to_bits().to_le_bytes());
        }
        Value::Vec3(v) => {
            h.update(&[3]);
            for c in [v.x, v.y, v.z] {
                h.update(&c.to_bits().to_le_bytes());
            }
        }
        Value::Quat(q) => {
            h.update(&[4]);
            for c in [q.x, q.y, q.z, q.w] {
                h.update(&c.to_bits().to_le_bytes());
            }
        }
        Value::Transform(t) => {
            h.update(&[5]);
            for c in [
                t.translation.x,
                t.translation.y,
                t.translation.z,
                t.rotation.x,
                t.rotation.y,
                t.rotation.z,
                t.rotation.w,
                t.scale.x,
                t.scale.y,
                t.scale.z,
            ] {
                h.update(&c.to_bits().to_le_bytes());
            }
        }
        Value::Name(s) => {
            h.update(&[6]);
            feed_str(h, s);
        }
        Value::Array(items) => {
            h.update(&[7]);
            h.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                feed_value(h, item);
            }
        }
    }
}
