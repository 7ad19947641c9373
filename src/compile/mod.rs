//! Graph compilation: bytecode, register layout, fingerprinting.

pub mod compiler;
pub mod fingerprint;
pub mod program;
