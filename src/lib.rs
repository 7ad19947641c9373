//! Rigweave is a compiled virtual machine for procedural skeletal animation
//! node graphs.
//!
//! A rig behavior is authored as a [`Graph`] of typed unit nodes: data links
//! feed values between pins, control edges order side-effecting nodes, and
//! graph variables carry values across control regions and in and out of the
//! host. The graph compiles to a flat bytecode [`Program`] that a
//! per-character [`Executor`] interprets once per animation tick.
//!
//! # Pipeline overview
//!
//! 1. **Author**: build a [`Graph`] from unit kinds in the [`UnitCatalog`]
//! 2. **Validate**: [`Graph::validate`] aggregates every structural issue
//! 3. **Compile**: [`compile`] lowers the graph to bytecode and a register layout
//! 4. **Execute**: [`Executor::run`] interprets the program once per tick
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic compilation**: the same graph and catalog produce
//!   byte-identical programs with equal [`ProgramFingerprint`]s.
//! - **Contained failures**: a failing unit keeps its previous tick's outputs
//!   and surfaces a [`Diagnostic`]; only integrity faults stop an executor.
//! - **Share programs, not executors**: a compiled [`Program`] is immutable
//!   and shared across any number of executor instances.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod compile;
mod exec;
mod foundation;
mod graph;
mod units;
mod value;

pub use compile::compiler::compile;
pub use compile::fingerprint::ProgramFingerprint;
pub use compile::program::{Instruction, Program, RegisterLayout, SlotId, UnitCall};
pub use exec::pool::run_all;
pub use exec::registers::{RegisterFile, UnitStateStore};
pub use exec::vm::{Diagnostic, Executor, ExternalValues, RunStatus, TickReport};
pub use foundation::error::{RigError, RigResult, ValidationIssue, ValidationReport};
pub use foundation::math::{Quat, Transform, Vec3};
pub use graph::model::{
    ControlEdge, Graph, Link, NodeId, PinRef, Skeleton, UnitNode, VariableDef,
};
pub use units::flow::{SLOT_BODY, SLOT_ELSE, SLOT_NEXT, SLOT_THEN};
pub use units::{
    BoneMap, EvalFailure, ExecKind, PinDescriptor, PinDir, SchemaCtx, Unit, UnitCatalog, UnitCtx,
    UnitResult,
};
pub use value::{PinType, Value, ValueKind};
