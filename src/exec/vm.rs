//! The tick interpreter.
//!
//! An [`Executor`] owns one register file and one state store, and walks the
//! instruction stream of a shared immutable [`Program`] once per tick. Unit
//! failures are contained: the call's staged outputs are discarded (so its
//! slots keep the previous tick's values), a diagnostic is recorded and the
//! run continues. Integrity faults stop the executor for good.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    compile::program::{Instruction, Program, UnitCall},
    exec::registers::{RegisterFile, UnitStateStore},
    foundation::error::{RigError, RigResult},
    graph::model::NodeId,
    units::UnitCtx,
    value::Value,
};

/// Lifecycle of one executor instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// Instantiated, never run.
    Ready,
    /// Currently inside `run`.
    Running,
    /// Last run finished; may run again.
    Completed,
    /// An integrity fault occurred; the executor will not run again.
    Faulted,
}

/// Host-provided values for input variables, bound before each run.
#[derive(Clone, Debug, Default)]
pub struct ExternalValues {
    values: BTreeMap<String, Value>,
}

impl ExternalValues {
    /// No bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` for the next run, replacing any earlier binding.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Bound entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One contained unit failure from a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Node whose call failed.
    pub node: NodeId,
    /// Unit kind tag.
    pub unit: String,
    /// Failure reason.
    pub message: String,
}

/// Result of one successful tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// Values of output variables after the run, in name order.
    pub outputs: BTreeMap<String, Value>,
    /// Contained unit failures, in execution order. Empty on a clean tick.
    pub diagnostics: Vec<Diagnostic>,
}

/// A single-threaded interpreter instance over a shared program.
#[derive(Debug)]
pub struct Executor {
    program: Arc<Program>,
    regs: RegisterFile,
    state: UnitStateStore,
    status: RunStatus,
}

impl Executor {
    /// Instantiate registers for `program` and stand ready to run.
    pub fn new(program: Arc<Program>) -> RigResult<Self> {
        program.verify()?;
        let regs = RegisterFile::from_layout(&program.layout);
        Ok(Self {
            program,
            regs,
            state: UnitStateStore::default(),
            status: RunStatus::Ready,
        })
    }

    /// The program this executor runs.
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Current lifecycle status.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Current value of a variable.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        let slot = self.program.layout.variable_slots.get(name)?;
        Some(self.regs.get(*slot))
    }

    /// Replace the program, resetting registers to the new layout's defaults
    /// but keeping every node's state block. A recompiled graph therefore
    /// resumes stateful units where they left off.
    pub fn swap_program(&mut self, program: Arc<Program>) -> RigResult<()> {
        program.verify()?;
        self.regs = RegisterFile::from_layout(&program.layout);
        self.program = program;
        self.status = RunStatus::Ready;
        Ok(())
    }

    /// Run one tick.
    ///
    /// Binds `inputs` to input variables, interprets the program to `Halt`
    /// and reads back output variables. Unit failures become diagnostics.
    /// Binding errors leave the executor runnable; an integrity fault during
    /// interpretation moves it to [`RunStatus::Faulted`] permanently.
    #[tracing::instrument(skip_all, fields(fingerprint = %self.program.fingerprint))]
    pub fn run(&mut self, inputs: &ExternalValues) -> RigResult<TickReport> {
        if self.status == RunStatus::Faulted {
            return Err(RigError::integrity("executor is faulted"));
        }
        let program = Arc::clone(&self.program);
        self.bind_inputs(&program, inputs)?;
        self.status = RunStatus::Running;

        let mut diagnostics = Vec::new();
        match self.interpret(&program, &mut diagnostics) {
            Ok(()) => {
                self.status = RunStatus::Completed;
                let mut outputs = BTreeMap::new();
                for var in &program.variables {
                    if !var.output {
                        continue;
                    }
                    let slot = program
                        .layout
                        .variable_slots
                        .get(&var.name)
                        .ok_or_else(|| {
                            RigError::integrity(format!("unallocated variable '{}'", var.name))
                        })?;
                    outputs.insert(var.name.clone(), self.regs.get(*slot).clone());
                }
                Ok(TickReport {
                    outputs,
                    diagnostics,
                })
            }
            Err(err) => {
                self.status = RunStatus::Faulted;
                tracing::error!(error = %err, "executor faulted");
                Err(err)
            }
        }
    }

    fn bind_inputs(&mut self, program: &Program, inputs: &ExternalValues) -> RigResult<()> {
        for (name, value) in inputs.iter() {
            let var = program
                .variables
                .iter()
                .find(|v| v.name == name)
                .ok_or_else(|| RigError::binding(format!("unknown external value '{name}'")))?;
            if !var.input {
                return Err(RigError::binding(format!(
                    "variable '{name}' is not host-writable"
                )));
            }
            if !binds(var.ty, value) {
                return Err(RigError::binding(format!(
                    "external value '{name}' has incompatible type"
                )));
            }
            let slot = program
                .layout
                .variable_slots
                .get(name)
                .ok_or_else(|| RigError::integrity(format!("unallocated variable '{name}'")))?;
            self.regs.set(*slot, value.clone());
        }
        Ok(())
    }

    fn interpret(
        &mut self,
        program: &Program,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> RigResult<()> {
        let mut pc = 0usize;
        loop {
            let inst = program
                .instructions
                .get(pc)
                .ok_or_else(|| RigError::integrity(format!("pc {pc} out of range")))?;
            match *inst {
                Instruction::Copy { src, dst } => {
                    let value = self.regs.get(src).clone();
                    self.regs.set(dst, value);
                    pc += 1;
                }
                Instruction::CallUnit { call } => {
                    let call = program
                        .calls
                        .get(call as usize)
                        .ok_or_else(|| RigError::integrity("call index out of range"))?;
                    self.run_call(program, call, diagnostics)?;
                    pc += 1;
                }
                Instruction::JumpIfFalse { cond, target } => match self.regs.get(cond).as_bool() {
                    Some(true) => pc += 1,
                    Some(false) => pc = target as usize,
                    None => {
                        return Err(RigError::integrity(format!(
                            "jump condition at pc {pc} is not boolean"
                        )));
                    }
                },
                Instruction::Jump { target } => pc = target as usize,
                Instruction::Halt => return Ok(()),
            }
        }
    }

    fn run_call(
        &mut self,
        program: &Program,
        call: &UnitCall,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> RigResult<()> {
        let state = if call.stateful {
            Some(self.state.block_mut(call.node))
        } else {
            None
        };
        let mut ctx = UnitCtx::new(
            &call.pins,
            &call.slots,
            &self.regs,
            &call.config,
            &program.bones,
            state,
        );
        match call.unit.execute(&mut ctx) {
            Ok(()) => {
                for (pin, value) in ctx.into_staged() {
                    let slot = call.slots.get(pin).ok_or_else(|| {
                        RigError::integrity(format!(
                            "unit '{}' staged a write to unknown pin {pin}",
                            call.unit.kind()
                        ))
                    })?;
                    self.regs.set(*slot, value);
                }
                Ok(())
            }
            Err(failure) => {
                if !call.fallible {
                    return Err(RigError::integrity(format!(
                        "infallible unit '{}' failed: {}",
                        call.unit.kind(),
                        failure.message
                    )));
                }
                // Staged writes are dropped; the slots keep last tick's values.
                tracing::warn!(
                    node = call.node.0,
                    unit = call.unit.kind(),
                    message = %failure.message,
                    "unit evaluation failed"
                );
                diagnostics.push(Diagnostic {
                    node: call.node,
                    unit: call.unit.kind().to_string(),
                    message: failure.message,
                });
                Ok(())
            }
        }
    }
}

/// Whether `value` may be bound to a variable of type `ty`. Empty arrays
/// carry no element kind and bind to any array variable.
fn binds(ty: crate::value::PinType, value: &Value) -> bool {
    if let Value::Array(items) = value {
        if items.is_empty() {
            return ty.array;
        }
    }
    ty.accepts(value.pin_type())
}

#[cfg(test)]
#[path = "../../tests/unit/exec/vm.rs"]
mod tests;
