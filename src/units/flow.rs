//! Control-flow units: branch, counted loop, sequence.
//!
//! Flow units are mostly compiler artifacts: branching and sequencing lower
//! entirely to jump instructions, so their `execute` bodies are never
//! invoked. The loop unit is the exception: it runs once per iteration at
//! the loop header to test and advance its counter.

use std::sync::Arc;

use crate::{
    units::{ExecKind, PinDescriptor, SchemaCtx, Unit, UnitCatalog, UnitCtx, UnitResult},
    value::{PinType, Value, ValueKind},
};

/// Control slot continuing the chain after a node completes.
pub const SLOT_NEXT: &str = "next";
/// Branch arm taken when the condition is true.
pub const SLOT_THEN: &str = "then";
/// Branch arm taken when the condition is false.
pub const SLOT_ELSE: &str = "else";
/// Loop body arm, run once per iteration.
pub const SLOT_BODY: &str = "body";

/// Register every unit in this module.
pub fn register(catalog: &mut UnitCatalog) {
    catalog.register(Arc::new(Branch));
    catalog.register(Arc::new(For));
    catalog.register(Arc::new(Sequence));
}

/// Route execution to `then` or `else` on a boolean condition.
pub struct Branch;

impl Unit for Branch {
    fn kind(&self) -> &'static str {
        "flow.branch"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("condition", PinType::scalar(ValueKind::Bool))
                .with_default(Value::Bool(false)),
        ]
    }

    fn exec_kind(&self) -> ExecKind {
        ExecKind::Branch
    }

    fn execute(&self, _ctx: &mut UnitCtx<'_>) -> UnitResult {
        // Lowered to JumpIfFalse/Jump; never called.
        Ok(())
    }
}

/// Run the `body` arm `count` times, exposing the iteration index.
///
/// The iteration counter is the hidden `iter` input-output pin; the compiler
/// resets it from a zero literal at loop entry and calls this unit at the
/// loop header, where it publishes `index`, advances the counter and reports
/// whether the body should run again through `proceed`.
pub struct For;

impl Unit for For {
    fn kind(&self) -> &'static str {
        "flow.for"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("count", PinType::scalar(ValueKind::Int)).with_default(Value::Int(0)),
            PinDescriptor::inout("iter", PinType::scalar(ValueKind::Int)).with_default(Value::Int(0)),
            PinDescriptor::output("index", PinType::scalar(ValueKind::Int)),
            PinDescriptor::output("proceed", PinType::scalar(ValueKind::Bool)),
        ]
    }

    fn exec_kind(&self) -> ExecKind {
        ExecKind::Loop
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let count = ctx.in_int(0)?;
        let iter = ctx.in_int(1)?;
        let proceed = iter < count;
        ctx.set_out(1, Value::Int(iter + 1));
        ctx.set_out(2, Value::Int(iter));
        ctx.set_out(3, Value::Bool(proceed));
        Ok(())
    }
}

/// Run outgoing control slots one after another, in slot-name order.
pub struct Sequence;

impl Unit for Sequence {
    fn kind(&self) -> &'static str {
        "flow.sequence"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        Vec::new()
    }

    fn exec_kind(&self) -> ExecKind {
        ExecKind::Sequence
    }

    fn execute(&self, _ctx: &mut UnitCtx<'_>) -> UnitResult {
        // Lowered to straight-line emission; never called.
        Ok(())
    }
}
