//! Stateful units: integrators that carry a private state block across ticks.
//!
//! State blocks are owned by the node instance and survive recompiles; they
//! are invisible to the compiler's dependency analysis, which is why these
//! units run as actions (exactly once per tick, in chain order).

use std::sync::Arc;

use crate::{
    units::{
        EvalFailure, ExecKind, PinDescriptor, SchemaCtx, Unit, UnitCatalog, UnitCtx, UnitResult,
    },
    value::{PinType, Value, ValueKind},
};

const FLOAT: PinType = PinType::scalar(ValueKind::Float);

/// Register every unit in this module.
pub fn register(catalog: &mut UnitCatalog) {
    catalog.register(Arc::new(Accumulate));
    catalog.register(Arc::new(Spring));
}

/// Running sum: `result = previous result + value`.
pub struct Accumulate;

impl Unit for Accumulate {
    fn kind(&self) -> &'static str {
        "state.accumulate"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("value", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::output("result", FLOAT),
        ]
    }

    fn exec_kind(&self) -> ExecKind {
        ExecKind::Action
    }

    fn stateful(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let value = ctx.in_float(0)?;
        let state = ctx.state(|| Value::Float(0.0))?;
        let sum = state.as_float().ok_or_else(|| {
            EvalFailure::msg("accumulator state corrupted (expected float)")
        })? + value;
        *state = Value::Float(sum);
        ctx.set_out(1, Value::Float(sum));
        Ok(())
    }
}

/// Damped spring integrator easing `result` toward `target` each tick.
///
/// Semi-implicit Euler over the tick interval; state is `[position,
/// velocity]`. `stiffness` and `damping` follow the usual spring-damper
/// formulation.
pub struct Spring;

impl Unit for Spring {
    fn kind(&self) -> &'static str {
        "state.spring"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("target", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::input("stiffness", FLOAT).with_default(Value::Float(100.0)),
            PinDescriptor::input("damping", FLOAT).with_default(Value::Float(10.0)),
            PinDescriptor::input("dt", FLOAT).with_default(Value::Float(1.0 / 60.0)),
            PinDescriptor::output("result", FLOAT),
        ]
    }

    fn exec_kind(&self) -> ExecKind {
        ExecKind::Action
    }

    fn stateful(&self) -> bool {
        true
    }

    fn fallible(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let target = ctx.in_float(0)?;
        let stiffness = ctx.in_float(1)?.max(0.0);
        let damping = ctx.in_float(2)?.max(0.0);
        let dt = ctx.in_float(3)?;
        if !dt.is_finite() || dt <= 0.0 {
            return Err(EvalFailure::msg("spring dt must be finite and > 0"));
        }

        let state = ctx.state(|| Value::Array(vec![Value::Float(0.0), Value::Float(0.0)]))?;
        let (pos, vel) = match state.as_array() {
            Some([p, v]) => (
                p.as_float().unwrap_or(0.0),
                v.as_float().unwrap_or(0.0),
            ),
            _ => (0.0, 0.0),
        };

        let accel = stiffness * (target - pos) - damping * vel;
        let vel = vel + accel * dt;
        let pos = pos + vel * dt;

        *state = Value::Array(vec![Value::Float(pos), Value::Float(vel)]);
        ctx.set_out(4, Value::Float(pos));
        Ok(())
    }
}
