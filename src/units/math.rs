//! Pure scalar arithmetic, comparison and logic units.

use std::sync::Arc;

use crate::{
    units::{EvalFailure, PinDescriptor, SchemaCtx, Unit, UnitCatalog, UnitCtx, UnitResult},
    value::{PinType, Value, ValueKind},
};

const FLOAT: PinType = PinType::scalar(ValueKind::Float);
const BOOL: PinType = PinType::scalar(ValueKind::Bool);

fn binary_float_pins() -> Vec<PinDescriptor> {
    vec![
        PinDescriptor::input("a", FLOAT).with_default(Value::Float(0.0)),
        PinDescriptor::input("b", FLOAT).with_default(Value::Float(0.0)),
        PinDescriptor::output("result", FLOAT),
    ]
}

/// Register every unit in this module.
pub fn register(catalog: &mut UnitCatalog) {
    catalog.register(Arc::new(Add));
    catalog.register(Arc::new(Subtract));
    catalog.register(Arc::new(Multiply));
    catalog.register(Arc::new(Divide));
    catalog.register(Arc::new(Lerp));
    catalog.register(Arc::new(Less));
    catalog.register(Arc::new(Greater));
    catalog.register(Arc::new(Not));
    catalog.register(Arc::new(And));
    catalog.register(Arc::new(Or));
}

/// `result = a + b`.
pub struct Add;

impl Unit for Add {
    fn kind(&self) -> &'static str {
        "math.add"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        binary_float_pins()
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let v = ctx.in_float(0)? + ctx.in_float(1)?;
        ctx.set_out(2, Value::Float(v));
        Ok(())
    }
}

/// `result = a - b`.
pub struct Subtract;

impl Unit for Subtract {
    fn kind(&self) -> &'static str {
        "math.subtract"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        binary_float_pins()
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let v = ctx.in_float(0)? - ctx.in_float(1)?;
        ctx.set_out(2, Value::Float(v));
        Ok(())
    }
}

/// `result = a * b`.
pub struct Multiply;

impl Unit for Multiply {
    fn kind(&self) -> &'static str {
        "math.multiply"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        binary_float_pins()
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let v = ctx.in_float(0)? * ctx.in_float(1)?;
        ctx.set_out(2, Value::Float(v));
        Ok(())
    }
}

/// `result = a / b`; signals a recoverable failure when `b` is zero.
pub struct Divide;

impl Unit for Divide {
    fn kind(&self) -> &'static str {
        "math.divide"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("a", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::input("b", FLOAT).with_default(Value::Float(1.0)),
            PinDescriptor::output("result", FLOAT),
        ]
    }

    fn fallible(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let b = ctx.in_float(1)?;
        if b == 0.0 {
            return Err(EvalFailure::msg("division by zero"));
        }
        let v = ctx.in_float(0)? / b;
        ctx.set_out(2, Value::Float(v));
        Ok(())
    }
}

/// `result = a + (b - a) * t`, `t` unclamped.
pub struct Lerp;

impl Unit for Lerp {
    fn kind(&self) -> &'static str {
        "math.lerp"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("a", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::input("b", FLOAT).with_default(Value::Float(1.0)),
            PinDescriptor::input("t", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::output("result", FLOAT),
        ]
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let (a, b, t) = (ctx.in_float(0)?, ctx.in_float(1)?, ctx.in_float(2)?);
        ctx.set_out(3, Value::Float(a + (b - a) * t));
        Ok(())
    }
}

/// `result = a < b`.
pub struct Less;

impl Unit for Less {
    fn kind(&self) -> &'static str {
        "math.less"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("a", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::input("b", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::output("result", BOOL),
        ]
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let v = ctx.in_float(0)? < ctx.in_float(1)?;
        ctx.set_out(2, Value::Bool(v));
        Ok(())
    }
}

/// `result = a > b`.
pub struct Greater;

impl Unit for Greater {
    fn kind(&self) -> &'static str {
        "math.greater"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("a", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::input("b", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::output("result", BOOL),
        ]
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let v = ctx.in_float(0)? > ctx.in_float(1)?;
        ctx.set_out(2, Value::Bool(v));
        Ok(())
    }
}

/// Boolean negation.
pub struct Not;

impl Unit for Not {
    fn kind(&self) -> &'static str {
        "logic.not"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("value", BOOL).with_default(Value::Bool(false)),
            PinDescriptor::output("result", BOOL),
        ]
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let v = !ctx.in_bool(0)?;
        ctx.set_out(1, Value::Bool(v));
        Ok(())
    }
}

/// Boolean conjunction.
pub struct And;

impl Unit for And {
    fn kind(&self) -> &'static str {
        "logic.and"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("a", BOOL).with_default(Value::Bool(false)),
            PinDescriptor::input("b", BOOL).with_default(Value::Bool(false)),
            PinDescriptor::output("result", BOOL),
        ]
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let v = ctx.in_bool(0)? && ctx.in_bool(1)?;
        ctx.set_out(2, Value::Bool(v));
        Ok(())
    }
}

/// Boolean disjunction.
pub struct Or;

impl Unit for Or {
    fn kind(&self) -> &'static str {
        "logic.or"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("a", BOOL).with_default(Value::Bool(false)),
            PinDescriptor::input("b", BOOL).with_default(Value::Bool(false)),
            PinDescriptor::output("result", BOOL),
        ]
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let v = ctx.in_bool(0)? || ctx.in_bool(1)?;
        ctx.set_out(2, Value::Bool(v));
        Ok(())
    }
}
