//! Pure 3D vector and quaternion units.

use std::sync::Arc;

use crate::{
    foundation::math::Vec3,
    units::{EvalFailure, PinDescriptor, SchemaCtx, Unit, UnitCatalog, UnitCtx, UnitResult},
    value::{PinType, Value, ValueKind},
};

const FLOAT: PinType = PinType::scalar(ValueKind::Float);
const VEC3: PinType = PinType::scalar(ValueKind::Vec3);
const QUAT: PinType = PinType::scalar(ValueKind::Quat);

/// Register every unit in this module.
pub fn register(catalog: &mut UnitCatalog) {
    catalog.register(Arc::new(Make));
    catalog.register(Arc::new(Scale));
    catalog.register(Arc::new(AxisAngle));
    catalog.register(Arc::new(Slerp));
}

/// Assemble a vector from scalar components.
pub struct Make;

impl Unit for Make {
    fn kind(&self) -> &'static str {
        "vec3.make"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("x", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::input("y", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::input("z", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::output("result", VEC3),
        ]
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let v = Vec3::new(ctx.in_float(0)?, ctx.in_float(1)?, ctx.in_float(2)?);
        ctx.set_out(3, Value::Vec3(v));
        Ok(())
    }
}

/// Uniform vector scale.
pub struct Scale;

impl Unit for Scale {
    fn kind(&self) -> &'static str {
        "vec3.scale"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("value", VEC3).with_default(Value::Vec3(Vec3::ZERO)),
            PinDescriptor::input("factor", FLOAT).with_default(Value::Float(1.0)),
            PinDescriptor::output("result", VEC3),
        ]
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let v = ctx.in_vec3(0)?.scale(ctx.in_float(1)?);
        ctx.set_out(2, Value::Vec3(v));
        Ok(())
    }
}

/// Rotation from an axis and an angle in radians; fails on a zero axis.
pub struct AxisAngle;

impl Unit for AxisAngle {
    fn kind(&self) -> &'static str {
        "quat.axis_angle"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("axis", VEC3).with_default(Value::Vec3(Vec3::new(0.0, 0.0, 1.0))),
            PinDescriptor::input("angle", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::output("result", QUAT),
        ]
    }

    fn fallible(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let q = crate::foundation::math::Quat::from_axis_angle(ctx.in_vec3(0)?, ctx.in_float(1)?)
            .map_err(|_| EvalFailure::msg("rotation axis must be non-zero"))?;
        ctx.set_out(2, Value::Quat(q));
        Ok(())
    }
}

/// Spherical interpolation between two rotations.
pub struct Slerp;

impl Unit for Slerp {
    fn kind(&self) -> &'static str {
        "quat.slerp"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("a", QUAT)
                .with_default(Value::Quat(crate::foundation::math::Quat::IDENTITY)),
            PinDescriptor::input("b", QUAT)
                .with_default(Value::Quat(crate::foundation::math::Quat::IDENTITY)),
            PinDescriptor::input("t", FLOAT).with_default(Value::Float(0.0)),
            PinDescriptor::output("result", QUAT),
        ]
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let q = ctx
            .in_quat(0)?
            .slerp(ctx.in_quat(1)?, ctx.in_float(2)?.clamp(0.0, 1.0));
        ctx.set_out(3, Value::Quat(q));
        Ok(())
    }
}
