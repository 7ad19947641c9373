//! Skeletal pose units.
//!
//! The pose flows through the execution chain as an array-of-transform value
//! on input-output pins, indexed in skeleton bone order. Bone names are
//! resolved per tick; a missing bone degrades to a recoverable failure
//! instead of aborting the run.

use std::sync::Arc;

use crate::{
    foundation::math::Quat,
    units::{
        EvalFailure, ExecKind, PinDescriptor, SchemaCtx, Unit, UnitCatalog, UnitCtx, UnitResult,
    },
    value::{PinType, Value, ValueKind},
};

const FLOAT: PinType = PinType::scalar(ValueKind::Float);
const TRANSFORM: PinType = PinType::scalar(ValueKind::Transform);
const POSE: PinType = PinType::array(ValueKind::Transform);

/// Register every unit in this module.
pub fn register(catalog: &mut UnitCatalog) {
    catalog.register(Arc::new(GetBone));
    catalog.register(Arc::new(SetBone));
    catalog.register(Arc::new(CopyRotationAxes));
}

fn bone_transform(ctx: &UnitCtx<'_>, pose_pin: usize, key: &str) -> Result<(usize, crate::foundation::math::Transform), EvalFailure> {
    let name = ctx.config_str(key)?;
    let index = ctx
        .bone_index(name)
        .ok_or_else(|| EvalFailure::msg(format!("bone '{name}' not found in skeleton")))?;
    let pose = ctx.in_array(pose_pin)?;
    let transform = pose
        .get(index)
        .and_then(|v| v.as_transform())
        .ok_or_else(|| EvalFailure::msg(format!("pose has no transform for bone '{name}'")))?;
    Ok((index, transform))
}

/// Read one bone's transform out of a pose. Config: `{"bone": name}`.
pub struct GetBone;

impl Unit for GetBone {
    fn kind(&self) -> &'static str {
        "rig.get_bone"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::input("pose", POSE),
            PinDescriptor::output("transform", TRANSFORM),
        ]
    }

    fn fallible(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let (_, transform) = bone_transform(ctx, 0, "bone")?;
        ctx.set_out(1, Value::Transform(transform));
        Ok(())
    }
}

/// Write one bone's transform into the pose, blended by `weight`.
/// Config: `{"bone": name}`.
pub struct SetBone;

impl Unit for SetBone {
    fn kind(&self) -> &'static str {
        "rig.set_bone"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::inout("pose", POSE),
            PinDescriptor::input("transform", TRANSFORM)
                .with_default(Value::Transform(crate::foundation::math::Transform::IDENTITY)),
            PinDescriptor::input("weight", FLOAT).with_default(Value::Float(1.0)),
        ]
    }

    fn exec_kind(&self) -> ExecKind {
        ExecKind::Action
    }

    fn fallible(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let (index, current) = bone_transform(ctx, 0, "bone")?;
        let target = ctx.in_transform(1)?;
        let weight = ctx.in_float(2)?.clamp(0.0, 1.0);
        let mut pose = ctx.in_array(0)?.to_vec();
        pose[index] = Value::Transform(current.blend(target, weight));
        ctx.set_out(0, Value::Array(pose));
        Ok(())
    }
}

/// Copy selected rotation axes from a source bone onto a target bone.
///
/// Config: `{"source": name, "target": name, "x": bool, "y": bool, "z": bool}`
/// with all axes defaulting to enabled. The copy decomposes both rotations to
/// intrinsic XYZ euler angles, substitutes the enabled components and blends
/// the recomposed rotation onto the target by `weight`.
pub struct CopyRotationAxes;

impl Unit for CopyRotationAxes {
    fn kind(&self) -> &'static str {
        "rig.copy_rotation_axes"
    }

    fn pins(&self, _ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor::inout("pose", POSE),
            PinDescriptor::input("weight", FLOAT).with_default(Value::Float(1.0)),
        ]
    }

    fn exec_kind(&self) -> ExecKind {
        ExecKind::Action
    }

    fn fallible(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult {
        let (_, source) = bone_transform(ctx, 0, "source")?;
        let (target_index, target) = bone_transform(ctx, 0, "target")?;
        let weight = ctx.in_float(1)?.clamp(0.0, 1.0);

        let src_e = source.rotation.to_euler_xyz();
        let mut e = target.rotation.to_euler_xyz();
        if ctx.config_bool("x", true) {
            e.x = src_e.x;
        }
        if ctx.config_bool("y", true) {
            e.y = src_e.y;
        }
        if ctx.config_bool("z", true) {
            e.z = src_e.z;
        }
        let copied = Quat::from_euler_xyz(e);

        let mut updated = target;
        updated.rotation = target.rotation.slerp(copied, weight);

        let mut pose = ctx.in_array(0)?.to_vec();
        pose[target_index] = Value::Transform(updated);
        ctx.set_out(0, Value::Array(pose));
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/units/rig.rs"]
mod tests;
