use super::*;
use crate::{
    compile::program::{RegisterLayout, SlotId},
    exec::registers::RegisterFile,
    foundation::math::{Transform, Vec3},
    units::BoneMap,
};

fn regs_for(values: Vec<Value>) -> (RegisterFile, Vec<SlotId>) {
    let layout = RegisterLayout {
        types: values.iter().map(|v| v.pin_type()).collect(),
        defaults: values,
        ..RegisterLayout::default()
    };
    let slots = (0..layout.defaults.len())
        .map(|i| SlotId(i as u32))
        .collect();
    (RegisterFile::from_layout(&layout), slots)
}

fn bones() -> BoneMap {
    let mut map = BoneMap::new();
    map.insert("root".to_string(), 0);
    map.insert("spine".to_string(), 1);
    map
}

fn pose(root: Transform, spine: Transform) -> Value {
    Value::Array(vec![Value::Transform(root), Value::Transform(spine)])
}

fn translated(x: f64, y: f64, z: f64) -> Transform {
    Transform {
        translation: Vec3::new(x, y, z),
        ..Transform::IDENTITY
    }
}

#[test]
fn get_bone_reads_by_name() {
    let unit = GetBone;
    let cfg = serde_json::json!({"bone": "spine"});
    let pins = unit.pins(&SchemaCtx {
        config: &cfg,
        variables: &[],
    });
    let (regs, slots) = regs_for(vec![
        pose(Transform::IDENTITY, translated(1.0, 2.0, 3.0)),
        Value::Transform(Transform::IDENTITY),
    ]);
    let bones = bones();
    let mut ctx = UnitCtx::new(&pins, &slots, &regs, &cfg, &bones, None);
    unit.execute(&mut ctx).unwrap();
    let staged = ctx.into_staged();
    assert_eq!(staged.len(), 1);
    assert_eq!(
        staged[0],
        (1, Value::Transform(translated(1.0, 2.0, 3.0)))
    );
}

#[test]
fn missing_bone_is_a_recoverable_failure() {
    let unit = GetBone;
    let cfg = serde_json::json!({"bone": "tail"});
    let pins = unit.pins(&SchemaCtx {
        config: &cfg,
        variables: &[],
    });
    let (regs, slots) = regs_for(vec![
        pose(Transform::IDENTITY, Transform::IDENTITY),
        Value::Transform(Transform::IDENTITY),
    ]);
    let bones = bones();
    let mut ctx = UnitCtx::new(&pins, &slots, &regs, &cfg, &bones, None);
    let err = unit.execute(&mut ctx).unwrap_err();
    assert!(err.message.contains("not found"));
    assert!(ctx.into_staged().is_empty());
}

#[test]
fn set_bone_blends_by_weight() {
    let unit = SetBone;
    let cfg = serde_json::json!({"bone": "spine"});
    let pins = unit.pins(&SchemaCtx {
        config: &cfg,
        variables: &[],
    });
    let (regs, slots) = regs_for(vec![
        pose(Transform::IDENTITY, Transform::IDENTITY),
        Value::Transform(translated(2.0, 0.0, 0.0)),
        Value::Float(0.5),
    ]);
    let bones = bones();
    let mut ctx = UnitCtx::new(&pins, &slots, &regs, &cfg, &bones, None);
    unit.execute(&mut ctx).unwrap();
    let staged = ctx.into_staged();
    assert_eq!(staged.len(), 1);
    let (pin, value) = &staged[0];
    assert_eq!(*pin, 0);
    let spine = value.as_array().unwrap()[1].as_transform().unwrap();
    assert_eq!(spine.translation, Vec3::new(1.0, 0.0, 0.0));
}

#[test]
fn copy_rotation_axes_copies_only_enabled_axes() {
    let unit = CopyRotationAxes;
    let cfg = serde_json::json!({
        "source": "root",
        "target": "spine",
        "x": false,
        "y": false,
        "z": true,
    });
    let pins = unit.pins(&SchemaCtx {
        config: &cfg,
        variables: &[],
    });
    let source = Transform {
        rotation: Quat::from_euler_xyz(Vec3::new(0.4, 0.0, 0.7)),
        ..Transform::IDENTITY
    };
    let (regs, slots) = regs_for(vec![
        pose(source, Transform::IDENTITY),
        Value::Float(1.0),
    ]);
    let bones = bones();
    let mut ctx = UnitCtx::new(&pins, &slots, &regs, &cfg, &bones, None);
    unit.execute(&mut ctx).unwrap();
    let staged = ctx.into_staged();
    let spine = staged[0].1.as_array().unwrap()[1].as_transform().unwrap();
    let e = spine.rotation.to_euler_xyz();
    assert!(e.x.abs() < 1e-9, "x axis must not be copied: {e:?}");
    assert!(e.y.abs() < 1e-9, "y axis must not be copied: {e:?}");
    assert!((e.z - 0.7).abs() < 1e-9, "z axis must be copied: {e:?}");
}
