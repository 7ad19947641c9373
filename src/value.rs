//! Runtime values and pin typing.

use crate::foundation::math::{Quat, Transform, Vec3};

/// Closed set of scalar value kinds a pin can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// 3D vector.
    Vec3,
    /// Rotation quaternion.
    Quat,
    /// Bone TRS transform.
    Transform,
    /// Interned-style name/string (bone names, curve names).
    Name,
}

/// Full pin type: a value kind plus the array flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PinType {
    /// Element kind.
    pub kind: ValueKind,
    /// When true the pin carries an array of `kind` elements.
    pub array: bool,
}

impl PinType {
    /// Scalar (non-array) type of `kind`.
    pub const fn scalar(kind: ValueKind) -> Self {
        Self { kind, array: false }
    }

    /// Array type of `kind`.
    pub const fn array(kind: ValueKind) -> Self {
        Self { kind, array: true }
    }

    /// Whether a value of type `src` may feed a pin of this type.
    ///
    /// Exact matches are accepted, plus the one defined implicit conversion
    /// `Int -> Float` (scalar only).
    pub fn accepts(self, src: PinType) -> bool {
        if self == src {
            return true;
        }
        !self.array && !src.array && self.kind == ValueKind::Float && src.kind == ValueKind::Int
    }
}

/// A runtime value held in one register slot.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// 3D vector.
    Vec3(Vec3),
    /// Quaternion.
    Quat(Quat),
    /// Bone transform.
    Transform(Transform),
    /// Name/string.
    Name(String),
    /// Homogeneous array of values.
    Array(Vec<Value>),
}

impl Value {
    /// Default value for a pin type: `false`/`0`/identity/empty.
    pub fn default_for(ty: PinType) -> Self {
        if ty.array {
            return Value::Array(Vec::new());
        }
        match ty.kind {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Int => Value::Int(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Vec3 => Value::Vec3(Vec3::ZERO),
            ValueKind::Quat => Value::Quat(Quat::IDENTITY),
            ValueKind::Transform => Value::Transform(Transform::IDENTITY),
            ValueKind::Name => Value::Name(String::new()),
        }
    }

    /// The pin type this value inhabits. Array element kind is taken from the
    /// first element; an empty array reports `Name` elements arbitrarily and
    /// is accepted anywhere by validation.
    pub fn pin_type(&self) -> PinType {
        match self {
            Value::Bool(_) => PinType::scalar(ValueKind::Bool),
            Value::Int(_) => PinType::scalar(ValueKind::Int),
            Value::Float(_) => PinType::scalar(ValueKind::Float),
            Value::Vec3(_) => PinType::scalar(ValueKind::Vec3),
            Value::Quat(_) => PinType::scalar(ValueKind::Quat),
            Value::Transform(_) => PinType::scalar(ValueKind::Transform),
            Value::Name(_) => PinType::scalar(ValueKind::Name),
            Value::Array(items) => PinType::array(
                items
                    .first()
                    .map(|v| v.pin_type().kind)
                    .unwrap_or(ValueKind::Name),
            ),
        }
    }

    /// Read as float, coercing `Int`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Read as integer (no coercion).
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Read as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Read as Vec3.
    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Value::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    /// Read as quaternion.
    pub fn as_quat(&self) -> Option<Quat> {
        match self {
            Value::Quat(v) => Some(*v),
            _ => None,
        }
    }

    /// Read as transform.
    pub fn as_transform(&self) -> Option<Transform> {
        match self {
            Value::Transform(v) => Some(*v),
            _ => None,
        }
    }

    /// Read as name string.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Value::Name(v) => Some(v),
            _ => None,
        }
    }

    /// Read as array slice.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }
}
