//! The unit contract and the built-in unit catalog.
//!
//! A unit kind is a polymorphic capability: a pin schema plus an `execute`
//! implementation. The catalog is the extension surface of the crate; hosts
//! register additional kinds on [`UnitCatalog`].

use std::collections::BTreeMap;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::{
    compile::program::SlotId,
    exec::registers::RegisterFile,
    graph::model::VariableDef,
    value::{PinType, Value},
};

pub mod flow;
pub mod math;
pub mod rig;
pub mod state;
pub mod var;
pub mod vec;

/// Direction of a pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinDir {
    /// Read by the unit.
    Input,
    /// Written by the unit.
    Output,
    /// Read and written in place (e.g. a pose flowing through a rig chain).
    InOut,
}

/// Declared pin of a unit kind: name, direction, type, literal default.
#[derive(Clone, Debug, PartialEq)]
pub struct PinDescriptor {
    /// Name, unique within the unit's schema. Immutable after instantiation.
    pub name: &'static str,
    /// Direction.
    pub dir: PinDir,
    /// Value type.
    pub ty: PinType,
    /// Literal default used when an input has no incoming link.
    pub default: Option<Value>,
    /// Unlinked inputs without a default are a validation error unless
    /// marked optional.
    pub optional: bool,
}

impl PinDescriptor {
    /// Input pin of `ty`.
    pub fn input(name: &'static str, ty: PinType) -> Self {
        Self {
            name,
            dir: PinDir::Input,
            ty,
            default: None,
            optional: false,
        }
    }

    /// Output pin of `ty`.
    pub fn output(name: &'static str, ty: PinType) -> Self {
        Self {
            name,
            dir: PinDir::Output,
            ty,
            default: None,
            optional: false,
        }
    }

    /// Input-output pin of `ty`.
    pub fn inout(name: &'static str, ty: PinType) -> Self {
        Self {
            name,
            dir: PinDir::InOut,
            ty,
            default: None,
            optional: false,
        }
    }

    /// Attach a literal default.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Mark the pin optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether the unit reads this pin.
    pub fn is_read(&self) -> bool {
        matches!(self.dir, PinDir::Input | PinDir::InOut)
    }

    /// Whether the unit writes this pin.
    pub fn is_written(&self) -> bool {
        matches!(self.dir, PinDir::Output | PinDir::InOut)
    }
}

/// How a unit participates in execution ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecKind {
    /// No control pins; scheduled on demand by data dependency. Must be
    /// idempotent: the compiler may evaluate it once per control region.
    Pure,
    /// Sits on the execution chain; at most one outgoing `next` edge.
    Action,
    /// Two-way branch with `then`/`else` arms and a `next` continuation.
    Branch,
    /// Counted loop with a `body` arm and a `next` continuation.
    Loop,
    /// Runs its outgoing control slots in lexicographic slot-name order.
    Sequence,
}

impl ExecKind {
    /// Whether nodes of this kind sit on the execution chain at all.
    pub fn is_executable(self) -> bool {
        !matches!(self, ExecKind::Pure)
    }
}

/// Context handed to [`Unit::pins`]: the instance config plus graph-level
/// declarations the schema may depend on (variable types).
pub struct SchemaCtx<'a> {
    /// Per-instance configuration blob.
    pub config: &'a serde_json::Value,
    /// Graph variable declarations.
    pub variables: &'a [VariableDef],
}

/// Non-fatal failure signaled by a unit for one tick.
///
/// The executor records a diagnostic, leaves the unit's output slots at their
/// previous values and continues the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalFailure {
    /// Human-readable reason.
    pub message: String,
}

impl EvalFailure {
    /// Build a failure from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of one `execute` call.
pub type UnitResult = Result<(), EvalFailure>;

/// Mapping from bone name to pose-array index, resolved once per program.
pub type BoneMap = BTreeMap<String, usize>;

/// Execution context for one `CallUnit` instruction.
///
/// Inputs are read straight from the register file; outputs are staged and
/// committed by the executor only when `execute` returns `Ok`, which is what
/// guarantees that a failing unit leaves its outputs at their previous
/// tick's values.
pub struct UnitCtx<'a> {
    pins: &'a [PinDescriptor],
    slots: &'a [SlotId],
    regs: &'a RegisterFile,
    config: &'a serde_json::Value,
    bones: &'a BoneMap,
    state: Option<&'a mut Option<Value>>,
    staged: SmallVec<[(usize, Value); 4]>,
}

impl<'a> UnitCtx<'a> {
    pub(crate) fn new(
        pins: &'a [PinDescriptor],
        slots: &'a [SlotId],
        regs: &'a RegisterFile,
        config: &'a serde_json::Value,
        bones: &'a BoneMap,
        state: Option<&'a mut Option<Value>>,
    ) -> Self {
        Self {
            pins,
            slots,
            regs,
            config,
            bones,
            state,
            staged: SmallVec::new(),
        }
    }

    pub(crate) fn into_staged(self) -> SmallVec<[(usize, Value); 4]> {
        self.staged
    }

    /// Raw value of pin `pin` (schema order).
    pub fn input(&self, pin: usize) -> Result<&Value, EvalFailure> {
        let slot = *self
            .slots
            .get(pin)
            .ok_or_else(|| EvalFailure::msg(format!("pin index {pin} out of range")))?;
        Ok(self.regs.get(slot))
    }

    /// Float input, coercing `Int`.
    pub fn in_float(&self, pin: usize) -> Result<f64, EvalFailure> {
        self.input(pin)?
            .as_float()
            .ok_or_else(|| self.type_failure(pin, "float"))
    }

    /// Integer input.
    pub fn in_int(&self, pin: usize) -> Result<i64, EvalFailure> {
        self.input(pin)?
            .as_int()
            .ok_or_else(|| self.type_failure(pin, "int"))
    }

    /// Boolean input.
    pub fn in_bool(&self, pin: usize) -> Result<bool, EvalFailure> {
        self.input(pin)?
            .as_bool()
            .ok_or_else(|| self.type_failure(pin, "bool"))
    }

    /// Vec3 input.
    pub fn in_vec3(&self, pin: usize) -> Result<crate::foundation::math::Vec3, EvalFailure> {
        self.input(pin)?
            .as_vec3()
            .ok_or_else(|| self.type_failure(pin, "vec3"))
    }

    /// Quaternion input.
    pub fn in_quat(&self, pin: usize) -> Result<crate::foundation::math::Quat, EvalFailure> {
        self.input(pin)?
            .as_quat()
            .ok_or_else(|| self.type_failure(pin, "quat"))
    }

    /// Transform input.
    pub fn in_transform(
        &self,
        pin: usize,
    ) -> Result<crate::foundation::math::Transform, EvalFailure> {
        self.input(pin)?
            .as_transform()
            .ok_or_else(|| self.type_failure(pin, "transform"))
    }

    /// Array input.
    pub fn in_array(&self, pin: usize) -> Result<&[Value], EvalFailure> {
        self.input(pin)?
            .as_array()
            .ok_or_else(|| self.type_failure(pin, "array"))
    }

    /// Stage a write to pin `pin`. Committed only if `execute` returns `Ok`.
    pub fn set_out(&mut self, pin: usize, value: Value) {
        self.staged.push((pin, value));
    }

    /// Per-instance configuration blob.
    pub fn config(&self) -> &serde_json::Value {
        self.config
    }

    /// Required string field of the config blob.
    pub fn config_str(&self, key: &str) -> Result<&str, EvalFailure> {
        self.config
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| EvalFailure::msg(format!("config field '{key}' must be a string")))
    }

    /// Boolean config field with a default.
    pub fn config_bool(&self, key: &str, default: bool) -> bool {
        self.config
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    /// Pose-array index of a bone name; `None` when the skeleton lacks it.
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.get(name).copied()
    }

    /// Private state block of this node instance. Only available to units
    /// that declare themselves stateful; initialized on first access.
    pub fn state(&mut self, init: impl FnOnce() -> Value) -> Result<&mut Value, EvalFailure> {
        match &mut self.state {
            Some(slot) => Ok(slot.get_or_insert_with(init)),
            None => Err(EvalFailure::msg("unit is not declared stateful")),
        }
    }

    fn type_failure(&self, pin: usize, expected: &str) -> EvalFailure {
        let name = self.pins.get(pin).map(|p| p.name).unwrap_or("?");
        EvalFailure::msg(format!("pin '{name}' expected {expected}"))
    }
}

/// A unit kind: pin schema plus execute contract.
///
/// `execute` must be pure-functional over its declared inputs/outputs unless
/// the unit declares itself stateful, in which case it may additionally read
/// and write a private per-instance state block that is invisible to the
/// compiler's dependency analysis.
pub trait Unit: Send + Sync {
    /// Stable kind tag (e.g. `rig.set_bone`).
    fn kind(&self) -> &'static str;

    /// Pin schema for an instance with the given config.
    fn pins(&self, ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor>;

    /// Execution-ordering role.
    fn exec_kind(&self) -> ExecKind {
        ExecKind::Pure
    }

    /// Whether `execute` can signal [`EvalFailure`]. Fallible units keep
    /// their output slots exempt from register reuse so a failure provably
    /// leaves the previous tick's values in place.
    fn fallible(&self) -> bool {
        false
    }

    /// Whether the unit keeps a private state block across ticks.
    fn stateful(&self) -> bool {
        false
    }

    /// Run one evaluation.
    fn execute(&self, ctx: &mut UnitCtx<'_>) -> UnitResult;
}

/// Registry of unit kinds, keyed by kind tag.
///
/// Read-only for editors (palette population); the compiler resolves kind
/// tags to direct call targets through it once per compile.
#[derive(Clone)]
pub struct UnitCatalog {
    by_kind: BTreeMap<&'static str, Arc<dyn Unit>>,
}

impl UnitCatalog {
    /// Empty catalog.
    pub fn empty() -> Self {
        Self {
            by_kind: BTreeMap::new(),
        }
    }

    /// Catalog with every built-in unit registered.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::empty();
        math::register(&mut catalog);
        vec::register(&mut catalog);
        rig::register(&mut catalog);
        state::register(&mut catalog);
        flow::register(&mut catalog);
        var::register(&mut catalog);
        catalog
    }

    /// Register a unit kind. Later registrations replace earlier ones.
    pub fn register(&mut self, unit: Arc<dyn Unit>) {
        self.by_kind.insert(unit.kind(), unit);
    }

    /// Resolve a kind tag.
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn Unit>> {
        self.by_kind.get(kind)
    }

    /// Registered kind tags in sorted order.
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_kind.keys().copied()
    }
}

impl std::fmt::Debug for UnitCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitCatalog")
            .field("kinds", &self.by_kind.keys().collect::<Vec<_>>())
            .finish()
    }
}
