//! Variable access units.
//!
//! Both kinds lower away at compile time: `var.get` aliases the variable's
//! register slot and `var.set` becomes a `Copy` instruction. They exist so
//! variable access is authored with ordinary nodes and links.

use std::sync::Arc;

use crate::{
    units::{ExecKind, PinDescriptor, SchemaCtx, Unit, UnitCatalog, UnitCtx, UnitResult},
    value::{PinType, ValueKind},
};

/// Register every unit in this module.
pub fn register(catalog: &mut UnitCatalog) {
    catalog.register(Arc::new(Get));
    catalog.register(Arc::new(Set));
}

fn variable_type(ctx: &SchemaCtx<'_>) -> PinType {
    ctx.config
        .get("name")
        .and_then(|v| v.as_str())
        .and_then(|name| ctx.variables.iter().find(|var| var.name == name))
        .map(|var| var.ty)
        // Unknown variables are reported by validation; any type works here.
        .unwrap_or(PinType::scalar(ValueKind::Float))
}

/// Read a graph variable. Config: `{"name": variable}`.
pub struct Get;

impl Unit for Get {
    fn kind(&self) -> &'static str {
        "var.get"
    }

    fn pins(&self, ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![PinDescriptor::output("value", variable_type(ctx))]
    }

    fn execute(&self, _ctx: &mut UnitCtx<'_>) -> UnitResult {
        // Lowered to a slot alias; never called.
        Ok(())
    }
}

/// Write a graph variable. Config: `{"name": variable}`.
pub struct Set;

impl Unit for Set {
    fn kind(&self) -> &'static str {
        "var.set"
    }

    fn pins(&self, ctx: &SchemaCtx<'_>) -> Vec<PinDescriptor> {
        vec![PinDescriptor::input("value", variable_type(ctx))]
    }

    fn exec_kind(&self) -> ExecKind {
        ExecKind::Action
    }

    fn execute(&self, _ctx: &mut UnitCtx<'_>) -> UnitResult {
        // Lowered to Copy; never called.
        Ok(())
    }
}
