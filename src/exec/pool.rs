//! Batch execution across executor instances.

use rayon::prelude::*;

use crate::{
    exec::vm::{Executor, ExternalValues, TickReport},
    foundation::error::RigResult,
};

/// Tick every executor in parallel, each with its own inputs.
///
/// Instances are independent: each owns its registers and state, and the
/// compiled program is shared immutably, so a crowd of characters running
/// the same graph ticks without contention. Results come back in input
/// order.
#[tracing::instrument(skip_all, fields(instances = runs.len()))]
pub fn run_all(runs: &mut [(Executor, ExternalValues)]) -> Vec<RigResult<TickReport>> {
    runs.par_iter_mut()
        .map(|(executor, inputs)| executor.run(inputs))
        .collect()
}
