//! Fanning invocation-group batches out across the worker pool. Each batch
//! is one lane group's worth of interface storage; batches are independent,
//! so workers never share mutable state.

use crate::util::ThreadPool;
use bumpalo::Bump;
use lanewise_core::{Error, MAX_INTERFACE_SLOTS};
use lanewise_exec::{
    BuiltinValues, DescriptorBindings, DescriptorSet, Invocation, Lanes, Routine, LANE_COUNT,
};
use std::sync::Mutex;

/// One lane group's inputs and outputs, owned by the caller. The routine
/// writes `outputs`, `output_builtins` and `survivors`.
pub struct LaneBatch {
    pub inputs: Vec<Lanes>,
    pub outputs: Vec<Lanes>,
    pub input_builtins: BuiltinValues,
    pub output_builtins: BuiltinValues,
    /// Live lanes at the front of the group.
    pub lane_count: usize,
    /// Lanes that finished without a discard, filled in by the draw.
    pub survivors: Lanes,
}

impl LaneBatch {
    pub fn new(lane_count: usize) -> Self {
        Self {
            inputs: vec![Lanes::ZERO; MAX_INTERFACE_SLOTS],
            outputs: vec![Lanes::ZERO; MAX_INTERFACE_SLOTS],
            input_builtins: BuiltinValues::default(),
            output_builtins: BuiltinValues::default(),
            lane_count: lane_count.min(LANE_COUNT),
            survivors: Lanes::ZERO,
        }
    }
}

impl Default for LaneBatch {
    fn default() -> Self {
        Self::new(LANE_COUNT)
    }
}

/// Run `routine` over every batch, splitting the work across the pool.
/// Descriptor memory is shared read-only; each worker builds its own view.
/// The first failure wins; remaining batches still run to completion.
pub(crate) fn dispatch_batches(
    pool: &mut ThreadPool,
    arena: &Bump,
    routine: &Routine,
    descriptor_sets: &[&[u32]],
    batches: &mut [LaneBatch],
) -> Result<(), Error> {
    let failure = Mutex::new(None);
    let jobs =
        bumpalo::collections::Vec::from_iter_in(batches.iter_mut().map(Mutex::new), arena);

    pool.execute(jobs.iter(), |job, _worker| {
        let mut guard = job.lock().unwrap();
        let batch = &mut **guard;
        let descriptors = DescriptorBindings::new(
            descriptor_sets
                .iter()
                .copied()
                .map(DescriptorSet::Read)
                .collect(),
        );
        let mut invocation = Invocation {
            inputs: &batch.inputs,
            outputs: &mut batch.outputs,
            input_builtins: &batch.input_builtins,
            output_builtins: &mut batch.output_builtins,
            descriptors,
            lane_count: batch.lane_count,
        };
        match routine.invoke(&mut invocation) {
            Ok(survivors) => batch.survivors = survivors,
            Err(error) => {
                failure.lock().unwrap().get_or_insert(error);
            }
        }
    });

    match failure.into_inner().unwrap() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
