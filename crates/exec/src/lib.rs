//! Lane-vectorized shader execution: the emit pass that lowers an analyzed
//! module into per-lane-group evaluation, the access-chain resolver, the
//! subgroup collectives, and the compiled [`Routine`] the rasterizer calls.

mod access;
mod emit;
mod lanes;
mod memory;
mod routine;

pub use access::{resolve_indices, walk_access_chain, ChainOffset};
pub use lanes::{Lanes, LANE_BITS, LANE_COUNT};
pub use memory::{BindingInfo, BindingRef, DescriptorBindings, DescriptorLayout, DescriptorSet};
pub use routine::{BuiltinValues, Invocation, Routine};
