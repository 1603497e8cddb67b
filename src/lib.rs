//! lanewise: a software-GPU shader translation and lane-vectorized
//! execution engine. A binary shader module goes through a single semantic
//! analysis pass ([`Shader`]), is specialized against a descriptor layout
//! into a [`Routine`], and is then evaluated for groups of [`LANE_COUNT`]
//! independent lanes at a time. The `pipeline` feature adds the
//! fixed-function state records, the fingerprint-keyed routine cache and a
//! dispatching [`pipeline::Device`].

pub use lanewise_core::{
    slot_index, AttribType, BuiltinSlice, Decorations, Error, ExecutionModes, Insn, InterfaceSlot,
    Module, ModuleBuilder, Object, ObjectId, ObjectKind, Shader, Type, TypeId, HEADER_WORDS,
    MAX_INTERFACE_SLOTS,
};
pub use lanewise_exec::{
    resolve_indices, walk_access_chain, BindingInfo, BindingRef, BuiltinValues, ChainOffset,
    DescriptorBindings, DescriptorLayout, DescriptorSet, Invocation, Lanes, Routine, LANE_BITS,
    LANE_COUNT,
};

#[cfg(feature = "pipeline")]
pub use lanewise_pipeline as pipeline;
