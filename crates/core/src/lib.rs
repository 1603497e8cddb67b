mod error;
mod module;
pub mod analysis;

pub use analysis::{
    slot_index, AttribType, BuiltinSlice, Decorations, ExecutionModes, InterfaceSlot, Object,
    ObjectId, ObjectKind, Shader, Type, TypeId, MAX_INTERFACE_SLOTS,
};
pub use error::Error;
pub use module::{Insn, Insns, Module, ModuleBuilder, HEADER_WORDS};

/// Hash maps keyed by shader-local ids, on the fast non-cryptographic hasher.
pub type FastHashMap<K, V> =
    std::collections::HashMap<K, V, std::hash::BuildHasherDefault<fxhash::FxHasher>>;
