use spirv::Op;

/// Everything that can go wrong between receiving a word buffer and running
/// a compiled routine.
///
/// The variants fall into three families with different meanings:
/// malformed-module errors (the binary itself is broken), unsupported
/// constructs (valid input this engine has no lowering for), and broken
/// upstream invariants (instructions the preprocessing pipeline promised to
/// remove). All three reject the shader outright; there is no partial
/// compilation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    // -- malformed module --
    #[error("module too short for a header ({words} words)")]
    TruncatedModule { words: usize },

    #[error("bad module magic {magic:#010x}")]
    BadMagic { magic: u32 },

    #[error("instruction at word {at} overruns the module (length {len})")]
    TruncatedInstruction { at: usize, len: usize },

    #[error("instruction at word {at} declares a zero word count")]
    ZeroWordCount { at: usize },

    #[error("unknown opcode {opcode} at word {at}")]
    UnknownOpcode { opcode: u16, at: usize },

    #[error("operand {index} out of bounds for {op:?} with {count} words")]
    OperandOutOfBounds { op: Op, index: u32, count: u32 },

    #[error("id {id} is used before it is defined")]
    ForwardReference { id: u32 },

    #[error("id {id} does not name a {expected}")]
    WrongIdKind { id: u32, expected: &'static str },

    #[error("conflicting {field} decorations on id {id}: {previous} vs {conflicting}")]
    DecorationConflict {
        id: u32,
        field: &'static str,
        previous: u32,
        conflicting: u32,
    },

    #[error("invalid value {value} for {what}")]
    InvalidEnumValue { what: &'static str, value: u32 },

    #[error("array length id {id} must be a previously defined integer constant")]
    BadArrayLength { id: u32 },

    #[error("storage class of variable {id} does not match its pointer type")]
    StorageClassMismatch { id: u32 },

    #[error("interface variable {id} has no location decoration")]
    MissingLocation { id: u32 },

    #[error("interface slot {slot} out of range")]
    InterfaceSlotOutOfRange { slot: i32 },

    #[error("variable {id} has no descriptor set / binding decorations")]
    MissingBinding { id: u32 },

    #[error("descriptor layout has no binding for set {set}, binding {binding}")]
    UnknownBinding { set: u32, binding: u32 },

    #[error("malformed literal string operand at word {at}")]
    BadStringLiteral { at: usize },

    // -- unsupported constructs --
    #[error("unsupported opcode {op:?}")]
    UnsupportedOpcode { op: Op },

    #[error("unsupported {bits}-bit scalar width")]
    UnsupportedWidth { bits: u32 },

    #[error("unsupported storage class {class:?} for {op:?}")]
    UnsupportedStorageClass { class: spirv::StorageClass, op: Op },

    #[error("unsupported execution mode {mode}")]
    UnsupportedExecutionMode { mode: u32 },

    #[error("unsupported extended instruction set {name:?}")]
    UnsupportedExtInstSet { name: String },

    #[error("unsupported extended instruction {inst}")]
    UnsupportedExtInst { inst: u32 },

    #[error("unsupported control flow: {what}")]
    UnsupportedControlFlow { what: &'static str },

    #[error("variable initializers are not supported")]
    UnsupportedInitializer,

    #[error("group operation scope must be subgroup, got {scope}")]
    UnsupportedGroupScope { scope: u32 },

    // -- broken upstream invariants --
    #[error("{op:?} should have been lowered before the module reached this engine")]
    NotLowered { op: Op },
}

impl Error {
    /// True for errors that indicate the upstream lowering contract was
    /// violated, as opposed to a malformed module or a lowering gap here.
    pub fn is_broken_invariant(&self) -> bool {
        matches!(self, Error::NotLowered { .. })
    }
}
