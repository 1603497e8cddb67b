//! Semantic analysis: one forward walk over the module building the type,
//! object and decoration tables, the interface slot map and the execution
//! modes. Everything built here is immutable for the shader's lifetime and
//! safe to share across worker threads.

mod decorations;
mod interface;
mod object;

pub use decorations::Decorations;
pub use interface::{slot_index, AttribType, BuiltinSlice, InterfaceSlot, MAX_INTERFACE_SLOTS};
pub use object::{Object, ObjectId, ObjectKind, Type, TypeId};

pub(crate) use interface::Tables;

use crate::{Error, FastHashMap, Insn, Module};
use num_traits::cast::FromPrimitive;
use spirv::{Decoration, ExecutionMode, Op, StorageClass};
use std::sync::atomic::{AtomicU32, Ordering};

/// Shader-wide flags and sizes gathered from execution modes and the
/// instruction stream. The rasterizer reads these to decide early-test and
/// depth behavior; the dispatcher reads the workgroup size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionModes {
    pub early_fragment_tests: bool,
    pub depth_replacing: bool,
    pub depth_greater: bool,
    pub depth_less: bool,
    pub depth_unchanged: bool,
    pub local_size: [u32; 3],
    pub needs_centroid: bool,
    pub contains_kill: bool,
}

impl Default for ExecutionModes {
    fn default() -> Self {
        Self {
            early_fragment_tests: false,
            depth_replacing: false,
            depth_greater: false,
            depth_less: false,
            depth_unchanged: false,
            local_size: [1, 1, 1],
            needs_centroid: false,
            contains_kill: false,
        }
    }
}

// Serial numbers give each shader a process-unique identity for cache
// fingerprints. 0 stays reserved for "no shader".
static SERIAL: AtomicU32 = AtomicU32::new(1);

/// A fully analyzed shader module. Built once by [`Shader::parse`], then
/// read-only.
#[derive(Debug)]
pub struct Shader {
    module: Module,
    serial: u32,
    types: FastHashMap<TypeId, Type>,
    objects: FastHashMap<ObjectId, Object>,
    decorations: FastHashMap<u32, Decorations>,
    member_decorations: FastHashMap<TypeId, Vec<Decorations>>,
    blocks: FastHashMap<u32, usize>,
    first_block: Option<u32>,
    inputs: Vec<InterfaceSlot>,
    outputs: Vec<InterfaceSlot>,
    input_builtins: FastHashMap<spirv::BuiltIn, BuiltinSlice>,
    output_builtins: FastHashMap<spirv::BuiltIn, BuiltinSlice>,
    modes: ExecutionModes,
    glsl_ext: Option<u32>,
}

impl Shader {
    /// Analyze a binary module. The module must satisfy the upstream
    /// simplifying invariants: a single entry point, no function calls, no
    /// unresolved specialization constants.
    pub fn parse(words: impl Into<Box<[u32]>>) -> Result<Self, Error> {
        Self::from_module(Module::new(words)?)
    }

    /// Analyze an already-decoded module.
    pub fn from_module(module: Module) -> Result<Self, Error> {
        let mut ctx = Analyzer::new();
        for insn in module.iter() {
            ctx.insn(&module, insn?)?;
        }
        Ok(ctx.finish(module))
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Process-unique shader identity, used in cache fingerprints.
    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn modes(&self) -> &ExecutionModes {
        &self.modes
    }

    /// The user-defined input interface, indexed by scalar slot.
    pub fn input_slots(&self) -> &[InterfaceSlot] {
        &self.inputs
    }

    pub fn output_slots(&self) -> &[InterfaceSlot] {
        &self.outputs
    }

    pub fn input_builtins(&self) -> impl Iterator<Item = (spirv::BuiltIn, &BuiltinSlice)> {
        self.input_builtins.iter().map(|(b, s)| (*b, s))
    }

    pub fn output_builtins(&self) -> impl Iterator<Item = (spirv::BuiltIn, &BuiltinSlice)> {
        self.output_builtins.iter().map(|(b, s)| (*b, s))
    }

    pub fn input_builtin(&self, built_in: spirv::BuiltIn) -> Option<&BuiltinSlice> {
        self.input_builtins.get(&built_in)
    }

    pub fn output_builtin(&self, built_in: spirv::BuiltIn) -> Option<&BuiltinSlice> {
        self.output_builtins.get(&built_in)
    }

    /// Word offset of the block with the given label id.
    pub fn block_offset(&self, label: u32) -> Result<usize, Error> {
        self.blocks
            .get(&label)
            .copied()
            .ok_or(Error::ForwardReference { id: label })
    }

    /// Label of the entry block, if the module has structured control flow.
    pub fn entry_block(&self) -> Option<u32> {
        self.first_block
    }

    /// The id of the imported GLSL.std.450 instruction set, if any.
    pub fn glsl_ext_set(&self) -> Option<u32> {
        self.glsl_ext
    }

    pub fn ty(&self, id: TypeId) -> Result<&Type, Error> {
        self.tables().ty(id)
    }

    pub fn object(&self, id: ObjectId) -> Result<&Object, Error> {
        self.tables().object(id)
    }

    /// Every object the analysis pass created, in no particular order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    pub fn constant_u32(&self, id: ObjectId) -> Result<u32, Error> {
        self.tables().constant_u32(id)
    }

    /// Re-decode the instruction at a recorded definition offset.
    pub fn def(&self, offset: usize) -> Result<Insn<'_>, Error> {
        self.module.insn_at(offset)
    }

    /// Merged decoration set for an id.
    pub fn decorations_for(&self, id: u32) -> Decorations {
        self.decorations.get(&id).copied().unwrap_or_default()
    }

    /// Structural walk over an interface variable, calling `f` once per
    /// scalar component with the effective decoration set. The emit pass
    /// uses the same walk to copy values between the group's interface
    /// storage and a variable's backing store.
    pub fn visit_interface(
        &self,
        id: ObjectId,
        f: &mut dyn FnMut(&Decorations, AttribType) -> Result<(), Error>,
    ) -> Result<(), Error> {
        self.tables().visit_interface(id, f)
    }

    fn tables(&self) -> Tables<'_> {
        Tables {
            module: &self.module,
            types: &self.types,
            objects: &self.objects,
            decorations: &self.decorations,
            member_decorations: &self.member_decorations,
        }
    }
}

/// The analysis context: mutable tables threaded through the walk, no
/// ambient globals.
struct Analyzer {
    types: FastHashMap<TypeId, Type>,
    objects: FastHashMap<ObjectId, Object>,
    decorations: FastHashMap<u32, Decorations>,
    member_decorations: FastHashMap<TypeId, Vec<Decorations>>,
    blocks: FastHashMap<u32, usize>,
    first_block: Option<u32>,
    inputs: Vec<InterfaceSlot>,
    outputs: Vec<InterfaceSlot>,
    input_builtins: FastHashMap<spirv::BuiltIn, BuiltinSlice>,
    output_builtins: FastHashMap<spirv::BuiltIn, BuiltinSlice>,
    modes: ExecutionModes,
    glsl_ext: Option<u32>,
}

impl Analyzer {
    fn new() -> Self {
        Self {
            types: FastHashMap::default(),
            objects: FastHashMap::default(),
            decorations: FastHashMap::default(),
            member_decorations: FastHashMap::default(),
            blocks: FastHashMap::default(),
            first_block: None,
            inputs: vec![InterfaceSlot::default(); MAX_INTERFACE_SLOTS],
            outputs: vec![InterfaceSlot::default(); MAX_INTERFACE_SLOTS],
            input_builtins: FastHashMap::default(),
            output_builtins: FastHashMap::default(),
            modes: ExecutionModes::default(),
            glsl_ext: None,
        }
    }

    fn finish(self, module: Module) -> Shader {
        Shader {
            module,
            serial: SERIAL.fetch_add(1, Ordering::Relaxed),
            types: self.types,
            objects: self.objects,
            decorations: self.decorations,
            member_decorations: self.member_decorations,
            blocks: self.blocks,
            first_block: self.first_block,
            inputs: self.inputs,
            outputs: self.outputs,
            input_builtins: self.input_builtins,
            output_builtins: self.output_builtins,
            modes: self.modes,
            glsl_ext: self.glsl_ext,
        }
    }

    fn tables<'a>(&'a self, module: &'a Module) -> Tables<'a> {
        Tables {
            module,
            types: &self.types,
            objects: &self.objects,
            decorations: &self.decorations,
            member_decorations: &self.member_decorations,
        }
    }

    fn insn(&mut self, module: &Module, insn: Insn) -> Result<(), Error> {
        match insn.opcode() {
            Op::ExecutionMode => self.execution_mode(insn)?,

            Op::Decorate => {
                let target = insn.word(1)?;
                let raw = insn.word(2)?;
                if let Some(decoration) = Decoration::from_u32(raw) {
                    let arg = if insn.word_count() > 3 {
                        Some(insn.word(3)?)
                    } else {
                        None
                    };
                    self.decorations
                        .entry(target)
                        .or_default()
                        .apply(target, decoration, arg)?;
                    if decoration == Decoration::Centroid {
                        self.modes.needs_centroid = true;
                    }
                }
            }

            Op::MemberDecorate => {
                let target = TypeId(insn.word(1)?);
                let member = insn.word(2)? as usize;
                let raw = insn.word(3)?;
                if let Some(decoration) = Decoration::from_u32(raw) {
                    let arg = if insn.word_count() > 4 {
                        Some(insn.word(4)?)
                    } else {
                        None
                    };
                    let members = self.member_decorations.entry(target).or_default();
                    if members.len() <= member {
                        // on demand; the exact member count would need
                        // another pass
                        members.resize_with(member + 1, Decorations::default);
                    }
                    members[member].apply(target.0, decoration, arg)?;
                    if decoration == Decoration::Centroid {
                        self.modes.needs_centroid = true;
                    }
                }
            }

            // The group definition itself carries no state; the decoration
            // bundle just floats around under the group id.
            Op::DecorationGroup => {}

            Op::GroupDecorate => {
                let src = self
                    .decorations
                    .get(&insn.word(1)?)
                    .copied()
                    .unwrap_or_default();
                for i in 2..insn.word_count() {
                    let target = insn.word(i)?;
                    self.decorations
                        .entry(target)
                        .or_default()
                        .merge(target, &src)?;
                }
            }

            Op::GroupMemberDecorate => {
                let src = self
                    .decorations
                    .get(&insn.word(1)?)
                    .copied()
                    .unwrap_or_default();
                let mut i = 2;
                while i + 1 < insn.word_count() {
                    let target = TypeId(insn.word(i)?);
                    let member = insn.word(i + 1)? as usize;
                    let members = self.member_decorations.entry(target).or_default();
                    if members.len() <= member {
                        members.resize_with(member + 1, Decorations::default);
                    }
                    members[member].merge(target.0, &src)?;
                    i += 2;
                }
            }

            Op::TypeVoid
            | Op::TypeBool
            | Op::TypeInt
            | Op::TypeFloat
            | Op::TypeVector
            | Op::TypeMatrix
            | Op::TypeImage
            | Op::TypeSampler
            | Op::TypeSampledImage
            | Op::TypeArray
            | Op::TypeRuntimeArray
            | Op::TypeStruct
            | Op::TypePointer
            | Op::TypeFunction => self.declare_type(module, insn)?,

            Op::Variable => self.variable(module, insn)?,

            Op::Constant => {
                let (ty, id, mut buf) = self.new_constant(module, insn)?;
                if insn.word_count() > 4 {
                    return Err(Error::UnsupportedWidth { bits: 64 });
                }
                if buf.len() != 1 {
                    return Err(Error::WrongIdKind {
                        id: id.0,
                        expected: "scalar constant type",
                    });
                }
                buf[0] = insn.word(3)?;
                self.insert_constant(insn, ty, id, buf);
            }

            Op::ConstantTrue | Op::ConstantFalse => {
                let (ty, id, mut buf) = self.new_constant(module, insn)?;
                if buf.len() != 1 {
                    return Err(Error::WrongIdKind {
                        id: id.0,
                        expected: "boolean constant type",
                    });
                }
                // booleans are all bits set / all bits clear
                buf[0] = if insn.opcode() == Op::ConstantTrue { !0 } else { 0 };
                self.insert_constant(insn, ty, id, buf);
            }

            Op::ConstantNull => {
                // a zero value of arbitrary type
                let (ty, id, buf) = self.new_constant(module, insn)?;
                self.insert_constant(insn, ty, id, buf);
            }

            Op::ConstantComposite => {
                let (ty, id, mut buf) = self.new_constant(module, insn)?;
                let mut offset = 0usize;
                for i in 3..insn.word_count() {
                    let words = {
                        let tables = self.tables(module);
                        let constituent = tables.object(ObjectId(insn.word(i)?))?;
                        constituent
                            .constant_words()
                            .ok_or(Error::WrongIdKind {
                                id: insn.word(i)?,
                                expected: "constant constituent",
                            })?
                            .to_vec()
                    };
                    if offset + words.len() > buf.len() {
                        return Err(Error::WrongIdKind {
                            id: id.0,
                            expected: "composite constant of matching size",
                        });
                    }
                    buf[offset..offset + words.len()].copy_from_slice(&words);
                    offset += words.len();
                }
                self.insert_constant(insn, ty, id, buf);
            }

            Op::ExtInstImport => {
                let name = insn.string(2)?;
                if name != "GLSL.std.450" {
                    return Err(Error::UnsupportedExtInstSet { name });
                }
                self.glsl_ext = Some(insn.word(1)?);
            }

            Op::Label => {
                let id = insn.word(1)?;
                self.blocks.insert(id, insn.offset());
                if self.first_block.is_none() {
                    self.first_block = Some(id);
                }
            }

            Op::Kill => self.modes.contains_kill = true,

            // These should all have been removed by upstream lowering; if
            // one shows up the simplifying assumptions are broken and any
            // generated code would be wrong.
            Op::FunctionParameter
            | Op::FunctionCall
            | Op::SpecConstant
            | Op::SpecConstantComposite
            | Op::SpecConstantFalse
            | Op::SpecConstantOp
            | Op::SpecConstantTrue => return Err(Error::NotLowered { op: insn.opcode() }),

            op if produces_value(op) => {
                let ty = TypeId(insn.word(1)?);
                let id = ObjectId(insn.word(2)?);
                let mut object = Object {
                    ty,
                    def: insn.offset(),
                    kind: ObjectKind::Value,
                    pointer_base: id,
                };
                if matches!(op, Op::AccessChain | Op::InBoundsAccessChain | Op::CopyObject) {
                    // an interior pointer (or a copy of one) keeps the
                    // logical base of the chain it extends
                    let base = ObjectId(insn.word(3)?);
                    object.pointer_base = self.tables(module).object(base)?.pointer_base;
                }
                self.objects.insert(id, object);
            }

            Op::Capability
            | Op::MemoryModel
            | Op::EntryPoint
            | Op::Function
            | Op::FunctionEnd
            | Op::Name
            | Op::MemberName
            | Op::Source
            | Op::SourceContinued
            | Op::SourceExtension
            | Op::String
            | Op::Line
            | Op::NoLine
            | Op::ModuleProcessed
            | Op::Extension
            | Op::Store
            | Op::Return
            | Op::Branch
            | Op::BranchConditional
            | Op::SelectionMerge
            | Op::LoopMerge
            | Op::Unreachable
            | Op::Nop => {}

            Op::Switch => return Err(Error::UnsupportedControlFlow { what: "switch" }),
            Op::ReturnValue => {
                return Err(Error::UnsupportedControlFlow {
                    what: "value-returning entry point",
                })
            }

            // an opcode with no lowering is rejected here, before any code
            // is generated; wrong pixels are worse than a refusal
            op => return Err(Error::UnsupportedOpcode { op }),
        }
        Ok(())
    }

    fn execution_mode(&mut self, insn: Insn) -> Result<(), Error> {
        let raw = insn.word(2)?;
        match ExecutionMode::from_u32(raw) {
            Some(ExecutionMode::EarlyFragmentTests) => self.modes.early_fragment_tests = true,
            Some(ExecutionMode::DepthReplacing) => self.modes.depth_replacing = true,
            Some(ExecutionMode::DepthGreater) => self.modes.depth_greater = true,
            Some(ExecutionMode::DepthLess) => self.modes.depth_less = true,
            Some(ExecutionMode::DepthUnchanged) => self.modes.depth_unchanged = true,
            Some(ExecutionMode::LocalSize) => {
                self.modes.local_size = [insn.word(3)?, insn.word(4)?, insn.word(5)?]
            }
            // always the case for the modules we accept
            Some(ExecutionMode::OriginUpperLeft) => {}
            _ => return Err(Error::UnsupportedExecutionMode { mode: raw }),
        }
        Ok(())
    }

    fn declare_type(&mut self, module: &Module, insn: Insn) -> Result<(), Error> {
        let id = TypeId(insn.word(1)?);
        let size_in_components = self.type_size(module, insn)?;
        let mut ty = Type {
            opcode: insn.opcode(),
            def: insn.offset(),
            size_in_components,
            element: None,
            storage_class: None,
            is_builtin_block: false,
        };

        match insn.opcode() {
            Op::TypeStruct => {
                // a struct with one builtin member is a builtin block, and
                // all of its members are builtins
                if let Some(members) = self.member_decorations.get(&id) {
                    ty.is_builtin_block = members.iter().any(|m| m.built_in.is_some());
                }
            }
            Op::TypePointer => {
                let raw = insn.word(2)?;
                let class = StorageClass::from_u32(raw).ok_or(Error::InvalidEnumValue {
                    what: "storage class",
                    value: raw,
                })?;
                let element = TypeId(insn.word(3)?);
                ty.is_builtin_block = self.tables(module).ty(element)?.is_builtin_block;
                ty.element = Some(element);
                ty.storage_class = Some(class);
            }
            Op::TypeVector | Op::TypeMatrix | Op::TypeArray | Op::TypeRuntimeArray => {
                ty.element = Some(TypeId(insn.word(2)?));
            }
            _ => {}
        }

        self.types.insert(id, ty);
        Ok(())
    }

    /// Component counts are computable in one pass because types are
    /// declared before use.
    fn type_size(&self, module: &Module, insn: Insn) -> Result<u32, Error> {
        Ok(match insn.opcode() {
            // no runtime footprint: descriptor-backed objects exist only at
            // compile time, and runtime arrays never appear where their
            // size matters
            Op::TypeVoid
            | Op::TypeSampler
            | Op::TypeImage
            | Op::TypeSampledImage
            | Op::TypeFunction
            | Op::TypeRuntimeArray => 0,

            Op::TypeBool => 1,

            Op::TypeInt | Op::TypeFloat => {
                let bits = insn.word(2)?;
                if bits != 32 {
                    return Err(Error::UnsupportedWidth { bits });
                }
                1
            }

            Op::TypeVector | Op::TypeMatrix => {
                self.tables(module).ty(TypeId(insn.word(2)?))?.size_in_components * insn.word(3)?
            }

            Op::TypeArray => {
                let length_id = insn.word(3)?;
                let length = self
                    .tables(module)
                    .constant_u32(ObjectId(length_id))
                    .map_err(|_| Error::BadArrayLength { id: length_id })?;
                self.tables(module).ty(TypeId(insn.word(2)?))?.size_in_components * length
            }

            Op::TypeStruct => {
                let mut size = 0;
                for i in 2..insn.word_count() {
                    size += self.tables(module).ty(TypeId(insn.word(i)?))?.size_in_components;
                }
                size
            }

            // a pointer at runtime is a per-lane component offset, never
            // the pointee
            Op::TypePointer => 1,

            op => return Err(Error::UnsupportedOpcode { op }),
        })
    }

    fn variable(&mut self, module: &Module, insn: Insn) -> Result<(), Error> {
        let ty = TypeId(insn.word(1)?);
        let id = ObjectId(insn.word(2)?);
        let raw = insn.word(3)?;
        let class = StorageClass::from_u32(raw).ok_or(Error::InvalidEnumValue {
            what: "storage class",
            value: raw,
        })?;
        if insn.word_count() > 4 {
            return Err(Error::UnsupportedInitializer);
        }
        if self.tables(module).ty(ty)?.storage_class != Some(class) {
            return Err(Error::StorageClassMismatch { id: id.0 });
        }

        let mut object = Object {
            ty,
            def: insn.offset(),
            kind: ObjectKind::Variable,
            pointer_base: id,
        };

        match class {
            StorageClass::Input | StorageClass::Output => {
                self.objects.insert(id, object);
                self.process_interface_variable(module, id, class)?;
            }
            StorageClass::Uniform | StorageClass::UniformConstant | StorageClass::StorageBuffer => {
                object.kind = ObjectKind::PhysicalPointer;
                self.objects.insert(id, object);
            }
            StorageClass::Function | StorageClass::Private => {
                self.objects.insert(id, object);
            }
            class => {
                return Err(Error::UnsupportedStorageClass {
                    class,
                    op: Op::Variable,
                })
            }
        }
        Ok(())
    }

    fn process_interface_variable(
        &mut self,
        module: &Module,
        id: ObjectId,
        class: StorageClass,
    ) -> Result<(), Error> {
        let (is_block, pointee, pointee_size) = {
            let tables = self.tables(module);
            let object = tables.object(id)?;
            let ptr_ty = tables.ty(object.ty)?;
            let pointee = ptr_ty.element.ok_or(Error::WrongIdKind {
                id: id.0,
                expected: "pointer-typed variable",
            })?;
            let pointee_size = tables.ty(pointee)?.size_in_components;
            (ptr_ty.is_builtin_block, pointee, pointee_size)
        };

        if is_block {
            // walk the block, registering each member with its component
            // offset derived from the preceding members' sizes
            let struct_def = self.tables(module).ty(pointee)?.def;
            let members = self
                .member_decorations
                .get(&pointee)
                .cloned()
                .unwrap_or_default();
            let mut offset = 0;
            for (i, member) in members.iter().enumerate() {
                let member_size = {
                    let tables = self.tables(module);
                    let def = tables.def(struct_def)?;
                    tables.ty(TypeId(def.word(2 + i as u32)?))?.size_in_components
                };
                if let Some(built_in) = member.built_in {
                    let slice = BuiltinSlice {
                        object: id,
                        component_offset: offset,
                        size_in_components: member_size,
                    };
                    if class == StorageClass::Input {
                        self.input_builtins.insert(built_in, slice);
                    } else {
                        self.output_builtins.insert(built_in, slice);
                    }
                }
                offset += member_size;
            }
            return Ok(());
        }

        if let Some(built_in) = self.decorations.get(&id.0).and_then(|d| d.built_in) {
            let slice = BuiltinSlice {
                object: id,
                component_offset: 0,
                size_in_components: pointee_size,
            };
            if class == StorageClass::Input {
                self.input_builtins.insert(built_in, slice);
            } else {
                self.output_builtins.insert(built_in, slice);
            }
            return Ok(());
        }

        // user-defined interface variable: assign its scalar components to
        // (location, component) slots
        if let Some(object) = self.objects.get_mut(&id) {
            object.kind = ObjectKind::InterfaceVariable;
        }
        let Analyzer {
            types,
            objects,
            decorations,
            member_decorations,
            inputs,
            outputs,
            ..
        } = self;
        let tables = Tables {
            module,
            types: &*types,
            objects: &*objects,
            decorations: &*decorations,
            member_decorations: &*member_decorations,
        };
        let slots = if class == StorageClass::Input { inputs } else { outputs };
        tables.visit_interface(id, &mut |d, ty| {
            let location = d.location.ok_or(Error::MissingLocation { id: id.0 })?;
            let slot = slot_index(location, d.component.unwrap_or(0));
            if slot < 0 || slot as usize >= slots.len() {
                return Err(Error::InterfaceSlotOutOfRange { slot });
            }
            slots[slot as usize] = InterfaceSlot {
                ty,
                flat: d.flat,
                no_perspective: d.no_perspective,
                centroid: d.centroid,
            };
            Ok(())
        })
    }

    fn new_constant(
        &self,
        module: &Module,
        insn: Insn,
    ) -> Result<(TypeId, ObjectId, Box<[u32]>), Error> {
        let ty = TypeId(insn.word(1)?);
        let id = ObjectId(insn.word(2)?);
        let size = self.tables(module).ty(ty)?.size_in_components as usize;
        Ok((ty, id, vec![0u32; size].into_boxed_slice()))
    }

    fn insert_constant(&mut self, insn: Insn, ty: TypeId, id: ObjectId, buf: Box<[u32]>) {
        self.objects.insert(
            id,
            Object {
                ty,
                def: insn.offset(),
                kind: ObjectKind::Constant(buf),
                pointer_base: id,
            },
        );
    }
}

fn produces_value(op: Op) -> bool {
    use Op::*;
    matches!(
        op,
        Load | AccessChain
            | InBoundsAccessChain
            | CompositeConstruct
            | CompositeExtract
            | CompositeInsert
            | VectorShuffle
            | CopyObject
            | Select
            | Bitcast
            | ConvertFToS
            | ConvertFToU
            | ConvertSToF
            | ConvertUToF
            | SNegate
            | FNegate
            | Not
            | LogicalNot
            | IAdd
            | ISub
            | IMul
            | FAdd
            | FSub
            | FMul
            | FDiv
            | UDiv
            | SDiv
            | UMod
            | SRem
            | SMod
            | FRem
            | FMod
            | ShiftLeftLogical
            | ShiftRightLogical
            | ShiftRightArithmetic
            | BitwiseAnd
            | BitwiseOr
            | BitwiseXor
            | LogicalAnd
            | LogicalOr
            | LogicalEqual
            | LogicalNotEqual
            | IEqual
            | INotEqual
            | UGreaterThan
            | SGreaterThan
            | UGreaterThanEqual
            | SGreaterThanEqual
            | ULessThan
            | SLessThan
            | ULessThanEqual
            | SLessThanEqual
            | FOrdEqual
            | FUnordEqual
            | FOrdNotEqual
            | FUnordNotEqual
            | FOrdLessThan
            | FUnordLessThan
            | FOrdGreaterThan
            | FUnordGreaterThan
            | FOrdLessThanEqual
            | FUnordLessThanEqual
            | FOrdGreaterThanEqual
            | FUnordGreaterThanEqual
            | Dot
            | Any
            | All
            | IsNan
            | IsInf
            | DPdx
            | DPdy
            | Fwidth
            | DPdxFine
            | DPdyFine
            | FwidthFine
            | DPdxCoarse
            | DPdyCoarse
            | FwidthCoarse
            | ExtInst
            | Phi
            | GroupNonUniformElect
            | GroupNonUniformAll
            | GroupNonUniformAny
            | GroupNonUniformAllEqual
            | GroupNonUniformBroadcast
            | GroupNonUniformBroadcastFirst
            | GroupNonUniformBallot
            | GroupNonUniformInverseBallot
            | GroupNonUniformBallotBitExtract
            | GroupNonUniformBallotBitCount
            | GroupNonUniformBallotFindLSB
            | GroupNonUniformBallotFindMSB
            | GroupNonUniformShuffle
            | GroupNonUniformShuffleXor
            | GroupNonUniformShuffleUp
            | GroupNonUniformShuffleDown
            | GroupNonUniformIAdd
            | GroupNonUniformFAdd
            | GroupNonUniformIMul
            | GroupNonUniformFMul
            | GroupNonUniformSMin
            | GroupNonUniformUMin
            | GroupNonUniformFMin
            | GroupNonUniformSMax
            | GroupNonUniformUMax
            | GroupNonUniformFMax
            | GroupNonUniformBitwiseAnd
            | GroupNonUniformBitwiseOr
            | GroupNonUniformBitwiseXor
            | GroupNonUniformLogicalAnd
            | GroupNonUniformLogicalOr
            | GroupNonUniformLogicalXor
    )
}
