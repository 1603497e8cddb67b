use super::{Decorations, Object, ObjectId, Type, TypeId};
use crate::{Error, FastHashMap, Insn, Module};
use spirv::Op;

/// 32 locations of 4 components each; a slot index is
/// `(location << 2) | component`.
pub const MAX_INTERFACE_SLOTS: usize = 32 * 4;

/// Scalar category of one interface component.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum AttribType {
    Float,
    Int,
    Uint,
    #[default]
    Unused,
}

/// One scalar slot of the user-defined input or output interface.
#[derive(Clone, Copy, Debug, Default)]
pub struct InterfaceSlot {
    pub ty: AttribType,
    pub flat: bool,
    pub no_perspective: bool,
    pub centroid: bool,
}

/// Where a builtin lives inside its variable's backing storage.
#[derive(Clone, Copy, Debug)]
pub struct BuiltinSlice {
    pub object: ObjectId,
    pub component_offset: u32,
    pub size_in_components: u32,
}

/// Flat slot index for a (location, component) pair.
pub fn slot_index(location: i32, component: u32) -> i32 {
    (location << 2) | component as i32
}

/// Read-only view over the analysis tables. Both the analysis pass (while
/// the tables are still growing) and the finished shader walk interfaces
/// through this, so the structural visit is a single implementation.
pub(crate) struct Tables<'a> {
    pub module: &'a Module,
    pub types: &'a FastHashMap<TypeId, Type>,
    pub objects: &'a FastHashMap<ObjectId, Object>,
    pub decorations: &'a FastHashMap<u32, Decorations>,
    pub member_decorations: &'a FastHashMap<TypeId, Vec<Decorations>>,
}

impl<'a> Tables<'a> {
    pub fn ty(&self, id: TypeId) -> Result<&'a Type, Error> {
        self.types.get(&id).ok_or(Error::ForwardReference { id: id.0 })
    }

    pub fn object(&self, id: ObjectId) -> Result<&'a Object, Error> {
        self.objects.get(&id).ok_or(Error::ForwardReference { id: id.0 })
    }

    pub fn def(&self, offset: usize) -> Result<Insn<'a>, Error> {
        self.module.insn_at(offset)
    }

    /// Resolve an id that must name an already-defined integer constant.
    pub fn constant_u32(&self, id: ObjectId) -> Result<u32, Error> {
        let object = self.object(id)?;
        let scalar = self.ty(object.ty)?;
        match (scalar.opcode, object.constant_words()) {
            (Op::TypeInt, Some(words)) if !words.is_empty() => Ok(words[0]),
            _ => Err(Error::WrongIdKind {
                id: id.0,
                expected: "integer constant",
            }),
        }
    }

    pub fn apply_decorations(&self, d: &mut Decorations, id: u32) -> Result<(), Error> {
        if let Some(src) = self.decorations.get(&id) {
            d.merge(id, src)?;
        }
        Ok(())
    }

    pub fn apply_member_decorations(
        &self,
        d: &mut Decorations,
        id: TypeId,
        member: u32,
    ) -> Result<(), Error> {
        if let Some(members) = self.member_decorations.get(&id) {
            if let Some(src) = members.get(member as usize) {
                d.merge(id.0, src)?;
            }
        }
        Ok(())
    }

    /// Walk a variable's type tree, calling `f` once per scalar component
    /// with the effective decoration set. Components without explicit
    /// Location/Component decorations are assigned sequentially; the
    /// assignment is deterministic because decoration snapshots flow down
    /// and across siblings, never back up.
    pub fn visit_interface(
        &self,
        id: ObjectId,
        f: &mut dyn FnMut(&Decorations, AttribType) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let object = self.object(id)?;
        let def = self.def(object.def)?;
        if def.opcode() != Op::Variable {
            return Err(Error::WrongIdKind {
                id: id.0,
                expected: "interface variable",
            });
        }
        let mut d = Decorations::default();
        self.apply_decorations(&mut d, id.0)?;
        d.component = Some(d.component.unwrap_or(0));
        self.visit_interface_inner(TypeId(def.word(1)?), d, f)?;
        Ok(())
    }

    fn visit_interface_inner(
        &self,
        id: TypeId,
        mut d: Decorations,
        f: &mut dyn FnMut(&Decorations, AttribType) -> Result<(), Error>,
    ) -> Result<Option<i32>, Error> {
        self.apply_decorations(&mut d, id.0)?;

        let ty = self.ty(id)?;
        let def = self.def(ty.def)?;
        let next = |loc: Option<i32>| loc.map(|l| l + 1);

        match ty.opcode {
            Op::TypePointer => self.visit_interface_inner(TypeId(def.word(3)?), d, f),
            Op::TypeMatrix => {
                // each column consumes the same components of one location
                for _ in 0..def.word(3)? {
                    self.visit_interface_inner(TypeId(def.word(2)?), d, f)?;
                    d.location = next(d.location);
                }
                Ok(d.location)
            }
            Op::TypeVector => {
                // consecutive components of a single location
                for _ in 0..def.word(3)? {
                    self.visit_interface_inner(TypeId(def.word(2)?), d, f)?;
                    d.component = Some(d.component.unwrap_or(0) + 1);
                }
                Ok(next(d.location))
            }
            Op::TypeFloat => {
                f(&d, AttribType::Float)?;
                Ok(next(d.location))
            }
            Op::TypeInt => {
                let signed = def.word(3)? != 0;
                f(&d, if signed { AttribType::Int } else { AttribType::Uint })?;
                Ok(next(d.location))
            }
            Op::TypeBool => {
                f(&d, AttribType::Uint)?;
                Ok(next(d.location))
            }
            Op::TypeStruct => {
                // member decorations stack on the inherited set and carry
                // across to later siblings
                for i in 0..def.word_count() - 2 {
                    self.apply_member_decorations(&mut d, id, i)?;
                    d.location = self.visit_interface_inner(TypeId(def.word(2 + i)?), d, f)?;
                    // implicit locations restart at component zero
                    d.component = Some(0);
                }
                Ok(d.location)
            }
            Op::TypeArray => {
                let len_id = def.word(3)?;
                let len = self
                    .constant_u32(ObjectId(len_id))
                    .map_err(|_| Error::BadArrayLength { id: len_id })?;
                for _ in 0..len {
                    d.location = self.visit_interface_inner(TypeId(def.word(2)?), d, f)?;
                }
                Ok(d.location)
            }
            _ => Ok(d.location),
        }
    }
}
