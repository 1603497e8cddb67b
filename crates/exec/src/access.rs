//! Access-chain resolution: folding a list of struct/array/vector/matrix
//! indices into a constant component offset plus an optional per-lane
//! dynamic offset. Keeping the two contributions split lets loads and
//! stores take the uniform fast path whenever no index diverged.

use crate::lanes::Lanes;
use lanewise_core::{Error, ObjectId, ObjectKind, Shader, TypeId};
use spirv::Op;

/// A resolved interior pointer: a compile-time constant part and, when any
/// index was computed at runtime, a per-lane dynamic part. Offsets are in
/// components of the base object's storage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChainOffset {
    pub constant: u32,
    pub dynamic: Option<Lanes>,
}

impl ChainOffset {
    /// Additive fold of two resolved offsets; constants stay constant,
    /// dynamic parts stay dynamic.
    pub fn fold(self, other: ChainOffset) -> ChainOffset {
        let dynamic = match (self.dynamic, other.dynamic) {
            (Some(a), Some(b)) => Some(a.zip_i32(b, i32::wrapping_add)),
            (a, b) => a.or(b),
        };
        ChainOffset {
            constant: self.constant.wrapping_add(other.constant),
            dynamic,
        }
    }

    /// True when every lane addresses the same component.
    pub fn is_uniform(&self) -> bool {
        self.dynamic.is_none()
    }

    /// Total offset for one lane.
    pub fn lane(&self, lane: usize) -> u32 {
        let dynamic = self.dynamic.map_or(0, |d| d.i32(lane));
        self.constant.wrapping_add(dynamic as u32)
    }

    /// Per-lane totals, for storing as the chain's intermediate value.
    pub fn lanes(&self) -> Lanes {
        Lanes::from_fn(|lane| self.lane(lane))
    }

    fn add_dynamic(&mut self, value: Lanes) {
        self.dynamic = Some(match self.dynamic {
            Some(existing) => existing.zip_i32(value, i32::wrapping_add),
            None => value,
        });
    }
}

/// Resolve a full access chain rooted at `base`. If the base is itself a
/// runtime value (an access chain taken of a previous access chain under
/// divergent control), its already-resolved offset is folded in first via
/// `base_offset`, falling back to the base's per-lane intermediate when no
/// split record exists. This is what makes arbitrarily nested divergent
/// addressing work without bounding chain depth.
pub fn walk_access_chain(
    shader: &Shader,
    base: ObjectId,
    index_ids: &[u32],
    base_offset: Option<ChainOffset>,
    mut dynamic_index: impl FnMut(ObjectId) -> Result<Lanes, Error>,
) -> Result<ChainOffset, Error> {
    let base_object = shader.object(base)?;
    let mut offset = ChainOffset::default();
    if let Some(prev) = base_offset {
        offset = offset.fold(prev);
    } else if matches!(base_object.kind, ObjectKind::Value) {
        offset.add_dynamic(dynamic_index(base)?);
    }

    let start = shader
        .ty(base_object.ty)?
        .element
        .ok_or(Error::WrongIdKind {
            id: base.0,
            expected: "pointer",
        })?;
    resolve_indices(shader, start, index_ids, &mut offset, &mut dynamic_index)?;
    Ok(offset)
}

/// Resolve a run of indices starting at `start`, accumulating into
/// `offset`. Returns the type the chain ends on, so resolution can be
/// continued one index at a time.
pub fn resolve_indices(
    shader: &Shader,
    start: TypeId,
    index_ids: &[u32],
    offset: &mut ChainOffset,
    dynamic_index: &mut impl FnMut(ObjectId) -> Result<Lanes, Error>,
) -> Result<TypeId, Error> {
    let mut ty_id = start;
    for &index in index_ids {
        let ty = shader.ty(ty_id)?;
        match ty.opcode {
            Op::TypeStruct => {
                // struct indices are always compile-time constants
                let member = shader.constant_u32(ObjectId(index))?;
                let def = shader.def(ty.def)?;
                let mut member_offset = 0;
                for j in 0..member {
                    member_offset += shader.ty(TypeId(def.word(2 + j)?))?.size_in_components;
                }
                offset.constant = offset.constant.wrapping_add(member_offset);
                ty_id = TypeId(def.word(2 + member)?);
            }

            Op::TypeVector | Op::TypeMatrix | Op::TypeArray | Op::TypeRuntimeArray => {
                let element = ty.element.ok_or(Error::WrongIdKind {
                    id: ty_id.0,
                    expected: "composite type",
                })?;
                let stride = shader.ty(element)?.size_in_components;
                let object = shader.object(ObjectId(index))?;
                match &object.kind {
                    ObjectKind::Constant(_) => {
                        let value = shader.constant_u32(ObjectId(index))?;
                        offset.constant = offset.constant.wrapping_add(stride * value);
                    }
                    _ => {
                        let value = dynamic_index(ObjectId(index))?;
                        offset.add_dynamic(value.map_i32(|i| i.wrapping_mul(stride as i32)));
                    }
                }
                ty_id = element;
            }

            // only legal as the first index of a chain; a plain passthrough
            Op::TypePointer => {
                ty_id = ty.element.ok_or(Error::WrongIdKind {
                    id: ty_id.0,
                    expected: "pointer",
                })?;
            }

            op => return Err(Error::UnsupportedOpcode { op }),
        }
    }
    Ok(ty_id)
}
