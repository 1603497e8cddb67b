//! Componentwise instruction lowering: arithmetic, logic, comparisons,
//! conversions, composite shuffling, quad derivatives and the GLSL.std.450
//! subset. Everything here is pure lane math; masking stays in the caller.

use super::Emitter;
use crate::lanes::{Lanes, LANE_COUNT};
use lanewise_core::{Error, Insn, ObjectId, TypeId};
use num_traits::cast::FromPrimitive;
use spirv::{GLOp, Op};

pub(super) fn emit(e: &mut Emitter, insn: &Insn) -> Result<(), Error> {
    let (id, size) = e.result(insn)?;
    let mut dst = vec![Lanes::ZERO; size as usize].into_boxed_slice();

    match insn.opcode() {
        Op::CopyObject => {
            let src = insn.word(3)?;
            for (i, value) in dst.iter_mut().enumerate() {
                *value = e.operand(src, i as u32)?;
            }
            // a copied access chain stays addressable through the split
            // offset, so loads through it keep the uniform fast path
            if let Some(chain) = e.chains.get(&src).copied() {
                e.chains.insert(id, chain);
            }
        }

        Op::CompositeConstruct => {
            let mut offset = 0usize;
            for i in 3..insn.word_count() {
                let constituent = insn.word(i)?;
                let len = e.object_size(constituent)? as usize;
                for j in 0..len {
                    let slot = dst.get_mut(offset).ok_or(Error::WrongIdKind {
                        id,
                        expected: "composite of matching size",
                    })?;
                    *slot = e.operand(constituent, j as u32)?;
                    offset += 1;
                }
            }
        }

        Op::CompositeExtract => {
            let composite = insn.word(3)?;
            let ty = e.shader().object(ObjectId(composite))?.ty;
            let (offset, _) = literal_offset(e, ty, insn.words_from(4)?)?;
            for (i, value) in dst.iter_mut().enumerate() {
                *value = e.operand(composite, offset + i as u32)?;
            }
        }

        Op::CompositeInsert => {
            let object = insn.word(3)?;
            let composite = insn.word(4)?;
            let ty = e.shader().object(ObjectId(composite))?.ty;
            let (offset, _) = literal_offset(e, ty, insn.words_from(5)?)?;
            for (i, value) in dst.iter_mut().enumerate() {
                *value = e.operand(composite, i as u32)?;
            }
            let len = e.object_size(object)?;
            for i in 0..len {
                if let Some(slot) = dst.get_mut((offset + i) as usize) {
                    *slot = e.operand(object, i)?;
                }
            }
        }

        Op::VectorShuffle => {
            let v1 = insn.word(3)?;
            let v2 = insn.word(4)?;
            let n1 = e.object_size(v1)?;
            for (i, value) in dst.iter_mut().enumerate() {
                let sel = insn.word(5 + i as u32)?;
                // 0xffffffff selects an undefined component
                *value = if sel == !0 {
                    Lanes::ZERO
                } else if sel < n1 {
                    e.operand(v1, sel)?
                } else {
                    e.operand(v2, sel - n1)?
                };
            }
        }

        Op::Select => {
            let cond = insn.word(3)?;
            let a = insn.word(4)?;
            let b = insn.word(5)?;
            let cond_size = e.object_size(cond)?;
            for (i, value) in dst.iter_mut().enumerate() {
                let c = e.operand(cond, if cond_size == 1 { 0 } else { i as u32 })?;
                *value = Lanes::select(c, e.operand(a, i as u32)?, e.operand(b, i as u32)?);
            }
        }

        Op::Bitcast => {
            let src = insn.word(3)?;
            if e.object_size(src)? != size {
                return Err(Error::WrongIdKind {
                    id,
                    expected: "bitcast of matching component count",
                });
            }
            for (i, value) in dst.iter_mut().enumerate() {
                *value = e.operand(src, i as u32)?;
            }
        }

        // conversions saturate at the integer bounds, which satisfies the
        // well-defined-but-unspecified contract for out-of-range inputs
        Op::ConvertFToS => unary(e, insn, &mut dst, |v| {
            Lanes::from_fn(|l| v.f32(l) as i32 as u32)
        })?,
        Op::ConvertFToU => unary(e, insn, &mut dst, |v| {
            Lanes::from_fn(|l| v.f32(l) as u32)
        })?,
        Op::ConvertSToF => unary(e, insn, &mut dst, |v| {
            Lanes::from_fn(|l| (v.i32(l) as f32).to_bits())
        })?,
        Op::ConvertUToF => unary(e, insn, &mut dst, |v| {
            Lanes::from_fn(|l| (v.u32(l) as f32).to_bits())
        })?,

        Op::SNegate => unary(e, insn, &mut dst, |v| v.map_i32(i32::wrapping_neg))?,
        Op::FNegate => unary(e, insn, &mut dst, |v| v.map_f32(|x| -x))?,
        // logical values are canonical all-ones/zero masks, so logical and
        // bitwise complement coincide
        Op::Not | Op::LogicalNot => unary(e, insn, &mut dst, |v| v.map_u32(|x| !x))?,

        Op::IAdd => binary(e, insn, &mut dst, |a, b| a.zip_i32(b, i32::wrapping_add))?,
        Op::ISub => binary(e, insn, &mut dst, |a, b| a.zip_i32(b, i32::wrapping_sub))?,
        Op::IMul => binary(e, insn, &mut dst, |a, b| a.zip_i32(b, i32::wrapping_mul))?,
        Op::FAdd => binary(e, insn, &mut dst, |a, b| a.zip_f32(b, |x, y| x + y))?,
        Op::FSub => binary(e, insn, &mut dst, |a, b| a.zip_f32(b, |x, y| x - y))?,
        Op::FMul => binary(e, insn, &mut dst, |a, b| a.zip_f32(b, |x, y| x * y))?,
        Op::FDiv => binary(e, insn, &mut dst, |a, b| a.zip_f32(b, |x, y| x / y))?,

        // integer division by zero is well-defined-but-unspecified; zero
        // keeps it from faulting
        Op::UDiv => binary(e, insn, &mut dst, |a, b| {
            a.zip_u32(b, |x, y| if y == 0 { 0 } else { x / y })
        })?,
        Op::SDiv => binary(e, insn, &mut dst, |a, b| {
            a.zip_i32(b, |x, y| if y == 0 { 0 } else { x.wrapping_div(y) })
        })?,
        Op::UMod => binary(e, insn, &mut dst, |a, b| {
            a.zip_u32(b, |x, y| if y == 0 { 0 } else { x % y })
        })?,
        Op::SRem => binary(e, insn, &mut dst, |a, b| {
            a.zip_i32(b, |x, y| if y == 0 { 0 } else { x.wrapping_rem(y) })
        })?,
        Op::SMod => binary(e, insn, &mut dst, |a, b| {
            a.zip_i32(b, |x, y| {
                if y == 0 {
                    return 0;
                }
                let r = x.wrapping_rem(y);
                // result takes the sign of the divisor
                if r != 0 && (r ^ y) < 0 {
                    r.wrapping_add(y)
                } else {
                    r
                }
            })
        })?,
        Op::FRem => binary(e, insn, &mut dst, |a, b| a.zip_f32(b, |x, y| x % y))?,
        Op::FMod => binary(e, insn, &mut dst, |a, b| {
            a.zip_f32(b, |x, y| x - y * (x / y).floor())
        })?,

        Op::ShiftLeftLogical => binary(e, insn, &mut dst, |a, b| {
            a.zip_u32(b, |x, s| x.wrapping_shl(s))
        })?,
        Op::ShiftRightLogical => binary(e, insn, &mut dst, |a, b| {
            a.zip_u32(b, |x, s| x.wrapping_shr(s))
        })?,
        Op::ShiftRightArithmetic => binary(e, insn, &mut dst, |a, b| {
            a.zip_i32(b, |x, s| x.wrapping_shr(s as u32))
        })?,

        Op::BitwiseAnd | Op::LogicalAnd => binary(e, insn, &mut dst, |a, b| a & b)?,
        Op::BitwiseOr | Op::LogicalOr => binary(e, insn, &mut dst, |a, b| a | b)?,
        Op::BitwiseXor => binary(e, insn, &mut dst, |a, b| a ^ b)?,
        Op::LogicalEqual => binary(e, insn, &mut dst, |a, b| a.cmp_u32(b, |x, y| x == y))?,
        Op::LogicalNotEqual => binary(e, insn, &mut dst, |a, b| a.cmp_u32(b, |x, y| x != y))?,

        Op::IEqual => binary(e, insn, &mut dst, |a, b| a.cmp_u32(b, |x, y| x == y))?,
        Op::INotEqual => binary(e, insn, &mut dst, |a, b| a.cmp_u32(b, |x, y| x != y))?,
        Op::UGreaterThan => binary(e, insn, &mut dst, |a, b| a.cmp_u32(b, |x, y| x > y))?,
        Op::SGreaterThan => binary(e, insn, &mut dst, |a, b| a.cmp_i32(b, |x, y| x > y))?,
        Op::UGreaterThanEqual => binary(e, insn, &mut dst, |a, b| a.cmp_u32(b, |x, y| x >= y))?,
        Op::SGreaterThanEqual => binary(e, insn, &mut dst, |a, b| a.cmp_i32(b, |x, y| x >= y))?,
        Op::ULessThan => binary(e, insn, &mut dst, |a, b| a.cmp_u32(b, |x, y| x < y))?,
        Op::SLessThan => binary(e, insn, &mut dst, |a, b| a.cmp_i32(b, |x, y| x < y))?,
        Op::ULessThanEqual => binary(e, insn, &mut dst, |a, b| a.cmp_u32(b, |x, y| x <= y))?,
        Op::SLessThanEqual => binary(e, insn, &mut dst, |a, b| a.cmp_i32(b, |x, y| x <= y))?,

        // ordered comparisons are false when either side is NaN, unordered
        // ones true
        Op::FOrdEqual => binary(e, insn, &mut dst, |a, b| a.cmp_f32(b, |x, y| x == y))?,
        Op::FUnordEqual => binary(e, insn, &mut dst, |a, b| {
            a.cmp_f32(b, |x, y| x == y || x.is_nan() || y.is_nan())
        })?,
        Op::FOrdNotEqual => binary(e, insn, &mut dst, |a, b| {
            a.cmp_f32(b, |x, y| x < y || x > y)
        })?,
        Op::FUnordNotEqual => binary(e, insn, &mut dst, |a, b| a.cmp_f32(b, |x, y| x != y))?,
        Op::FOrdLessThan => binary(e, insn, &mut dst, |a, b| a.cmp_f32(b, |x, y| x < y))?,
        Op::FUnordLessThan => binary(e, insn, &mut dst, |a, b| {
            a.cmp_f32(b, |x, y| !(x >= y))
        })?,
        Op::FOrdGreaterThan => binary(e, insn, &mut dst, |a, b| a.cmp_f32(b, |x, y| x > y))?,
        Op::FUnordGreaterThan => binary(e, insn, &mut dst, |a, b| {
            a.cmp_f32(b, |x, y| !(x <= y))
        })?,
        Op::FOrdLessThanEqual => binary(e, insn, &mut dst, |a, b| a.cmp_f32(b, |x, y| x <= y))?,
        Op::FUnordLessThanEqual => binary(e, insn, &mut dst, |a, b| {
            a.cmp_f32(b, |x, y| !(x > y))
        })?,
        Op::FOrdGreaterThanEqual => {
            binary(e, insn, &mut dst, |a, b| a.cmp_f32(b, |x, y| x >= y))?
        }
        Op::FUnordGreaterThanEqual => binary(e, insn, &mut dst, |a, b| {
            a.cmp_f32(b, |x, y| !(x < y))
        })?,

        Op::IsNan => unary(e, insn, &mut dst, |v| {
            v.cmp_f32(Lanes::ZERO, |x, _| x.is_nan())
        })?,
        Op::IsInf => unary(e, insn, &mut dst, |v| {
            v.cmp_f32(Lanes::ZERO, |x, _| x.is_infinite())
        })?,

        Op::Dot => {
            let a = insn.word(3)?;
            let b = insn.word(4)?;
            let len = e.object_size(a)?;
            let mut acc = Lanes::ZERO;
            for i in 0..len {
                let product = e.operand(a, i)?.zip_f32(e.operand(b, i)?, |x, y| x * y);
                acc = acc.zip_f32(product, |x, y| x + y);
            }
            dst[0] = acc;
        }

        Op::Any | Op::All => {
            let v = insn.word(3)?;
            let len = e.object_size(v)?;
            let mut acc = e.operand(v, 0)?;
            for i in 1..len {
                let next = e.operand(v, i)?;
                acc = if insn.opcode() == Op::Any { acc | next } else { acc & next };
            }
            dst[0] = acc;
        }

        Op::DPdx | Op::DPdxCoarse => unary(e, insn, &mut dst, dpdx_coarse)?,
        Op::DPdy | Op::DPdyCoarse => unary(e, insn, &mut dst, dpdy_coarse)?,
        Op::DPdxFine => unary(e, insn, &mut dst, dpdx_fine)?,
        Op::DPdyFine => unary(e, insn, &mut dst, dpdy_fine)?,
        Op::Fwidth | Op::FwidthCoarse => unary(e, insn, &mut dst, |v| {
            dpdx_coarse(v).zip_f32(dpdy_coarse(v), |x, y| x.abs() + y.abs())
        })?,
        Op::FwidthFine => unary(e, insn, &mut dst, |v| {
            dpdx_fine(v).zip_f32(dpdy_fine(v), |x, y| x.abs() + y.abs())
        })?,

        op => return Err(Error::UnsupportedOpcode { op }),
    }

    e.set(id, dst);
    Ok(())
}

fn unary(
    e: &Emitter,
    insn: &Insn,
    dst: &mut [Lanes],
    f: impl Fn(Lanes) -> Lanes,
) -> Result<(), Error> {
    let src = insn.word(3)?;
    for (i, value) in dst.iter_mut().enumerate() {
        *value = f(e.operand(src, i as u32)?);
    }
    Ok(())
}

fn binary(
    e: &Emitter,
    insn: &Insn,
    dst: &mut [Lanes],
    f: impl Fn(Lanes, Lanes) -> Lanes,
) -> Result<(), Error> {
    let a = insn.word(3)?;
    let b = insn.word(4)?;
    for (i, value) in dst.iter_mut().enumerate() {
        *value = f(e.operand(a, i as u32)?, e.operand(b, i as u32)?);
    }
    Ok(())
}

/// Fold literal composite indices into a component offset, ending on the
/// addressed leaf type.
fn literal_offset(e: &Emitter, ty: TypeId, indices: &[u32]) -> Result<(u32, TypeId), Error> {
    let shader = e.shader();
    let mut ty = ty;
    let mut offset = 0u32;
    for &index in indices {
        let t = shader.ty(ty)?;
        match t.opcode {
            Op::TypeStruct => {
                let def = shader.def(t.def)?;
                for j in 0..index {
                    offset += shader.ty(TypeId(def.word(2 + j)?))?.size_in_components;
                }
                ty = TypeId(def.word(2 + index)?);
            }
            Op::TypeVector | Op::TypeMatrix | Op::TypeArray => {
                let element = t.element.ok_or(Error::WrongIdKind {
                    id: ty.0,
                    expected: "composite type",
                })?;
                offset += shader.ty(element)?.size_in_components * index;
                ty = element;
            }
            op => return Err(Error::UnsupportedOpcode { op }),
        }
    }
    Ok((offset, ty))
}

// Quad layout within a group: lanes (x,y), (x+1,y), (x,y+1), (x+1,y+1).

fn dpdx_fine(v: Lanes) -> Lanes {
    let top = v.f32(1) - v.f32(0);
    let bottom = v.f32(3) - v.f32(2);
    Lanes::new([top.to_bits(), top.to_bits(), bottom.to_bits(), bottom.to_bits()])
}

fn dpdy_fine(v: Lanes) -> Lanes {
    let left = v.f32(2) - v.f32(0);
    let right = v.f32(3) - v.f32(1);
    Lanes::new([left.to_bits(), right.to_bits(), left.to_bits(), right.to_bits()])
}

fn dpdx_coarse(v: Lanes) -> Lanes {
    Lanes::splat_f32(v.f32(1) - v.f32(0))
}

fn dpdy_coarse(v: Lanes) -> Lanes {
    Lanes::splat_f32(v.f32(2) - v.f32(0))
}

pub(super) fn ext_inst(e: &mut Emitter, insn: &Insn) -> Result<(), Error> {
    let (id, size) = e.result(insn)?;
    let set = insn.word(3)?;
    if e.shader().glsl_ext_set() != Some(set) {
        return Err(Error::WrongIdKind {
            id: set,
            expected: "imported GLSL.std.450 set",
        });
    }
    let raw = insn.word(4)?;
    let op = GLOp::from_u32(raw).ok_or(Error::UnsupportedExtInst { inst: raw })?;
    let mut dst = vec![Lanes::ZERO; size as usize].into_boxed_slice();

    match op {
        GLOp::FAbs => ext_unary(e, insn, &mut dst, |v| v.map_f32(f32::abs))?,
        GLOp::SAbs => ext_unary(e, insn, &mut dst, |v| v.map_i32(i32::wrapping_abs))?,
        GLOp::Floor => ext_unary(e, insn, &mut dst, |v| v.map_f32(f32::floor))?,
        GLOp::Trunc => ext_unary(e, insn, &mut dst, |v| v.map_f32(f32::trunc))?,
        GLOp::Round => ext_unary(e, insn, &mut dst, |v| v.map_f32(f32::round))?,
        GLOp::Ceil => ext_unary(e, insn, &mut dst, |v| v.map_f32(f32::ceil))?,
        GLOp::Fract => ext_unary(e, insn, &mut dst, |v| v.map_f32(|x| x - x.floor()))?,
        GLOp::Sqrt => ext_unary(e, insn, &mut dst, |v| v.map_f32(f32::sqrt))?,
        GLOp::InverseSqrt => ext_unary(e, insn, &mut dst, |v| v.map_f32(|x| 1.0 / x.sqrt()))?,
        GLOp::Exp => ext_unary(e, insn, &mut dst, |v| v.map_f32(f32::exp))?,
        GLOp::Log => ext_unary(e, insn, &mut dst, |v| v.map_f32(f32::ln))?,
        GLOp::Exp2 => ext_unary(e, insn, &mut dst, |v| v.map_f32(f32::exp2))?,
        GLOp::Log2 => ext_unary(e, insn, &mut dst, |v| v.map_f32(f32::log2))?,
        GLOp::Sin => ext_unary(e, insn, &mut dst, |v| v.map_f32(f32::sin))?,
        GLOp::Cos => ext_unary(e, insn, &mut dst, |v| v.map_f32(f32::cos))?,
        GLOp::Tan => ext_unary(e, insn, &mut dst, |v| v.map_f32(f32::tan))?,
        GLOp::FSign => ext_unary(e, insn, &mut dst, |v| {
            v.map_f32(|x| {
                if x > 0.0 {
                    1.0
                } else if x < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            })
        })?,

        GLOp::FMin => ext_binary(e, insn, &mut dst, |a, b| a.zip_f32(b, f32::min))?,
        GLOp::FMax => ext_binary(e, insn, &mut dst, |a, b| a.zip_f32(b, f32::max))?,
        GLOp::SMin => ext_binary(e, insn, &mut dst, |a, b| a.zip_i32(b, i32::min))?,
        GLOp::SMax => ext_binary(e, insn, &mut dst, |a, b| a.zip_i32(b, i32::max))?,
        GLOp::UMin => ext_binary(e, insn, &mut dst, |a, b| a.zip_u32(b, u32::min))?,
        GLOp::UMax => ext_binary(e, insn, &mut dst, |a, b| a.zip_u32(b, u32::max))?,
        GLOp::Pow => ext_binary(e, insn, &mut dst, |a, b| a.zip_f32(b, f32::powf))?,
        GLOp::Step => ext_binary(e, insn, &mut dst, |edge, x| {
            edge.zip_f32(x, |edge, x| if x < edge { 0.0 } else { 1.0 })
        })?,

        GLOp::FClamp => ext_ternary(e, insn, &mut dst, |x, lo, hi| {
            x.zip_f32(lo, f32::max).zip_f32(hi, f32::min)
        })?,
        GLOp::SClamp => ext_ternary(e, insn, &mut dst, |x, lo, hi| {
            x.zip_i32(lo, i32::max).zip_i32(hi, i32::min)
        })?,
        GLOp::UClamp => ext_ternary(e, insn, &mut dst, |x, lo, hi| {
            x.zip_u32(lo, u32::max).zip_u32(hi, u32::min)
        })?,
        GLOp::FMix => ext_ternary(e, insn, &mut dst, |x, y, a| {
            let one_minus = a.map_f32(|a| 1.0 - a);
            x.zip_f32(one_minus, |x, w| x * w)
                .zip_f32(y.zip_f32(a, |y, w| y * w), |p, q| p + q)
        })?,

        _ => return Err(Error::UnsupportedExtInst { inst: raw }),
    }

    e.set(id, dst);
    Ok(())
}

fn ext_unary(
    e: &Emitter,
    insn: &Insn,
    dst: &mut [Lanes],
    f: impl Fn(Lanes) -> Lanes,
) -> Result<(), Error> {
    let src = insn.word(5)?;
    for (i, value) in dst.iter_mut().enumerate() {
        *value = f(e.operand(src, i as u32)?);
    }
    Ok(())
}

fn ext_binary(
    e: &Emitter,
    insn: &Insn,
    dst: &mut [Lanes],
    f: impl Fn(Lanes, Lanes) -> Lanes,
) -> Result<(), Error> {
    let a = insn.word(5)?;
    let b = insn.word(6)?;
    for (i, value) in dst.iter_mut().enumerate() {
        *value = f(e.operand(a, i as u32)?, e.operand(b, i as u32)?);
    }
    Ok(())
}

fn ext_ternary(
    e: &Emitter,
    insn: &Insn,
    dst: &mut [Lanes],
    f: impl Fn(Lanes, Lanes, Lanes) -> Lanes,
) -> Result<(), Error> {
    let a = insn.word(5)?;
    let b = insn.word(6)?;
    let c = insn.word(7)?;
    for (i, value) in dst.iter_mut().enumerate() {
        *value = f(
            e.operand(a, i as u32)?,
            e.operand(b, i as u32)?,
            e.operand(c, i as u32)?,
        );
    }
    Ok(())
}

const _: () = assert!(LANE_COUNT == 4, "quad derivatives assume a 2x2 group");
