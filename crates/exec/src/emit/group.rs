//! Subgroup collectives over the fixed lane group: elect/vote, ballot
//! queries, broadcast and shuffle selection networks, and the associative
//! reduce/scan family. Inactive lanes are masked to each operator's
//! identity before combining, so they never influence a result.

use super::Emitter;
use crate::lanes::{Lanes, LANE_BITS, LANE_COUNT};
use lanewise_core::{Error, Insn, ObjectId, ObjectKind};
use num_traits::cast::FromPrimitive;
use spirv::{GroupOperation, Op, Scope};

pub(super) fn is_group_op(op: Op) -> bool {
    use Op::*;
    matches!(
        op,
        GroupNonUniformElect
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

pub(super) fn emit(e: &mut Emitter, insn: &Insn, mask: Lanes) -> Result<(), Error> {
    let (id, size) = e.result(insn)?;
    let scope = e.shader().constant_u32(ObjectId(insn.word(3)?))?;
    if scope != Scope::Subgroup as u32 {
        return Err(Error::UnsupportedGroupScope { scope });
    }
    let active = e.live(mask);
    let mut dst = vec![Lanes::ZERO; size as usize].into_boxed_slice();

    match insn.opcode() {
        // true only in the lowest-numbered active lane
        Op::GroupNonUniformElect => dst[0] = elect(active),

        // inactive lanes are forced to the vote's identity so they never
        // flip the outcome
        Op::GroupNonUniformAll => {
            let predicate = e.operand(insn.word(4)?, 0)?;
            dst[0] = splat_bool((predicate | !active).all());
        }
        Op::GroupNonUniformAny => {
            let predicate = e.operand(insn.word(4)?, 0)?;
            dst[0] = splat_bool((predicate & active).any());
        }
        Op::GroupNonUniformAllEqual => {
            let value = insn.word(4)?;
            let len = e.object_size(value)?;
            let mut equal = true;
            for i in 0..len {
                // fill inactive holes with a neighboring live value so a
                // partially active group still compares clean
                let filled = fill_inactive(e.operand(value, i)?, active);
                let rotated = rotate1(filled);
                equal &= filled.cmp_u32(rotated, |a, b| a == b).all();
            }
            dst[0] = splat_bool(equal);
        }

        Op::GroupNonUniformBroadcast => {
            let value = insn.word(4)?;
            let index = insn.word(5)?;
            let lane_mask = match e.shader().object(ObjectId(index))?.kind {
                ObjectKind::Constant(_) => {
                    let lane = e.shader().constant_u32(ObjectId(index))?;
                    Lanes::indices().cmp_u32(Lanes::splat(lane), |a, b| a == b)
                }
                _ => {
                    // the index is required to be subgroup-uniform; fill
                    // holes so inactive lanes agree
                    let filled = fill_inactive(e.operand(index, 0)?, active);
                    filled.cmp_u32(Lanes::indices(), |a, b| a == b)
                }
            };
            for (i, value_slot) in dst.iter_mut().enumerate() {
                *value_slot = or_all(e.operand(value, i as u32)? & lane_mask);
            }
        }
        Op::GroupNonUniformBroadcastFirst => {
            let value = insn.word(4)?;
            let first = elect(active);
            for (i, value_slot) in dst.iter_mut().enumerate() {
                *value_slot = or_all(e.operand(value, i as u32)? & first);
            }
        }

        Op::GroupNonUniformBallot => {
            let predicate = e.operand(insn.word(4)?, 0)?;
            dst[0] = Lanes::splat((active & predicate).bits());
            // the remaining words of the ballot are beyond the group width
        }
        Op::GroupNonUniformInverseBallot => {
            let bits = e.operand(insn.word(4)?, 0)?;
            dst[0] = Lanes::from_fn(|lane| {
                if (bits.u32(lane) >> lane) & 1 != 0 { !0 } else { 0 }
            });
        }
        Op::GroupNonUniformBallotBitExtract => {
            let value = insn.word(4)?;
            let len = e.object_size(value)?;
            let words: Vec<Lanes> = (0..len)
                .map(|i| e.operand(value, i))
                .collect::<Result<_, _>>()?;
            let index = e.operand(insn.word(5)?, 0)?;
            dst[0] = Lanes::from_fn(|lane| {
                let bit = index.u32(lane);
                let word = words
                    .get((bit >> 5) as usize)
                    .map_or(0, |w| w.u32(lane));
                if (word >> (bit & 31)) & 1 != 0 { !0 } else { 0 }
            });
        }
        Op::GroupNonUniformBallotBitCount => {
            let operation = group_operation(insn.word(4)?)?;
            let bits = e.operand(insn.word(5)?, 0)?;
            // scan variants mask successively fewer low bits
            let lane_masks: [u32; LANE_COUNT] = match operation {
                GroupOperation::Reduce => [LANE_BITS; LANE_COUNT],
                GroupOperation::InclusiveScan => [0b0001, 0b0011, 0b0111, 0b1111],
                GroupOperation::ExclusiveScan => [0b0000, 0b0001, 0b0011, 0b0111],
                _ => {
                    return Err(Error::InvalidEnumValue {
                        what: "ballot bit count operation",
                        value: operation as u32,
                    })
                }
            };
            dst[0] = Lanes::from_fn(|lane| (bits.u32(lane) & lane_masks[lane]).count_ones());
        }
        Op::GroupNonUniformBallotFindLSB => {
            let bits = e.operand(insn.word(4)?, 0)?;
            dst[0] = Lanes::from_fn(|lane| (bits.u32(lane) & LANE_BITS).trailing_zeros());
        }
        Op::GroupNonUniformBallotFindMSB => {
            let bits = e.operand(insn.word(4)?, 0)?;
            dst[0] = Lanes::from_fn(|lane| {
                (31i32 - (bits.u32(lane) & LANE_BITS).leading_zeros() as i32) as u32
            });
        }

        Op::GroupNonUniformShuffle => {
            let value = insn.word(4)?;
            let index = e.operand(insn.word(5)?, 0)?;
            for (i, slot) in dst.iter_mut().enumerate() {
                *slot = select_lanes(e.operand(value, i as u32)?, index);
            }
        }
        Op::GroupNonUniformShuffleXor => {
            let value = insn.word(4)?;
            let xor = e.operand(insn.word(5)?, 0)?;
            let index = Lanes::indices().zip_u32(xor, |lane, m| lane ^ m);
            for (i, slot) in dst.iter_mut().enumerate() {
                *slot = select_lanes(e.operand(value, i as u32)?, index);
            }
        }
        Op::GroupNonUniformShuffleUp => {
            let value = insn.word(4)?;
            let delta = e.operand(insn.word(5)?, 0)?;
            let index = Lanes::indices().zip_u32(delta, u32::wrapping_sub);
            let valid = Lanes::indices().cmp_u32(delta, |lane, d| lane >= d);
            for (i, slot) in dst.iter_mut().enumerate() {
                let v = e.operand(value, i as u32)?;
                // lanes whose source falls before the group pass through
                *slot = Lanes::select(valid, select_lanes(v, index), v);
            }
        }
        Op::GroupNonUniformShuffleDown => {
            let value = insn.word(4)?;
            let delta = e.operand(insn.word(5)?, 0)?;
            let index = Lanes::indices().zip_u32(delta, u32::wrapping_add);
            let valid = index.cmp_u32(Lanes::splat(LANE_COUNT as u32), |i, n| i < n);
            for (i, slot) in dst.iter_mut().enumerate() {
                let v = e.operand(value, i as u32)?;
                *slot = Lanes::select(valid, select_lanes(v, index), v);
            }
        }

        Op::GroupNonUniformIAdd => {
            scan(e, insn, active, &mut dst, Lanes::ZERO, |a, b| {
                a.zip_i32(b, i32::wrapping_add)
            })?
        }
        Op::GroupNonUniformFAdd => {
            scan(e, insn, active, &mut dst, Lanes::splat_f32(0.0), |a, b| {
                a.zip_f32(b, |x, y| x + y)
            })?
        }
        Op::GroupNonUniformIMul => {
            scan(e, insn, active, &mut dst, Lanes::splat(1), |a, b| {
                a.zip_i32(b, i32::wrapping_mul)
            })?
        }
        Op::GroupNonUniformFMul => {
            scan(e, insn, active, &mut dst, Lanes::splat_f32(1.0), |a, b| {
                a.zip_f32(b, |x, y| x * y)
            })?
        }
        Op::GroupNonUniformSMin => {
            scan(e, insn, active, &mut dst, Lanes::splat_i32(i32::MAX), |a, b| {
                a.zip_i32(b, i32::min)
            })?
        }
        Op::GroupNonUniformUMin => {
            scan(e, insn, active, &mut dst, Lanes::splat(u32::MAX), |a, b| {
                a.zip_u32(b, u32::min)
            })?
        }
        Op::GroupNonUniformFMin => scan(
            e,
            insn,
            active,
            &mut dst,
            Lanes::splat_f32(f32::INFINITY),
            |a, b| a.zip_f32(b, f32::min),
        )?,
        Op::GroupNonUniformSMax => {
            scan(e, insn, active, &mut dst, Lanes::splat_i32(i32::MIN), |a, b| {
                a.zip_i32(b, i32::max)
            })?
        }
        Op::GroupNonUniformUMax => {
            scan(e, insn, active, &mut dst, Lanes::ZERO, |a, b| {
                a.zip_u32(b, u32::max)
            })?
        }
        Op::GroupNonUniformFMax => scan(
            e,
            insn,
            active,
            &mut dst,
            Lanes::splat_f32(f32::NEG_INFINITY),
            |a, b| a.zip_f32(b, f32::max),
        )?,
        Op::GroupNonUniformBitwiseAnd => {
            scan(e, insn, active, &mut dst, Lanes::ALL, |a, b| a & b)?
        }
        Op::GroupNonUniformBitwiseOr => {
            scan(e, insn, active, &mut dst, Lanes::ZERO, |a, b| a | b)?
        }
        Op::GroupNonUniformBitwiseXor => {
            scan(e, insn, active, &mut dst, Lanes::ZERO, |a, b| a ^ b)?
        }
        Op::GroupNonUniformLogicalAnd => {
            scan(e, insn, active, &mut dst, Lanes::ALL, |a, b| {
                a.zip_u32(b, |x, y| if x != 0 && y != 0 { !0 } else { 0 })
            })?
        }
        Op::GroupNonUniformLogicalOr => {
            scan(e, insn, active, &mut dst, Lanes::ZERO, |a, b| {
                a.zip_u32(b, |x, y| if x != 0 || y != 0 { !0 } else { 0 })
            })?
        }
        Op::GroupNonUniformLogicalXor => {
            scan(e, insn, active, &mut dst, Lanes::ZERO, |a, b| {
                a.zip_u32(b, |x, y| if (x != 0) != (y != 0) { !0 } else { 0 })
            })?
        }

        op => return Err(Error::UnsupportedOpcode { op }),
    }

    e.set(id, dst);
    Ok(())
}

fn group_operation(raw: u32) -> Result<GroupOperation, Error> {
    GroupOperation::from_u32(raw).ok_or(Error::InvalidEnumValue {
        what: "group operation",
        value: raw,
    })
}

/// Reduce/scan lowering shared by the arithmetic collectives: mask inactive
/// lanes to the identity, then combine through a pairwise network whose
/// shape depends on the tie-break.
fn scan(
    e: &Emitter,
    insn: &Insn,
    active: Lanes,
    dst: &mut [Lanes],
    identity: Lanes,
    apply: impl Fn(Lanes, Lanes) -> Lanes,
) -> Result<(), Error> {
    let operation = group_operation(insn.word(4)?)?;
    let value = insn.word(5)?;
    for (i, slot) in dst.iter_mut().enumerate() {
        let raw = e.operand(value, i as u32)?;
        let v = (raw & active) | (identity & !active);
        *slot = combine(operation, v, identity, &apply)?;
    }
    Ok(())
}

fn combine(
    operation: GroupOperation,
    v: Lanes,
    identity: Lanes,
    apply: &impl Fn(Lanes, Lanes) -> Lanes,
) -> Result<Lanes, Error> {
    match operation {
        GroupOperation::Reduce => {
            // butterfly: pairs, then pairs of pairs, identical in all lanes
            let v2 = apply(perm(v, [0, 0, 2, 2]), perm(v, [1, 1, 3, 3]));
            Ok(apply(perm(v2, [0, 0, 0, 0]), perm(v2, [2, 2, 2, 2])))
        }
        GroupOperation::InclusiveScan => {
            let v2 = apply(v, shift_in(v, identity, 1));
            Ok(apply(v2, shift_in(v2, identity, 2)))
        }
        GroupOperation::ExclusiveScan => {
            let v2 = apply(v, shift_in(v, identity, 1));
            let v3 = apply(v2, shift_in(v2, identity, 2));
            Ok(shift_in(v3, identity, 1))
        }
        _ => Err(Error::InvalidEnumValue {
            what: "group operation",
            value: operation as u32,
        }),
    }
}

/// Shift lane values up by `by`, filling vacated low lanes with the
/// identity.
fn shift_in(v: Lanes, identity: Lanes, by: usize) -> Lanes {
    Lanes::from_fn(|lane| {
        if lane < by {
            identity.u32(lane)
        } else {
            v.u32(lane - by)
        }
    })
}

fn perm(v: Lanes, from: [usize; LANE_COUNT]) -> Lanes {
    Lanes::from_fn(|lane| v.u32(from[lane]))
}

fn rotate1(v: Lanes) -> Lanes {
    Lanes::from_fn(|lane| v.u32((lane + 1) % LANE_COUNT))
}

/// Mask with only the lowest-numbered active lane set.
fn elect(active: Lanes) -> Lanes {
    match active.first_active() {
        Some(first) => Lanes::from_fn(|lane| if lane == first { !0 } else { 0 }),
        None => Lanes::ZERO,
    }
}

fn splat_bool(value: bool) -> Lanes {
    if value { Lanes::ALL } else { Lanes::ZERO }
}

/// OR of every lane, broadcast back to all lanes.
fn or_all(v: Lanes) -> Lanes {
    let mut bits = 0;
    for lane in 0..LANE_COUNT {
        bits |= v.u32(lane);
    }
    Lanes::splat(bits)
}

/// Fill inactive holes by repeatedly pulling a rotated neighbor's value.
fn fill_inactive(v: Lanes, active: Lanes) -> Lanes {
    let mut filled = v & active;
    for _ in 0..LANE_COUNT - 1 {
        filled = filled | (rotate1(filled) & !active);
    }
    filled
}

/// Selection network: for each destination lane, compare its requested
/// source index against every physical lane and OR in the match.
fn select_lanes(v: Lanes, index: Lanes) -> Lanes {
    let mut out = Lanes::ZERO;
    for source in 0..LANE_COUNT {
        let wants = index.cmp_u32(Lanes::splat(source as u32), |a, b| a == b);
        out = out | (wants & Lanes::splat(v.u32(source)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_inactive_groups_yield_the_identity() {
        let v = Lanes::new([
            1.0f32.to_bits(),
            2.0f32.to_bits(),
            3.0f32.to_bits(),
            4.0f32.to_bits(),
        ]);
        let active = Lanes::ZERO;
        let identity = Lanes::splat_f32(0.0);
        let masked = (v & active) | (identity & !active);
        for operation in [
            GroupOperation::Reduce,
            GroupOperation::InclusiveScan,
            GroupOperation::ExclusiveScan,
        ] {
            let out = combine(operation, masked, identity, &|a, b| {
                a.zip_f32(b, |x, y| x + y)
            })
            .unwrap();
            for lane in 0..LANE_COUNT {
                assert_eq!(out.f32(lane), 0.0, "{operation:?} lane {lane}");
            }
        }
    }

    #[test]
    fn reduce_and_scans_match_reference() {
        let v = Lanes::new([1, 2, 3, 4]);
        let identity = Lanes::ZERO;
        let add = |a: Lanes, b: Lanes| a.zip_i32(b, i32::wrapping_add);

        let reduce = combine(GroupOperation::Reduce, v, identity, &add).unwrap();
        assert_eq!([reduce.u32(0), reduce.u32(1), reduce.u32(2), reduce.u32(3)], [10; 4]);

        let inclusive = combine(GroupOperation::InclusiveScan, v, identity, &add).unwrap();
        assert_eq!(
            [inclusive.u32(0), inclusive.u32(1), inclusive.u32(2), inclusive.u32(3)],
            [1, 3, 6, 10]
        );

        let exclusive = combine(GroupOperation::ExclusiveScan, v, identity, &add).unwrap();
        assert_eq!(
            [exclusive.u32(0), exclusive.u32(1), exclusive.u32(2), exclusive.u32(3)],
            [0, 1, 3, 6]
        );
    }

    #[test]
    fn partially_active_reduce_ignores_masked_lanes() {
        let v = Lanes::new([5, 100, 7, 100]);
        let active = Lanes::new([!0, 0, !0, 0]);
        let identity = Lanes::ZERO;
        let masked = (v & active) | (identity & !active);
        let out = combine(GroupOperation::Reduce, masked, identity, &|a, b| {
            a.zip_i32(b, i32::wrapping_add)
        })
        .unwrap();
        for lane in 0..LANE_COUNT {
            assert_eq!(out.u32(lane), 12);
        }
    }

    #[test]
    fn elect_picks_lowest_active_lane() {
        assert_eq!(elect(Lanes::new([0, !0, !0, 0])), Lanes::new([0, !0, 0, 0]));
        assert_eq!(elect(Lanes::ZERO), Lanes::ZERO);
    }

    #[test]
    fn fill_inactive_populates_holes_with_live_values() {
        let active = Lanes::new([0, !0, 0, 0]);
        let v = Lanes::new([9, 42, 9, 9]);
        let filled = fill_inactive(v, active);
        for lane in 0..LANE_COUNT {
            assert_eq!(filled.u32(lane), 42, "lane {lane}");
        }
    }

    #[test]
    fn shuffle_network_permutes_lanes() {
        let v = Lanes::new([10, 20, 30, 40]);
        let index = Lanes::new([3, 2, 1, 0]);
        assert_eq!(select_lanes(v, index), Lanes::new([40, 30, 20, 10]));
        // out-of-range requests select nothing
        let index = Lanes::new([7, 0, 0, 0]);
        assert_eq!(select_lanes(v, index).u32(0), 0);
    }
}
