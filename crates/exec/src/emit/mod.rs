//! The code-generation pass: a second walk over the module that evaluates
//! every instruction for a group of lanes at once. Control flow is lowered
//! into an active-lane mask (both arms of a divergent branch execute under
//! complementary masks), addressing picks between a bulk per-element fast
//! path and a per-lane gather/scatter depending on whether the pointer's
//! offset diverged, and discard is a sticky per-lane mask bit.

mod group;
mod ops;

use crate::access::{walk_access_chain, ChainOffset};
use crate::lanes::{Lanes, LANE_COUNT};
use crate::memory::BindingRef;
use crate::routine::Invocation;
use lanewise_core::{
    slot_index, Error, FastHashMap, Insn, ObjectId, ObjectKind, Shader, TypeId,
};
use spirv::{Op, StorageClass};

/// Per-loop bookkeeping. Lanes that branch to the merge block (a break)
/// or to the continue target sit out the rest of the current path; break
/// lanes stay out until the loop finishes.
struct LoopFrame {
    merge: u32,
    cont: u32,
    exited: Lanes,
    continued: Lanes,
}

/// Where a branch target takes its lanes, relative to the innermost
/// enclosing construct.
enum Exit {
    /// The merge point the current path was asked to stop at.
    Stop,
    /// The innermost loop's merge block.
    Break,
    /// The innermost loop's continue target.
    Continue,
}

pub(crate) struct Emitter<'a, 'b> {
    shader: &'a Shader,
    bindings: &'a FastHashMap<u32, BindingRef>,
    inv: &'a mut Invocation<'b>,
    /// Lanes this group was invoked with.
    entry_mask: Lanes,
    /// Lanes cleared by OpKill. Sticky: once clear, never set again.
    discarded: Lanes,
    /// Lanes that reached OpReturn.
    returned: Lanes,
    intermediates: FastHashMap<u32, Box<[Lanes]>>,
    lvalues: FastHashMap<u32, Vec<Lanes>>,
    chains: FastHashMap<u32, ChainOffset>,
    /// Lanes that flowed along each (from, to) branch edge since the target
    /// block last evaluated its phis. Accumulated with OR (a break edge can
    /// fire on several loop iterations) and consumed at phi evaluation.
    edges: FastHashMap<(u32, u32), Lanes>,
    loops: Vec<LoopFrame>,
}

impl<'a, 'b> Emitter<'a, 'b> {
    pub fn new(
        shader: &'a Shader,
        bindings: &'a FastHashMap<u32, BindingRef>,
        inv: &'a mut Invocation<'b>,
    ) -> Self {
        let entry_mask = Lanes::first_n(inv.lane_count.min(LANE_COUNT));
        Self {
            shader,
            bindings,
            inv,
            entry_mask,
            discarded: Lanes::ZERO,
            returned: Lanes::ZERO,
            intermediates: FastHashMap::default(),
            lvalues: FastHashMap::default(),
            chains: FastHashMap::default(),
            edges: FastHashMap::default(),
            loops: Vec::new(),
        }
    }

    /// Prolog, body, epilog. No suspension and no retry: the group runs to
    /// completion or the whole compile fails. Returns the lanes that
    /// finished without executing a discard.
    pub fn run(mut self) -> Result<Lanes, Error> {
        self.prolog()?;
        self.body()?;
        self.epilog()?;
        Ok(self.entry_mask.and_not(self.discarded))
    }

    fn shader(&self) -> &'a Shader {
        self.shader
    }

    /// The lanes of `mask` that are still executing: not discarded, not
    /// returned, and not sitting out an enclosing loop.
    fn live(&self, mask: Lanes) -> Lanes {
        let mut live = mask.and_not(self.discarded | self.returned);
        for frame in &self.loops {
            live = live.and_not(frame.exited | frame.continued);
        }
        live
    }

    // -- prolog / epilog ---------------------------------------------------

    fn prolog(&mut self) -> Result<(), Error> {
        // backing storage for every variable with a runtime footprint
        for (id, object) in self.shader.objects() {
            if !matches!(
                object.kind,
                ObjectKind::Variable | ObjectKind::InterfaceVariable
            ) {
                continue;
            }
            let pointee = self
                .shader
                .ty(object.ty)?
                .element
                .ok_or(Error::WrongIdKind {
                    id: id.0,
                    expected: "pointer-typed variable",
                })?;
            let size = self.shader.ty(pointee)?.size_in_components as usize;
            if size > 0 {
                self.lvalues.insert(id.0, vec![Lanes::ZERO; size]);
            }
        }

        // user-defined inputs arrive through the interface slot map
        for (id, object) in self.shader.objects() {
            if !matches!(object.kind, ObjectKind::InterfaceVariable) {
                continue;
            }
            if self.shader.ty(object.ty)?.storage_class != Some(StorageClass::Input) {
                continue;
            }
            let shader = self.shader;
            let inputs = self.inv.inputs;
            let storage = self
                .lvalues
                .get_mut(&id.0)
                .ok_or(Error::ForwardReference { id: id.0 })?;
            let mut offset = 0usize;
            shader.visit_interface(id, &mut |d, _ty| {
                let location = d.location.ok_or(Error::MissingLocation { id: id.0 })?;
                let slot = slot_index(location, d.component.unwrap_or(0));
                if slot < 0 {
                    return Err(Error::InterfaceSlotOutOfRange { slot });
                }
                storage[offset] = inputs.get(slot as usize).copied().unwrap_or(Lanes::ZERO);
                offset += 1;
                Ok(())
            })?;
        }

        // builtins the rasterizer supplied, copied into their slices
        for (built_in, slice) in self.shader.input_builtins() {
            let Some(values) = self.inv.input_builtins.get(&built_in) else {
                continue;
            };
            let Some(storage) = self.lvalues.get_mut(&slice.object.0) else {
                continue;
            };
            for i in 0..slice.size_in_components as usize {
                let index = slice.component_offset as usize + i;
                if let (Some(slot), Some(value)) = (storage.get_mut(index), values.get(i)) {
                    *slot = *value;
                }
            }
        }
        Ok(())
    }

    fn epilog(&mut self) -> Result<(), Error> {
        for (id, object) in self.shader.objects() {
            if !matches!(object.kind, ObjectKind::InterfaceVariable) {
                continue;
            }
            if self.shader.ty(object.ty)?.storage_class != Some(StorageClass::Output) {
                continue;
            }
            let shader = self.shader;
            let storage = self
                .lvalues
                .get(&id.0)
                .ok_or(Error::ForwardReference { id: id.0 })?;
            let outputs = &mut *self.inv.outputs;
            let mut offset = 0usize;
            shader.visit_interface(id, &mut |d, _ty| {
                let location = d.location.ok_or(Error::MissingLocation { id: id.0 })?;
                let slot = slot_index(location, d.component.unwrap_or(0));
                if slot < 0 {
                    return Err(Error::InterfaceSlotOutOfRange { slot });
                }
                if let Some(out) = outputs.get_mut(slot as usize) {
                    *out = storage.get(offset).copied().unwrap_or(Lanes::ZERO);
                }
                offset += 1;
                Ok(())
            })?;
        }

        for (built_in, slice) in self.shader.output_builtins() {
            let Some(storage) = self.lvalues.get(&slice.object.0) else {
                continue;
            };
            let start = slice.component_offset as usize;
            let end = (start + slice.size_in_components as usize).min(storage.len());
            self.inv
                .output_builtins
                .insert(built_in, storage[start..end].to_vec());
        }
        Ok(())
    }

    // -- body --------------------------------------------------------------

    fn body(&mut self) -> Result<(), Error> {
        match self.shader.entry_block() {
            Some(entry) => self.run_from(entry, None, self.entry_mask),
            // no labels: a straight-line instruction list
            None => {
                for insn in self.shader.module().iter() {
                    let insn = insn?;
                    match insn.opcode() {
                        Op::Return | Op::Unreachable => break,
                        Op::Kill => self.discarded = self.discarded | self.entry_mask,
                        _ => self.visit(&insn, self.entry_mask)?,
                    }
                }
                Ok(())
            }
        }
    }

    /// Execute blocks starting at `start` until control reaches `stop` or
    /// every lane's path has ended.
    fn run_from(&mut self, start: u32, stop: Option<u32>, entry: Lanes) -> Result<(), Error> {
        let mut block = start;
        let mut mask = entry;
        loop {
            // loop headers re-execute every iteration, so they are handled
            // whole rather than falling through the straight-line walk
            if let Some((merge, cont)) = self.loop_merge_of(block)? {
                self.run_loop(block, merge, cont, mask)?;
                if stop == Some(merge) {
                    return Ok(());
                }
                block = merge;
                continue;
            }

            let term_at = self.exec_block(block, mask)?;
            let insn = self.shader.module().insn_at(term_at)?;
            match insn.opcode() {
                Op::SelectionMerge => {
                    let merge = insn.word(1)?;
                    let term = self
                        .shader
                        .module()
                        .insn_at(term_at + insn.word_count() as usize)?;
                    match term.opcode() {
                        Op::BranchConditional => {
                            let cond = self.operand(term.word(1)?, 0)?;
                            let t = term.word(2)?;
                            let f = term.word(3)?;
                            let t_mask = mask & cond;
                            let f_mask = mask.and_not(cond);
                            self.record_edge(block, t, t_mask);
                            self.record_edge(block, f, f_mask);
                            if t != merge {
                                self.run_from(t, Some(merge), t_mask)?;
                            }
                            if f != merge {
                                self.run_from(f, Some(merge), f_mask)?;
                            }
                        }
                        Op::Switch => {
                            return Err(Error::UnsupportedControlFlow { what: "switch" })
                        }
                        _ => {
                            return Err(Error::UnsupportedControlFlow {
                                what: "selection merge without a conditional branch",
                            })
                        }
                    }
                    if stop == Some(merge) {
                        return Ok(());
                    }
                    block = merge;
                }

                Op::Branch => {
                    let target = insn.word(1)?;
                    self.record_edge(block, target, mask);
                    match self.classify(target, stop)? {
                        Some(exit) => {
                            self.apply_exit(exit, mask);
                            return Ok(());
                        }
                        None => block = target,
                    }
                }

                // a conditional without a merge declaration is a loop break
                // or continue edge
                Op::BranchConditional => {
                    let cond = self.operand(insn.word(1)?, 0)?;
                    let t = insn.word(2)?;
                    let f = insn.word(3)?;
                    let t_mask = mask & cond;
                    let f_mask = mask.and_not(cond);
                    self.record_edge(block, t, t_mask);
                    self.record_edge(block, f, f_mask);
                    match (self.classify(t, stop)?, self.classify(f, stop)?) {
                        (Some(te), Some(fe)) => {
                            self.apply_exit(te, t_mask);
                            self.apply_exit(fe, f_mask);
                            return Ok(());
                        }
                        (Some(te), None) => {
                            self.apply_exit(te, t_mask);
                            mask = f_mask;
                            block = f;
                        }
                        (None, Some(fe)) => {
                            self.apply_exit(fe, f_mask);
                            mask = t_mask;
                            block = t;
                        }
                        (None, None) => {
                            return Err(Error::UnsupportedControlFlow {
                                what: "unstructured conditional branch",
                            })
                        }
                    }
                }

                Op::Return => {
                    self.returned = self.returned | mask;
                    return Ok(());
                }
                Op::Kill => {
                    self.discarded = self.discarded | mask;
                    return Ok(());
                }
                Op::Unreachable => return Ok(()),
                Op::ReturnValue => {
                    return Err(Error::UnsupportedControlFlow {
                        what: "value-returning entry point",
                    })
                }
                op => return Err(Error::UnsupportedOpcode { op }),
            }
        }
    }

    /// One full loop construct. The header block re-executes each
    /// iteration (its phis select between the entry edge and the back
    /// edge), the body runs until the continue target, and lanes leave by
    /// branching to the merge block.
    fn run_loop(&mut self, header: u32, merge: u32, cont: u32, entry: Lanes) -> Result<(), Error> {
        self.loops.push(LoopFrame {
            merge,
            cont,
            exited: Lanes::ZERO,
            continued: Lanes::ZERO,
        });

        loop {
            let iterating = {
                let frame = self.loops.last().expect("loop frame");
                entry
                    .and_not(self.discarded | self.returned)
                    .and_not(frame.exited)
            };
            if !iterating.any() {
                break;
            }

            let decl_at = self.exec_block(header, iterating)?;
            let decl = self.shader.module().insn_at(decl_at)?;
            if decl.opcode() != Op::LoopMerge {
                return Err(Error::UnsupportedControlFlow {
                    what: "loop header without a merge declaration",
                });
            }
            let term = self
                .shader
                .module()
                .insn_at(decl_at + decl.word_count() as usize)?;

            let mut body = None;
            match term.opcode() {
                Op::Branch => {
                    let t = term.word(1)?;
                    self.record_edge(header, t, iterating);
                    if t == merge {
                        let frame = self.loops.last_mut().expect("loop frame");
                        frame.exited = frame.exited | iterating;
                    } else {
                        body = Some((t, iterating));
                    }
                }
                Op::BranchConditional => {
                    let cond = self.operand(term.word(1)?, 0)?;
                    let t = term.word(2)?;
                    let f = term.word(3)?;
                    let t_mask = iterating & cond;
                    let f_mask = iterating.and_not(cond);
                    self.record_edge(header, t, t_mask);
                    self.record_edge(header, f, f_mask);
                    for (label, lanes) in [(t, t_mask), (f, f_mask)] {
                        if label == merge {
                            let frame = self.loops.last_mut().expect("loop frame");
                            frame.exited = frame.exited | lanes;
                        } else if body.is_some() {
                            return Err(Error::UnsupportedControlFlow {
                                what: "loop header branching to two body blocks",
                            });
                        } else {
                            body = Some((label, lanes));
                        }
                    }
                }
                Op::Return => self.returned = self.returned | iterating,
                Op::Kill => self.discarded = self.discarded | iterating,
                // ends the path for these lanes, or the loop never would
                Op::Unreachable => self.returned = self.returned | iterating,
                Op::Switch => return Err(Error::UnsupportedControlFlow { what: "switch" }),
                _ => {
                    return Err(Error::UnsupportedControlFlow {
                        what: "malformed loop header terminator",
                    })
                }
            }

            if let Some((label, lanes)) = body {
                if label != cont && label != header {
                    self.run_from(label, Some(cont), lanes)?;
                }
                // lanes that took an early continue rejoin here
                let frame = self.loops.last_mut().expect("loop frame");
                frame.continued = Lanes::ZERO;
                let at_cont = {
                    let frame = self.loops.last().expect("loop frame");
                    entry
                        .and_not(self.discarded | self.returned)
                        .and_not(frame.exited)
                };
                if cont != header && at_cont.any() {
                    self.run_from(cont, Some(header), at_cont)?;
                }
            }
        }

        self.loops.pop();
        Ok(())
    }

    /// Execute a block's phis and straight-line instructions; returns the
    /// word offset of its merge declaration or terminator.
    fn exec_block(&mut self, block: u32, mask: Lanes) -> Result<usize, Error> {
        let mut at = self.shader.block_offset(block)?;
        let label = self.shader.module().insn_at(at)?;
        at += label.word_count() as usize;

        // phis read their incoming edges before anything in this block can
        // overwrite an intermediate, so evaluate them as a parallel copy;
        // the edges are consumed so a later re-entry (a loop header, or a
        // merge block reached again inside an outer loop) only sees fresh
        // masks
        let mut phis = Vec::new();
        let mut preds = Vec::new();
        loop {
            let insn = self.shader.module().insn_at(at)?;
            match insn.opcode() {
                Op::Phi => {
                    let (id, values) = self.eval_phi(block, &insn, &mut preds)?;
                    phis.push((id, values));
                }
                Op::Line | Op::NoLine => {}
                _ => break,
            }
            at += insn.word_count() as usize;
        }
        for pred in preds {
            self.edges.remove(&(pred, block));
        }
        for (id, values) in phis {
            self.intermediates.insert(id, values);
        }

        loop {
            let insn = self.shader.module().insn_at(at)?;
            match insn.opcode() {
                Op::SelectionMerge
                | Op::LoopMerge
                | Op::Branch
                | Op::BranchConditional
                | Op::Switch
                | Op::Return
                | Op::ReturnValue
                | Op::Kill
                | Op::Unreachable => return Ok(at),
                Op::Line | Op::NoLine => {}
                _ => self.visit(&insn, mask)?,
            }
            at += insn.word_count() as usize;
        }
    }

    /// Evaluate one phi. Starts from the previous value of the result (if
    /// any) so lanes with no fresh incoming edge, e.g. lanes that already
    /// left an enclosing loop, keep the value they exited with.
    fn eval_phi(
        &self,
        block: u32,
        insn: &Insn,
        preds: &mut Vec<u32>,
    ) -> Result<(u32, Box<[Lanes]>), Error> {
        let (id, size) = self.result(insn)?;
        let mut values = match self.intermediates.get(&id) {
            Some(existing) => existing.to_vec(),
            None => vec![Lanes::ZERO; size as usize],
        };
        let mut i = 3;
        while i + 1 < insn.word_count() {
            let value_id = insn.word(i)?;
            let pred = insn.word(i + 1)?;
            preds.push(pred);
            let lanes = self.edges.get(&(pred, block)).copied().unwrap_or(Lanes::ZERO);
            if lanes.any() {
                for (c, value) in values.iter_mut().enumerate() {
                    *value = Lanes::select(lanes, self.operand_or_zero(value_id, c as u32), *value);
                }
            }
            i += 2;
        }
        Ok((id, values.into_boxed_slice()))
    }

    fn record_edge(&mut self, from: u32, to: u32, mask: Lanes) {
        let edge = self.edges.entry((from, to)).or_insert(Lanes::ZERO);
        *edge = *edge | mask;
    }

    /// Scan a block for a loop-merge declaration without executing it.
    fn loop_merge_of(&self, block: u32) -> Result<Option<(u32, u32)>, Error> {
        let mut at = self.shader.block_offset(block)?;
        loop {
            let insn = self.shader.module().insn_at(at)?;
            match insn.opcode() {
                Op::LoopMerge => return Ok(Some((insn.word(1)?, insn.word(2)?))),
                Op::SelectionMerge
                | Op::Branch
                | Op::BranchConditional
                | Op::Switch
                | Op::Return
                | Op::ReturnValue
                | Op::Kill
                | Op::Unreachable => return Ok(None),
                _ => at += insn.word_count() as usize,
            }
        }
    }

    fn classify(&self, target: u32, stop: Option<u32>) -> Result<Option<Exit>, Error> {
        if stop == Some(target) {
            return Ok(Some(Exit::Stop));
        }
        if let Some(frame) = self.loops.last() {
            if frame.merge == target {
                return Ok(Some(Exit::Break));
            }
            if frame.cont == target {
                return Ok(Some(Exit::Continue));
            }
        }
        for frame in self.loops.iter().rev().skip(1) {
            if frame.merge == target || frame.cont == target {
                return Err(Error::UnsupportedControlFlow {
                    what: "multi-level loop exit",
                });
            }
        }
        Ok(None)
    }

    fn apply_exit(&mut self, exit: Exit, mask: Lanes) {
        match exit {
            Exit::Stop => {}
            Exit::Break => {
                if let Some(frame) = self.loops.last_mut() {
                    frame.exited = frame.exited | mask;
                }
            }
            Exit::Continue => {
                if let Some(frame) = self.loops.last_mut() {
                    frame.continued = frame.continued | mask;
                }
            }
        }
    }

    // -- instruction dispatch ----------------------------------------------

    fn visit(&mut self, insn: &Insn, mask: Lanes) -> Result<(), Error> {
        match insn.opcode() {
            Op::Load => self.emit_load(insn),
            Op::Store => self.emit_store(insn, mask),
            Op::AccessChain | Op::InBoundsAccessChain => self.emit_access_chain(insn),
            Op::ExtInst => ops::ext_inst(self, insn),
            op if group::is_group_op(op) => group::emit(self, insn, mask),
            op if is_declaration(op) => Ok(()),
            _ => ops::emit(self, insn),
        }
    }

    fn result(&self, insn: &Insn) -> Result<(u32, u32), Error> {
        let ty = TypeId(insn.word(1)?);
        let size = self.shader.ty(ty)?.size_in_components;
        Ok((insn.word(2)?, size))
    }

    fn set(&mut self, id: u32, values: Box<[Lanes]>) {
        self.intermediates.insert(id, values);
    }

    /// One component of an operand: a constant broadcasts its word, a value
    /// reads the per-lane intermediate.
    fn operand(&self, id: u32, component: u32) -> Result<Lanes, Error> {
        let object = self.shader.object(ObjectId(id))?;
        match &object.kind {
            ObjectKind::Constant(words) => Ok(Lanes::splat(
                words.get(component as usize).copied().unwrap_or(0),
            )),
            _ => self
                .intermediates
                .get(&id)
                .and_then(|values| values.get(component as usize))
                .copied()
                .ok_or(Error::ForwardReference { id }),
        }
    }

    /// Phi inputs along never-taken edges may be undefined; read them as
    /// zero instead of failing.
    fn operand_or_zero(&self, id: u32, component: u32) -> Lanes {
        self.operand(id, component).unwrap_or(Lanes::ZERO)
    }

    fn object_size(&self, id: u32) -> Result<u32, Error> {
        let object = self.shader.object(ObjectId(id))?;
        Ok(self.shader.ty(object.ty)?.size_in_components)
    }

    // -- memory ------------------------------------------------------------

    /// The resolved offset of a pointer operand: the split record if the
    /// pointer came from an access chain, a dynamic-only offset if it is
    /// some other runtime value, or zero for the variable itself.
    fn chain_of(&self, id: u32) -> Result<ChainOffset, Error> {
        if let Some(chain) = self.chains.get(&id) {
            return Ok(*chain);
        }
        let object = self.shader.object(ObjectId(id))?;
        match object.kind {
            ObjectKind::Value => Ok(ChainOffset {
                constant: 0,
                dynamic: Some(self.operand(id, 0)?),
            }),
            _ => Ok(ChainOffset::default()),
        }
    }

    fn emit_access_chain(&mut self, insn: &Insn) -> Result<(), Error> {
        let (id, _) = self.result(insn)?;
        let base = insn.word(3)?;
        let index_ids = insn.words_from(4)?;
        let base_offset = self.chains.get(&base).copied();
        let offset = walk_access_chain(
            self.shader,
            ObjectId(base),
            index_ids,
            base_offset,
            |index| self.operand(index.0, 0),
        )?;
        self.chains.insert(id, offset);
        self.set(id, vec![offset.lanes()].into_boxed_slice());
        Ok(())
    }

    fn emit_load(&mut self, insn: &Insn) -> Result<(), Error> {
        let (id, size) = self.result(insn)?;
        let ptr = insn.word(3)?;
        let chain = self.chain_of(ptr)?;
        let base = self.shader.object(ObjectId(ptr))?.pointer_base;
        let base_obj = self.shader.object(base)?;
        let mut dst = vec![Lanes::ZERO; size as usize].into_boxed_slice();

        match base_obj.kind {
            ObjectKind::Variable | ObjectKind::InterfaceVariable => {
                let storage = self
                    .lvalues
                    .get(&base.0)
                    .ok_or(Error::ForwardReference { id: base.0 })?;
                if chain.dynamic.is_some() {
                    // gather: lanes may address elements out of order
                    for (i, value) in dst.iter_mut().enumerate() {
                        for lane in 0..LANE_COUNT {
                            let index = chain.lane(lane) as usize + i;
                            value.set_u32(lane, storage.get(index).map_or(0, |l| l.u32(lane)));
                        }
                    }
                } else {
                    for (i, value) in dst.iter_mut().enumerate() {
                        let index = chain.constant as usize + i;
                        *value = storage.get(index).copied().unwrap_or(Lanes::ZERO);
                    }
                }
            }
            ObjectKind::PhysicalPointer => {
                let binding = *self
                    .bindings
                    .get(&base.0)
                    .ok_or(Error::MissingBinding { id: base.0 })?;
                if chain.dynamic.is_some() {
                    for (i, value) in dst.iter_mut().enumerate() {
                        for lane in 0..LANE_COUNT {
                            let index = chain.lane(lane) as usize + i;
                            value.set_u32(lane, self.inv.descriptors.word(&binding, index));
                        }
                    }
                } else {
                    for (i, value) in dst.iter_mut().enumerate() {
                        let index = chain.constant as usize + i;
                        *value = Lanes::splat(self.inv.descriptors.word(&binding, index));
                    }
                }
            }
            _ => {
                return Err(Error::WrongIdKind {
                    id: base.0,
                    expected: "loadable pointer base",
                })
            }
        }

        self.set(id, dst);
        Ok(())
    }

    fn emit_store(&mut self, insn: &Insn, mask: Lanes) -> Result<(), Error> {
        let ptr = insn.word(1)?;
        let value = insn.word(2)?;
        let live = self.live(mask);
        let chain = self.chain_of(ptr)?;
        let ptr_obj = self.shader.object(ObjectId(ptr))?;
        let pointee = self
            .shader
            .ty(ptr_obj.ty)?
            .element
            .ok_or(Error::WrongIdKind {
                id: ptr,
                expected: "pointer",
            })?;
        let size = self.shader.ty(pointee)?.size_in_components;
        let base = ptr_obj.pointer_base;
        let base_obj = self.shader.object(base)?;

        let src = (0..size)
            .map(|i| self.operand(value, i))
            .collect::<Result<Vec<_>, _>>()?;

        match base_obj.kind {
            ObjectKind::Variable | ObjectKind::InterfaceVariable => {
                let storage = self
                    .lvalues
                    .get_mut(&base.0)
                    .ok_or(Error::ForwardReference { id: base.0 })?;
                if chain.dynamic.is_some() {
                    // scatter, lane-ascending; out-of-range stores drop
                    for (i, value) in src.iter().enumerate() {
                        for lane in live.active_lanes() {
                            let index = chain.lane(lane) as usize + i;
                            if let Some(slot) = storage.get_mut(index) {
                                slot.set_u32(lane, value.u32(lane));
                            }
                        }
                    }
                } else {
                    for (i, value) in src.iter().enumerate() {
                        let index = chain.constant as usize + i;
                        if let Some(slot) = storage.get_mut(index) {
                            *slot = Lanes::select(live, *value, *slot);
                        }
                    }
                }
            }
            ObjectKind::PhysicalPointer => {
                let binding = *self
                    .bindings
                    .get(&base.0)
                    .ok_or(Error::MissingBinding { id: base.0 })?;
                for (i, value) in src.iter().enumerate() {
                    for lane in live.active_lanes() {
                        let index = chain.lane(lane) as usize + i;
                        self.inv.descriptors.set_word(&binding, index, value.u32(lane));
                    }
                }
            }
            _ => {
                return Err(Error::WrongIdKind {
                    id: base.0,
                    expected: "storable pointer base",
                })
            }
        }
        Ok(())
    }
}

/// Module-level declarations the analysis pass consumed; at emit time they
/// carry nothing.
fn is_declaration(op: Op) -> bool {
    use Op::*;
    matches!(
        op,
        Capability
            | MemoryModel
            | EntryPoint
            | ExecutionMode
            | ExtInstImport
            | Extension
            | Name
            | MemberName
            | Source
            | SourceContinued
            | SourceExtension
            | String
            | ModuleProcessed
            | Decorate
            | MemberDecorate
            | DecorationGroup
            | GroupDecorate
            | GroupMemberDecorate
            | TypeVoid
            | TypeBool
            | TypeInt
            | TypeFloat
            | TypeVector
            | TypeMatrix
            | TypeImage
            | TypeSampler
            | TypeSampledImage
            | TypeArray
            | TypeRuntimeArray
            | TypeStruct
            | TypePointer
            | TypeFunction
            | Constant
            | ConstantTrue
            | ConstantFalse
            | ConstantNull
            | ConstantComposite
            | Variable
            | Function
            | FunctionEnd
            | Nop
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{BindingInfo, DescriptorBindings, DescriptorLayout, DescriptorSet};
    use crate::routine::{BuiltinValues, Invocation, Routine};
    use lanewise_core::{ModuleBuilder, Shader, MAX_INTERFACE_SLOTS};
    use spirv::Decoration;
    use std::sync::Arc;

    /// Common scaffolding for a fragment-like module: float/uint/bool
    /// scalars, a float input at location 0 and a float output at
    /// location 0, wrapped in a single function.
    struct Scaffold {
        b: ModuleBuilder,
        float: u32,
        uint: u32,
        bool_ty: u32,
        in_var: u32,
        out_var: u32,
        fn_in_ptr: u32,
    }

    fn scaffold() -> Scaffold {
        let mut b = ModuleBuilder::new();
        let float = b.id();
        b.inst(Op::TypeFloat, &[float, 32]);
        let uint = b.id();
        b.inst(Op::TypeInt, &[uint, 32, 0]);
        let bool_ty = b.id();
        b.inst(Op::TypeBool, &[bool_ty]);
        let in_ptr = b.id();
        b.inst(Op::TypePointer, &[in_ptr, StorageClass::Input as u32, float]);
        let out_ptr = b.id();
        b.inst(Op::TypePointer, &[out_ptr, StorageClass::Output as u32, float]);
        let fn_in_ptr = b.id();
        b.inst(
            Op::TypePointer,
            &[fn_in_ptr, StorageClass::Function as u32, float],
        );
        let in_var = b.id();
        b.inst(Op::Decorate, &[in_var, Decoration::Location as u32, 0]);
        b.inst(Op::Variable, &[in_ptr, in_var, StorageClass::Input as u32]);
        let out_var = b.id();
        b.inst(Op::Decorate, &[out_var, Decoration::Location as u32, 0]);
        b.inst(Op::Variable, &[out_ptr, out_var, StorageClass::Output as u32]);
        Scaffold {
            b,
            float,
            uint,
            bool_ty,
            in_var,
            out_var,
            fn_in_ptr,
        }
    }

    fn run(shader: Shader, inputs: &[Lanes], lane_count: usize) -> (Vec<Lanes>, Lanes) {
        run_with_descriptors(shader, inputs, lane_count, DescriptorBindings::none()).unwrap()
    }

    fn run_with_descriptors(
        shader: Shader,
        inputs: &[Lanes],
        lane_count: usize,
        descriptors: DescriptorBindings<'_>,
    ) -> Result<(Vec<Lanes>, Lanes), Error> {
        let routine = Routine::compile(Arc::new(shader), &DescriptorLayout::empty())?;
        run_routine(&routine, inputs, lane_count, descriptors)
    }

    fn run_routine(
        routine: &Routine,
        inputs: &[Lanes],
        lane_count: usize,
        descriptors: DescriptorBindings<'_>,
    ) -> Result<(Vec<Lanes>, Lanes), Error> {
        let mut all_inputs = vec![Lanes::ZERO; MAX_INTERFACE_SLOTS];
        all_inputs[..inputs.len()].copy_from_slice(inputs);
        let mut outputs = vec![Lanes::ZERO; MAX_INTERFACE_SLOTS];
        let builtins_in = BuiltinValues::default();
        let mut builtins_out = BuiltinValues::default();
        let mut invocation = Invocation {
            inputs: &all_inputs,
            outputs: &mut outputs,
            input_builtins: &builtins_in,
            output_builtins: &mut builtins_out,
            descriptors,
            lane_count,
        };
        let survivors = routine.invoke(&mut invocation)?;
        Ok((outputs, survivors))
    }

    #[test]
    fn straight_line_copies_input_to_output() {
        let mut s = scaffold();
        let entry = s.b.id();
        s.b.inst(Op::Label, &[entry]);
        let loaded = s.b.id();
        s.b.inst(Op::Load, &[s.float, loaded, s.in_var]);
        let two = s.b.id();
        s.b.inst(Op::Constant, &[s.float, two, 2.0f32.to_bits()]);
        // constants interleave fine; the emit walk skips declarations
        let doubled = s.b.id();
        s.b.inst(Op::FMul, &[s.float, doubled, loaded, two]);
        s.b.inst(Op::Store, &[s.out_var, doubled]);
        s.b.inst(Op::Return, &[]);

        let shader = Shader::from_module(s.b.build()).unwrap();
        let input = Lanes::from_fn(|l| (l as f32 + 1.0).to_bits());
        let (outputs, survivors) = run(shader, &[input], LANE_COUNT);
        for lane in 0..LANE_COUNT {
            assert_eq!(outputs[0].f32(lane), (lane as f32 + 1.0) * 2.0);
        }
        assert_eq!(survivors, Lanes::ALL);
    }

    #[test]
    fn divergent_branch_runs_both_arms_under_masks() {
        let mut s = scaffold();
        let half = s.b.id();
        s.b.inst(Op::Constant, &[s.float, half, 1.5f32.to_bits()]);
        let ten = s.b.id();
        s.b.inst(Op::Constant, &[s.float, ten, 10.0f32.to_bits()]);

        let entry = s.b.id();
        let then_l = s.b.id();
        let else_l = s.b.id();
        let merge = s.b.id();

        s.b.inst(Op::Label, &[entry]);
        let x = s.b.id();
        s.b.inst(Op::Load, &[s.float, x, s.in_var]);
        let c = s.b.id();
        s.b.inst(Op::FOrdLessThan, &[s.bool_ty, c, x, half]);
        s.b.inst(Op::SelectionMerge, &[merge, 0]);
        s.b.inst(Op::BranchConditional, &[c, then_l, else_l]);

        s.b.inst(Op::Label, &[then_l]);
        let neg = s.b.id();
        s.b.inst(Op::FNegate, &[s.float, neg, x]);
        s.b.inst(Op::Store, &[s.out_var, neg]);
        s.b.inst(Op::Branch, &[merge]);

        s.b.inst(Op::Label, &[else_l]);
        let plus = s.b.id();
        s.b.inst(Op::FAdd, &[s.float, plus, x, ten]);
        s.b.inst(Op::Store, &[s.out_var, plus]);
        s.b.inst(Op::Branch, &[merge]);

        s.b.inst(Op::Label, &[merge]);
        s.b.inst(Op::Return, &[]);

        let shader = Shader::from_module(s.b.build()).unwrap();
        // lanes 0,1 take the then arm; lanes 2,3 the else arm
        let input = Lanes::from_fn(|l| (l as f32).to_bits());
        let (outputs, _) = run(shader, &[input], LANE_COUNT);
        assert_eq!(outputs[0].f32(0), -0.0);
        assert_eq!(outputs[0].f32(1), -1.0);
        assert_eq!(outputs[0].f32(2), 12.0);
        assert_eq!(outputs[0].f32(3), 13.0);
    }

    #[test]
    fn phi_selects_by_incoming_edge() {
        let mut s = scaffold();
        let half = s.b.id();
        s.b.inst(Op::Constant, &[s.float, half, 1.5f32.to_bits()]);
        let one = s.b.id();
        s.b.inst(Op::Constant, &[s.float, one, 1.0f32.to_bits()]);
        let two = s.b.id();
        s.b.inst(Op::Constant, &[s.float, two, 2.0f32.to_bits()]);

        let entry = s.b.id();
        let then_l = s.b.id();
        let merge = s.b.id();

        s.b.inst(Op::Label, &[entry]);
        let x = s.b.id();
        s.b.inst(Op::Load, &[s.float, x, s.in_var]);
        let c = s.b.id();
        s.b.inst(Op::FOrdLessThan, &[s.bool_ty, c, x, half]);
        s.b.inst(Op::SelectionMerge, &[merge, 0]);
        s.b.inst(Op::BranchConditional, &[c, then_l, merge]);

        s.b.inst(Op::Label, &[then_l]);
        s.b.inst(Op::Branch, &[merge]);

        s.b.inst(Op::Label, &[merge]);
        let r = s.b.id();
        s.b.inst(Op::Phi, &[s.float, r, one, then_l, two, entry]);
        s.b.inst(Op::Store, &[s.out_var, r]);
        s.b.inst(Op::Return, &[]);

        let shader = Shader::from_module(s.b.build()).unwrap();
        let input = Lanes::from_fn(|l| (l as f32).to_bits());
        let (outputs, _) = run(shader, &[input], LANE_COUNT);
        assert_eq!(outputs[0].f32(0), 1.0);
        assert_eq!(outputs[0].f32(1), 1.0);
        assert_eq!(outputs[0].f32(2), 2.0);
        assert_eq!(outputs[0].f32(3), 2.0);
    }

    /// Lanes iterate different trip counts; the loop runs until the last
    /// lane is done and early finishers keep their values.
    #[test]
    fn loop_with_divergent_trip_counts() {
        let mut s = scaffold();
        let zero_f = s.b.id();
        s.b.inst(Op::Constant, &[s.float, zero_f, 0.0f32.to_bits()]);
        let one_f = s.b.id();
        s.b.inst(Op::Constant, &[s.float, one_f, 1.0f32.to_bits()]);

        let entry = s.b.id();
        let header = s.b.id();
        let body = s.b.id();
        let cont = s.b.id();
        let merge = s.b.id();

        s.b.inst(Op::Label, &[entry]);
        let limit = s.b.id();
        s.b.inst(Op::Load, &[s.float, limit, s.in_var]);
        s.b.inst(Op::Branch, &[header]);

        // while (acc < limit) acc += 1
        s.b.inst(Op::Label, &[header]);
        let acc = s.b.id();
        let acc_next = s.b.id();
        s.b.inst(Op::Phi, &[s.float, acc, zero_f, entry, acc_next, cont]);
        let c = s.b.id();
        s.b.inst(Op::FOrdLessThan, &[s.bool_ty, c, acc, limit]);
        s.b.inst(Op::LoopMerge, &[merge, cont, 0]);
        s.b.inst(Op::BranchConditional, &[c, body, merge]);

        s.b.inst(Op::Label, &[body]);
        s.b.inst(Op::FAdd, &[s.float, acc_next, acc, one_f]);
        s.b.inst(Op::Branch, &[cont]);

        s.b.inst(Op::Label, &[cont]);
        s.b.inst(Op::Branch, &[header]);

        s.b.inst(Op::Label, &[merge]);
        s.b.inst(Op::Store, &[s.out_var, acc]);
        s.b.inst(Op::Return, &[]);

        let shader = Shader::from_module(s.b.build()).unwrap();
        let input = Lanes::from_fn(|l| (l as f32).to_bits());
        let (outputs, _) = run(shader, &[input], LANE_COUNT);
        for lane in 0..LANE_COUNT {
            assert_eq!(outputs[0].f32(lane), lane as f32, "lane {lane}");
        }
    }

    /// Discard is sticky: lanes killed in the branch arm never observe the
    /// store after the merge point.
    #[test]
    fn kill_clears_lanes_for_the_rest_of_the_group() {
        let mut s = scaffold();
        let half = s.b.id();
        s.b.inst(Op::Constant, &[s.float, half, 1.5f32.to_bits()]);
        let one = s.b.id();
        s.b.inst(Op::Constant, &[s.float, one, 1.0f32.to_bits()]);
        let two = s.b.id();
        s.b.inst(Op::Constant, &[s.float, two, 2.0f32.to_bits()]);

        let entry = s.b.id();
        let kill_l = s.b.id();
        let merge = s.b.id();

        s.b.inst(Op::Label, &[entry]);
        s.b.inst(Op::Store, &[s.out_var, one]);
        let x = s.b.id();
        s.b.inst(Op::Load, &[s.float, x, s.in_var]);
        let c = s.b.id();
        s.b.inst(Op::FOrdLessThan, &[s.bool_ty, c, x, half]);
        s.b.inst(Op::SelectionMerge, &[merge, 0]);
        s.b.inst(Op::BranchConditional, &[c, kill_l, merge]);

        s.b.inst(Op::Label, &[kill_l]);
        s.b.inst(Op::Kill, &[]);

        s.b.inst(Op::Label, &[merge]);
        s.b.inst(Op::Store, &[s.out_var, two]);
        s.b.inst(Op::Return, &[]);

        let shader = Shader::from_module(s.b.build()).unwrap();
        assert!(shader.modes().contains_kill);
        let input = Lanes::from_fn(|l| (l as f32).to_bits());
        let (outputs, survivors) = run(shader, &[input], LANE_COUNT);
        // lanes 0,1 were discarded after the first store
        assert_eq!(outputs[0].f32(0), 1.0);
        assert_eq!(outputs[0].f32(1), 1.0);
        assert_eq!(outputs[0].f32(2), 2.0);
        assert_eq!(outputs[0].f32(3), 2.0);
        assert_eq!(survivors, Lanes::new([0, 0, !0, !0]));
    }

    /// A function-storage array addressed by a per-lane index: stores
    /// scatter, loads gather, and lanes stay independent.
    #[test]
    fn divergent_array_addressing_round_trips() {
        let mut s = scaffold();
        let four = s.b.id();
        s.b.inst(Op::Constant, &[s.uint, four, 4]);
        let arr = s.b.id();
        s.b.inst(Op::TypeArray, &[arr, s.float, four]);
        let arr_ptr = s.b.id();
        s.b.inst(Op::TypePointer, &[arr_ptr, StorageClass::Function as u32, arr]);
        let u_in_ptr = s.b.id();
        s.b.inst(Op::TypePointer, &[u_in_ptr, StorageClass::Input as u32, s.uint]);
        let idx_var = s.b.id();
        s.b.inst(Op::Decorate, &[idx_var, Decoration::Location as u32, 1]);
        s.b.inst(Op::Decorate, &[idx_var, Decoration::Flat as u32]);
        s.b.inst(Op::Variable, &[u_in_ptr, idx_var, StorageClass::Input as u32]);

        let entry = s.b.id();
        s.b.inst(Op::Label, &[entry]);
        let scratch = s.b.id();
        s.b.inst(Op::Variable, &[arr_ptr, scratch, StorageClass::Function as u32]);
        let index = s.b.id();
        s.b.inst(Op::Load, &[s.uint, index, idx_var]);
        let x = s.b.id();
        s.b.inst(Op::Load, &[s.float, x, s.in_var]);
        let slot = s.b.id();
        s.b.inst(Op::AccessChain, &[s.fn_in_ptr, slot, scratch, index]);
        s.b.inst(Op::Store, &[slot, x]);
        let back = s.b.id();
        s.b.inst(Op::Load, &[s.float, back, slot]);
        s.b.inst(Op::Store, &[s.out_var, back]);
        s.b.inst(Op::Return, &[]);

        let shader = Shader::from_module(s.b.build()).unwrap();
        let values = Lanes::from_fn(|l| (10.0 * (l as f32 + 1.0)).to_bits());
        // lanes write slots 3,2,1,0: distinct but out of order
        let indices = Lanes::from_fn(|l| (LANE_COUNT - 1 - l) as u32);
        let inputs = [
            values,
            Lanes::ZERO,
            Lanes::ZERO,
            Lanes::ZERO,
            indices, // location 1, component 0 is slot 4
        ];
        let (outputs, _) = run(shader, &inputs, LANE_COUNT);
        for lane in 0..LANE_COUNT {
            assert_eq!(outputs[0].f32(lane), 10.0 * (lane as f32 + 1.0));
        }
    }

    /// A copied access chain addresses the same element as the original:
    /// the copy keeps both the logical base and the resolved offset.
    #[test]
    fn copied_pointers_keep_their_base_and_offset() {
        let mut s = scaffold();
        let four = s.b.id();
        s.b.inst(Op::Constant, &[s.uint, four, 4]);
        let arr = s.b.id();
        s.b.inst(Op::TypeArray, &[arr, s.float, four]);
        let arr_ptr = s.b.id();
        s.b.inst(Op::TypePointer, &[arr_ptr, StorageClass::Function as u32, arr]);
        let two_u = s.b.id();
        s.b.inst(Op::Constant, &[s.uint, two_u, 2]);

        let entry = s.b.id();
        s.b.inst(Op::Label, &[entry]);
        let scratch = s.b.id();
        s.b.inst(Op::Variable, &[arr_ptr, scratch, StorageClass::Function as u32]);
        let x = s.b.id();
        s.b.inst(Op::Load, &[s.float, x, s.in_var]);
        let slot = s.b.id();
        s.b.inst(Op::AccessChain, &[s.fn_in_ptr, slot, scratch, two_u]);
        let alias = s.b.id();
        s.b.inst(Op::CopyObject, &[s.fn_in_ptr, alias, slot]);
        s.b.inst(Op::Store, &[alias, x]);
        let back = s.b.id();
        s.b.inst(Op::Load, &[s.float, back, alias]);
        s.b.inst(Op::Store, &[s.out_var, back]);
        s.b.inst(Op::Return, &[]);

        let shader = Shader::from_module(s.b.build()).unwrap();
        let input = Lanes::from_fn(|l| (l as f32 + 0.5).to_bits());
        let (outputs, _) = run(shader, &[input], LANE_COUNT);
        for lane in 0..LANE_COUNT {
            assert_eq!(outputs[0].f32(lane), lane as f32 + 0.5);
        }
    }

    #[test]
    fn descriptor_backed_load_uses_resolved_binding() {
        let mut s = scaffold();
        let v4 = s.b.id();
        s.b.inst(Op::TypeVector, &[v4, s.float, 4]);
        let ub_ptr = s.b.id();
        s.b.inst(Op::TypePointer, &[ub_ptr, StorageClass::Uniform as u32, v4]);
        let ub_elem_ptr = s.b.id();
        s.b.inst(Op::TypePointer, &[ub_elem_ptr, StorageClass::Uniform as u32, s.float]);
        let ub = s.b.id();
        s.b.inst(Op::Decorate, &[ub, Decoration::DescriptorSet as u32, 0]);
        s.b.inst(Op::Decorate, &[ub, Decoration::Binding as u32, 1]);
        s.b.inst(Op::Variable, &[ub_ptr, ub, StorageClass::Uniform as u32]);
        let two_u = s.b.id();
        s.b.inst(Op::Constant, &[s.uint, two_u, 2]);

        let entry = s.b.id();
        s.b.inst(Op::Label, &[entry]);
        let chain = s.b.id();
        s.b.inst(Op::AccessChain, &[ub_elem_ptr, chain, ub, two_u]);
        let x = s.b.id();
        s.b.inst(Op::Load, &[s.float, x, chain]);
        s.b.inst(Op::Store, &[s.out_var, x]);
        s.b.inst(Op::Return, &[]);

        let shader = Shader::from_module(s.b.build()).unwrap();
        let layout = DescriptorLayout::new(vec![vec![
            BindingInfo { offset: 0, len: 0 },
            BindingInfo { offset: 1, len: 4 },
        ]]);
        let routine = Routine::compile(Arc::new(shader), &layout).unwrap();

        // binding 1 starts one word in; element 2 is 7.5
        let memory = [
            0xdead_beef,
            1.5f32.to_bits(),
            2.5f32.to_bits(),
            7.5f32.to_bits(),
            9.0f32.to_bits(),
        ];
        let descriptors = DescriptorBindings::new(vec![DescriptorSet::Read(&memory)]);
        let (outputs, _) = run_routine(&routine, &[], LANE_COUNT, descriptors).unwrap();
        for lane in 0..LANE_COUNT {
            assert_eq!(outputs[0].f32(lane), 7.5);
        }
    }

    #[test]
    fn compile_rejects_missing_bindings() {
        let mut s = scaffold();
        let ub_ptr = s.b.id();
        s.b.inst(Op::TypePointer, &[ub_ptr, StorageClass::Uniform as u32, s.float]);
        let ub = s.b.id();
        // no DescriptorSet/Binding decorations
        s.b.inst(Op::Variable, &[ub_ptr, ub, StorageClass::Uniform as u32]);
        let shader = Shader::from_module(s.b.build()).unwrap();
        assert!(matches!(
            Routine::compile(Arc::new(shader), &DescriptorLayout::empty()),
            Err(Error::MissingBinding { .. })
        ));
    }

    /// Composites and the extended instruction set working together:
    /// construct a vec2, swizzle it, clamp one component.
    #[test]
    fn composites_and_ext_inst_lower_componentwise() {
        let mut s = scaffold();
        let glsl = s.b.id();
        let mut operands = vec![glsl];
        operands.extend(ModuleBuilder::string_words("GLSL.std.450"));
        s.b.inst(Op::ExtInstImport, &operands);
        let v2 = s.b.id();
        s.b.inst(Op::TypeVector, &[v2, s.float, 2]);
        let lo = s.b.id();
        s.b.inst(Op::Constant, &[s.float, lo, 0.0f32.to_bits()]);
        let hi = s.b.id();
        s.b.inst(Op::Constant, &[s.float, hi, 2.0f32.to_bits()]);

        let entry = s.b.id();
        s.b.inst(Op::Label, &[entry]);
        let x = s.b.id();
        s.b.inst(Op::Load, &[s.float, x, s.in_var]);
        let pair = s.b.id();
        s.b.inst(Op::CompositeConstruct, &[v2, pair, x, lo]);
        let swapped = s.b.id();
        s.b.inst(Op::VectorShuffle, &[v2, swapped, pair, pair, 1, 0]);
        let second = s.b.id();
        s.b.inst(Op::CompositeExtract, &[s.float, second, swapped, 1]);
        let clamped = s.b.id();
        s.b.inst(
            Op::ExtInst,
            &[s.float, clamped, glsl, spirv::GLOp::FClamp as u32, second, lo, hi],
        );
        s.b.inst(Op::Store, &[s.out_var, clamped]);
        s.b.inst(Op::Return, &[]);

        let shader = Shader::from_module(s.b.build()).unwrap();
        let input = Lanes::new([
            (-1.0f32).to_bits(),
            0.5f32.to_bits(),
            2.0f32.to_bits(),
            9.0f32.to_bits(),
        ]);
        let (outputs, _) = run(shader, &[input], LANE_COUNT);
        // the shuffle put x at component 1, then clamp to [0, 2]
        assert_eq!(outputs[0].f32(0), 0.0);
        assert_eq!(outputs[0].f32(1), 0.5);
        assert_eq!(outputs[0].f32(2), 2.0);
        assert_eq!(outputs[0].f32(3), 2.0);
    }

    #[test]
    fn partial_groups_leave_tail_lanes_untouched() {
        let mut s = scaffold();
        let entry = s.b.id();
        s.b.inst(Op::Label, &[entry]);
        let x = s.b.id();
        s.b.inst(Op::Load, &[s.float, x, s.in_var]);
        s.b.inst(Op::Store, &[s.out_var, x]);
        s.b.inst(Op::Return, &[]);

        let shader = Shader::from_module(s.b.build()).unwrap();
        let input = Lanes::splat_f32(5.0);
        let (outputs, survivors) = run(shader, &[input], 2);
        assert_eq!(outputs[0].f32(0), 5.0);
        assert_eq!(outputs[0].f32(1), 5.0);
        // lanes beyond the live count never stored
        assert_eq!(outputs[0].u32(2), 0);
        assert_eq!(outputs[0].u32(3), 0);
        assert_eq!(survivors, Lanes::first_n(2));
    }
}
