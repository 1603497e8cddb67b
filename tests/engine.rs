use lanewise::pipeline::{Device, LaneBatch, PipelineState, ThreadPool};
use lanewise::{
    AttribType, BindingInfo, DescriptorLayout, Lanes, ModuleBuilder, Shader, LANE_COUNT,
    MAX_INTERFACE_SLOTS,
};
use spirv::{BuiltIn, Decoration, Op, Scope, StorageClass};

/// a fragment-like shader with one float input and one float output plus a
/// divergent if/else, drawn through the device
/// - tests that the whole parse/compile/dispatch path works
/// - tests that routines are cached per (shader, state) fingerprint
#[test]
fn draw_divergent_shader_through_device() {
    let mut b = ModuleBuilder::new();
    let float = b.id();
    b.inst(Op::TypeFloat, &[float, 32]);
    let bool_ty = b.id();
    b.inst(Op::TypeBool, &[bool_ty]);
    let in_ptr = b.id();
    b.inst(Op::TypePointer, &[in_ptr, StorageClass::Input as u32, float]);
    let out_ptr = b.id();
    b.inst(Op::TypePointer, &[out_ptr, StorageClass::Output as u32, float]);
    let in_var = b.id();
    b.inst(Op::Decorate, &[in_var, Decoration::Location as u32, 0]);
    b.inst(Op::Variable, &[in_ptr, in_var, StorageClass::Input as u32]);
    let out_var = b.id();
    b.inst(Op::Decorate, &[out_var, Decoration::Location as u32, 0]);
    b.inst(Op::Variable, &[out_ptr, out_var, StorageClass::Output as u32]);
    let threshold = b.id();
    b.inst(Op::Constant, &[float, threshold, 1.5f32.to_bits()]);
    let ten = b.id();
    b.inst(Op::Constant, &[float, ten, 10.0f32.to_bits()]);

    let entry = b.id();
    let then_l = b.id();
    let else_l = b.id();
    let merge = b.id();
    b.inst(Op::Label, &[entry]);
    let x = b.id();
    b.inst(Op::Load, &[float, x, in_var]);
    let c = b.id();
    b.inst(Op::FOrdLessThan, &[bool_ty, c, x, threshold]);
    b.inst(Op::SelectionMerge, &[merge, 0]);
    b.inst(Op::BranchConditional, &[c, then_l, else_l]);
    b.inst(Op::Label, &[then_l]);
    let neg = b.id();
    b.inst(Op::FNegate, &[float, neg, x]);
    b.inst(Op::Store, &[out_var, neg]);
    b.inst(Op::Branch, &[merge]);
    b.inst(Op::Label, &[else_l]);
    let plus = b.id();
    b.inst(Op::FAdd, &[float, plus, x, ten]);
    b.inst(Op::Store, &[out_var, plus]);
    b.inst(Op::Branch, &[merge]);
    b.inst(Op::Label, &[merge]);
    b.inst(Op::Return, &[]);

    let mut device = Device::with_config(ThreadPool::with_threads(2), 16);
    let shader = device.create_shader(b.build_words()).unwrap();
    let state = PipelineState::default();

    let mut batches: Vec<LaneBatch> = (0..3)
        .map(|batch| {
            let mut lanes = LaneBatch::default();
            lanes.inputs[0] = Lanes::from_fn(|l| (batch as f32 + l as f32 * 0.5).to_bits());
            lanes
        })
        .collect();
    device.draw(shader, &state, &[], &mut batches).unwrap();

    for (i, batch) in batches.iter().enumerate() {
        for lane in 0..LANE_COUNT {
            let x = i as f32 + lane as f32 * 0.5;
            let expected = if x < 1.5 { -x } else { x + 10.0 };
            assert_eq!(batch.outputs[0].f32(lane), expected, "batch {i} lane {lane}");
        }
        assert_eq!(batch.survivors, Lanes::ALL);
    }

    // same fingerprint reuses the routine; a different state compiles anew
    assert_eq!(device.cached_routines(), 1);
    device.draw(shader, &state, &[], &mut batches).unwrap();
    assert_eq!(device.cached_routines(), 1);
    let mut other = state;
    other.sample_count = 4;
    device.draw(shader, &other, &[], &mut batches).unwrap();
    assert_eq!(device.cached_routines(), 2);
}

/// an input block of two float4 members at locations 0 and 1
/// - tests the documented slot assignment: slots 0..3 and 4..7 are floats,
///   everything else stays unused
#[test]
fn interface_block_slot_assignment() {
    let mut b = ModuleBuilder::new();
    let float = b.id();
    b.inst(Op::TypeFloat, &[float, 32]);
    let v4 = b.id();
    b.inst(Op::TypeVector, &[v4, float, 4]);
    let st = b.id();
    b.inst(Op::MemberDecorate, &[st, 0, Decoration::Location as u32, 0]);
    b.inst(Op::MemberDecorate, &[st, 1, Decoration::Location as u32, 1]);
    b.inst(Op::TypeStruct, &[st, v4, v4]);
    let ptr = b.id();
    b.inst(Op::TypePointer, &[ptr, StorageClass::Input as u32, st]);
    let var = b.id();
    b.inst(Op::Variable, &[ptr, var, StorageClass::Input as u32]);

    let shader = Shader::from_module(b.build()).unwrap();
    let slots = shader.input_slots();
    for slot in 0..8 {
        assert_eq!(slots[slot].ty, AttribType::Float, "slot {slot}");
    }
    for slot in 8..MAX_INTERFACE_SLOTS {
        assert_eq!(slots[slot].ty, AttribType::Unused, "slot {slot}");
    }
}

/// a shader scaling its input by a value from a uniform buffer
/// - tests descriptor layout registration on the device
/// - tests the uniform (bulk) addressing regime against descriptor memory
#[test]
fn draw_with_descriptor_backed_uniform() {
    let mut b = ModuleBuilder::new();
    let float = b.id();
    b.inst(Op::TypeFloat, &[float, 32]);
    let in_ptr = b.id();
    b.inst(Op::TypePointer, &[in_ptr, StorageClass::Input as u32, float]);
    let out_ptr = b.id();
    b.inst(Op::TypePointer, &[out_ptr, StorageClass::Output as u32, float]);
    let ub_ptr = b.id();
    b.inst(Op::TypePointer, &[ub_ptr, StorageClass::Uniform as u32, float]);
    let in_var = b.id();
    b.inst(Op::Decorate, &[in_var, Decoration::Location as u32, 0]);
    b.inst(Op::Variable, &[in_ptr, in_var, StorageClass::Input as u32]);
    let out_var = b.id();
    b.inst(Op::Decorate, &[out_var, Decoration::Location as u32, 0]);
    b.inst(Op::Variable, &[out_ptr, out_var, StorageClass::Output as u32]);
    let scale = b.id();
    b.inst(Op::Decorate, &[scale, Decoration::DescriptorSet as u32, 0]);
    b.inst(Op::Decorate, &[scale, Decoration::Binding as u32, 0]);
    b.inst(Op::Variable, &[ub_ptr, scale, StorageClass::Uniform as u32]);

    let entry = b.id();
    b.inst(Op::Label, &[entry]);
    let x = b.id();
    b.inst(Op::Load, &[float, x, in_var]);
    let s = b.id();
    b.inst(Op::Load, &[float, s, scale]);
    let scaled = b.id();
    b.inst(Op::FMul, &[float, scaled, x, s]);
    b.inst(Op::Store, &[out_var, scaled]);
    b.inst(Op::Return, &[]);

    let mut device = Device::with_config(ThreadPool::with_threads(1), 16);
    let shader = device.create_shader(b.build_words()).unwrap();
    let layout = device.create_layout(DescriptorLayout::new(vec![vec![BindingInfo {
        offset: 0,
        len: 1,
    }]]));
    let mut state = PipelineState::default();
    state.descriptor_layout = layout;

    let memory = [3.0f32.to_bits()];
    let mut batches = [LaneBatch::default()];
    batches[0].inputs[0] = Lanes::from_fn(|l| (l as f32 + 1.0).to_bits());
    device
        .draw(shader, &state, &[&memory], &mut batches)
        .unwrap();
    for lane in 0..LANE_COUNT {
        assert_eq!(batches[0].outputs[0].f32(lane), (lane as f32 + 1.0) * 3.0);
    }
}

/// a subgroup reduction through the whole pipeline
/// - tests group-op lowering end to end: every lane observes the sum over
///   the live lanes of its group
#[test]
fn draw_subgroup_reduction() {
    let mut b = ModuleBuilder::new();
    let float = b.id();
    b.inst(Op::TypeFloat, &[float, 32]);
    let uint = b.id();
    b.inst(Op::TypeInt, &[uint, 32, 0]);
    let in_ptr = b.id();
    b.inst(Op::TypePointer, &[in_ptr, StorageClass::Input as u32, float]);
    let out_ptr = b.id();
    b.inst(Op::TypePointer, &[out_ptr, StorageClass::Output as u32, float]);
    let in_var = b.id();
    b.inst(Op::Decorate, &[in_var, Decoration::Location as u32, 0]);
    b.inst(Op::Variable, &[in_ptr, in_var, StorageClass::Input as u32]);
    let out_var = b.id();
    b.inst(Op::Decorate, &[out_var, Decoration::Location as u32, 0]);
    b.inst(Op::Variable, &[out_ptr, out_var, StorageClass::Output as u32]);
    let subgroup = b.id();
    b.inst(Op::Constant, &[uint, subgroup, Scope::Subgroup as u32]);

    let entry = b.id();
    b.inst(Op::Label, &[entry]);
    let x = b.id();
    b.inst(Op::Load, &[float, x, in_var]);
    let sum = b.id();
    b.inst(
        Op::GroupNonUniformFAdd,
        &[float, sum, subgroup, spirv::GroupOperation::Reduce as u32, x],
    );
    b.inst(Op::Store, &[out_var, sum]);
    b.inst(Op::Return, &[]);

    let mut device = Device::with_config(ThreadPool::with_threads(1), 4);
    let shader = device.create_shader(b.build_words()).unwrap();
    let state = PipelineState::default();

    // a full group and a partial one
    let mut batches = [LaneBatch::default(), LaneBatch::new(2)];
    batches[0].inputs[0] = Lanes::from_fn(|l| (l as f32 + 1.0).to_bits());
    batches[1].inputs[0] = Lanes::from_fn(|l| (l as f32 + 1.0).to_bits());
    device.draw(shader, &state, &[], &mut batches).unwrap();

    for lane in 0..LANE_COUNT {
        assert_eq!(batches[0].outputs[0].f32(lane), 10.0);
    }
    // only the two live lanes contribute, and only they store
    assert_eq!(batches[1].outputs[0].f32(0), 3.0);
    assert_eq!(batches[1].outputs[0].f32(1), 3.0);
    assert_eq!(batches[1].outputs[0].u32(2), 0);
    assert_eq!(batches[1].outputs[0].u32(3), 0);
}

/// a vertex-like shader writing a builtin block
/// - tests builtin block registration and the epilog copy into
///   `output_builtins`
#[test]
fn builtin_block_output_reaches_the_rasterizer() {
    let mut b = ModuleBuilder::new();
    let float = b.id();
    b.inst(Op::TypeFloat, &[float, 32]);
    let uint = b.id();
    b.inst(Op::TypeInt, &[uint, 32, 0]);
    let v4 = b.id();
    b.inst(Op::TypeVector, &[v4, float, 4]);
    let st = b.id();
    b.inst(
        Op::MemberDecorate,
        &[st, 0, Decoration::BuiltIn as u32, BuiltIn::Position as u32],
    );
    b.inst(Op::TypeStruct, &[st, v4]);
    let block_ptr = b.id();
    b.inst(Op::TypePointer, &[block_ptr, StorageClass::Output as u32, st]);
    let v4_out_ptr = b.id();
    b.inst(Op::TypePointer, &[v4_out_ptr, StorageClass::Output as u32, v4]);
    let block = b.id();
    b.inst(Op::Variable, &[block_ptr, block, StorageClass::Output as u32]);
    let zero_u = b.id();
    b.inst(Op::Constant, &[uint, zero_u, 0]);
    let x = b.id();
    b.inst(Op::Constant, &[float, x, 1.0f32.to_bits()]);
    let y = b.id();
    b.inst(Op::Constant, &[float, y, 2.0f32.to_bits()]);
    let z = b.id();
    b.inst(Op::Constant, &[float, z, 3.0f32.to_bits()]);
    let w = b.id();
    b.inst(Op::Constant, &[float, w, 4.0f32.to_bits()]);
    let position = b.id();
    b.inst(Op::ConstantComposite, &[v4, position, x, y, z, w]);

    let entry = b.id();
    b.inst(Op::Label, &[entry]);
    let member = b.id();
    b.inst(Op::AccessChain, &[v4_out_ptr, member, block, zero_u]);
    b.inst(Op::Store, &[member, position]);
    b.inst(Op::Return, &[]);

    let mut device = Device::with_config(ThreadPool::with_threads(1), 4);
    let shader = device.create_shader(b.build_words()).unwrap();
    let mut batches = [LaneBatch::default()];
    device
        .draw(shader, &PipelineState::default(), &[], &mut batches)
        .unwrap();

    let position_out = &batches[0].output_builtins[&BuiltIn::Position];
    assert_eq!(position_out.len(), 4);
    for lane in 0..LANE_COUNT {
        assert_eq!(position_out[0].f32(lane), 1.0);
        assert_eq!(position_out[1].f32(lane), 2.0);
        assert_eq!(position_out[2].f32(lane), 3.0);
        assert_eq!(position_out[3].f32(lane), 4.0);
    }
}
