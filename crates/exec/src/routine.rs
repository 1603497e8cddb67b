//! The compiled routine: the callable product of analysis plus one-time
//! descriptor resolution, invoked by the rasterizer or dispatcher once per
//! batch of lanes.

use crate::emit::Emitter;
use crate::lanes::Lanes;
use crate::memory::{BindingRef, DescriptorBindings, DescriptorLayout};
use lanewise_core::{Error, FastHashMap, ObjectKind, Shader};
use std::sync::Arc;

/// Builtin values exchanged with the rasterizer, one component vector per
/// builtin.
pub type BuiltinValues = FastHashMap<spirv::BuiltIn, Vec<Lanes>>;

/// Everything one lane-group evaluation reads and writes. Inputs and
/// outputs are indexed by interface slot; builtins travel separately.
pub struct Invocation<'a> {
    pub inputs: &'a [Lanes],
    pub outputs: &'a mut [Lanes],
    pub input_builtins: &'a BuiltinValues,
    pub output_builtins: &'a mut BuiltinValues,
    pub descriptors: DescriptorBindings<'a>,
    /// Live lanes at the front of the group; the rest stay inactive.
    pub lane_count: usize,
}

/// A shader specialized against a descriptor layout. Cheap to share; the
/// cache hands out one instance per fingerprint.
pub struct Routine {
    shader: Arc<Shader>,
    bindings: FastHashMap<u32, BindingRef>,
}

impl Routine {
    /// Resolve every descriptor-backed object against the pipeline's
    /// layout. Binding offsets are computed here, once per compile, never
    /// per access.
    pub fn compile(shader: Arc<Shader>, layout: &DescriptorLayout) -> Result<Self, Error> {
        let mut bindings = FastHashMap::default();
        for (id, object) in shader.objects() {
            if !matches!(object.kind, ObjectKind::PhysicalPointer) {
                continue;
            }
            let d = shader.decorations_for(id.0);
            let (set, binding) = d
                .descriptor_set
                .zip(d.binding)
                .ok_or(Error::MissingBinding { id: id.0 })?;
            bindings.insert(id.0, layout.resolve(set, binding)?);
        }
        Ok(Self { shader, bindings })
    }

    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    /// Evaluate the shader for one lane group. Runs the whole
    /// prolog/body/epilog sequence to completion or fails fatally; there is
    /// no suspension or retry. Returns the lanes that finished without
    /// executing a discard.
    pub fn invoke(&self, invocation: &mut Invocation<'_>) -> Result<Lanes, Error> {
        Emitter::new(&self.shader, &self.bindings, invocation).run()
    }
}
