//! Fixed-function pipeline state and the cache fingerprint built from it.
//! Everything that changes generated code belongs in [`PipelineState`]; two
//! draws with equal fingerprints are guaranteed to share a routine.

use std::hash::{Hash, Hasher};

pub const MAX_ATTACHMENTS: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AttachmentFormat {
    #[default]
    Rgba8,
    Bgra8,
    Rgba16f,
    Rgba32f,
    R32ui,
    Unused,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    #[default]
    Always,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    #[default]
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendOp {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub enable: bool,
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub op: BlendOp,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub test: bool,
    pub write: bool,
    pub compare: CompareOp,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StencilState {
    pub test: bool,
    pub compare: CompareOp,
    pub reference: u32,
    pub read_mask: u32,
    pub write_mask: u32,
}

/// The fixed-function state a routine is specialized against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineState {
    pub blend: BlendState,
    pub depth: DepthState,
    pub stencil: StencilState,
    pub attachments: [AttachmentFormat; MAX_ATTACHMENTS],
    pub sample_count: u32,
    pub descriptor_layout: u32,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            blend: BlendState::default(),
            depth: DepthState::default(),
            stencil: StencilState::default(),
            attachments: [AttachmentFormat::default(); MAX_ATTACHMENTS],
            sample_count: 1,
            descriptor_layout: 0,
        }
    }
}

/// Value-equality cache key: shader identity plus the full pipeline state,
/// with the hash precomputed once. Equal hashes with unequal keys are
/// possible in principle, which is why the cache always compares the full
/// key as well.
#[derive(Clone, Copy, Debug)]
pub struct Fingerprint {
    shader_serial: u32,
    state: PipelineState,
    hash: u64,
}

impl Fingerprint {
    pub fn new(shader_serial: u32, state: &PipelineState) -> Self {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        shader_serial.hash(&mut hasher);
        state.hash(&mut hasher);
        Self {
            shader_serial,
            state: *state,
            hash: hasher.finish(),
        }
    }

    pub fn hash64(&self) -> u64 {
        self.hash
    }

    pub fn shader_serial(&self) -> u32 {
        self.shader_serial
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.shader_serial == other.shader_serial && self.state == other.state
    }
}

impl Eq for Fingerprint {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_state_change_changes_the_fingerprint() {
        let base = PipelineState::default();
        let a = Fingerprint::new(1, &base);

        let mut blend = base;
        blend.blend.enable = true;
        let mut depth = base;
        depth.depth.compare = CompareOp::Less;
        let mut samples = base;
        samples.sample_count = 4;
        let mut layout = base;
        layout.descriptor_layout = 3;

        for other in [
            Fingerprint::new(2, &base),
            Fingerprint::new(1, &blend),
            Fingerprint::new(1, &depth),
            Fingerprint::new(1, &samples),
            Fingerprint::new(1, &layout),
        ] {
            assert_ne!(a, other);
        }

        assert_eq!(a, Fingerprint::new(1, &base));
        assert_eq!(a.hash64(), Fingerprint::new(1, &base).hash64());
    }
}
