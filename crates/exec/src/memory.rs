//! Bounds-clamped views over word-addressed storage. All descriptor and
//! resource arithmetic goes through these, so an out-of-range access at
//! execution time becomes a well-defined no-op (loads read zero, stores
//! drop) instead of memory corruption. Malformed addressing that is
//! detectable at compile time is rejected there instead.

use lanewise_core::Error;

/// Where one binding lives inside its descriptor set's word memory.
/// Resolved once per compile, never per access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindingRef {
    pub set: u32,
    pub offset: usize,
    pub len: usize,
}

/// Word extent of one binding inside a set's memory blob.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BindingInfo {
    pub offset: usize,
    pub len: usize,
}

/// The layout half of descriptor binding resolution: (set, binding) to a
/// word range. Supplied by the pipeline layer; the same layout is shared by
/// every draw that uses the pipeline.
#[derive(Clone, Debug, Default)]
pub struct DescriptorLayout {
    sets: Vec<Vec<BindingInfo>>,
}

impl DescriptorLayout {
    pub fn new(sets: Vec<Vec<BindingInfo>>) -> Self {
        Self { sets }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn binding(&self, set: u32, binding: u32) -> Option<BindingInfo> {
        self.sets
            .get(set as usize)
            .and_then(|bindings| bindings.get(binding as usize))
            .copied()
    }

    pub fn resolve(&self, set: u32, binding: u32) -> Result<BindingRef, Error> {
        let info = self
            .binding(set, binding)
            .ok_or(Error::UnknownBinding { set, binding })?;
        Ok(BindingRef {
            set,
            offset: info.offset,
            len: info.len,
        })
    }
}

/// One descriptor set's memory, read-only or writable. Storage-buffer
/// stores through a read-only set are dropped like any other out-of-range
/// store.
pub enum DescriptorSet<'a> {
    Read(&'a [u32]),
    ReadWrite(&'a mut [u32]),
}

impl DescriptorSet<'_> {
    fn words(&self) -> &[u32] {
        match self {
            DescriptorSet::Read(words) => words,
            DescriptorSet::ReadWrite(words) => words,
        }
    }
}

/// The memory half of descriptor binding resolution: per-set word blobs
/// bound for one invocation group.
pub struct DescriptorBindings<'a> {
    sets: Vec<DescriptorSet<'a>>,
}

impl<'a> DescriptorBindings<'a> {
    pub fn new(sets: Vec<DescriptorSet<'a>>) -> Self {
        Self { sets }
    }

    pub fn none() -> Self {
        Self { sets: Vec::new() }
    }

    /// Load one word from a binding; out-of-range reads zero.
    pub fn word(&self, binding: &BindingRef, index: usize) -> u32 {
        if index >= binding.len {
            return 0;
        }
        self.sets
            .get(binding.set as usize)
            .and_then(|set| set.words().get(binding.offset + index))
            .copied()
            .unwrap_or(0)
    }

    /// Store one word into a binding; out-of-range or read-only stores
    /// drop.
    pub fn set_word(&mut self, binding: &BindingRef, index: usize, value: u32) {
        if index >= binding.len {
            return;
        }
        if let Some(DescriptorSet::ReadWrite(words)) = self.sets.get_mut(binding.set as usize) {
            if let Some(slot) = words.get_mut(binding.offset + index) {
                *slot = value;
            }
        }
    }
}
