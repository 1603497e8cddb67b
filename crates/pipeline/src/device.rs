//! The device: shader registry, descriptor layouts, the routine cache and
//! the worker pool, tied together by `draw`.

use crate::cache::RoutineCache;
use crate::dispatch::{dispatch_batches, LaneBatch};
use crate::state::{Fingerprint, PipelineState};
use crate::util::ThreadPool;
use bumpalo::Bump;
use lanewise_core::{Error, Shader};
use lanewise_exec::{DescriptorLayout, Routine};
use slotmap::{DefaultKey, Key, KeyData, SlotMap};
use std::sync::Arc;

/// Opaque handle to a registered shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderHandle(u64);

/// Default bound on resident compiled routines.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

pub struct Device {
    shaders: SlotMap<DefaultKey, Arc<Shader>>,
    layouts: Vec<DescriptorLayout>,
    cache: RoutineCache<Routine>,
    pool: ThreadPool,
    arena: Bump,
}

impl Device {
    pub fn new() -> Self {
        Self::with_config(ThreadPool::new(), DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_config(pool: ThreadPool, cache_capacity: usize) -> Self {
        Self {
            shaders: SlotMap::new(),
            // layout id 0 is the empty layout, for pipelines without
            // descriptors
            layouts: vec![DescriptorLayout::empty()],
            cache: RoutineCache::new(cache_capacity),
            pool,
            arena: Bump::new(),
        }
    }

    /// Analyze a binary module and register it. The heavy per-state
    /// specialization happens lazily at first draw, through the cache.
    pub fn create_shader(&mut self, words: impl Into<Box<[u32]>>) -> Result<ShaderHandle, Error> {
        let shader = Arc::new(Shader::parse(words)?);
        let key = self.shaders.insert(shader);
        Ok(ShaderHandle(key.data().as_ffi()))
    }

    pub fn delete_shader(&mut self, handle: ShaderHandle) -> bool {
        self.shaders
            .remove(KeyData::from_ffi(handle.0).into())
            .is_some()
    }

    pub fn shader(&self, handle: ShaderHandle) -> &Arc<Shader> {
        self.shaders
            .get(KeyData::from_ffi(handle.0).into())
            .expect("unknown shader handle")
    }

    /// Register a descriptor layout; the returned id goes into
    /// [`PipelineState::descriptor_layout`].
    pub fn create_layout(&mut self, layout: DescriptorLayout) -> u32 {
        self.layouts.push(layout);
        (self.layouts.len() - 1) as u32
    }

    pub fn cached_routines(&self) -> usize {
        self.cache.len()
    }

    /// Execute one draw or dispatch: fetch (or compile) the routine for
    /// this shader and pipeline state, then fan the batches out across the
    /// worker pool.
    pub fn draw(
        &mut self,
        handle: ShaderHandle,
        state: &PipelineState,
        descriptor_sets: &[&[u32]],
        batches: &mut [LaneBatch],
    ) -> Result<(), Error> {
        let shader = self
            .shaders
            .get(KeyData::from_ffi(handle.0).into())
            .expect("unknown shader handle")
            .clone();
        let layout = self
            .layouts
            .get(state.descriptor_layout as usize)
            .expect("unknown descriptor layout");

        let fingerprint = Fingerprint::new(shader.serial(), state);
        let routine = self
            .cache
            .get_or_compile(&fingerprint, || Routine::compile(shader, layout))?;

        let result = dispatch_batches(
            &mut self.pool,
            &self.arena,
            &routine,
            descriptor_sets,
            batches,
        );
        self.arena.reset();
        result
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}
