//! Pipeline-level glue around the lanewise compiler core: fixed-function
//! state records, the fingerprint-keyed routine cache, and a device that
//! dispatches lane-group batches across a worker pool.

mod cache;
mod device;
mod dispatch;
mod state;
mod util;

pub use cache::RoutineCache;
pub use device::{Device, ShaderHandle, DEFAULT_CACHE_CAPACITY};
pub use dispatch::LaneBatch;
pub use state::{
    AttachmentFormat, BlendFactor, BlendOp, BlendState, CompareOp, DepthState, Fingerprint,
    PipelineState, StencilState, MAX_ATTACHMENTS,
};
pub use util::ThreadPool;
