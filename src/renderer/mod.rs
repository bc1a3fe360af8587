mod framebuffer;
mod machinery;
mod worker;

pub use framebuffer::{CheckpointError, CheckpointMeta, Framebuffer};
pub use machinery::{RenderError, RenderProgress, render, render_whitted};

#[derive(Copy, Clone, Debug)]
pub struct RenderSettings {
    /// Path samples per pixel for this pass.
    pub sample_count: std::num::NonZeroU32,
    /// Worker threads; defaults to the number of logical CPUs.
    pub worker_count: Option<usize>,
    /// Base seed for the per-worker rng streams.
    pub seed: u64,
}
