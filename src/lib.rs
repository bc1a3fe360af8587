mod camera;
pub mod geometry;
pub mod integrator;
mod renderer;
pub mod scene;
pub mod util;

pub use camera::Camera;
pub use renderer::{
    CheckpointError, CheckpointMeta, Framebuffer, RenderError, RenderProgress, RenderSettings,
    render, render_whitted,
};
pub use scene::{Scene, SceneError};
pub use util::Radiance;
