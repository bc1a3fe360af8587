use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::integrator::cast_ray;
use crate::renderer::{Framebuffer, RenderSettings, worker::Worker};
use crate::scene::{Scene, SceneError};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("framebuffer is {fb_width}x{fb_height}, camera renders {width}x{height}")]
    ResolutionMismatch {
        width: u32,
        height: u32,
        fb_width: u32,
        fb_height: u32,
    },
    #[error("failed to spawn worker thread")]
    Spawn(#[from] std::io::Error),
}

/// Starts a path-traced render of the scene into the framebuffer,
/// accumulating `settings.sample_count` samples per pixel on top of
/// whatever the buffer already holds. Returns immediately; the render
/// runs on its own worker threads.
pub fn render(
    scene: Scene,
    settings: RenderSettings,
    framebuffer: Framebuffer,
) -> Result<RenderProgress, RenderError> {
    scene.validate_for_path_tracing()?;
    let (width, height) = scene.camera.resolution();
    if (framebuffer.width(), framebuffer.height()) != (width, height) {
        return Err(RenderError::ResolutionMismatch {
            width,
            height,
            fb_width: framebuffer.width(),
            fb_height: framebuffer.height(),
        });
    }

    let state = Arc::new(RenderState {
        scene,
        settings,
        framebuffer: Mutex::new(framebuffer),
        next_row: AtomicUsize::new(0),
        finished_rows: AtomicUsize::new(0),
    });

    let worker_count = settings.worker_count.unwrap_or_else(num_cpus::get).max(1);
    let threads = (0..worker_count)
        .map(|worker_id| {
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name(format!("worker{worker_id}"))
                .spawn(move || {
                    let mut worker = Worker::new(state.settings.seed, worker_id);
                    while let Some(y) = state.get_next_row() {
                        let row = worker.render_row(&state.scene, &state.settings, y);
                        state
                            .framebuffer
                            .lock()
                            .expect("Poisoned lock!")
                            .merge_row(y, &row);
                        state.finished_rows.fetch_add(1, Ordering::AcqRel);
                    }
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RenderProgress { state, threads })
}

pub struct RenderProgress {
    state: Arc<RenderState>,
    threads: Vec<JoinHandle<()>>,
}

impl RenderProgress {
    /// Number of finished and total scanlines.
    pub fn progress(&self) -> (usize, usize) {
        let total = self.state.scene.camera.resolution().1 as usize;
        let finished = self.state.finished_rows.load(Ordering::Acquire).min(total);
        (finished, total)
    }

    pub fn is_finished(&self) -> bool {
        self.threads.iter().all(|handle| handle.is_finished())
    }

    /// Signal the workers to stop. Rows already being rendered still
    /// finish; no new ones are started. Rows that were never scheduled
    /// hold no samples, so an aborted render is a preview only and its
    /// saved image must not be reused as a resume checkpoint.
    pub fn abort(&self) {
        let total = self.state.scene.camera.resolution().1 as usize;
        self.state.next_row.store(total, Ordering::Release);
    }

    /// Wait for the workers to finish.
    pub fn wait(&mut self) {
        self.threads
            .drain(..)
            .for_each(|handle| handle.join().expect("Worker thread panicked"));
    }

    /// Blocks until all workers are done and hands the accumulated
    /// framebuffer back, with this pass's sample count folded in. The
    /// count covers every row only when the render ran to completion;
    /// after `abort` the buffer is not checkpoint material.
    pub fn into_framebuffer(mut self) -> Framebuffer {
        self.wait();

        let state = Arc::try_unwrap(self.state)
            .unwrap_or_else(|_| unreachable!("all worker clones have been joined"));
        let mut framebuffer = state.framebuffer.into_inner().expect("Poisoned lock!");
        framebuffer.add_samples(state.settings.sample_count.get());
        framebuffer
    }
}

struct RenderState {
    scene: Scene,
    settings: RenderSettings,
    framebuffer: Mutex<Framebuffer>,
    next_row: AtomicUsize,
    finished_rows: AtomicUsize,
}

impl RenderState {
    fn get_next_row(&self) -> Option<u32> {
        let y = self.next_row.fetch_add(1, Ordering::AcqRel);
        if y < self.scene.camera.resolution().1 as usize {
            Some(y as u32)
        } else {
            None
        }
    }
}

/// Single-pass Whitted render, one primary ray per pixel. Kept as the
/// fast preview next to the path tracer.
pub fn render_whitted(scene: &Scene) -> Framebuffer {
    let (width, height) = scene.camera.resolution();
    let mut framebuffer = Framebuffer::new(width, height);
    for y in 0..height {
        let row: Vec<_> = (0..width)
            .map(|x| cast_ray(scene, &scene.camera.primary_ray(x, y), 0))
            .collect();
        framebuffer.merge_row(y, &row);
    }
    framebuffer.add_samples(1);
    framebuffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use std::num::NonZeroU32;

    fn settings(spp: u32, workers: usize, seed: u64) -> RenderSettings {
        RenderSettings {
            sample_count: NonZeroU32::new(spp).unwrap(),
            worker_count: Some(workers),
            seed,
        }
    }

    #[test]
    fn renders_the_cornell_box() {
        let mut scene = Scene::cornell_box(16, 16);
        scene.build_bvh();
        let progress = render(scene, settings(4, 2, 1), Framebuffer::new(16, 16)).unwrap();
        let framebuffer = progress.into_framebuffer();

        assert!(framebuffer.samples() == 4);
        // The ceiling panel is in view, so some pixel must be lit.
        let lit = (0..16)
            .flat_map(|y| (0..16).map(move |x| (x, y)))
            .any(|(x, y)| framebuffer.mean_pixel(x, y).r > 0.0);
        assert!(lit);
    }

    #[test]
    fn single_worker_render_is_deterministic() {
        let run = || {
            let mut scene = Scene::cornell_box(8, 8);
            scene.build_bvh();
            let progress = render(scene, settings(2, 1, 42), Framebuffer::new(8, 8)).unwrap();
            progress.into_framebuffer()
        };
        let a = run();
        let b = run();
        for y in 0..8 {
            for x in 0..8 {
                assert!(a.mean_pixel(x, y) == b.mean_pixel(x, y));
            }
        }
    }

    #[test]
    fn unvalidated_scene_is_rejected() {
        let scene = Scene::cornell_box(8, 8);
        let result = render(scene, settings(1, 1, 0), Framebuffer::new(8, 8));
        assert!(matches!(
            result,
            Err(RenderError::Scene(SceneError::BvhNotBuilt))
        ));
    }

    #[test]
    fn framebuffer_resolution_must_match() {
        let mut scene = Scene::cornell_box(8, 8);
        scene.build_bvh();
        let result = render(scene, settings(1, 1, 0), Framebuffer::new(16, 16));
        assert!(matches!(
            result,
            Err(RenderError::ResolutionMismatch { .. })
        ));
    }

    #[test]
    fn progress_reaches_completion() {
        let mut scene = Scene::cornell_box(8, 8);
        scene.build_bvh();
        let mut progress = render(scene, settings(1, 2, 5), Framebuffer::new(8, 8)).unwrap();
        progress.wait();
        assert!(progress.is_finished());
        assert!(progress.progress() == (8, 8));
    }

    #[test]
    fn abort_stops_scheduling_and_keeps_the_pass_count() {
        let mut scene = Scene::cornell_box(16, 16);
        scene.build_bvh();
        let mut progress = render(scene, settings(1, 1, 3), Framebuffer::new(16, 16)).unwrap();
        progress.abort();
        progress.wait();
        assert!(progress.is_finished());
        let (finished, total) = progress.progress();
        assert!(finished <= total);

        // The folded count still claims the whole pass; the docs call an
        // aborted buffer a preview, not a checkpoint.
        let framebuffer = progress.into_framebuffer();
        assert!(framebuffer.samples() == 1);
    }

    #[test]
    fn whitted_preview_shades_the_walls() {
        use crate::geometry::WorldPoint;
        use crate::scene::PointLight;
        use crate::util::Radiance;

        let mut scene = Scene::cornell_box(8, 8);
        scene.add_point_light(PointLight {
            position: WorldPoint::new(275.0, 400.0, 275.0),
            intensity: Radiance::new(1.0, 1.0, 1.0),
        });
        scene.build_bvh();
        let framebuffer = render_whitted(&scene);
        assert!(framebuffer.samples() == 1);
        // The walls face the point light, so the preview is not black.
        let lit = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .any(|(x, y)| crate::util::max_channel(framebuffer.mean_pixel(x, y)) > 0.0);
        assert!(lit);
    }
}
