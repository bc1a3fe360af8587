use rand::{SeedableRng, rngs::SmallRng};

use crate::integrator::path_radiance;
use crate::renderer::RenderSettings;
use crate::scene::Scene;
use crate::util::{BLACK, Radiance};

pub struct Worker {
    rng: SmallRng,
}

impl Worker {
    /// Each worker runs its own deterministic rng stream, derived from
    /// the render seed and the worker id.
    pub fn new(seed: u64, worker_id: usize) -> Worker {
        Worker {
            rng: SmallRng::seed_from_u64(
                seed.wrapping_add((worker_id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            ),
        }
    }

    /// Renders scanline `y`, returning per-pixel radiance sums over the
    /// configured sample count.
    pub fn render_row(
        &mut self,
        scene: &Scene,
        settings: &RenderSettings,
        y: u32,
    ) -> Vec<Radiance> {
        let (width, _) = scene.camera.resolution();
        (0..width)
            .map(|x| {
                let ray = scene.camera.primary_ray(x, y);
                let mut sum = BLACK;
                for _ in 0..settings.sample_count.get() {
                    sum += path_radiance(scene, &ray, &mut self.rng);
                }
                sum
            })
            .collect()
    }
}
