use assert2::assert;
use bon::bon;

use crate::geometry::{FloatType, Ray, WorldPoint, WorldVector};

/// Pinhole camera. The film basis is prescaled so that generating a ray
/// per pixel is a couple of multiply-adds.
#[derive(Copy, Clone, Debug)]
pub struct Camera {
    eye: WorldPoint,
    forward: WorldVector,
    horizontal: WorldVector,
    vertical: WorldVector,
    width: u32,
    height: u32,
}

#[bon]
impl Camera {
    /// `fov` is the vertical field of view in degrees.
    #[builder]
    pub fn new(
        eye: WorldPoint,
        lookat: WorldPoint,
        up: WorldVector,
        width: u32,
        height: u32,
        fov: FloatType,
    ) -> Self {
        assert!(width > 0);
        assert!(height > 0);
        assert!(fov > 0.0 && fov < 180.0);

        let scale = (fov.to_radians() / 2.0).tan();
        let aspect_ratio = width as FloatType / height as FloatType;

        let forward = (lookat - eye).normalize();
        let u = up.cross(&forward).normalize();
        let v = forward.cross(&u);

        Camera {
            eye,
            forward,
            horizontal: 2.0 * scale * aspect_ratio * u,
            vertical: 2.0 * scale * v,
            width,
            height,
        }
    }
}

impl Camera {
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Ray through the center of pixel (x, y), with y = 0 the top row.
    pub fn primary_ray(&self, x: u32, y: u32) -> Ray {
        let direction = self.forward + self.horizontal / 2.0 + self.vertical / 2.0
            - (x as FloatType + 0.5) / self.width as FloatType * self.horizontal
            - (y as FloatType + 0.5) / self.height as FloatType * self.vertical;
        Ray::new(self.eye, direction.normalize())
    }
}
