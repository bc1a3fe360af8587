mod aabb;
mod optics;

pub use aabb::Aabb;
pub use optics::{
    UNIFORM_HEMISPHERE_PDF, fresnel, local_to_world, reflect, refract, uniform_hemisphere,
};

pub type FloatType = f32;

pub type WorldPoint = nalgebra::Point3<FloatType>;
pub type WorldVector = nalgebra::Vector3<FloatType>;
pub type TexturePoint = nalgebra::Point2<FloatType>;

/// Distance below which a secondary ray's hit is treated as the ray
/// re-leaving its own surface.
pub const SELF_CROSS_EPSILON: FloatType = 0.01;

/// Tolerance when matching a shadow ray's hit distance against the
/// distance to the sampled light point, whose surface is expected to be
/// the first thing the shadow ray meets.
pub const LIGHT_FIRST_EPSILON: FloatType = 0.01;

/// Guard for near-zero denominators (parallel ray/triangle, vanishing pdf).
pub const DENOMINATOR_EPSILON: FloatType = 1e-5;

#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: WorldPoint,

    /// Direction of the ray. Not required to be unit length; all distances
    /// reported for this ray are in units of this direction's scale.
    pub direction: WorldVector,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        Ray { origin, direction }
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction * distance
    }
}

/// Solves `a x^2 + b x + c = 0`, returning the roots in ascending order.
///
/// Uses the `q = -(b ± sqrt(discr)) / 2` form so that catastrophic
/// cancellation is avoided when `b` changes sign.
pub fn solve_quadratic(
    a: FloatType,
    b: FloatType,
    c: FloatType,
) -> Option<(FloatType, FloatType)> {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    if discriminant == 0.0 {
        let x = -0.5 * b / a;
        return Some((x, x));
    }

    let q = if b > 0.0 {
        -0.5 * (b + discriminant.sqrt())
    } else {
        -0.5 * (b - discriminant.sqrt())
    };
    let x1 = q / a;
    let x2 = c / q;
    if x1 < x2 { Some((x1, x2)) } else { Some((x2, x1)) }
}
