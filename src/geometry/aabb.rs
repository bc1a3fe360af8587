use std::ops::Add;

use crate::geometry::{FloatType, Ray, WorldPoint, WorldVector};

/// Axis-aligned bounding box.
///
/// The default value is the empty box (min = +inf, max = -inf), which acts
/// as the identity for the `+` union operators. Once a box holds anything,
/// `min <= max` componentwise.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: WorldPoint,
    pub max: WorldPoint,
}

impl Aabb {
    pub fn new(min: WorldPoint, max: WorldPoint) -> Aabb {
        Aabb { min, max }
    }

    pub fn centroid(&self) -> WorldPoint {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn diagonal(&self) -> WorldVector {
        self.max - self.min
    }

    /// Index of the axis along which the box is widest.
    pub fn largest_axis(&self) -> usize {
        let diagonal = self.diagonal();
        if diagonal[0] > diagonal[1] && diagonal[0] > diagonal[2] {
            0
        } else if diagonal[1] > diagonal[2] {
            1
        } else {
            2
        }
    }

    /// Slab test. The two plane distances per axis are ordered by
    /// min/max, so a zero direction component (whose quotients are
    /// infinite, or NaN on the slab boundary) still yields the correct
    /// interval for that axis.
    pub fn intersect(&self, ray: &Ray) -> bool {
        let mut enter = FloatType::NEG_INFINITY;
        let mut exit = FloatType::INFINITY;

        for axis in 0..3 {
            let t1 = (self.min[axis] - ray.origin[axis]) / ray.direction[axis];
            let t2 = (self.max[axis] - ray.origin[axis]) / ray.direction[axis];
            enter = enter.max(t1.min(t2));
            exit = exit.min(t1.max(t2));
        }

        enter < exit && exit >= 0.0
    }
}

impl Default for Aabb {
    fn default() -> Aabb {
        Aabb {
            min: WorldPoint::new(
                FloatType::INFINITY,
                FloatType::INFINITY,
                FloatType::INFINITY,
            ),
            max: WorldPoint::new(
                FloatType::NEG_INFINITY,
                FloatType::NEG_INFINITY,
                FloatType::NEG_INFINITY,
            ),
        }
    }
}

impl Add<Aabb> for Aabb {
    type Output = Aabb;

    fn add(self, other: Aabb) -> Aabb {
        Aabb {
            min: self.min.coords.inf(&other.min.coords).into(),
            max: self.max.coords.sup(&other.max.coords).into(),
        }
    }
}

impl Add<WorldPoint> for Aabb {
    type Output = Aabb;

    fn add(self, point: WorldPoint) -> Aabb {
        Aabb {
            min: self.min.coords.inf(&point.coords).into(),
            max: self.max.coords.sup(&point.coords).into(),
        }
    }
}
