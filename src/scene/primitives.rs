use rand_distr::UnitSphere;

use crate::geometry::{
    Aabb, DENOMINATOR_EPSILON, FloatType, Ray, TexturePoint, WorldPoint, WorldVector,
    solve_quadratic,
};

use super::MaterialIdx;

#[derive(Clone, Debug)]
pub struct Sphere {
    pub center: WorldPoint,
    pub radius: FloatType,
    pub material: MaterialIdx,
}

#[derive(Clone, Debug)]
pub struct Triangle {
    pub vertices: [WorldPoint; 3],
    /// Per-vertex shading normals. Falls back to the geometric normal.
    pub normals: Option<[WorldVector; 3]>,
    pub material: MaterialIdx,
}

/// Everything a scene can hold. Closed set, so intersection and sampling
/// dispatch exhaustively.
#[derive(Clone, Debug)]
pub enum Primitive {
    Sphere(Sphere),
    Triangle(Triangle),
}

impl Primitive {
    /// Distance along the ray to the first surface crossing past `t_min`,
    /// with the surface parameterization at the hit. Distances are in
    /// units of the ray direction's length.
    pub fn intersect(&self, ray: &Ray, t_min: FloatType) -> Option<(FloatType, TexturePoint)> {
        match self {
            Primitive::Sphere(sphere) => sphere.intersect(ray, t_min),
            Primitive::Triangle(triangle) => triangle.intersect(ray, t_min),
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            Primitive::Sphere(sphere) => {
                let r = WorldVector::repeat(sphere.radius);
                Aabb::new(sphere.center - r, sphere.center + r)
            }
            Primitive::Triangle(triangle) => {
                let [v0, v1, v2] = triangle.vertices;
                Aabb::default() + v0 + v1 + v2
            }
        }
    }

    pub fn area(&self) -> FloatType {
        match self {
            Primitive::Sphere(sphere) => {
                4.0 * std::f32::consts::PI * sphere.radius * sphere.radius
            }
            Primitive::Triangle(triangle) => {
                let e1 = triangle.vertices[1] - triangle.vertices[0];
                let e2 = triangle.vertices[2] - triangle.vertices[0];
                e1.cross(&e2).norm() * 0.5
            }
        }
    }

    /// Uniform area sample of the surface, with its outward normal.
    pub fn sample_point(&self, rng: &mut impl rand::Rng) -> (WorldPoint, WorldVector) {
        match self {
            Primitive::Sphere(sphere) => {
                let dir: [FloatType; 3] = rng.sample(UnitSphere);
                let normal = WorldVector::new(dir[0], dir[1], dir[2]);
                (sphere.center + sphere.radius * normal, normal)
            }
            Primitive::Triangle(triangle) => {
                let [v0, v1, v2] = triangle.vertices;
                let x = rng.random::<FloatType>().sqrt();
                let y = rng.random::<FloatType>();
                let point = (v0.coords * (1.0 - x)
                    + v1.coords * (x * (1.0 - y))
                    + v2.coords * (x * y))
                    .into();
                (point, triangle.geometric_normal())
            }
        }
    }

    pub fn normal_at(&self, point: &WorldPoint, uv: &TexturePoint) -> WorldVector {
        match self {
            Primitive::Sphere(sphere) => (point - sphere.center).normalize(),
            Primitive::Triangle(triangle) => match &triangle.normals {
                Some([n0, n1, n2]) => {
                    (n0 * (1.0 - uv.x - uv.y) + n1 * uv.x + n2 * uv.y).normalize()
                }
                None => triangle.geometric_normal(),
            },
        }
    }

    pub fn material(&self) -> MaterialIdx {
        match self {
            Primitive::Sphere(sphere) => sphere.material,
            Primitive::Triangle(triangle) => triangle.material,
        }
    }
}

impl Sphere {
    fn intersect(&self, ray: &Ray, t_min: FloatType) -> Option<(FloatType, TexturePoint)> {
        let oc = ray.origin - self.center;
        let a = ray.direction.dot(&ray.direction);
        let b = 2.0 * ray.direction.dot(&oc);
        let c = oc.dot(&oc) - self.radius * self.radius;
        let (t1, t2) = solve_quadratic(a, b, c)?;
        let t = if t1 > t_min {
            t1
        } else if t2 > t_min {
            t2
        } else {
            return None;
        };
        Some((t, TexturePoint::origin()))
    }
}

impl Triangle {
    pub fn new(vertices: [WorldPoint; 3], material: MaterialIdx) -> Triangle {
        Triangle {
            vertices,
            normals: None,
            material,
        }
    }

    pub fn geometric_normal(&self) -> WorldVector {
        let e1 = self.vertices[1] - self.vertices[0];
        let e2 = self.vertices[2] - self.vertices[0];
        e1.cross(&e2).normalize()
    }

    /// Möller-Trumbore. The returned texture point carries the (u, v)
    /// barycentric coordinates of the hit.
    fn intersect(&self, ray: &Ray, t_min: FloatType) -> Option<(FloatType, TexturePoint)> {
        let [v0, v1, v2] = self.vertices;
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let pvec = ray.direction.cross(&e2);
        let det = e1.dot(&pvec);
        if det.abs() < DENOMINATOR_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let tvec = ray.origin - v0;
        let u = tvec.dot(&pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let qvec = tvec.cross(&e1);
        let v = ray.direction.dot(&qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2.dot(&qvec) * inv_det;
        if t > t_min {
            Some((t, TexturePoint::new(u, v)))
        } else {
            None
        }
    }
}
