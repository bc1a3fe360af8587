pub mod bvh;
pub mod loader;
pub mod material;
pub mod primitives;

use index_vec::IndexVec;
use thiserror::Error;

use crate::camera::Camera;
use crate::geometry::{FloatType, Ray, TexturePoint, WorldPoint, WorldVector};
use crate::util::{BLACK, Radiance};

pub use bvh::Bvh;
pub use material::{Material, MaterialKind, presets};
pub use primitives::{Primitive, Sphere, Triangle};

index_vec::define_index_type! {
    pub struct PrimitiveIdx = u32;
}

index_vec::define_index_type! {
    pub struct MaterialIdx = u32;
}

/// Point light used by the Whitted integrator only; the path tracer
/// samples emissive geometry instead.
#[derive(Copy, Clone, Debug)]
pub struct PointLight {
    pub position: WorldPoint,
    pub intensity: Radiance,
}

#[derive(Copy, Clone, Debug)]
pub struct Hit {
    /// Distance in units of the query ray's direction length.
    pub t: FloatType,
    pub uv: TexturePoint,
    pub primitive: PrimitiveIdx,
    pub point: WorldPoint,
    pub emission: Radiance,
}

/// A point drawn on an emissive surface.
#[derive(Copy, Clone, Debug)]
pub struct LightSample {
    pub point: WorldPoint,
    pub normal: WorldVector,
    pub emission: Radiance,
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene has no emissive surface to sample")]
    NoEmissiveArea,
    #[error("acceleration structure was not built before rendering")]
    BvhNotBuilt,
}

pub struct Scene {
    materials: IndexVec<MaterialIdx, Material>,
    primitives: IndexVec<PrimitiveIdx, Primitive>,
    pub point_lights: Vec<PointLight>,
    /// Maintained incrementally as primitives are added.
    total_emissive_area: FloatType,
    bvh: Option<Bvh>,

    pub camera: Camera,
    pub background: Radiance,
    pub max_depth: u32,
    /// Minimum hit distance for rays cast by the integrators.
    pub epsilon: FloatType,
    pub russian_roulette: FloatType,
}

impl Scene {
    pub fn new(camera: Camera) -> Scene {
        Scene {
            materials: IndexVec::new(),
            primitives: IndexVec::new(),
            point_lights: Vec::new(),
            total_emissive_area: 0.0,
            bvh: None,
            camera,
            background: Radiance::new(0.235294, 0.67451, 0.843137),
            max_depth: 5,
            epsilon: 1e-5,
            russian_roulette: 0.8,
        }
    }

    pub fn add_material(&mut self, material: Material) -> MaterialIdx {
        self.materials.push(material)
    }

    pub fn material(&self, idx: MaterialIdx) -> &Material {
        &self.materials[idx]
    }

    pub fn add_primitive(&mut self, primitive: Primitive) -> PrimitiveIdx {
        assert!(
            self.bvh.is_none(),
            "primitives cannot be added after build_bvh"
        );
        if self.materials[primitive.material()].is_emissive() {
            self.total_emissive_area += primitive.area();
        }
        self.primitives.push(primitive)
    }

    pub fn add_point_light(&mut self, light: PointLight) {
        self.point_lights.push(light);
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Builds the acceleration structure. Called exactly once, after all
    /// primitives have been added.
    pub fn build_bvh(&mut self) {
        assert!(self.bvh.is_none(), "build_bvh may only be called once");
        self.bvh = Some(Bvh::build(&self.primitives));
    }

    pub fn has_bvh(&self) -> bool {
        self.bvh.is_some()
    }

    pub fn total_emissive_area(&self) -> FloatType {
        self.total_emissive_area
    }

    /// Preconditions of the path-tracing render phase.
    pub fn validate_for_path_tracing(&self) -> Result<(), SceneError> {
        if self.bvh.is_none() {
            return Err(SceneError::BvhNotBuilt);
        }
        if self.total_emissive_area <= 0.0 {
            return Err(SceneError::NoEmissiveArea);
        }
        Ok(())
    }

    /// Nearest surface crossing past the scene epsilon.
    pub fn intersect(&self, ray: &Ray) -> Option<Hit> {
        self.intersect_from(ray, self.epsilon)
    }

    /// Nearest surface crossing past `t_min`, in units of the ray
    /// direction's length.
    pub fn intersect_from(&self, ray: &Ray, t_min: FloatType) -> Option<Hit> {
        let raw = match &self.bvh {
            Some(bvh) => bvh.intersect(&self.primitives, ray, t_min),
            None => self.intersect_linear(ray, t_min),
        };
        raw.map(|(t, uv, primitive)| Hit {
            t,
            uv,
            primitive,
            point: ray.point_at(t),
            emission: self.materials[self.primitives[primitive].material()].emission,
        })
    }

    fn intersect_linear(
        &self,
        ray: &Ray,
        t_min: FloatType,
    ) -> Option<(FloatType, TexturePoint, PrimitiveIdx)> {
        self.primitives
            .iter_enumerated()
            .filter_map(|(idx, primitive)| {
                primitive.intersect(ray, t_min).map(|(t, uv)| (t, uv, idx))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    pub fn normal_at(&self, hit: &Hit) -> WorldVector {
        self.primitives[hit.primitive].normal_at(&hit.point, &hit.uv)
    }

    pub fn material_at(&self, hit: &Hit) -> &Material {
        &self.materials[self.primitives[hit.primitive].material()]
    }

    /// Draws a point on an emissive surface with probability proportional
    /// to its area. The pdf is 1 / total emissive area.
    ///
    /// Callers must have validated the scene; an empty emissive set here
    /// is a programming error.
    pub fn sample_light(&self, rng: &mut impl rand::Rng) -> (LightSample, FloatType) {
        assert!(self.total_emissive_area > 0.0);
        let threshold = rng.random::<FloatType>() * self.total_emissive_area;

        let mut accumulated = 0.0;
        let mut chosen = None;
        for primitive in &self.primitives {
            let material = &self.materials[primitive.material()];
            if !material.is_emissive() {
                continue;
            }
            chosen = Some((primitive, material));
            accumulated += primitive.area();
            if accumulated >= threshold {
                break;
            }
        }

        // The cumulative scan covers the whole emissive area, so some
        // emissive primitive was selected.
        let (primitive, material) = match chosen {
            Some(found) => found,
            None => unreachable!(),
        };
        let (point, normal) = primitive.sample_point(rng);
        let sample = LightSample {
            point,
            normal,
            emission: material.emission,
        };
        (sample, 1.0 / self.total_emissive_area)
    }

    /// The classic closed box: white floor, ceiling and back wall, red
    /// left wall, green right wall, area light in the ceiling.
    pub fn cornell_box(width: u32, height: u32) -> Scene {
        let camera = Camera::builder()
            .eye(WorldPoint::new(275.0, 275.0, -800.0))
            .lookat(WorldPoint::new(275.0, 275.0, 0.0))
            .up(WorldVector::new(0.0, 1.0, 0.0))
            .width(width)
            .height(height)
            .fov(40.0)
            .build();
        let mut scene = Scene::new(camera);
        scene.background = BLACK;

        let red = scene.add_material(presets::red());
        let green = scene.add_material(presets::green());
        let white = scene.add_material(presets::white());
        let light = scene.add_material(presets::light());

        let mut quad = |p0: [f32; 3], p1: [f32; 3], p2: [f32; 3], p3: [f32; 3], material| {
            let [p0, p1, p2, p3] = [p0, p1, p2, p3].map(WorldPoint::from);
            scene.add_primitive(Primitive::Triangle(Triangle::new([p0, p1, p2], material)));
            scene.add_primitive(Primitive::Triangle(Triangle::new([p0, p2, p3], material)));
        };

        // Windings chosen so the geometric normals point into the room.
        let s = 550.0;
        quad([0.0, 0.0, 0.0], [0.0, 0.0, s], [s, 0.0, s], [s, 0.0, 0.0], white); // floor
        quad([0.0, s, 0.0], [s, s, 0.0], [s, s, s], [0.0, s, s], white); // ceiling
        quad([0.0, 0.0, s], [0.0, s, s], [s, s, s], [s, 0.0, s], white); // back wall
        quad([0.0, 0.0, 0.0], [0.0, s, 0.0], [0.0, s, s], [0.0, 0.0, s], red); // left wall
        quad([s, 0.0, 0.0], [s, 0.0, s], [s, s, s], [s, s, 0.0], green); // right wall
        quad(
            [185.0, 548.8, 185.0],
            [365.0, 548.8, 185.0],
            [365.0, 548.8, 365.0],
            [185.0, 548.8, 365.0],
            light,
        );

        scene
    }
}
