use crate::geometry::{
    DENOMINATOR_EPSILON, FloatType, UNIFORM_HEMISPHERE_PDF, WorldVector, fresnel, local_to_world,
    reflect, refract, uniform_hemisphere,
};
use crate::util::{BLACK, Radiance, WHITE, max_channel};

/// Probability of picking the specular lobe in the hybrid material kinds.
const LOBE_MIX: FloatType = 0.5;

/// Cosine tolerance when deciding whether an outgoing direction is the
/// deterministic specular one.
const SPECULAR_MATCH: FloatType = 1e-4;

/// Phong exponents below this would make the highlight term blow up the
/// direct-lighting estimate, so next event estimation skips them.
pub const MIN_SPECULAR_EXPONENT: FloatType = 1.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaterialKind {
    DiffuseGlossy,
    Reflection,
    ReflectionRefraction,
    DiffuseReflection,
    DiffuseRefraction,
}

#[derive(Copy, Clone, Debug)]
pub struct Material {
    pub kind: MaterialKind,
    pub emission: Radiance,
    pub kd: Radiance,
    pub ks: Radiance,
    /// Transmission tint for the refractive kinds.
    pub tr: Radiance,
    pub specular_exponent: FloatType,
    pub ior: FloatType,
}

impl Material {
    pub fn diffuse(kd: Radiance) -> Material {
        Material {
            kind: MaterialKind::DiffuseGlossy,
            emission: BLACK,
            kd,
            ks: Radiance::new(0.2, 0.2, 0.2),
            tr: WHITE,
            specular_exponent: 25.0,
            ior: 1.3,
        }
    }

    pub fn with_emission(mut self, emission: Radiance) -> Material {
        self.emission = emission;
        self
    }

    pub fn is_emissive(&self) -> bool {
        max_channel(self.emission) > DENOMINATOR_EPSILON
    }

    /// Kinds whose scattering is (at least partly) a delta lobe that area
    /// light sampling can never hit.
    pub fn is_specular(&self) -> bool {
        matches!(
            self.kind,
            MaterialKind::Reflection | MaterialKind::ReflectionRefraction
        )
    }

    /// Importance-samples an outgoing direction. `incoming` points toward
    /// the surface; the result points away from it (or is the zero vector
    /// when a refraction draw hits total internal reflection).
    pub fn sample_direction(
        &self,
        normal: &WorldVector,
        incoming: &WorldVector,
        rng: &mut impl rand::Rng,
    ) -> WorldVector {
        match self.kind {
            MaterialKind::DiffuseGlossy => {
                local_to_world(&uniform_hemisphere(rng), normal)
            }
            MaterialKind::Reflection => reflect(incoming, normal).normalize(),
            MaterialKind::ReflectionRefraction => {
                let kr = fresnel(incoming, normal, self.ior);
                if rng.random::<FloatType>() < kr {
                    reflect(incoming, normal).normalize()
                } else {
                    let refracted = refract(incoming, normal, self.ior);
                    if refracted == WorldVector::zeros() {
                        refracted
                    } else {
                        refracted.normalize()
                    }
                }
            }
            MaterialKind::DiffuseReflection => {
                if rng.random::<FloatType>() < LOBE_MIX {
                    reflect(incoming, normal).normalize()
                } else {
                    local_to_world(&uniform_hemisphere(rng), normal)
                }
            }
            MaterialKind::DiffuseRefraction => {
                if rng.random::<FloatType>() < LOBE_MIX {
                    let refracted = refract(incoming, normal, self.ior);
                    if refracted == WorldVector::zeros() {
                        refracted
                    } else {
                        refracted.normalize()
                    }
                } else {
                    local_to_world(&uniform_hemisphere(rng), normal)
                }
            }
        }
    }

    /// Probability density of `sample_direction` having produced
    /// `outgoing`. Delta lobes report their draw probability instead of a
    /// true density; the integrator divides by this, so the convention
    /// cancels.
    pub fn pdf(
        &self,
        normal: &WorldVector,
        incoming: &WorldVector,
        outgoing: &WorldVector,
    ) -> FloatType {
        match self.kind {
            MaterialKind::DiffuseGlossy => {
                if outgoing.dot(normal) > 0.0 {
                    UNIFORM_HEMISPHERE_PDF
                } else {
                    0.0
                }
            }
            MaterialKind::Reflection => {
                if is_reflection_side(normal, incoming, outgoing) {
                    1.0
                } else {
                    0.0
                }
            }
            MaterialKind::ReflectionRefraction => {
                let kr = fresnel(incoming, normal, self.ior);
                if is_reflection_side(normal, incoming, outgoing) {
                    kr
                } else {
                    1.0 - kr
                }
            }
            MaterialKind::DiffuseReflection => {
                if matches_direction(outgoing, &reflect(incoming, normal)) {
                    LOBE_MIX
                } else if outgoing.dot(normal) > 0.0 {
                    (1.0 - LOBE_MIX) * UNIFORM_HEMISPHERE_PDF
                } else {
                    0.0
                }
            }
            MaterialKind::DiffuseRefraction => {
                let refracted = refract(incoming, normal, self.ior);
                if refracted != WorldVector::zeros() && matches_direction(outgoing, &refracted) {
                    LOBE_MIX
                } else if outgoing.dot(normal) > 0.0 {
                    (1.0 - LOBE_MIX) * UNIFORM_HEMISPHERE_PDF
                } else {
                    0.0
                }
            }
        }
    }

    /// Scattering weight for the (incoming, outgoing) pair. Delta lobes
    /// return their Fresnel weight divided by the outgoing cosine so that
    /// the integrator's `brdf * cos / pdf` collapses to the intended
    /// throughput factor.
    pub fn brdf(
        &self,
        normal: &WorldVector,
        incoming: &WorldVector,
        outgoing: &WorldVector,
    ) -> Radiance {
        match self.kind {
            MaterialKind::DiffuseGlossy => self.lambertian(normal, outgoing),
            MaterialKind::Reflection => {
                if is_reflection_side(normal, incoming, outgoing) {
                    let kr = fresnel(incoming, normal, self.ior);
                    WHITE * (kr / outgoing.dot(normal).abs().max(DENOMINATOR_EPSILON))
                } else {
                    BLACK
                }
            }
            MaterialKind::ReflectionRefraction => {
                let kr = fresnel(incoming, normal, self.ior);
                let cos = outgoing.dot(normal).abs().max(DENOMINATOR_EPSILON);
                if is_reflection_side(normal, incoming, outgoing) {
                    WHITE * (kr / cos)
                } else {
                    self.tr * ((1.0 - kr) / cos)
                }
            }
            MaterialKind::DiffuseReflection => {
                if matches_direction(outgoing, &reflect(incoming, normal)) {
                    let kr = fresnel(incoming, normal, self.ior);
                    WHITE * (kr / outgoing.dot(normal).abs().max(DENOMINATOR_EPSILON))
                } else {
                    self.lambertian(normal, outgoing)
                }
            }
            MaterialKind::DiffuseRefraction => {
                let refracted = refract(incoming, normal, self.ior);
                if refracted != WorldVector::zeros() && matches_direction(outgoing, &refracted) {
                    let kr = fresnel(incoming, normal, self.ior);
                    let cos = outgoing.dot(normal).abs().max(DENOMINATOR_EPSILON);
                    self.tr * ((1.0 - kr) / cos)
                } else {
                    self.lambertian(normal, outgoing)
                }
            }
        }
    }

    fn lambertian(&self, normal: &WorldVector, outgoing: &WorldVector) -> Radiance {
        if outgoing.dot(normal) > 0.0 {
            self.kd / std::f32::consts::PI
        } else {
            BLACK
        }
    }

    /// Phong highlight used by the direct-lighting estimate. Callers gate
    /// this on `specular_exponent >= MIN_SPECULAR_EXPONENT`.
    pub fn phong_specular(
        &self,
        normal: &WorldVector,
        incoming: &WorldVector,
        outgoing: &WorldVector,
    ) -> Radiance {
        let mirrored = reflect(incoming, normal);
        let cos = mirrored.dot(outgoing).max(0.0);
        self.ks * cos.powf(self.specular_exponent)
    }
}

fn is_reflection_side(
    normal: &WorldVector,
    incoming: &WorldVector,
    outgoing: &WorldVector,
) -> bool {
    incoming.dot(normal) * outgoing.dot(normal) < 0.0
}

fn matches_direction(outgoing: &WorldVector, lobe: &WorldVector) -> bool {
    let norm = lobe.norm();
    norm > 0.0 && outgoing.dot(lobe) / norm > 1.0 - SPECULAR_MATCH
}

/// Cornell box palette.
pub mod presets {
    use super::*;

    pub fn red() -> Material {
        Material::diffuse(Radiance::new(0.63, 0.065, 0.05))
    }

    pub fn green() -> Material {
        Material::diffuse(Radiance::new(0.14, 0.45, 0.091))
    }

    pub fn white() -> Material {
        Material::diffuse(Radiance::new(0.725, 0.71, 0.68))
    }

    pub fn light() -> Material {
        let emission = Radiance::new(0.747 + 0.058, 0.747 + 0.258, 0.747) * 8.0
            + Radiance::new(0.740 + 0.287, 0.740 + 0.160, 0.740) * 15.6
            + Radiance::new(0.737 + 0.642, 0.737 + 0.159, 0.737) * 18.4;
        Material::diffuse(Radiance::new(0.65, 0.65, 0.65)).with_emission(emission)
    }

    pub fn mirror() -> Material {
        Material {
            kind: MaterialKind::Reflection,
            emission: BLACK,
            kd: Radiance::new(0.25, 0.3, 0.3),
            ks: Radiance::new(0.45, 0.45, 0.45),
            tr: WHITE,
            specular_exponent: 20.0,
            ior: 12.85,
        }
    }

    pub fn glass() -> Material {
        Material {
            kind: MaterialKind::ReflectionRefraction,
            emission: BLACK,
            kd: Radiance::new(0.25, 0.3, 0.3),
            ks: Radiance::new(0.45, 0.45, 0.45),
            tr: WHITE,
            specular_exponent: 10.0,
            ior: 12.85,
        }
    }

    pub fn by_name(name: &str) -> Option<Material> {
        match name {
            "red" => Some(red()),
            "green" => Some(green()),
            "white" => Some(white()),
            "light" => Some(light()),
            "mirror" => Some(mirror()),
            "glass" => Some(glass()),
            _ => None,
        }
    }
}
