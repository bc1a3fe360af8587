use crate::geometry::{
    DENOMINATOR_EPSILON, FloatType, LIGHT_FIRST_EPSILON, Ray, SELF_CROSS_EPSILON, WorldVector,
    fresnel, reflect, refract,
};
use crate::scene::material::MIN_SPECULAR_EXPONENT;
use crate::scene::{MaterialKind, Scene};
use crate::util::{BLACK, Radiance, is_black, modulate};

/// Safety ceiling on the number of path vertices. Russian roulette at the
/// default continuation probability reaches this with probability under
/// 1e-6 per path.
const MAX_PATH_VERTICES: u32 = 64;

/// Whitted-style recursive ray cast: point lights, hard shadows, mirror
/// and dielectric recursion, no global illumination.
pub fn cast_ray(scene: &Scene, ray: &Ray, depth: u32) -> Radiance {
    cast_ray_from(scene, ray, depth, scene.epsilon)
}

fn cast_ray_from(scene: &Scene, ray: &Ray, depth: u32, t_min: FloatType) -> Radiance {
    if depth > scene.max_depth {
        return BLACK;
    }
    let Some(hit) = scene.intersect_from(ray, t_min) else {
        return scene.background;
    };

    let material = scene.material_at(&hit);
    let normal = scene.normal_at(&hit);
    let incoming = ray.direction.normalize();

    // Secondary rays leave their surface with the self-crossing epsilon
    // as the minimum hit distance.
    let recurse = |direction: WorldVector| {
        cast_ray_from(
            scene,
            &Ray::new(hit.point, direction),
            depth + 1,
            SELF_CROSS_EPSILON,
        )
    };

    match material.kind {
        MaterialKind::Reflection => {
            let kr = fresnel(&incoming, &normal, material.ior);
            recurse(reflect(&incoming, &normal).normalize()) * kr
        }
        MaterialKind::ReflectionRefraction => {
            let kr = fresnel(&incoming, &normal, material.ior);
            let mut radiance = recurse(reflect(&incoming, &normal).normalize()) * kr;

            let refracted = refract(&incoming, &normal, material.ior);
            if refracted != WorldVector::zeros() {
                radiance += modulate(
                    recurse(refracted.normalize()) * (1.0 - kr),
                    material.tr,
                );
            }
            radiance
        }
        MaterialKind::DiffuseGlossy
        | MaterialKind::DiffuseReflection
        | MaterialKind::DiffuseRefraction => {
            let mut light_amount = BLACK;
            let mut specular = BLACK;
            for light in &scene.point_lights {
                let to_light = light.position - hit.point;
                let distance = to_light.norm();
                let light_dir = to_light / distance;

                // Lit only if nothing sits closer than the light.
                let shadow_ray = Ray::new(hit.point, light_dir);
                let occluded = scene
                    .intersect_from(&shadow_ray, SELF_CROSS_EPSILON)
                    .is_some_and(|shadow_hit| shadow_hit.t < distance);
                if occluded {
                    continue;
                }

                light_amount += light.intensity * light_dir.dot(&normal).max(0.0);
                let mirrored = reflect(&(-light_dir), &normal);
                specular += light.intensity
                    * (-mirrored.dot(&incoming))
                        .max(0.0)
                        .powf(material.specular_exponent);
            }
            modulate(light_amount, material.kd) + modulate(specular, material.ks)
        }
    }
}

/// One path-traced radiance sample for the given primary ray.
///
/// The estimator is next event estimation at every diffuse vertex plus a
/// BRDF-sampled continuation under Russian roulette. Emissive surfaces
/// contribute only on the primary hit or through a specular chain; a
/// diffuse bounce landing on an emitter ends the path without
/// contributing, since NEE already accounted for that light.
pub fn path_radiance(scene: &Scene, primary: &Ray, rng: &mut impl rand::Rng) -> Radiance {
    let mut radiance = BLACK;
    let mut throughput = Radiance::new(1.0, 1.0, 1.0);
    let mut ray = *primary;
    let mut t_min = scene.epsilon;
    let mut via_specular = false;

    for vertex in 0..MAX_PATH_VERTICES {
        let Some(hit) = scene.intersect_from(&ray, t_min) else {
            break;
        };
        let material = *scene.material_at(&hit);
        let normal = scene.normal_at(&hit);
        let incoming = ray.direction;

        if material.is_emissive() {
            if vertex == 0 || via_specular {
                radiance += modulate(throughput, hit.emission);
            }
            break;
        }

        if !material.is_specular() {
            let (light, light_pdf) = scene.sample_light(rng);
            let to_light = light.point - hit.point;
            let distance = to_light.norm();
            let light_dir = to_light / distance;

            // The shadow ray runs from the light sample back to the
            // shading point; its first hit should be that point, give or
            // take the light-first tolerance.
            let shadow_ray = Ray::new(light.point, -light_dir);
            let occluded = scene
                .intersect_from(&shadow_ray, scene.epsilon)
                .is_some_and(|shadow_hit| shadow_hit.t < distance - LIGHT_FIRST_EPSILON);

            if !occluded {
                let cos_surface = normal.dot(&light_dir).max(0.0);
                let cos_light = light.normal.dot(&-light_dir).max(0.0);
                let geometry = cos_surface * cos_light
                    / (light_pdf * distance * distance).max(DENOMINATOR_EPSILON);

                let mut transfer = material.brdf(&normal, &incoming, &light_dir);
                if material.specular_exponent >= MIN_SPECULAR_EXPONENT {
                    transfer += material.phong_specular(&normal, &incoming, &light_dir);
                }
                radiance += modulate(throughput, modulate(light.emission, transfer)) * geometry;
            }
        }

        if rng.random::<f32>() >= scene.russian_roulette {
            break;
        }

        let outgoing = material.sample_direction(&normal, &incoming, rng);
        if outgoing == WorldVector::zeros() {
            // Total internal reflection with no reflection lobe drawn.
            break;
        }
        let pdf = material.pdf(&normal, &incoming, &outgoing);
        if pdf < DENOMINATOR_EPSILON {
            break;
        }
        let weight = material.brdf(&normal, &incoming, &outgoing)
            * (outgoing.dot(&normal).abs() / (pdf * scene.russian_roulette));
        throughput = modulate(throughput, weight);
        if is_black(throughput) {
            break;
        }

        via_specular = material.is_specular();
        ray = Ray::new(hit.point, outgoing);
        t_min = SELF_CROSS_EPSILON;
    }

    radiance
}
