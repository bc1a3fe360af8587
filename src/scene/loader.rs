use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::camera::Camera;
use crate::geometry::{WorldPoint, WorldVector};
use crate::scene::{MaterialIdx, Primitive, Scene, Triangle, presets};
use crate::util::Radiance;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read scene file")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse OBJ geometry")]
    ObjError(#[from] wavefront_obj::ParseError),
    #[error("failed to parse scene description")]
    JsonError(#[from] serde_json::Error),
    #[error("scene references unknown material {0:?}")]
    UnknownMaterial(String),
}

/// On-disk scene description. The camera is mandatory; models reference
/// OBJ files relative to the description file and name one of the preset
/// materials. The lights table overrides the emitted radiance of every
/// model using that material.
#[derive(Debug, Deserialize)]
pub struct SceneDescription {
    pub camera: CameraDescription,
    #[serde(default)]
    pub models: Vec<ModelDescription>,
    #[serde(default)]
    pub lights: IndexMap<String, [f32; 3]>,
}

#[derive(Debug, Deserialize)]
pub struct CameraDescription {
    pub width: u32,
    pub height: u32,
    pub fovy: f32,
    pub eye: [f32; 3],
    pub lookat: [f32; 3],
    pub up: [f32; 3],
}

#[derive(Debug, Deserialize)]
pub struct ModelDescription {
    pub path: PathBuf,
    pub material: String,
}

impl CameraDescription {
    fn build(&self) -> Camera {
        Camera::builder()
            .eye(WorldPoint::from(self.eye))
            .lookat(WorldPoint::from(self.lookat))
            .up(WorldVector::from(self.up))
            .width(self.width)
            .height(self.height)
            .fov(self.fovy)
            .build()
    }
}

/// Loads a scene description and all geometry it references. The caller
/// still builds the BVH once the scene is final.
pub fn load_scene(path: &Path) -> Result<Scene, LoadError> {
    let description: SceneDescription = serde_json::from_str(&fs::read_to_string(path)?)?;
    let base = path.parent().unwrap_or(Path::new("."));

    let mut scene = Scene::new(description.camera.build());
    for model in &description.models {
        let mut material = presets::by_name(&model.material)
            .ok_or_else(|| LoadError::UnknownMaterial(model.material.clone()))?;
        if let Some(&[r, g, b]) = description.lights.get(&model.material) {
            material = material.with_emission(Radiance::new(r, g, b));
        }
        let material = scene.add_material(material);

        for triangle in load_obj_triangles(&base.join(&model.path), material)? {
            scene.add_primitive(Primitive::Triangle(triangle));
        }
    }
    Ok(scene)
}

/// Reads every triangle of an OBJ file, with per-vertex shading normals
/// where the file provides them.
pub fn load_obj_triangles(
    path: &Path,
    material: MaterialIdx,
) -> Result<Vec<Triangle>, LoadError> {
    let content = fs::read_to_string(path)?;
    let parsed = wavefront_obj::obj::parse(content)?;

    let mut triangles = Vec::new();
    for object in parsed.objects {
        for geometry in object.geometry {
            for shape in geometry.shapes {
                let wavefront_obj::obj::Primitive::Triangle(a, b, c) = shape.primitive else {
                    log::warn!("skipping non-triangle primitive in {}", path.display());
                    continue;
                };

                let corner = |(vertex, _tex, normal): (usize, Option<usize>, Option<usize>)| {
                    let v = &object.vertices[vertex];
                    let position = WorldPoint::new(v.x as f32, v.y as f32, v.z as f32);
                    let normal = normal.map(|i| {
                        let n = &object.normals[i];
                        WorldVector::new(n.x as f32, n.y as f32, n.z as f32).normalize()
                    });
                    (position, normal)
                };

                let [(p0, n0), (p1, n1), (p2, n2)] = [corner(a), corner(b), corner(c)];
                let mut triangle = Triangle::new([p0, p1, p2], material);
                if let (Some(n0), Some(n1), Some(n2)) = (n0, n1, n2) {
                    triangle.normals = Some([n0, n1, n2]);
                }
                triangles.push(triangle);
            }
        }
    }
    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    const UNIT_QUAD_OBJ: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
f 1//1 2//1 3//1
f 1//1 3//1 4//1
";

    fn temp_scene_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("zoetrace_loader_{tag}_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn description_parses_from_json() {
        let description: SceneDescription = serde_json::from_str(
            r#"{
                "camera": {
                    "width": 784, "height": 784, "fovy": 40.0,
                    "eye": [275.0, 275.0, -800.0],
                    "lookat": [275.0, 275.0, 0.0],
                    "up": [0.0, 1.0, 0.0]
                },
                "models": [
                    {"path": "walls.obj", "material": "white"},
                    {"path": "panel.obj", "material": "light"}
                ],
                "lights": {"light": [47.8, 38.6, 31.1]}
            }"#,
        )
        .unwrap();
        assert!(description.camera.width == 784);
        assert!(description.models.len() == 2);
        assert!(description.lights["light"] == [47.8, 38.6, 31.1]);
    }

    #[test]
    fn obj_triangles_carry_normals() {
        let dir = temp_scene_dir("obj");
        let obj_path = dir.join("quad.obj");
        fs::write(&obj_path, UNIT_QUAD_OBJ).unwrap();

        let triangles = load_obj_triangles(&obj_path, MaterialIdx::new(0)).unwrap();
        assert!(triangles.len() == 2);
        for triangle in &triangles {
            let normals = triangle.normals.unwrap();
            for n in normals {
                assert!((n - WorldVector::new(0.0, 0.0, 1.0)).norm() < 1e-6);
            }
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn scene_load_applies_emission_override() {
        let dir = temp_scene_dir("scene");
        fs::write(dir.join("quad.obj"), UNIT_QUAD_OBJ).unwrap();
        fs::write(
            dir.join("scene.json"),
            r#"{
                "camera": {
                    "width": 32, "height": 32, "fovy": 40.0,
                    "eye": [0.5, 0.5, -3.0],
                    "lookat": [0.5, 0.5, 0.0],
                    "up": [0.0, 1.0, 0.0]
                },
                "models": [{"path": "quad.obj", "material": "white"}],
                "lights": {"white": [10.0, 20.0, 30.0]}
            }"#,
        )
        .unwrap();

        let scene = load_scene(&dir.join("scene.json")).unwrap();
        assert!(scene.primitive_count() == 2);
        assert!(scene.camera.resolution() == (32, 32));
        // Both triangles are emissive through the override, so the quad's
        // full area counts.
        assert!((scene.total_emissive_area() - 1.0).abs() < 1e-5);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unknown_material_is_an_error() {
        let dir = temp_scene_dir("badmat");
        fs::write(dir.join("quad.obj"), UNIT_QUAD_OBJ).unwrap();
        fs::write(
            dir.join("scene.json"),
            r#"{
                "camera": {
                    "width": 8, "height": 8, "fovy": 40.0,
                    "eye": [0.0, 0.0, -1.0],
                    "lookat": [0.0, 0.0, 0.0],
                    "up": [0.0, 1.0, 0.0]
                },
                "models": [{"path": "quad.obj", "material": "chrome"}]
            }"#,
        )
        .unwrap();

        let result = load_scene(&dir.join("scene.json"));
        assert!(matches!(result, Err(LoadError::UnknownMaterial(name)) if name == "chrome"));

        let _ = fs::remove_dir_all(&dir);
    }
}
