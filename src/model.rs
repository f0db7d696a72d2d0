//! OBJ model loading.

use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use log::{debug, info, warn};

use crate::assets::AssetError;

/// Interleaved vertex layout shared by every model, the ground plane included.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Texture roles a material can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Diffuse,
    Specular,
    Normal,
}

impl TextureKind {
    /// Slot name in the shader's material naming scheme, e.g.
    /// `material.texture_diffuse1`. `index` counts from one per kind.
    pub fn slot_name(self, prefix: &str, index: usize) -> String {
        let kind = match self {
            Self::Diffuse => "diffuse",
            Self::Specular => "specular",
            Self::Normal => "normal",
        };
        format!("{prefix}texture_{kind}{index}")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialData {
    pub name: String,
    pub diffuse_color: [f32; 3],
    pub diffuse_texture: Option<PathBuf>,
    pub specular_texture: Option<PathBuf>,
    pub normal_texture: Option<PathBuf>,
}

impl MaterialData {
    pub fn texture(&self, kind: TextureKind) -> Option<&Path> {
        match kind {
            TextureKind::Diffuse => self.diffuse_texture.as_deref(),
            TextureKind::Specular => self.specular_texture.as_deref(),
            TextureKind::Normal => self.normal_texture.as_deref(),
        }
    }

    /// GPU label for this material's `kind` texture, e.g.
    /// `grass/material.texture_diffuse1`.
    pub fn slot_label(&self, kind: TextureKind, prefix: &str) -> String {
        format!("{}/{}", self.name, kind.slot_name(prefix, 1))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

/// Geometry and material references of one model file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelData {
    pub label: String,
    pub texture_prefix: String,
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
}

impl ModelData {
    /// Loads an OBJ file and its material library.
    ///
    /// `texture_prefix` must match the naming the model shader uses for its
    /// material textures; it is carried into every texture slot name.
    pub fn load(path: impl AsRef<Path>, texture_prefix: &str) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|source| AssetError::Obj {
            path: path.to_path_buf(),
            source,
        })?;

        let materials = materials.unwrap_or_else(|err| {
            warn!("{}: material library unavailable: {err}", path.display());
            Vec::new()
        });
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let materials = materials
            .into_iter()
            .map(|material| convert_material(material, base))
            .collect();
        let meshes: Vec<MeshData> = models.into_iter().map(convert_mesh).collect();

        let model = Self {
            label: path.display().to_string(),
            texture_prefix: texture_prefix.to_string(),
            meshes,
            materials,
        };
        info!(
            "loaded model {} ({} meshes, {} materials, {} triangles)",
            model.label,
            model.meshes.len(),
            model.materials.len(),
            model.triangle_count()
        );
        Ok(model)
    }

    /// Like [`ModelData::load`], but a failure is logged and yields a model
    /// with nothing to draw.
    pub fn load_or_empty(path: impl AsRef<Path>, texture_prefix: &str) -> Self {
        let path = path.as_ref();
        Self::load(path, texture_prefix).unwrap_or_else(|err| {
            warn!("model failed to load: {err}");
            Self {
                label: path.display().to_string(),
                texture_prefix: texture_prefix.to_string(),
                ..Default::default()
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.iter().all(|mesh| mesh.indices.is_empty())
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.indices.len() / 3).sum()
    }
}

fn convert_material(material: tobj::Material, base: &Path) -> MaterialData {
    let resolve = |texture: Option<String>| {
        texture
            .filter(|name| !name.trim().is_empty())
            .map(|name| base.join(name.trim()))
    };
    MaterialData {
        diffuse_color: material.diffuse.unwrap_or([1.0, 1.0, 1.0]),
        diffuse_texture: resolve(material.diffuse_texture),
        specular_texture: resolve(material.specular_texture),
        normal_texture: resolve(material.normal_texture),
        name: material.name,
    }
}

fn convert_mesh(model: tobj::Model) -> MeshData {
    let mesh = model.mesh;
    let vertex_count = mesh.positions.len() / 3;
    let has_normals = mesh.normals.len() == mesh.positions.len();
    let has_uvs = mesh.texcoords.len() / 2 == vertex_count;

    let mut vertices: Vec<ModelVertex> = (0..vertex_count)
        .map(|i| ModelVertex {
            position: [
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                mesh.positions[i * 3 + 2],
            ],
            normal: if has_normals {
                [
                    mesh.normals[i * 3],
                    mesh.normals[i * 3 + 1],
                    mesh.normals[i * 3 + 2],
                ]
            } else {
                [0.0; 3]
            },
            // OBJ puts v = 0 at the bottom; textures are addressed from the top.
            uv: if has_uvs {
                [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0; 2]
            },
        })
        .collect();

    if !has_normals {
        debug!("{}: computing normals", model.name);
        compute_normals(&mut vertices, &mesh.indices);
    }

    MeshData {
        name: model.name,
        vertices,
        indices: mesh.indices,
        material: mesh.material_id,
    }
}

/// Area-weighted vertex normals from triangle geometry.
pub fn compute_normals(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut accum = vec![Vec3::ZERO; vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }
        let p0 = Vec3::from(vertices[i0].position);
        let p1 = Vec3::from(vertices[i1].position);
        let p2 = Vec3::from(vertices[i2].position);
        let normal = (p1 - p0).cross(p2 - p0);
        if normal.length_squared() > f32::EPSILON {
            accum[i0] += normal;
            accum[i1] += normal;
            accum[i2] += normal;
        }
    }

    for (vertex, normal) in vertices.iter_mut().zip(accum) {
        vertex.normal = normal.normalize_or_zero().to_array();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_quad(dir: &Path) -> PathBuf {
        fs::write(
            dir.join("quad.mtl"),
            "newmtl grass\nKd 0.5 0.6 0.7\nmap_Kd textures/grass.png\nmap_Ks shine.png\n",
        )
        .unwrap();
        let obj = "mtllib quad.mtl\no quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
                   vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nusemtl grass\nf 1/1 2/2 3/3 4/4\n";
        let path = dir.join("quad.obj");
        fs::write(&path, obj).unwrap();
        path
    }

    #[test]
    fn loads_triangulated_mesh_with_materials() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_quad(dir.path());
        let model = ModelData::load(&path, "material.").unwrap();

        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.triangle_count(), 2);
        let mesh = &model.meshes[0];
        assert_eq!(mesh.material, Some(0));
        for vertex in &mesh.vertices {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        }
        let first = mesh.vertices.iter().find(|v| v.position == [0.0, 0.0, 0.0]).unwrap();
        assert_eq!(first.uv, [0.0, 1.0]);

        let material = &model.materials[0];
        assert_eq!(material.diffuse_color, [0.5, 0.6, 0.7]);
        assert_eq!(
            material.diffuse_texture.as_deref(),
            Some(dir.path().join("textures/grass.png").as_path())
        );
        assert!(material.normal_texture.is_none());
    }

    #[test]
    fn slot_labels_use_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_quad(dir.path());
        let model = ModelData::load(&path, "material.").unwrap();
        assert_eq!(model.texture_prefix, "material.");
        let material = &model.materials[0];
        assert_eq!(
            material.slot_label(TextureKind::Diffuse, &model.texture_prefix),
            "grass/material.texture_diffuse1"
        );
        assert_eq!(
            material.slot_label(TextureKind::Specular, &model.texture_prefix),
            "grass/material.texture_specular1"
        );
    }

    #[test]
    fn missing_model_is_empty() {
        let model = ModelData::load_or_empty("no/such/model.obj", "material.");
        assert!(model.is_empty());
        assert!(matches!(
            ModelData::load("no/such/model.obj", "material."),
            Err(AssetError::Obj { .. })
        ));
    }

    #[test]
    fn computes_missing_normals() {
        let mut vertices = vec![
            ModelVertex {
                position: [0.0, 0.0, 0.0],
                normal: [0.0; 3],
                uv: [0.0; 2],
            },
            ModelVertex {
                position: [1.0, 0.0, 0.0],
                normal: [0.0; 3],
                uv: [0.0; 2],
            },
            ModelVertex {
                position: [0.0, 1.0, 0.0],
                normal: [0.0; 3],
                uv: [0.0; 2],
            },
        ];
        compute_normals(&mut vertices, &[0, 1, 2]);
        for vertex in vertices {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        }
    }
}
