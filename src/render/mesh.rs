use bytemuck::{bytes_of, Pod};
use glam::Mat4;
use log::debug;
use wgpu::util::DeviceExt;

use crate::assets::TextureImage;
use crate::model::{MaterialData, ModelData, TextureKind};

use super::shared::ObjectUniform;
use super::texture::GpuTexture;

/// Vertex and optional index buffers for one draw.
pub struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: Option<wgpu::Buffer>,
    count: u32,
}

impl MeshBuffers {
    pub fn indexed<V: Pod>(
        device: &wgpu::Device,
        vertices: &[V],
        indices: &[u32],
        label: &str,
    ) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index: Some(index),
            count: indices.len() as u32,
        }
    }

    pub fn vertices_only<V: Pod>(device: &wgpu::Device, vertices: &[V], label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            vertex,
            index: None,
            count: vertices.len() as u32,
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex.slice(..));
        match &self.index {
            Some(index) => {
                pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..self.count, 0, 0..1);
            }
            None => pass.draw(0..self.count, 0..1),
        }
    }
}

/// Per-object uniform buffer, created once and rewritten every frame.
pub struct ObjectBinding {
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl ObjectBinding {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        model: Mat4,
        label: &str,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-object-uniform")),
            contents: bytes_of(&ObjectUniform::new(model)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}-object-bind-group")),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    pub fn update(&self, queue: &wgpu::Queue, model: Mat4) {
        queue.write_buffer(&self.buffer, 0, bytes_of(&ObjectUniform::new(model)));
    }
}

/// Diffuse and specular textures bound together for the model shader.
pub struct Material {
    _diffuse: GpuTexture,
    _specular: GpuTexture,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        diffuse: GpuTexture,
        specular: GpuTexture,
        label: &str,
    ) -> Self {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&specular.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&diffuse.sampler),
                },
            ],
        });
        Self {
            _diffuse: diffuse,
            _specular: specular,
            bind_group,
        }
    }

    fn from_data(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        data: &MaterialData,
        prefix: &str,
    ) -> Self {
        let diffuse_label = data.slot_label(TextureKind::Diffuse, prefix);
        let diffuse = match data.texture(TextureKind::Diffuse) {
            Some(path) => TextureImage {
                label: diffuse_label,
                ..TextureImage::load_or_placeholder(path, true)
            },
            None => TextureImage::solid(diffuse_label, color_texel(data.diffuse_color), true),
        };
        let specular_label = data.slot_label(TextureKind::Specular, prefix);
        let specular = match data.texture(TextureKind::Specular) {
            Some(path) => TextureImage {
                label: specular_label,
                ..TextureImage::load_or_placeholder(path, false)
            },
            None => black(specular_label),
        };
        Self::new(
            device,
            layout,
            GpuTexture::upload(device, queue, &diffuse),
            GpuTexture::upload(device, queue, &specular),
            &data.name,
        )
    }

    /// White diffuse with no specular, for meshes without a material.
    fn fallback(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        prefix: &str,
    ) -> Self {
        let diffuse = TextureImage::solid(
            TextureKind::Diffuse.slot_name(prefix, 1),
            [255; 4],
            true,
        );
        let specular = black(TextureKind::Specular.slot_name(prefix, 1));
        Self::new(
            device,
            layout,
            GpuTexture::upload(device, queue, &diffuse),
            GpuTexture::upload(device, queue, &specular),
            "fallback-material",
        )
    }
}

fn black(label: String) -> TextureImage {
    TextureImage::solid(label, [0, 0, 0, 255], false)
}

fn unit_to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn color_texel(color: [f32; 3]) -> [u8; 4] {
    let [r, g, b] = color.map(unit_to_byte);
    [r, g, b, 255]
}

/// A loaded model: one buffer set per mesh plus its materials.
pub struct GpuModel {
    meshes: Vec<(MeshBuffers, usize)>,
    materials: Vec<Material>,
}

impl GpuModel {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material_layout: &wgpu::BindGroupLayout,
        data: &ModelData,
    ) -> Self {
        let mut materials: Vec<Material> = data
            .materials
            .iter()
            .map(|material| {
                Material::from_data(device, queue, material_layout, material, &data.texture_prefix)
            })
            .collect();
        let fallback = materials.len();
        materials.push(Material::fallback(
            device,
            queue,
            material_layout,
            &data.texture_prefix,
        ));

        let meshes = data
            .meshes
            .iter()
            .filter(|mesh| !mesh.indices.is_empty())
            .map(|mesh| {
                let material = mesh.material.filter(|&i| i < fallback).unwrap_or(fallback);
                let label = format!("{}:{}", data.label, mesh.name);
                (
                    MeshBuffers::indexed(device, &mesh.vertices, &mesh.indices, &label),
                    material,
                )
            })
            .collect::<Vec<_>>();
        debug!("uploaded {} ({} draws)", data.label, meshes.len());

        Self { meshes, materials }
    }

    /// Issues one draw per mesh; group 2 is rebound per material.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        for (mesh, material) in &self.meshes {
            pass.set_bind_group(2, &self.materials[*material].bind_group, &[]);
            mesh.draw(pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diffuse_color_converts_to_bytes() {
        assert_eq!(color_texel([0.0, 0.5, 1.0]), [0, 128, 255, 255]);
        assert_eq!(unit_to_byte(2.0), 255);
        assert_eq!(unit_to_byte(-1.0), 0);
    }
}
