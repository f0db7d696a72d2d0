use crate::assets::{CubemapImages, TexelFormat, TextureImage};

/// A sampled texture resident on the GPU.
pub struct GpuTexture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl GpuTexture {
    /// Uploads every mip level of `image` with repeat addressing and
    /// trilinear filtering.
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, image: &TextureImage) -> Self {
        let format = texture_format(image.format);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&image.label),
            size: wgpu::Extent3d {
                width: image.width(),
                height: image.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: image.mips.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, mip) in image.mips.iter().enumerate() {
            write_layer(
                queue,
                &texture,
                level as u32,
                0,
                image.format,
                mip.width,
                mip.height,
                &mip.data,
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            _texture: texture,
            view,
            sampler,
        }
    }

    /// Same as [`GpuTexture::upload`] but clamped at the edges, so sprites
    /// with transparent borders do not bleed the opposite edge in.
    pub fn upload_clamped(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &TextureImage,
    ) -> Self {
        let mut texture = Self::upload(device, queue, image);
        texture.sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sprite-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        texture
    }

    pub fn cubemap(device: &wgpu::Device, queue: &wgpu::Queue, images: &CubemapImages) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("skybox-cubemap"),
            size: wgpu::Extent3d {
                width: images.size,
                height: images.size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(images.format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in images.faces.iter().enumerate() {
            write_layer(
                queue,
                &texture,
                0,
                layer as u32,
                images.format,
                images.size,
                images.size,
                face,
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("skybox-view"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("skybox-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            _texture: texture,
            view,
            sampler,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn write_layer(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    mip_level: u32,
    layer: u32,
    format: TexelFormat,
    width: u32,
    height: u32,
    data: &[u8],
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * format.bytes_per_texel()),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

pub(crate) fn texture_format(format: TexelFormat) -> wgpu::TextureFormat {
    match format {
        TexelFormat::R8 => wgpu::TextureFormat::R8Unorm,
        TexelFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        TexelFormat::Rgba8Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}
