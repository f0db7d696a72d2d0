//! CPU-side image decoding for textures and cubemaps.
//!
//! Decoding is kept apart from GPU upload so the failure policy can be
//! exercised without a device: any image that cannot be read turns into a
//! logged warning and a 1x1 placeholder.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Pixel};
use log::{debug, warn};
use thiserror::Error;

/// Errors raised while reading assets from disk.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to load model {}: {source}", path.display())]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error(
        "cubemap face {} is {width}x{height}, expected {expected}x{expected}",
        path.display()
    )]
    CubemapFace {
        path: PathBuf,
        width: u32,
        height: u32,
        expected: u32,
    },
}

/// Texel layout a decoded image is uploaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexelFormat {
    R8,
    Rgba8,
    Rgba8Srgb,
}

impl TexelFormat {
    /// Picks the layout for an image with `channels` color channels.
    ///
    /// Three-channel data is widened to RGBA since the GPU has no packed
    /// 24-bit format; single-channel data is never gamma-encoded.
    pub fn for_channels(channels: u8, gamma: bool) -> Self {
        match (channels, gamma) {
            (1, _) => Self::R8,
            (_, true) => Self::Rgba8Srgb,
            (_, false) => Self::Rgba8,
        }
    }

    pub fn bytes_per_texel(self) -> u32 {
        match self {
            Self::R8 => 1,
            Self::Rgba8 | Self::Rgba8Srgb => 4,
        }
    }
}

/// One mip level of texel data.
#[derive(Debug, Clone, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// A decoded 2D texture with its full mip chain.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub label: String,
    pub format: TexelFormat,
    pub mips: Vec<MipLevel>,
    pub placeholder: bool,
}

const PLACEHOLDER_TEXEL: [u8; 4] = [255, 0, 255, 255];

impl TextureImage {
    /// Decodes `path`, choosing the texel format from its channel count.
    pub fn load(path: impl AsRef<Path>, gamma: bool) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| match source {
            image::ImageError::IoError(source) => AssetError::Io {
                path: path.to_path_buf(),
                source,
            },
            source => AssetError::Image {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let texture = Self::from_image(path.display().to_string(), &image, gamma);
        debug!(
            "decoded {} ({}x{}, {:?}, {} mips)",
            texture.label,
            image.width(),
            image.height(),
            texture.format,
            texture.mips.len()
        );
        Ok(texture)
    }

    /// Like [`TextureImage::load`], but never fails: a warning is logged and
    /// a placeholder returned instead.
    pub fn load_or_placeholder(path: impl AsRef<Path>, gamma: bool) -> Self {
        let path = path.as_ref();
        Self::load(path, gamma).unwrap_or_else(|err| {
            warn!("texture failed to load at path {}: {err}", path.display());
            Self::placeholder(path.display().to_string())
        })
    }

    pub fn from_image(label: String, image: &DynamicImage, gamma: bool) -> Self {
        let format = TexelFormat::for_channels(image.color().channel_count(), gamma);
        let mips = match format {
            TexelFormat::R8 => mip_chain(image.to_luma8()),
            TexelFormat::Rgba8 | TexelFormat::Rgba8Srgb => mip_chain(image.to_rgba8()),
        };
        Self {
            label,
            format,
            mips,
            placeholder: false,
        }
    }

    /// A single opaque texel in an unmistakable color.
    pub fn placeholder(label: String) -> Self {
        let mut texture = Self::solid(label, PLACEHOLDER_TEXEL, false);
        texture.placeholder = true;
        texture
    }

    /// A 1x1 texture of one color, e.g. a material's flat diffuse color.
    pub fn solid(label: String, rgba: [u8; 4], gamma: bool) -> Self {
        Self {
            label,
            format: TexelFormat::for_channels(4, gamma),
            mips: vec![MipLevel {
                width: 1,
                height: 1,
                data: rgba.to_vec(),
            }],
            placeholder: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.mips[0].width
    }

    pub fn height(&self) -> u32 {
        self.mips[0].height
    }
}

/// Number of levels in a full chain for a `width` x `height` base.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

fn mip_chain<P>(base: ImageBuffer<P, Vec<u8>>) -> Vec<MipLevel>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let (width, height) = base.dimensions();
    let levels = mip_level_count(width, height);
    let mut mips = Vec::with_capacity(levels as usize);
    let mut current = base;
    for level in 0..levels {
        if level > 0 {
            let next_width = (current.width() / 2).max(1);
            let next_height = (current.height() / 2).max(1);
            current = imageops::resize(&current, next_width, next_height, FilterType::Triangle);
        }
        mips.push(MipLevel {
            width: current.width(),
            height: current.height(),
            data: current.as_raw().clone(),
        });
    }
    mips
}

/// Six RGBA faces of a cubemap, ordered +X, -X, +Y, -Y, +Z, -Z.
#[derive(Debug, Clone, PartialEq)]
pub struct CubemapImages {
    pub size: u32,
    pub format: TexelFormat,
    pub faces: Vec<Vec<u8>>,
    pub placeholder: bool,
}

impl CubemapImages {
    pub fn load<P: AsRef<Path>>(faces: &[P; 6], gamma: bool) -> Result<Self, AssetError> {
        let mut size = None;
        let mut data = Vec::with_capacity(6);
        for face in faces {
            let path = face.as_ref();
            let image = image::open(path)
                .map_err(|source| AssetError::Image {
                    path: path.to_path_buf(),
                    source,
                })?
                .to_rgba8();
            let (width, height) = image.dimensions();
            let expected = *size.get_or_insert(width);
            if width != expected || height != expected {
                return Err(AssetError::CubemapFace {
                    path: path.to_path_buf(),
                    width,
                    height,
                    expected,
                });
            }
            data.push(image.into_raw());
        }
        Ok(Self {
            size: size.unwrap_or(1),
            format: TexelFormat::for_channels(4, gamma),
            faces: data,
            placeholder: false,
        })
    }

    pub fn load_or_placeholder<P: AsRef<Path>>(faces: &[P; 6], gamma: bool) -> Self {
        Self::load(faces, gamma).unwrap_or_else(|err| {
            warn!("skybox failed to load, using placeholder: {err}");
            Self::placeholder()
        })
    }

    pub fn placeholder() -> Self {
        Self {
            size: 1,
            format: TexelFormat::Rgba8,
            faces: vec![PLACEHOLDER_TEXEL.to_vec(); 6],
            placeholder: true,
        }
    }
}
