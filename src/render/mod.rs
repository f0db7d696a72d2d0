mod common;
mod hdr;
mod mesh;
mod native;
mod shared;
mod texture;

pub use common::{aspect_ratio, FrameParams};
pub use hdr::HdrTarget;
pub use native::Renderer;
pub use texture::GpuTexture;
