//! Compiled-in settings for the demo.
//!
//! Everything the demo reads from disk lives at a fixed path relative to the
//! working directory; there are no command-line flags or config files.

pub const WINDOW_TITLE: &str = "Corgi Meadow";
pub const WINDOW_WIDTH: u32 = 800;
pub const WINDOW_HEIGHT: u32 = 600;

/// Flat text file holding the persisted subset of [`crate::ProgramState`].
pub const STATE_FILE: &str = "resources/program_state.txt";

pub const GRASS_TEXTURE: &str = "resources/textures/grass.jpg";
pub const BILLBOARD_TEXTURE: &str = "resources/textures/bush.png";

/// Skybox faces in cubemap layer order: +X, -X, +Y, -Y, +Z, -Z.
pub const SKYBOX_FACES: [&str; 6] = [
    "resources/textures/skybox/right.jpg",
    "resources/textures/skybox/left.jpg",
    "resources/textures/skybox/top.jpg",
    "resources/textures/skybox/bottom.jpg",
    "resources/textures/skybox/front.jpg",
    "resources/textures/skybox/back.jpg",
];

/// Prefix the model shaders use for per-material texture slots.
pub const MATERIAL_PREFIX: &str = "material.";

/// Exposure change per second while an exposure key is held.
pub const EXPOSURE_RATE: f32 = 1.0;
pub const MIN_EXPOSURE: f32 = 0.01;

pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;
