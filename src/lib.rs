//! Core modules for the Corgi Meadow scene viewer.
//!
//! The crate exposes the camera, the persisted program state, asset
//! loaders, and the input model as plain, testable building blocks. The
//! wgpu renderer and the egui overlay sit on top of them and are driven by
//! the binary's event loop.

pub mod app;
pub mod assets;
pub mod camera;
pub mod config;
pub mod input;
pub mod model;
pub mod overlay;
pub mod render;
pub mod scene;
pub mod state;

pub use app::{Action, AppContext};
pub use assets::{AssetError, CubemapImages, TexelFormat, TextureImage};
pub use camera::{Camera, CameraMovement};
pub use input::{CursorMode, CursorTracker, InputEvent, InputState, KeyCode, NamedKey};
pub use model::{ModelData, ModelVertex, TextureKind};
pub use overlay::{DebugOverlay, OverlayFrame};
pub use render::{FrameParams, Renderer};
pub use scene::{back_to_front, default_scene, SceneEntry, SceneObjectTransform, ShaderPass};
pub use state::{PointLight, ProgramState, ToneMapOperator, ToneMapping};
