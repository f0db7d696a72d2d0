//! Mutable demo state and its flat-file persistence.
//!
//! Only the clear color, the overlay flag and the camera pose survive a
//! restart. The file holds ten values, one per line:
//!
//! ```text
//! clear.r  clear.g  clear.b
//! overlay (0 or 1)
//! camera.position.x  .y  .z
//! camera.front.x  .y  .z
//! ```

use std::fs;
use std::io;
use std::path::Path;

use glam::Vec3;
use log::debug;

use crate::camera::Camera;
use crate::config::MIN_EXPOSURE;
use crate::scene::{default_scene, SceneEntry};

const PERSISTED_VALUES: usize = 10;

/// Single point light with inverse-square falloff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub shininess: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(4.0, 4.0, 4.0),
            ambient: Vec3::splat(1.1),
            diffuse: Vec3::splat(0.2),
            specular: Vec3::splat(0.01),
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
            shininess: 32.0,
        }
    }
}

impl PointLight {
    pub fn attenuation(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

/// Operator applied when resolving the HDR target to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToneMapOperator {
    /// Clamp to the displayable range; the non-HDR look.
    Passthrough,
    Reinhard,
    #[default]
    Exposure,
}

impl ToneMapOperator {
    pub const ALL: [ToneMapOperator; 3] = [Self::Passthrough, Self::Reinhard, Self::Exposure];

    pub fn next(self) -> Self {
        match self {
            Self::Passthrough => Self::Reinhard,
            Self::Reinhard => Self::Exposure,
            Self::Exposure => Self::Passthrough,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Passthrough => "Passthrough",
            Self::Reinhard => "Reinhard",
            Self::Exposure => "Exposure",
        }
    }

    /// Index understood by the tone-mapping shader.
    pub fn shader_index(self) -> u32 {
        match self {
            Self::Passthrough => 0,
            Self::Reinhard => 1,
            Self::Exposure => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneMapping {
    pub operator: ToneMapOperator,
    pub exposure: f32,
}

impl Default for ToneMapping {
    fn default() -> Self {
        Self {
            operator: ToneMapOperator::default(),
            exposure: 1.0,
        }
    }
}

impl ToneMapping {
    pub fn adjust_exposure(&mut self, delta: f32) {
        self.exposure = (self.exposure + delta).max(MIN_EXPOSURE);
    }
}

/// Everything the overlay can tweak, plus the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramState {
    pub clear_color: Vec3,
    pub overlay_enabled: bool,
    pub camera: Camera,
    pub camera_mouse_update: bool,
    pub point_light: PointLight,
    pub tone_mapping: ToneMapping,
    pub objects: Vec<SceneEntry>,
}

impl Default for ProgramState {
    fn default() -> Self {
        Self {
            clear_color: Vec3::ZERO,
            overlay_enabled: false,
            camera: Camera::new(Vec3::new(0.0, 0.0, 3.0)),
            camera_mouse_update: true,
            point_light: PointLight::default(),
            tone_mapping: ToneMapping::default(),
            objects: default_scene(),
        }
    }
}

impl ProgramState {
    /// Defaults overlaid with whatever `path` restores.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let mut state = Self::default();
        state.restore(path.as_ref());
        state
    }

    /// Restores the persisted fields from `path`.
    ///
    /// A missing or malformed file leaves every field untouched.
    pub fn restore(&mut self, path: &Path) {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                debug!("no saved state at {}: {err}", path.display());
                return;
            }
        };
        match PersistedFields::parse(&contents) {
            Some(fields) => fields.apply(self),
            None => debug!("ignoring malformed state file {}", path.display()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let c = self.clear_color;
        let p = self.camera.position;
        let f = self.camera.front();
        let values = [
            c.x.to_string(),
            c.y.to_string(),
            c.z.to_string(),
            u8::from(self.overlay_enabled).to_string(),
            p.x.to_string(),
            p.y.to_string(),
            p.z.to_string(),
            f.x.to_string(),
            f.y.to_string(),
            f.z.to_string(),
        ];
        let mut contents = values.join("\n");
        contents.push('\n');
        fs::write(path, contents)
    }
}

struct PersistedFields {
    clear_color: Vec3,
    overlay_enabled: bool,
    position: Vec3,
    front: Vec3,
}

impl PersistedFields {
    fn parse(contents: &str) -> Option<Self> {
        let tokens: Vec<&str> = contents.split_whitespace().take(PERSISTED_VALUES).collect();
        if tokens.len() < PERSISTED_VALUES {
            return None;
        }
        let float = |i: usize| tokens[i].parse::<f32>().ok().filter(|v| v.is_finite());
        let overlay_enabled = match tokens[3] {
            "0" => false,
            "1" => true,
            _ => return None,
        };
        let clear_color = Vec3::new(float(0)?, float(1)?, float(2)?);
        let position = Vec3::new(float(4)?, float(5)?, float(6)?);
        let front = Vec3::new(float(7)?, float(8)?, float(9)?).try_normalize()?;
        Some(Self {
            clear_color,
            overlay_enabled,
            position,
            front,
        })
    }

    fn apply(self, state: &mut ProgramState) {
        state.clear_color = self.clear_color;
        state.overlay_enabled = self.overlay_enabled;
        state.camera.position = self.position;
        state.camera.look_along(self.front);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attenuation_follows_inverse_square_model() {
        let light = PointLight::default();
        assert_eq!(light.attenuation(0.0), 1.0);
        let expected = 1.0 / (1.0 + 0.09 * 10.0 + 0.032 * 100.0);
        assert!((light.attenuation(10.0) - expected).abs() < 1e-6);
    }

    #[test]
    fn operator_cycles_through_all() {
        let mut op = ToneMapOperator::Passthrough;
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(op);
            op = op.next();
        }
        assert_eq!(op, ToneMapOperator::Passthrough);
        assert_eq!(seen, ToneMapOperator::ALL);
    }

    #[test]
    fn exposure_never_drops_below_floor() {
        let mut tone = ToneMapping::default();
        tone.adjust_exposure(-10.0);
        assert_eq!(tone.exposure, MIN_EXPOSURE);
    }

    #[test]
    fn rejects_bad_overlay_flag() {
        let text = "0.1 0.2 0.3 2 1 2 3 0 0 -1";
        assert!(PersistedFields::parse(text).is_none());
    }

    #[test]
    fn rejects_zero_front() {
        let text = "0.1 0.2 0.3 1 1 2 3 0 0 0";
        assert!(PersistedFields::parse(text).is_none());
    }

    #[test]
    fn parses_whitespace_delimited_values() {
        let text = "0.1 0.2\n0.3 1\n1 2 3\n0 0 -2\n";
        let fields = PersistedFields::parse(text).unwrap();
        assert!(fields.overlay_enabled);
        assert_eq!(fields.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(fields.front, Vec3::NEG_Z);
    }
}
