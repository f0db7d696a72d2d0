use glam::{Mat4, Vec3, Vec4};

use crate::state::{PointLight, ProgramState};

/// Per-frame camera and lighting values consumed by the frame uniform.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameParams {
    pub view: Mat4,
    pub projection: Mat4,
    pub eye: Vec3,
    pub light: PointLight,
}

impl FrameParams {
    pub fn new(state: &ProgramState, aspect: f32) -> Self {
        Self {
            view: state.camera.view_matrix(),
            projection: state.camera.projection(aspect),
            eye: state.camera.position,
            light: state.point_light,
        }
    }

    /// View matrix with translation removed, as used for the skybox.
    pub fn sky_view(&self) -> Mat4 {
        let mut view = self.view;
        view.w_axis = Vec4::W;
        view
    }
}

/// Width over height, guarding against minimised windows.
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_moves_eye_to_origin() {
        let state = ProgramState::default();
        let params = FrameParams::new(&state, 4.0 / 3.0);
        let eye = params.view.transform_point3(params.eye);
        assert!(eye.length() < 1e-5);
    }

    #[test]
    fn sky_view_ignores_camera_position() {
        let mut state = ProgramState::default();
        let near = FrameParams::new(&state, 1.0);
        state.camera.position = Vec3::new(40.0, -3.0, 12.0);
        let far = FrameParams::new(&state, 1.0);
        assert!(near.sky_view().abs_diff_eq(far.sky_view(), 1e-5));
        assert_eq!(far.sky_view().w_axis, Vec4::W);
    }

    #[test]
    fn aspect_ratio_survives_zero_height() {
        assert_eq!(aspect_ratio(800, 600), 800.0 / 600.0);
        assert_eq!(aspect_ratio(800, 0), 800.0);
    }
}
