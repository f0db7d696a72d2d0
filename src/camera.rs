//! First-person fly camera.

use glam::{Mat4, Vec3};

use crate::config::{FAR_PLANE, NEAR_PLANE};

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_SPEED: f32 = 2.5;
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
pub const DEFAULT_ZOOM: f32 = 45.0;
pub const PITCH_LIMIT: f32 = 89.0;
pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 45.0;
/// Degrees per second applied by the look keys.
pub const LOOK_SPEED: f32 = 60.0;

/// Discrete keyboard-driven camera motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
    LookUp,
    LookDown,
    LookLeft,
    LookRight,
}

/// Camera pose with an orthonormal basis derived from yaw and pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    pub speed: f32,
    pub sensitivity: f32,
    zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 3.0))
    }
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            speed: DEFAULT_SPEED,
            sensitivity: DEFAULT_SENSITIVITY,
            zoom: DEFAULT_ZOOM,
        };
        camera.update_vectors();
        camera
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Vertical field of view in degrees.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Points the camera along `front`, deriving yaw and pitch from it.
    ///
    /// Returns `false` and leaves the orientation untouched when `front` has
    /// no usable direction.
    pub fn look_along(&mut self, front: Vec3) -> bool {
        let Some(front) = front.try_normalize() else {
            return false;
        };
        self.yaw = front.z.atan2(front.x).to_degrees();
        self.pitch = front
            .y
            .clamp(-1.0, 1.0)
            .asin()
            .to_degrees()
            .clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
        true
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.zoom.to_radians(),
            aspect.max(0.01),
            NEAR_PLANE,
            FAR_PLANE,
        )
    }

    pub fn process_keyboard(&mut self, movement: CameraMovement, delta_time: f32) {
        let velocity = self.speed * delta_time;
        match movement {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
            CameraMovement::Up => self.position += self.world_up * velocity,
            CameraMovement::Down => self.position -= self.world_up * velocity,
            CameraMovement::LookUp => self.rotate(0.0, LOOK_SPEED * delta_time),
            CameraMovement::LookDown => self.rotate(0.0, -LOOK_SPEED * delta_time),
            CameraMovement::LookLeft => self.rotate(-LOOK_SPEED * delta_time, 0.0),
            CameraMovement::LookRight => self.rotate(LOOK_SPEED * delta_time, 0.0),
        }
    }

    /// Applies a cursor delta; `y_offset` grows upwards.
    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32) {
        if x_offset == 0.0 && y_offset == 0.0 {
            return;
        }
        self.rotate(x_offset * self.sensitivity, y_offset * self.sensitivity);
    }

    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn rotate(&mut self, yaw_degrees: f32, pitch_degrees: f32) {
        self.yaw += yaw_degrees;
        self.pitch = (self.pitch + pitch_degrees).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    fn update_vectors(&mut self) {
        let (sin_yaw, cos_yaw) = self.yaw.to_radians().sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.to_radians().sin_cos();
        self.front = Vec3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch).normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = Camera::default();
        assert!(approx(camera.front(), Vec3::NEG_Z));
        assert!(approx(camera.right(), Vec3::X));
        assert!(approx(camera.up(), Vec3::Y));
    }

    #[test]
    fn zero_mouse_delta_keeps_orientation() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(35.0, -12.0);
        let before = camera.clone();
        camera.process_mouse_movement(0.0, 0.0);
        assert_eq!(camera, before);
    }

    #[test]
    fn pitch_is_clamped_under_large_input() {
        let mut camera = Camera::default();
        for _ in 0..100 {
            camera.process_mouse_movement(3.0, 5000.0);
            assert!(camera.pitch() <= PITCH_LIMIT);
        }
        for _ in 0..100 {
            camera.process_mouse_movement(-3.0, -5000.0);
            assert!(camera.pitch() >= -PITCH_LIMIT);
        }
    }

    #[test]
    fn basis_stays_orthonormal() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(123.0, 45.0);
        camera.process_keyboard(CameraMovement::LookLeft, 0.7);
        let (f, r, u) = (camera.front(), camera.right(), camera.up());
        assert!((f.length() - 1.0).abs() < 1e-5);
        assert!((r.length() - 1.0).abs() < 1e-5);
        assert!((u.length() - 1.0).abs() < 1e-5);
        assert!(f.dot(r).abs() < 1e-5);
        assert!(f.dot(u).abs() < 1e-5);
        assert!(r.dot(u).abs() < 1e-5);
    }

    #[test]
    fn displacement_scales_with_elapsed_time() {
        let mut short = Camera::default();
        let mut long = Camera::default();
        short.process_keyboard(CameraMovement::Right, 0.25);
        long.process_keyboard(CameraMovement::Right, 0.5);
        let start = Camera::default().position;
        let d_short = (short.position - start).length();
        let d_long = (long.position - start).length();
        assert!((d_long - 2.0 * d_short).abs() < 1e-5);
    }

    #[test]
    fn elevation_moves_along_world_up() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(0.0, 300.0);
        camera.process_keyboard(CameraMovement::Up, 1.0);
        assert!(approx(camera.position, Vec3::new(0.0, 2.5, 3.0)));
    }

    #[test]
    fn scroll_zoom_is_bounded() {
        let mut camera = Camera::default();
        camera.process_mouse_scroll(100.0);
        assert_eq!(camera.zoom(), MIN_ZOOM);
        camera.process_mouse_scroll(-100.0);
        assert_eq!(camera.zoom(), MAX_ZOOM);
    }

    #[test]
    fn look_along_derives_angles() {
        let mut camera = Camera::default();
        assert!(camera.look_along(Vec3::new(1.0, 0.0, 0.0)));
        assert!(camera.yaw().abs() < 1e-4);
        assert!(approx(camera.front(), Vec3::X));
        assert!(!camera.look_along(Vec3::ZERO));
        assert!(approx(camera.front(), Vec3::X));
    }
}
