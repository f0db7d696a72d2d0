//! The application context and its key bindings.

use glam::Vec2;
use log::info;

use crate::camera::CameraMovement;
use crate::config::EXPOSURE_RATE;
use crate::input::{CursorMode, CursorTracker, InputEvent, InputState, KeyCode, NamedKey};
use crate::state::ProgramState;

/// What a key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Move(CameraMovement),
    Quit,
    ToggleOverlay,
    ToggleMouseLook,
    CycleToneMapping,
    ExposureDown,
    ExposureUp,
}

impl Action {
    pub fn for_key(key: KeyCode) -> Option<Self> {
        use CameraMovement::*;
        Some(match key {
            KeyCode::Character('W') => Self::Move(Forward),
            KeyCode::Character('S') => Self::Move(Backward),
            KeyCode::Character('A') => Self::Move(Left),
            KeyCode::Character('D') => Self::Move(Right),
            KeyCode::Character('T') => Self::Move(Up),
            KeyCode::Character('G') => Self::Move(Down),
            KeyCode::Named(NamedKey::Up) => Self::Move(LookUp),
            KeyCode::Named(NamedKey::Down) => Self::Move(LookDown),
            KeyCode::Named(NamedKey::Left) => Self::Move(LookLeft),
            KeyCode::Named(NamedKey::Right) => Self::Move(LookRight),
            KeyCode::Named(NamedKey::Escape) => Self::Quit,
            KeyCode::Function(1) => Self::ToggleOverlay,
            KeyCode::Character('M') => Self::ToggleMouseLook,
            KeyCode::Named(NamedKey::Space) => Self::CycleToneMapping,
            KeyCode::Character('Q') => Self::ExposureDown,
            KeyCode::Character('E') => Self::ExposureUp,
            _ => return None,
        })
    }

    /// Held actions act every frame; the rest fire once per press.
    fn is_continuous(self) -> bool {
        matches!(self, Self::Move(_) | Self::ExposureDown | Self::ExposureUp)
    }
}

/// The application context: program state plus the input bookkeeping that
/// drives it. Owned by the event loop and passed to every frame phase.
#[derive(Debug)]
pub struct AppContext {
    pub state: ProgramState,
    input: InputState,
    cursor: CursorTracker,
    cursor_request: Option<CursorMode>,
    quit_requested: bool,
}

impl AppContext {
    /// Wraps `state`, capturing the cursor unless the overlay starts visible.
    pub fn new(state: ProgramState) -> Self {
        let mut cursor = CursorTracker::default();
        let mode = if state.overlay_enabled {
            CursorMode::Free
        } else {
            cursor.capture();
            CursorMode::Locked
        };
        Self {
            state,
            input: InputState::new(),
            cursor,
            cursor_request: Some(mode),
            quit_requested: false,
        }
    }

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyPressed(key) => {
                let already_down = self.input.is_key_down(key);
                self.input.set_key_down(key);
                if let Some(action) = Action::for_key(key) {
                    if !already_down && !action.is_continuous() {
                        self.trigger(action);
                    }
                }
            }
            InputEvent::KeyReleased(key) => self.input.set_key_up(key),
            InputEvent::CursorMoved(position) => {
                if let Some(delta) = self.cursor.sample(position) {
                    self.look(delta);
                }
            }
            InputEvent::MouseMotion(delta) => {
                if let Some(delta) = self.cursor.motion(delta) {
                    self.look(delta);
                }
            }
            InputEvent::Scrolled(lines) => self.state.camera.process_mouse_scroll(lines),
            InputEvent::CloseRequested => self.quit_requested = true,
        }
    }

    /// Applies held keys for a frame that took `delta_time` seconds.
    pub fn update(&mut self, delta_time: f32) {
        let held: Vec<Action> = self
            .input
            .pressed()
            .filter_map(Action::for_key)
            .filter(|action| action.is_continuous())
            .collect();
        for action in held {
            match action {
                Action::Move(movement) => {
                    self.state.camera.process_keyboard(movement, delta_time)
                }
                Action::ExposureDown => self
                    .state
                    .tone_mapping
                    .adjust_exposure(-EXPOSURE_RATE * delta_time),
                Action::ExposureUp => self
                    .state
                    .tone_mapping
                    .adjust_exposure(EXPOSURE_RATE * delta_time),
                _ => {}
            }
        }
    }

    pub fn cursor_mode(&self) -> CursorMode {
        if self.cursor.is_captured() {
            CursorMode::Locked
        } else {
            CursorMode::Free
        }
    }

    /// Cursor mode change the window should apply, if any.
    pub fn take_cursor_request(&mut self) -> Option<CursorMode> {
        self.cursor_request.take()
    }

    /// Whether window events should reach the overlay at all.
    pub fn overlay_receives_input(&self) -> bool {
        self.state.overlay_enabled
    }

    pub fn should_quit(&self) -> bool {
        self.quit_requested
    }

    /// Drops held keys, e.g. when the window loses focus.
    pub fn release_all_keys(&mut self) {
        self.input.clear();
    }

    fn trigger(&mut self, action: Action) {
        match action {
            Action::Quit => self.quit_requested = true,
            Action::ToggleOverlay => self.toggle_overlay(),
            Action::ToggleMouseLook => {
                self.state.camera_mouse_update = !self.state.camera_mouse_update;
            }
            Action::CycleToneMapping => {
                let tone = &mut self.state.tone_mapping;
                tone.operator = tone.operator.next();
                info!("tone mapping: {}", tone.operator.label());
            }
            Action::Move(_) | Action::ExposureDown | Action::ExposureUp => {}
        }
    }

    fn toggle_overlay(&mut self) {
        self.state.overlay_enabled = !self.state.overlay_enabled;
        if self.state.overlay_enabled {
            self.state.camera_mouse_update = false;
            self.cursor.release();
            self.cursor_request = Some(CursorMode::Free);
        } else {
            self.state.camera_mouse_update = true;
            self.cursor.capture();
            self.cursor_request = Some(CursorMode::Locked);
        }
    }

    fn look(&mut self, delta: Vec2) {
        if self.state.camera_mouse_update {
            // Screen y grows downwards, pitch grows upwards.
            self.state.camera.process_mouse_movement(delta.x, -delta.y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(ctx: &mut AppContext, key: KeyCode) {
        ctx.handle_event(InputEvent::KeyPressed(key));
    }

    fn tap(ctx: &mut AppContext, key: KeyCode) {
        ctx.handle_event(InputEvent::KeyPressed(key));
        ctx.handle_event(InputEvent::KeyReleased(key));
    }

    #[test]
    fn starts_locked_when_overlay_hidden() {
        let mut ctx = AppContext::new(ProgramState::default());
        assert_eq!(ctx.take_cursor_request(), Some(CursorMode::Locked));
        assert_eq!(ctx.take_cursor_request(), None);
    }

    #[test]
    fn starts_free_when_overlay_restored_visible() {
        let state = ProgramState {
            overlay_enabled: true,
            ..ProgramState::default()
        };
        let mut ctx = AppContext::new(state);
        assert_eq!(ctx.cursor_mode(), CursorMode::Free);
        assert_eq!(ctx.take_cursor_request(), Some(CursorMode::Free));
    }

    #[test]
    fn escape_requests_quit() {
        let mut ctx = AppContext::new(ProgramState::default());
        tap(&mut ctx, KeyCode::Named(NamedKey::Escape));
        assert!(ctx.should_quit());
    }

    #[test]
    fn key_repeat_does_not_retrigger_toggle() {
        let mut ctx = AppContext::new(ProgramState::default());
        press(&mut ctx, KeyCode::Character('M'));
        press(&mut ctx, KeyCode::Character('M'));
        assert!(!ctx.state.camera_mouse_update);
    }

    fn motion(ctx: &mut AppContext, dx: f32, dy: f32) {
        ctx.handle_event(InputEvent::MouseMotion(Vec2::new(dx, dy)));
    }

    #[test]
    fn mouse_look_respects_toggle() {
        let mut ctx = AppContext::new(ProgramState::default());
        motion(&mut ctx, 0.0, 0.0);
        tap(&mut ctx, KeyCode::Character('M'));
        let yaw = ctx.state.camera.yaw();
        motion(&mut ctx, 100.0, 0.0);
        assert_eq!(ctx.state.camera.yaw(), yaw);
        tap(&mut ctx, KeyCode::Character('M'));
        motion(&mut ctx, 100.0, 0.0);
        assert!((ctx.state.camera.yaw() - (yaw + 10.0)).abs() < 1e-4);
    }

    #[test]
    fn upward_motion_raises_pitch() {
        let mut ctx = AppContext::new(ProgramState::default());
        motion(&mut ctx, 0.0, 0.0);
        motion(&mut ctx, 0.0, -50.0);
        assert!((ctx.state.camera.pitch() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn grabbed_cursor_positions_do_not_steer() {
        let mut ctx = AppContext::new(ProgramState::default());
        let yaw = ctx.state.camera.yaw();
        ctx.handle_event(InputEvent::CursorMoved(Vec2::new(100.0, 100.0)));
        ctx.handle_event(InputEvent::CursorMoved(Vec2::new(300.0, 100.0)));
        assert_eq!(ctx.state.camera.yaw(), yaw);
    }

    #[test]
    fn free_cursor_steers_once_flag_is_set() {
        let mut ctx = AppContext::new(ProgramState::default());
        tap(&mut ctx, KeyCode::Function(1));
        let yaw = ctx.state.camera.yaw();
        for x in [100.0, 200.0, 300.0] {
            ctx.handle_event(InputEvent::CursorMoved(Vec2::new(x, 100.0)));
        }
        assert_eq!(ctx.state.camera.yaw(), yaw);

        ctx.state.camera_mouse_update = true;
        for x in [400.0, 500.0, 600.0] {
            ctx.handle_event(InputEvent::CursorMoved(Vec2::new(x, 100.0)));
        }
        assert!((ctx.state.camera.yaw() - (yaw + 30.0)).abs() < 1e-4);
        assert_eq!(ctx.cursor_mode(), CursorMode::Free);
    }

    #[test]
    fn releasing_held_key_stops_movement() {
        let mut ctx = AppContext::new(ProgramState::default());
        press(&mut ctx, KeyCode::Character('W'));
        ctx.update(0.1);
        ctx.handle_event(InputEvent::KeyReleased(KeyCode::Character('W')));
        let stopped = ctx.state.camera.position;
        ctx.update(0.1);
        assert_eq!(ctx.state.camera.position, stopped);
    }

    #[test]
    fn overlay_input_follows_visibility() {
        let mut ctx = AppContext::new(ProgramState::default());
        assert!(!ctx.overlay_receives_input());
        tap(&mut ctx, KeyCode::Function(1));
        assert!(ctx.overlay_receives_input());
        tap(&mut ctx, KeyCode::Function(1));
        assert!(!ctx.overlay_receives_input());
    }

    #[test]
    fn exposure_keys_scale_with_time() {
        let mut ctx = AppContext::new(ProgramState::default());
        let start = ctx.state.tone_mapping.exposure;
        press(&mut ctx, KeyCode::Character('E'));
        ctx.update(0.5);
        assert!((ctx.state.tone_mapping.exposure - (start + 0.5 * EXPOSURE_RATE)).abs() < 1e-5);
    }

    #[test]
    fn space_cycles_tone_mapping() {
        let mut ctx = AppContext::new(ProgramState::default());
        let before = ctx.state.tone_mapping.operator;
        tap(&mut ctx, KeyCode::Named(NamedKey::Space));
        assert_eq!(ctx.state.tone_mapping.operator, before.next());
    }
}
