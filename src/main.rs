use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use log::{error, info, warn};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{CursorGrabMode, Window, WindowId};

use corgi_meadow::config::{STATE_FILE, WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH};
use corgi_meadow::{
    AppContext, CursorMode, DebugOverlay, InputEvent, KeyCode, NamedKey, ProgramState, Renderer,
};

/// Pixel scroll deltas are converted to lines at this rate.
const PIXELS_PER_LINE: f32 = 38.0;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let state = ProgramState::load(STATE_FILE);
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(AppContext::new(state));
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;

    if let Some(err) = app.last_error.take() {
        return Err(err);
    }
    drop(app.graphics.take());

    match app.context.state.save(STATE_FILE) {
        Ok(()) => info!("saved program state to {STATE_FILE}"),
        Err(err) => warn!("failed to save program state to {STATE_FILE}: {err}"),
    }
    Ok(())
}

struct Graphics {
    renderer: Renderer,
    overlay: DebugOverlay,
}

struct App {
    context: AppContext,
    events: Vec<InputEvent>,
    graphics: Option<Graphics>,
    last_frame: Option<Instant>,
    last_error: Option<anyhow::Error>,
}

impl App {
    fn new(context: AppContext) -> Self {
        Self {
            context,
            events: Vec::new(),
            graphics: None,
            last_frame: None,
            last_error: None,
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("failed to create window")?,
        );
        info!("window created");

        let renderer = block_on(Renderer::new(Arc::clone(&window), &self.context.state))?;
        let overlay = DebugOverlay::new(&window, renderer.device(), renderer.surface_format());
        self.graphics = Some(Graphics { renderer, overlay });
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let now = Instant::now();
        let delta_time = self
            .last_frame
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32());
        self.last_frame = Some(now);

        for event in self.events.drain(..) {
            self.context.handle_event(event);
        }
        self.context.update(delta_time);

        let Some(graphics) = self.graphics.as_mut() else {
            return Ok(());
        };
        if let Some(mode) = self.context.take_cursor_request() {
            apply_cursor_mode(graphics.renderer.window(), mode);
        }

        let frame = self.context.state.overlay_enabled.then(|| {
            graphics
                .overlay
                .run(graphics.renderer.window(), &mut self.context.state)
        });
        let overlay = frame.map(|frame| (&mut graphics.overlay, frame));
        match graphics.renderer.render(&self.context.state, overlay) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = graphics.renderer.window().inner_size();
                graphics.renderer.resize(size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow!("GPU is out of memory"));
            }
            Err(wgpu::SurfaceError::Timeout) => {
                info!("Surface timeout; retrying next frame");
            }
            Err(err) => error!("failed to acquire frame: {err}"),
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }
        if let Err(err) = self.init_graphics(event_loop) {
            self.last_error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(graphics) = self.graphics.as_mut() else {
            return;
        };
        if window_id != graphics.renderer.window_id() {
            return;
        }
        // egui queues every event it sees until the next overlay frame, so a
        // hidden overlay must not see any.
        let overlay_owns_input = self.context.overlay_receives_input()
            && graphics
                .overlay
                .handle_window_event(graphics.renderer.window(), &event);

        match event {
            WindowEvent::CloseRequested => self.events.push(InputEvent::CloseRequested),
            WindowEvent::Resized(size) => graphics.renderer.resize(size),
            WindowEvent::Focused(false) => self.context.release_all_keys(),
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(input) = key_event(&event, overlay_owns_input) {
                    self.events.push(input);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                self.events.push(InputEvent::CursorMoved(position));
            }
            WindowEvent::MouseWheel { delta, .. } if !overlay_owns_input => {
                self.events.push(InputEvent::Scrolled(scroll_lines(delta)));
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.last_error = Some(err);
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if self.graphics.is_none() {
            return;
        }
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.events
                .push(InputEvent::MouseMotion(Vec2::new(dx as f32, dy as f32)));
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.should_quit() {
            event_loop.exit();
            return;
        }
        if let Some(graphics) = &self.graphics {
            graphics.renderer.window().request_redraw();
        }
    }
}

fn key_event(event: &KeyEvent, overlay_owns_input: bool) -> Option<InputEvent> {
    key_input(event.physical_key, event.state, event.repeat, overlay_owns_input)
}

/// Presses the overlay consumed are dropped; releases always pass so no key
/// stays held behind the overlay's back.
fn key_input(
    key: PhysicalKey,
    state: ElementState,
    repeat: bool,
    overlay_owns_input: bool,
) -> Option<InputEvent> {
    if repeat {
        return None;
    }
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    let key = map_keycode(code)?;
    match state {
        ElementState::Pressed if overlay_owns_input => None,
        ElementState::Pressed => Some(InputEvent::KeyPressed(key)),
        ElementState::Released => Some(InputEvent::KeyReleased(key)),
    }
}

fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
    }
}

fn apply_cursor_mode(window: &Window, mode: CursorMode) {
    match mode {
        CursorMode::Locked => {
            let grabbed = window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
            if let Err(err) = grabbed {
                warn!("cursor grab unavailable: {err}");
            }
            window.set_cursor_visible(false);
        }
        CursorMode::Free => {
            if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
                warn!("failed to release cursor: {err}");
            }
            window.set_cursor_visible(true);
        }
    }
}

fn map_keycode(code: winit::keyboard::KeyCode) -> Option<KeyCode> {
    use winit::keyboard::KeyCode as Key;
    Some(match code {
        Key::Space => KeyCode::Named(NamedKey::Space),
        Key::ArrowLeft => KeyCode::Named(NamedKey::Left),
        Key::ArrowRight => KeyCode::Named(NamedKey::Right),
        Key::ArrowUp => KeyCode::Named(NamedKey::Up),
        Key::ArrowDown => KeyCode::Named(NamedKey::Down),
        Key::Escape => KeyCode::Named(NamedKey::Escape),
        Key::KeyW => KeyCode::Character('W'),
        Key::KeyA => KeyCode::Character('A'),
        Key::KeyS => KeyCode::Character('S'),
        Key::KeyD => KeyCode::Character('D'),
        Key::KeyT => KeyCode::Character('T'),
        Key::KeyG => KeyCode::Character('G'),
        Key::KeyM => KeyCode::Character('M'),
        Key::KeyQ => KeyCode::Character('Q'),
        Key::KeyE => KeyCode::Character('E'),
        Key::F1 => KeyCode::Function(1),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn maps_bound_keys() {
        use winit::keyboard::KeyCode as Key;
        assert_eq!(map_keycode(Key::KeyW), Some(KeyCode::Character('W')));
        assert_eq!(map_keycode(Key::F1), Some(KeyCode::Function(1)));
        assert_eq!(map_keycode(Key::ArrowUp), Some(KeyCode::Named(NamedKey::Up)));
        assert_eq!(map_keycode(Key::KeyZ), None);
    }

    #[test]
    fn overlay_drops_presses_but_not_releases() {
        use winit::keyboard::KeyCode as Key;
        let w = PhysicalKey::Code(Key::KeyW);
        assert_eq!(key_input(w, ElementState::Pressed, false, true), None);
        assert_eq!(
            key_input(w, ElementState::Released, false, true),
            Some(InputEvent::KeyReleased(KeyCode::Character('W')))
        );
        assert_eq!(
            key_input(w, ElementState::Pressed, false, false),
            Some(InputEvent::KeyPressed(KeyCode::Character('W')))
        );
        assert_eq!(key_input(w, ElementState::Pressed, true, false), None);
    }

    #[test]
    fn pixel_scroll_converts_to_lines() {
        assert_eq!(scroll_lines(MouseScrollDelta::LineDelta(0.0, -2.0)), -2.0);
        let pixels = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 76.0));
        assert_eq!(scroll_lines(pixels), 2.0);
    }
}
