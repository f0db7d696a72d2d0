use corgi_meadow::{
    AppContext, CursorMode, InputEvent, KeyCode, NamedKey, ProgramState, TextureImage,
};
use glam::{Vec2, Vec3};

fn tap(ctx: &mut AppContext, key: KeyCode) {
    ctx.handle_event(InputEvent::KeyPressed(key));
    ctx.handle_event(InputEvent::KeyReleased(key));
}

#[test]
fn holding_forward_for_one_second_moves_speed_units() {
    let mut ctx = AppContext::new(ProgramState::default());
    let start = ctx.state.camera.position;
    let front = ctx.state.camera.front();
    let (yaw, pitch) = (ctx.state.camera.yaw(), ctx.state.camera.pitch());

    ctx.handle_event(InputEvent::KeyPressed(KeyCode::Character('W')));
    ctx.update(1.0);

    let moved = ctx.state.camera.position - start;
    assert!(moved.abs_diff_eq(front * 2.5, 1e-5), "moved {moved}");
    assert!(moved.abs_diff_eq(Vec3::new(0.0, 0.0, -2.5), 1e-5));
    assert_eq!(ctx.state.camera.yaw(), yaw);
    assert_eq!(ctx.state.camera.pitch(), pitch);

    ctx.handle_event(InputEvent::KeyReleased(KeyCode::Character('W')));
    let stopped = ctx.state.camera.position;
    ctx.update(1.0);
    assert_eq!(ctx.state.camera.position, stopped);
}

#[test]
fn doubling_frame_time_doubles_displacement() {
    let displacement = |dt: f32| {
        let mut ctx = AppContext::new(ProgramState::default());
        let start = ctx.state.camera.position;
        ctx.handle_event(InputEvent::KeyPressed(KeyCode::Character('D')));
        ctx.update(dt);
        (ctx.state.camera.position - start).length()
    };
    assert!((displacement(0.2) - 2.0 * displacement(0.1)).abs() < 1e-5);
}

fn motion(ctx: &mut AppContext, dx: f32, dy: f32) {
    ctx.handle_event(InputEvent::MouseMotion(Vec2::new(dx, dy)));
}

#[test]
fn overlay_toggle_frees_cursor_and_pauses_mouse_look() {
    let mut ctx = AppContext::new(ProgramState::default());
    assert_eq!(ctx.take_cursor_request(), Some(CursorMode::Locked));

    motion(&mut ctx, 0.0, 0.0);
    tap(&mut ctx, KeyCode::Function(1));
    assert!(ctx.state.overlay_enabled);
    assert!(!ctx.state.camera_mouse_update);
    assert_eq!(ctx.cursor_mode(), CursorMode::Free);
    assert_eq!(ctx.take_cursor_request(), Some(CursorMode::Free));

    let yaw = ctx.state.camera.yaw();
    ctx.handle_event(InputEvent::CursorMoved(Vec2::new(400.0, 300.0)));
    ctx.handle_event(InputEvent::CursorMoved(Vec2::new(600.0, 100.0)));
    motion(&mut ctx, 200.0, 0.0);
    assert_eq!(ctx.state.camera.yaw(), yaw);

    tap(&mut ctx, KeyCode::Function(1));
    assert!(!ctx.state.overlay_enabled);
    assert!(ctx.state.camera_mouse_update);
    assert_eq!(ctx.cursor_mode(), CursorMode::Locked);
    assert_eq!(ctx.take_cursor_request(), Some(CursorMode::Locked));

    // The first motion after recapture must not jump the view.
    motion(&mut ctx, 500.0, 0.0);
    assert_eq!(ctx.state.camera.yaw(), yaw);
    motion(&mut ctx, 10.0, 0.0);
    assert!((ctx.state.camera.yaw() - (yaw + 1.0)).abs() < 1e-4);
}

#[test]
fn mouse_look_keeps_turning_past_window_edge() {
    let mut ctx = AppContext::new(ProgramState::default());
    motion(&mut ctx, 0.0, 0.0);
    let yaw = ctx.state.camera.yaw();
    for _ in 0..100 {
        motion(&mut ctx, 50.0, 0.0);
    }
    assert!((ctx.state.camera.yaw() - (yaw + 500.0)).abs() < 1e-2);
}

#[test]
fn pitch_stays_clamped_under_mouse_and_keys() {
    let mut ctx = AppContext::new(ProgramState::default());
    motion(&mut ctx, 0.0, 0.0);
    for _ in 1..50 {
        motion(&mut ctx, 0.0, -200.0);
    }
    assert!(ctx.state.camera.pitch() <= 89.0);
    ctx.handle_event(InputEvent::KeyPressed(KeyCode::Named(NamedKey::Down)));
    ctx.update(10.0);
    assert!(ctx.state.camera.pitch() >= -89.0);
}

#[test]
fn escape_and_close_both_quit() {
    let mut ctx = AppContext::new(ProgramState::default());
    tap(&mut ctx, KeyCode::Named(NamedKey::Escape));
    assert!(ctx.should_quit());

    let mut ctx = AppContext::new(ProgramState::default());
    ctx.handle_event(InputEvent::CloseRequested);
    assert!(ctx.should_quit());
}

#[test]
fn scroll_zooms_within_bounds() {
    let mut ctx = AppContext::new(ProgramState::default());
    ctx.handle_event(InputEvent::Scrolled(10.0));
    assert_eq!(ctx.state.camera.zoom(), 35.0);
    ctx.handle_event(InputEvent::Scrolled(100.0));
    assert_eq!(ctx.state.camera.zoom(), 1.0);
    ctx.handle_event(InputEvent::Scrolled(-100.0));
    assert_eq!(ctx.state.camera.zoom(), 45.0);
}

#[test]
fn missing_texture_yields_placeholder() {
    let texture = TextureImage::load_or_placeholder("resources/textures/nope.png", true);
    assert!(texture.placeholder);
    assert_eq!(texture.mips.len(), 1);
    assert_eq!(texture.mips[0].data, vec![255, 0, 255, 255]);
}
