use std::fs;

use corgi_meadow::ProgramState;
use glam::Vec3;

#[test]
fn save_then_load_round_trips_persisted_fields() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("program_state.txt");

    let mut state = ProgramState::default();
    state.clear_color = Vec3::new(0.2, 0.3, 0.4);
    state.overlay_enabled = true;
    state.camera.position = Vec3::new(1.0, -2.5, 7.25);
    assert!(state.camera.look_along(Vec3::new(1.0, 0.5, -1.0)));
    state.save(&path).expect("save state");

    let contents = fs::read_to_string(&path).expect("read state");
    assert_eq!(contents.lines().count(), 10);
    assert_eq!(contents.lines().nth(3), Some("1"));

    let loaded = ProgramState::load(&path);
    assert_eq!(loaded.clear_color, state.clear_color);
    assert!(loaded.overlay_enabled);
    assert_eq!(loaded.camera.position, state.camera.position);
    assert!(loaded.camera.front().abs_diff_eq(state.camera.front(), 1e-5));
    assert!((loaded.camera.yaw() - state.camera.yaw()).abs() < 1e-3);
    assert!((loaded.camera.pitch() - state.camera.pitch()).abs() < 1e-3);
}

#[test]
fn missing_file_keeps_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let loaded = ProgramState::load(dir.path().join("absent.txt"));
    assert_eq!(loaded, ProgramState::default());
}

#[test]
fn truncated_file_keeps_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("program_state.txt");
    fs::write(&path, "0.5\n0.5\n0.5\n1\n4\n").expect("write state");
    assert_eq!(ProgramState::load(&path), ProgramState::default());
}

#[test]
fn garbage_values_keep_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("program_state.txt");
    fs::write(&path, "0.5\n0.5\nblue\n1\n4\n4\n4\n0\n0\n-1\n").expect("write state");
    assert_eq!(ProgramState::load(&path), ProgramState::default());
}

#[test]
fn unwritable_path_reports_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("missing-dir").join("program_state.txt");
    assert!(ProgramState::default().save(path).is_err());
}
