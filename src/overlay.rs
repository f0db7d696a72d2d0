//! Immediate-mode debug panels drawn over the scene.
//!
//! The panels edit [`ProgramState`] in place. Building the UI is kept
//! separate from the egui/wgpu plumbing so it can run against a bare
//! [`egui::Context`].

use std::ops::RangeInclusive;

use egui::{ClippedPrimitive, DragValue, TexturesDelta, Ui};
use glam::Vec3;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::config::MIN_EXPOSURE;
use crate::scene::SceneObjectTransform;
use crate::state::{PointLight, ProgramState, ToneMapOperator, ToneMapping};

pub const SCALE_RANGE: RangeInclusive<f32> = 0.01..=4.0;
pub const ANGLE_RANGE: RangeInclusive<f32> = -360.0..=360.0;
pub const ATTENUATION_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const EXPOSURE_RANGE: RangeInclusive<f32> = MIN_EXPOSURE..=10.0;

/// egui context plus its winit input adapter and wgpu painter.
pub struct DebugOverlay {
    context: egui::Context,
    input: egui_winit::State,
    painter: egui_wgpu::Renderer,
}

/// Tessellated output of one overlay frame, ready to paint.
pub struct OverlayFrame {
    primitives: Vec<ClippedPrimitive>,
    textures: TexturesDelta,
    pixels_per_point: f32,
}

impl DebugOverlay {
    pub fn new(window: &Window, device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let context = egui::Context::default();
        let input = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let painter = egui_wgpu::Renderer::new(device, format, None, 1, false);
        Self {
            context,
            input,
            painter,
        }
    }

    /// Feeds a window event to egui; true when egui wants it for itself.
    pub fn handle_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.input.on_window_event(window, event).consumed
    }

    /// Runs the panels for one frame.
    pub fn run(&mut self, window: &Window, state: &mut ProgramState) -> OverlayFrame {
        let raw_input = self.input.take_egui_input(window);
        let output = self.context.run(raw_input, |ctx| draw_panels(ctx, state));
        self.input
            .handle_platform_output(window, output.platform_output);
        let primitives = self
            .context
            .tessellate(output.shapes, output.pixels_per_point);
        OverlayFrame {
            primitives,
            textures: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        }
    }

    /// Encodes the overlay on top of `view`.
    ///
    /// Returns command buffers egui prepared for its own uploads; they must be
    /// submitted before `encoder`.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        frame: OverlayFrame,
        size_in_pixels: [u32; 2],
    ) -> Vec<wgpu::CommandBuffer> {
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: frame.pixels_per_point,
        };
        for (id, delta) in &frame.textures.set {
            self.painter.update_texture(device, queue, *id, delta);
        }
        let uploads = self
            .painter
            .update_buffers(device, queue, encoder, &frame.primitives, &screen);
        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("overlay-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.painter
                .render(&mut pass.forget_lifetime(), &frame.primitives, &screen);
        }
        for id in &frame.textures.free {
            self.painter.free_texture(id);
        }
        uploads
    }
}

/// The "Scene" and "Camera info" windows.
pub fn draw_panels(ctx: &egui::Context, state: &mut ProgramState) {
    egui::Window::new("Scene").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label("Clear color");
            let mut rgb = state.clear_color.to_array();
            if ui.color_edit_button_rgb(&mut rgb).changed() {
                state.clear_color = Vec3::from(rgb);
            }
        });
        for entry in &mut state.objects {
            ui.collapsing(entry.name, |ui| object_controls(ui, &mut entry.transform));
        }
        ui.collapsing("Point light", |ui| light_controls(ui, &mut state.point_light));
        ui.collapsing("Tone mapping", |ui| tone_controls(ui, &mut state.tone_mapping));
    });

    egui::Window::new("Camera info").show(ctx, |ui| {
        let camera = &state.camera;
        let p = camera.position;
        let f = camera.front();
        ui.label(format!("Position: ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z));
        ui.label(format!("(Yaw, Pitch): ({:.1}, {:.1})", camera.yaw(), camera.pitch()));
        ui.label(format!("Front: ({:.2}, {:.2}, {:.2})", f.x, f.y, f.z));
        ui.label(format!("Zoom: {:.1}", camera.zoom()));
        ui.checkbox(&mut state.camera_mouse_update, "Camera mouse update");
    });
}

fn object_controls(ui: &mut Ui, transform: &mut SceneObjectTransform) {
    drag_vec3(ui, "Position", &mut transform.position, 0.05, None);
    ui.horizontal(|ui| {
        ui.label("Scale");
        ui.add(DragValue::new(&mut transform.scale).speed(0.005).range(SCALE_RANGE));
    });
    drag_vec3(ui, "Rotation axis", &mut transform.rotation_axis, 0.05, None);
    ui.horizontal(|ui| {
        ui.label("Angle");
        ui.add(DragValue::new(&mut transform.angle).speed(0.5).range(ANGLE_RANGE));
    });
    ui.checkbox(&mut transform.visible, "Visible");
}

fn light_controls(ui: &mut Ui, light: &mut PointLight) {
    drag_vec3(ui, "Position", &mut light.position, 0.05, None);
    drag_vec3(ui, "Ambient", &mut light.ambient, 0.01, Some(0.0..=10.0));
    drag_vec3(ui, "Diffuse", &mut light.diffuse, 0.01, Some(0.0..=10.0));
    drag_vec3(ui, "Specular", &mut light.specular, 0.01, Some(0.0..=10.0));
    for (label, value) in [
        ("Constant", &mut light.constant),
        ("Linear", &mut light.linear),
        ("Quadratic", &mut light.quadratic),
    ] {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(DragValue::new(value).speed(0.001).range(ATTENUATION_RANGE));
        });
    }
    ui.horizontal(|ui| {
        ui.label("Shininess");
        ui.add(DragValue::new(&mut light.shininess).speed(0.5).range(1.0..=256.0));
    });
}

fn tone_controls(ui: &mut Ui, tone: &mut ToneMapping) {
    egui::ComboBox::from_label("Operator")
        .selected_text(tone.operator.label())
        .show_ui(ui, |ui| {
            for operator in ToneMapOperator::ALL {
                ui.selectable_value(&mut tone.operator, operator, operator.label());
            }
        });
    ui.horizontal(|ui| {
        ui.label("Exposure");
        ui.add(DragValue::new(&mut tone.exposure).speed(0.01).range(EXPOSURE_RANGE));
    });
}

fn drag_vec3(
    ui: &mut Ui,
    label: &str,
    value: &mut Vec3,
    speed: f64,
    range: Option<RangeInclusive<f32>>,
) {
    ui.horizontal(|ui| {
        ui.label(label);
        for component in [&mut value.x, &mut value.y, &mut value.z] {
            let mut drag = DragValue::new(component).speed(speed);
            if let Some(range) = &range {
                drag = drag.range(range.clone());
            }
            ui.add(drag);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_panels(state: &mut ProgramState) {
        let ctx = egui::Context::default();
        // Two passes: the first one only lays out the windows.
        for _ in 0..2 {
            let _ = ctx.run(egui::RawInput::default(), |ctx| draw_panels(ctx, state));
        }
    }

    #[test]
    fn panels_leave_state_alone_without_input() {
        let mut state = ProgramState::default();
        let before = state.clone();
        run_panels(&mut state);
        assert_eq!(state, before);
    }

    #[test]
    fn ranges_cover_defaults() {
        let state = ProgramState::default();
        for entry in &state.objects {
            assert!(SCALE_RANGE.contains(&entry.transform.scale), "{}", entry.name);
            assert!(ANGLE_RANGE.contains(&entry.transform.angle), "{}", entry.name);
        }
        let light = state.point_light;
        for value in [light.constant, light.linear, light.quadratic] {
            assert!(ATTENUATION_RANGE.contains(&value));
        }
        assert!(EXPOSURE_RANGE.contains(&state.tone_mapping.exposure));
    }
}
