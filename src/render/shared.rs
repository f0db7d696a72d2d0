use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};

use crate::model::ModelVertex;

use super::common::FrameParams;

pub(crate) const MODEL_SHADER: &str = include_str!("../../resources/shaders/model.wgsl");
pub(crate) const BILLBOARD_SHADER: &str = include_str!("../../resources/shaders/billboard.wgsl");
pub(crate) const SKYBOX_SHADER: &str = include_str!("../../resources/shaders/skybox.wgsl");
pub(crate) const TONEMAP_SHADER: &str = include_str!("../../resources/shaders/tonemap.wgsl");

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct FrameUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    sky_view: [[f32; 4]; 4],
    view_position: [f32; 4],
    light_position: [f32; 4],
    light_ambient: [f32; 4],
    light_diffuse: [f32; 4],
    light_specular: [f32; 4],
    light_terms: [f32; 4],
}

impl From<&FrameParams> for FrameUniform {
    fn from(params: &FrameParams) -> Self {
        let light = &params.light;
        Self {
            view: params.view.to_cols_array_2d(),
            projection: params.projection.to_cols_array_2d(),
            sky_view: params.sky_view().to_cols_array_2d(),
            view_position: params.eye.extend(1.0).into(),
            light_position: light.position.extend(1.0).into(),
            light_ambient: light.ambient.extend(0.0).into(),
            light_diffuse: light.diffuse.extend(0.0).into(),
            light_specular: light.specular.extend(0.0).into(),
            light_terms: [light.constant, light.linear, light.quadratic, light.shininess],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct ObjectUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
}

impl ObjectUniform {
    pub(crate) fn new(model: Mat4) -> Self {
        let normal = Mat3::from_mat4(model).inverse().transpose();
        Self {
            model: model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct ToneUniform {
    pub exposure: f32,
    pub mode: u32,
    _pad: [u32; 2],
}

impl ToneUniform {
    pub(crate) fn new(exposure: f32, mode: u32) -> Self {
        Self {
            exposure,
            mode,
            _pad: [0; 2],
        }
    }
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct SpriteVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

const fn model_vertex(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> ModelVertex {
    ModelVertex {
        position,
        normal,
        uv,
    }
}

const fn sprite_vertex(position: [f32; 3], uv: [f32; 2]) -> SpriteVertex {
    SpriteVertex { position, uv }
}

/// Ground quad at y = -0.5, counter-clockwise seen from above, uv tiled 10x.
pub(crate) const GROUND_VERTICES: [ModelVertex; 6] = [
    model_vertex([500.0, -0.5, 500.0], [0.0, 1.0, 0.0], [10.0, 0.0]),
    model_vertex([500.0, -0.5, -500.0], [0.0, 1.0, 0.0], [10.0, 10.0]),
    model_vertex([-500.0, -0.5, -500.0], [0.0, 1.0, 0.0], [0.0, 10.0]),
    model_vertex([500.0, -0.5, 500.0], [0.0, 1.0, 0.0], [10.0, 0.0]),
    model_vertex([-500.0, -0.5, -500.0], [0.0, 1.0, 0.0], [0.0, 10.0]),
    model_vertex([-500.0, -0.5, 500.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
];

/// Unit billboard spanning x in [0, 1] and y in [-0.5, 0.5]; v = 0 is the
/// top edge of the image.
pub(crate) const BILLBOARD_VERTICES: [SpriteVertex; 6] = [
    sprite_vertex([0.0, 0.5, 0.0], [0.0, 0.0]),
    sprite_vertex([0.0, -0.5, 0.0], [0.0, 1.0]),
    sprite_vertex([1.0, -0.5, 0.0], [1.0, 1.0]),
    sprite_vertex([0.0, 0.5, 0.0], [0.0, 0.0]),
    sprite_vertex([1.0, -0.5, 0.0], [1.0, 1.0]),
    sprite_vertex([1.0, 0.5, 0.0], [1.0, 0.0]),
];

pub(crate) const SKYBOX_VERTICES: [[f32; 3]; 36] = [
    // -z
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    // -x
    [-1.0, -1.0, 1.0],
    [-1.0, -1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, -1.0, 1.0],
    // +x
    [1.0, -1.0, -1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [1.0, 1.0, -1.0],
    [1.0, -1.0, -1.0],
    // +z
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [1.0, -1.0, 1.0],
    [-1.0, -1.0, 1.0],
    // +y
    [-1.0, 1.0, -1.0],
    [1.0, 1.0, -1.0],
    [1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0],
    // -y
    [-1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
];

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn uniform_sizes_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<FrameUniform>(), 288);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 112);
        assert_eq!(std::mem::size_of::<ToneUniform>(), 16);
        assert_eq!(std::mem::size_of::<ModelVertex>(), 32);
        assert_eq!(std::mem::size_of::<SpriteVertex>(), 20);
    }

    #[test]
    fn ground_faces_up() {
        for triangle in GROUND_VERTICES.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| Vec3::from(triangle[i].position));
            // Counter-clockwise seen from +y means the winding normal points up.
            assert!((b - a).cross(c - a).y > 0.0);
        }
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let uniform = ObjectUniform::new(Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0)));
        assert_eq!(uniform.normal[0][0], 0.5);
        assert_eq!(uniform.normal[1][1], 1.0);
    }

    fn validate(name: &str, source: &str) {
        let module = naga::front::wgsl::parse_str(source)
            .unwrap_or_else(|err| panic!("{name}: {}", err.emit_to_string(source)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        )
        .validate(&module)
        .unwrap_or_else(|err| panic!("{name}: {err:?}"));
    }

    #[test]
    fn shipped_shaders_validate() {
        validate("model", MODEL_SHADER);
        validate("billboard", BILLBOARD_SHADER);
        validate("skybox", SKYBOX_SHADER);
        validate("tonemap", TONEMAP_SHADER);
    }
}
