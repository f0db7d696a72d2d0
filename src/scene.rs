//! The scene table: which models are drawn, where, and with which pass.

use std::cmp::Ordering;

use glam::{Mat4, Vec3};

/// Pipeline a scene object is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderPass {
    /// Point-lit opaque geometry.
    Lit,
    /// Point-lit opaque geometry with banded (cel) diffuse.
    Toon,
    /// Alpha-tested, blended geometry drawn with the transparent content.
    Cutout,
}

/// Placement of one model in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneObjectTransform {
    pub position: Vec3,
    pub scale: f32,
    pub rotation_axis: Vec3,
    /// Rotation about `rotation_axis`, in degrees.
    pub angle: f32,
    pub visible: bool,
}

impl Default for SceneObjectTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: 1.0,
            rotation_axis: Vec3::Y,
            angle: 0.0,
            visible: true,
        }
    }
}

impl SceneObjectTransform {
    /// Composes translate, then scale, then rotate.
    pub fn model_matrix(&self) -> Mat4 {
        let translation = Mat4::from_translation(self.position);
        let scale = Mat4::from_scale(Vec3::splat(self.scale));
        let rotation = match self.rotation_axis.try_normalize() {
            Some(axis) if self.angle != 0.0 => {
                Mat4::from_axis_angle(axis, self.angle.to_radians())
            }
            _ => Mat4::IDENTITY,
        };
        translation * scale * rotation
    }
}

/// One row of the scene table.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneEntry {
    pub name: &'static str,
    pub model_path: &'static str,
    pub pass: ShaderPass,
    pub transform: SceneObjectTransform,
}

/// The placed models, in draw order within their pass.
pub fn default_scene() -> Vec<SceneEntry> {
    vec![
        SceneEntry {
            name: "Ship",
            model_path: "resources/objects/ship/StMaria.obj",
            pass: ShaderPass::Lit,
            transform: SceneObjectTransform {
                position: Vec3::new(-4.1, 2.141, 6.6),
                scale: 0.05,
                rotation_axis: Vec3::new(5.7, -173.5, -4.8),
                angle: 90.5,
                visible: true,
            },
        },
        SceneEntry {
            name: "Corgi",
            model_path: "resources/objects/corgi/corgi.obj",
            pass: ShaderPass::Toon,
            transform: SceneObjectTransform {
                position: Vec3::new(3.0, 0.0, 9.0),
                scale: 0.1,
                rotation_axis: Vec3::new(-2.6, -7.8, -7.7),
                angle: 155.45,
                visible: true,
            },
        },
        SceneEntry {
            name: "Cart",
            model_path: "resources/objects/cart/Cart.obj",
            pass: ShaderPass::Lit,
            transform: SceneObjectTransform {
                position: Vec3::new(-5.0, 0.0, 8.0),
                scale: 0.035,
                rotation_axis: Vec3::Y,
                angle: 0.0,
                visible: true,
            },
        },
        SceneEntry {
            name: "Mastiff",
            model_path: "resources/objects/mastiff/13458_Bullmastiff_v1_L3.obj",
            pass: ShaderPass::Lit,
            transform: SceneObjectTransform {
                position: Vec3::new(6.0, -0.5, 7.0),
                scale: 0.05,
                rotation_axis: Vec3::X,
                angle: -90.0,
                visible: true,
            },
        },
        SceneEntry {
            name: "Tree",
            model_path: "resources/objects/tree/Tree.obj",
            pass: ShaderPass::Cutout,
            transform: SceneObjectTransform {
                position: Vec3::new(-7.0, 0.0, 1.0),
                scale: 0.25,
                rotation_axis: Vec3::Y,
                angle: 0.0,
                visible: true,
            },
        },
    ]
}

/// Anchor points of the vegetation billboards.
pub const VEGETATION: [Vec3; 4] = [
    Vec3::new(-7.5, -0.1, -5.0),
    Vec3::new(3.0, -0.1, 0.0),
    Vec3::new(0.0, -0.1, 8.5),
    Vec3::new(-0.3, -0.1, -10.0),
];

/// Indices of `positions` ordered farthest-first from `eye`.
pub fn back_to_front(positions: &[Vec3], eye: Vec3) -> Vec<usize> {
    let mut order: Vec<usize> = (0..positions.len()).collect();
    order.sort_by(|&a, &b| {
        let da = positions[a].distance_squared(eye);
        let db = positions[b].distance_squared(eye);
        db.partial_cmp(&da).unwrap_or(Ordering::Equal)
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_table_has_every_object_once() {
        let scene = default_scene();
        let names: Vec<_> = scene.iter().map(|entry| entry.name).collect();
        assert_eq!(names, ["Ship", "Corgi", "Cart", "Mastiff", "Tree"]);
        let tree = scene.iter().find(|e| e.name == "Tree").unwrap();
        assert_eq!(tree.pass, ShaderPass::Cutout);
    }

    #[test]
    fn model_matrix_translates_then_scales() {
        let transform = SceneObjectTransform {
            position: Vec3::new(1.0, 2.0, 3.0),
            scale: 2.0,
            ..Default::default()
        };
        let point = transform.model_matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((point - Vec3::new(3.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn rotation_is_applied_before_scale_and_translation() {
        let transform = SceneObjectTransform {
            position: Vec3::new(0.0, 0.0, 5.0),
            scale: 3.0,
            rotation_axis: Vec3::new(0.0, 4.0, 0.0),
            angle: 90.0,
            visible: true,
        };
        let point = transform.model_matrix().transform_point3(Vec3::X);
        assert!((point - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn zero_axis_means_no_rotation() {
        let transform = SceneObjectTransform {
            rotation_axis: Vec3::ZERO,
            angle: 45.0,
            ..Default::default()
        };
        assert_eq!(transform.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn billboards_sort_farthest_first() {
        let eye = Vec3::new(0.0, 0.0, 10.0);
        let order = back_to_front(&VEGETATION, eye);
        assert_eq!(order, vec![3, 0, 1, 2]);
    }
}
