//! Per-frame uniform data: the model/view/projection block.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Uniform block consumed by the vertex shader at set 0, binding 0.
///
/// Column-major 4x4 matrices; the layout matches std140 (three mat4s, no
/// padding required).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SceneUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

/// Rotation speed of the mesh, in degrees per second.
const ROTATION_DEG_PER_SEC: f32 = 90.0;

/// Camera position; looks at the origin with +Z up.
const EYE: Vec3 = Vec3::new(2.0, 2.0, 2.0);

const FOV_Y_DEG: f32 = 45.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 10.0;

impl SceneUniforms {
    /// Build the uniforms for a frame.
    ///
    /// `elapsed_secs` is time since renderer start; `width`/`height` is the
    /// current swapchain extent, used for the aspect ratio.
    pub fn for_frame(elapsed_secs: f32, width: u32, height: u32) -> Self {
        let angle = elapsed_secs * ROTATION_DEG_PER_SEC.to_radians();
        let model = Mat4::from_rotation_z(angle);

        let view = Mat4::look_at_rh(EYE, Vec3::ZERO, Vec3::Z);

        let aspect = width as f32 / height.max(1) as f32;
        let mut projection =
            Mat4::perspective_rh(FOV_Y_DEG.to_radians(), aspect, Z_NEAR, Z_FAR);
        // Vulkan clip space has +Y pointing down.
        projection.y_axis.y *= -1.0;

        Self {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
        }
    }

    /// Size of the uniform block in bytes.
    pub const fn size() -> u64 {
        std::mem::size_of::<SceneUniforms>() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================
    // Layout
    // ============================================================

    #[test]
    fn test_uniform_block_size() {
        // Three column-major mat4s, 64 bytes each.
        assert_eq!(SceneUniforms::size(), 192);
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 192);
    }

    #[test]
    fn test_uniforms_are_pod() {
        let ubo = SceneUniforms::for_frame(0.0, 800, 600);
        let bytes = bytemuck::bytes_of(&ubo);
        assert_eq!(bytes.len(), 192);
    }

    // ============================================================
    // Matrix conventions
    // ============================================================

    #[test]
    fn test_model_is_identity_at_time_zero() {
        let ubo = SceneUniforms::for_frame(0.0, 800, 600);
        let model = Mat4::from_cols_array_2d(&ubo.model);
        assert!(model.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn test_model_rotates_quarter_turn_per_second() {
        // 90 deg/s: after one second, +X maps to +Y.
        let ubo = SceneUniforms::for_frame(1.0, 800, 600);
        let model = Mat4::from_cols_array_2d(&ubo.model);
        let rotated = model.transform_vector3(Vec3::X);
        assert!(rotated.abs_diff_eq(Vec3::Y, 1e-5), "got {:?}", rotated);
    }

    #[test]
    fn test_projection_flips_y_for_vulkan() {
        let ubo = SceneUniforms::for_frame(0.0, 800, 600);
        // Column-major: [1][1] is the Y scale, negative after the flip.
        assert!(ubo.projection[1][1] < 0.0);
    }

    #[test]
    fn test_projection_tracks_aspect_ratio() {
        let wide = SceneUniforms::for_frame(0.0, 1600, 800);
        let tall = SceneUniforms::for_frame(0.0, 800, 1600);
        // X scale shrinks as the viewport widens.
        assert!(wide.projection[0][0] < tall.projection[0][0]);
    }

    #[test]
    fn test_view_moves_eye_to_origin() {
        let ubo = SceneUniforms::for_frame(0.0, 800, 600);
        let view = Mat4::from_cols_array_2d(&ubo.view);
        let eye_in_view = view.transform_point3(EYE);
        assert!(eye_in_view.abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn test_zero_height_does_not_divide_by_zero() {
        let ubo = SceneUniforms::for_frame(0.0, 800, 0);
        for column in ubo.projection.iter() {
            for value in column.iter() {
                assert!(value.is_finite());
            }
        }
    }
}
