//! Uniform buffer object definition for the model shaders.
//!
//! The structure must match the GLSL uniform block layout exactly. It uses
//! `#[repr(C)]` for predictable memory layout and implements `Pod` and
//! `Zeroable` for safe byte casting into the mapped uniform buffers.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Model-view-projection uniform data.
///
/// This structure matches the GLSL `UniformBufferObject` block (binding 0).
///
/// # Memory Layout
///
/// - Offset 0: model matrix (64 bytes)
/// - Offset 64: view matrix (64 bytes)
/// - Offset 128: projection matrix (64 bytes)
/// - Total size: 192 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct UniformBufferObject {
    /// Model matrix (object to world space).
    pub model: Mat4,
    /// View matrix (world to view space).
    pub view: Mat4,
    /// Projection matrix (view to clip space).
    pub proj: Mat4,
}

impl UniformBufferObject {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Computes the transform set for one animation step.
    ///
    /// The model spins about +Z at 90 degrees per second of total run time.
    /// The camera looks at the origin from `(2, 2, 2)` with +Z up. The
    /// projection is a 45 degree perspective over the swapchain aspect ratio
    /// with its Y axis flipped, since Vulkan clip space points Y down while
    /// the view math assumes Y up.
    pub fn new(elapsed_secs: f32, extent: vk::Extent2D) -> Self {
        let model = Mat4::from_rotation_z(elapsed_secs * 90.0_f32.to_radians());

        let view = Mat4::look_at_rh(Vec3::new(2.0, 2.0, 2.0), Vec3::ZERO, Vec3::Z);

        let aspect = extent.width as f32 / extent.height as f32;
        let mut proj = Mat4::perspective_rh(45.0_f32.to_radians(), aspect, 0.1, 10.0);
        proj.y_axis.y *= -1.0;

        Self { model, view, proj }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 800,
        height: 600,
    };

    #[test]
    fn test_ubo_size() {
        // 3 Mat4 (3 * 64) = 192 bytes
        assert_eq!(UniformBufferObject::SIZE, 192);
    }

    #[test]
    fn test_ubo_alignment() {
        // Verify proper alignment for GPU (Mat4 requires 16-byte alignment)
        assert_eq!(std::mem::align_of::<UniformBufferObject>(), 16);
    }

    #[test]
    fn test_model_starts_at_identity() {
        let ubo = UniformBufferObject::new(0.0, EXTENT);
        assert!(ubo.model.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn test_model_rotates_quarter_turn_per_second() {
        // After one second the rotation is 90 degrees about +Z, so the
        // X axis maps onto the Y axis.
        let ubo = UniformBufferObject::new(1.0, EXTENT);
        let rotated = ubo.model.transform_vector3(Vec3::X);
        assert!(rotated.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn test_projection_y_axis_is_flipped() {
        let ubo = UniformBufferObject::new(0.0, EXTENT);
        // An un-flipped right-handed perspective matrix has a positive
        // [1][1] entry; the Vulkan correction negates it.
        assert!(ubo.proj.y_axis.y < 0.0);
    }

    #[test]
    fn test_view_places_eye_at_origin_of_view_space() {
        let ubo = UniformBufferObject::new(0.0, EXTENT);
        let eye_in_view = ubo.view.transform_point3(Vec3::new(2.0, 2.0, 2.0));
        assert!(eye_in_view.abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn test_ubo_pod_round_trip() {
        let ubo = UniformBufferObject::new(0.5, EXTENT);
        let bytes: &[u8] = bytemuck::bytes_of(&ubo);
        assert_eq!(bytes.len(), UniformBufferObject::SIZE);

        let back: &UniformBufferObject = bytemuck::from_bytes(bytes);
        assert_eq!(back.model, ubo.model);
        assert_eq!(back.proj, ubo.proj);
    }
}
