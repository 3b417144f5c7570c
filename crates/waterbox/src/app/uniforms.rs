//! The shared render-uniform block.
//!
//! 272 bytes, consumed every frame by both the renderer and the
//! grid-update stage's pointer gate. The layout is a bit-for-bit
//! contract: `texel_size` at 0, `sphere_size` at 8, then the four
//! matrices at 16/80/144/208 as 4-byte little-endian floats with no
//! trailing padding.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use super::camera::OrbitCamera;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct RenderUniforms {
    pub texel_size: [f32; 2],
    pub sphere_size: [f32; 2],
    pub inv_projection: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub inv_view: [[f32; 4]; 4],
}

impl RenderUniforms {
    pub fn from_camera(
        camera: &OrbitCamera,
        width: u32,
        height: u32,
        sphere_diameter: f32,
    ) -> Self {
        let aspect = width as f32 / height as f32;
        let projection = camera.projection_matrix(aspect);
        let view = camera.view_matrix();
        Self {
            texel_size: [1.0 / width as f32, 1.0 / height as f32],
            sphere_size: [sphere_diameter, sphere_diameter],
            inv_projection: projection.inverse().to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            inv_view: view.inverse().to_cols_array_2d(),
        }
    }

    pub fn view_mat(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_uniform_block_is_272_bytes() {
        assert_eq!(size_of::<RenderUniforms>(), 272);
        assert_eq!(offset_of!(RenderUniforms, texel_size), 0);
        assert_eq!(offset_of!(RenderUniforms, sphere_size), 8);
        assert_eq!(offset_of!(RenderUniforms, inv_projection), 16);
        assert_eq!(offset_of!(RenderUniforms, projection), 80);
        assert_eq!(offset_of!(RenderUniforms, view), 144);
        assert_eq!(offset_of!(RenderUniforms, inv_view), 208);
    }

    #[test]
    fn test_matrices_are_inverses() {
        let camera = OrbitCamera::default();
        let u = RenderUniforms::from_camera(&camera, 1280, 720, 1.2);
        let view = Mat4::from_cols_array_2d(&u.view);
        let inv_view = Mat4::from_cols_array_2d(&u.inv_view);
        let product = view * inv_view;
        for (i, col) in product.to_cols_array_2d().iter().enumerate() {
            for (j, v) in col.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < 1e-4, "view * inv_view != I");
            }
        }
    }
}
