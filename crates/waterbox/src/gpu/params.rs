//! `#[repr(C)]` parameter blocks shared with the WGSL shaders.
//!
//! Every struct here mirrors a WGSL uniform declaration; the explicit
//! `_pad` fields reproduce WGSL's vec3/vec4 alignment so the byte layout
//! matches without encase-style reflection. The tests pin the sizes the
//! shaders assume.

use bytemuck::{Pod, Zeroable};

/// Uniform block for the MLS-MPM compute stages.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SimParams {
    pub init_box_size: [f32; 3],
    pub _pad0: f32,
    pub real_box_size: [f32; 3],
    pub num_particles: u32,
    pub grid_count: u32,
    pub dt: f32,
    pub stiffness: f32,
    pub rest_density: f32,
    pub dynamic_viscosity: f32,
    pub fixed_point_multiplier: f32,
    pub fixed_point_multiplier_inv: f32,
    pub _pad1: f32,
}

/// Pointer interaction snapshot for the grid-update stage: the camera's
/// pointer ray plus the screen-space data for the depth gate.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct MouseParams {
    pub ray_origin: [f32; 3],
    pub radius: f32,
    pub ray_dir: [f32; 3],
    pub strength: f32,
    pub velocity_world: [f32; 3],
    pub enabled: f32,
    pub pointer_uv: [f32; 2],
    pub screen_size: [f32; 2],
}

/// Visual parameters shared by the splat, composite, and sphere passes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct EffectParams {
    pub diffuse_color: [f32; 3],
    pub color_density: f32,
    pub stretch_strength: f32,
    pub speed_whitening: f32,
    pub _pad0: f32,
    pub _pad1: f32,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            diffuse_color: [140.0 / 255.0, 220.0 / 255.0, 240.0 / 255.0],
            color_density: 0.7,
            stretch_strength: 0.6,
            speed_whitening: 0.08,
            _pad0: 0.0,
            _pad1: 0.0,
        }
    }
}

/// Constants for the edge-aware depth filter.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DepthFilterParams {
    pub depth_threshold: f32,
    pub max_filter_size: i32,
    pub projected_particle_constant: f32,
    pub _pad: f32,
}

/// Kernel half-width for the plain Gaussian chains.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct GaussianParams {
    pub filter_size: i32,
    pub _pad0: i32,
    pub _pad1: i32,
    pub _pad2: i32,
}

/// Extents of the density lattice.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DensityParams {
    pub grid_size: [f32; 3],
    pub cell_count: u32,
}

/// Raymarch parameters for the volumetric mode.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct VolumeParams {
    pub box_size: [f32; 3],
    pub density_scale: f32,
    pub grid_size: [f32; 3],
    pub step_count: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_sim_params_layout() {
        assert_eq!(size_of::<SimParams>(), 64);
        assert_eq!(offset_of!(SimParams, real_box_size), 16);
        assert_eq!(offset_of!(SimParams, num_particles), 28);
        assert_eq!(offset_of!(SimParams, fixed_point_multiplier_inv), 56);
    }

    #[test]
    fn test_mouse_params_layout() {
        assert_eq!(size_of::<MouseParams>(), 64);
        assert_eq!(offset_of!(MouseParams, ray_dir), 16);
        assert_eq!(offset_of!(MouseParams, velocity_world), 32);
        assert_eq!(offset_of!(MouseParams, pointer_uv), 48);
    }

    #[test]
    fn test_small_uniform_sizes() {
        assert_eq!(size_of::<EffectParams>(), 32);
        assert_eq!(size_of::<DepthFilterParams>(), 16);
        assert_eq!(size_of::<GaussianParams>(), 16);
        assert_eq!(size_of::<DensityParams>(), 16);
        assert_eq!(size_of::<VolumeParams>(), 32);
    }
}
