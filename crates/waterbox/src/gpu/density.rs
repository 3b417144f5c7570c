//! GPU density-field extractor for volumetric shading.
//!
//! Three compute dispatches (clear, scatter, cast to packed f16) over a
//! lattice sized independently of the simulation grid, followed by a
//! buffer-to-texture copy into an `r16float` 3D texture the raymarch
//! pass samples. The z extent is rounded up to a multiple of 128 cells
//! so `bytes_per_row` (2 bytes per cell) meets the 256-byte copy
//! alignment rule.

use std::sync::Arc;

use glam::UVec3;

use super::params::DensityParams;
use super::shader_sources;
use super::{storage_entry, uniform_entry};

const WORKGROUP_SIZE: u32 = 64;

/// Round a z extent up for the texture copy alignment.
pub fn padded_depth(z: u32) -> u32 {
    z.div_ceil(128) * 128
}

pub struct GpuDensityField {
    size: UVec3,
    cell_count: u32,

    casted_buffer: wgpu::Buffer,
    dparams_buffer: wgpu::Buffer,
    texture: wgpu::Texture,
    texture_view: wgpu::TextureView,

    clear_pipeline: wgpu::ComputePipeline,
    scatter_pipeline: wgpu::ComputePipeline,
    cast_pipeline: wgpu::ComputePipeline,

    clear_bind_group: wgpu::BindGroup,
    scatter_bind_group: wgpu::BindGroup,
    cast_bind_group: wgpu::BindGroup,
}

impl GpuDensityField {
    /// `size` is the density lattice extent; `size.z` must already be
    /// padded via [`padded_depth`].
    pub fn new(
        device: &wgpu::Device,
        size: UVec3,
        particle_buffer: Arc<wgpu::Buffer>,
        sim_params_buffer: Arc<wgpu::Buffer>,
    ) -> Self {
        assert_eq!(size.z % 128, 0, "density depth must be copy-aligned");
        let cell_count = size.x * size.y * size.z;

        let density_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("density grid"),
            size: 4 * cell_count as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        // Two f16 cells per u32 word.
        let casted_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("density grid casted"),
            size: 2 * cell_count as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let dparams_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("density params"),
            size: std::mem::size_of::<DensityParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // The texture axes are (z, y, x) so rows follow the z-minor
        // buffer layout.
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("density grid texture"),
            size: wgpu::Extent3d {
                width: size.z,
                height: size.y,
                depth_or_array_layers: size.x,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: wgpu::TextureFormat::R16Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let texture_view = texture.create_view(&Default::default());

        let compute = wgpu::ShaderStages::COMPUTE;

        let clear_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("density clear layout"),
            entries: &[
                storage_entry(0, compute, false),
                storage_entry(1, compute, false),
                uniform_entry(2, compute),
            ],
        });
        let scatter_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("density scatter layout"),
            entries: &[
                storage_entry(0, compute, true),
                storage_entry(1, compute, false),
                uniform_entry(2, compute),
                uniform_entry(3, compute),
            ],
        });
        let cast_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("density cast layout"),
            entries: &[
                storage_entry(0, compute, true),
                storage_entry(1, compute, false),
                uniform_entry(2, compute),
                uniform_entry(3, compute),
            ],
        });

        let make_pipeline = |label: &str, source: String, layout: &wgpu::BindGroupLayout| {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
            let pipeline_layout =
                device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(label),
                    bind_group_layouts: &[layout],
                    push_constant_ranges: &[],
                });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        };

        let clear_pipeline = make_pipeline(
            "density clear",
            shader_sources::clear_density_grid(),
            &clear_layout,
        );
        let scatter_pipeline = make_pipeline(
            "density scatter",
            shader_sources::p2g_density(),
            &scatter_layout,
        );
        let cast_pipeline = make_pipeline(
            "density cast",
            shader_sources::cast_density_grid(),
            &cast_layout,
        );

        let clear_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("density clear bind group"),
            layout: &clear_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: density_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: casted_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: dparams_buffer.as_entire_binding(),
                },
            ],
        });
        let scatter_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("density scatter bind group"),
            layout: &scatter_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: particle_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: density_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: sim_params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: dparams_buffer.as_entire_binding(),
                },
            ],
        });
        let cast_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("density cast bind group"),
            layout: &cast_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: density_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: casted_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: sim_params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: dparams_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            size,
            cell_count,
            casted_buffer,
            dparams_buffer,
            texture,
            texture_view,
            clear_pipeline,
            scatter_pipeline,
            cast_pipeline,
            clear_bind_group,
            scatter_bind_group,
            cast_bind_group,
        }
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    pub fn texture_view(&self) -> &wgpu::TextureView {
        &self.texture_view
    }

    /// Upload the lattice extents; call once after construction.
    pub fn prepare(&self, queue: &wgpu::Queue) {
        let params = DensityParams {
            grid_size: [self.size.x as f32, self.size.y as f32, self.size.z as f32],
            cell_count: self.cell_count,
        };
        queue.write_buffer(&self.dparams_buffer, 0, bytemuck::bytes_of(&params));
    }

    /// Record clear, scatter, and cast into `pass`.
    pub fn encode(&self, pass: &mut wgpu::ComputePass<'_>, num_particles: u32) {
        let pair_groups = (self.cell_count / 2).div_ceil(WORKGROUP_SIZE);
        let particle_groups = num_particles.div_ceil(WORKGROUP_SIZE);

        pass.set_pipeline(&self.clear_pipeline);
        pass.set_bind_group(0, &self.clear_bind_group, &[]);
        pass.dispatch_workgroups(pair_groups, 1, 1);

        pass.set_pipeline(&self.scatter_pipeline);
        pass.set_bind_group(0, &self.scatter_bind_group, &[]);
        pass.dispatch_workgroups(particle_groups, 1, 1);

        pass.set_pipeline(&self.cast_pipeline);
        pass.set_bind_group(0, &self.cast_bind_group, &[]);
        pass.dispatch_workgroups(pair_groups, 1, 1);
    }

    /// Copy the casted lattice into the 3D texture. Recorded after the
    /// compute pass in the same encoder, so ordering is guaranteed.
    pub fn encode_copy(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_buffer_to_texture(
            wgpu::ImageCopyBuffer {
                buffer: &self.casted_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(self.size.z * 2),
                    rows_per_image: Some(self.size.y),
                },
            },
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: self.size.z,
                height: self.size.y,
                depth_or_array_layers: self.size.x,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_depth() {
        assert_eq!(padded_depth(60), 128);
        assert_eq!(padded_depth(128), 128);
        assert_eq!(padded_depth(129), 256);
    }
}
