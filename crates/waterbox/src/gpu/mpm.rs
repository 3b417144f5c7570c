//! GPU MLS-MPM stepper.
//!
//! Owns the fixed-point cell buffer and the six compute pipelines of one
//! timestep (clear, two scatter passes, grid update, gather, position
//! copy), dispatched back to back in a single compute pass. The particle
//! and posvel buffers are shared with the renderer and passed in at
//! construction. Semantics mirror `mpm3d::Simulation`.

use std::sync::Arc;

use mpm3d::grid::grid_count_for;
use mpm3d::{seed, InteractionInput, SimError, SimulationConstants};

use super::params::{MouseParams, SimParams};
use super::shader_sources;
use super::{storage_entry, texture_entry, uniform_entry};

const WORKGROUP_SIZE: u32 = 64;

/// Bytes per particle record (position, velocity, padded 3x3 C matrix).
pub const PARTICLE_STRIDE: u64 = 80;
/// Bytes per posvel record published for rendering.
pub const POSVEL_STRIDE: u64 = 32;
/// Bytes per grid cell (fixed-point mass + momentum).
pub const CELL_STRIDE: u64 = 16;

fn compute_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: String,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::ComputePipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
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
}

/// GPU port of the MLS-MPM step.
pub struct GpuMpm {
    max_particle_count: usize,
    max_grid_count: usize,
    constants: SimulationConstants,

    num_particles: u32,
    grid_count: u32,
    init_box_size: [f32; 3],
    real_box_size: [f32; 3],

    particle_buffer: Arc<wgpu::Buffer>,
    cell_buffer: wgpu::Buffer,
    params_buffer: Arc<wgpu::Buffer>,
    mouse_buffer: wgpu::Buffer,

    clear_pipeline: wgpu::ComputePipeline,
    p2g1_pipeline: wgpu::ComputePipeline,
    p2g2_pipeline: wgpu::ComputePipeline,
    update_grid_pipeline: wgpu::ComputePipeline,
    g2p_pipeline: wgpu::ComputePipeline,
    copy_position_pipeline: wgpu::ComputePipeline,

    clear_bind_group: wgpu::BindGroup,
    p2g1_bind_group: wgpu::BindGroup,
    p2g2_bind_group: wgpu::BindGroup,
    update_grid_bind_group: wgpu::BindGroup,
    g2p_bind_group: wgpu::BindGroup,
    copy_position_bind_group: wgpu::BindGroup,

    // Kept to rebuild the update-grid bind group when the depth map is
    // recreated on resize.
    update_grid_layout: wgpu::BindGroupLayout,
    render_uniform_buffer: Arc<wgpu::Buffer>,
}

impl GpuMpm {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        constants: SimulationConstants,
        max_particle_count: usize,
        max_grid_count: usize,
        particle_buffer: Arc<wgpu::Buffer>,
        posvel_buffer: Arc<wgpu::Buffer>,
        render_uniform_buffer: Arc<wgpu::Buffer>,
        depth_map_view: &wgpu::TextureView,
    ) -> Self {
        let cell_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mpm cells"),
            size: CELL_STRIDE * max_grid_count as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let params_buffer = Arc::new(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mpm params"),
            size: std::mem::size_of::<SimParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        let mouse_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mpm mouse"),
            size: std::mem::size_of::<MouseParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let compute = wgpu::ShaderStages::COMPUTE;

        // clear: cells + params
        let clear_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mpm clear layout"),
            entries: &[storage_entry(0, compute, false), uniform_entry(1, compute)],
        });
        // p2g passes: particles + cells + params
        let scatter_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mpm scatter layout"),
            entries: &[
                storage_entry(0, compute, true),
                storage_entry(1, compute, false),
                uniform_entry(2, compute),
            ],
        });
        // update grid: cells + params + mouse + render uniforms + depth map
        let update_grid_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("mpm update grid layout"),
                entries: &[
                    storage_entry(0, compute, false),
                    uniform_entry(1, compute),
                    uniform_entry(2, compute),
                    uniform_entry(3, compute),
                    texture_entry(4, compute, wgpu::TextureViewDimension::D2, false),
                ],
            });
        // g2p: particles (read_write) + cells (read) + params
        let g2p_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mpm g2p layout"),
            entries: &[
                storage_entry(0, compute, false),
                storage_entry(1, compute, true),
                uniform_entry(2, compute),
            ],
        });
        // copy position: particles + posvel + params
        let copy_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mpm copy position layout"),
            entries: &[
                storage_entry(0, compute, true),
                storage_entry(1, compute, false),
                uniform_entry(2, compute),
            ],
        });

        let clear_pipeline =
            compute_pipeline(device, "mpm clear grid", shader_sources::clear_grid(), &clear_layout);
        let p2g1_pipeline =
            compute_pipeline(device, "mpm p2g 1", shader_sources::p2g_1(), &scatter_layout);
        let p2g2_pipeline =
            compute_pipeline(device, "mpm p2g 2", shader_sources::p2g_2(), &scatter_layout);
        let update_grid_pipeline = compute_pipeline(
            device,
            "mpm update grid",
            shader_sources::update_grid(),
            &update_grid_layout,
        );
        let g2p_pipeline = compute_pipeline(device, "mpm g2p", shader_sources::g2p(), &g2p_layout);
        let copy_position_pipeline = compute_pipeline(
            device,
            "mpm copy position",
            shader_sources::copy_position(),
            &copy_layout,
        );

        let clear_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mpm clear bind group"),
            layout: &clear_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: cell_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });
        let scatter_entries = [
            wgpu::BindGroupEntry {
                binding: 0,
                resource: particle_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: cell_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: params_buffer.as_entire_binding(),
            },
        ];
        let p2g1_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mpm p2g 1 bind group"),
            layout: &scatter_layout,
            entries: &scatter_entries,
        });
        let p2g2_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mpm p2g 2 bind group"),
            layout: &scatter_layout,
            entries: &scatter_entries,
        });
        let update_grid_bind_group = Self::build_update_grid_bind_group(
            device,
            &update_grid_layout,
            &cell_buffer,
            &params_buffer,
            &mouse_buffer,
            &render_uniform_buffer,
            depth_map_view,
        );
        let g2p_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mpm g2p bind group"),
            layout: &g2p_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: particle_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: cell_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });
        let copy_position_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mpm copy position bind group"),
            layout: &copy_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: particle_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: posvel_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            max_particle_count,
            max_grid_count,
            constants,
            num_particles: 0,
            grid_count: 0,
            init_box_size: [0.0; 3],
            real_box_size: [0.0; 3],
            particle_buffer,
            cell_buffer,
            params_buffer,
            mouse_buffer,
            clear_pipeline,
            p2g1_pipeline,
            p2g2_pipeline,
            update_grid_pipeline,
            g2p_pipeline,
            copy_position_pipeline,
            clear_bind_group,
            p2g1_bind_group,
            p2g2_bind_group,
            update_grid_bind_group,
            g2p_bind_group,
            copy_position_bind_group,
            update_grid_layout,
            render_uniform_buffer,
        }
    }

    fn build_update_grid_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        cell_buffer: &wgpu::Buffer,
        params_buffer: &wgpu::Buffer,
        mouse_buffer: &wgpu::Buffer,
        render_uniform_buffer: &wgpu::Buffer,
        depth_map_view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mpm update grid bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: cell_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: mouse_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: render_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(depth_map_view),
                },
            ],
        })
    }

    /// The depth map is recreated on resize; rebuild the one bind group
    /// that samples it.
    pub fn rebind_depth_map(&mut self, device: &wgpu::Device, depth_map_view: &wgpu::TextureView) {
        self.update_grid_bind_group = Self::build_update_grid_bind_group(
            device,
            &self.update_grid_layout,
            &self.cell_buffer,
            &self.params_buffer,
            &self.mouse_buffer,
            &self.render_uniform_buffer,
            depth_map_view,
        );
    }

    /// Re-seed the dam break. Fails on a capacity violation before any
    /// buffer is written; under-packing degrades with a warning from the
    /// seeder. Returns the placed particle count.
    pub fn reset(
        &mut self,
        queue: &wgpu::Queue,
        box_size: glam::Vec3,
        particle_count: usize,
    ) -> Result<usize, SimError> {
        let grid_count = grid_count_for(box_size);
        if grid_count > self.max_grid_count {
            return Err(SimError::GridCapacityExceeded {
                grid_count,
                max_grid_count: self.max_grid_count,
            });
        }

        let requested = particle_count.min(self.max_particle_count);
        let particles = seed::dam_break(box_size, requested, &mut rand::thread_rng());
        let gpu_particles: Vec<mpm3d::GpuParticle> =
            particles.iter().copied().map(Into::into).collect();
        queue.write_buffer(
            &self.particle_buffer,
            0,
            bytemuck::cast_slice(&gpu_particles),
        );

        self.num_particles = particles.len() as u32;
        self.grid_count = grid_count as u32;
        self.init_box_size = box_size.to_array();
        self.real_box_size = box_size.to_array();
        Ok(particles.len())
    }

    /// Move the animated domain extent.
    pub fn set_box_size(&mut self, real_box_size: glam::Vec3) {
        self.real_box_size = real_box_size.to_array();
    }

    pub fn num_particles(&self) -> u32 {
        self.num_particles
    }

    pub fn grid_count(&self) -> u32 {
        self.grid_count
    }

    pub fn params_buffer(&self) -> Arc<wgpu::Buffer> {
        self.params_buffer.clone()
    }

    pub fn particle_buffer(&self) -> Arc<wgpu::Buffer> {
        self.particle_buffer.clone()
    }

    /// Upload the per-frame uniforms. Must precede `encode` within the
    /// frame.
    pub fn prepare(&self, queue: &wgpu::Queue, input: &InteractionInput, mouse: MouseParams) {
        let params = SimParams {
            init_box_size: self.init_box_size,
            _pad0: 0.0,
            real_box_size: self.real_box_size,
            num_particles: self.num_particles,
            grid_count: self.grid_count,
            dt: input.dt,
            stiffness: self.constants.stiffness,
            rest_density: self.constants.rest_density,
            dynamic_viscosity: self.constants.dynamic_viscosity,
            fixed_point_multiplier: self.constants.fixed_point_multiplier,
            fixed_point_multiplier_inv: self.constants.multiplier_inverse(),
            _pad1: 0.0,
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));
        queue.write_buffer(&self.mouse_buffer, 0, bytemuck::bytes_of(&mouse));
    }

    /// Record one timestep into `pass`. A paused frame records nothing:
    /// the posvel view keeps last frame's contents.
    pub fn encode(&self, pass: &mut wgpu::ComputePass<'_>, running: bool) {
        if !running || self.num_particles == 0 {
            return;
        }
        let particle_groups = self.num_particles.div_ceil(WORKGROUP_SIZE);
        let grid_groups = self.grid_count.div_ceil(WORKGROUP_SIZE);

        pass.set_pipeline(&self.clear_pipeline);
        pass.set_bind_group(0, &self.clear_bind_group, &[]);
        pass.dispatch_workgroups(grid_groups, 1, 1);

        pass.set_pipeline(&self.p2g1_pipeline);
        pass.set_bind_group(0, &self.p2g1_bind_group, &[]);
        pass.dispatch_workgroups(particle_groups, 1, 1);

        pass.set_pipeline(&self.p2g2_pipeline);
        pass.set_bind_group(0, &self.p2g2_bind_group, &[]);
        pass.dispatch_workgroups(particle_groups, 1, 1);

        pass.set_pipeline(&self.update_grid_pipeline);
        pass.set_bind_group(0, &self.update_grid_bind_group, &[]);
        pass.dispatch_workgroups(grid_groups, 1, 1);

        pass.set_pipeline(&self.g2p_pipeline);
        pass.set_bind_group(0, &self.g2p_bind_group, &[]);
        pass.dispatch_workgroups(particle_groups, 1, 1);

        pass.set_pipeline(&self.copy_position_pipeline);
        pass.set_bind_group(0, &self.copy_position_bind_group, &[]);
        pass.dispatch_workgroups(particle_groups, 1, 1);
    }
}
