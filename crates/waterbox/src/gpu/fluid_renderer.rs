//! Screen-space fluid surface reconstruction.
//!
//! One configurable pipeline with three modes:
//!
//! - `Filtered` (default): depth splat -> 4 iterations of separable
//!   edge-aware depth smoothing -> thickness splat + Gaussian -> speed
//!   channel Gaussian -> environment-lit composite.
//! - `Spheres`: particles as literal shaded spheres (diagnostic).
//! - `Volumetric`: raymarch of the density-field texture.
//!
//! Within a frame the depth splat precedes all depth filtering and every
//! filter precedes the composite; the thickness and speed chains are
//! independent of the depth chain but also complete before the
//! composite. The shared depth map doubles as the surface gate for the
//! simulation's pointer force.

use std::sync::Arc;

use super::params::{DepthFilterParams, EffectParams, GaussianParams, VolumeParams};
use super::shader_sources;
use super::{sampler_entry, storage_entry, texture_entry, uniform_entry};

/// Which reconstruction the frame uses; toggled externally.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Filtered,
    Spheres,
    Volumetric,
}

/// Clear value for depth targets: far enough that any splat wins.
const DEPTH_CLEAR: f64 = 1.0e6;
/// Iteration counts for the separable filter chains.
const DEPTH_FILTER_ITERATIONS: usize = 4;
const THICKNESS_FILTER_ITERATIONS: usize = 1;
const SPEED_FILTER_ITERATIONS: usize = 3;
/// Cap on the depth-filter footprint in texels.
const MAX_FILTER_SIZE: i32 = 100;
const BLUR_FILTER_SIZE: f32 = 12.0;
const THICKNESS_FILTER_SIZE: i32 = 15;

/// Screen-sized resources, rebuilt on resize.
struct ScreenTargets {
    tmp_depth_view: wgpu::TextureView,
    speed_view: wgpu::TextureView,
    tmp_speed_view: wgpu::TextureView,
    thickness_view: wgpu::TextureView,
    tmp_thickness_view: wgpu::TextureView,
    hw_depth_view: wgpu::TextureView,
    // [x pass, y pass] per chain.
    depth_filter_bind_groups: [wgpu::BindGroup; 2],
    thickness_filter_bind_groups: [wgpu::BindGroup; 2],
    speed_filter_bind_groups: [wgpu::BindGroup; 2],
    composite_bind_group: wgpu::BindGroup,
}

pub struct ScreenSpaceFluidRenderer {
    depth_pipeline: wgpu::RenderPipeline,
    bilateral_pipeline: wgpu::RenderPipeline,
    thickness_pipeline: wgpu::RenderPipeline,
    gaussian_r16_pipeline: wgpu::RenderPipeline,
    gaussian_r32_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    sphere_pipeline: wgpu::RenderPipeline,
    raymarch_pipeline: wgpu::RenderPipeline,

    splat_bind_group: wgpu::BindGroup,
    raymarch_bind_group: wgpu::BindGroup,

    filter_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,

    dir_x_buffer: wgpu::Buffer,
    dir_y_buffer: wgpu::Buffer,
    depth_filter_buffer: wgpu::Buffer,
    thickness_gauss_buffer: wgpu::Buffer,
    speed_gauss_buffer: wgpu::Buffer,
    effect_buffer: wgpu::Buffer,
    volume_buffer: wgpu::Buffer,

    env_sampler: wgpu::Sampler,
    targets: Option<ScreenTargets>,
}

impl ScreenSpaceFluidRenderer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        posvel_buffer: Arc<wgpu::Buffer>,
        render_uniform_buffer: Arc<wgpu::Buffer>,
        env_view: &wgpu::TextureView,
        density_view: &wgpu::TextureView,
    ) -> Self {
        let fragment = wgpu::ShaderStages::FRAGMENT;
        let vertex_fragment = wgpu::ShaderStages::VERTEX_FRAGMENT;

        // Small fixed uniforms.
        let make_uniform = |label: &str, bytes: &[u8]| {
            use wgpu::util::DeviceExt;
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytes,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        };
        let dir_x_buffer = make_uniform("filter dir x", bytemuck::cast_slice(&[1.0f32, 0.0]));
        let dir_y_buffer = make_uniform("filter dir y", bytemuck::cast_slice(&[0.0f32, 1.0]));
        let depth_filter_buffer = make_uniform(
            "depth filter params",
            bytemuck::bytes_of(&DepthFilterParams {
                depth_threshold: 1.0,
                max_filter_size: MAX_FILTER_SIZE,
                projected_particle_constant: 1.0,
                _pad: 0.0,
            }),
        );
        let thickness_gauss_buffer = make_uniform(
            "thickness gaussian params",
            bytemuck::bytes_of(&GaussianParams {
                filter_size: THICKNESS_FILTER_SIZE,
                _pad0: 0,
                _pad1: 0,
                _pad2: 0,
            }),
        );
        let speed_gauss_buffer = make_uniform(
            "speed gaussian params",
            bytemuck::bytes_of(&GaussianParams {
                filter_size: 2,
                _pad0: 0,
                _pad1: 0,
                _pad2: 0,
            }),
        );
        let effect_buffer = make_uniform(
            "effect params",
            bytemuck::bytes_of(&EffectParams::default()),
        );
        let volume_buffer = make_uniform(
            "volume params",
            bytemuck::bytes_of(&VolumeParams {
                box_size: [1.0; 3],
                density_scale: 1.0,
                grid_size: [1.0; 3],
                step_count: 64.0,
            }),
        );

        let env_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("env sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Layouts.
        let splat_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("splat layout"),
            entries: &[
                storage_entry(0, wgpu::ShaderStages::VERTEX, true),
                uniform_entry(1, vertex_fragment),
                uniform_entry(2, vertex_fragment),
            ],
        });
        let filter_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("filter layout"),
            entries: &[
                texture_entry(0, fragment, wgpu::TextureViewDimension::D2, false),
                uniform_entry(1, fragment),
                uniform_entry(2, fragment),
            ],
        });
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite layout"),
            entries: &[
                texture_entry(0, fragment, wgpu::TextureViewDimension::D2, false),
                texture_entry(1, fragment, wgpu::TextureViewDimension::D2, false),
                texture_entry(2, fragment, wgpu::TextureViewDimension::D2, false),
                texture_entry(3, fragment, wgpu::TextureViewDimension::Cube, true),
                sampler_entry(4, fragment),
                uniform_entry(5, fragment),
                uniform_entry(6, fragment),
            ],
        });
        let raymarch_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("raymarch layout"),
            entries: &[
                texture_entry(0, fragment, wgpu::TextureViewDimension::D3, true),
                sampler_entry(1, fragment),
                texture_entry(2, fragment, wgpu::TextureViewDimension::Cube, true),
                sampler_entry(3, fragment),
                uniform_entry(4, fragment),
                uniform_entry(5, fragment),
                uniform_entry(6, fragment),
            ],
        });

        // Shader modules.
        let make_module = |label: &str, source: String| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        };
        let depth_module = make_module("depth map shader", shader_sources::depth_map());
        let bilateral_module = make_module("bilateral shader", shader_sources::bilateral());
        let thickness_module = make_module("thickness shader", shader_sources::thickness_map());
        let gaussian_module = make_module("gaussian shader", shader_sources::gaussian());
        let composite_module = make_module("composite shader", shader_sources::composite());
        let sphere_module = make_module("sphere shader", shader_sources::sphere());
        let raymarch_module = make_module("raymarch shader", shader_sources::raymarch());

        let make_layout = |label: &str, bind_layout: &wgpu::BindGroupLayout| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[bind_layout],
                push_constant_ranges: &[],
            })
        };

        let splat_depth_stencil = Some(wgpu::DepthStencilState {
            format: wgpu::TextureFormat::Depth32Float,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });
        let strip = wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            ..Default::default()
        };
        let r32_target = Some(wgpu::ColorTargetState {
            format: wgpu::TextureFormat::R32Float,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        });

        let depth_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("depth splat pipeline"),
            layout: Some(&make_layout("depth splat pipeline layout", &splat_layout)),
            vertex: wgpu::VertexState {
                module: &depth_module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &depth_module,
                entry_point: Some("fs_main"),
                targets: &[r32_target.clone(), r32_target.clone()],
                compilation_options: Default::default(),
            }),
            primitive: strip,
            depth_stencil: splat_depth_stencil.clone(),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sphere_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sphere pipeline"),
            layout: Some(&make_layout("sphere pipeline layout", &splat_layout)),
            vertex: wgpu::VertexState {
                module: &sphere_module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &sphere_module,
                entry_point: Some("fs_main"),
                targets: &[
                    Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                    r32_target.clone(),
                ],
                compilation_options: Default::default(),
            }),
            primitive: strip,
            depth_stencil: splat_depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let thickness_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("thickness pipeline"),
            layout: Some(&make_layout("thickness pipeline layout", &splat_layout)),
            vertex: wgpu::VertexState {
                module: &thickness_module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &thickness_module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::R16Float,
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                    }),
                    write_mask: wgpu::ColorWrites::RED,
                })],
                compilation_options: Default::default(),
            }),
            primitive: strip,
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let fullscreen_pipeline = |label: &str,
                                   module: &wgpu::ShaderModule,
                                   bind_layout: &wgpu::BindGroupLayout,
                                   format: wgpu::TextureFormat| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&make_layout(label, bind_layout)),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let bilateral_pipeline = fullscreen_pipeline(
            "bilateral pipeline",
            &bilateral_module,
            &filter_layout,
            wgpu::TextureFormat::R32Float,
        );
        let gaussian_r16_pipeline = fullscreen_pipeline(
            "gaussian r16 pipeline",
            &gaussian_module,
            &filter_layout,
            wgpu::TextureFormat::R16Float,
        );
        let gaussian_r32_pipeline = fullscreen_pipeline(
            "gaussian r32 pipeline",
            &gaussian_module,
            &filter_layout,
            wgpu::TextureFormat::R32Float,
        );
        let composite_pipeline = fullscreen_pipeline(
            "composite pipeline",
            &composite_module,
            &composite_layout,
            surface_format,
        );
        let raymarch_pipeline = fullscreen_pipeline(
            "raymarch pipeline",
            &raymarch_module,
            &raymarch_layout,
            surface_format,
        );

        let splat_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("splat bind group"),
            layout: &splat_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: posvel_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: render_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: effect_buffer.as_entire_binding(),
                },
            ],
        });
        let raymarch_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("raymarch bind group"),
            layout: &raymarch_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(density_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&env_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(env_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&env_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: render_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: effect_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: volume_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            depth_pipeline,
            bilateral_pipeline,
            thickness_pipeline,
            gaussian_r16_pipeline,
            gaussian_r32_pipeline,
            composite_pipeline,
            sphere_pipeline,
            raymarch_pipeline,
            splat_bind_group,
            raymarch_bind_group,
            filter_layout,
            composite_layout,
            dir_x_buffer,
            dir_y_buffer,
            depth_filter_buffer,
            thickness_gauss_buffer,
            speed_gauss_buffer,
            effect_buffer,
            volume_buffer,
            env_sampler,
            targets: None,
        }
    }

    /// Recreate the screen-sized targets and their bind groups. Also call
    /// after construction; `depth_map_view` is the shared splat depth
    /// texture, `env_view` the environment cubemap, and
    /// `render_uniform_buffer` the shared uniform block.
    #[allow(clippy::too_many_arguments)]
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
        depth_map_view: &wgpu::TextureView,
        env_view: &wgpu::TextureView,
        render_uniform_buffer: &wgpu::Buffer,
    ) {
        let make_target = |label: &str, w: u32, h: u32, format: wgpu::TextureFormat| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size: wgpu::Extent3d {
                        width: w.max(1),
                        height: h.max(1),
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                        | wgpu::TextureUsages::TEXTURE_BINDING,
                    view_formats: &[],
                })
                .create_view(&Default::default())
        };

        let tmp_depth_view = make_target("tmp depth map", width, height, wgpu::TextureFormat::R32Float);
        let speed_view = make_target("speed map", width, height, wgpu::TextureFormat::R32Float);
        let tmp_speed_view =
            make_target("tmp speed map", width, height, wgpu::TextureFormat::R32Float);
        // Thickness runs at half resolution; absorption is low frequency.
        let thickness_view = make_target(
            "thickness map",
            width / 2,
            height / 2,
            wgpu::TextureFormat::R16Float,
        );
        let tmp_thickness_view = make_target(
            "tmp thickness map",
            width / 2,
            height / 2,
            wgpu::TextureFormat::R16Float,
        );
        let hw_depth_view = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("splat depth test"),
                size: wgpu::Extent3d {
                    width: width.max(1),
                    height: height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Depth32Float,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&Default::default());

        let filter_bind_group = |label: &str,
                                 input: &wgpu::TextureView,
                                 dir: &wgpu::Buffer,
                                 params: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.filter_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(input),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: dir.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: params.as_entire_binding(),
                    },
                ],
            })
        };

        let depth_filter_bind_groups = [
            filter_bind_group(
                "depth filter x",
                depth_map_view,
                &self.dir_x_buffer,
                &self.depth_filter_buffer,
            ),
            filter_bind_group(
                "depth filter y",
                &tmp_depth_view,
                &self.dir_y_buffer,
                &self.depth_filter_buffer,
            ),
        ];
        let thickness_filter_bind_groups = [
            filter_bind_group(
                "thickness filter x",
                &thickness_view,
                &self.dir_x_buffer,
                &self.thickness_gauss_buffer,
            ),
            filter_bind_group(
                "thickness filter y",
                &tmp_thickness_view,
                &self.dir_y_buffer,
                &self.thickness_gauss_buffer,
            ),
        ];
        let speed_filter_bind_groups = [
            filter_bind_group(
                "speed filter x",
                &speed_view,
                &self.dir_x_buffer,
                &self.speed_gauss_buffer,
            ),
            filter_bind_group(
                "speed filter y",
                &tmp_speed_view,
                &self.dir_y_buffer,
                &self.speed_gauss_buffer,
            ),
        ];

        let composite_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite bind group"),
            layout: &self.composite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(depth_map_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&thickness_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&speed_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(env_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&self.env_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: render_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: self.effect_buffer.as_entire_binding(),
                },
            ],
        });

        self.targets = Some(ScreenTargets {
            tmp_depth_view,
            speed_view,
            tmp_speed_view,
            thickness_view,
            tmp_thickness_view,
            hw_depth_view,
            depth_filter_bind_groups,
            thickness_filter_bind_groups,
            speed_filter_bind_groups,
            composite_bind_group,
        });
    }

    /// Retune the screen-space filter footprints for a new viewport or
    /// particle size.
    pub fn update_filter_params(
        &self,
        queue: &wgpu::Queue,
        height: u32,
        fov: f32,
        particle_radius: f32,
    ) {
        let diameter = 2.0 * particle_radius;
        let projected =
            BLUR_FILTER_SIZE * diameter * 0.05 * (height as f32 / 2.0) / (fov / 2.0).tan();
        queue.write_buffer(
            &self.depth_filter_buffer,
            0,
            bytemuck::bytes_of(&DepthFilterParams {
                depth_threshold: particle_radius * 10.0,
                max_filter_size: MAX_FILTER_SIZE,
                projected_particle_constant: projected,
                _pad: 0.0,
            }),
        );
        let speed_size =
            ((0.2 * diameter * 0.05 * (height as f32 / 2.0) / (fov / 2.0).tan()) as i32).max(2);
        queue.write_buffer(
            &self.speed_gauss_buffer,
            0,
            bytemuck::bytes_of(&GaussianParams {
                filter_size: speed_size,
                _pad0: 0,
                _pad1: 0,
                _pad2: 0,
            }),
        );
    }

    pub fn set_effect(&self, queue: &wgpu::Queue, effect: EffectParams) {
        queue.write_buffer(&self.effect_buffer, 0, bytemuck::bytes_of(&effect));
    }

    pub fn set_volume(&self, queue: &wgpu::Queue, volume: VolumeParams) {
        queue.write_buffer(&self.volume_buffer, 0, bytemuck::bytes_of(&volume));
    }

    /// Record the reconstruction for one frame.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        depth_map_view: &wgpu::TextureView,
        mode: RenderMode,
        num_particles: u32,
    ) {
        let Some(targets) = &self.targets else {
            return;
        };
        if num_particles == 0 {
            return;
        }

        match mode {
            RenderMode::Filtered => {
                self.encode_depth_splat(encoder, targets, depth_map_view, num_particles);
                self.encode_depth_filter(encoder, targets, depth_map_view);
                self.encode_thickness(encoder, targets, num_particles);
                self.encode_speed_filter(encoder, targets);
                self.encode_composite(encoder, targets, surface_view);
            }
            RenderMode::Spheres => {
                self.encode_spheres(encoder, targets, surface_view, depth_map_view, num_particles);
            }
            RenderMode::Volumetric => {
                // The depth splat still runs so the pointer force keeps
                // its surface gate.
                self.encode_depth_splat(encoder, targets, depth_map_view, num_particles);
                self.encode_raymarch(encoder, surface_view);
            }
        }
    }

    fn encode_depth_splat(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &ScreenTargets,
        depth_map_view: &wgpu::TextureView,
        num_particles: u32,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("depth splat"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: depth_map_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: DEPTH_CLEAR,
                            g: 0.0,
                            b: 0.0,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &targets.speed_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.hw_depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.depth_pipeline);
        pass.set_bind_group(0, &self.splat_bind_group, &[]);
        pass.draw(0..4, 0..num_particles);
    }

    fn encode_depth_filter(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &ScreenTargets,
        depth_map_view: &wgpu::TextureView,
    ) {
        for _ in 0..DEPTH_FILTER_ITERATIONS {
            self.fullscreen_pass(
                encoder,
                "depth filter x",
                &self.bilateral_pipeline,
                &targets.depth_filter_bind_groups[0],
                &targets.tmp_depth_view,
            );
            self.fullscreen_pass(
                encoder,
                "depth filter y",
                &self.bilateral_pipeline,
                &targets.depth_filter_bind_groups[1],
                depth_map_view,
            );
        }
    }

    fn encode_thickness(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &ScreenTargets,
        num_particles: u32,
    ) {
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("thickness splat"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &targets.thickness_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.thickness_pipeline);
            pass.set_bind_group(0, &self.splat_bind_group, &[]);
            pass.draw(0..4, 0..num_particles);
        }
        for _ in 0..THICKNESS_FILTER_ITERATIONS {
            self.fullscreen_pass(
                encoder,
                "thickness filter x",
                &self.gaussian_r16_pipeline,
                &targets.thickness_filter_bind_groups[0],
                &targets.tmp_thickness_view,
            );
            self.fullscreen_pass(
                encoder,
                "thickness filter y",
                &self.gaussian_r16_pipeline,
                &targets.thickness_filter_bind_groups[1],
                &targets.thickness_view,
            );
        }
    }

    fn encode_speed_filter(&self, encoder: &mut wgpu::CommandEncoder, targets: &ScreenTargets) {
        for _ in 0..SPEED_FILTER_ITERATIONS {
            self.fullscreen_pass(
                encoder,
                "speed filter x",
                &self.gaussian_r32_pipeline,
                &targets.speed_filter_bind_groups[0],
                &targets.tmp_speed_view,
            );
            self.fullscreen_pass(
                encoder,
                "speed filter y",
                &self.gaussian_r32_pipeline,
                &targets.speed_filter_bind_groups[1],
                &targets.speed_view,
            );
        }
    }

    fn encode_composite(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &ScreenTargets,
        surface_view: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("composite"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.composite_pipeline);
        pass.set_bind_group(0, &targets.composite_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn encode_spheres(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &ScreenTargets,
        surface_view: &wgpu::TextureView,
        depth_map_view: &wgpu::TextureView,
        num_particles: u32,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("spheres"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.7,
                            g: 0.7,
                            b: 0.75,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: depth_map_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: DEPTH_CLEAR,
                            g: 0.0,
                            b: 0.0,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.hw_depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.sphere_pipeline);
        pass.set_bind_group(0, &self.splat_bind_group, &[]);
        pass.draw(0..4, 0..num_particles);
    }

    fn encode_raymarch(&self, encoder: &mut wgpu::CommandEncoder, surface_view: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("raymarch"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.raymarch_pipeline);
        pass.set_bind_group(0, &self.raymarch_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn fullscreen_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        target: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
