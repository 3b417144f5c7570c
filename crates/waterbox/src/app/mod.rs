//! The interactive waterbox application: per-frame driver wiring the
//! MLS-MPM stepper, the density extractor, and the surface reconstructor
//! together. All UI-driven parameters are sampled into per-frame
//! snapshots before they reach the simulation.

pub mod camera;
pub mod env;
pub mod runner;
pub mod uniforms;

use std::sync::Arc;

use glam::{UVec3, Vec2, Vec3};
use winit::keyboard::KeyCode;

use mpm3d::constants::MAX_DT;
use mpm3d::{builtin_presets, InteractionInput, ScenePreset, SimulationConstants};

use crate::gpu::density::{padded_depth, GpuDensityField};
use crate::gpu::fluid_renderer::{RenderMode, ScreenSpaceFluidRenderer};
use crate::gpu::mpm::{GpuMpm, PARTICLE_STRIDE, POSVEL_STRIDE};
use crate::gpu::params::{EffectParams, MouseParams, VolumeParams};
use crate::gpu::GpuContext;
use camera::{OrbitCamera, PointerTracker};
use runner::App;
use uniforms::RenderUniforms;

/// World-space particle render radius.
const SPHERE_RADIUS: f32 = 0.6;
/// How hard the pointer drags the surface.
const POINTER_STRENGTH: f32 = 1.5;

pub struct WaterboxApp {
    camera: OrbitCamera,
    pointer: PointerTracker,

    presets: Vec<ScenePreset>,
    preset_index: usize,
    pending_preset: Option<usize>,

    running: bool,
    mode: RenderMode,
    speed: f32,
    box_width_ratio: f32,
    target_box_ratio: f32,
    closing_speed: f32,
    effect: EffectParams,

    num_particles: u32,
    init_box_size: Vec3,
    real_box_size: Vec3,
    interaction_radius: f32,

    render_uniform_buffer: Arc<wgpu::Buffer>,
    depth_map_view: wgpu::TextureView,
    env_view: wgpu::TextureView,

    mpm: GpuMpm,
    density: GpuDensityField,
    renderer: ScreenSpaceFluidRenderer,
}

fn create_depth_map(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("depth map"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
        .create_view(&Default::default())
}

/// Scene presets: the built-in table, or a JSON override supplied via
/// `WATERBOX_PRESETS` (same serde shape as the built-ins).
fn load_presets() -> Vec<ScenePreset> {
    if let Ok(path) = std::env::var("WATERBOX_PRESETS") {
        match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| serde_json::from_str::<Vec<ScenePreset>>(&json).map_err(|e| e.to_string()))
        {
            Ok(presets) if !presets.is_empty() => {
                log::info!("loaded {} presets from {}", presets.len(), path);
                return presets;
            }
            Ok(_) => log::warn!("{} holds no presets, using built-ins", path),
            Err(e) => log::warn!("could not load presets from {}: {}", path, e),
        }
    }
    builtin_presets()
}

impl WaterboxApp {
    fn select_preset(&mut self, index: usize) {
        if index < self.presets.len() && index != self.preset_index {
            self.pending_preset = Some(index);
        }
    }

    fn apply_preset(&mut self, ctx: &GpuContext, index: usize) {
        let preset = self.presets[index].clone();
        let box_size = Vec3::from_array(preset.box_size);
        match self.mpm.reset(&ctx.queue, box_size, preset.particle_count) {
            Ok(placed) => {
                log::info!("preset '{}': {} particles", preset.name, placed);
                self.num_particles = placed as u32;
            }
            Err(e) => {
                log::error!("preset '{}' rejected: {}", preset.name, e);
                return;
            }
        }
        self.preset_index = index;
        self.init_box_size = box_size;
        self.real_box_size = box_size;
        self.interaction_radius = preset.interaction_radius;
        self.box_width_ratio = 1.0;
        self.target_box_ratio = 1.0;
        self.closing_speed = 0.0;
        self.camera.reset(
            preset.camera_distance,
            Vec3::new(box_size.x / 2.0, preset.camera_target_y, box_size.z / 2.0),
        );
    }
}

impl App for WaterboxApp {
    fn init(ctx: &GpuContext) -> Self {
        let presets = load_presets();
        let max_particles = mpm3d::params::max_particle_count(&presets);
        let max_grid = mpm3d::params::max_grid_count(&presets);
        let constants = SimulationConstants::default();

        let particle_buffer = Arc::new(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particles"),
            size: PARTICLE_STRIDE * max_particles as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        }));
        let posvel_buffer = Arc::new(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("posvel"),
            size: POSVEL_STRIDE * max_particles as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        let render_uniform_buffer = Arc::new(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("render uniforms"),
            size: std::mem::size_of::<RenderUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));

        let (width, height) = ctx.size;
        let depth_map_view = create_depth_map(&ctx.device, width, height);
        let env_view = env::create_environment_map(&ctx.device, &ctx.queue);

        let mpm = GpuMpm::new(
            &ctx.device,
            constants,
            max_particles,
            max_grid,
            particle_buffer.clone(),
            posvel_buffer.clone(),
            render_uniform_buffer.clone(),
            &depth_map_view,
        );

        // Density lattice: largest preset domain, z padded for the copy.
        let density_size = presets.iter().fold(UVec3::ZERO, |acc, p| {
            acc.max(UVec3::new(
                p.box_size[0].ceil() as u32,
                p.box_size[1].ceil() as u32,
                p.box_size[2].ceil() as u32,
            ))
        });
        let density_size = UVec3::new(
            density_size.x,
            density_size.y,
            padded_depth(density_size.z),
        );
        let density = GpuDensityField::new(
            &ctx.device,
            density_size,
            particle_buffer.clone(),
            mpm.params_buffer(),
        );
        density.prepare(&ctx.queue);

        let mut renderer = ScreenSpaceFluidRenderer::new(
            &ctx.device,
            ctx.surface_format(),
            posvel_buffer,
            render_uniform_buffer.clone(),
            &env_view,
            density.texture_view(),
        );
        renderer.resize(
            &ctx.device,
            width,
            height,
            &depth_map_view,
            &env_view,
            &render_uniform_buffer,
        );

        let camera = OrbitCamera::default();
        renderer.update_filter_params(&ctx.queue, height, camera.fov, SPHERE_RADIUS);

        let mut app = Self {
            camera,
            pointer: PointerTracker::default(),
            presets,
            preset_index: 0,
            pending_preset: None,
            running: true,
            mode: RenderMode::Filtered,
            speed: 0.8,
            box_width_ratio: 1.0,
            target_box_ratio: 1.0,
            closing_speed: 0.0,
            effect: EffectParams::default(),
            num_particles: 0,
            init_box_size: Vec3::ZERO,
            real_box_size: Vec3::ZERO,
            interaction_radius: 0.0,
            render_uniform_buffer,
            depth_map_view,
            env_view,
            mpm,
            density,
            renderer,
        };
        app.apply_preset(ctx, 0);
        app.renderer.set_effect(&ctx.queue, app.effect);
        app
    }

    fn update(&mut self, ctx: &GpuContext, _dt: f32) {
        if let Some(index) = self.pending_preset.take() {
            self.apply_preset(ctx, index);
        }

        // Animate the z wall toward its target with a capped closing
        // speed that ramps up over ~40 frames.
        if self.running {
            let max_closing = 0.007 * self.speed;
            self.closing_speed = (self.closing_speed + max_closing / 40.0).min(max_closing);
            let d = (self.box_width_ratio - self.target_box_ratio).min(self.closing_speed);
            self.box_width_ratio -= d;
            if d <= 0.0 {
                self.closing_speed = 0.0;
            }
        }
        self.real_box_size = Vec3::new(
            self.init_box_size.x,
            self.init_box_size.y,
            self.init_box_size.z * self.box_width_ratio,
        );
        self.mpm.set_box_size(self.real_box_size);
    }

    fn render(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) {
        let (width, height) = ctx.size;
        let uniforms =
            RenderUniforms::from_camera(&self.camera, width, height, 2.0 * SPHERE_RADIUS);
        ctx.queue
            .write_buffer(&self.render_uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        // Per-frame interaction snapshot.
        let pointer_uv = self.pointer.current;
        let pointer_vel = self.pointer.velocity();
        let aspect = width as f32 / height as f32;
        let (ray_origin, ray_dir) = self.camera.pointer_ray(pointer_uv, aspect);
        let velocity_world = self.camera.pointer_velocity_world(pointer_vel);
        let interacting =
            self.running && !self.pointer.dragging && pointer_vel.length_squared() > 0.0;

        let input = InteractionInput {
            pointer: pointer_uv,
            pointer_velocity: pointer_vel,
            radius: self.interaction_radius,
            dt: MAX_DT * self.speed,
            running: self.running,
        };
        let mouse = MouseParams {
            ray_origin: ray_origin.to_array(),
            radius: self.interaction_radius,
            ray_dir: ray_dir.to_array(),
            strength: POINTER_STRENGTH,
            velocity_world: velocity_world.to_array(),
            enabled: if interacting { 1.0 } else { 0.0 },
            pointer_uv: pointer_uv.to_array(),
            screen_size: [width as f32, height as f32],
        };
        self.mpm.prepare(&ctx.queue, &input, mouse);

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("simulation"),
                timestamp_writes: None,
            });
            self.mpm.encode(&mut pass, self.running);
            if self.mode == RenderMode::Volumetric {
                self.density.encode(&mut pass, self.num_particles);
            }
        }
        if self.mode == RenderMode::Volumetric {
            self.density.encode_copy(encoder);
            let size = self.density.size();
            self.renderer.set_volume(
                &ctx.queue,
                VolumeParams {
                    box_size: self.real_box_size.to_array(),
                    density_scale: 0.25,
                    grid_size: [size.x as f32, size.y as f32, size.z as f32],
                    step_count: 96.0,
                },
            );
        }

        self.renderer.render(
            encoder,
            view,
            &self.depth_map_view,
            self.mode,
            self.num_particles,
        );

        self.pointer.end_frame();
    }

    fn on_key(&mut self, key: KeyCode, pressed: bool) {
        if !pressed {
            return;
        }
        match key {
            KeyCode::KeyP => self.running = !self.running,
            KeyCode::KeyM => {
                self.mode = match self.mode {
                    RenderMode::Filtered => RenderMode::Spheres,
                    _ => RenderMode::Filtered,
                };
            }
            KeyCode::KeyV => {
                self.mode = match self.mode {
                    RenderMode::Volumetric => RenderMode::Filtered,
                    _ => RenderMode::Volumetric,
                };
            }
            KeyCode::Digit1 => self.select_preset(0),
            KeyCode::Digit2 => self.select_preset(1),
            KeyCode::Digit3 => self.select_preset(2),
            KeyCode::Digit4 => self.select_preset(3),
            KeyCode::ArrowLeft => {
                self.target_box_ratio = (self.target_box_ratio - 0.05).max(0.5);
            }
            KeyCode::ArrowRight => {
                self.target_box_ratio = (self.target_box_ratio + 0.05).min(1.0);
            }
            KeyCode::ArrowUp => self.speed = (self.speed + 0.1).min(1.0),
            KeyCode::ArrowDown => self.speed = (self.speed - 0.1).max(0.3),
            _ => {}
        }
    }

    fn on_resize(&mut self, ctx: &GpuContext) {
        let (width, height) = ctx.size;
        self.depth_map_view = create_depth_map(&ctx.device, width, height);
        self.mpm.rebind_depth_map(&ctx.device, &self.depth_map_view);
        self.renderer.resize(
            &ctx.device,
            width,
            height,
            &self.depth_map_view,
            &self.env_view,
            &self.render_uniform_buffer,
        );
        self.renderer
            .update_filter_params(&ctx.queue, height, self.camera.fov, SPHERE_RADIUS);
    }

    fn on_cursor_moved(&mut self, x: f32, y: f32) {
        self.pointer.set_position(Vec2::new(x, y));
    }

    fn on_mouse_button(&mut self, button: winit::event::MouseButton, pressed: bool) {
        if button == winit::event::MouseButton::Left {
            self.pointer.dragging = pressed;
        }
    }

    fn on_mouse_motion(&mut self, dx: f32, dy: f32) {
        if self.pointer.dragging {
            self.camera.on_mouse_drag(dx, dy);
        }
    }

    fn on_scroll(&mut self, delta: f32) {
        self.camera.on_scroll(delta);
    }

    fn title() -> &'static str {
        "waterbox"
    }
}
