//! Winit application shell: window/event plumbing around an [`App`].

use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::gpu::GpuContext;

pub trait App: 'static {
    fn init(ctx: &GpuContext) -> Self;
    fn update(&mut self, ctx: &GpuContext, dt: f32);
    fn render(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    );

    fn on_key(&mut self, _key: KeyCode, _pressed: bool) {}
    fn on_resize(&mut self, _ctx: &GpuContext) {}
    /// Pointer position normalized to [0, 1] over the window.
    fn on_cursor_moved(&mut self, _x: f32, _y: f32) {}
    fn on_mouse_button(&mut self, _button: MouseButton, _pressed: bool) {}
    fn on_mouse_motion(&mut self, _dx: f32, _dy: f32) {}
    fn on_scroll(&mut self, _delta: f32) {}
    fn title() -> &'static str {
        "App"
    }
}

pub fn run<A: App>() -> ! {
    let event_loop = EventLoop::new().unwrap();
    let mut runner = AppRunner::<A>::new();
    let _ = event_loop.run_app(&mut runner);
    std::process::exit(0)
}

struct AppRunner<A: App> {
    window: Option<Arc<Window>>,
    ctx: Option<GpuContext>,
    app: Option<A>,
    last_time: Option<std::time::Instant>,
}

impl<A: App> AppRunner<A> {
    fn new() -> Self {
        Self {
            window: None,
            ctx: None,
            app: None,
            last_time: None,
        }
    }
}

impl<A: App> ApplicationHandler for AppRunner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let window = Arc::new(
                event_loop
                    .create_window(
                        Window::default_attributes()
                            .with_title(A::title())
                            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720)),
                    )
                    .unwrap(),
            );
            self.window = Some(window.clone());

            let ctx = pollster::block_on(GpuContext::new(window));
            self.app = Some(A::init(&ctx));
            self.ctx = Some(ctx);
            self.last_time = Some(std::time::Instant::now());
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if let (Some(ctx), Some(app)) = (&mut self.ctx, &mut self.app) {
            match event {
                WindowEvent::Resized(size) => {
                    ctx.resize(size.width, size.height);
                    app.on_resize(ctx);
                }
                WindowEvent::KeyboardInput {
                    event,
                    is_synthetic: false,
                    ..
                } => {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        app.on_key(code, event.state == ElementState::Pressed);
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let (w, h) = ctx.size;
                    app.on_cursor_moved(
                        position.x as f32 / w.max(1) as f32,
                        position.y as f32 / h.max(1) as f32,
                    );
                }
                WindowEvent::MouseInput { button, state, .. } => {
                    app.on_mouse_button(button, state == ElementState::Pressed);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let scroll = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                    };
                    app.on_scroll(scroll);
                }
                WindowEvent::CloseRequested => {
                    std::process::exit(0);
                }
                _ => {}
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(app) = &mut self.app {
            if let DeviceEvent::MouseMotion { delta } = event {
                app.on_mouse_motion(delta.0 as f32, delta.1 as f32);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if crate::gpu::is_device_lost() {
            // Fatal: surface the reason and stop driving frames. The
            // process has to be restarted to rebuild the pipeline.
            let reason = crate::gpu::device_lost_reason().unwrap_or_else(|| "unknown".into());
            log::error!("stopping after device loss: {}", reason);
            event_loop.exit();
            return;
        }

        if let (Some(ctx), Some(app), Some(last_time)) = (&self.ctx, &mut self.app, self.last_time)
        {
            let now = std::time::Instant::now();
            let dt = (now - last_time).as_secs_f32().min(0.1);
            self.last_time = Some(now);

            app.update(ctx, dt);

            let surface_texture = match ctx.surface.get_current_texture() {
                Ok(t) => t,
                Err(e) => {
                    log::warn!("skipping frame, surface unavailable: {:?}", e);
                    return;
                }
            };
            let view = surface_texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            let mut encoder = ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());

            app.render(ctx, &mut encoder, &view);

            ctx.queue.submit(std::iter::once(encoder.finish()));
            surface_texture.present();

            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }
}
