use anyhow::Result;
use clap::Parser;
use egui::Context as EguiContext;
use roomtrace_assets::SceneFile;
use roomtrace_input::{InputConfig, MoveKey, MoveKeys};
use roomtrace_render::{FrameInputs, FrameStats, RayTraceDispatch};
use roomtrace_render_wgpu::WgpuRenderer;
use roomtrace_stream::{FrameClock, Scene, SceneStats};
use roomtrace_tools::SceneInspector;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "roomtrace-desktop", about = "Walk a room-partitioned ray-traced scene")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene file (.yaml/.yml/.json); the built-in demo when omitted
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Initial window width
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Initial window height
    #[arg(long, default_value = "720")]
    height: u32,
}

/// Application state.
struct AppState {
    file: SceneFile,
    scene: Scene,
    dispatch: RayTraceDispatch,
    clock: FrameClock,
    input: InputConfig,
    keys: MoveKeys,
    mouse_captured: bool,
    show_overlay: bool,
    last_update: SceneStats,
    last_frame: FrameStats,
}

impl AppState {
    fn new(file: SceneFile) -> Result<Self> {
        let scene = file.build_scene()?;
        let dispatch = RayTraceDispatch::new(&file.config.staging, file.config.dispatch.clone());
        let input = file.config.input;
        Ok(Self {
            file,
            scene,
            dispatch,
            clock: FrameClock::new(Instant::now()),
            input,
            keys: MoveKeys::default(),
            mouse_captured: false,
            show_overlay: true,
            last_update: SceneStats::default(),
            last_frame: FrameStats::default(),
        })
    }

    fn update(&mut self, now: Instant) {
        let rate = self.clock.tick(now);
        self.keys.walk(&self.input, rate).apply(&mut self.scene);
        self.last_update = self.scene.update(rate);
        if self.last_update.room_changed {
            tracing::debug!(room = ?self.last_update.current_room, "observer changed room");
        }
    }

    /// Returns true when the application should exit.
    fn handle_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        if let Some(move_key) = move_key(key) {
            self.keys.set(move_key, pressed);
            return false;
        }
        if !pressed {
            return false;
        }
        match key {
            KeyCode::F1 => {
                self.show_overlay = !self.show_overlay;
                false
            }
            KeyCode::Escape => true,
            _ => false,
        }
    }

    fn look(&mut self, dx: f32, dy: f32) {
        if self.mouse_captured {
            self.input.look(dx, dy, self.clock.frame_ms()).apply(&mut self.scene);
        }
    }

    fn draw_ui(&self, ctx: &EguiContext) {
        if !self.show_overlay {
            return;
        }

        let summary = SceneInspector::summary(&self.scene);
        let observer = self.scene.observer();
        let position = observer.position();
        let staging = &self.file.config.staging;
        let counts = self.last_frame.counts;

        egui::Window::new("Rooms")
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.label(format!(
                    "{:.0} fps  ({:.1} ms)",
                    self.clock.fps(),
                    self.clock.frame_ms()
                ));
                ui.label(format!(
                    "Observer: ({:.2}, {:.2}, {:.2})  yaw {:.0}  pitch {:.0}",
                    position.x,
                    position.y,
                    position.z,
                    observer.theta(),
                    observer.phi()
                ));
                ui.separator();
                ui.label(match summary.current_room {
                    Some(id) => format!("Current: {id}"),
                    None => "Current: none".to_string(),
                });
                let active: Vec<String> = summary.active_rooms.iter().map(ToString::to_string).collect();
                ui.label(format!("Active: {}", active.join(", ")));
                ui.label(format!(
                    "Rooms: {}  Doors: {}  Lights: {}  Spheres: {}",
                    summary.rooms, summary.doors, summary.lights, summary.spheres
                ));
                ui.separator();
                ui.heading("Staging");
                ui.label(format!("Spheres: {} / {}", counts.spheres, staging.spheres));
                ui.label(format!("Planes: {} / {}", counts.planes, staging.planes));
                ui.label(format!("Lights: {} / {}", counts.lights, staging.lights));
                ui.label(format!("Materials: {} / {}", counts.materials, staging.materials));
                ui.label(format!(
                    "Dropped: {} this frame, {} total",
                    self.last_frame.dropped,
                    self.dispatch.dropped_total()
                ));
                ui.label(format!(
                    "Work groups: {} x {}",
                    self.last_frame.groups.0, self.last_frame.groups.1
                ));
                ui.separator();
                ui.label("WASD walk, right mouse look, F1 overlay, Esc quit");
            });
    }
}

fn move_key(key: KeyCode) -> Option<MoveKey> {
    match key {
        KeyCode::KeyW => Some(MoveKey::Forward),
        KeyCode::KeyS => Some(MoveKey::Back),
        KeyCode::KeyA => Some(MoveKey::Left),
        KeyCode::KeyD => Some(MoveKey::Right),
        _ => None,
    }
}

/// Full GPU application.
struct GpuApp {
    state: AppState,
    initial_size: PhysicalSize<u32>,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    config: Option<wgpu::SurfaceConfiguration>,
    renderer: Option<WgpuRenderer>,
    egui_ctx: EguiContext,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
}

impl GpuApp {
    fn new(state: AppState, initial_size: PhysicalSize<u32>) -> Self {
        Self {
            state,
            initial_size,
            window: None,
            surface: None,
            device: None,
            queue: None,
            config: None,
            renderer: None,
            egui_ctx: EguiContext::default(),
            egui_winit: None,
            egui_renderer: None,
        }
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("Roomtrace")
            .with_inner_size(self.initial_size);
        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .expect("create surface");

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("find adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("roomtrace_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .expect("create device");

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let mut renderer = WgpuRenderer::new(
            &device,
            surface_format,
            config.width,
            config.height,
            &self.state.file.config.staging,
        );
        match self
            .state
            .scene
            .world_mut()
            .upload_meshes(&mut renderer.uploader(&device))
        {
            Ok(count) => tracing::info!(
                meshes = count,
                vertices = renderer.resident_vertices(),
                "static meshes uploaded"
            ),
            Err(e) => tracing::error!("mesh upload failed: {e}"),
        }

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        self.window = Some(window);
        self.surface = Some(surface);
        self.device = Some(device);
        self.queue = Some(queue);
        self.config = Some(config);
        self.renderer = Some(renderer);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(egui_winit), Some(window)) = (&mut self.egui_winit, &self.window) {
            let response = egui_winit.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let (Some(surface), Some(device), Some(config)) =
                    (&self.surface, &self.device, &mut self.config)
                {
                    config.width = new_size.width.max(1);
                    config.height = new_size.height.max(1);
                    surface.configure(device, config);
                    if let Some(renderer) = &mut self.renderer {
                        renderer.resize(device, config.width, config.height);
                    }
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                if self.state.handle_key(key, key_state == ElementState::Pressed) {
                    event_loop.exit();
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state: btn_state,
                ..
            } => {
                self.state.mouse_captured = btn_state == ElementState::Pressed;
                if let Some(window) = &self.window {
                    window.set_cursor_visible(!self.state.mouse_captured);
                }
            }
            WindowEvent::RedrawRequested => {
                self.state.update(Instant::now());

                let (Some(surface), Some(device), Some(queue), Some(config), Some(window)) = (
                    &self.surface,
                    &self.device,
                    &self.queue,
                    &self.config,
                    &self.window,
                ) else {
                    return;
                };

                let output = match surface.get_current_texture() {
                    Ok(t) => t,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        surface.configure(device, config);
                        return;
                    }
                    Err(e) => {
                        tracing::error!("surface error: {e}");
                        return;
                    }
                };

                let view = output
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());

                if let Some(renderer) = &mut self.renderer {
                    let state = &mut self.state;
                    let inputs = FrameInputs {
                        world: state.scene.world(),
                        active: state.scene.active_rooms(),
                        observer: state.scene.observer(),
                        materials: &state.file.materials,
                        resolution: (config.width, config.height),
                    };
                    let mut frame = renderer.begin_frame(device, queue, &view);
                    state.last_frame = state.dispatch.render_frame(&mut frame, &inputs);
                    frame.finish();
                    state.scene.take_dirty();
                }

                let (Some(egui_winit), Some(egui_renderer)) =
                    (&mut self.egui_winit, &mut self.egui_renderer)
                else {
                    output.present();
                    return;
                };

                let raw_input = egui_winit.take_egui_input(window);
                let full_output = self.egui_ctx.run(raw_input, |ctx| {
                    self.state.draw_ui(ctx);
                });
                egui_winit.handle_platform_output(window, full_output.platform_output);

                let paint_jobs = self
                    .egui_ctx
                    .tessellate(full_output.shapes, full_output.pixels_per_point);

                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [config.width, config.height],
                    pixels_per_point: full_output.pixels_per_point,
                };

                for (id, image_delta) in &full_output.textures_delta.set {
                    egui_renderer.update_texture(device, queue, *id, image_delta);
                }
                let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("egui_encoder"),
                });
                egui_renderer.update_buffers(
                    device,
                    queue,
                    &mut encoder,
                    &paint_jobs,
                    &screen_descriptor,
                );
                {
                    let mut pass = encoder
                        .begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("egui_pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: &view,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Load,
                                    store: wgpu::StoreOp::Store,
                                },
                            })],
                            depth_stencil_attachment: None,
                            ..Default::default()
                        })
                        .forget_lifetime();
                    egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
                }
                queue.submit(std::iter::once(encoder.finish()));
                for id in &full_output.textures_delta.free {
                    egui_renderer.free_texture(id);
                }

                output.present();
                window.request_redraw();
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.state.look(delta.0 as f32, delta.1 as f32);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("roomtrace-desktop starting");

    let file = match &cli.scene {
        Some(path) => SceneFile::load(path)?,
        None => SceneFile::demo(),
    };
    let state = AppState::new(file)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(state, PhysicalSize::new(cli.width, cli.height));
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_takes_input_speeds_from_the_scene() {
        let mut file = SceneFile::demo();
        file.config.input.walk_speed = 0.2;
        let state = AppState::new(file).unwrap();
        assert_eq!(state.input.walk_speed, 0.2);
        assert_eq!(state.file.config.input.walk_speed, 0.2);
        assert!(state.scene.tracker().current().is_some());
    }
}
