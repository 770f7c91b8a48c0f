mod camera;
mod config;
mod error;
mod input_map;
mod loader;
mod render;
mod scene;
mod scene_plan;
mod scene_uploader;
mod time;
mod transform;
mod utility;
mod vulkan;

use anyhow::Context as _;
use gpu_allocator::vulkan::*;
use loader::AssetLoader;
use render::events::{RendererEvent, ShaderWatcher};
use render::{Renderable, Renderer, Updatable, UpdateContext};
use scene_plan::ScenePlan;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use ash::{self, vk};
use camera::freecam_controller::FreecamController;
use camera::Camera;
use config::{Config, ConfigFileLoader};
use input_map::{InputMap, InputMode};
use time::Time;
use ultraviolet::{Vec2, Vec3};
use vulkan::command_pool::CommandPool;
use vulkan::context::Context;
use vulkan::swapchain::SwapchainContainer;
use winit::dpi::{self, PhysicalSize};
use winit::event::{
    DeviceEvent, ElementState, Event, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent,
};
use winit::event_loop::EventLoop;
use winit::window::{CursorGrabMode, Window, WindowBuilder};

/// Values the UI panel edits; they are pushed into the renderer right before
/// every frame so an edit is visible on the next dispatch.
struct UiPanelState {
    light_direction: Vec3,
    fov_degrees: f32,
}

// Rust will drop these fields in the order they are declared
struct RayCatApp {
    egui_integration: ManuallyDrop<egui_winit_ash_integration::Integration<Arc<Mutex<Allocator>>>>,

    renderer: Renderer,

    ui: UiPanelState,
    input_map: InputMap,
    time: Time,
    freecam_controller: FreecamController,
    camera: Camera,
    shader_watcher: Option<ShaderWatcher>,

    _allocator: Arc<Mutex<Allocator>>,
    swapchain: SwapchainContainer,
    context: Arc<Context>,

    /// Application window
    window: Window,
}

impl RayCatApp {
    pub fn new(event_loop: &EventLoop<()>, config: Config) -> anyhow::Result<Self> {
        let window = WindowBuilder::new()
            .with_title("ray-cat")
            .with_inner_size(dpi::LogicalSize {
                width: config.window_width,
                height: config.window_height,
            })
            .with_resizable(true)
            .build(event_loop)
            .context("could not create the window")?;

        let mut asset_loader = AssetLoader::new();
        let loaded_scene = asset_loader
            .load_scene(&config.scene_path)
            .context("could not load the scene")?;
        log::info!(
            "loaded scene with {} models and {} placements",
            loaded_scene.models.len(),
            loaded_scene.instance_count()
        );

        let plan = ScenePlan::new(&loaded_scene, &asset_loader.materials)
            .context("could not plan the scene ingestion")?;

        let freecam_controller = FreecamController::new(5.0, 0.01);
        let camera = Camera::new();
        let input_map = InputMap::new();

        let context = Arc::new(Context::new(event_loop, &window)?);
        let swapchain = SwapchainContainer::new(context.clone(), window.inner_size())?;
        let command_pool = CommandPool::new(context.clone())?;

        let instance = &context.instance;
        let device = &context.device;

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device: context.physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .context("could not create the gpu allocator")?;
        let allocator = Arc::new(Mutex::new(allocator));

        let egui_integration = ManuallyDrop::new(egui_winit_ash_integration::Integration::new(
            event_loop,
            window.inner_size().width,
            window.inner_size().height,
            window.scale_factor(),
            egui::FontDefinitions::default(),
            egui::Style::default(),
            device.clone(),
            allocator.clone(),
            context.queue_family_index,
            context.queue,
            swapchain.loader.clone(),
            swapchain.inner,
            swapchain.surface_format,
        ));

        let scene = scene_uploader::upload(plan, &loaded_scene, context.clone(), &command_pool)
            .context("could not upload the scene to the GPU")?;

        let renderer = Renderer::new(
            context.clone(),
            command_pool,
            scene,
            &swapchain,
            config.frames_in_flight,
            config.shader_override_dir.clone(),
        )
        .context("could not assemble the ray tracing renderer")?;

        let ui = UiPanelState {
            light_direction: renderer.light_direction,
            fov_degrees: renderer.fov_degrees,
        };

        let shader_watcher = config.shader_override_dir.map(ShaderWatcher::new);

        Ok(Self {
            window,
            context,
            swapchain,

            ui,
            input_map,
            freecam_controller,
            camera,
            time: Time::new(),
            shader_watcher,

            renderer,
            egui_integration,
            _allocator: allocator,
        })
    }

    pub fn main_loop(mut self, event_loop: EventLoop<()>) -> ! {
        let mut mouse_position = Vec2::zero();
        event_loop.run(move |event, _, control_flow| {
            control_flow.set_poll();

            match event {
                Event::WindowEvent { event, .. } => {
                    let response = self.egui_integration.handle_event(&event);
                    match event {
                        WindowEvent::CloseRequested => {
                            control_flow.set_exit();
                        }
                        WindowEvent::Resized(PhysicalSize { width, height }) => {
                            self.renderer
                                .events
                                .push(RendererEvent::TargetResized(vk::Extent2D {
                                    width,
                                    height,
                                }));
                        }
                        WindowEvent::KeyboardInput {
                            input:
                                KeyboardInput {
                                    virtual_keycode,
                                    state,
                                    ..
                                },
                            ..
                        } => {
                            match (virtual_keycode, state) {
                                (Some(VirtualKeyCode::Escape), ElementState::Pressed) => {
                                    // Orderly shutdown: drop waits for every
                                    // submitted frame before teardown.
                                    control_flow.set_exit();
                                }
                                (Some(VirtualKeyCode::F1), ElementState::Pressed) => {
                                    let mode = self.input_map.toggle_mode();
                                    log::info!("input mode: {:?}", mode);
                                }
                                (Some(VirtualKeyCode::Space), ElementState::Pressed) => {
                                    let position = self.freecam_controller.position;
                                    log::info!(
                                        "camera position: ({:.2}, {:.2}, {:.2})",
                                        position.x,
                                        position.y,
                                        position.z
                                    );
                                }
                                _ => (),
                            };
                            if response.consumed {
                                return;
                            }
                            match (virtual_keycode, state) {
                                (Some(virtual_keycode), ElementState::Pressed) => {
                                    self.input_map.update_key_press(virtual_keycode)
                                }
                                (Some(virtual_keycode), ElementState::Released) => {
                                    self.input_map.update_key_release(virtual_keycode)
                                }
                                (None, _) => (),
                            };
                        }
                        WindowEvent::MouseInput { button, state, .. } => {
                            if response.consumed {
                                return;
                            }
                            match state {
                                ElementState::Pressed => self.input_map.update_mouse_press(button),
                                ElementState::Released => {
                                    self.input_map.update_mouse_release(button)
                                }
                            };

                            if self.input_map.mode() == InputMode::SceneNavigation {
                                match (button, state) {
                                    (MouseButton::Right, ElementState::Pressed) => {
                                        self.input_map.start_capturing_mouse(mouse_position);
                                        self.window
                                            .set_cursor_grab(CursorGrabMode::Confined)
                                            .or_else(|_e| {
                                                self.window.set_cursor_grab(CursorGrabMode::Locked)
                                            })
                                            .ok();
                                        self.window.set_cursor_visible(false);
                                    }
                                    (MouseButton::Right, ElementState::Released) => {
                                        if let Some(position) =
                                            self.input_map.stop_capturing_mouse()
                                        {
                                            let _ = self.window.set_cursor_position(
                                                dpi::PhysicalPosition::new(position.x, position.y),
                                            );
                                        }
                                        let _ =
                                            self.window.set_cursor_grab(CursorGrabMode::None);
                                        self.window.set_cursor_visible(true);
                                    }
                                    _ => {}
                                };
                            }
                        }
                        WindowEvent::CursorMoved { position, .. } => {
                            mouse_position = Vec2::new(position.x as f32, position.y as f32);
                        }
                        _ => {}
                    }
                }
                Event::DeviceEvent { event, .. } => match event {
                    DeviceEvent::MouseMotion { delta: (dx, dy) } => {
                        if self.input_map.is_capturing_mouse() {
                            self.input_map
                                .accumulate_mouse_delta(Vec2::new(dx as f32, dy as f32));
                        }
                    }
                    _ => (),
                },
                Event::MainEventsCleared => {
                    self.window.request_redraw();
                }
                Event::RedrawRequested(_window_id) => {
                    if let Err(error) = self.update().and_then(|_| {
                        self.input_map.clear_mouse_delta();
                        self.draw_frame()
                    }) {
                        // Per-frame failures are not recovered, the run ends.
                        log::error!("fatal renderer error: {error:#}");
                        control_flow.set_exit();
                    }
                }
                _ => (),
            }
        })
    }

    fn update(&mut self) -> anyhow::Result<()> {
        self.time.update();

        if let Some(watcher) = self.shader_watcher.as_mut() {
            if watcher.poll() {
                self.renderer.events.push(RendererEvent::ShadersChanged);
            }
        }

        let ctx = UpdateContext {
            input: &self.input_map,
            delta_seconds: self.time.delta_seconds(),
        };

        // Explicit update order: input consumers first, GPU state last.
        let updatables: [&mut dyn Updatable; 2] =
            [&mut self.freecam_controller, &mut self.renderer];
        for updatable in updatables {
            updatable.update(&ctx)?;
        }

        self.camera.update_camera(&self.freecam_controller);
        Ok(())
    }

    fn draw_frame(&mut self) -> anyhow::Result<()> {
        let window_size = self.window.inner_size();
        if window_size.width == 0 || window_size.height == 0 {
            return Ok(());
        }

        let swapchain_recreated = self
            .renderer
            .process_events(&mut self.swapchain, window_size)?;
        if swapchain_recreated {
            self.egui_integration.update_swapchain(
                window_size.width,
                window_size.height,
                self.swapchain.inner,
                self.swapchain.surface_format,
            );
        }

        self.renderer.light_direction = self.ui.light_direction;
        self.renderer.fov_degrees = self.ui.fov_degrees;

        // Split the borrows so the UI callback and the renderer can coexist.
        let egui_integration = &mut self.egui_integration;
        let window = &self.window;
        let time = &self.time;
        let ui = &mut self.ui;
        let mut draw_ui = |command_buffer: vk::CommandBuffer, image_index: usize| {
            draw_ui_panel(egui_integration, window, time, ui, command_buffer, image_index);
        };

        self.renderer
            .render_frame(&mut self.swapchain, &self.camera, &mut draw_ui)?;

        // Keep the light a unit vector no matter what the drags produced.
        if self.ui.light_direction.mag_sq() > 0.0001 {
            self.ui.light_direction = self.ui.light_direction.normalized();
        } else {
            self.ui.light_direction = Vec3::unit_y();
        }
        self.ui.fov_degrees = self.ui.fov_degrees.clamp(10.0, 160.0);

        Ok(())
    }
}

fn draw_ui_panel(
    egui_integration: &mut egui_winit_ash_integration::Integration<Arc<Mutex<Allocator>>>,
    window: &Window,
    time: &Time,
    ui_state: &mut UiPanelState,
    command_buffer: vk::CommandBuffer,
    image_index: usize,
) {
    egui_integration
        .context()
        .set_visuals(egui::style::Visuals::dark());

    egui_integration.begin_frame(window);

    egui::Window::new("Info & Settings")
        .default_pos([1.0, 1.0])
        .show(&egui_integration.context(), |ui| {
            let frame_ms = time.delta_milliseconds();
            ui.label(format!("{:.3} ms/frame", frame_ms));
            if frame_ms > 0.0 {
                ui.label(format!("{:.1} FPS", 1000.0 / frame_ms));
            }
            ui.colored_label(
                egui::Color32::from_rgb(0, 153, 204),
                "[F1]: Toggle input-mode",
            );
            ui.colored_label(
                egui::Color32::from_rgb(0, 153, 204),
                " (UI vs. scene navigation)",
            );

            ui.horizontal(|ui| {
                ui.label("Light Direction");
                ui.add(
                    egui::DragValue::new(&mut ui_state.light_direction.x)
                        .speed(0.005)
                        .clamp_range(-1.0..=1.0),
                );
                ui.add(
                    egui::DragValue::new(&mut ui_state.light_direction.y)
                        .speed(0.005)
                        .clamp_range(-1.0..=1.0),
                );
                ui.add(
                    egui::DragValue::new(&mut ui_state.light_direction.z)
                        .speed(0.005)
                        .clamp_range(-1.0..=1.0),
                );
            });

            ui.separator();
            ui.horizontal(|ui| {
                ui.label("Full Field of View");
                ui.add(
                    egui::DragValue::new(&mut ui_state.fov_degrees)
                        .speed(1.0)
                        .clamp_range(10.0..=160.0),
                );
            });
        });

    let output = egui_integration.end_frame(window);
    let clipped_meshes = egui_integration.context().tessellate(output.shapes);
    egui_integration.paint(
        command_buffer,
        image_index,
        clipped_meshes,
        output.textures_delta,
    );
}

impl Drop for RayCatApp {
    fn drop(&mut self) {
        let device = &self.context.device;

        // Let every submitted frame retire before tearing shared state down.
        unsafe { device.device_wait_idle() }.expect("Could not wait for device idle");
        unsafe { self.egui_integration.destroy() };
        unsafe { ManuallyDrop::drop(&mut self.egui_integration) };
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "ray-cat.json".to_string());
    let config = ConfigFileLoader::new(config_path).load_config()?;
    config.validate()?;

    let event_loop = EventLoop::new();
    let app = RayCatApp::new(&event_loop, config)?;
    app.main_loop(event_loop)
}

pub fn find_memorytype_index(
    memory_req: &vk::MemoryRequirements,
    memory_prop: &vk::PhysicalDeviceMemoryProperties,
    flags: vk::MemoryPropertyFlags,
) -> Option<u32> {
    memory_prop.memory_types[..memory_prop.memory_type_count as usize]
        .iter()
        .enumerate()
        .find(|(index, memory_type)| {
            (memory_req.memory_type_bits & (1 << index)) != 0
                && memory_type.property_flags & flags == flags
        })
        .map(|(index, _memory_type)| index as u32)
}
