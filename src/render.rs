pub mod events;
pub mod frame;
pub mod pipeline;
pub mod render_target;
pub mod shader_types;

use std::path::PathBuf;
use std::sync::Arc;

use ash::vk;
use ultraviolet::{Vec3, Vec4};
use winit::dpi::PhysicalSize;
use winit::event::VirtualKeyCode;

use crate::camera::Camera;
use crate::error::{RendererError, RendererResult};
use crate::input_map::InputMap;
use crate::scene::Scene;
use crate::vulkan::command_pool::CommandPool;
use crate::vulkan::context::Context;
use crate::vulkan::swapchain::SwapchainContainer;

use self::events::{EventQueue, RendererEvent};
use self::frame::{DeferredRelease, FrameSlots};
use self::pipeline::{DescriptorSetCache, RayTracingPipeline, ShaderSet};
use self::render_target::RenderTarget;
use self::shader_types::TraceParameters;

/// How fast the arrow key instance nudge moves, in world units per second.
const NUDGE_UNITS_PER_SECOND: f32 = 100.0;

pub struct UpdateContext<'a> {
    pub input: &'a InputMap,
    pub delta_seconds: f32,
}

/// Per-tick host logic. Implementations are driven from the main loop in an
/// explicit, fixed order (input consumers before GPU state producers).
pub trait Updatable {
    fn update(&mut self, ctx: &UpdateContext<'_>) -> RendererResult<()>;
}

/// Per-frame GPU work emission. The UI overlay paints through the callback
/// after the renderer's own commands, inside the same command buffer.
pub trait Renderable {
    fn render_frame(
        &mut self,
        swapchain: &mut SwapchainContainer,
        camera: &Camera,
        draw_ui: &mut dyn FnMut(vk::CommandBuffer, usize),
    ) -> RendererResult<()>;
}

/// Owns the assembled ray tracing state and drives the per-frame command
/// sequencing: trace into the offscreen target, barrier, copy into the
/// swapchain image, barrier for the UI pass, submit and present, with a
/// bounded number of frames in flight.
pub struct Renderer {
    pub scene: Scene,

    pipeline: RayTracingPipeline,
    render_target: RenderTarget,
    descriptor_cache: DescriptorSetCache,
    frames: FrameSlots,

    retired_targets: DeferredRelease<RenderTarget>,
    retired_pipelines: DeferredRelease<RayTracingPipeline>,
    pub events: EventQueue,

    shader_override_dir: Option<PathBuf>,
    /// Refits are recorded into every frame up to and including this one, so
    /// a transform change stays consistent for all frames in flight.
    tlas_update_until_frame: u64,

    /// Direction towards the light, live editable from the UI panel.
    pub light_direction: Vec3,
    /// Full vertical field of view in degrees, UI clamps it to [10, 160].
    pub fov_degrees: f32,

    command_pool: CommandPool,
    context: Arc<Context>,
}

impl Renderer {
    pub fn new(
        context: Arc<Context>,
        command_pool: CommandPool,
        scene: Scene,
        swapchain: &SwapchainContainer,
        frames_in_flight: usize,
        shader_override_dir: Option<PathBuf>,
    ) -> RendererResult<Self> {
        let render_target = RenderTarget::new(
            context.clone(),
            &command_pool,
            swapchain.extent,
            swapchain.format,
            1,
        )?;

        let shaders = ShaderSet::load(shader_override_dir.as_deref())?;
        let pipeline = RayTracingPipeline::create(
            context.clone(),
            &shaders,
            scene.material_atlas.textures.len() as u32,
            scene.instances.len() as u32,
        )?;

        let descriptor_cache = DescriptorSetCache::new(context.clone(), &scene)?;
        let frames = FrameSlots::new(context.clone(), command_pool.clone(), frames_in_flight)?;

        Ok(Self {
            scene,
            pipeline,
            render_target,
            descriptor_cache,
            frames,
            retired_targets: DeferredRelease::new(),
            retired_pipelines: DeferredRelease::new(),
            events: EventQueue::new(),
            shader_override_dir,
            tlas_update_until_frame: 0,
            light_direction: Vec3::new(0.8, 1.0, 0.0).normalized(),
            fov_degrees: 45.0,
            command_pool,
            context,
        })
    }

    /// Drains the event queue at the frame boundary. Target rebuilds come
    /// before pipeline rebuilds; both defer the superseded resource until no
    /// in-flight frame can reference it. Returns whether the swapchain was
    /// recreated so the caller can refresh its own swapchain-derived state.
    pub fn process_events(
        &mut self,
        swapchain: &mut SwapchainContainer,
        window_size: PhysicalSize<u32>,
    ) -> RendererResult<bool> {
        let mut swapchain_recreated = false;

        for event in self.events.drain() {
            match event {
                RendererEvent::TargetResized(_) => {
                    // Every in-flight frame keeps the target it recorded
                    // with; we replace only once all of them retired.
                    self.frames.wait_all()?;
                    self.retired_targets
                        .release_completed(self.frames.current_frame());

                    swapchain.recreate(window_size)?;

                    let generation = self.render_target.generation + 1;
                    let new_target = RenderTarget::new(
                        self.context.clone(),
                        &self.command_pool,
                        swapchain.extent,
                        swapchain.format,
                        generation,
                    )?;
                    let old_target = std::mem::replace(&mut self.render_target, new_target);
                    self.retired_targets
                        .defer(self.frames.current_frame(), old_target);

                    self.descriptor_cache.remove_stale(generation);
                    swapchain_recreated = true;

                    log::info!(
                        "render target rebuilt at {}x{} (generation {})",
                        swapchain.extent.width,
                        swapchain.extent.height,
                        generation
                    );
                }
                RendererEvent::ShadersChanged => {
                    let shaders = ShaderSet::load(self.shader_override_dir.as_deref())?;
                    let new_pipeline = RayTracingPipeline::create(
                        self.context.clone(),
                        &shaders,
                        self.scene.material_atlas.textures.len() as u32,
                        self.scene.instances.len() as u32,
                    )?;
                    let old_pipeline = std::mem::replace(&mut self.pipeline, new_pipeline);
                    self.retired_pipelines
                        .defer(self.frames.current_frame(), old_pipeline);

                    log::info!("ray tracing pipeline rebuilt after shader change");
                }
            }
        }

        Ok(swapchain_recreated)
    }

    /// Moves every other instance and opens the refit window covering all
    /// frames in flight, the contract that prevents geometry popping while
    /// older frames still read the previous transforms.
    pub fn request_instance_nudge(&mut self, delta: Vec3) -> RendererResult<()> {
        self.scene.nudge_instances(delta)?;
        self.tlas_update_until_frame =
            self.frames.current_frame() + self.frames.frames_in_flight() as u64;
        Ok(())
    }

}

impl Updatable for Renderer {
    fn update(&mut self, ctx: &UpdateContext<'_>) -> RendererResult<()> {
        let mut direction = Vec3::zero();
        if ctx.input.is_pressed(VirtualKeyCode::Left) {
            direction.x -= 1.0;
        }
        if ctx.input.is_pressed(VirtualKeyCode::Right) {
            direction.x += 1.0;
        }
        if ctx.input.is_pressed(VirtualKeyCode::PageUp) {
            direction.y += 1.0;
        }
        if ctx.input.is_pressed(VirtualKeyCode::PageDown) {
            direction.y -= 1.0;
        }
        if ctx.input.is_pressed(VirtualKeyCode::Up) {
            direction.z -= 1.0;
        }
        if ctx.input.is_pressed(VirtualKeyCode::Down) {
            direction.z += 1.0;
        }

        if direction != Vec3::zero() {
            self.request_instance_nudge(direction * NUDGE_UNITS_PER_SECOND * ctx.delta_seconds)?;
        }
        Ok(())
    }
}

impl Renderable for Renderer {
    fn render_frame(
        &mut self,
        swapchain: &mut SwapchainContainer,
        camera: &Camera,
        draw_ui: &mut dyn FnMut(vk::CommandBuffer, usize),
    ) -> RendererResult<()> {
        let device = &self.context.device;

        let slot_index = self.frames.begin_frame()?;
        let watermark = self.frames.completed_watermark();
        self.retired_targets.release_completed(watermark);
        self.retired_pipelines.release_completed(watermark);

        let image_available = self.frames.slot(slot_index).image_available;
        let acquire_result = unsafe {
            swapchain.loader.acquire_next_image(
                swapchain.inner,
                u64::MAX,
                image_available,
                vk::Fence::null(),
            )
        };

        let image_index = match acquire_result {
            Ok((index, suboptimal)) => {
                if suboptimal {
                    self.events.push(RendererEvent::TargetResized(swapchain.extent));
                }
                index
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                // The frame is skipped entirely; its fence was left signaled.
                self.events.push(RendererEvent::TargetResized(swapchain.extent));
                return Ok(());
            }
            Err(result) => {
                return Err(RendererError::Vulkan {
                    operation: "acquiring a swapchain image",
                    result,
                })
            }
        };

        let command_buffer = self.frames.slot(slot_index).command_buffer;
        unsafe { device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty()) }
            .map_err(RendererError::vulkan("resetting the frame command buffer"))?;

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.begin_command_buffer(command_buffer, &begin_info) }
            .map_err(RendererError::vulkan("beginning the frame command buffer"))?;

        // A transform change must stay applied for every frame in flight.
        if self.frames.current_frame() <= self.tlas_update_until_frame {
            self.scene
                .tlas
                .record_refit(command_buffer, &self.scene.instance_buffer);
        }

        self.record_trace_and_copy(command_buffer, swapchain, image_index, camera)?;

        draw_ui(command_buffer, image_index as usize);

        let device = &self.context.device;
        unsafe { device.end_command_buffer(command_buffer) }
            .map_err(RendererError::vulkan("ending the frame command buffer"))?;

        self.frames.reset_fence(slot_index)?;

        let render_finished = self.frames.slot(slot_index).render_finished;
        // The swapchain image is first touched by the transfer copy.
        let wait_stage = vk::PipelineStageFlags::TRANSFER;
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(std::slice::from_ref(&image_available))
            .wait_dst_stage_mask(std::slice::from_ref(&wait_stage))
            .command_buffers(std::slice::from_ref(&command_buffer))
            .signal_semaphores(std::slice::from_ref(&render_finished));

        unsafe {
            device.queue_submit(
                self.context.queue,
                std::slice::from_ref(&submit_info),
                self.frames.slot(slot_index).in_flight,
            )
        }
        .map_err(RendererError::vulkan("submitting the frame"))?;

        {
            let recorded_frame = self.frames.current_frame();
            let target_generation = self.render_target.generation;
            let slot = self.frames.slot_mut(slot_index);
            slot.recorded_frame = recorded_frame;
            slot.target_generation = target_generation;
        }

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(std::slice::from_ref(&render_finished))
            .swapchains(std::slice::from_ref(&swapchain.inner))
            .image_indices(std::slice::from_ref(&image_index));

        match unsafe { swapchain.loader.queue_present(self.context.queue, &present_info) } {
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.events.push(RendererEvent::TargetResized(swapchain.extent));
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(result) => Err(RendererError::Vulkan {
                operation: "presenting the frame",
                result,
            }),
        }
    }
}

impl Renderer {
    fn record_trace_and_copy(
        &mut self,
        command_buffer: vk::CommandBuffer,
        swapchain: &SwapchainContainer,
        image_index: u32,
        camera: &Camera,
    ) -> RendererResult<()> {
        let device = &self.context.device;
        let sync2 = &self.context.synchronisation2_loader;

        unsafe {
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::RAY_TRACING_KHR,
                self.pipeline.pipeline,
            )
        };

        let sets = self
            .descriptor_cache
            .get_or_create(&self.pipeline, &self.scene, &self.render_target)?;
        let raw_sets = [sets.scene_data, sets.target, sets.tlas];
        unsafe {
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::RAY_TRACING_KHR,
                self.pipeline.pipeline_layout,
                0,
                &raw_sets,
                &[],
            )
        };

        let parameters = TraceParameters {
            camera_to_world: camera.camera_to_world(),
            half_fov: self.fov_degrees.to_radians() * 0.5,
            reserved: [0.0; 3],
            light_direction: Vec4::new(
                self.light_direction.x,
                self.light_direction.y,
                self.light_direction.z,
                0.0,
            ),
        };
        unsafe {
            device.cmd_push_constants(
                command_buffer,
                self.pipeline.pipeline_layout,
                vk::ShaderStageFlags::RAYGEN_KHR | vk::ShaderStageFlags::CLOSEST_HIT_KHR,
                0,
                parameters.as_bytes(),
            )
        };

        let extent = self.render_target.extent;
        unsafe {
            self.context
                .context_raytracing
                .ray_tracing_pipeline
                .cmd_trace_rays(
                    command_buffer,
                    &self.pipeline.sbt_raygen_region,
                    &self.pipeline.sbt_miss_region,
                    &self.pipeline.sbt_hit_region,
                    &self.pipeline.sbt_callable_region,
                    extent.width,
                    extent.height,
                    1,
                )
        };

        // Ray tracing writes must land before the transfer reads them; the
        // same dependency also orders last frame's copy against this frame's
        // storage writes.
        let trace_to_transfer = vk::MemoryBarrier2::builder()
            .src_stage_mask(vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR)
            .src_access_mask(vk::AccessFlags2::SHADER_STORAGE_WRITE)
            .dst_stage_mask(vk::PipelineStageFlags2::COPY)
            .dst_access_mask(vk::AccessFlags2::TRANSFER_READ);
        let swapchain_to_transfer = vk::ImageMemoryBarrier2::builder()
            .src_stage_mask(vk::PipelineStageFlags2::NONE)
            .src_access_mask(vk::AccessFlags2::empty())
            .dst_stage_mask(vk::PipelineStageFlags2::COPY)
            .dst_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .image(swapchain.images[image_index as usize])
            .subresource_range(color_subresource_range());
        let dependency_info = vk::DependencyInfo::builder()
            .memory_barriers(std::slice::from_ref(&trace_to_transfer))
            .image_memory_barriers(std::slice::from_ref(&swapchain_to_transfer));
        unsafe { sync2.cmd_pipeline_barrier2(command_buffer, &dependency_info) };

        let copy_region = vk::ImageCopy {
            src_subresource: color_subresource_layers(),
            src_offset: vk::Offset3D::default(),
            dst_subresource: color_subresource_layers(),
            dst_offset: vk::Offset3D::default(),
            extent: vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            },
        };
        unsafe {
            device.cmd_copy_image(
                command_buffer,
                self.render_target.image(),
                vk::ImageLayout::GENERAL,
                swapchain.images[image_index as usize],
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                std::slice::from_ref(&copy_region),
            )
        };

        // Sequence the copy against the UI pass that draws into the same
        // image next, and free the target for the next frame's trace.
        let swapchain_to_color_attachment = vk::ImageMemoryBarrier2::builder()
            .src_stage_mask(vk::PipelineStageFlags2::COPY)
            .src_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
            .dst_stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
            .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .new_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .image(swapchain.images[image_index as usize])
            .subresource_range(color_subresource_range());
        let transfer_to_next_trace = vk::MemoryBarrier2::builder()
            .src_stage_mask(vk::PipelineStageFlags2::COPY)
            .src_access_mask(vk::AccessFlags2::TRANSFER_READ)
            .dst_stage_mask(vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR)
            .dst_access_mask(vk::AccessFlags2::SHADER_STORAGE_WRITE);
        let dependency_info = vk::DependencyInfo::builder()
            .memory_barriers(std::slice::from_ref(&transfer_to_next_trace))
            .image_memory_barriers(std::slice::from_ref(&swapchain_to_color_attachment));
        unsafe { sync2.cmd_pipeline_barrier2(command_buffer, &dependency_info) };

        Ok(())
    }
}

fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn color_subresource_layers() -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    }
}
