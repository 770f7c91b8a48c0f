use std::sync::Arc;

use ash::vk::{self, AccessFlags2, PipelineStageFlags2};

use crate::error::RendererResult;
use crate::vulkan::command_pool::CommandPool;
use crate::vulkan::context::Context;
use crate::vulkan::image::Image;
use crate::vulkan::image_view::ImageView;

/// The single offscreen image the ray tracing pass writes into. It lives in
/// GENERAL layout for its whole lifetime (storage writes and transfer reads
/// both accept it), and carries the generation the resize coordinator uses to
/// invalidate descriptor sets and defer destruction.
pub struct RenderTarget {
    pub image_view: Arc<ImageView>,
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub generation: u64,
}

impl RenderTarget {
    pub fn new(
        context: Arc<Context>,
        command_pool: &CommandPool,
        extent: vk::Extent2D,
        format: vk::Format,
        generation: u64,
    ) -> RendererResult<Self> {
        let create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .usage(vk::ImageUsageFlags::STORAGE | vk::ImageUsageFlags::TRANSFER_SRC)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let mut image = Image::new(context.clone(), &create_info)?;

        command_pool.submit_one_time_commands(|command_buffer| {
            image.insert_image_memory_barrier(
                command_buffer,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::GENERAL,
                PipelineStageFlags2::NONE,
                PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
                AccessFlags2::empty(),
                AccessFlags2::SHADER_STORAGE_WRITE,
            );
        })?;

        let image_view = Arc::new(ImageView::new_default(
            context,
            Arc::new(image),
            vk::ImageAspectFlags::COLOR,
        )?);

        Ok(Self {
            image_view,
            extent,
            format,
            generation,
        })
    }

    pub fn image(&self) -> vk::Image {
        self.image_view.image.inner
    }
}
