use std::sync::Arc;

use ash::vk::{self, AccessFlags2, PipelineStageFlags2};

use crate::error::{RendererError, RendererResult};
use crate::find_memorytype_index;
use crate::vulkan::buffer::Buffer;
use crate::vulkan::context::Context;

pub struct Image {
    pub inner: vk::Image,
    pub memory: vk::DeviceMemory,

    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub layout: vk::ImageLayout,
    pub mip_levels: u32,

    context: Arc<Context>,
}

impl Image {
    pub fn new(context: Arc<Context>, create_info: &vk::ImageCreateInfo) -> RendererResult<Image> {
        let device = &context.device;

        let format = create_info.format;
        let extent = create_info.extent;
        let layout = create_info.initial_layout;
        let mip_levels = create_info.mip_levels;

        let image = unsafe { device.create_image(create_info, None) }
            .map_err(RendererError::vulkan("creating an image"))?;

        let memory_requirements = unsafe { device.get_image_memory_requirements(image) };

        let image_memorytype_index = find_memorytype_index(
            &memory_requirements,
            &context.device_memory_properties,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )
        .ok_or_else(|| {
            RendererError::Runtime("no suitable memory type for an image".to_string())
        })?;

        let allocate_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(memory_requirements.size)
            .memory_type_index(image_memorytype_index);

        let memory = unsafe { device.allocate_memory(&allocate_info, None) }
            .map_err(RendererError::vulkan("allocating image memory"))?;

        unsafe { device.bind_image_memory(image, memory, 0) }
            .map_err(RendererError::vulkan("binding image memory"))?;

        Ok(Self {
            inner: image,
            memory,
            format,
            extent,
            layout,
            mip_levels,
            context,
        })
    }

    /// Uploads tightly packed pixel data and leaves the image in
    /// SHADER_READ_ONLY_OPTIMAL.
    pub fn copy_from_buffer_for_texture<T>(
        &mut self,
        command_buffer: vk::CommandBuffer,
        buffer: &Buffer<T>,
    ) {
        self.insert_image_memory_barrier(
            command_buffer,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            PipelineStageFlags2::NONE,
            PipelineStageFlags2::COPY,
            AccessFlags2::empty(),
            AccessFlags2::TRANSFER_WRITE,
        );

        let buffer_image_copy = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            },
            image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            image_extent: self.extent,
        };

        unsafe {
            self.context.device.cmd_copy_buffer_to_image(
                command_buffer,
                buffer.get_vk_buffer(),
                self.inner,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                std::slice::from_ref(&buffer_image_copy),
            )
        };

        self.insert_image_memory_barrier(
            command_buffer,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            PipelineStageFlags2::COPY,
            PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
            AccessFlags2::TRANSFER_WRITE,
            AccessFlags2::SHADER_READ,
        );

        self.layout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
    }

    #[allow(clippy::too_many_arguments)]
    pub fn insert_image_memory_barrier(
        &mut self,
        command_buffer: vk::CommandBuffer,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        src_stage_mask: PipelineStageFlags2,
        dst_stage_mask: PipelineStageFlags2,
        src_access_mask: AccessFlags2,
        dst_access_mask: AccessFlags2,
    ) {
        let image_memory_barrier = vk::ImageMemoryBarrier2::builder()
            .src_stage_mask(src_stage_mask)
            .dst_stage_mask(dst_stage_mask)
            .src_access_mask(src_access_mask)
            .dst_access_mask(dst_access_mask)
            .old_layout(old_layout)
            .new_layout(new_layout)
            .image(self.inner)
            .subresource_range(self.full_subresource_range(vk::ImageAspectFlags::COLOR));

        let dependency_info = vk::DependencyInfo::builder()
            .image_memory_barriers(std::slice::from_ref(&image_memory_barrier));

        unsafe {
            self.context
                .synchronisation2_loader
                .cmd_pipeline_barrier2(command_buffer, &dependency_info)
        };
        self.layout = new_layout;
    }

    pub fn full_subresource_range(
        &self,
        aspect_mask: vk::ImageAspectFlags,
    ) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: self.mip_levels,
            base_array_layer: 0,
            layer_count: 1,
        }
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        let device = &self.context.device;
        unsafe { device.destroy_image(self.inner, None) };
        unsafe { device.free_memory(self.memory, None) };
    }
}
