use std::sync::Arc;

use ash::vk;

use crate::error::{RendererError, RendererResult};
use crate::vulkan::buffer::Buffer;
use crate::vulkan::context::Context;

pub struct DescriptorSet {
    pub inner: vk::DescriptorSet,
}

impl DescriptorSet {
    pub fn new(
        context: Arc<Context>,
        descriptor_pool: vk::DescriptorPool,
        set_layout: vk::DescriptorSetLayout,
        write_descriptor_sets: Vec<WriteDescriptorSet>,
    ) -> RendererResult<Self> {
        let device = &context.device;
        let allocate_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(descriptor_pool)
            .set_layouts(std::slice::from_ref(&set_layout));

        let descriptor_set = unsafe { device.allocate_descriptor_sets(&allocate_info) }
            .map_err(RendererError::vulkan("allocating a descriptor set"))?[0];

        // The acceleration structure write chains a struct that must stay
        // alive until update_descriptor_sets, hence the two-step assembly.
        let mut acceleration_structure_infos: Vec<
            Box<vk::WriteDescriptorSetAccelerationStructureKHR>,
        > = Vec::new();

        let vk_writes: Vec<vk::WriteDescriptorSet> = write_descriptor_sets
            .iter()
            .map(|write| {
                let mut vk_write = vk::WriteDescriptorSet::builder()
                    .dst_binding(write.binding)
                    .descriptor_type(write.info.descriptor_type())
                    .dst_set(descriptor_set);

                match &write.info {
                    DescriptorInfo::StorageBuffer(info) => {
                        vk_write = vk_write.buffer_info(std::slice::from_ref(info));
                    }
                    DescriptorInfo::SampledImages(infos) => {
                        vk_write = vk_write.image_info(infos);
                    }
                    DescriptorInfo::StorageImage(info) => {
                        vk_write = vk_write.image_info(std::slice::from_ref(info));
                    }
                    DescriptorInfo::UniformTexelBuffers(views) => {
                        vk_write = vk_write.texel_buffer_view(views);
                    }
                    DescriptorInfo::AccelerationStructure(handle) => {
                        let info = Box::new(
                            vk::WriteDescriptorSetAccelerationStructureKHR::builder()
                                .acceleration_structures(std::slice::from_ref(handle))
                                .build(),
                        );
                        let mut built = vk_write.build();
                        built.descriptor_count = 1;
                        built.p_next = info.as_ref() as *const _ as *const std::ffi::c_void;
                        acceleration_structure_infos.push(info);
                        return built;
                    }
                }
                vk_write.build()
            })
            .collect();

        unsafe { device.update_descriptor_sets(&vk_writes, &[]) };

        Ok(Self {
            inner: descriptor_set,
        })
    }
}

pub struct WriteDescriptorSet {
    binding: u32,
    info: DescriptorInfo,
}

pub enum DescriptorInfo {
    StorageBuffer(vk::DescriptorBufferInfo),
    SampledImages(Vec<vk::DescriptorImageInfo>),
    StorageImage(vk::DescriptorImageInfo),
    UniformTexelBuffers(Vec<vk::BufferView>),
    AccelerationStructure(vk::AccelerationStructureKHR),
}

impl DescriptorInfo {
    pub fn descriptor_type(&self) -> vk::DescriptorType {
        match self {
            DescriptorInfo::StorageBuffer(_) => vk::DescriptorType::STORAGE_BUFFER,
            DescriptorInfo::SampledImages(_) => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            DescriptorInfo::StorageImage(_) => vk::DescriptorType::STORAGE_IMAGE,
            DescriptorInfo::UniformTexelBuffers(_) => vk::DescriptorType::UNIFORM_TEXEL_BUFFER,
            DescriptorInfo::AccelerationStructure(_) => {
                vk::DescriptorType::ACCELERATION_STRUCTURE_KHR
            }
        }
    }
}

impl WriteDescriptorSet {
    pub fn storage_buffer<T>(binding: u32, buffer: &Buffer<T>) -> WriteDescriptorSet {
        let info = vk::DescriptorBufferInfo::builder()
            .buffer(buffer.get_vk_buffer())
            .offset(0)
            .range(vk::WHOLE_SIZE)
            .build();

        WriteDescriptorSet {
            binding,
            info: DescriptorInfo::StorageBuffer(info),
        }
    }

    /// One combined image sampler entry per (view, sampler) pair, in order.
    pub fn image_view_sampler_array(
        binding: u32,
        entries: impl IntoIterator<Item = (vk::ImageView, vk::Sampler)>,
    ) -> WriteDescriptorSet {
        let infos = entries
            .into_iter()
            .map(|(image_view, sampler)| {
                vk::DescriptorImageInfo::builder()
                    .sampler(sampler)
                    .image_view(image_view)
                    .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                    .build()
            })
            .collect();

        WriteDescriptorSet {
            binding,
            info: DescriptorInfo::SampledImages(infos),
        }
    }

    pub fn storage_image(binding: u32, image_view: vk::ImageView) -> WriteDescriptorSet {
        let info = vk::DescriptorImageInfo::builder()
            .image_view(image_view)
            .image_layout(vk::ImageLayout::GENERAL)
            .build();

        WriteDescriptorSet {
            binding,
            info: DescriptorInfo::StorageImage(info),
        }
    }

    pub fn uniform_texel_buffers(
        binding: u32,
        views: impl IntoIterator<Item = vk::BufferView>,
    ) -> WriteDescriptorSet {
        WriteDescriptorSet {
            binding,
            info: DescriptorInfo::UniformTexelBuffers(views.into_iter().collect()),
        }
    }

    pub fn acceleration_structure(
        binding: u32,
        handle: vk::AccelerationStructureKHR,
    ) -> WriteDescriptorSet {
        WriteDescriptorSet {
            binding,
            info: DescriptorInfo::AccelerationStructure(handle),
        }
    }
}
