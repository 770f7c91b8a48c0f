use std::sync::Arc;

use ash::vk;
use ultraviolet::Mat4;

use crate::error::{RendererError, RendererResult};

use super::{buffer::Buffer, command_pool::CommandPool, context::Context};

pub struct AccelerationStructure {
    pub inner: vk::AccelerationStructureKHR,
    pub context: Arc<Context>,
    pub buffer: Buffer<u8>,
    pub device_address: vk::DeviceAddress,
}

impl AccelerationStructure {
    // See https://github.com/SaschaWillems/Vulkan/blob/a467d941599a2cef5bd0eff696999bca8d75ee23/base/VulkanRaytracingSample.cpp#L149
    fn allocate(
        context: Arc<Context>,
        structure_type: vk::AccelerationStructureTypeKHR,
        build_size_info: vk::AccelerationStructureBuildSizesInfoKHR,
    ) -> RendererResult<Self> {
        let buffer: Buffer<u8> = Buffer::new(
            context.clone(),
            build_size_info.acceleration_structure_size,
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let create_info = vk::AccelerationStructureCreateInfoKHR::builder()
            .buffer(buffer.get_vk_buffer())
            .size(build_size_info.acceleration_structure_size)
            .ty(structure_type);

        let inner = unsafe {
            context
                .context_raytracing
                .acceleration_structure
                .create_acceleration_structure(&create_info, None)
        }
        .map_err(RendererError::vulkan("creating an acceleration structure"))?;

        let device_address = {
            let acceleration_structure_device_address_info =
                vk::AccelerationStructureDeviceAddressInfoKHR::builder()
                    .acceleration_structure(inner);

            unsafe {
                context
                    .context_raytracing
                    .acceleration_structure
                    .get_acceleration_structure_device_address(
                        &acceleration_structure_device_address_info,
                    )
            }
        };

        Ok(Self {
            inner,
            context,
            buffer,
            device_address,
        })
    }

    /// Builds a static acceleration structure over one partition's triangle
    /// geometry. The structure never supports updates, static geometry is
    /// rebuilt from scratch or not at all.
    pub fn build_bottom_level(
        context: Arc<Context>,
        command_pool: &CommandPool,
        vertex_buffer: &Buffer<[f32; 4]>,
        vertex_count: u32,
        index_buffer: &Buffer<u32>,
        triangle_count: u32,
    ) -> RendererResult<Self> {
        let geometry = vk::AccelerationStructureGeometryKHR::builder()
            .geometry_type(vk::GeometryTypeKHR::TRIANGLES)
            .geometry(vk::AccelerationStructureGeometryDataKHR {
                triangles: vk::AccelerationStructureGeometryTrianglesDataKHR::builder()
                    .vertex_data(vk::DeviceOrHostAddressConstKHR {
                        device_address: vertex_buffer.get_device_address(),
                    })
                    .vertex_format(vk::Format::R32G32B32_SFLOAT)
                    .vertex_stride(std::mem::size_of::<[f32; 4]>() as u64)
                    .max_vertex(vertex_count.saturating_sub(1))
                    .index_data(vk::DeviceOrHostAddressConstKHR {
                        device_address: index_buffer.get_device_address(),
                    })
                    .index_type(vk::IndexType::UINT32)
                    .build(),
            })
            .flags(vk::GeometryFlagsKHR::OPAQUE)
            .build();

        let mut build_info = vk::AccelerationStructureBuildGeometryInfoKHR::builder()
            .flags(vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE)
            .geometries(std::slice::from_ref(&geometry))
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .ty(vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL)
            .build();

        let size_info = unsafe {
            context
                .context_raytracing
                .acceleration_structure
                .get_acceleration_structure_build_sizes(
                    vk::AccelerationStructureBuildTypeKHR::DEVICE,
                    &build_info,
                    &[triangle_count],
                )
        };

        let acceleration_structure = Self::allocate(
            context.clone(),
            vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL,
            size_info,
        )?;

        let scratch_buffer: Buffer<u8> = Buffer::new(
            context.clone(),
            size_info.build_scratch_size,
            vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS | vk::BufferUsageFlags::STORAGE_BUFFER,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        build_info.dst_acceleration_structure = acceleration_structure.inner;
        build_info.scratch_data = vk::DeviceOrHostAddressKHR {
            device_address: scratch_buffer.get_device_address(),
        };

        let build_range_info = vk::AccelerationStructureBuildRangeInfoKHR::builder()
            .primitive_count(triangle_count)
            .build();

        command_pool.submit_one_time_commands(|command_buffer| unsafe {
            context
                .context_raytracing
                .acceleration_structure
                .cmd_build_acceleration_structures(
                    command_buffer,
                    std::slice::from_ref(&build_info),
                    &[std::slice::from_ref(&build_range_info)],
                );
        })?;

        Ok(acceleration_structure)
    }
}

impl Drop for AccelerationStructure {
    fn drop(&mut self) {
        unsafe {
            self.context
                .context_raytracing
                .acceleration_structure
                .destroy_acceleration_structure(self.inner, None);
        }
    }
}

/// The single mutable structure aggregating every placed instance. Its
/// capacity is fixed at build time, transform changes are applied by refits
/// that never change the instance count.
pub struct TopLevelAccelerationStructure {
    structure: AccelerationStructure,
    update_scratch: Buffer<u8>,
    instance_count: u32,
}

impl TopLevelAccelerationStructure {
    pub fn build(
        context: Arc<Context>,
        command_pool: &CommandPool,
        instance_buffer: &Buffer<vk::AccelerationStructureInstanceKHR>,
        instance_count: u32,
    ) -> RendererResult<Self> {
        let geometry = Self::instances_geometry(instance_buffer);

        let mut build_info = vk::AccelerationStructureBuildGeometryInfoKHR::builder()
            .flags(
                vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE
                    | vk::BuildAccelerationStructureFlagsKHR::ALLOW_UPDATE,
            )
            .geometries(std::slice::from_ref(&geometry))
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .ty(vk::AccelerationStructureTypeKHR::TOP_LEVEL)
            .build();

        let size_info = unsafe {
            context
                .context_raytracing
                .acceleration_structure
                .get_acceleration_structure_build_sizes(
                    vk::AccelerationStructureBuildTypeKHR::DEVICE,
                    &build_info,
                    &[instance_count],
                )
        };

        let structure = AccelerationStructure::allocate(
            context.clone(),
            vk::AccelerationStructureTypeKHR::TOP_LEVEL,
            size_info,
        )?;

        let build_scratch: Buffer<u8> = Buffer::new(
            context.clone(),
            size_info.build_scratch_size,
            vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS | vk::BufferUsageFlags::STORAGE_BUFFER,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        let update_scratch: Buffer<u8> = Buffer::new(
            context.clone(),
            size_info.update_scratch_size.max(1),
            vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS | vk::BufferUsageFlags::STORAGE_BUFFER,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        build_info.dst_acceleration_structure = structure.inner;
        build_info.scratch_data = vk::DeviceOrHostAddressKHR {
            device_address: build_scratch.get_device_address(),
        };

        let build_range_info = vk::AccelerationStructureBuildRangeInfoKHR::builder()
            .primitive_count(instance_count)
            .build();

        command_pool.submit_one_time_commands(|command_buffer| unsafe {
            context
                .context_raytracing
                .acceleration_structure
                .cmd_build_acceleration_structures(
                    command_buffer,
                    std::slice::from_ref(&build_info),
                    &[std::slice::from_ref(&build_range_info)],
                );
        })?;

        Ok(Self {
            structure,
            update_scratch,
            instance_count,
        })
    }

    pub fn handle(&self) -> vk::AccelerationStructureKHR {
        self.structure.inner
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Records a refit over the (host coherent, already rewritten) instance
    /// buffer, followed by the barrier that makes the refit visible to the ray
    /// tracing stage of the same command buffer.
    pub fn record_refit(
        &self,
        command_buffer: vk::CommandBuffer,
        instance_buffer: &Buffer<vk::AccelerationStructureInstanceKHR>,
    ) {
        let context = &self.structure.context;
        let geometry = Self::instances_geometry(instance_buffer);

        let mut build_info = vk::AccelerationStructureBuildGeometryInfoKHR::builder()
            .flags(
                vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE
                    | vk::BuildAccelerationStructureFlagsKHR::ALLOW_UPDATE,
            )
            .geometries(std::slice::from_ref(&geometry))
            .mode(vk::BuildAccelerationStructureModeKHR::UPDATE)
            .ty(vk::AccelerationStructureTypeKHR::TOP_LEVEL)
            .build();
        build_info.src_acceleration_structure = self.structure.inner;
        build_info.dst_acceleration_structure = self.structure.inner;
        build_info.scratch_data = vk::DeviceOrHostAddressKHR {
            device_address: self.update_scratch.get_device_address(),
        };

        let build_range_info = vk::AccelerationStructureBuildRangeInfoKHR::builder()
            .primitive_count(self.instance_count)
            .build();

        unsafe {
            context
                .context_raytracing
                .acceleration_structure
                .cmd_build_acceleration_structures(
                    command_buffer,
                    std::slice::from_ref(&build_info),
                    &[std::slice::from_ref(&build_range_info)],
                );
        }

        // The refit must be visible to the trace call recorded right after.
        let memory_barrier = vk::MemoryBarrier2::builder()
            .src_stage_mask(vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR)
            .src_access_mask(vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR)
            .dst_stage_mask(vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR)
            .dst_access_mask(vk::AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR);
        let dependency_info = vk::DependencyInfo::builder()
            .memory_barriers(std::slice::from_ref(&memory_barrier));
        unsafe {
            context
                .synchronisation2_loader
                .cmd_pipeline_barrier2(command_buffer, &dependency_info)
        };
    }

    fn instances_geometry(
        instance_buffer: &Buffer<vk::AccelerationStructureInstanceKHR>,
    ) -> vk::AccelerationStructureGeometryKHR {
        vk::AccelerationStructureGeometryKHR::builder()
            .geometry_type(vk::GeometryTypeKHR::INSTANCES)
            .geometry(vk::AccelerationStructureGeometryDataKHR {
                instances: vk::AccelerationStructureGeometryInstancesDataKHR::builder()
                    .array_of_pointers(false)
                    .data(vk::DeviceOrHostAddressConstKHR {
                        device_address: instance_buffer.get_device_address(),
                    })
                    .build(),
            })
            .build()
    }
}

/// Packs one placed instance into the layout the top level build consumes.
/// The custom index is limited to 24 bits by the API.
pub fn geometry_instance(
    transform: &Mat4,
    custom_index: u32,
    blas_address: vk::DeviceAddress,
) -> vk::AccelerationStructureInstanceKHR {
    vk::AccelerationStructureInstanceKHR {
        transform: transform_matrix(transform),
        instance_custom_index_and_mask: vk::Packed24_8::new(custom_index & 0x00ff_ffff, 0xff),
        instance_shader_binding_table_record_offset_and_flags: vk::Packed24_8::new(
            0,
            vk::GeometryInstanceFlagsKHR::FORCE_OPAQUE.as_raw() as u8,
        ),
        acceleration_structure_reference: vk::AccelerationStructureReferenceKHR {
            device_handle: blas_address,
        },
    }
}

/// Vulkan wants a row major 3x4 matrix, ultraviolet stores columns.
fn transform_matrix(transform: &Mat4) -> vk::TransformMatrixKHR {
    let mut matrix = [0.0f32; 12];
    for row in 0..3 {
        for column in 0..4 {
            matrix[row * 4 + column] = transform.cols[column][row];
        }
    }
    vk::TransformMatrixKHR { matrix }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultraviolet::Vec3;

    #[test]
    fn transform_matrix_is_row_major() {
        let transform = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let matrix = transform_matrix(&transform).matrix;

        // Rows are (1 0 0 tx), (0 1 0 ty), (0 0 1 tz)
        assert_eq!(matrix[0], 1.0);
        assert_eq!(matrix[3], 1.0);
        assert_eq!(matrix[7], 2.0);
        assert_eq!(matrix[11], 3.0);
    }

    #[test]
    fn custom_index_is_masked_to_24_bits() {
        let instance = geometry_instance(&Mat4::identity(), 0x01ff_ffff, 0);
        assert_eq!(instance.instance_custom_index_and_mask.low_24(), 0x00ff_ffff);
        assert_eq!(instance.instance_custom_index_and_mask.high_8(), 0xff);
    }
}
