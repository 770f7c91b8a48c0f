use std::ops::Range;
use std::sync::Arc;

use ash::vk;
use ultraviolet::{Mat4, Vec3};

use crate::error::RendererResult;
use crate::render::shader_types;
use crate::scene_plan::InstanceRecord;
use crate::vulkan::acceleration_structure::{
    geometry_instance, AccelerationStructure, TopLevelAccelerationStructure,
};
use crate::vulkan::buffer::Buffer;
use crate::vulkan::buffer_view::BufferView;
use crate::vulkan::image_view::ImageView;
use crate::vulkan::sampler::Sampler;

/// GPU resources of one (model, material) partition: the four attribute
/// buffers, their typed views and the static bottom level structure.
pub struct GeometryPartition {
    pub vertex_buffer: Buffer<[f32; 4]>,
    pub index_buffer: Buffer<u32>,
    pub normal_buffer: Buffer<[f32; 4]>,
    pub texcoord_buffer: Buffer<[f32; 2]>,

    pub position_view: BufferView,
    pub index_view: BufferView,
    pub normal_view: BufferView,
    pub texcoord_view: BufferView,

    pub blas: AccelerationStructure,
    pub triangle_count: u32,
}

pub struct TextureBinding {
    pub image_view: Arc<ImageView>,
    pub sampler: Arc<Sampler>,
}

/// Packed materials plus the texture array, uploaded once at ingestion.
/// `packed` is indexed by partition in creation order; the GPU buffer holds
/// the instance-expanded copy so the shader can address it with the instance
/// custom index directly.
pub struct MaterialAtlas {
    pub packed: Vec<shader_types::GpuMaterial>,
    pub buffer: Buffer<shader_types::Std430GpuMaterial>,
    pub textures: Vec<TextureBinding>,
}

/// Everything the ray tracing pipeline binds: per-partition geometry, the
/// per-instance view tables, the instance buffer with its top level
/// structure, and the material atlas.
pub struct Scene {
    pub partitions: Vec<GeometryPartition>,
    pub instances: Vec<InstanceRecord>,
    pub instance_data: Vec<vk::AccelerationStructureInstanceKHR>,
    pub instance_buffer: Buffer<vk::AccelerationStructureInstanceKHR>,
    pub tlas: TopLevelAccelerationStructure,
    pub material_atlas: MaterialAtlas,
    pub model_instance_ranges: Vec<(String, Range<usize>)>,
}

impl Scene {
    /// One view handle per instance, in custom index order. Instances of the
    /// same partition share the underlying view object.
    pub fn index_views(&self) -> Vec<vk::BufferView> {
        self.per_instance_views(|partition| partition.index_view.inner)
    }

    pub fn texcoord_views(&self) -> Vec<vk::BufferView> {
        self.per_instance_views(|partition| partition.texcoord_view.inner)
    }

    pub fn normal_views(&self) -> Vec<vk::BufferView> {
        self.per_instance_views(|partition| partition.normal_view.inner)
    }

    fn per_instance_views(
        &self,
        view: impl Fn(&GeometryPartition) -> vk::BufferView,
    ) -> Vec<vk::BufferView> {
        self.instances
            .iter()
            .map(|instance| view(&self.partitions[instance.partition_index]))
            .collect()
    }

    /// Translates every other instance, the demo payload of the directional
    /// key input. Rewrites the host mirror and the (host coherent) instance
    /// buffer; the caller is responsible for refitting the top level
    /// structure for every frame still in flight.
    pub fn nudge_instances(&mut self, delta: Vec3) -> RendererResult<()> {
        for (slot, instance) in self.instances.iter_mut().enumerate() {
            if slot % 2 == 0 {
                continue;
            }
            instance.transform.position += delta;

            let matrix: Mat4 = instance.transform.clone().into();
            self.instance_data[slot] = geometry_instance(
                &matrix,
                instance.custom_index,
                self.partitions[instance.partition_index]
                    .blas
                    .device_address,
            );
        }
        self.instance_buffer.copy_data(&self.instance_data)
    }
}
