use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use ash::vk;

use crate::error::{RendererError, RendererResult};
use crate::render::render_target::RenderTarget;
use crate::render::shader_types::TraceParameters;
use crate::scene::Scene;
use crate::utility::aligned_size;
use crate::vulkan::buffer::Buffer;
use crate::vulkan::context::Context;
use crate::vulkan::descriptor_set::{DescriptorSet, WriteDescriptorSet};
use crate::vulkan::shader_create_info::ShaderCreateInfo;

/// SPIR-V for the three ray tracing stages. The build script compiles the
/// GLSL sources into the binary; a shader override directory supplies
/// recompiled binaries at runtime for the reload path.
pub struct ShaderSet {
    pub raygen: Vec<u8>,
    pub closest_hit: Vec<u8>,
    pub miss: Vec<u8>,
}

impl ShaderSet {
    pub fn embedded() -> Self {
        Self {
            raygen: include_bytes!(concat!(env!("OUT_DIR"), "/raytrace.rgen.spv")).to_vec(),
            closest_hit: include_bytes!(concat!(env!("OUT_DIR"), "/raytrace.rchit.spv")).to_vec(),
            miss: include_bytes!(concat!(env!("OUT_DIR"), "/raytrace.rmiss.spv")).to_vec(),
        }
    }

    pub fn load(override_dir: Option<&Path>) -> RendererResult<Self> {
        let mut shaders = Self::embedded();
        let Some(dir) = override_dir else {
            return Ok(shaders);
        };

        for (file_name, slot) in [
            ("raytrace.rgen.spv", &mut shaders.raygen),
            ("raytrace.rchit.spv", &mut shaders.closest_hit),
            ("raytrace.rmiss.spv", &mut shaders.miss),
        ] {
            let path = dir.join(file_name);
            if path.is_file() {
                *slot = std::fs::read(&path).map_err(|e| {
                    RendererError::Configuration(format!(
                        "could not read shader override {}: {}",
                        path.display(),
                        e
                    ))
                })?;
            }
        }
        Ok(shaders)
    }
}

/// The assembled ray tracing pipeline: descriptor set layouts, the push
/// constant range, the three shader groups and the shader binding table with
/// its strided regions. Rebuilding on shader change replaces this object
/// wholesale while buffers, structures and the render target stay untouched.
pub struct RayTracingPipeline {
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    pub descriptor_set_layouts: [vk::DescriptorSetLayout; 3],

    _sbt_buffer: Buffer<u8>,
    pub sbt_raygen_region: vk::StridedDeviceAddressRegionKHR,
    pub sbt_miss_region: vk::StridedDeviceAddressRegionKHR,
    pub sbt_hit_region: vk::StridedDeviceAddressRegionKHR,
    pub sbt_callable_region: vk::StridedDeviceAddressRegionKHR,

    context: Arc<Context>,
}

// Group order inside the shader binding table. Each region holds exactly one
// record, so every dispatch uses group index 0 of its region.
const GROUP_RAYGEN: usize = 0;
const GROUP_HIT: usize = 1;
const GROUP_MISS: usize = 2;
const GROUP_COUNT: usize = 3;

impl RayTracingPipeline {
    pub fn create(
        context: Arc<Context>,
        shaders: &ShaderSet,
        texture_count: u32,
        instance_count: u32,
    ) -> RendererResult<Self> {
        let device = &context.device;

        let descriptor_set_layouts =
            Self::create_descriptor_set_layouts(&context, texture_count, instance_count)?;

        let push_constant_range = vk::PushConstantRange::builder()
            .stage_flags(
                vk::ShaderStageFlags::RAYGEN_KHR | vk::ShaderStageFlags::CLOSEST_HIT_KHR,
            )
            .offset(0)
            .size(TraceParameters::SIZE)
            .build();

        let pipeline_layout = {
            let create_info = vk::PipelineLayoutCreateInfo::builder()
                .set_layouts(&descriptor_set_layouts)
                .push_constant_ranges(std::slice::from_ref(&push_constant_range));
            unsafe { device.create_pipeline_layout(&create_info, None) }
                .map_err(RendererError::vulkan("creating the pipeline layout"))?
        };

        let raygen_shader = ShaderCreateInfo::new(
            context.clone(),
            vk::ShaderStageFlags::RAYGEN_KHR,
            &shaders.raygen,
        )?;
        let closest_hit_shader = ShaderCreateInfo::new(
            context.clone(),
            vk::ShaderStageFlags::CLOSEST_HIT_KHR,
            &shaders.closest_hit,
        )?;
        let miss_shader = ShaderCreateInfo::new(
            context.clone(),
            vk::ShaderStageFlags::MISS_KHR,
            &shaders.miss,
        )?;

        let shader_stages = [
            raygen_shader.stage_create_info(),
            closest_hit_shader.stage_create_info(),
            miss_shader.stage_create_info(),
        ];

        let mut shader_groups = [vk::RayTracingShaderGroupCreateInfoKHR::default(); GROUP_COUNT];
        shader_groups[GROUP_RAYGEN] = vk::RayTracingShaderGroupCreateInfoKHR::builder()
            .ty(vk::RayTracingShaderGroupTypeKHR::GENERAL)
            .general_shader(0)
            .closest_hit_shader(vk::SHADER_UNUSED_KHR)
            .any_hit_shader(vk::SHADER_UNUSED_KHR)
            .intersection_shader(vk::SHADER_UNUSED_KHR)
            .build();
        shader_groups[GROUP_HIT] = vk::RayTracingShaderGroupCreateInfoKHR::builder()
            .ty(vk::RayTracingShaderGroupTypeKHR::TRIANGLES_HIT_GROUP)
            .general_shader(vk::SHADER_UNUSED_KHR)
            .closest_hit_shader(1)
            .any_hit_shader(vk::SHADER_UNUSED_KHR)
            .intersection_shader(vk::SHADER_UNUSED_KHR)
            .build();
        shader_groups[GROUP_MISS] = vk::RayTracingShaderGroupCreateInfoKHR::builder()
            .ty(vk::RayTracingShaderGroupTypeKHR::GENERAL)
            .general_shader(2)
            .closest_hit_shader(vk::SHADER_UNUSED_KHR)
            .any_hit_shader(vk::SHADER_UNUSED_KHR)
            .intersection_shader(vk::SHADER_UNUSED_KHR)
            .build();

        let create_info = vk::RayTracingPipelineCreateInfoKHR::builder()
            .stages(&shader_stages)
            .groups(&shader_groups)
            // Primary rays only, shading needs no recursion.
            .max_pipeline_ray_recursion_depth(1)
            .layout(pipeline_layout)
            .build();

        let pipeline = unsafe {
            context
                .context_raytracing
                .ray_tracing_pipeline
                .create_ray_tracing_pipelines(
                    vk::DeferredOperationKHR::null(),
                    vk::PipelineCache::null(),
                    std::slice::from_ref(&create_info),
                    None,
                )
        }
        .map_err(RendererError::vulkan("creating the ray tracing pipeline"))?[0];

        let (sbt_buffer, regions) = Self::create_shader_binding_table(&context, pipeline)?;

        Ok(Self {
            pipeline,
            pipeline_layout,
            descriptor_set_layouts,
            _sbt_buffer: sbt_buffer,
            sbt_raygen_region: regions[0],
            sbt_miss_region: regions[1],
            sbt_hit_region: regions[2],
            sbt_callable_region: regions[3],
            context,
        })
    }

    fn create_descriptor_set_layouts(
        context: &Arc<Context>,
        texture_count: u32,
        instance_count: u32,
    ) -> RendererResult<[vk::DescriptorSetLayout; 3]> {
        let device = &context.device;
        let instance_count = instance_count.max(1);

        let create_layout =
            |bindings: &[vk::DescriptorSetLayoutBinding]| -> RendererResult<vk::DescriptorSetLayout> {
                let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(bindings);
                unsafe { device.create_descriptor_set_layout(&create_info, None) }
                    .map_err(RendererError::vulkan("creating a descriptor set layout"))
            };

        // Set 0: everything the closest hit shader resolves via custom index.
        let scene_data_set = create_layout(&[
            vk::DescriptorSetLayoutBinding::builder()
                .binding(0)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(texture_count.max(1))
                .stage_flags(vk::ShaderStageFlags::CLOSEST_HIT_KHR)
                .build(),
            vk::DescriptorSetLayoutBinding::builder()
                .binding(1)
                .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::CLOSEST_HIT_KHR)
                .build(),
            vk::DescriptorSetLayoutBinding::builder()
                .binding(2)
                .descriptor_type(vk::DescriptorType::UNIFORM_TEXEL_BUFFER)
                .descriptor_count(instance_count)
                .stage_flags(vk::ShaderStageFlags::CLOSEST_HIT_KHR)
                .build(),
            vk::DescriptorSetLayoutBinding::builder()
                .binding(3)
                .descriptor_type(vk::DescriptorType::UNIFORM_TEXEL_BUFFER)
                .descriptor_count(instance_count)
                .stage_flags(vk::ShaderStageFlags::CLOSEST_HIT_KHR)
                .build(),
            vk::DescriptorSetLayoutBinding::builder()
                .binding(4)
                .descriptor_type(vk::DescriptorType::UNIFORM_TEXEL_BUFFER)
                .descriptor_count(instance_count)
                .stage_flags(vk::ShaderStageFlags::CLOSEST_HIT_KHR)
                .build(),
        ])?;

        // Set 1: the writable render target.
        let target_set = create_layout(&[vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::RAYGEN_KHR)
            .build()])?;

        // Set 2: the top level structure rays are traced against.
        let tlas_set = create_layout(&[vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR)
            .descriptor_count(1)
            .stage_flags(
                vk::ShaderStageFlags::RAYGEN_KHR | vk::ShaderStageFlags::CLOSEST_HIT_KHR,
            )
            .build()])?;

        Ok([scene_data_set, target_set, tlas_set])
    }

    fn create_shader_binding_table(
        context: &Arc<Context>,
        pipeline: vk::Pipeline,
    ) -> RendererResult<(Buffer<u8>, [vk::StridedDeviceAddressRegionKHR; 4])> {
        let properties = &context
            .context_raytracing
            .physical_device_ray_tracing_pipeline_properties_khr;
        let handle_size = properties.shader_group_handle_size;
        let handle_size_aligned =
            aligned_size(handle_size, properties.shader_group_base_alignment) as u64;

        let handles = unsafe {
            context
                .context_raytracing
                .ray_tracing_pipeline
                .get_ray_tracing_shader_group_handles(
                    pipeline,
                    0,
                    GROUP_COUNT as u32,
                    GROUP_COUNT * handle_size as usize,
                )
        }
        .map_err(RendererError::vulkan("fetching shader group handles"))?;

        let mut table_data = vec![0u8; GROUP_COUNT * handle_size_aligned as usize];
        for group in 0..GROUP_COUNT {
            let src = group * handle_size as usize..(group + 1) * handle_size as usize;
            let dst_start = group * handle_size_aligned as usize;
            table_data[dst_start..dst_start + handle_size as usize]
                .copy_from_slice(&handles[src]);
        }

        let sbt_buffer = Buffer::from_data(
            context.clone(),
            &table_data,
            vk::BufferUsageFlags::SHADER_BINDING_TABLE_KHR
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
        )?;
        let sbt_address = sbt_buffer.get_device_address();

        let region = |group: usize| {
            vk::StridedDeviceAddressRegionKHR::builder()
                .device_address(sbt_address + group as u64 * handle_size_aligned)
                .size(handle_size_aligned)
                .stride(handle_size_aligned)
                .build()
        };

        Ok((
            sbt_buffer,
            [
                region(GROUP_RAYGEN),
                region(GROUP_MISS),
                region(GROUP_HIT),
                vk::StridedDeviceAddressRegionKHR::default(),
            ],
        ))
    }
}

impl Drop for RayTracingPipeline {
    fn drop(&mut self) {
        let device = &self.context.device;
        unsafe { device.destroy_pipeline(self.pipeline, None) };
        unsafe { device.destroy_pipeline_layout(self.pipeline_layout, None) };
        for layout in self.descriptor_set_layouts.iter() {
            unsafe { device.destroy_descriptor_set_layout(*layout, None) };
        }
    }
}

pub struct FrameDescriptorSets {
    pub scene_data: vk::DescriptorSet,
    pub target: vk::DescriptorSet,
    pub tlas: vk::DescriptorSet,
}

/// Descriptor sets keyed by render target generation. Binding data other than
/// the target never changes after ingestion, so a generation's sets are built
/// once and reused every frame until a resize retires them.
pub struct DescriptorSetCache {
    pool: vk::DescriptorPool,
    sets: HashMap<u64, FrameDescriptorSets>,
    context: Arc<Context>,
}

impl DescriptorSetCache {
    pub fn new(context: Arc<Context>, scene: &Scene) -> RendererResult<Self> {
        let texture_count = scene.material_atlas.textures.len().max(1) as u32;
        let instance_count = (scene.instances.len().max(1)) as u32;

        // Sized for a handful of concurrent generations; stale generations
        // are freed before new ones are allocated.
        const GENERATIONS: u32 = 8;
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: texture_count * GENERATIONS,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER,
                descriptor_count: GENERATIONS,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_TEXEL_BUFFER,
                descriptor_count: 3 * instance_count * GENERATIONS,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_IMAGE,
                descriptor_count: GENERATIONS,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
                descriptor_count: GENERATIONS,
            },
        ];

        let create_info = vk::DescriptorPoolCreateInfo::builder()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .max_sets(3 * GENERATIONS)
            .pool_sizes(&pool_sizes);

        let pool = unsafe { context.device.create_descriptor_pool(&create_info, None) }
            .map_err(RendererError::vulkan("creating the descriptor pool"))?;

        Ok(Self {
            pool,
            sets: HashMap::new(),
            context,
        })
    }

    pub fn get_or_create(
        &mut self,
        pipeline: &RayTracingPipeline,
        scene: &Scene,
        target: &RenderTarget,
    ) -> RendererResult<&FrameDescriptorSets> {
        if !self.sets.contains_key(&target.generation) {
            let scene_data = DescriptorSet::new(
                self.context.clone(),
                self.pool,
                pipeline.descriptor_set_layouts[0],
                vec![
                    WriteDescriptorSet::image_view_sampler_array(
                        0,
                        scene
                            .material_atlas
                            .textures
                            .iter()
                            .map(|t| (t.image_view.inner, t.sampler.inner)),
                    ),
                    WriteDescriptorSet::storage_buffer(1, &scene.material_atlas.buffer),
                    WriteDescriptorSet::uniform_texel_buffers(2, scene.index_views()),
                    WriteDescriptorSet::uniform_texel_buffers(3, scene.texcoord_views()),
                    WriteDescriptorSet::uniform_texel_buffers(4, scene.normal_views()),
                ],
            )?;
            let target_set = DescriptorSet::new(
                self.context.clone(),
                self.pool,
                pipeline.descriptor_set_layouts[1],
                vec![WriteDescriptorSet::storage_image(
                    0,
                    target.image_view.inner,
                )],
            )?;
            let tlas_set = DescriptorSet::new(
                self.context.clone(),
                self.pool,
                pipeline.descriptor_set_layouts[2],
                vec![WriteDescriptorSet::acceleration_structure(
                    0,
                    scene.tlas.handle(),
                )],
            )?;

            self.sets.insert(
                target.generation,
                FrameDescriptorSets {
                    scene_data: scene_data.inner,
                    target: target_set.inner,
                    tlas: tlas_set.inner,
                },
            );
        }

        Ok(&self.sets[&target.generation])
    }

    /// Frees every cached set that references a superseded render target.
    /// Callers must guarantee no in-flight frame still uses them, the resize
    /// path waits for all frame fences before invoking this.
    pub fn remove_stale(&mut self, live_generation: u64) {
        let stale: Vec<u64> = self
            .sets
            .keys()
            .copied()
            .filter(|&generation| generation != live_generation)
            .collect();
        for generation in stale {
            if let Some(sets) = self.sets.remove(&generation) {
                let raw = [sets.scene_data, sets.target, sets.tlas];
                let _ = unsafe { self.context.device.free_descriptor_sets(self.pool, &raw) };
            }
        }
    }

    pub fn cached_generations(&self) -> Vec<u64> {
        let mut generations: Vec<u64> = self.sets.keys().copied().collect();
        generations.sort_unstable();
        generations
    }
}

impl Drop for DescriptorSetCache {
    fn drop(&mut self) {
        unsafe {
            self.context
                .device
                .destroy_descriptor_pool(self.pool, None)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::ShaderSet;

    #[test]
    fn reloading_without_source_changes_yields_identical_shaders() {
        let first = ShaderSet::load(None).unwrap();
        let second = ShaderSet::load(None).unwrap();
        assert_eq!(first.raygen, second.raygen);
        assert_eq!(first.closest_hit, second.closest_hit);
        assert_eq!(first.miss, second.miss);
    }
}
