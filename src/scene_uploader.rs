use std::collections::HashMap;
use std::sync::Arc;

use ash::vk;
use crevice::std430::AsStd430;
use ultraviolet::Mat4;

use crate::error::{RendererError, RendererResult};
use crate::loader::{AssetId, LoadedScene, SamplerInfo};
use crate::render::shader_types::{GpuMaterial, Std430GpuMaterial};
use crate::scene::{GeometryPartition, MaterialAtlas, Scene, TextureBinding};
use crate::scene_plan::ScenePlan;
use crate::vulkan::acceleration_structure::{
    geometry_instance, AccelerationStructure, TopLevelAccelerationStructure,
};
use crate::vulkan::buffer::Buffer;
use crate::vulkan::buffer_view::BufferView;
use crate::vulkan::command_pool::CommandPool;
use crate::vulkan::context::Context;
use crate::vulkan::image::Image;
use crate::vulkan::image_view::ImageView;
use crate::vulkan::sampler::Sampler;

/// Turns the ingestion plan into GPU residency: per-partition attribute
/// buffers and views, one bottom level structure per partition, the instance
/// buffer with the top level structure sized to exactly the planned instance
/// count, and the material atlas.
pub fn upload(
    plan: ScenePlan,
    loaded_scene: &LoadedScene,
    context: Arc<Context>,
    command_pool: &CommandPool,
) -> RendererResult<Scene> {
    if plan.instance_count() == 0 {
        return Err(RendererError::Configuration(
            "scene contains no placed geometry".to_string(),
        ));
    }

    let partitions = upload_partitions(&plan, loaded_scene, &context, command_pool)?;
    let material_atlas = upload_materials(&plan, &context, command_pool)?;

    let instance_data: Vec<vk::AccelerationStructureInstanceKHR> = plan
        .instances
        .iter()
        .map(|record| {
            let matrix: Mat4 = record.transform.clone().into();
            geometry_instance(
                &matrix,
                record.custom_index,
                partitions[record.partition_index].blas.device_address,
            )
        })
        .collect();

    let instance_buffer = Buffer::from_data(
        context.clone(),
        &instance_data,
        vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
            | vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR,
    )?;

    let tlas = TopLevelAccelerationStructure::build(
        context,
        command_pool,
        &instance_buffer,
        instance_data.len() as u32,
    )?;

    log::info!(
        "scene uploaded: {} models, {} partitions, {} instances",
        plan.model_instance_ranges.len(),
        plan.partitions.len(),
        plan.instances.len()
    );

    Ok(Scene {
        partitions,
        instances: plan.instances,
        instance_data,
        instance_buffer,
        tlas,
        material_atlas,
        model_instance_ranges: plan.model_instance_ranges,
    })
}

fn upload_partitions(
    plan: &ScenePlan,
    loaded_scene: &LoadedScene,
    context: &Arc<Context>,
    command_pool: &CommandPool,
) -> RendererResult<Vec<GeometryPartition>> {
    plan.partitions
        .iter()
        .map(|partition| {
            // The partition owns the union of its meshes' data, with indices
            // rebased onto the concatenated vertex array.
            let mut positions: Vec<[f32; 4]> = Vec::new();
            let mut normals: Vec<[f32; 4]> = Vec::new();
            let mut texcoords: Vec<[f32; 2]> = Vec::new();
            let mut indices: Vec<u32> = Vec::new();

            for &primitive_index in partition.primitive_indices.iter() {
                let mesh = &loaded_scene.models[partition.model_index].primitives
                    [primitive_index]
                    .mesh;

                let base_vertex = positions.len() as u32;
                positions.extend(
                    mesh.positions
                        .iter()
                        .map(|p| [p[0], p[1], p[2], 1.0]),
                );
                normals.extend(mesh.normals.iter().map(|n| [n[0], n[1], n[2], 0.0]));
                texcoords.extend(mesh.uvs.iter().copied());
                indices.extend(mesh.indices.iter().map(|&i| i + base_vertex));
            }

            if indices.is_empty() {
                return Err(RendererError::Configuration(format!(
                    "partition of model {:?} has no triangles",
                    loaded_scene.models[partition.model_index].name
                )));
            }

            let geometry_usage = vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
                | vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
                | vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER;
            let attribute_usage = vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER;

            let vertex_buffer = Buffer::from_data(context.clone(), &positions, geometry_usage)?;
            let index_buffer = Buffer::from_data(context.clone(), &indices, geometry_usage)?;
            let normal_buffer = Buffer::from_data(context.clone(), &normals, attribute_usage)?;
            let texcoord_buffer =
                Buffer::from_data(context.clone(), &texcoords, attribute_usage)?;

            let triangle_count = (indices.len() / 3) as u32;
            let blas = AccelerationStructure::build_bottom_level(
                context.clone(),
                command_pool,
                &vertex_buffer,
                positions.len() as u32,
                &index_buffer,
                triangle_count,
            )?;

            let position_view = BufferView::new(
                context.clone(),
                vertex_buffer.get_untyped().clone(),
                vk::Format::R32G32B32A32_SFLOAT,
            )?;
            let index_view = BufferView::new(
                context.clone(),
                index_buffer.get_untyped().clone(),
                vk::Format::R32_UINT,
            )?;
            let normal_view = BufferView::new(
                context.clone(),
                normal_buffer.get_untyped().clone(),
                vk::Format::R32G32B32A32_SFLOAT,
            )?;
            let texcoord_view = BufferView::new(
                context.clone(),
                texcoord_buffer.get_untyped().clone(),
                vk::Format::R32G32_SFLOAT,
            )?;

            Ok(GeometryPartition {
                vertex_buffer,
                index_buffer,
                normal_buffer,
                texcoord_buffer,
                position_view,
                index_view,
                normal_view,
                texcoord_view,
                blas,
                triangle_count,
            })
        })
        .collect()
}

/// Converts the partition materials into the packed array and uploads every
/// referenced texture. Texture slot 0 is a 1x1 white fallback so the sampler
/// array is never empty; untextured materials carry a negative slot.
fn upload_materials(
    plan: &ScenePlan,
    context: &Arc<Context>,
    command_pool: &CommandPool,
) -> RendererResult<MaterialAtlas> {
    struct PendingTexture {
        image: Image,
        staging: Buffer<u8>,
        sampler_info: SamplerInfo,
    }

    let mut pending: Vec<PendingTexture> = Vec::new();
    let mut texture_slots: HashMap<AssetId, i32> = HashMap::new();
    let mut packed: Vec<GpuMaterial> = Vec::new();

    let create_pending = |pixels: &[u8],
                          extent: [u32; 2],
                          sampler_info: SamplerInfo|
     -> RendererResult<PendingTexture> {
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            // Color data is authored in sRGB, sampling converts to linear.
            .format(vk::Format::R8G8B8A8_SRGB)
            .extent(vk::Extent3D {
                width: extent[0],
                height: extent[1],
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        Ok(PendingTexture {
            image: Image::new(context.clone(), &image_info)?,
            staging: Buffer::from_data(
                context.clone(),
                pixels,
                vk::BufferUsageFlags::TRANSFER_SRC,
            )?,
            sampler_info,
        })
    };

    let white_pixel: [u8; 4] = [0xff; 4];
    pending.push(create_pending(&white_pixel, [1, 1], SamplerInfo::default())?);

    for partition in plan.partitions.iter() {
        let material = &partition.material;
        let texture_slot = match &material.base_color_texture {
            Some(texture) => match texture_slots.get(&texture.image.id()) {
                Some(&slot) => slot,
                None => {
                    let slot = pending.len() as i32;
                    pending.push(create_pending(
                        &texture.image.data,
                        texture.image.extent,
                        texture.sampler.sampler_info,
                    )?);
                    texture_slots.insert(texture.image.id(), slot);
                    slot
                }
            },
            None => -1,
        };

        packed.push(GpuMaterial {
            base_color: material.base_color,
            base_color_texture: texture_slot,
            emissive: material.emissivity,
            roughness: material.roughness_factor,
            metallic: material.metallic_factor,
        });
    }

    // One submission for all texture uploads; the staging buffers stay alive
    // until the wait inside has finished.
    command_pool.submit_one_time_commands(|command_buffer| {
        for texture in pending.iter_mut() {
            texture
                .image
                .copy_from_buffer_for_texture(command_buffer, &texture.staging);
        }
    })?;

    let textures = pending
        .into_iter()
        .map(|texture| {
            let image_view = Arc::new(ImageView::new_default(
                context.clone(),
                Arc::new(texture.image),
                vk::ImageAspectFlags::COLOR,
            )?);
            let sampler = Arc::new(Sampler::new(context.clone(), &texture.sampler_info)?);
            Ok(TextureBinding {
                image_view,
                sampler,
            })
        })
        .collect::<RendererResult<Vec<_>>>()?;

    // The shader addresses materials by instance custom index, so the GPU
    // copy expands the per-partition array to one entry per instance.
    let expanded: Vec<Std430GpuMaterial> = plan
        .instances
        .iter()
        .map(|instance| packed[instance.partition_index].as_std430())
        .collect();

    let buffer = Buffer::from_data(
        context.clone(),
        &expanded,
        vk::BufferUsageFlags::STORAGE_BUFFER,
    )?;

    Ok(MaterialAtlas {
        packed,
        buffer,
        textures,
    })
}
