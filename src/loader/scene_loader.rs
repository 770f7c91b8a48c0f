use std::{collections::HashMap, path::Path, sync::Arc};

use anyhow::{anyhow, Context as _};
use ultraviolet::Vec3;

use crate::transform::Transform;

use super::{
    AddressMode, AssetId, AssetLoader, Filter, LoadedImage, LoadedMaterial, LoadedMesh,
    LoadedModel, LoadedPrimitive, LoadedSampler, LoadedScene, LoadedTexture, MipmapMode,
    SamplerInfo,
};

struct SceneLoadingData {
    buffers: Vec<gltf::buffer::Data>,
    images: Vec<gltf::image::Data>,
    material_ids: HashMap<MaterialKey, AssetId>,
    mesh_ids: HashMap<(usize, usize), AssetId>,
    sampler_ids: HashMap<SamplerKey, AssetId>,
    image_ids: HashMap<usize, AssetId>,
}

impl SceneLoadingData {
    fn new(buffers: Vec<gltf::buffer::Data>, images: Vec<gltf::image::Data>) -> Self {
        Self {
            buffers,
            images,
            material_ids: HashMap::new(),
            mesh_ids: HashMap::new(),
            sampler_ids: HashMap::new(),
            image_ids: HashMap::new(),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Debug)]
struct MaterialKey {
    index: Option<usize>,
}

#[derive(Hash, Eq, PartialEq, Debug)]
struct SamplerKey {
    index: Option<usize>,
}

/// A model in the loaded scene is one glTF mesh; every node that references
/// the mesh contributes one placement instance.
struct ModelBuilder {
    name: String,
    instances: Vec<Transform>,
    primitives: Vec<LoadedPrimitive>,
}

impl AssetLoader {
    pub fn load_scene(&mut self, path: impl AsRef<Path>) -> anyhow::Result<LoadedScene> {
        let path = path.as_ref();
        let (gltf, buffers, images) = gltf::import(path)
            .with_context(|| format!("could not import scene file {}", path.display()))?;

        let scene = gltf
            .default_scene()
            .ok_or_else(|| anyhow!("scene file {} has no default scene", path.display()))?;

        let mut loading_data = SceneLoadingData::new(buffers, images);
        let mut models: Vec<ModelBuilder> = Vec::new();
        let mut model_slots: HashMap<usize, usize> = HashMap::new();

        for node in scene.nodes() {
            self.load_node(
                &mut loading_data,
                &node,
                Transform::default(),
                &mut models,
                &mut model_slots,
            )?;
        }

        Ok(LoadedScene {
            models: models
                .into_iter()
                .map(|builder| LoadedModel {
                    name: builder.name,
                    instances: builder.instances,
                    primitives: builder.primitives,
                })
                .collect(),
        })
    }

    fn load_node(
        &mut self,
        loading_data: &mut SceneLoadingData,
        node: &gltf::Node<'_>,
        parent_transform: Transform,
        models: &mut Vec<ModelBuilder>,
        model_slots: &mut HashMap<usize, usize>,
    ) -> anyhow::Result<()> {
        let local_transform = node.transform().into();
        let global_transform = &parent_transform * local_transform;

        for child in node.children() {
            self.load_node(
                loading_data,
                &child,
                global_transform.clone(),
                models,
                model_slots,
            )?;
        }

        if let Some(mesh) = node.mesh() {
            let slot = match model_slots.get(&mesh.index()) {
                Some(&slot) => slot,
                None => {
                    let slot = models.len();
                    models.push(ModelBuilder {
                        name: mesh
                            .name()
                            .map(str::to_owned)
                            .unwrap_or_else(|| format!("model_{}", mesh.index())),
                        instances: Vec::new(),
                        primitives: self.load_primitives(loading_data, &mesh)?,
                    });
                    model_slots.insert(mesh.index(), slot);
                    slot
                }
            };
            models[slot].instances.push(global_transform);
        }

        Ok(())
    }

    fn load_primitives(
        &mut self,
        loading_data: &mut SceneLoadingData,
        mesh: &gltf::Mesh<'_>,
    ) -> anyhow::Result<Vec<LoadedPrimitive>> {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "skipping non-triangle primitive in mesh {:?}",
                    mesh.name().unwrap_or("<unnamed>")
                );
                continue;
            }
            let material = self.load_material(loading_data, &primitive.material());
            let mesh = self.load_mesh(loading_data, mesh.index(), &primitive)?;
            primitives.push(LoadedPrimitive { material, mesh });
        }
        Ok(primitives)
    }

    fn load_material(
        &mut self,
        loading_data: &mut SceneLoadingData,
        material: &gltf::Material<'_>,
    ) -> Arc<LoadedMaterial> {
        let key = MaterialKey {
            index: material.index(),
        };

        if let Some(id) = loading_data.material_ids.get(&key) {
            return self.materials.assets[id].clone();
        }

        let id = self.id_generator.next();
        let pbr = material.pbr_metallic_roughness();
        let base_color_factor = pbr.base_color_factor();
        let base_color = Vec3::new(
            base_color_factor[0],
            base_color_factor[1],
            base_color_factor[2],
        );
        let base_color_texture = pbr.base_color_texture().map(|info| {
            let texture = info.texture();
            LoadedTexture {
                image: self.load_image(loading_data, &texture.source()),
                sampler: self.load_sampler(loading_data, &texture.sampler()),
            }
        });

        let emissive_strength = material.emissive_strength().unwrap_or(1.0);
        let loaded = Arc::new(LoadedMaterial {
            id,
            base_color,
            base_color_texture,
            roughness_factor: pbr.roughness_factor(),
            metallic_factor: pbr.metallic_factor(),
            emissivity: Vec3::from(material.emissive_factor()) * emissive_strength,
        });

        loading_data.material_ids.insert(key, id);
        self.materials.insert(loaded.clone());
        loaded
    }

    fn load_mesh(
        &mut self,
        loading_data: &mut SceneLoadingData,
        mesh_index: usize,
        primitive: &gltf::Primitive<'_>,
    ) -> anyhow::Result<Arc<LoadedMesh>> {
        let key = (mesh_index, primitive.index());
        if let Some(id) = loading_data.mesh_ids.get(&key) {
            return Ok(self.meshes.assets[id].clone());
        }

        let reader =
            primitive.reader(|buffer| loading_data.buffers.get(buffer.index()).map(|b| &b.0[..]));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| anyhow!("primitive has no positions"))?
            .collect();
        let normals: Vec<[f32; 3]> = reader
            .read_normals()
            .ok_or_else(|| anyhow!("primitive has no normals"))?
            .collect();
        let uvs: Vec<[f32; 2]> = match reader.read_tex_coords(0) {
            Some(uvs) => uvs.into_f32().collect(),
            None => vec![[0.0, 0.0]; positions.len()],
        };
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        if normals.len() != positions.len() || uvs.len() != positions.len() {
            return Err(anyhow!(
                "primitive attribute arrays disagree on the vertex count"
            ));
        }

        let id = self.id_generator.next();
        let loaded = Arc::new(LoadedMesh {
            id,
            positions,
            normals,
            uvs,
            indices,
        });

        loading_data.mesh_ids.insert(key, id);
        self.meshes.insert(loaded.clone());
        Ok(loaded)
    }

    fn load_image(
        &mut self,
        loading_data: &mut SceneLoadingData,
        image: &gltf::Image<'_>,
    ) -> Arc<LoadedImage> {
        if let Some(id) = loading_data.image_ids.get(&image.index()) {
            return self.images.assets[id].clone();
        }

        let data = &loading_data.images[image.index()];
        let id = self.id_generator.next();
        let loaded = Arc::new(LoadedImage {
            id,
            data: rgba8_flipped(data),
            extent: [data.width, data.height],
        });

        loading_data.image_ids.insert(image.index(), id);
        self.images.insert(loaded.clone());
        loaded
    }

    fn load_sampler(
        &mut self,
        loading_data: &mut SceneLoadingData,
        sampler: &gltf::texture::Sampler<'_>,
    ) -> Arc<LoadedSampler> {
        let key = SamplerKey {
            index: sampler.index(),
        };

        if let Some(id) = loading_data.sampler_ids.get(&key) {
            return self.samplers.assets[id].clone();
        }

        let address_mode_u = address_mode(sampler.wrap_s());
        let address_mode_v = address_mode(sampler.wrap_t());
        let sampler_info = SamplerInfo {
            min_filter: sampler
                .min_filter()
                .map(min_filter)
                .unwrap_or(Filter::Linear),
            mag_filter: sampler
                .mag_filter()
                .map(mag_filter)
                .unwrap_or(Filter::Linear),
            mipmap_mode: MipmapMode::Linear,
            address_mode: [address_mode_u, address_mode_v, AddressMode::Repeat],
        };

        let id = self.id_generator.next();
        let loaded = Arc::new(LoadedSampler { id, sampler_info });
        loading_data.sampler_ids.insert(key, id);
        self.samplers.insert(loaded.clone());
        loaded
    }
}

/// Expands the decoded pixel data to RGBA8 and flips it vertically.
fn rgba8_flipped(data: &gltf::image::Data) -> Vec<u8> {
    use gltf::image::Format;

    let width = data.width as usize;
    let height = data.height as usize;
    let (components, bytes_per_component) = match data.format {
        Format::R8 => (1, 1),
        Format::R8G8 => (2, 1),
        Format::R8G8B8 => (3, 1),
        Format::R8G8B8A8 => (4, 1),
        Format::R16 => (1, 2),
        Format::R16G16 => (2, 2),
        Format::R16G16B16 => (3, 2),
        Format::R16G16B16A16 => (4, 2),
        Format::R32G32B32FLOAT => (3, 4),
        Format::R32G32B32A32FLOAT => (4, 4),
    };
    let src_stride = width * components * bytes_per_component;

    let mut rgba = vec![0u8; width * height * 4];
    for y in 0..height {
        let src_row = &data.pixels[y * src_stride..(y + 1) * src_stride];
        let dst_y = height - 1 - y;
        for x in 0..width {
            let dst = &mut rgba[(dst_y * width + x) * 4..(dst_y * width + x) * 4 + 4];
            for c in 0..4 {
                dst[c] = if c < components {
                    // Use the most significant byte of wider component types
                    let offset = (x * components + c) * bytes_per_component;
                    src_row[offset + bytes_per_component - 1]
                } else if c == 3 {
                    0xff
                } else {
                    0
                };
            }
        }
    }
    rgba
}

fn address_mode(wrap: gltf::texture::WrappingMode) -> AddressMode {
    use gltf::texture::WrappingMode;
    match wrap {
        WrappingMode::ClampToEdge => AddressMode::ClampToEdge,
        WrappingMode::MirroredRepeat => AddressMode::MirroredRepeat,
        WrappingMode::Repeat => AddressMode::Repeat,
    }
}

fn min_filter(filter: gltf::texture::MinFilter) -> Filter {
    use gltf::texture::MinFilter;
    match filter {
        MinFilter::Nearest | MinFilter::NearestMipmapNearest | MinFilter::NearestMipmapLinear => {
            Filter::Nearest
        }
        _ => Filter::Linear,
    }
}

fn mag_filter(filter: gltf::texture::MagFilter) -> Filter {
    use gltf::texture::MagFilter;
    match filter {
        MagFilter::Nearest => Filter::Nearest,
        MagFilter::Linear => Filter::Linear,
    }
}
