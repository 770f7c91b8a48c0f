use std::sync::Arc;

use super::{Asset, AssetId};

#[derive(Clone)]
pub struct LoadedTexture {
    pub image: Arc<LoadedImage>,
    pub sampler: Arc<LoadedSampler>,
}

/// Decoded color data, already converted to tightly packed RGBA8 and flipped
/// vertically to match the texture coordinate convention of the shaders.
pub struct LoadedImage {
    pub id: AssetId,
    pub data: Vec<u8>,
    pub extent: [u32; 2],
}

impl Asset for LoadedImage {
    fn id(&self) -> AssetId {
        self.id
    }
}

pub struct LoadedSampler {
    pub id: AssetId,
    pub sampler_info: SamplerInfo,
}

impl Asset for LoadedSampler {
    fn id(&self) -> AssetId {
        self.id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SamplerInfo {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mipmap_mode: MipmapMode,
    pub address_mode: [AddressMode; 3],
}

impl Default for SamplerInfo {
    fn default() -> Self {
        Self {
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            mipmap_mode: MipmapMode::Linear,
            address_mode: [AddressMode::Repeat; 3],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MipmapMode {
    Nearest,
    Linear,
}
