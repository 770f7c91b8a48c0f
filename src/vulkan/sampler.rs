use std::sync::Arc;

use ash::vk;

use crate::error::{RendererError, RendererResult};
use crate::loader::{AddressMode, Filter, SamplerInfo};

use super::context::Context;

pub struct Sampler {
    pub inner: vk::Sampler,
    context: Arc<Context>,
}

impl Sampler {
    pub fn new(context: Arc<Context>, info: &SamplerInfo) -> RendererResult<Self> {
        let create_info = vk::SamplerCreateInfo::builder()
            .min_filter(vk_filter(info.min_filter))
            .mag_filter(vk_filter(info.mag_filter))
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk_address_mode(info.address_mode[0]))
            .address_mode_v(vk_address_mode(info.address_mode[1]))
            .address_mode_w(vk_address_mode(info.address_mode[2]))
            .max_lod(vk::LOD_CLAMP_NONE);

        let sampler = unsafe { context.device.create_sampler(&create_info, None) }
            .map_err(RendererError::vulkan("creating a sampler"))?;

        Ok(Self {
            inner: sampler,
            context,
        })
    }
}

fn vk_filter(filter: Filter) -> vk::Filter {
    match filter {
        Filter::Nearest => vk::Filter::NEAREST,
        Filter::Linear => vk::Filter::LINEAR,
    }
}

fn vk_address_mode(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.context.device.destroy_sampler(self.inner, None);
        }
    }
}
