use std::sync::Arc;

use ash::vk::{self, SwapchainCreateInfoKHR};
use winit::dpi::PhysicalSize;

use crate::error::{RendererError, RendererResult};
use crate::vulkan::context::Context;

pub struct SwapchainContainer {
    pub loader: ash::extensions::khr::Swapchain,
    pub inner: vk::SwapchainKHR,

    pub images: Vec<vk::Image>,
    pub imageviews: Vec<vk::ImageView>,

    pub format: vk::Format,
    pub surface_format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,

    present_mode: vk::PresentModeKHR,

    context: Arc<Context>,
}

impl SwapchainContainer {
    pub fn new(context: Arc<Context>, window_size: PhysicalSize<u32>) -> RendererResult<Self> {
        let capabilities = unsafe {
            context
                .surface_loader
                .get_physical_device_surface_capabilities(context.physical_device, context.surface)
        }
        .map_err(RendererError::vulkan("querying surface capabilities"))?;

        let formats = unsafe {
            context
                .surface_loader
                .get_physical_device_surface_formats(context.physical_device, context.surface)
        }
        .map_err(RendererError::vulkan("querying surface formats"))?;

        let present_modes = unsafe {
            context
                .surface_loader
                .get_physical_device_surface_present_modes(context.physical_device, context.surface)
        }
        .map_err(RendererError::vulkan("querying present modes"))?;

        // The ray tracing target must match the swapchain format for the full
        // image copy and be usable as a storage image, which rules out sRGB.
        let image_format = formats
            .into_iter()
            .min_by_key(|fmt| match (fmt.format, fmt.color_space) {
                (vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR) => 1,
                (vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR) => 2,
                (_, _) => 3,
            })
            .ok_or_else(|| RendererError::Runtime("surface reports no formats".to_string()))?;

        let present_mode = present_modes
            .into_iter()
            .find(|&pm| pm == vk::PresentModeKHR::MAILBOX)
            .unwrap_or(vk::PresentModeKHR::FIFO);

        let swapchain_extent = surface_extent(&capabilities, window_size);
        let num_images = capabilities.min_image_count.max(2);

        let swapchain_loader =
            ash::extensions::khr::Swapchain::new(&context.instance, &context.device);

        let create_info = SwapchainCreateInfoKHR::builder()
            .surface(context.surface)
            .min_image_count(num_images)
            .image_color_space(image_format.color_space)
            .image_format(image_format.format)
            .image_extent(swapchain_extent)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .image_array_layers(1);

        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(RendererError::vulkan("creating the swapchain"))?;

        let images = unsafe { swapchain_loader.get_swapchain_images(swapchain) }
            .map_err(RendererError::vulkan("getting the swapchain images"))?;

        let imageviews = create_image_views(&context, &images, image_format.format)?;

        Ok(Self {
            loader: swapchain_loader,
            inner: swapchain,
            images,
            imageviews,
            format: image_format.format,
            surface_format: image_format,
            extent: swapchain_extent,

            present_mode,

            context,
        })
    }

    /// The caller is responsible for making sure no in-flight frame still
    /// references the swapchain that is being replaced.
    pub fn recreate(&mut self, window_size: PhysicalSize<u32>) -> RendererResult<()> {
        let device = &self.context.device;

        let capabilities = unsafe {
            self.context
                .surface_loader
                .get_physical_device_surface_capabilities(
                    self.context.physical_device,
                    self.context.surface,
                )
        }
        .map_err(RendererError::vulkan("querying surface capabilities"))?;

        let num_images = capabilities.min_image_count.max(2);
        let swapchain_extent = surface_extent(&capabilities, window_size);

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(self.context.surface)
            .min_image_count(num_images)
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(swapchain_extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true)
            .old_swapchain(self.inner);

        let swapchain = unsafe { self.loader.create_swapchain(&create_info, None) }
            .map_err(RendererError::vulkan("recreating the swapchain"))?;

        let images = unsafe { self.loader.get_swapchain_images(swapchain) }
            .map_err(RendererError::vulkan("getting the swapchain images"))?;

        let imageviews = create_image_views(&self.context, &images, self.surface_format.format)?;

        for &imageview in self.imageviews.iter() {
            unsafe { device.destroy_image_view(imageview, None) };
        }
        unsafe { self.loader.destroy_swapchain(self.inner, None) };

        self.inner = swapchain;
        self.images = images;
        self.imageviews = imageviews;
        self.extent = swapchain_extent;

        Ok(())
    }
}

fn surface_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_size: PhysicalSize<u32>,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: window_size.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: window_size.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

fn create_image_views(
    context: &Arc<Context>,
    images: &[vk::Image],
    format: vk::Format,
) -> RendererResult<Vec<vk::ImageView>> {
    images
        .iter()
        .map(|&image| {
            let create_info = vk::ImageViewCreateInfo::builder()
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image(image);

            unsafe { context.device.create_image_view(&create_info, None) }
                .map_err(RendererError::vulkan("creating a swapchain image view"))
        })
        .collect()
}

impl Drop for SwapchainContainer {
    fn drop(&mut self) {
        for &imageview in self.imageviews.iter() {
            unsafe { self.context.device.destroy_image_view(imageview, None) };
        }
        unsafe { self.loader.destroy_swapchain(self.inner, None) };
    }
}
