use std::sync::Arc;
use std::{marker::PhantomData, ops::Deref};

use ash::{self, vk};

use crate::error::{RendererError, RendererResult};
use crate::find_memorytype_index;
use crate::vulkan::context::Context;

pub struct UntypedBuffer {
    pub inner: vk::Buffer,
    pub usage: vk::BufferUsageFlags,
    pub memory: vk::DeviceMemory,
    pub size: vk::DeviceSize,
    context: Arc<Context>,
}

impl UntypedBuffer {
    pub fn get_device_address(&self) -> vk::DeviceAddress {
        let info = vk::BufferDeviceAddressInfo::builder().buffer(self.inner);
        unsafe {
            self.context
                .buffer_device_address
                .get_buffer_device_address(&info)
        }
    }
}

pub struct Buffer<T> {
    inner: Arc<UntypedBuffer>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Copy> Buffer<T> {
    pub fn new(
        context: Arc<Context>,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        memory_property_flags: vk::MemoryPropertyFlags,
    ) -> RendererResult<Buffer<T>> {
        let device = &context.device;

        let create_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&create_info, None) }
            .map_err(RendererError::vulkan("creating a buffer"))?;

        let buffer_memory_requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let buffer_memorytype_index = find_memorytype_index(
            &buffer_memory_requirements,
            &context.device_memory_properties,
            memory_property_flags,
        )
        .ok_or_else(|| {
            RendererError::Runtime("no suitable memory type for a buffer".to_string())
        })?;

        let mut allocate_flags_info =
            vk::MemoryAllocateFlagsInfo::builder().flags(vk::MemoryAllocateFlags::DEVICE_ADDRESS);

        let mut allocate_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(buffer_memory_requirements.size)
            .memory_type_index(buffer_memorytype_index);
        if usage.contains(vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS) {
            allocate_info = allocate_info.push_next(&mut allocate_flags_info);
        }

        let memory = unsafe { device.allocate_memory(&allocate_info, None) }
            .map_err(RendererError::vulkan("allocating buffer memory"))?;

        unsafe { device.bind_buffer_memory(buffer, memory, 0) }
            .map_err(RendererError::vulkan("binding buffer memory"))?;

        let untyped = Arc::new(UntypedBuffer {
            inner: buffer,
            usage,
            memory,
            size: buffer_memory_requirements.size,
            context,
        });
        Ok(Buffer {
            inner: untyped,
            len: size as usize / std::mem::size_of::<T>().max(1),
            _marker: PhantomData,
        })
    }

    /// Creates a host visible buffer holding a copy of `data`.
    pub fn from_data(
        context: Arc<Context>,
        data: &[T],
        usage: vk::BufferUsageFlags,
    ) -> RendererResult<Buffer<T>> {
        let size = std::mem::size_of_val(data) as vk::DeviceSize;
        let buffer = Buffer::new(
            context,
            size,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        buffer.copy_data(data)?;
        Ok(buffer)
    }

    pub fn copy_data(&self, data: &[T]) -> RendererResult<()> {
        let device = self.get_device();
        let buffer_ptr = unsafe {
            device.map_memory(
                self.inner.memory,
                0,
                self.inner.size,
                vk::MemoryMapFlags::empty(),
            )
        }
        .map_err(RendererError::vulkan("mapping buffer memory"))? as *mut T;

        unsafe { buffer_ptr.copy_from_nonoverlapping(data.as_ptr(), data.len()) };

        unsafe { device.unmap_memory(self.inner.memory) };
        Ok(())
    }
}

impl<T> Buffer<T> {
    pub fn get_vk_buffer(&self) -> vk::Buffer {
        self.inner.inner
    }

    fn get_device(&self) -> &ash::Device {
        &self.inner.context.device
    }

    pub fn get_device_address(&self) -> vk::DeviceAddress {
        self.inner.get_device_address()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.inner.size
    }

    pub fn get_untyped(&self) -> &Arc<UntypedBuffer> {
        &self.inner
    }
}

impl Drop for UntypedBuffer {
    fn drop(&mut self) {
        let device = &self.context.device;
        unsafe { device.destroy_buffer(self.inner, None) };
        unsafe { device.free_memory(self.memory, None) };
    }
}

impl<T> Deref for Buffer<T> {
    type Target = vk::Buffer;

    fn deref(&self) -> &Self::Target {
        &self.inner.inner
    }
}
