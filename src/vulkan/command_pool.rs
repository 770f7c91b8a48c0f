use std::{ops::Deref, sync::Arc};

use ash::vk;

use crate::error::{RendererError, RendererResult};

use super::context::Context;

#[derive(Clone)]
pub struct CommandPool {
    inner: Arc<CommandPoolImpl>,
}

impl CommandPool {
    pub fn new(context: Arc<Context>) -> RendererResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(context.queue_family_index)
            .flags(
                vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER
                    | vk::CommandPoolCreateFlags::TRANSIENT,
            );

        let command_pool = unsafe { context.device.create_command_pool(&create_info, None) }
            .map_err(RendererError::vulkan("creating a command pool"))?;

        Ok(Self {
            inner: Arc::new(CommandPoolImpl {
                inner: command_pool,
                context,
            }),
        })
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.inner.context
    }

    /// Records commands into a transient command buffer, submits it and waits
    /// for the queue to drain. Used for uploads and acceleration structure
    /// builds during ingestion, never per frame.
    pub fn submit_one_time_commands(
        &self,
        record: impl FnOnce(vk::CommandBuffer),
    ) -> RendererResult<()> {
        let context = self.context();
        let device = &context.device;

        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_buffer_count(1)
            .command_pool(**self)
            .level(vk::CommandBufferLevel::PRIMARY);

        let command_buffer = unsafe { device.allocate_command_buffers(&allocate_info) }
            .map_err(RendererError::vulkan("allocating a command buffer"))?[0];

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.begin_command_buffer(command_buffer, &begin_info) }
            .map_err(RendererError::vulkan("beginning a command buffer"))?;

        record(command_buffer);

        unsafe { device.end_command_buffer(command_buffer) }
            .map_err(RendererError::vulkan("ending a command buffer"))?;

        let submit_info =
            vk::SubmitInfo::builder().command_buffers(std::slice::from_ref(&command_buffer));
        let submit_result = unsafe {
            device.queue_submit(
                context.queue,
                std::slice::from_ref(&submit_info),
                vk::Fence::null(),
            )
        }
        .map_err(RendererError::vulkan("submitting one time commands"));

        let wait_result = unsafe { device.queue_wait_idle(context.queue) }
            .map_err(RendererError::vulkan("waiting for one time commands"));

        unsafe { device.free_command_buffers(**self, std::slice::from_ref(&command_buffer)) };

        submit_result.and(wait_result)
    }
}

struct CommandPoolImpl {
    pub inner: vk::CommandPool,
    pub context: Arc<Context>,
}

impl Drop for CommandPoolImpl {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_command_pool(self.inner, None) };
    }
}

impl Deref for CommandPool {
    type Target = vk::CommandPool;

    fn deref(&self) -> &Self::Target {
        &self.inner.inner
    }
}
