use std::sync::Arc;

use ash::vk;

use crate::error::{RendererError, RendererResult};

use super::{buffer::UntypedBuffer, context::Context};

/// A typed, shader addressable view over a whole attribute buffer. Keeps the
/// underlying buffer alive for as long as any descriptor may reference it.
pub struct BufferView {
    pub inner: vk::BufferView,
    _buffer: Arc<UntypedBuffer>,
    context: Arc<Context>,
}

impl BufferView {
    pub fn new(
        context: Arc<Context>,
        buffer: Arc<UntypedBuffer>,
        format: vk::Format,
    ) -> RendererResult<Self> {
        let create_info = vk::BufferViewCreateInfo::builder()
            .buffer(buffer.inner)
            .format(format)
            .offset(0)
            .range(vk::WHOLE_SIZE);

        let inner = unsafe { context.device.create_buffer_view(&create_info, None) }
            .map_err(RendererError::vulkan("creating a texel buffer view"))?;

        Ok(Self {
            inner,
            _buffer: buffer,
            context,
        })
    }
}

impl Drop for BufferView {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_buffer_view(self.inner, None) };
    }
}
