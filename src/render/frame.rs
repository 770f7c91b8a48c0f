use std::sync::Arc;

use ash::vk;

use crate::error::{RendererError, RendererResult};
use crate::vulkan::command_pool::CommandPool;
use crate::vulkan::context::Context;

/// One in-flight frame: command buffer, the semaphore pair gating swapchain
/// image use, the fence that reports GPU completion, and bookkeeping about
/// what the slot recorded last.
pub struct FrameSlot {
    pub command_buffer: vk::CommandBuffer,
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    pub in_flight: vk::Fence,
    /// Global frame number this slot last recorded, 0 when never used.
    pub recorded_frame: u64,
    /// Render target generation the recorded commands reference.
    pub target_generation: u64,
}

/// Fixed ring of frame slots. Frame numbers are global and monotonic,
/// starting at 1; slot assignment is `(frame - 1) % count`, so waiting on a
/// slot's fence before reuse bounds the host exactly `count` frames ahead of
/// the GPU.
pub struct FrameSlots {
    slots: Vec<FrameSlot>,
    current_frame: u64,
    command_pool: CommandPool,
    context: Arc<Context>,
}

pub fn slot_for_frame(frame: u64, slot_count: usize) -> usize {
    debug_assert!(frame > 0);
    ((frame - 1) % slot_count as u64) as usize
}

impl FrameSlots {
    pub fn new(
        context: Arc<Context>,
        command_pool: CommandPool,
        count: usize,
    ) -> RendererResult<Self> {
        let device = &context.device;

        let command_buffers = {
            let allocate_info = vk::CommandBufferAllocateInfo::builder()
                .command_buffer_count(count as u32)
                .command_pool(*command_pool)
                .level(vk::CommandBufferLevel::PRIMARY);

            unsafe { device.allocate_command_buffers(&allocate_info) }
                .map_err(RendererError::vulkan("allocating frame command buffers"))?
        };

        let slots = command_buffers
            .into_iter()
            .map(|command_buffer| {
                let semaphore_info = vk::SemaphoreCreateInfo::builder();
                let image_available = unsafe { device.create_semaphore(&semaphore_info, None) }
                    .map_err(RendererError::vulkan("creating a frame semaphore"))?;
                let render_finished = unsafe { device.create_semaphore(&semaphore_info, None) }
                    .map_err(RendererError::vulkan("creating a frame semaphore"))?;

                // Signaled so the first wait on the slot passes immediately.
                let fence_info =
                    vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);
                let in_flight = unsafe { device.create_fence(&fence_info, None) }
                    .map_err(RendererError::vulkan("creating a frame fence"))?;

                Ok(FrameSlot {
                    command_buffer,
                    image_available,
                    render_finished,
                    in_flight,
                    recorded_frame: 0,
                    target_generation: 0,
                })
            })
            .collect::<RendererResult<Vec<_>>>()?;

        Ok(Self {
            slots,
            current_frame: 0,
            command_pool,
            context,
        })
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    /// Frames up to this number are guaranteed retired once `begin_frame`
    /// returned for the current frame.
    pub fn completed_watermark(&self) -> u64 {
        self.current_frame
            .saturating_sub(self.slots.len() as u64)
    }

    /// Advances the global frame counter and waits for the slot's previous
    /// recording to retire. The fence stays signaled until `reset_fence`,
    /// so a frame abandoned before submission never deadlocks the slot.
    pub fn begin_frame(&mut self) -> RendererResult<usize> {
        self.current_frame += 1;
        let slot_index = slot_for_frame(self.current_frame, self.slots.len());
        let fence = self.slots[slot_index].in_flight;

        let device = &self.context.device;
        unsafe { device.wait_for_fences(std::slice::from_ref(&fence), true, u64::MAX) }
            .map_err(RendererError::vulkan("waiting for a frame fence"))?;

        Ok(slot_index)
    }

    /// Call right before the submission that will signal the fence again.
    pub fn reset_fence(&self, slot_index: usize) -> RendererResult<()> {
        let fence = self.slots[slot_index].in_flight;
        unsafe {
            self.context
                .device
                .reset_fences(std::slice::from_ref(&fence))
        }
        .map_err(RendererError::vulkan("resetting a frame fence"))
    }

    pub fn slot(&self, index: usize) -> &FrameSlot {
        &self.slots[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut FrameSlot {
        &mut self.slots[index]
    }

    /// Blocks until every submitted frame has retired. Used by the resize
    /// path before it replaces resources the slots may still reference.
    pub fn wait_all(&self) -> RendererResult<()> {
        let fences: Vec<vk::Fence> = self.slots.iter().map(|slot| slot.in_flight).collect();
        unsafe {
            self.context
                .device
                .wait_for_fences(&fences, true, u64::MAX)
        }
        .map_err(RendererError::vulkan("waiting for all frame fences"))?;
        Ok(())
    }
}

impl Drop for FrameSlots {
    fn drop(&mut self) {
        let device = &self.context.device;
        // Submitted work may still reference the slot objects.
        let _ = self.wait_all();
        for slot in self.slots.iter() {
            unsafe { device.destroy_semaphore(slot.image_available, None) };
            unsafe { device.destroy_semaphore(slot.render_finished, None) };
            unsafe { device.destroy_fence(slot.in_flight, None) };
            unsafe {
                device.free_command_buffers(
                    *self.command_pool,
                    std::slice::from_ref(&slot.command_buffer),
                )
            };
        }
    }
}

/// Ownership epoch bookkeeping for resources shared across frames in flight.
/// A superseded resource is parked together with the last frame number that
/// may reference it and dropped once that frame is known to have retired.
pub struct DeferredRelease<T> {
    pending: Vec<(u64, T)>,
}

impl<T> DeferredRelease<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub fn defer(&mut self, last_used_frame: u64, resource: T) {
        self.pending.push((last_used_frame, resource));
    }

    /// Drops every resource whose last referencing frame has completed.
    /// Returns how many were released.
    pub fn release_completed(&mut self, completed_watermark: u64) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|(last_used, _)| *last_used > completed_watermark);
        before - self.pending.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct DropFlag(Rc<Cell<bool>>);
    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    #[test]
    fn slots_cycle_in_frame_order() {
        assert_eq!(slot_for_frame(1, 3), 0);
        assert_eq!(slot_for_frame(2, 3), 1);
        assert_eq!(slot_for_frame(3, 3), 2);
        assert_eq!(slot_for_frame(4, 3), 0);
    }

    #[test]
    fn resources_survive_while_a_frame_may_reference_them() {
        let dropped = Rc::new(Cell::new(false));
        let mut queue = DeferredRelease::new();
        // Last referenced by frame 5, three frames in flight.
        queue.defer(5, DropFlag(dropped.clone()));

        assert_eq!(queue.release_completed(4), 0);
        assert!(!dropped.get());

        assert_eq!(queue.release_completed(5), 1);
        assert!(dropped.get());
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn back_to_back_rebuilds_leave_only_the_newest_alive() {
        // The round-trip property: replacing a target twice at the same size
        // parks two superseded generations; both drain once their frames
        // retire, leaving only the live resource (which is not in the queue).
        let mut queue = DeferredRelease::new();
        queue.defer(7, "generation 1");
        queue.defer(8, "generation 2");

        assert_eq!(queue.pending_count(), 2);
        queue.release_completed(8);
        assert_eq!(queue.pending_count(), 0);
    }
}
