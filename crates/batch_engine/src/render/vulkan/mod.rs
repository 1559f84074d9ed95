//! Vulkan implementation of [`GraphicsDevice`]
//!
//! Draws are recorded into a command buffer the caller hands over with
//! [`VulkanDevice::begin_frame`]; the caller owns the render pass, pipeline
//! and synchronisation. The bound pipeline decides the primitive topology.
//!
//! Immediate draws upload into transient buffers owned by the current frame
//! slot. Buffers destroyed by the batches are retired into the same slot.
//! Both are freed the next time that slot begins, which the caller only does
//! after waiting on the slot's fence.

use std::cell::{Cell, RefCell};

use ash::{vk, Device, Instance};
use log::{debug, trace};
use slotmap::SlotMap;

use super::device::{BufferHandle, BufferUsage, GraphicsDevice, IndexedDraw, UserIndexedDraw};
use super::{RenderError, RenderResult};

mod buffer;

use buffer::HostBuffer;

/// `GraphicsDevice` over an `ash` logical device
pub struct VulkanDevice {
    device: Device,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    buffers: RefCell<SlotMap<BufferHandle, HostBuffer>>,
    retired: RefCell<Vec<Vec<HostBuffer>>>,
    frame: Cell<usize>,
    command_buffer: Cell<vk::CommandBuffer>,
}

impl VulkanDevice {
    /// Wrap a logical device created from `physical_device`
    ///
    /// `frames_in_flight` is the number of frame slots cycled through
    /// [`begin_frame`](Self::begin_frame).
    pub fn new(
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        device: Device,
        frames_in_flight: usize,
    ) -> Self {
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };
        let slots = frames_in_flight.max(1);
        debug!("Vulkan batch device with {} frame slots", slots);

        Self {
            device,
            memory_properties,
            buffers: RefCell::new(SlotMap::with_key()),
            retired: RefCell::new((0..slots).map(|_| Vec::new()).collect()),
            frame: Cell::new(0),
            command_buffer: Cell::new(vk::CommandBuffer::null()),
        }
    }

    /// Start recording frame slot `frame_index` into `command_buffer`
    ///
    /// Frees everything retired the last time this slot was used, so the
    /// slot's previous submission must have completed.
    pub fn begin_frame(&self, frame_index: usize, command_buffer: vk::CommandBuffer) {
        let mut retired = self.retired.borrow_mut();
        let slot = frame_index % retired.len();
        let freed = retired[slot].len();
        retired[slot].clear();
        if freed > 0 {
            trace!("Frame slot {}: freed {} transient buffers", slot, freed);
        }
        self.frame.set(slot);
        self.command_buffer.set(command_buffer);
    }

    /// Number of live, non-transient buffers
    pub fn live_buffers(&self) -> usize {
        self.buffers.borrow().len()
    }

    fn recording(&self) -> RenderResult<vk::CommandBuffer> {
        let command_buffer = self.command_buffer.get();
        if command_buffer == vk::CommandBuffer::null() {
            return Err(RenderError::RenderingFailed(
                "no command buffer; call begin_frame first".to_string(),
            ));
        }
        Ok(command_buffer)
    }

    fn host_buffer(&self, usage: BufferUsage, data: &[u8]) -> RenderResult<HostBuffer> {
        let buffer = HostBuffer::new(self.device.clone(), &self.memory_properties, usage, data.len())?;
        buffer.write(0, data)?;
        Ok(buffer)
    }

    fn record_draw(
        &self,
        command_buffer: vk::CommandBuffer,
        vertex_buffer: vk::Buffer,
        index_buffer: vk::Buffer,
        index_count: u32,
    ) {
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(command_buffer, 0, &[vertex_buffer], &[0]);
            self.device
                .cmd_bind_index_buffer(command_buffer, index_buffer, 0, vk::IndexType::UINT16);
            self.device
                .cmd_draw_indexed(command_buffer, index_count, 1, 0, 0, 0);
        }
    }
}

impl GraphicsDevice for VulkanDevice {
    fn create_buffer(&self, usage: BufferUsage, size: usize) -> RenderResult<BufferHandle> {
        let buffer = HostBuffer::new(self.device.clone(), &self.memory_properties, usage, size)?;
        Ok(self.buffers.borrow_mut().insert(buffer))
    }

    fn write_buffer(&self, buffer: BufferHandle, offset: usize, data: &[u8]) -> RenderResult<()> {
        self.buffers
            .borrow()
            .get(buffer)
            .ok_or(RenderError::InvalidBuffer(buffer))?
            .write(offset, data)
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        if let Some(buffer) = self.buffers.borrow_mut().remove(buffer) {
            // Earlier draws this frame may still reference it
            self.retired.borrow_mut()[self.frame.get()].push(buffer);
        }
    }

    fn draw_indexed(&self, draw: &IndexedDraw<'_>) -> RenderResult<()> {
        let command_buffer = self.recording()?;
        let buffers = self.buffers.borrow();
        let vertex = buffers
            .get(draw.vertex_buffer)
            .ok_or(RenderError::InvalidBuffer(draw.vertex_buffer))?;
        let index = buffers
            .get(draw.index_buffer)
            .ok_or(RenderError::InvalidBuffer(draw.index_buffer))?;

        self.record_draw(command_buffer, vertex.handle(), index.handle(), draw.index_count);
        trace!("Recorded cached draw: {} indices ({:?})", draw.index_count, draw.topology);
        Ok(())
    }

    fn draw_user_indexed(&self, draw: &UserIndexedDraw<'_>) -> RenderResult<()> {
        let command_buffer = self.recording()?;
        let vertex = self.host_buffer(BufferUsage::VERTEX, draw.vertices)?;
        let index = self.host_buffer(BufferUsage::INDEX, bytemuck::cast_slice(draw.indices))?;

        self.record_draw(command_buffer, vertex.handle(), index.handle(), draw.indices.len() as u32);
        trace!(
            "Recorded immediate draw: {} vertex bytes, {} indices ({:?})",
            draw.vertices.len(),
            draw.indices.len(),
            draw.topology
        );

        let mut retired = self.retired.borrow_mut();
        let slot = &mut retired[self.frame.get()];
        slot.push(vertex);
        slot.push(index);
        Ok(())
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        // Buffers free themselves; the device must be idle by now
        let live = self.buffers.borrow().len();
        if live > 0 {
            debug!("Dropping Vulkan batch device with {} live buffers", live);
        }
    }
}
