//! Host-visible buffers backing the Vulkan device
//!
//! Every buffer gets its own allocation from a host-visible, host-coherent
//! memory type so uploads are a map/copy/unmap with no staging.

use ash::{vk, Device};

use crate::render::{BufferUsage, RenderError, RenderResult};

/// Buffer plus its dedicated memory, released on drop
pub(crate) struct HostBuffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl HostBuffer {
    /// Create a buffer of `size` bytes bound to fresh host-visible memory
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        usage: BufferUsage,
        size: usize,
    ) -> RenderResult<Self> {
        if size == 0 {
            return Err(RenderError::ResourceCreationFailed(
                "zero-sized buffers are not allowed".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size as vk::DeviceSize)
            .usage(usage_flags(usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(|e| api_error("create_buffer", e))?
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory_type_index = match find_memory_type(
            memory_properties,
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ) {
            Ok(index) => index,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(api_error("allocate_memory", e));
            }
        };

        if let Err(e) = unsafe { device.bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
            }
            return Err(api_error("bind_buffer_memory", e));
        }

        Ok(Self {
            device,
            buffer,
            memory,
            size: size as vk::DeviceSize,
        })
    }

    /// Copy `data` into the buffer at byte `offset`
    pub fn write(&self, offset: usize, data: &[u8]) -> RenderResult<()> {
        let end = (offset + data.len()) as vk::DeviceSize;
        if end > self.size {
            return Err(RenderError::UploadFailed(format!(
                "write of {} bytes at {} overruns buffer of {} bytes",
                data.len(),
                offset,
                self.size
            )));
        }
        if data.is_empty() {
            return Ok(());
        }

        unsafe {
            let ptr = self
                .device
                .map_memory(
                    self.memory,
                    offset as vk::DeviceSize,
                    data.len() as vk::DeviceSize,
                    vk::MemoryMapFlags::empty(),
                )
                .map_err(|e| api_error("map_memory", e))?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.cast::<u8>(), data.len());
            self.device.unmap_memory(self.memory);
        }
        Ok(())
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

fn usage_flags(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    flags
}

pub(crate) fn api_error(call: &str, result: vk::Result) -> RenderError {
    RenderError::BackendError(format!("{call} failed: {result:?}"))
}

/// Find a memory type allowed by `type_filter` with all `properties`
fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> RenderResult<u32> {
    (0..memory_properties.memory_type_count)
        .find(|&i| {
            type_filter & (1 << i) != 0
                && memory_properties.memory_types[i as usize]
                    .property_flags
                    .contains(properties)
        })
        .ok_or_else(|| {
            RenderError::ResourceCreationFailed("no host-visible coherent memory type".to_string())
        })
}
