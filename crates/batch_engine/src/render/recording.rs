//! Headless graphics device that records what would reach the GPU
//!
//! Buffers live in a slot map of byte vectors. Every draw, cached or
//! immediate, is captured with the exact vertex bytes and indices it
//! references, which makes the two submission paths directly comparable.

use std::cell::RefCell;

use slotmap::SlotMap;

use super::device::{
    BufferHandle, BufferUsage, GraphicsDevice, IndexedDraw, PrimitiveTopology, UserIndexedDraw,
};
use super::vertex::BatchVertex;
use super::{RenderError, RenderResult};

/// Which submission path produced a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPath {
    /// Drawn from device buffers
    Cached,
    /// Drawn from client memory
    Immediate,
}

/// One recorded draw call
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// Submission path
    pub path: DrawPath,
    /// Primitive assembly mode
    pub topology: PrimitiveTopology,
    /// Vertex stride in bytes
    pub stride: u32,
    /// Vertex bytes visible to the draw
    pub vertex_bytes: Vec<u8>,
    /// Indices consumed by the draw
    pub indices: Vec<u16>,
    /// Primitive count reported by the caller
    pub primitive_count: u32,
}

impl DrawRecord {
    /// Decode the recorded vertex bytes as records of type `V`
    pub fn vertices<V: BatchVertex>(&self) -> Vec<V> {
        self.vertex_bytes
            .chunks_exact(std::mem::size_of::<V>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

struct RecordedBuffer {
    usage: BufferUsage,
    data: Vec<u8>,
}

#[derive(Default)]
struct RecorderState {
    buffers: SlotMap<BufferHandle, RecordedBuffer>,
    draws: Vec<DrawRecord>,
    buffers_created: usize,
    bytes_uploaded: usize,
    buffer_limit: Option<usize>,
}

/// Device that keeps buffers in memory and records draws
#[derive(Default)]
pub struct RecordingDevice {
    state: RefCell<RecorderState>,
}

impl RecordingDevice {
    /// Create an empty recording device
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device that refuses to hold more than `limit` live buffers
    pub fn with_buffer_limit(limit: usize) -> Self {
        let device = Self::default();
        device.state.borrow_mut().buffer_limit = Some(limit);
        device
    }

    /// All draws recorded so far
    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state.borrow().draws.clone()
    }

    /// Remove and return the recorded draws
    pub fn take_draws(&self) -> Vec<DrawRecord> {
        std::mem::take(&mut self.state.borrow_mut().draws)
    }

    /// Number of draws recorded so far
    pub fn draw_count(&self) -> usize {
        self.state.borrow().draws.len()
    }

    /// Buffers currently alive
    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    /// Buffers created over the device's lifetime
    pub fn buffers_created(&self) -> usize {
        self.state.borrow().buffers_created
    }

    /// Bytes written through `write_buffer`
    pub fn bytes_uploaded(&self) -> usize {
        self.state.borrow().bytes_uploaded
    }

    /// Usage flags of a live buffer
    pub fn buffer_usage(&self, buffer: BufferHandle) -> Option<BufferUsage> {
        self.state.borrow().buffers.get(buffer).map(|b| b.usage)
    }

    /// Size in bytes of a live buffer
    pub fn buffer_size(&self, buffer: BufferHandle) -> Option<usize> {
        self.state.borrow().buffers.get(buffer).map(|b| b.data.len())
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_buffer(&self, usage: BufferUsage, size: usize) -> RenderResult<BufferHandle> {
        let mut state = self.state.borrow_mut();
        if let Some(limit) = state.buffer_limit {
            if state.buffers.len() >= limit {
                return Err(RenderError::ResourceCreationFailed(format!(
                    "buffer limit of {limit} reached"
                )));
            }
        }
        state.buffers_created += 1;
        Ok(state.buffers.insert(RecordedBuffer {
            usage,
            data: vec![0; size],
        }))
    }

    fn write_buffer(&self, buffer: BufferHandle, offset: usize, data: &[u8]) -> RenderResult<()> {
        let mut state = self.state.borrow_mut();
        let target = state
            .buffers
            .get_mut(buffer)
            .ok_or(RenderError::InvalidBuffer(buffer))?;
        let end = offset + data.len();
        if end > target.data.len() {
            return Err(RenderError::UploadFailed(format!(
                "write of {} bytes at {} overruns buffer of {} bytes",
                data.len(),
                offset,
                target.data.len()
            )));
        }
        target.data[offset..end].copy_from_slice(data);
        state.bytes_uploaded += data.len();
        Ok(())
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        self.state.borrow_mut().buffers.remove(buffer);
    }

    fn draw_indexed(&self, draw: &IndexedDraw<'_>) -> RenderResult<()> {
        let mut state = self.state.borrow_mut();
        let vertex_bytes = state
            .buffers
            .get(draw.vertex_buffer)
            .ok_or(RenderError::InvalidBuffer(draw.vertex_buffer))?
            .data
            .clone();
        let index_bytes = &state
            .buffers
            .get(draw.index_buffer)
            .ok_or(RenderError::InvalidBuffer(draw.index_buffer))?
            .data;
        let index_len = draw.index_count as usize * std::mem::size_of::<u16>();
        if index_len > index_bytes.len() {
            return Err(RenderError::RenderingFailed(format!(
                "draw reads {} indices from a buffer holding {}",
                draw.index_count,
                index_bytes.len() / std::mem::size_of::<u16>()
            )));
        }
        let indices = index_bytes[..index_len]
            .chunks_exact(2)
            .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
            .collect();

        state.draws.push(DrawRecord {
            path: DrawPath::Cached,
            topology: draw.topology,
            stride: draw.layout.stride,
            vertex_bytes,
            indices,
            primitive_count: draw.primitive_count,
        });
        Ok(())
    }

    fn draw_user_indexed(&self, draw: &UserIndexedDraw<'_>) -> RenderResult<()> {
        self.state.borrow_mut().draws.push(DrawRecord {
            path: DrawPath::Immediate,
            topology: draw.topology,
            stride: draw.layout.stride,
            vertex_bytes: draw.vertices.to_vec(),
            indices: draw.indices.to_vec(),
            primitive_count: draw.primitive_count,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::vertex::LineVertex;
    use bytemuck::Zeroable;

    #[test]
    fn test_buffer_lifecycle() {
        let device = RecordingDevice::new();
        let buffer = device.create_buffer_init(BufferUsage::VERTEX, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.live_buffers(), 1);
        assert_eq!(device.buffer_size(buffer), Some(4));
        assert_eq!(device.buffer_usage(buffer), Some(BufferUsage::VERTEX));
        assert_eq!(device.bytes_uploaded(), 4);

        device.destroy_buffer(buffer);
        assert_eq!(device.live_buffers(), 0);
        assert!(matches!(
            device.write_buffer(buffer, 0, &[0]),
            Err(RenderError::InvalidBuffer(_))
        ));
    }

    #[test]
    fn test_write_overrun_is_rejected() {
        let device = RecordingDevice::new();
        let buffer = device.create_buffer(BufferUsage::INDEX, 4).unwrap();
        assert!(matches!(
            device.write_buffer(buffer, 2, &[0, 0, 0]),
            Err(RenderError::UploadFailed(_))
        ));
    }

    #[test]
    fn test_buffer_limit() {
        let device = RecordingDevice::with_buffer_limit(1);
        let first = device.create_buffer(BufferUsage::VERTEX, 8).unwrap();
        assert!(device.create_buffer(BufferUsage::INDEX, 8).is_err());
        device.destroy_buffer(first);
        assert!(device.create_buffer(BufferUsage::INDEX, 8).is_ok());
    }

    #[test]
    fn test_immediate_draw_is_recorded() {
        let device = RecordingDevice::new();
        let vertices = [LineVertex::zeroed(), LineVertex::zeroed()];
        device
            .draw_user_indexed(&UserIndexedDraw {
                topology: PrimitiveTopology::LineList,
                layout: &LineVertex::LAYOUT,
                vertices: bytemuck::cast_slice(&vertices),
                indices: &[0, 1],
                primitive_count: 1,
            })
            .unwrap();

        let draws = device.take_draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].path, DrawPath::Immediate);
        assert_eq!(draws[0].vertices::<LineVertex>(), vertices.to_vec());
        assert_eq!(device.draw_count(), 0);
    }
}
