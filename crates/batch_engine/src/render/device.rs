//! Graphics device abstraction consumed by the batches
//!
//! Implementations take `&self` everywhere, the same way GPU device handles
//! do, and keep any mutable bookkeeping behind interior mutability. Batches
//! share one device through [`DeviceRef`].

use std::rc::Rc;

use bitflags::bitflags;

use super::RenderResult;

slotmap::new_key_type! {
    /// Handle to a device-resident buffer
    pub struct BufferHandle;
}

bitflags! {
    /// How a buffer will be bound
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Bound as a vertex buffer
        const VERTEX = 1 << 0;
        /// Bound as a 16-bit index buffer
        const INDEX = 1 << 1;
    }
}

/// Primitive assembly mode for a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    /// Every two indices form a line segment
    LineList,
    /// Every three indices form a triangle
    TriangleList,
}

impl PrimitiveTopology {
    /// Indices consumed per primitive
    pub const fn indices_per_primitive(self) -> usize {
        match self {
            Self::LineList => 2,
            Self::TriangleList => 3,
        }
    }
}

/// Format of a single vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// One 32-bit float
    Float32,
    /// Two 32-bit floats
    Float32x2,
    /// Three 32-bit floats
    Float32x3,
    /// Four normalized unsigned bytes
    Unorm8x4,
}

impl VertexFormat {
    /// Size in bytes
    pub const fn size(self) -> u32 {
        match self {
            Self::Float32 | Self::Unorm8x4 => 4,
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
        }
    }
}

/// One attribute inside a vertex record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    /// Attribute format
    pub format: VertexFormat,
    /// Byte offset inside the record
    pub offset: u32,
}

/// Memory layout of a vertex record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    /// Bytes between consecutive vertices
    pub stride: u32,
    /// Attributes in location order
    pub attributes: &'static [VertexAttribute],
}

/// Indexed draw against buffers previously created on the device
#[derive(Debug, Clone, Copy)]
pub struct IndexedDraw<'a> {
    /// Primitive assembly mode
    pub topology: PrimitiveTopology,
    /// Layout of the bound vertex buffer
    pub layout: &'a VertexLayout,
    /// Vertex buffer
    pub vertex_buffer: BufferHandle,
    /// 16-bit index buffer
    pub index_buffer: BufferHandle,
    /// Number of indices to draw, starting at zero
    pub index_count: u32,
    /// Number of primitives those indices form
    pub primitive_count: u32,
}

/// Indexed draw straight from client memory, uploaded for this frame only
#[derive(Debug, Clone, Copy)]
pub struct UserIndexedDraw<'a> {
    /// Primitive assembly mode
    pub topology: PrimitiveTopology,
    /// Layout of `vertices`
    pub layout: &'a VertexLayout,
    /// Packed vertex records
    pub vertices: &'a [u8],
    /// 16-bit indices into `vertices`
    pub indices: &'a [u16],
    /// Number of primitives `indices` form
    pub primitive_count: u32,
}

/// Capability the batches need from the host graphics API
pub trait GraphicsDevice {
    /// Allocate a buffer of `size` bytes
    fn create_buffer(&self, usage: BufferUsage, size: usize) -> RenderResult<BufferHandle>;

    /// Copy `data` into a buffer starting at byte `offset`
    fn write_buffer(&self, buffer: BufferHandle, offset: usize, data: &[u8]) -> RenderResult<()>;

    /// Release a buffer; unknown handles are ignored
    fn destroy_buffer(&self, buffer: BufferHandle);

    /// Issue an indexed draw against device buffers
    fn draw_indexed(&self, draw: &IndexedDraw<'_>) -> RenderResult<()>;

    /// Issue an indexed draw from client memory
    fn draw_user_indexed(&self, draw: &UserIndexedDraw<'_>) -> RenderResult<()>;

    /// Allocate a buffer and fill it in one step
    fn create_buffer_init(&self, usage: BufferUsage, data: &[u8]) -> RenderResult<BufferHandle> {
        let buffer = self.create_buffer(usage, data.len())?;
        if let Err(e) = self.write_buffer(buffer, 0, data) {
            self.destroy_buffer(buffer);
            return Err(e);
        }
        Ok(buffer)
    }
}

/// Shared handle to the device a batch renders with
///
/// `Rc` keeps batches on the thread that owns the device.
pub type DeviceRef = Rc<dyn GraphicsDevice>;
