//! Vertex records for each primitive kind
//!
//! All records are `#[repr(C)]` and `Pod` so a batch can hand its arrays to
//! the device as raw bytes without conversion.

use bytemuck::{Pod, Zeroable};

use super::device::{VertexAttribute, VertexFormat, VertexLayout};
use crate::foundation::color::Color;
use crate::foundation::math::{utils::to_array, Vec2, Vec3};

/// A vertex record a batch can store and submit
pub trait BatchVertex: Pod {
    /// Layout the device binds this record with
    const LAYOUT: VertexLayout;
}

/// Line vertex: position and color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    /// Position in world space
    pub position: [f32; 3],
    /// Vertex color
    pub color: Color,
}

impl LineVertex {
    /// Create a line vertex
    pub fn new(position: Vec3, color: Color) -> Self {
        Self {
            position: to_array(&position),
            color,
        }
    }

    /// Position as a vector
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }
}

impl BatchVertex for LineVertex {
    const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<Self>() as u32,
        attributes: &[
            VertexAttribute { location: 0, format: VertexFormat::Float32x3, offset: 0 },
            VertexAttribute { location: 1, format: VertexFormat::Unorm8x4, offset: 12 },
        ],
    };
}

/// Billboard vertex
///
/// In point-list mode all four corners of a billboard share `position` and
/// the vertex shader expands the quad from `corner` and `size`. In quad mode
/// `position` is already the offset corner.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BillboardVertex {
    /// Billboard center (point-list mode) or corner position (quad mode)
    pub position: [f32; 3],
    /// Corner coordinate, one of (0,0) (1,0) (1,1) (0,1)
    pub corner: [f32; 2],
    /// Edge length in world units
    pub size: f32,
    /// Vertex color
    pub color: Color,
}

impl BillboardVertex {
    /// Create a billboard vertex
    pub fn new(position: Vec3, corner: Vec2, size: f32, color: Color) -> Self {
        Self {
            position: to_array(&position),
            corner: [corner.x, corner.y],
            size,
            color,
        }
    }

    /// Position as a vector
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }
}

impl BatchVertex for BillboardVertex {
    const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<Self>() as u32,
        attributes: &[
            VertexAttribute { location: 0, format: VertexFormat::Float32x3, offset: 0 },
            VertexAttribute { location: 1, format: VertexFormat::Float32x2, offset: 12 },
            VertexAttribute { location: 2, format: VertexFormat::Float32, offset: 20 },
            VertexAttribute { location: 3, format: VertexFormat::Unorm8x4, offset: 24 },
        ],
    };
}

/// Triangle vertex: position, accumulated normal and color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TriangleVertex {
    /// Position in world space
    pub position: [f32; 3],
    /// Normal, written by normal generation
    pub normal: [f32; 3],
    /// Vertex color
    pub color: Color,
}

impl TriangleVertex {
    /// Create a vertex with a zero normal
    pub fn new(position: Vec3, color: Color) -> Self {
        Self {
            position: to_array(&position),
            normal: [0.0; 3],
            color,
        }
    }

    /// Create a vertex with an explicit normal
    pub fn with_normal(position: Vec3, normal: Vec3, color: Color) -> Self {
        Self {
            position: to_array(&position),
            normal: to_array(&normal),
            color,
        }
    }

    /// Position as a vector
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    /// Normal as a vector
    pub fn normal(&self) -> Vec3 {
        Vec3::from(self.normal)
    }
}

impl BatchVertex for TriangleVertex {
    const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<Self>() as u32,
        attributes: &[
            VertexAttribute { location: 0, format: VertexFormat::Float32x3, offset: 0 },
            VertexAttribute { location: 1, format: VertexFormat::Float32x3, offset: 12 },
            VertexAttribute { location: 2, format: VertexFormat::Unorm8x4, offset: 24 },
        ],
    };
}
