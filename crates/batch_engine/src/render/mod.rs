//! # Rendering Abstraction
//!
//! The batches never talk to a graphics API directly. They go through the
//! [`GraphicsDevice`] capability, which exposes exactly what batching needs:
//! allocate a buffer, upload bytes into it, and issue an indexed draw either
//! against those buffers or against per-frame client memory.
//!
//! ## Architecture
//!
//! - **device**: the `GraphicsDevice` trait and the draw descriptors
//! - **vertex**: packed vertex records and their layouts
//! - **recording**: headless device that records every draw (tests, tooling)
//! - **vulkan**: `ash` implementation (behind the `vulkan` feature)
//!
//! Pipeline state (blend mode, depth state, active shader) is the caller's
//! business; a device only binds vertex/index data and draws.

use thiserror::Error;

pub mod device;
// Pod derives expand to unsafe impls
#[allow(unsafe_code)]
pub mod vertex;
pub mod recording;

#[cfg(feature = "vulkan")]
#[allow(unsafe_code)]
pub mod vulkan;

pub use device::{
    BufferHandle, BufferUsage, DeviceRef, GraphicsDevice, IndexedDraw, PrimitiveTopology,
    UserIndexedDraw, VertexAttribute, VertexFormat, VertexLayout,
};
pub use vertex::{BatchVertex, BillboardVertex, LineVertex, TriangleVertex};
pub use recording::{DrawPath, DrawRecord, RecordingDevice};

/// Rendering error types
///
/// Device implementations translate their API-specific failures into these
/// variants so the batching layer stays backend-agnostic. The batching layer
/// never retries; these propagate to the caller as-is.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Buffer allocation failed
    ///
    /// Typically out of device memory or an allocation limit was hit.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// A buffer handle did not refer to a live buffer
    #[error("Invalid buffer handle: {0:?}")]
    InvalidBuffer(BufferHandle),

    /// Writing into a buffer failed or would overrun it
    #[error("Buffer upload failed: {0}")]
    UploadFailed(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
