//! # Batch Engine
//!
//! Dynamic batched-primitive buffers for lines, triangles and billboards.
//! Caller code adds primitives by the thousand; the batches keep them in
//! 16-bit-indexed vertex/index arrays and flush them to the device in
//! bounded-size draw calls.
//!
//! ## Features
//!
//! - **Amortized growth**: line and billboard arrays double up to a hard ceiling
//! - **Two submission paths**: immediate client arrays or cached device buffers
//! - **Unbounded batches**: lists of fixed batches behind one add/render surface
//! - **Normal generation**: face-normal accumulation over shared vertices
//! - **Geometry builders**: circles, grids, planes, boxes and spheres
//! - **Headless device**: [`render::RecordingDevice`] records every draw
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use batch_engine::prelude::*;
//!
//! fn main() -> Result<(), BatchError> {
//!     let device: DeviceRef = Rc::new(RecordingDevice::new());
//!     let mut lines = UnboundedLineBatch::new(device)?;
//!     lines.add_circle(Vec3::zeros(), 1.0, 32, Color::WHITE)?;
//!     let stats = lines.render()?;
//!     assert_eq!(stats.primitives, 32);
//!     Ok(())
//! }
//! ```
//!
//! Batches are single-threaded: they share their device through an `Rc` and
//! must be driven from the thread that owns it.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc
)]

pub mod foundation;
pub mod config;
pub mod render;
pub mod batch;
pub mod geometry;

/// Common imports for batch users
pub mod prelude {
    pub use crate::{
        batch::{
            BatchError, BatchResult, BatchStats, BillboardBatch, BillboardMode, CacheState,
            LineBatch, SubmitMode, TriangleBatch, TriangleBatchList, UnboundedBillboardBatch,
            UnboundedLineBatch,
        },
        config::{BatchConfig, Config},
        foundation::{
            color::Color,
            math::{Quat, Vec2, Vec3},
        },
        geometry::{BoxShape, LineSink, Plane, Sphere, TriangleShape},
        render::{
            BillboardVertex, DeviceRef, GraphicsDevice, LineVertex, RecordingDevice, RenderError,
            TriangleVertex,
        },
    };
}
