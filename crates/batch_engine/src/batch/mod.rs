//! # Dynamic Primitive Batches
//!
//! Growable vertex/index buffers that accumulate lines, billboards and
//! triangles from caller code and flush them to the device in bounded-size
//! draw calls.
//!
//! ## Architecture
//!
//! - **LineBatch / BillboardBatch**: doubling arrays up to a hard ceiling
//! - **TriangleBatch**: strictly fixed capacity, shared vertices, normal generation
//! - **UnboundedLineBatch / UnboundedBillboardBatch**: lists of fixed batches
//!   presenting one logical unlimited batch
//! - **TriangleBatchList**: the composing layer for triangle batches
//!
//! Every batch renders through one of two paths selected by [`SubmitMode`]:
//! immediate (client arrays uploaded with each draw) or cached (device
//! buffers rebuilt only after the contents change).
//!
//! Batches are single-threaded; they share their device through an `Rc`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::RenderError;

pub mod index_space;
mod storage;
mod cache;
pub mod line;
pub mod billboard;
pub mod triangle;
pub mod triangle_list;
pub mod unbounded;

pub use index_space::MAX_VERTICES_PER_BATCH;
pub use cache::CacheState;
pub use line::{LineBatch, MAX_LINES_PER_BATCH};
pub use billboard::{BillboardBatch, BillboardMode, MAX_BILLBOARDS};
pub use triangle::TriangleBatch;
pub use triangle_list::TriangleBatchList;
pub use unbounded::{UnboundedBillboardBatch, UnboundedLineBatch};

/// Result type for batching operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors raised by the batches
///
/// Soft capacity overflow never shows up here; it is absorbed by doubling.
#[derive(Debug, Error)]
pub enum BatchError {
    /// A vertex offset does not fit the 16-bit index space
    #[error("16-bit index space exhausted: vertex {vertex} is outside the {max}-vertex budget")]
    IndexSpaceExhausted {
        /// Offending vertex offset
        vertex: usize,
        /// Vertices addressable by one batch
        max: usize,
    },

    /// A fixed-capacity batch has no room left
    #[error("{kind} batch is full ({count} of {max})")]
    CapacityExceeded {
        /// What ran out (lines, vertices, triangle indices, ...)
        kind: &'static str,
        /// Current usage
        count: usize,
        /// Fixed limit
        max: usize,
    },

    /// A multi-segment shape does not fit in what is left of a batch
    #[error("Shape needs {needed} lines but only {available} fit")]
    ShapeTooLarge {
        /// Segments the shape consists of
        needed: usize,
        /// Segments the sink can still take
        available: usize,
    },

    /// A requested capacity is zero or above the batch ceiling
    #[error("Invalid capacity {requested}, must be in 1..={max}")]
    InvalidCapacity {
        /// Requested capacity
        requested: usize,
        /// Ceiling for this batch kind
        max: usize,
    },

    /// A triangle referenced a vertex that was never added
    #[error("Index {index} does not reference a vertex (batch holds {vertices})")]
    InvalidIndex {
        /// Offending index
        index: u16,
        /// Vertices currently in the batch
        vertices: usize,
    },

    /// A generated shape would not fit in a single batch
    #[error("Tessellation too fine: {vertices} vertices / {indices} indices exceed the per-batch budget of {max_vertices} / {max_indices}")]
    TessellationTooFine {
        /// Vertices the shape needs
        vertices: usize,
        /// Indices the shape needs
        indices: usize,
        /// Vertices one batch can hold
        max_vertices: usize,
        /// Indices one batch can hold
        max_indices: usize,
    },

    /// Shape parameters that cannot produce geometry
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The device failed while rendering
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Render path a batch submits through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// Hand the live arrays to the device with every draw
    #[default]
    Immediate,
    /// Keep device buffers sized to the contents, rebuilt after changes
    Cached,
}

impl SubmitMode {
    /// Mode for a `use_vertex_buffer` flag
    pub const fn from_use_vertex_buffer(use_vertex_buffer: bool) -> Self {
        if use_vertex_buffer {
            Self::Cached
        } else {
            Self::Immediate
        }
    }

    /// Whether this mode renders from device buffers
    pub const fn uses_vertex_buffer(self) -> bool {
        matches!(self, Self::Cached)
    }
}

/// Statistics for one render call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Draw calls issued
    pub draw_calls: usize,

    /// Primitives drawn
    pub primitives: usize,

    /// Vertices copied to the device (every frame when immediate, on rebuild when cached)
    pub vertices_uploaded: usize,

    /// Cached buffer pairs rebuilt
    pub buffers_rebuilt: usize,
}

impl BatchStats {
    /// Add another render's statistics into this one
    pub fn accumulate(&mut self, other: &Self) {
        self.draw_calls += other.draw_calls;
        self.primitives += other.primitives;
        self.vertices_uploaded += other.vertices_uploaded;
        self.buffers_rebuilt += other.buffers_rebuilt;
    }

    /// Average primitives per draw call
    pub fn avg_primitives_per_draw(&self) -> f32 {
        if self.draw_calls == 0 {
            0.0
        } else {
            self.primitives as f32 / self.draw_calls as f32
        }
    }
}

impl std::iter::Sum for BatchStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut total, stats| {
            total.accumulate(&stats);
            total
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_mode_flag() {
        assert_eq!(SubmitMode::from_use_vertex_buffer(true), SubmitMode::Cached);
        assert_eq!(SubmitMode::from_use_vertex_buffer(false), SubmitMode::Immediate);
        assert!(SubmitMode::Cached.uses_vertex_buffer());
        assert!(!SubmitMode::default().uses_vertex_buffer());
    }

    #[test]
    fn test_batch_stats_sum() {
        let stats = [
            BatchStats { draw_calls: 1, primitives: 10, vertices_uploaded: 20, buffers_rebuilt: 0 },
            BatchStats { draw_calls: 1, primitives: 30, vertices_uploaded: 0, buffers_rebuilt: 1 },
        ];
        let total: BatchStats = stats.into_iter().sum();
        assert_eq!(total.draw_calls, 2);
        assert_eq!(total.primitives, 40);
        assert_eq!(total.vertices_uploaded, 20);
        assert_eq!(total.buffers_rebuilt, 1);
        assert_eq!(total.avg_primitives_per_draw(), 20.0);
    }
}
