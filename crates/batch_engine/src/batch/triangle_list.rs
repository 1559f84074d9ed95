//! # Triangle Batch List
//!
//! Composing layer over fixed-capacity [`TriangleBatch`]es. Callers reserve
//! room for a run of vertices and indices; the list hands back the current
//! batch when the run fits and opens a new one otherwise. Every reservation
//! therefore lands in a single batch, which keeps its indices valid.

use log::debug;

use super::{BatchError, BatchResult, BatchStats, SubmitMode, TriangleBatch};
use crate::config::BatchConfig;
use crate::geometry::{BoxShape, Plane, Sphere, TriangleShape};
use crate::render::{DeviceRef, RenderResult};

/// Vertices per batch when no limits are given
pub const DEFAULT_TRIANGLE_VERTICES: usize = 32_768;

/// Triangle indices per batch when no limits are given
pub const DEFAULT_TRIANGLE_INDICES: usize = 98_304;

/// Growing list of fixed-capacity triangle batches
pub struct TriangleBatchList {
    device: DeviceRef,
    batches: Vec<TriangleBatch>,
    max_vertices: usize,
    max_indices: usize,
    mode: SubmitMode,
}

impl TriangleBatchList {
    /// Create an empty list with the default per-batch limits
    pub fn new(device: DeviceRef) -> BatchResult<Self> {
        Self::with_limits(device, DEFAULT_TRIANGLE_VERTICES, DEFAULT_TRIANGLE_INDICES)
    }

    /// Create an empty list whose batches hold `max_vertices` / `max_indices`
    pub fn with_limits(device: DeviceRef, max_vertices: usize, max_indices: usize) -> BatchResult<Self> {
        TriangleBatch::check_limits(max_vertices, max_indices)?;
        Ok(Self {
            device,
            batches: Vec::new(),
            max_vertices,
            max_indices,
            mode: SubmitMode::default(),
        })
    }

    /// Create a list from the triangle section and submit mode of `config`
    pub fn from_config(device: DeviceRef, config: &BatchConfig) -> BatchResult<Self> {
        let mut list = Self::with_limits(device, config.triangle.max_vertices, config.triangle.max_indices)?;
        list.mode = config.submit_mode;
        Ok(list)
    }

    /// Batch with room for `vertices` more vertices and `indices` more indices
    ///
    /// Opens a new batch when the current one cannot hold the run. A run
    /// larger than one batch fails with `TessellationTooFine`.
    pub fn reserve(&mut self, vertices: usize, indices: usize) -> BatchResult<&mut TriangleBatch> {
        if vertices > self.max_vertices || indices > self.max_indices {
            return Err(BatchError::TessellationTooFine {
                vertices,
                indices,
                max_vertices: self.max_vertices,
                max_indices: self.max_indices,
            });
        }

        let fits = self.batches.last().map_or(false, |batch| {
            batch.available_vertices() >= vertices && batch.available_triangle_indices() >= indices
        });
        if !fits {
            let mut batch = TriangleBatch::new(self.device.clone(), self.max_vertices, self.max_indices)?;
            batch.set_submit_mode(self.mode);
            self.batches.push(batch);
            debug!(
                "Opened triangle batch #{} for a run of {} vertices / {} indices",
                self.batches.len(),
                vertices,
                indices
            );
        }

        let last = self.batches.len() - 1;
        Ok(&mut self.batches[last])
    }

    /// Emit a generated shape into a single batch and give it unit normals
    pub fn add_shape<S: TriangleShape + ?Sized>(&mut self, shape: &S) -> BatchResult<()> {
        shape.validate()?;
        let batch = self.reserve(shape.vertex_count(), shape.index_count())?;
        let first_vertex = batch.vertex_count();
        let first_index = batch.index_count();

        shape.emit(batch)?;
        batch.generate_normals_from(first_vertex, first_index);
        batch.normalize_normals_from(first_vertex);
        Ok(())
    }

    /// Add a tessellated plane
    pub fn add_plane(&mut self, plane: &Plane) -> BatchResult<()> {
        self.add_shape(plane)
    }

    /// Add a box with per-face vertices
    pub fn add_box(&mut self, shape: &BoxShape) -> BatchResult<()> {
        self.add_shape(shape)
    }

    /// Add a UV sphere
    pub fn add_sphere(&mut self, sphere: &Sphere) -> BatchResult<()> {
        self.add_shape(sphere)
    }

    /// Drop every batch
    pub fn clear(&mut self) {
        self.batches.clear();
    }

    /// Batches in insertion order
    pub fn batches(&self) -> &[TriangleBatch] {
        &self.batches
    }

    /// Batches in the list
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Triangles across all batches
    pub fn number_of_triangles(&self) -> usize {
        self.batches.iter().map(TriangleBatch::number_of_triangles).sum()
    }

    /// Vertices across all batches
    pub fn vertex_count(&self) -> usize {
        self.batches.iter().map(TriangleBatch::vertex_count).sum()
    }

    /// Whether no batch exists
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Current submission path
    pub fn submit_mode(&self) -> SubmitMode {
        self.mode
    }

    /// Select the submission path for existing and future batches
    pub fn set_submit_mode(&mut self, mode: SubmitMode) {
        self.mode = mode;
        for batch in &mut self.batches {
            batch.set_submit_mode(mode);
        }
    }

    /// Render every batch in insertion order
    pub fn render(&mut self) -> RenderResult<BatchStats> {
        let mut total = BatchStats::default();
        for batch in &mut self.batches {
            total.accumulate(&batch.render()?);
        }
        Ok(total)
    }
}
