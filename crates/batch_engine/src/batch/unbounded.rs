//! # Unbounded Batches
//!
//! Lists of fixed-capacity batches presented as one batch without a size
//! limit. Appends always target the last sub-batch; once it is full a new
//! one is opened and becomes the target. Sub-batches are never removed
//! individually. [`clear`](UnboundedLineBatch::clear) drops the whole list so
//! buffers grown for a one-off burst are released.
//!
//! Rendering walks the sub-batches in insertion order, one draw call each.
//! That order says nothing about depth; callers that need sorted
//! translucency sort before adding.

use log::debug;

use super::billboard::DEFAULT_BILLBOARD_CAPACITY;
use super::line::DEFAULT_LINE_CAPACITY;
use super::{
    BatchError, BatchResult, BatchStats, BillboardBatch, BillboardMode, LineBatch, SubmitMode,
    MAX_BILLBOARDS, MAX_LINES_PER_BATCH,
};
use crate::config::BatchConfig;
use crate::foundation::color::Color;
use crate::foundation::math::Vec3;
use crate::geometry::LineSink;
use crate::render::{DeviceRef, LineVertex, RenderResult};

/// Line batch without a line limit
pub struct UnboundedLineBatch {
    device: DeviceRef,
    batches: Vec<LineBatch>,
    lines_per_batch: usize,
    mode: SubmitMode,
}

impl UnboundedLineBatch {
    /// Create an empty batch whose sub-batches hold the default line count
    pub fn new(device: DeviceRef) -> BatchResult<Self> {
        Self::with_lines_per_batch(device, DEFAULT_LINE_CAPACITY)
    }

    /// Create an empty batch whose sub-batches hold `lines_per_batch` lines
    pub fn with_lines_per_batch(device: DeviceRef, lines_per_batch: usize) -> BatchResult<Self> {
        if lines_per_batch == 0 || lines_per_batch > MAX_LINES_PER_BATCH {
            return Err(BatchError::InvalidCapacity {
                requested: lines_per_batch,
                max: MAX_LINES_PER_BATCH,
            });
        }
        Ok(Self {
            device,
            batches: Vec::new(),
            lines_per_batch,
            mode: SubmitMode::default(),
        })
    }

    /// Create a batch from the line section and submit mode of `config`
    pub fn from_config(device: DeviceRef, config: &BatchConfig) -> BatchResult<Self> {
        let mut batch = Self::with_lines_per_batch(device, config.line.lines_per_batch)?;
        batch.mode = config.submit_mode;
        Ok(batch)
    }

    /// Append one segment, opening a sub-batch when the last one is full
    pub fn add_line(&mut self, start: LineVertex, end: LineVertex) -> BatchResult<()> {
        let needs_batch = self.batches.last().map_or(true, |batch| batch.lines_free() < 1);
        if needs_batch {
            let mut batch = LineBatch::with_capacity(self.device.clone(), self.lines_per_batch)?;
            batch.set_submit_mode(self.mode);
            self.batches.push(batch);
            debug!("Opened line sub-batch #{}", self.batches.len());
        }

        let last = self.batches.len() - 1;
        self.batches[last].add_line(start, end)
    }

    /// Append one single-colored segment between two points
    pub fn add_line_points(&mut self, start: Vec3, end: Vec3, color: Color) -> BatchResult<()> {
        self.add_line(LineVertex::new(start, color), LineVertex::new(end, color))
    }

    /// Drop every sub-batch
    pub fn clear(&mut self) {
        self.batches.clear();
    }

    /// Lines across all sub-batches
    pub fn lines(&self) -> usize {
        self.batches.iter().map(LineBatch::lines).sum()
    }

    /// Whether no sub-batch exists
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Sub-batches in the list
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Sub-batches in insertion order
    pub fn batches(&self) -> &[LineBatch] {
        &self.batches
    }

    /// Lines per sub-batch
    pub fn lines_per_batch(&self) -> usize {
        self.lines_per_batch
    }

    /// Current submission path
    pub fn submit_mode(&self) -> SubmitMode {
        self.mode
    }

    /// Select the submission path for existing and future sub-batches
    pub fn set_submit_mode(&mut self, mode: SubmitMode) {
        self.mode = mode;
        for batch in &mut self.batches {
            batch.set_submit_mode(mode);
        }
    }

    /// Whether rendering goes through cached device buffers
    pub fn use_vertex_buffer(&self) -> bool {
        self.mode.uses_vertex_buffer()
    }

    /// Flag form of [`set_submit_mode`](Self::set_submit_mode)
    pub fn set_use_vertex_buffer(&mut self, use_vertex_buffer: bool) {
        self.set_submit_mode(SubmitMode::from_use_vertex_buffer(use_vertex_buffer));
    }

    /// Render every sub-batch in insertion order
    pub fn render(&mut self) -> RenderResult<BatchStats> {
        let mut total = BatchStats::default();
        for batch in &mut self.batches {
            total.accumulate(&batch.render()?);
        }
        Ok(total)
    }
}

impl LineSink for UnboundedLineBatch {
    fn add_line(&mut self, start: LineVertex, end: LineVertex) -> BatchResult<()> {
        UnboundedLineBatch::add_line(self, start, end)
    }
}

/// Billboard batch without an object limit
pub struct UnboundedBillboardBatch {
    device: DeviceRef,
    batches: Vec<BillboardBatch>,
    initial_capacity: usize,
    max_objects: usize,
    mode: SubmitMode,
    layout: BillboardMode,
}

impl UnboundedBillboardBatch {
    /// Create an empty batch whose sub-batches use the default capacity and ceiling
    pub fn new(device: DeviceRef) -> BatchResult<Self> {
        Self::with_limits(device, DEFAULT_BILLBOARD_CAPACITY, MAX_BILLBOARDS)
    }

    /// Create an empty batch with explicit sub-batch sizing
    pub fn with_limits(device: DeviceRef, initial_capacity: usize, max_objects: usize) -> BatchResult<Self> {
        if max_objects == 0 || max_objects > MAX_BILLBOARDS {
            return Err(BatchError::InvalidCapacity {
                requested: max_objects,
                max: MAX_BILLBOARDS,
            });
        }
        if initial_capacity == 0 || initial_capacity > max_objects {
            return Err(BatchError::InvalidCapacity {
                requested: initial_capacity,
                max: max_objects,
            });
        }
        Ok(Self {
            device,
            batches: Vec::new(),
            initial_capacity,
            max_objects,
            mode: SubmitMode::default(),
            layout: BillboardMode::default(),
        })
    }

    /// Create a batch from the billboard section and submit mode of `config`
    pub fn from_config(device: DeviceRef, config: &BatchConfig) -> BatchResult<Self> {
        let section = &config.billboard;
        let mut batch = Self::with_limits(device, section.initial_capacity, section.max_objects)?;
        batch.mode = config.submit_mode;
        batch.layout = section.mode;
        Ok(batch)
    }

    /// Append one billboard, opening a sub-batch when the last one is full
    pub fn add_object(&mut self, position: Vec3, color: Color, size: f32) -> BatchResult<()> {
        if let Some(last) = self.batches.last_mut() {
            if last.add_object(position, color, size) {
                return Ok(());
            }
        }

        let mut batch = BillboardBatch::with_limits(self.device.clone(), self.initial_capacity, self.max_objects)?;
        batch.set_submit_mode(self.mode);
        batch.set_mode(self.layout);
        if !batch.add_object(position, color, size) {
            return Err(BatchError::CapacityExceeded {
                kind: "billboard",
                count: 0,
                max: self.max_objects,
            });
        }
        self.batches.push(batch);
        debug!("Opened billboard sub-batch #{}", self.batches.len());
        Ok(())
    }

    /// Drop every sub-batch
    pub fn clear(&mut self) {
        self.batches.clear();
    }

    /// Billboards across all sub-batches
    pub fn number_of_objects(&self) -> usize {
        self.batches.iter().map(BillboardBatch::number_of_objects).sum()
    }

    /// Whether no sub-batch exists
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Sub-batches in the list
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Sub-batches in insertion order
    pub fn batches(&self) -> &[BillboardBatch] {
        &self.batches
    }

    /// Ceiling of each sub-batch
    pub fn max_objects(&self) -> usize {
        self.max_objects
    }

    /// Current vertex layout
    pub fn mode(&self) -> BillboardMode {
        self.layout
    }

    /// Switch the vertex layout; drops every sub-batch when it changes
    pub fn set_mode(&mut self, layout: BillboardMode) {
        if layout != self.layout {
            self.layout = layout;
            self.clear();
        }
    }

    /// Current submission path
    pub fn submit_mode(&self) -> SubmitMode {
        self.mode
    }

    /// Select the submission path for existing and future sub-batches
    pub fn set_submit_mode(&mut self, mode: SubmitMode) {
        self.mode = mode;
        for batch in &mut self.batches {
            batch.set_submit_mode(mode);
        }
    }

    /// Whether rendering goes through cached device buffers
    pub fn use_vertex_buffer(&self) -> bool {
        self.mode.uses_vertex_buffer()
    }

    /// Flag form of [`set_submit_mode`](Self::set_submit_mode)
    pub fn set_use_vertex_buffer(&mut self, use_vertex_buffer: bool) {
        self.set_submit_mode(SubmitMode::from_use_vertex_buffer(use_vertex_buffer));
    }

    /// Render every sub-batch in insertion order
    pub fn render(&mut self) -> RenderResult<BatchStats> {
        let mut total = BatchStats::default();
        for batch in &mut self.batches {
            total.accumulate(&batch.render()?);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{BillboardVertex, DrawPath, RecordingDevice};
    use std::rc::Rc;

    fn setup() -> (Rc<RecordingDevice>, DeviceRef) {
        let device = Rc::new(RecordingDevice::new());
        let shared: DeviceRef = device.clone();
        (device, shared)
    }

    fn point(i: usize) -> Vec3 {
        Vec3::new(i as f32, 0.0, -(i as f32))
    }

    #[test]
    fn test_line_overflow_routing() {
        let mut batch = UnboundedLineBatch::with_lines_per_batch(setup().1, 100).unwrap();
        for i in 0..250 {
            batch.add_line_points(point(i), point(i + 1), Color::WHITE).unwrap();
        }
        assert_eq!(batch.batch_count(), 3);
        assert_eq!(batch.lines(), 250);

        let per_batch: Vec<usize> = batch.batches().iter().map(LineBatch::lines).collect();
        assert_eq!(per_batch, vec![100, 100, 50]);
        // Sub-batches stop at their initial capacity instead of doubling
        assert!(batch.batches().iter().all(|b| b.capacity() == 100));
    }

    #[test]
    fn test_line_order_preserved_across_sub_batches() {
        let mut batch = UnboundedLineBatch::with_lines_per_batch(setup().1, 2).unwrap();
        for i in 0..5 {
            batch.add_line_points(point(i), point(i), Color::RED).unwrap();
        }
        let firsts: Vec<Vec3> = batch
            .batches()
            .iter()
            .flat_map(|b| (0..b.lines()).map(move |i| b.line(i).unwrap().0.position()))
            .collect();
        assert_eq!(firsts, (0..5).map(point).collect::<Vec<_>>());
    }

    #[test]
    fn test_line_clear_drops_sub_batches() {
        let (recorder, device) = setup();
        let mut batch = UnboundedLineBatch::with_lines_per_batch(device, 10).unwrap();
        batch.set_use_vertex_buffer(true);
        for i in 0..25 {
            batch.add_line_points(point(i), point(i + 1), Color::BLUE).unwrap();
        }
        let stats = batch.render().unwrap();
        assert_eq!(stats.draw_calls, 3);
        assert_eq!(stats.primitives, 25);
        assert_eq!(recorder.live_buffers(), 6);

        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.lines(), 0);
        assert_eq!(recorder.live_buffers(), 0);

        batch.add_line_points(point(0), point(1), Color::BLUE).unwrap();
        assert_eq!(batch.batch_count(), 1);
        assert!(batch.batches()[0].use_vertex_buffer());
    }

    #[test]
    fn test_twenty_thousand_billboards() {
        let (recorder, device) = setup();
        let mut batch = UnboundedBillboardBatch::new(device).unwrap();
        for i in 0..20_000 {
            batch.add_object(point(i), Color::YELLOW, 0.25).unwrap();
        }
        assert_eq!(batch.max_objects(), MAX_BILLBOARDS);
        assert_eq!(batch.batch_count(), 4);
        assert_eq!(batch.number_of_objects(), 20_000);

        let stats = batch.render().unwrap();
        assert_eq!(stats.draw_calls, 4);
        assert_eq!(recorder.draw_count(), 4);
        let objects: Vec<usize> = recorder
            .draws()
            .iter()
            .map(|d| d.vertices::<BillboardVertex>().len() / 4)
            .collect();
        assert_eq!(objects, vec![5460, 5460, 5460, 3620]);
    }

    #[test]
    fn test_billboard_submit_paths_match() {
        let (recorder, device) = setup();
        let mut batch = UnboundedBillboardBatch::with_limits(device, 4, 16).unwrap();
        for i in 0..40 {
            batch.add_object(point(i), Color::GREEN, 1.0).unwrap();
        }
        batch.render().unwrap();
        batch.set_submit_mode(SubmitMode::Cached);
        batch.render().unwrap();

        let draws = recorder.take_draws();
        assert_eq!(draws.len(), 6);
        let (immediate, cached) = draws.split_at(3);
        for (a, b) in immediate.iter().zip(cached) {
            assert_eq!(a.path, DrawPath::Immediate);
            assert_eq!(b.path, DrawPath::Cached);
            assert_eq!(a.vertex_bytes, b.vertex_bytes);
            assert_eq!(a.indices, b.indices);
        }
    }

    #[test]
    fn test_billboard_layout_applies_to_sub_batches() {
        let mut batch = UnboundedBillboardBatch::with_limits(setup().1, 1, 1).unwrap();
        batch.add_object(point(0), Color::WHITE, 1.0).unwrap();
        batch.set_mode(BillboardMode::Quad);
        assert!(batch.is_empty());

        batch.add_object(point(0), Color::WHITE, 1.0).unwrap();
        batch.add_object(point(1), Color::WHITE, 1.0).unwrap();
        assert_eq!(batch.batch_count(), 2);
        assert!(batch.batches().iter().all(|b| b.mode() == BillboardMode::Quad));
    }

    #[test]
    fn test_invalid_limits() {
        assert!(UnboundedLineBatch::with_lines_per_batch(setup().1, 0).is_err());
        assert!(UnboundedLineBatch::with_lines_per_batch(setup().1, MAX_LINES_PER_BATCH + 1).is_err());
        assert!(UnboundedBillboardBatch::with_limits(setup().1, 1, MAX_BILLBOARDS + 1).is_err());
        assert!(UnboundedBillboardBatch::with_limits(setup().1, 8, 4).is_err());
    }

    #[test]
    fn test_from_config() {
        let mut config = BatchConfig::default();
        config.line.lines_per_batch = 64;
        config.billboard.mode = BillboardMode::Quad;
        config.submit_mode = SubmitMode::Cached;

        let lines = UnboundedLineBatch::from_config(setup().1, &config).unwrap();
        assert_eq!(lines.lines_per_batch(), 64);
        assert!(lines.use_vertex_buffer());

        let billboards = UnboundedBillboardBatch::from_config(setup().1, &config).unwrap();
        assert_eq!(billboards.mode(), BillboardMode::Quad);
        assert!(billboards.use_vertex_buffer());
    }
}
