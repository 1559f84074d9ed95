//! # Line Batch
//!
//! Accumulates line segments and draws them as one line list. Each segment
//! owns two fresh vertices and two indices referencing them in insertion
//! order. The arrays double when full, up to [`MAX_LINES_PER_BATCH`].

use log::debug;

use super::cache::{submit, BufferCache, CacheState, Submission};
use super::storage::{PrimitiveShape, PrimitiveStorage};
use super::{BatchResult, BatchStats, SubmitMode};
use crate::config::BatchConfig;
use crate::foundation::color::Color;
use crate::foundation::math::Vec3;
use crate::geometry::LineSink;
use crate::render::{DeviceRef, LineVertex, PrimitiveTopology, RenderResult};

/// Hard line ceiling for one batch, bounded by 16-bit indexing
pub const MAX_LINES_PER_BATCH: usize = 32_767;

/// Lines a batch holds before its first doubling
pub const DEFAULT_LINE_CAPACITY: usize = 1024;

const LINE: PrimitiveShape = PrimitiveShape {
    kind: "line",
    vertices: 2,
    indices: &[0, 1],
};

/// Growable batch of line segments
pub struct LineBatch {
    device: DeviceRef,
    storage: PrimitiveStorage<LineVertex>,
    cache: BufferCache,
    mode: SubmitMode,
}

impl LineBatch {
    /// Create a batch with the default initial capacity
    pub fn new(device: DeviceRef) -> BatchResult<Self> {
        Self::with_capacity(device, DEFAULT_LINE_CAPACITY)
    }

    /// Create a batch sized for `initial_capacity` lines
    ///
    /// The capacity must be in `1..=MAX_LINES_PER_BATCH`.
    pub fn with_capacity(device: DeviceRef, initial_capacity: usize) -> BatchResult<Self> {
        Ok(Self {
            device,
            storage: PrimitiveStorage::new(LINE, initial_capacity, MAX_LINES_PER_BATCH)?,
            cache: BufferCache::default(),
            mode: SubmitMode::default(),
        })
    }

    /// Create a batch from the line section and submit mode of `config`
    pub fn from_config(device: DeviceRef, config: &BatchConfig) -> BatchResult<Self> {
        let mut batch = Self::with_capacity(device, config.line.initial_capacity)?;
        batch.mode = config.submit_mode;
        Ok(batch)
    }

    /// Append one segment
    ///
    /// Grows the arrays when they are full. Fails with `CapacityExceeded`
    /// only once the batch holds [`MAX_LINES_PER_BATCH`] lines.
    pub fn add_line(&mut self, start: LineVertex, end: LineVertex) -> BatchResult<()> {
        self.storage.push(&[start, end])?;
        self.cache.invalidate(&*self.device);
        Ok(())
    }

    /// Append one single-colored segment between two points
    pub fn add_line_points(&mut self, start: Vec3, end: Vec3, color: Color) -> BatchResult<()> {
        self.add_line(LineVertex::new(start, color), LineVertex::new(end, color))
    }

    /// Remove all lines; the arrays keep their current size
    pub fn clear(&mut self) {
        self.storage.clear();
        self.cache.invalidate(&*self.device);
    }

    /// Lines currently stored
    pub fn lines(&self) -> usize {
        self.storage.count()
    }

    /// Whether the batch holds no lines
    pub fn is_empty(&self) -> bool {
        self.storage.count() == 0
    }

    /// Lines the arrays hold before the next doubling
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Lines that fit before the next doubling
    pub fn lines_free(&self) -> usize {
        self.storage.free()
    }

    /// Hard line ceiling
    pub fn max_lines(&self) -> usize {
        self.storage.max_capacity()
    }

    /// Endpoints of line `index`
    pub fn line(&self, index: usize) -> Option<(LineVertex, LineVertex)> {
        self.storage.primitive(index).map(|v| (v[0], v[1]))
    }

    /// Vertices of the stored lines
    pub fn vertices(&self) -> &[LineVertex] {
        self.storage.used_vertices()
    }

    /// Indices of the stored lines
    pub fn indices(&self) -> &[u16] {
        self.storage.used_indices()
    }

    /// Current submission path
    pub fn submit_mode(&self) -> SubmitMode {
        self.mode
    }

    /// Select the submission path; invalidates cached buffers
    pub fn set_submit_mode(&mut self, mode: SubmitMode) {
        self.mode = mode;
        self.cache.invalidate(&*self.device);
    }

    /// Whether rendering goes through cached device buffers
    pub fn use_vertex_buffer(&self) -> bool {
        self.mode.uses_vertex_buffer()
    }

    /// Flag form of [`set_submit_mode`](Self::set_submit_mode)
    pub fn set_use_vertex_buffer(&mut self, use_vertex_buffer: bool) {
        self.set_submit_mode(SubmitMode::from_use_vertex_buffer(use_vertex_buffer));
    }

    /// State of the cached buffer pair
    pub fn cache_state(&self) -> CacheState {
        self.cache.state()
    }

    /// Draw all lines as one line list
    pub fn render(&mut self) -> RenderResult<BatchStats> {
        submit(
            &*self.device,
            self.mode,
            &mut self.cache,
            Submission {
                topology: PrimitiveTopology::LineList,
                vertices: self.storage.used_vertices(),
                indices: self.storage.used_indices(),
                primitive_count: self.storage.count(),
            },
        )
    }
}

impl LineSink for LineBatch {
    fn add_line(&mut self, start: LineVertex, end: LineVertex) -> BatchResult<()> {
        LineBatch::add_line(self, start, end)
    }

    fn lines_available(&self) -> Option<usize> {
        Some(self.max_lines() - self.lines())
    }
}

impl Drop for LineBatch {
    fn drop(&mut self) {
        if self.cache.state() == CacheState::Clean {
            debug!("Releasing cached line buffers ({} lines)", self.storage.count());
        }
        self.cache.invalidate(&*self.device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchError;
    use crate::render::{DrawPath, RecordingDevice};
    use std::rc::Rc;

    fn setup() -> (Rc<RecordingDevice>, DeviceRef) {
        let device = Rc::new(RecordingDevice::new());
        let shared: DeviceRef = device.clone();
        (device, shared)
    }

    fn endpoint(i: usize, end: bool) -> LineVertex {
        let x = i as f32;
        let color = Color::rgb((i % 256) as u8, 0, if end { 255 } else { 0 });
        LineVertex::new(Vec3::new(x, if end { 1.0 } else { 0.0 }, -x), color)
    }

    fn fill(batch: &mut LineBatch, n: usize) {
        for i in 0..n {
            batch.add_line(endpoint(i, false), endpoint(i, true)).unwrap();
        }
    }

    #[test]
    fn test_count_across_doublings() {
        let (_, device) = setup();
        let mut batch = LineBatch::with_capacity(device, 1024).unwrap();
        fill(&mut batch, 1025);
        assert_eq!(batch.lines(), 1025);
        assert_eq!(batch.capacity(), 2048);
        assert_eq!(batch.lines_free(), 1023);

        let mut small = LineBatch::with_capacity(setup().1, 1).unwrap();
        fill(&mut small, 100);
        assert_eq!(small.lines(), 100);
        assert_eq!(small.capacity(), 128);
    }

    #[test]
    fn test_growth_preserves_lines() {
        let (_, device) = setup();
        let mut batch = LineBatch::with_capacity(device, 4).unwrap();
        fill(&mut batch, 4);
        let before: Vec<_> = (0..4).map(|i| batch.line(i).unwrap()).collect();

        batch.add_line(endpoint(4, false), endpoint(4, true)).unwrap();
        assert_eq!(batch.capacity(), 8);
        for (i, expected) in before.iter().enumerate() {
            assert_eq!(batch.line(i).unwrap(), *expected);
        }
        assert_eq!(batch.indices(), &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_clear_resets() {
        let (recorder, device) = setup();
        let mut batch = LineBatch::new(device).unwrap();
        fill(&mut batch, 10);
        batch.clear();
        assert_eq!(batch.lines(), 0);
        assert!(batch.is_empty());

        let stats = batch.render().unwrap();
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(recorder.draw_count(), 0);

        let fresh = LineVertex::new(Vec3::new(9.0, 9.0, 9.0), Color::YELLOW);
        batch.add_line(fresh, fresh).unwrap();
        assert_eq!(batch.line(0).unwrap(), (fresh, fresh));
        assert!(batch.line(1).is_none());
        assert_eq!(batch.indices(), &[0, 1]);
    }

    #[test]
    fn test_backend_equivalence() {
        let (recorder, device) = setup();
        let mut batch = LineBatch::with_capacity(device, 2).unwrap();
        fill(&mut batch, 37);

        batch.render().unwrap();
        batch.set_use_vertex_buffer(true);
        batch.render().unwrap();

        let draws = recorder.take_draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].path, DrawPath::Immediate);
        assert_eq!(draws[1].path, DrawPath::Cached);
        assert_eq!(draws[0].vertices::<LineVertex>(), draws[1].vertices::<LineVertex>());
        assert_eq!(draws[0].indices, draws[1].indices);
        assert_eq!(draws[0].primitive_count, 37);
        assert_eq!(draws[1].primitive_count, 37);
    }

    #[test]
    fn test_cache_invalidation() {
        let (recorder, device) = setup();
        let mut batch = LineBatch::new(device).unwrap();
        batch.set_submit_mode(SubmitMode::Cached);
        fill(&mut batch, 3);
        assert_eq!(batch.cache_state(), CacheState::Dirty);

        let stats = batch.render().unwrap();
        assert_eq!(stats.buffers_rebuilt, 1);
        assert_eq!(batch.cache_state(), CacheState::Clean);
        assert_eq!(recorder.live_buffers(), 2);

        // Unchanged contents reuse the pair
        assert_eq!(batch.render().unwrap().buffers_rebuilt, 0);

        batch.add_line_points(Vec3::zeros(), Vec3::y(), Color::GREEN).unwrap();
        assert_eq!(batch.cache_state(), CacheState::Dirty);
        assert_eq!(recorder.live_buffers(), 0);

        let stats = batch.render().unwrap();
        assert_eq!(stats.buffers_rebuilt, 1);
        assert_eq!(recorder.draws().last().unwrap().primitive_count, 4);

        batch.set_use_vertex_buffer(false);
        assert_eq!(batch.cache_state(), CacheState::Dirty);
        assert_eq!(recorder.live_buffers(), 0);
    }

    #[test]
    fn test_cached_buffers_sized_to_contents() {
        let (recorder, device) = setup();
        let mut batch = LineBatch::with_capacity(device, 1024).unwrap();
        batch.set_use_vertex_buffer(true);
        fill(&mut batch, 5);
        batch.render().unwrap();
        let draw = recorder.draws().pop().unwrap();
        assert_eq!(draw.vertex_bytes.len(), 10 * std::mem::size_of::<LineVertex>());
        assert_eq!(draw.indices.len(), 10);
    }

    #[test]
    fn test_drop_releases_buffers() {
        let (recorder, device) = setup();
        {
            let mut batch = LineBatch::new(device).unwrap();
            batch.set_use_vertex_buffer(true);
            fill(&mut batch, 2);
            batch.render().unwrap();
            assert_eq!(recorder.live_buffers(), 2);
        }
        assert_eq!(recorder.live_buffers(), 0);
    }

    #[test]
    fn test_hard_ceiling() {
        let (_, device) = setup();
        let mut batch = LineBatch::with_capacity(device, MAX_LINES_PER_BATCH).unwrap();
        fill(&mut batch, MAX_LINES_PER_BATCH);
        let result = batch.add_line(endpoint(0, false), endpoint(0, true));
        assert!(matches!(result, Err(BatchError::CapacityExceeded { .. })));
        assert_eq!(batch.lines(), MAX_LINES_PER_BATCH);
        assert_eq!(*batch.indices().last().unwrap() as usize, 2 * MAX_LINES_PER_BATCH - 1);
    }

    #[test]
    fn test_invalid_initial_capacity() {
        assert!(LineBatch::with_capacity(setup().1, 0).is_err());
        assert!(LineBatch::with_capacity(setup().1, MAX_LINES_PER_BATCH + 1).is_err());
    }

    #[test]
    fn test_from_config() {
        let mut config = BatchConfig::default();
        config.line.initial_capacity = 16;
        config.submit_mode = SubmitMode::Cached;
        let batch = LineBatch::from_config(setup().1, &config).unwrap();
        assert_eq!(batch.capacity(), 16);
        assert!(batch.use_vertex_buffer());
    }
}
