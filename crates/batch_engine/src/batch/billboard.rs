//! # Billboard Batch
//!
//! Camera-facing quads for particles and sprites. Every billboard owns four
//! vertices and six indices forming two triangles. How the four vertices are
//! laid out depends on [`BillboardMode`].

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::cache::{submit, BufferCache, CacheState, Submission};
use super::storage::{PrimitiveShape, PrimitiveStorage};
use super::{BatchResult, BatchStats, SubmitMode};
use crate::config::BatchConfig;
use crate::foundation::color::Color;
use crate::foundation::math::{Vec2, Vec3};
use crate::render::{BillboardVertex, DeviceRef, PrimitiveTopology, RenderResult};

/// Absolute billboard ceiling for one batch
pub const MAX_BILLBOARDS: usize = 5460;

/// Billboards a batch holds before its first doubling
pub const DEFAULT_BILLBOARD_CAPACITY: usize = 256;

const CORNERS: [(f32, f32); 4] = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];

const BILLBOARD: PrimitiveShape = PrimitiveShape {
    kind: "billboard",
    vertices: 4,
    indices: &[0, 1, 2, 0, 2, 3],
};

/// Vertex layout of a billboard batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillboardMode {
    /// All four vertices sit on the center; the shader expands the quad
    /// from the corner coordinate and size
    #[default]
    PointList,
    /// Vertices are offset by half the size in the XY plane of object space
    Quad,
}

impl BillboardMode {
    fn corner_vertices(self, position: Vec3, color: Color, size: f32) -> [BillboardVertex; 4] {
        CORNERS.map(|(cx, cy)| {
            let corner = Vec2::new(cx, cy);
            let at = match self {
                Self::PointList => position,
                Self::Quad => position + Vec3::new((cx - 0.5) * size, (cy - 0.5) * size, 0.0),
            };
            BillboardVertex::new(at, corner, size, color)
        })
    }
}

/// Growable batch of billboards with a hard object ceiling
pub struct BillboardBatch {
    device: DeviceRef,
    storage: PrimitiveStorage<BillboardVertex>,
    cache: BufferCache,
    mode: SubmitMode,
    layout: BillboardMode,
}

impl BillboardBatch {
    /// Create a point-list batch with the default capacity and ceiling
    pub fn new(device: DeviceRef) -> BatchResult<Self> {
        Self::with_limits(device, DEFAULT_BILLBOARD_CAPACITY, MAX_BILLBOARDS)
    }

    /// Create a batch sized for `initial_capacity` billboards
    pub fn with_capacity(device: DeviceRef, initial_capacity: usize) -> BatchResult<Self> {
        Self::with_limits(device, initial_capacity, MAX_BILLBOARDS)
    }

    /// Create a batch with an explicit ceiling at or below [`MAX_BILLBOARDS`]
    pub fn with_limits(
        device: DeviceRef,
        initial_capacity: usize,
        max_objects: usize,
    ) -> BatchResult<Self> {
        if max_objects > MAX_BILLBOARDS {
            return Err(super::BatchError::InvalidCapacity {
                requested: max_objects,
                max: MAX_BILLBOARDS,
            });
        }
        Ok(Self {
            device,
            storage: PrimitiveStorage::new(BILLBOARD, initial_capacity, max_objects)?,
            cache: BufferCache::default(),
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

    /// Append one billboard
    ///
    /// Returns `false` and leaves the batch untouched once the ceiling is
    /// reached.
    pub fn add_object(&mut self, position: Vec3, color: Color, size: f32) -> bool {
        if self.storage.is_full() {
            return false;
        }
        let vertices = self.layout.corner_vertices(position, color, size);
        match self.storage.push(&vertices) {
            Ok(_) => {
                self.cache.invalidate(&*self.device);
                true
            }
            Err(e) => {
                warn!("Billboard rejected: {}", e);
                false
            }
        }
    }

    /// Remove all billboards; the arrays keep their current size
    pub fn clear(&mut self) {
        self.storage.clear();
        self.cache.invalidate(&*self.device);
    }

    /// Billboards currently stored
    pub fn number_of_objects(&self) -> usize {
        self.storage.count()
    }

    /// Whether the batch holds no billboards
    pub fn is_empty(&self) -> bool {
        self.storage.count() == 0
    }

    /// Whether the ceiling has been reached
    pub fn is_full(&self) -> bool {
        self.storage.is_full()
    }

    /// Billboards the arrays hold before the next doubling
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Billboard ceiling of this batch
    pub fn max_objects(&self) -> usize {
        self.storage.max_capacity()
    }

    /// The four vertices of billboard `index`
    pub fn object(&self, index: usize) -> Option<&[BillboardVertex]> {
        self.storage.primitive(index)
    }

    /// Vertices of the stored billboards
    pub fn vertices(&self) -> &[BillboardVertex] {
        self.storage.used_vertices()
    }

    /// Indices of the stored billboards
    pub fn indices(&self) -> &[u16] {
        self.storage.used_indices()
    }

    /// Current vertex layout
    pub fn mode(&self) -> BillboardMode {
        self.layout
    }

    /// Switch the vertex layout
    ///
    /// Existing billboards are discarded when the layout changes.
    pub fn set_mode(&mut self, layout: BillboardMode) {
        if layout != self.layout {
            debug!(
                "Billboard layout {:?} → {:?}, dropping {} objects",
                self.layout,
                layout,
                self.storage.count()
            );
            self.layout = layout;
            self.clear();
        }
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

    /// Draw all billboards as one triangle list
    ///
    /// Primitive counts in the returned stats are triangles, two per billboard.
    pub fn render(&mut self) -> RenderResult<BatchStats> {
        submit(
            &*self.device,
            self.mode,
            &mut self.cache,
            Submission {
                topology: PrimitiveTopology::TriangleList,
                vertices: self.storage.used_vertices(),
                indices: self.storage.used_indices(),
                primitive_count: self.storage.count() * 2,
            },
        )
    }
}

impl Drop for BillboardBatch {
    fn drop(&mut self) {
        self.cache.invalidate(&*self.device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DrawPath, RecordingDevice};
    use approx::assert_relative_eq;
    use std::rc::Rc;

    fn setup() -> (Rc<RecordingDevice>, DeviceRef) {
        let device = Rc::new(RecordingDevice::new());
        let shared: DeviceRef = device.clone();
        (device, shared)
    }

    fn position(i: usize) -> Vec3 {
        Vec3::new(i as f32, (i * 2) as f32, 0.5)
    }

    #[test]
    fn test_point_list_vertices_share_center() {
        let mut batch = BillboardBatch::new(setup().1).unwrap();
        assert!(batch.add_object(Vec3::new(1.0, 2.0, 3.0), Color::RED, 0.5));

        let object = batch.object(0).unwrap();
        assert_eq!(object.len(), 4);
        for (vertex, (cx, cy)) in object.iter().zip(CORNERS) {
            assert_eq!(vertex.position, [1.0, 2.0, 3.0]);
            assert_eq!(vertex.corner, [cx, cy]);
            assert_eq!(vertex.size, 0.5);
            assert_eq!(vertex.color, Color::RED);
        }
        assert_eq!(batch.indices(), &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_quad_mode_offsets_corners() {
        let mut batch = BillboardBatch::new(setup().1).unwrap();
        batch.set_mode(BillboardMode::Quad);
        batch.add_object(Vec3::new(10.0, 10.0, 0.0), Color::WHITE, 2.0);

        let object = batch.object(0).unwrap();
        assert_relative_eq!(object[0].position(), Vec3::new(9.0, 9.0, 0.0));
        assert_relative_eq!(object[1].position(), Vec3::new(11.0, 9.0, 0.0));
        assert_relative_eq!(object[2].position(), Vec3::new(11.0, 11.0, 0.0));
        assert_relative_eq!(object[3].position(), Vec3::new(9.0, 11.0, 0.0));
    }

    #[test]
    fn test_mode_change_clears() {
        let mut batch = BillboardBatch::new(setup().1).unwrap();
        batch.add_object(Vec3::zeros(), Color::BLUE, 1.0);
        batch.add_object(Vec3::zeros(), Color::BLUE, 1.0);

        batch.set_mode(BillboardMode::PointList);
        assert_eq!(batch.number_of_objects(), 2);

        batch.set_mode(BillboardMode::Quad);
        assert_eq!(batch.number_of_objects(), 0);
        assert_eq!(batch.mode(), BillboardMode::Quad);
    }

    #[test]
    fn test_ceiling_rejects_without_corruption() {
        let mut batch = BillboardBatch::with_limits(setup().1, 2, 10).unwrap();
        for i in 0..10 {
            assert!(batch.add_object(position(i), Color::GREEN, 1.0));
        }
        let before: Vec<BillboardVertex> = batch.vertices().to_vec();

        assert!(!batch.add_object(position(99), Color::RED, 9.0));
        assert!(!batch.add_object(position(100), Color::RED, 9.0));
        assert_eq!(batch.number_of_objects(), 10);
        assert!(batch.is_full());
        assert_eq!(batch.vertices(), before.as_slice());
    }

    #[test]
    fn test_default_ceiling() {
        let mut batch = BillboardBatch::with_capacity(setup().1, MAX_BILLBOARDS).unwrap();
        for i in 0..MAX_BILLBOARDS {
            assert!(batch.add_object(position(i), Color::WHITE, 1.0));
        }
        assert!(!batch.add_object(Vec3::zeros(), Color::WHITE, 1.0));
        assert_eq!(batch.number_of_objects(), MAX_BILLBOARDS);
        assert_eq!(batch.max_objects(), MAX_BILLBOARDS);
    }

    #[test]
    fn test_growth_preserves_objects() {
        let mut batch = BillboardBatch::with_capacity(setup().1, 1).unwrap();
        batch.add_object(position(0), Color::YELLOW, 3.0);
        let first = batch.object(0).unwrap().to_vec();
        for i in 1..9 {
            batch.add_object(position(i), Color::WHITE, 1.0);
        }
        assert_eq!(batch.capacity(), 16);
        assert_eq!(batch.object(0).unwrap(), first.as_slice());
        assert_eq!(&batch.indices()[48..54], &[32, 33, 34, 32, 34, 35]);
    }

    #[test]
    fn test_backend_equivalence() {
        let (recorder, device) = setup();
        let mut batch = BillboardBatch::new(device).unwrap();
        for i in 0..300 {
            batch.add_object(position(i), Color::rgb(0, (i % 256) as u8, 0), 1.5);
        }

        let immediate = batch.render().unwrap();
        batch.set_use_vertex_buffer(true);
        let cached = batch.render().unwrap();
        assert_eq!(immediate.primitives, 600);
        assert_eq!(cached.primitives, 600);

        let draws = recorder.take_draws();
        assert_eq!(draws[0].path, DrawPath::Immediate);
        assert_eq!(draws[1].path, DrawPath::Cached);
        assert_eq!(draws[0].topology, PrimitiveTopology::TriangleList);
        assert_eq!(
            draws[0].vertices::<BillboardVertex>(),
            draws[1].vertices::<BillboardVertex>()
        );
        assert_eq!(draws[0].indices, draws[1].indices);
    }

    #[test]
    fn test_rejects_ceiling_above_max() {
        assert!(BillboardBatch::with_limits(setup().1, 1, MAX_BILLBOARDS + 1).is_err());
    }

    #[test]
    fn test_from_config() {
        let mut config = BatchConfig::default();
        config.billboard.mode = BillboardMode::Quad;
        config.billboard.max_objects = 100;
        config.billboard.initial_capacity = 10;
        let batch = BillboardBatch::from_config(setup().1, &config).unwrap();
        assert_eq!(batch.mode(), BillboardMode::Quad);
        assert_eq!(batch.max_objects(), 100);
        assert_eq!(batch.capacity(), 10);
        assert!(!batch.use_vertex_buffer());
    }
}
