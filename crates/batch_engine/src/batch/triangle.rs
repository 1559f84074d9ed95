//! # Triangle Batch
//!
//! Indexed triangle mesh with strictly fixed capacity. Vertices are added on
//! their own and triangles reference them by index, so adjacent triangles
//! can share vertices. The batch never grows; callers check
//! [`available_vertices`](TriangleBatch::available_vertices) and
//! [`available_triangle_indices`](TriangleBatch::available_triangle_indices)
//! and move on to a new batch (see [`TriangleBatchList`](super::TriangleBatchList)).
//!
//! ## Normals
//!
//! [`generate_normals`](TriangleBatch::generate_normals) sums the unit face
//! normal of every triangle into its three vertices. Shared vertices end up
//! with the sum over all adjacent faces (smooth shading), unshared ones with
//! their single face normal (flat shading). The sums are left unnormalized;
//! [`normalize_normals`](TriangleBatch::normalize_normals) or
//! [`generate_smooth_normals`](TriangleBatch::generate_smooth_normals)
//! finish the job.

use super::cache::{submit, BufferCache, CacheState, Submission};
use super::index_space::vertex_index;
use super::{BatchError, BatchResult, BatchStats, SubmitMode, MAX_VERTICES_PER_BATCH};
use crate::config::BatchConfig;
use crate::foundation::color::Color;
use crate::foundation::math::Vec3;
use crate::foundation::math::utils::to_array;
use crate::render::{DeviceRef, PrimitiveTopology, RenderResult, TriangleVertex};

/// Face normals shorter than this are treated as degenerate
const DEGENERATE_EPSILON: f32 = 1.0e-12;

/// Fixed-capacity indexed triangle batch
pub struct TriangleBatch {
    device: DeviceRef,
    vertices: Vec<TriangleVertex>,
    indices: Vec<u16>,
    max_vertices: usize,
    max_indices: usize,
    cache: BufferCache,
    mode: SubmitMode,
}

impl TriangleBatch {
    /// Create a batch holding up to `max_vertices` vertices and
    /// `max_indices` triangle indices
    pub fn new(device: DeviceRef, max_vertices: usize, max_indices: usize) -> BatchResult<Self> {
        Self::check_limits(max_vertices, max_indices)?;
        Ok(Self {
            device,
            vertices: Vec::with_capacity(max_vertices),
            indices: Vec::with_capacity(max_indices),
            max_vertices,
            max_indices,
            cache: BufferCache::default(),
            mode: SubmitMode::default(),
        })
    }

    /// Vertex limit must fit the index space; the index limit must hold a triangle
    pub(crate) fn check_limits(max_vertices: usize, max_indices: usize) -> BatchResult<()> {
        if max_vertices == 0 || max_vertices > MAX_VERTICES_PER_BATCH {
            return Err(BatchError::InvalidCapacity {
                requested: max_vertices,
                max: MAX_VERTICES_PER_BATCH,
            });
        }
        if max_indices < 3 {
            return Err(BatchError::InvalidGeometry(format!(
                "a triangle batch needs room for at least 3 indices, got {max_indices}"
            )));
        }
        Ok(())
    }

    /// Create a batch from the triangle section and submit mode of `config`
    pub fn from_config(device: DeviceRef, config: &BatchConfig) -> BatchResult<Self> {
        let mut batch = Self::new(device, config.triangle.max_vertices, config.triangle.max_indices)?;
        batch.mode = config.submit_mode;
        Ok(batch)
    }

    /// Append a vertex and return its index
    pub fn add_vertex(&mut self, vertex: TriangleVertex) -> BatchResult<u16> {
        if self.vertices.len() >= self.max_vertices {
            return Err(BatchError::CapacityExceeded {
                kind: "vertex",
                count: self.vertices.len(),
                max: self.max_vertices,
            });
        }
        let index = vertex_index(self.vertices.len())?;
        self.vertices.push(vertex);
        self.cache.invalidate(&*self.device);
        Ok(index)
    }

    /// Append a vertex with a zero normal
    pub fn add_point(&mut self, position: Vec3, color: Color) -> BatchResult<u16> {
        self.add_vertex(TriangleVertex::new(position, color))
    }

    /// Append a triangle over three previously added vertices
    pub fn add_triangle(&mut self, a: u16, b: u16, c: u16) -> BatchResult<()> {
        if self.available_triangle_indices() < 3 {
            return Err(BatchError::CapacityExceeded {
                kind: "triangle index",
                count: self.indices.len(),
                max: self.max_indices,
            });
        }
        for index in [a, b, c] {
            if usize::from(index) >= self.vertices.len() {
                return Err(BatchError::InvalidIndex {
                    index,
                    vertices: self.vertices.len(),
                });
            }
        }
        self.indices.extend_from_slice(&[a, b, c]);
        self.cache.invalidate(&*self.device);
        Ok(())
    }

    /// Vertices that can still be added
    pub fn available_vertices(&self) -> usize {
        self.max_vertices - self.vertices.len()
    }

    /// Triangle indices that can still be added
    pub fn available_triangle_indices(&self) -> usize {
        self.max_indices - self.indices.len()
    }

    /// Vertex capacity
    pub fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    /// Index capacity
    pub fn max_indices(&self) -> usize {
        self.max_indices
    }

    /// Vertices currently stored
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Indices currently stored
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Triangles currently stored
    pub fn number_of_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the batch holds no vertices
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty() && self.vertices.is_empty()
    }

    /// Vertex at `index`
    pub fn vertex(&self, index: usize) -> Option<&TriangleVertex> {
        self.vertices.get(index)
    }

    /// Vertex indices of triangle `index`
    pub fn triangle(&self, index: usize) -> Option<[u16; 3]> {
        let start = index.checked_mul(3)?;
        self.indices
            .get(start..start + 3)
            .map(|t| [t[0], t[1], t[2]])
    }

    /// Stored vertices in index order
    pub fn vertices(&self) -> &[TriangleVertex] {
        &self.vertices
    }

    /// Stored triangle indices, three per triangle
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Remove all vertices and triangles
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.cache.invalidate(&*self.device);
    }

    /// Recompute vertex normals as sums of adjacent unit face normals
    ///
    /// Existing normals are reset first. Zero-area triangles contribute
    /// nothing.
    pub fn generate_normals(&mut self) {
        self.generate_normals_from(0, 0);
    }

    /// Normalize every vertex normal; zero normals stay zero
    pub fn normalize_normals(&mut self) {
        self.normalize_normals_from(0);
    }

    /// Accumulate face normals, then normalize them
    pub fn generate_smooth_normals(&mut self) {
        self.generate_normals();
        self.normalize_normals();
    }

    /// Normal generation limited to vertices from `first_vertex` and
    /// triangles from index offset `first_index`
    pub(crate) fn generate_normals_from(&mut self, first_vertex: usize, first_index: usize) {
        for vertex in &mut self.vertices[first_vertex..] {
            vertex.normal = [0.0; 3];
        }

        for triangle in self.indices[first_index..].chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(usize::from);
            let p0 = self.vertices[a].position();
            let p1 = self.vertices[b].position();
            let p2 = self.vertices[c].position();

            let Some(face) = (p1 - p0).cross(&(p2 - p0)).try_normalize(DEGENERATE_EPSILON) else {
                continue;
            };
            for index in [a, b, c] {
                let vertex = &mut self.vertices[index];
                vertex.normal = to_array(&(vertex.normal() + face));
            }
        }
        self.cache.invalidate(&*self.device);
    }

    pub(crate) fn normalize_normals_from(&mut self, first_vertex: usize) {
        for vertex in &mut self.vertices[first_vertex..] {
            if let Some(unit) = vertex.normal().try_normalize(DEGENERATE_EPSILON) {
                vertex.normal = to_array(&unit);
            }
        }
        self.cache.invalidate(&*self.device);
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

    /// Draw all triangles as one triangle list
    pub fn render(&mut self) -> RenderResult<BatchStats> {
        submit(
            &*self.device,
            self.mode,
            &mut self.cache,
            Submission {
                topology: PrimitiveTopology::TriangleList,
                vertices: &self.vertices,
                indices: &self.indices,
                primitive_count: self.indices.len() / 3,
            },
        )
    }
}

impl Drop for TriangleBatch {
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

    /// Two triangles folded along the shared edge (1, 2)
    fn folded_quad(batch: &mut TriangleBatch) {
        let v0 = batch.add_point(Vec3::new(0.0, 0.0, 0.0), Color::WHITE).unwrap();
        let v1 = batch.add_point(Vec3::new(1.0, 0.0, 0.0), Color::WHITE).unwrap();
        let v2 = batch.add_point(Vec3::new(0.0, 1.0, 0.0), Color::WHITE).unwrap();
        let v3 = batch.add_point(Vec3::new(1.0, 1.0, 1.0), Color::WHITE).unwrap();
        batch.add_triangle(v0, v1, v2).unwrap();
        batch.add_triangle(v1, v3, v2).unwrap();
    }

    #[test]
    fn test_shared_vertices_accumulate_face_normals() {
        let mut batch = TriangleBatch::new(setup().1, 16, 16).unwrap();
        folded_quad(&mut batch);
        batch.generate_normals();

        let face_a = Vec3::z();
        let p1 = Vec3::new(1.0, 0.0, 0.0);
        let p2 = Vec3::new(0.0, 1.0, 0.0);
        let p3 = Vec3::new(1.0, 1.0, 1.0);
        let face_b = (p3 - p1).cross(&(p2 - p1)).normalize();

        assert_relative_eq!(batch.vertex(0).unwrap().normal(), face_a, epsilon = 1e-6);
        assert_relative_eq!(batch.vertex(3).unwrap().normal(), face_b, epsilon = 1e-6);
        assert_relative_eq!(batch.vertex(1).unwrap().normal(), face_a + face_b, epsilon = 1e-6);
        assert_relative_eq!(batch.vertex(2).unwrap().normal(), face_a + face_b, epsilon = 1e-6);
    }

    #[test]
    fn test_generate_normals_is_repeatable() {
        let mut batch = TriangleBatch::new(setup().1, 16, 16).unwrap();
        folded_quad(&mut batch);
        batch.generate_normals();
        let first: Vec<Vec3> = batch.vertices().iter().map(|v| v.normal()).collect();
        batch.generate_normals();
        for (vertex, expected) in batch.vertices().iter().zip(first) {
            assert_relative_eq!(vertex.normal(), expected);
        }
    }

    #[test]
    fn test_smooth_normals_are_unit_length() {
        let mut batch = TriangleBatch::new(setup().1, 16, 16).unwrap();
        folded_quad(&mut batch);
        batch.generate_smooth_normals();
        for vertex in batch.vertices() {
            assert_relative_eq!(vertex.normal().norm(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_degenerate_triangle_contributes_nothing() {
        let mut batch = TriangleBatch::new(setup().1, 8, 8).unwrap();
        let a = batch.add_point(Vec3::zeros(), Color::RED).unwrap();
        let b = batch.add_point(Vec3::x(), Color::RED).unwrap();
        let c = batch.add_point(Vec3::x() * 2.0, Color::RED).unwrap();
        batch.add_triangle(a, b, c).unwrap();
        batch.generate_smooth_normals();
        for vertex in batch.vertices() {
            assert_eq!(vertex.normal, [0.0; 3]);
        }
    }

    #[test]
    fn test_fixed_capacity() {
        let mut batch = TriangleBatch::new(setup().1, 3, 5).unwrap();
        for i in 0..3 {
            batch.add_point(Vec3::new(i as f32, 0.0, 0.0), Color::BLUE).unwrap();
        }
        assert_eq!(batch.available_vertices(), 0);
        assert!(matches!(
            batch.add_point(Vec3::zeros(), Color::BLUE),
            Err(BatchError::CapacityExceeded { kind: "vertex", .. })
        ));

        batch.add_triangle(0, 1, 2).unwrap();
        assert_eq!(batch.available_triangle_indices(), 2);
        assert!(matches!(
            batch.add_triangle(2, 1, 0),
            Err(BatchError::CapacityExceeded { .. })
        ));
        assert_eq!(batch.number_of_triangles(), 1);
        assert_eq!(batch.triangle(0), Some([0, 1, 2]));
        assert_eq!(batch.triangle(1), None);
    }

    #[test]
    fn test_rejects_unknown_vertex() {
        let mut batch = TriangleBatch::new(setup().1, 8, 8).unwrap();
        batch.add_point(Vec3::zeros(), Color::BLUE).unwrap();
        assert!(matches!(
            batch.add_triangle(0, 0, 1),
            Err(BatchError::InvalidIndex { index: 1, vertices: 1 })
        ));
        assert_eq!(batch.index_count(), 0);
    }

    #[test]
    fn test_backend_equivalence() {
        let (recorder, device) = setup();
        let mut batch = TriangleBatch::new(device, 16, 16).unwrap();
        folded_quad(&mut batch);
        batch.generate_smooth_normals();

        batch.render().unwrap();
        batch.set_submit_mode(SubmitMode::Cached);
        let stats = batch.render().unwrap();
        assert_eq!(stats.primitives, 2);

        let draws = recorder.take_draws();
        assert_eq!(draws[0].path, DrawPath::Immediate);
        assert_eq!(draws[1].path, DrawPath::Cached);
        assert_eq!(
            draws[0].vertices::<TriangleVertex>(),
            draws[1].vertices::<TriangleVertex>()
        );
        assert_eq!(draws[0].indices, vec![0, 1, 2, 1, 3, 2]);
        assert_eq!(draws[0].indices, draws[1].indices);
    }

    #[test]
    fn test_clear_then_render_draws_nothing() {
        let (recorder, device) = setup();
        let mut batch = TriangleBatch::new(device, 16, 16).unwrap();
        folded_quad(&mut batch);
        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.render().unwrap().draw_calls, 0);
        assert_eq!(recorder.draw_count(), 0);
        assert_eq!(batch.available_vertices(), 16);
    }

    #[test]
    fn test_invalid_limits() {
        assert!(TriangleBatch::new(setup().1, 0, 3).is_err());
        assert!(TriangleBatch::new(setup().1, MAX_VERTICES_PER_BATCH + 1, 3).is_err());
        assert!(TriangleBatch::new(setup().1, 3, 2).is_err());
        assert!(TriangleBatch::new(setup().1, MAX_VERTICES_PER_BATCH, 3).is_ok());
    }
}
