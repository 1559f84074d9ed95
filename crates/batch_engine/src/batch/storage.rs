//! Doubling vertex/index arrays shared by the line and billboard batches
//!
//! Each primitive occupies a fixed number of vertices and indices. The
//! arrays always hold exactly `capacity` primitives worth of records; when a
//! push finds them full, both are reallocated at twice the size (clamped to
//! the ceiling) and the existing records are copied forward.

use super::index_space::{check_vertex_budget, vertex_index};
use super::{BatchError, BatchResult};
use crate::render::BatchVertex;

/// Shape of one primitive in the arrays
#[derive(Debug, Clone, Copy)]
pub(crate) struct PrimitiveShape {
    /// Name used in logs and errors
    pub kind: &'static str,
    /// Vertices per primitive
    pub vertices: usize,
    /// Index pattern relative to the primitive's first vertex
    pub indices: &'static [u16],
}

pub(crate) struct PrimitiveStorage<V> {
    shape: PrimitiveShape,
    vertices: Vec<V>,
    indices: Vec<u16>,
    count: usize,
    capacity: usize,
    max_capacity: usize,
}

impl<V: BatchVertex> PrimitiveStorage<V> {
    /// Allocate arrays for `initial_capacity` primitives
    pub fn new(shape: PrimitiveShape, initial_capacity: usize, max_capacity: usize) -> BatchResult<Self> {
        if max_capacity == 0 {
            return Err(BatchError::InvalidCapacity { requested: max_capacity, max: max_capacity });
        }
        check_vertex_budget(max_capacity * shape.vertices)?;
        if initial_capacity == 0 || initial_capacity > max_capacity {
            return Err(BatchError::InvalidCapacity {
                requested: initial_capacity,
                max: max_capacity,
            });
        }

        Ok(Self {
            shape,
            vertices: vec![V::zeroed(); initial_capacity * shape.vertices],
            indices: vec![0; initial_capacity * shape.indices.len()],
            count: 0,
            capacity: initial_capacity,
            max_capacity,
        })
    }

    /// Append one primitive, growing first if the arrays are full
    ///
    /// Returns the primitive's position in the batch.
    pub fn push(&mut self, vertices: &[V]) -> BatchResult<usize> {
        debug_assert_eq!(vertices.len(), self.shape.vertices);
        if self.count == self.capacity {
            self.grow()?;
        }

        let slot = self.count;
        let base_vertex = slot * self.shape.vertices;
        let base_index = slot * self.shape.indices.len();
        for (offset, &relative) in self.shape.indices.iter().enumerate() {
            self.indices[base_index + offset] = vertex_index(base_vertex + usize::from(relative))?;
        }
        self.vertices[base_vertex..base_vertex + self.shape.vertices].copy_from_slice(vertices);
        self.count += 1;
        Ok(slot)
    }

    /// Double the arrays, copying existing records forward
    fn grow(&mut self) -> BatchResult<()> {
        if self.capacity >= self.max_capacity {
            return Err(BatchError::CapacityExceeded {
                kind: self.shape.kind,
                count: self.count,
                max: self.max_capacity,
            });
        }

        let new_capacity = (self.capacity * 2).min(self.max_capacity);
        log::debug!(
            "Growing {} batch: {} → {} primitives",
            self.shape.kind,
            self.capacity,
            new_capacity
        );

        let mut vertices = vec![V::zeroed(); new_capacity * self.shape.vertices];
        vertices[..self.vertices.len()].copy_from_slice(&self.vertices);
        let mut indices = vec![0; new_capacity * self.shape.indices.len()];
        indices[..self.indices.len()].copy_from_slice(&self.indices);

        self.vertices = vertices;
        self.indices = indices;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Forget all primitives; the arrays keep their size
    pub fn clear(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Primitives that fit before the next doubling
    pub fn free(&self) -> usize {
        self.capacity - self.count
    }

    pub fn is_full(&self) -> bool {
        self.count == self.max_capacity
    }

    /// Vertices of stored primitives
    pub fn used_vertices(&self) -> &[V] {
        &self.vertices[..self.count * self.shape.vertices]
    }

    /// Indices of stored primitives
    pub fn used_indices(&self) -> &[u16] {
        &self.indices[..self.count * self.shape.indices.len()]
    }

    /// Vertices of primitive `slot`
    pub fn primitive(&self, slot: usize) -> Option<&[V]> {
        if slot >= self.count {
            return None;
        }
        let start = slot * self.shape.vertices;
        Some(&self.vertices[start..start + self.shape.vertices])
    }

    /// Length of the backing vertex array
    #[cfg(test)]
    pub fn vertex_array_len(&self) -> usize {
        self.vertices.len()
    }

    /// Length of the backing index array
    #[cfg(test)]
    pub fn index_array_len(&self) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::color::Color;
    use crate::foundation::math::Vec3;
    use crate::render::LineVertex;

    const SEGMENT: PrimitiveShape = PrimitiveShape {
        kind: "test",
        vertices: 2,
        indices: &[0, 1],
    };

    fn segment(i: usize) -> [LineVertex; 2] {
        let x = i as f32;
        [
            LineVertex::new(Vec3::new(x, 0.0, 0.0), Color::RED),
            LineVertex::new(Vec3::new(x, 1.0, 0.0), Color::BLUE),
        ]
    }

    #[test]
    fn test_arrays_track_capacity() {
        let mut storage = PrimitiveStorage::<LineVertex>::new(SEGMENT, 2, 8).unwrap();
        assert_eq!(storage.vertex_array_len(), 4);
        assert_eq!(storage.index_array_len(), 4);

        for i in 0..3 {
            storage.push(&segment(i)).unwrap();
        }
        assert_eq!(storage.capacity(), 4);
        assert_eq!(storage.vertex_array_len(), 8);
        assert_eq!(storage.index_array_len(), 8);
        assert_eq!(storage.used_indices(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_growth_clamps_to_ceiling() {
        let mut storage = PrimitiveStorage::<LineVertex>::new(SEGMENT, 3, 5).unwrap();
        for i in 0..5 {
            storage.push(&segment(i)).unwrap();
        }
        assert_eq!(storage.capacity(), 5);
        assert!(storage.is_full());
        assert!(matches!(
            storage.push(&segment(5)),
            Err(BatchError::CapacityExceeded { count: 5, max: 5, .. })
        ));
        assert_eq!(storage.count(), 5);
    }

    #[test]
    fn test_clear_keeps_arrays() {
        let mut storage = PrimitiveStorage::<LineVertex>::new(SEGMENT, 1, 4).unwrap();
        storage.push(&segment(0)).unwrap();
        storage.push(&segment(1)).unwrap();
        storage.clear();
        assert_eq!(storage.count(), 0);
        assert_eq!(storage.capacity(), 2);
        assert!(storage.used_vertices().is_empty());

        storage.push(&segment(7)).unwrap();
        assert_eq!(storage.primitive(0).unwrap(), &segment(7));
        assert!(storage.primitive(1).is_none());
    }

    #[test]
    fn test_rejects_ceiling_beyond_index_space() {
        assert!(matches!(
            PrimitiveStorage::<LineVertex>::new(SEGMENT, 1, 40_000),
            Err(BatchError::IndexSpaceExhausted { .. })
        ));
        assert!(matches!(
            PrimitiveStorage::<LineVertex>::new(SEGMENT, 0, 4),
            Err(BatchError::InvalidCapacity { .. })
        ));
    }
}
