//! 16-bit index space accounting
//!
//! Every batch addresses its vertices with `u16` indices, so one batch can
//! reference at most 65536 vertices. Offsets are converted through
//! [`vertex_index`] so an overflow is reported instead of wrapping.

use super::{BatchError, BatchResult};

/// Vertices addressable by one batch
pub const MAX_VERTICES_PER_BATCH: usize = 1 << 16;

/// Convert a vertex offset into a 16-bit index
pub fn vertex_index(vertex: usize) -> BatchResult<u16> {
    u16::try_from(vertex).map_err(|_| BatchError::IndexSpaceExhausted {
        vertex,
        max: MAX_VERTICES_PER_BATCH,
    })
}

/// Check that `vertices` vertices fit one batch
pub fn check_vertex_budget(vertices: usize) -> BatchResult<()> {
    if vertices > MAX_VERTICES_PER_BATCH {
        return Err(BatchError::IndexSpaceExhausted {
            vertex: vertices - 1,
            max: MAX_VERTICES_PER_BATCH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_index_bounds() {
        assert_eq!(vertex_index(0).unwrap(), 0);
        assert_eq!(vertex_index(65_535).unwrap(), u16::MAX);
        assert!(matches!(
            vertex_index(65_536),
            Err(BatchError::IndexSpaceExhausted { vertex: 65_536, .. })
        ));
    }

    #[test]
    fn test_vertex_budget() {
        assert!(check_vertex_budget(MAX_VERTICES_PER_BATCH).is_ok());
        assert!(check_vertex_budget(MAX_VERTICES_PER_BATCH + 1).is_err());
    }
}
