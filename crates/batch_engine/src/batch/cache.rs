//! Cached device buffers and the shared submission path
//!
//! A batch rendering in [`SubmitMode::Cached`] keeps one vertex/index buffer
//! pair sized to its current contents. The pair is only valid in the `Clean`
//! state; any mutation moves the cache back to `Dirty`, destroying the pair
//! on the way so a rebuild never leaks the previous allocation.

use log::trace;

use super::{BatchStats, SubmitMode};
use crate::render::{
    BatchVertex, BufferHandle, BufferUsage, GraphicsDevice, IndexedDraw, PrimitiveTopology,
    RenderResult, UserIndexedDraw,
};

/// Observable state of a batch's cached buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No valid device buffers; the next cached render rebuilds them
    Dirty,
    /// Device buffers match the batch contents
    Clean,
}

#[derive(Debug)]
pub(crate) struct CachedBuffers {
    vertex: BufferHandle,
    index: BufferHandle,
    index_count: u32,
    primitive_count: u32,
}

#[derive(Debug, Default)]
pub(crate) enum BufferCache {
    #[default]
    Dirty,
    Clean(CachedBuffers),
}

impl BufferCache {
    pub fn state(&self) -> CacheState {
        match self {
            Self::Dirty => CacheState::Dirty,
            Self::Clean(_) => CacheState::Clean,
        }
    }

    /// Mark stale and release the buffer pair if one is held
    pub fn invalidate(&mut self, device: &dyn GraphicsDevice) {
        if let Self::Clean(buffers) = std::mem::take(self) {
            trace!("Releasing cached buffers {:?} / {:?}", buffers.vertex, buffers.index);
            device.destroy_buffer(buffers.vertex);
            device.destroy_buffer(buffers.index);
        }
    }

    /// Upload the contents into a fresh exactly-sized buffer pair
    fn rebuild(
        &mut self,
        device: &dyn GraphicsDevice,
        vertices: &[u8],
        indices: &[u16],
        primitive_count: u32,
    ) -> RenderResult<()> {
        self.invalidate(device);

        let vertex = device.create_buffer_init(BufferUsage::VERTEX, vertices)?;
        let index = match device.create_buffer_init(BufferUsage::INDEX, bytemuck::cast_slice(indices)) {
            Ok(index) => index,
            Err(e) => {
                device.destroy_buffer(vertex);
                return Err(e);
            }
        };

        trace!(
            "Rebuilt cached buffers: {} vertex bytes, {} indices",
            vertices.len(),
            indices.len()
        );
        *self = Self::Clean(CachedBuffers {
            vertex,
            index,
            index_count: indices.len() as u32,
            primitive_count,
        });
        Ok(())
    }
}

/// Live contents of a batch ready for submission
pub(crate) struct Submission<'a, V> {
    pub topology: PrimitiveTopology,
    pub vertices: &'a [V],
    pub indices: &'a [u16],
    pub primitive_count: usize,
}

/// Draw a batch's contents through the selected path
///
/// Nothing is drawn when the batch holds no primitives.
pub(crate) fn submit<V: BatchVertex>(
    device: &dyn GraphicsDevice,
    mode: SubmitMode,
    cache: &mut BufferCache,
    submission: Submission<'_, V>,
) -> RenderResult<BatchStats> {
    if submission.primitive_count == 0 {
        return Ok(BatchStats::default());
    }

    let mut stats = BatchStats {
        draw_calls: 1,
        primitives: submission.primitive_count,
        ..BatchStats::default()
    };

    match mode {
        SubmitMode::Immediate => {
            device.draw_user_indexed(&UserIndexedDraw {
                topology: submission.topology,
                layout: &V::LAYOUT,
                vertices: bytemuck::cast_slice(submission.vertices),
                indices: submission.indices,
                primitive_count: submission.primitive_count as u32,
            })?;
            stats.vertices_uploaded = submission.vertices.len();
        }
        SubmitMode::Cached => {
            if cache.state() == CacheState::Dirty {
                cache.rebuild(
                    device,
                    bytemuck::cast_slice(submission.vertices),
                    submission.indices,
                    submission.primitive_count as u32,
                )?;
                stats.vertices_uploaded = submission.vertices.len();
                stats.buffers_rebuilt = 1;
            }
            if let BufferCache::Clean(buffers) = cache {
                device.draw_indexed(&IndexedDraw {
                    topology: submission.topology,
                    layout: &V::LAYOUT,
                    vertex_buffer: buffers.vertex,
                    index_buffer: buffers.index,
                    index_count: buffers.index_count,
                    primitive_count: buffers.primitive_count,
                })?;
            }
        }
    }

    trace!(
        "Drew {} primitives ({:?}, {:?})",
        submission.primitive_count,
        submission.topology,
        mode
    );
    Ok(stats)
}
