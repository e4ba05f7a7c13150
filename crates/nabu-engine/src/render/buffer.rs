//! Owners of the batch vertex buffer and the shared quad index buffer.
//!
//! Both wrappers release their backend storage explicitly through `release`.
//! Dropping an unreleased wrapper only logs a leak: the graphics context may
//! already be gone at that point, so `Drop` never calls into the backend.

use super::backend::{BackendError, BufferId, BufferKind, RenderBackend};
use super::vertex::QuadVertex;

/// Vertex buffer rewritten once per flushed batch.
#[derive(Debug)]
pub struct VertexBuffer {
    id: BufferId,
    capacity: usize,
    released: bool,
}

impl VertexBuffer {
    /// Allocates room for `capacity` vertices.
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        capacity: usize,
    ) -> Result<Self, BackendError> {
        let size = (capacity * QuadVertex::STRIDE) as u64;
        let id = backend.create_buffer(BufferKind::Vertex, size)?;
        Ok(Self {
            id,
            capacity,
            released: false,
        })
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Capacity in vertices.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Uploads `vertices` to the start of the buffer.
    pub fn write<B: RenderBackend + ?Sized>(&self, backend: &mut B, vertices: &[QuadVertex]) {
        debug_assert!(!self.released, "write to released vertex buffer");
        debug_assert!(
            vertices.len() <= self.capacity,
            "{} vertices exceed capacity {}",
            vertices.len(),
            self.capacity
        );
        let len = vertices.len().min(self.capacity);
        backend.write_buffer(self.id, 0, bytemuck::cast_slice(&vertices[..len]));
    }

    /// Releases the GPU storage. Idempotent.
    pub fn release<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.released {
            return;
        }
        backend.release_buffer(self.id);
        self.released = true;
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("vertex buffer {} dropped without release; GPU storage leaked", self.id);
        }
    }
}

/// Index buffer written once at creation and reused by every batch.
#[derive(Debug)]
pub struct IndexBuffer {
    id: BufferId,
    count: usize,
    released: bool,
}

impl IndexBuffer {
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        indices: &[u32],
    ) -> Result<Self, BackendError> {
        let size = std::mem::size_of_val(indices) as u64;
        let id = backend.create_buffer(BufferKind::Index, size)?;
        backend.write_buffer(id, 0, bytemuck::cast_slice(indices));
        Ok(Self {
            id,
            count: indices.len(),
            released: false,
        })
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Releases the GPU storage. Idempotent.
    pub fn release<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.released {
            return;
        }
        backend.release_buffer(self.id);
        self.released = true;
    }
}

impl Drop for IndexBuffer {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("index buffer {} dropped without release; GPU storage leaked", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::software::SoftwareBackend;
    use crate::render::vertex::quad_indices;

    #[test]
    fn index_buffer_uploads_once_at_creation() {
        let mut backend = SoftwareBackend::new();
        let mut ib = IndexBuffer::new(&mut backend, &quad_indices(2)).unwrap();
        assert_eq!(ib.count(), 12);
        assert_eq!(backend.buffer_writes(), 1);
        ib.release(&mut backend);
    }

    #[test]
    fn release_is_idempotent() {
        let mut backend = SoftwareBackend::new();
        let mut vb = VertexBuffer::new(&mut backend, 8).unwrap();
        assert_eq!(backend.live_buffers(), 1);
        vb.release(&mut backend);
        vb.release(&mut backend);
        assert_eq!(backend.live_buffers(), 0);
    }
}
