//! Output side of LOD generation
//!
//! An output provider is notified of every triangle the collapser touches and
//! is asked to bake the current triangle list whenever a level is reached.

use crate::data::LodData;
use meshlod_core::IndexBuffer;
use std::sync::Arc;

/// One generated LOD level of one submesh.
///
/// Levels baked by the compressed provider come in pairs sharing the same
/// `index_buffer`; each level reads only its own range.
#[derive(Debug, Clone, PartialEq)]
pub struct LodIndexBuffer {
    /// 2 or 4 bytes.
    pub index_size: usize,
    pub index_start: usize,
    pub index_count: usize,
    /// Total indices in `index_buffer`; 0 means the same as `index_count`.
    pub index_buffer_size: usize,
    pub index_buffer: Arc<IndexBuffer>,
}

impl LodIndexBuffer {
    /// Indices of this level.
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        (self.index_start..self.index_start + self.index_count).map(|i| self.index_buffer.get(i))
    }

    /// Raw bytes of this level's range.
    pub fn range_bytes(&self) -> &[u8] {
        self.index_buffer.range_bytes(self.index_start, self.index_count)
    }

    pub fn shares_buffer_with(&self, other: &LodIndexBuffer) -> bool {
        Arc::ptr_eq(&self.index_buffer, &other.index_buffer)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LodOutputSubmesh {
    /// Generated levels ordered by LOD index.
    pub gen_index_buffers: Vec<LodIndexBuffer>,
}

/// Generated levels of every submesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LodOutputBuffer {
    pub submesh: Vec<LodOutputSubmesh>,
}

impl LodOutputBuffer {
    /// Number of levels baked so far (the same for every submesh).
    pub fn level_count(&self) -> usize {
        self.submesh
            .first()
            .map_or(0, |s| s.gen_index_buffers.len())
    }

    pub fn level(&self, submesh: usize, lod_index: usize) -> Option<&LodIndexBuffer> {
        self.submesh.get(submesh)?.gen_index_buffers.get(lod_index)
    }
}

/// Receiver of collapse notifications and level bakes.
pub trait LodOutputProvider {
    /// Called once after the input is loaded, before any collapse.
    fn prepare(&mut self, data: &LodData);

    /// Bake the current triangle list as level `lod_index`.
    fn bake_lod_level(&mut self, data: &mut LodData, lod_index: usize);

    /// Called after the last level.
    fn finalize(&mut self, _data: &mut LodData) {}

    /// Triangle `ti` is about to be removed.
    fn triangle_removed(&mut self, _data: &mut LodData, _ti: usize) {}

    /// A vertex instance of triangle `ti` was replaced.
    fn triangle_changed(&mut self, _data: &mut LodData, _ti: usize) {}

    fn buffer(&self) -> &LodOutputBuffer;

    fn into_buffer(self: Box<Self>) -> LodOutputBuffer;
}

/// Sequential writer into a fixed-width index buffer.
///
/// Values are narrowed to the buffer width with `as`; the width must have been
/// chosen from the vertex count of the submesh.
#[derive(Debug)]
pub struct IndexWriter {
    buffer: IndexBuffer,
    cursor: usize,
}

impl IndexWriter {
    /// Zero-filled destination of `len` indices.
    pub fn new(index_size: usize, len: usize) -> Self {
        Self {
            buffer: IndexBuffer::zeroed(index_size, len),
            cursor: 0,
        }
    }

    pub fn push(&mut self, index: u32) {
        match &mut self.buffer {
            IndexBuffer::U16(v) => v[self.cursor] = index as u16,
            IndexBuffer::U32(v) => v[self.cursor] = index,
        }
        self.cursor += 1;
    }

    pub fn push_triangle(&mut self, ids: [u32; 3]) {
        for id in ids {
            self.push(id);
        }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn finish(self) -> IndexBuffer {
        self.buffer
    }
}
