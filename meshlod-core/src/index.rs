//! Index buffer storage with a fixed 16- or 32-bit element width

use serde::{Deserialize, Serialize};

/// Indexed primitive topology of a submesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OperationType {
    /// (0,1,2),(3,4,5),(6,7,8),...
    #[default]
    TriangleList,
    /// (0,1,2),(2,1,3),(2,3,4),...
    TriangleStrip,
    /// (0,1,2),(0,2,3),(0,3,4),...
    TriangleFan,
}

/// Index data of a single submesh or LOD level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Largest vertex count addressable with 16-bit indices.
    pub const MAX_16BIT_VERTICES: usize = u16::MAX as usize + 1;

    /// Build an index buffer whose width fits `vertex_count` vertices.
    ///
    /// Indices are narrowed with `as`, so callers must not pass indices
    /// outside `0..vertex_count`.
    pub fn for_vertex_count(vertex_count: usize, indices: &[u32]) -> Self {
        if vertex_count <= Self::MAX_16BIT_VERTICES {
            IndexBuffer::U16(indices.iter().map(|&i| i as u16).collect())
        } else {
            IndexBuffer::U32(indices.to_vec())
        }
    }

    /// Zero-filled buffer of `count` indices with the given element size.
    pub fn zeroed(index_size: usize, count: usize) -> Self {
        match index_size {
            2 => IndexBuffer::U16(vec![0; count]),
            4 => IndexBuffer::U32(vec![0; count]),
            _ => panic!("unsupported index size {}", index_size),
        }
    }

    /// Size of one index in bytes (2 or 4).
    pub fn index_size(&self) -> usize {
        match self {
            IndexBuffer::U16(_) => 2,
            IndexBuffer::U32(_) => 4,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index at `i`, widened to `u32`.
    pub fn get(&self, i: usize) -> u32 {
        match self {
            IndexBuffer::U16(v) => v[i] as u32,
            IndexBuffer::U32(v) => v[i],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Raw bytes of the whole buffer.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexBuffer::U16(v) => bytemuck::cast_slice(v),
            IndexBuffer::U32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Raw bytes of the indices in `start..start + count`.
    pub fn range_bytes(&self, start: usize, count: usize) -> &[u8] {
        let size = self.index_size();
        &self.as_bytes()[start * size..(start + count) * size]
    }
}

impl Default for IndexBuffer {
    fn default() -> Self {
        IndexBuffer::U16(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_from_vertex_count() {
        let small = IndexBuffer::for_vertex_count(3, &[0, 1, 2]);
        assert_eq!(small.index_size(), 2);
        assert_eq!(small.as_bytes().len(), 6);

        let large = IndexBuffer::for_vertex_count(70_000, &[0, 1, 69_999]);
        assert_eq!(large.index_size(), 4);
        assert_eq!(large.get(2), 69_999);
    }

    #[test]
    fn test_16bit_boundary() {
        let buf = IndexBuffer::for_vertex_count(65_536, &[65_535]);
        assert_eq!(buf.index_size(), 2);
        assert_eq!(buf.get(0), 65_535);
    }

    #[test]
    fn test_range_bytes() {
        let buf = IndexBuffer::U16(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(buf.range_bytes(3, 3), bytemuck::cast_slice::<u16, u8>(&[4, 5, 6]));
    }

    #[test]
    fn test_zeroed() {
        let buf = IndexBuffer::zeroed(4, 3);
        assert_eq!(buf, IndexBuffer::U32(vec![0, 0, 0]));
    }
}
