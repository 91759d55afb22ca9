//! Independent index buffer per level

use crate::data::LodData;
use crate::output::*;
use std::sync::Arc;

/// Bakes every level as a complete snapshot of the live triangles.
#[derive(Debug, Default)]
pub struct LodOutputProviderBuffer {
    buffer: LodOutputBuffer,
}

impl LodOutputProviderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut LodOutputBuffer {
        &mut self.buffer
    }
}

impl LodOutputProvider for LodOutputProviderBuffer {
    fn prepare(&mut self, data: &LodData) {
        self.buffer
            .submesh
            .resize_with(data.index_buffer_info_list.len(), Default::default);
    }

    fn bake_lod_level(&mut self, data: &mut LodData, lod_index: usize) {
        let mut writers: Vec<IndexWriter> = data
            .index_buffer_info_list
            .iter()
            .map(|info| IndexWriter::new(info.index_size, info.index_count.max(3)))
            .collect();

        for tri in data.triangle_list.iter().filter(|t| !t.is_removed()) {
            writers[tri.submesh_id].push_triangle(tri.vertex_ids);
        }

        for (i, writer) in writers.into_iter().enumerate() {
            let info = &data.index_buffer_info_list[i];
            debug_assert!(info.index_count == 0 || writer.position() == info.index_count);
            let lods = &mut self.buffer.submesh[i].gen_index_buffers;
            assert!(
                lod_index <= lods.len(),
                "LOD index {} is past the {} baked levels",
                lod_index,
                lods.len()
            );
            lods.insert(
                lod_index,
                LodIndexBuffer {
                    index_size: info.index_size,
                    index_start: 0,
                    // Empty levels get a zeroed dummy triangle.
                    index_count: info.index_count.max(3),
                    index_buffer_size: 0,
                    index_buffer: Arc::new(writer.finish()),
                },
            );
        }
    }

    fn buffer(&self) -> &LodOutputBuffer {
        &self.buffer
    }

    fn into_buffer(self: Box<Self>) -> LodOutputBuffer {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::LodInputProvider;
    use meshlod_core::{IndexBuffer, Point3f, SourceMesh, SubMesh, VertexBuffer};

    fn two_submesh_data() -> LodData {
        let vb = VertexBuffer::new(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ]);
        let mut mesh = SourceMesh::new("two");
        mesh.submeshes.push(SubMesh::new(vb.clone(), IndexBuffer::U16(vec![0, 1, 2, 0, 2, 3])));
        mesh.submeshes.push(SubMesh::new(vb, IndexBuffer::U32(vec![3, 2, 1])));
        let mut data = LodData::new();
        LodInputProvider::new(&mesh).init_data(&mut data).unwrap();
        data
    }

    #[test]
    fn test_bake_snapshots_live_triangles() {
        let mut data = two_submesh_data();
        let mut output = LodOutputProviderBuffer::new();
        output.prepare(&data);
        output.bake_lod_level(&mut data, 0);

        let lod = output.buffer().level(0, 0).unwrap();
        assert_eq!(lod.index_size, 2);
        assert_eq!(lod.indices().collect::<Vec<_>>(), vec![0, 1, 2, 0, 2, 3]);
        let lod = output.buffer().level(1, 0).unwrap();
        assert_eq!(lod.index_size, 4);
        assert_eq!(lod.indices().collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn test_empty_submesh_gets_dummy_triangle() {
        let mut data = two_submesh_data();
        let mut output = LodOutputProviderBuffer::new();
        output.prepare(&data);
        output.bake_lod_level(&mut data, 0);

        data.triangle_list[2].set_removed();
        data.index_buffer_info_list[1].index_count = 0;
        output.bake_lod_level(&mut data, 1);

        let lod = output.buffer().level(1, 1).unwrap();
        assert_eq!(lod.index_count, 3);
        assert_eq!(lod.indices().collect::<Vec<_>>(), vec![0, 0, 0]);
        assert_eq!(output.buffer().level_count(), 2);
        assert!(!lod.shares_buffer_with(output.buffer().level(1, 0).unwrap()));
    }
}
