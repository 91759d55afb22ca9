//! Pairs of levels packed into one index buffer
//!
//! Levels are baked two at a time. The first pass snapshots the live
//! triangles; collapses until the second pass mark every snapshot triangle
//! they touch. The second pass writes one buffer per submesh laid out as
//! `[prev-only | shared | cur-only]`, where the previous level reads the
//! first two parts and the current level the last two.

use crate::data::LodData;
use crate::output::*;
use crate::output_buffer::LodOutputProviderBuffer;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
struct TriangleCache {
    vertex_ids: [u32; 3],
    submesh_id: usize,
    /// Removed or changed since the first pass.
    vertex_changed: bool,
}

#[derive(Debug)]
pub struct LodOutputProviderCompressedBuffer {
    fallback: LodOutputProviderBuffer,
    triangle_cache: Vec<TriangleCache>,
    first_buffer_pass: bool,
    last_index_buffer_id: usize,
}

impl Default for LodOutputProviderCompressedBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LodOutputProviderCompressedBuffer {
    pub fn new() -> Self {
        Self {
            fallback: LodOutputProviderBuffer::new(),
            triangle_cache: Vec::new(),
            first_buffer_pass: true,
            last_index_buffer_id: 0,
        }
    }

    fn bake_first_pass(&mut self, data: &mut LodData, lod_index: usize) {
        assert_eq!(self.triangle_cache.len(), data.triangle_list.len());
        self.last_index_buffer_id = lod_index;

        for info in &mut data.index_buffer_info_list {
            info.prev_index_count = info.index_count;
            info.prev_only_index_count = 0;
        }

        for (cache, tri) in self.triangle_cache.iter_mut().zip(&data.triangle_list) {
            cache.vertex_changed = false;
            if !tri.is_removed() {
                cache.vertex_ids = tri.vertex_ids;
                cache.submesh_id = tri.submesh_id;
            }
        }
    }

    fn bake_second_pass(&mut self, data: &mut LodData, lod_index: usize) {
        assert_eq!(self.triangle_cache.len(), data.triangle_list.len());
        assert!(
            lod_index > self.last_index_buffer_id,
            "compressed LOD levels must be baked in increasing order ({} after {})",
            lod_index,
            self.last_index_buffer_id
        );

        // Buffer sizes
        let sizes: Vec<usize> = data
            .index_buffer_info_list
            .iter()
            .map(|info| {
                assert!(info.prev_index_count >= info.index_count);
                assert!(info.prev_index_count >= info.prev_only_index_count);
                (info.index_count + info.prev_only_index_count).max(3)
            })
            .collect();
        let mut writers: Vec<IndexWriter> = data
            .index_buffer_info_list
            .iter()
            .zip(&sizes)
            .map(|(info, &size)| IndexWriter::new(info.index_size, size))
            .collect();

        // 1. Previous level only.
        for cache in self.triangle_cache.iter().filter(|c| c.vertex_changed) {
            debug_assert!(data.index_buffer_info_list[cache.submesh_id].prev_index_count != 0);
            writers[cache.submesh_id].push_triangle(cache.vertex_ids);
        }
        // 2. Shared by both levels.
        for (cache, tri) in self.triangle_cache.iter().zip(&data.triangle_list) {
            if !tri.is_removed() && !cache.vertex_changed {
                debug_assert_eq!(cache.vertex_ids, tri.vertex_ids);
                writers[tri.submesh_id].push_triangle(tri.vertex_ids);
            }
        }
        // 3. Current level only.
        for (cache, tri) in self.triangle_cache.iter().zip(&data.triangle_list) {
            if !tri.is_removed() && cache.vertex_changed {
                writers[tri.submesh_id].push_triangle(tri.vertex_ids);
            }
        }

        let output = self.fallback.buffer_mut();
        for (i, (writer, size)) in writers.into_iter().zip(sizes).enumerate() {
            let info = &data.index_buffer_info_list[i];
            let index_buffer = Arc::new(writer.finish());
            let prev_lod = LodIndexBuffer {
                index_size: info.index_size,
                index_start: 0,
                index_count: info.prev_index_count.max(3),
                index_buffer_size: size,
                index_buffer: index_buffer.clone(),
            };
            let mut cur_lod = LodIndexBuffer {
                index_size: info.index_size,
                index_start: size - info.index_count,
                index_count: info.index_count,
                index_buffer_size: size,
                index_buffer,
            };
            if cur_lod.index_count == 0 {
                cur_lod.index_start -= 3;
                cur_lod.index_count = 3;
            }
            let lods = &mut output.submesh[i].gen_index_buffers;
            lods.insert(self.last_index_buffer_id, prev_lod);
            lods.insert(lod_index, cur_lod);
        }
    }
}

impl LodOutputProvider for LodOutputProviderCompressedBuffer {
    fn prepare(&mut self, data: &LodData) {
        self.first_buffer_pass = true;
        self.triangle_cache
            .resize(data.triangle_list.len(), TriangleCache::default());
        self.fallback.prepare(data);
    }

    fn bake_lod_level(&mut self, data: &mut LodData, lod_index: usize) {
        if self.first_buffer_pass {
            self.bake_first_pass(data, lod_index);
        } else {
            self.bake_second_pass(data, lod_index);
        }
        self.first_buffer_pass = !self.first_buffer_pass;
    }

    fn finalize(&mut self, data: &mut LodData) {
        if !self.first_buffer_pass {
            // Odd number of levels: the last one is baked on its own.
            log::debug!(
                "Baking unpaired LOD level {} of {} as an independent buffer",
                self.last_index_buffer_id,
                data.mesh_name
            );
            self.fallback.bake_lod_level(data, self.last_index_buffer_id);
            self.first_buffer_pass = true;
        }
        self.fallback.finalize(data);
    }

    fn triangle_removed(&mut self, data: &mut LodData, ti: usize) {
        self.triangle_changed(data, ti);
    }

    fn triangle_changed(&mut self, data: &mut LodData, ti: usize) {
        let tri = &data.triangle_list[ti];
        assert!(!tri.is_removed(), "triangle {} changed after removal", ti);
        let cache = &mut self.triangle_cache[ti];
        if !cache.vertex_changed {
            cache.vertex_changed = true;
            data.index_buffer_info_list[tri.submesh_id].prev_only_index_count += 3;
        }
    }

    fn buffer(&self) -> &LodOutputBuffer {
        self.fallback.buffer()
    }

    fn into_buffer(self: Box<Self>) -> LodOutputBuffer {
        Box::new(self.fallback).into_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::LodInputProvider;
    use meshlod_core::{Point3f, SourceMesh, TriangleMesh};

    fn quad_data() -> LodData {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        );
        let mut data = LodData::new();
        LodInputProvider::new(&SourceMesh::from_triangle_mesh(&mesh))
            .init_data(&mut data)
            .unwrap();
        data
    }

    fn bake(output: &mut LodOutputProviderCompressedBuffer, data: &mut LodData, lod: usize) {
        output.bake_lod_level(data, lod);
    }

    #[test]
    fn test_unchanged_levels_share_everything() {
        let mut data = quad_data();
        let mut output = LodOutputProviderCompressedBuffer::new();
        output.prepare(&data);
        bake(&mut output, &mut data, 0);
        bake(&mut output, &mut data, 1);

        let prev = output.buffer().level(0, 0).unwrap();
        let cur = output.buffer().level(0, 1).unwrap();
        assert!(prev.shares_buffer_with(cur));
        assert_eq!(prev.index_buffer_size, 6);
        assert_eq!((prev.index_start, prev.index_count), (0, 6));
        assert_eq!((cur.index_start, cur.index_count), (0, 6));
        assert_eq!(prev.range_bytes(), cur.range_bytes());
    }

    #[test]
    fn test_layout_of_changed_and_removed_triangles() {
        let mut data = quad_data();
        let mut output = LodOutputProviderCompressedBuffer::new();
        output.prepare(&data);
        bake(&mut output, &mut data, 0);

        // Remove triangle 1 and move a corner of triangle 0.
        output.triangle_removed(&mut data, 1);
        data.triangle_list[1].set_removed();
        data.index_buffer_info_list[0].index_count -= 3;
        output.triangle_changed(&mut data, 0);
        output.triangle_changed(&mut data, 0);
        data.triangle_list[0].vertex_ids = [3, 1, 2];
        assert_eq!(data.index_buffer_info_list[0].prev_only_index_count, 6);
        bake(&mut output, &mut data, 1);

        let prev = output.buffer().level(0, 0).unwrap();
        let cur = output.buffer().level(0, 1).unwrap();
        assert_eq!(prev.index_buffer_size, 9);
        assert_eq!(prev.indices().collect::<Vec<_>>(), vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(cur.index_start, 6);
        assert_eq!(cur.indices().collect::<Vec<_>>(), vec![3, 1, 2]);
    }

    #[test]
    fn test_empty_current_level_uses_dummy() {
        let mut data = quad_data();
        let mut output = LodOutputProviderCompressedBuffer::new();
        output.prepare(&data);
        bake(&mut output, &mut data, 0);
        for ti in 0..2 {
            output.triangle_removed(&mut data, ti);
            data.triangle_list[ti].set_removed();
        }
        data.index_buffer_info_list[0].index_count = 0;
        bake(&mut output, &mut data, 1);

        let cur = output.buffer().level(0, 1).unwrap();
        assert_eq!((cur.index_start, cur.index_count), (3, 3));
        // Reads the tail of the previous level.
        assert_eq!(cur.indices().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn test_finalize_bakes_unpaired_level() {
        let mut data = quad_data();
        let mut output = LodOutputProviderCompressedBuffer::new();
        output.prepare(&data);
        bake(&mut output, &mut data, 0);
        bake(&mut output, &mut data, 1);
        bake(&mut output, &mut data, 2);
        assert_eq!(output.buffer().level_count(), 2);
        output.finalize(&mut data);
        assert_eq!(output.buffer().level_count(), 3);
        let last = output.buffer().level(0, 2).unwrap();
        assert_eq!(last.index_buffer_size, 0);
        assert_eq!(last.indices().collect::<Vec<_>>(), vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    #[should_panic]
    fn test_out_of_order_bake_panics() {
        let mut data = quad_data();
        let mut output = LodOutputProviderCompressedBuffer::new();
        output.prepare(&data);
        bake(&mut output, &mut data, 3);
        bake(&mut output, &mut data, 2);
    }
}
