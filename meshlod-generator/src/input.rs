//! Builds a [`LodData`] from a [`SourceMesh`]

use crate::data::*;
use meshlod_core::{Error, IndexBuffer, OperationType, PositionKey, Result, SourceMesh, VertexBuffer};
use std::collections::hash_map::Entry;

/// Loads vertices and index data of a source mesh into the adjacency model.
pub struct LodInputProvider<'a> {
    mesh: &'a SourceMesh,
    /// Instance index -> unique vertex, for the shared vertex buffer.
    shared_vertex_lookup: Vec<usize>,
    /// Instance index -> unique vertex, for the current submesh buffer.
    vertex_lookup: Vec<usize>,
}

impl<'a> LodInputProvider<'a> {
    pub fn new(mesh: &'a SourceMesh) -> Self {
        Self {
            mesh,
            shared_vertex_lookup: Vec::new(),
            vertex_lookup: Vec::new(),
        }
    }

    pub fn init_data(mut self, data: &mut LodData) -> Result<()> {
        if self.mesh.submeshes.is_empty() {
            return Err(Error::InvalidData(format!(
                "mesh '{}' has no submeshes",
                self.mesh.name
            )));
        }
        self.tune_container_size(data);
        self.initialize(data)
    }

    fn tune_container_size(&mut self, data: &mut LodData) {
        let mut shared_vertices_added = false;
        let mut triangle_count = 0;
        let mut vertex_count = 0;
        let mut vertex_lookup_size = 0;
        let mut shared_vertex_lookup_size = 0;
        for submesh in &self.mesh.submeshes {
            triangle_count += submesh.triangle_count();
            match &submesh.vertex_buffer {
                Some(vb) => {
                    vertex_lookup_size = vertex_lookup_size.max(vb.vertex_count());
                    vertex_count += vb.vertex_count();
                }
                None if !shared_vertices_added => {
                    shared_vertices_added = true;
                    shared_vertex_lookup_size = self
                        .mesh
                        .shared_vertices
                        .as_ref()
                        .map_or(0, VertexBuffer::vertex_count);
                    vertex_count += shared_vertex_lookup_size;
                }
                None => {}
            }
        }

        data.unique_vertex_lookup.reserve(vertex_count);
        data.triangle_list.reserve(triangle_count);
        data.vertex_list.reserve(vertex_count);
        self.shared_vertex_lookup.reserve(shared_vertex_lookup_size);
        self.vertex_lookup.reserve(vertex_lookup_size);
        data.index_buffer_info_list = vec![IndexBufferInfo::default(); self.mesh.submeshes.len()];
    }

    fn initialize(&mut self, data: &mut LodData) -> Result<()> {
        data.mesh_name = self.mesh.name.clone();
        let mesh = self.mesh;
        for (i, submesh) in mesh.submeshes.iter().enumerate() {
            let shared = submesh.uses_shared_vertices();
            let vertex_buffer = match &submesh.vertex_buffer {
                Some(vb) => vb,
                None => mesh.shared_vertices.as_ref().ok_or_else(|| {
                    Error::InvalidData(format!(
                        "submesh {} of '{}' uses shared vertices, but the mesh has none",
                        i, mesh.name
                    ))
                })?,
            };
            self.add_vertex_data(data, vertex_buffer, shared, i)?;
            self.add_index_data(data, &submesh.index_buffer, shared, i, submesh.operation)?;
        }
        Ok(())
    }

    fn add_vertex_data(
        &mut self,
        data: &mut LodData,
        vertex_buffer: &VertexBuffer,
        shared: bool,
        submesh_id: usize,
    ) -> Result<()> {
        if shared && !self.shared_vertex_lookup.is_empty() {
            // Shared vertex buffer is already loaded.
            return Ok(());
        }
        let normals = vertex_buffer.normals.as_deref();
        if let Some(normals) = normals.filter(|n| n.len() != vertex_buffer.positions.len()) {
            return Err(Error::InvalidData(format!(
                "vertex buffer of submesh {} has {} normals for {} positions",
                submesh_id,
                normals.len(),
                vertex_buffer.positions.len()
            )));
        }

        let lookup = if shared {
            &mut self.shared_vertex_lookup
        } else {
            &mut self.vertex_lookup
        };
        lookup.clear();

        data.use_vertex_normals = data.use_vertex_normals && normals.is_some();

        for (n, position) in vertex_buffer.positions.iter().enumerate() {
            let normal = normals.map(|normals| normals[n]);
            let vi = match data.unique_vertex_lookup.entry(PositionKey::new(position)) {
                Entry::Occupied(entry) => {
                    let vi = *entry.get();
                    let v = &mut data.vertex_list[vi];
                    v.seam = true;
                    if let Some(normal) = normal.filter(|_| data.use_vertex_normals) {
                        if v.normal.x != normal.x {
                            v.normal += normal;
                            v.normal = v.normal.try_normalize(0.0).unwrap_or_else(|| {
                                meshlod_core::Vector3f::x()
                            });
                        }
                    }
                    vi
                }
                Entry::Vacant(entry) => {
                    let vi = data.vertex_list.len();
                    entry.insert(vi);
                    let mut v = Vertex::new(*position);
                    if let Some(normal) = normal.filter(|_| data.use_vertex_normals) {
                        v.normal = normal.try_normalize(0.0).unwrap_or(normal);
                    }
                    data.vertex_list.push(v);
                    vi
                }
            };
            lookup.push(vi);
        }
        Ok(())
    }

    fn add_index_data(
        &mut self,
        data: &mut LodData,
        index_buffer: &IndexBuffer,
        shared: bool,
        submesh_id: usize,
        op: OperationType,
    ) -> Result<()> {
        let num_indices = index_buffer.len();
        data.index_buffer_info_list[submesh_id] = IndexBufferInfo {
            index_size: index_buffer.index_size(),
            index_count: num_indices,
            ..Default::default()
        };

        let lookup = if shared {
            std::mem::take(&mut self.shared_vertex_lookup)
        } else {
            std::mem::take(&mut self.vertex_lookup)
        };
        if let Some(bad) = index_buffer.iter().find(|&i| i as usize >= lookup.len()) {
            return Err(Error::InvalidData(format!(
                "submesh {} references vertex {} of {}",
                submesh_id,
                bad,
                lookup.len()
            )));
        }

        let idx = |i: usize| index_buffer.get(i);
        match op {
            OperationType::TriangleList => {
                // List count excludes a trailing partial triangle.
                data.index_buffer_info_list[submesh_id].index_count = num_indices / 3 * 3;
                let mut i0 = 0;
                while i0 + 2 < num_indices {
                    add_triangle(data, [idx(i0), idx(i0 + 1), idx(i0 + 2)], &lookup, submesh_id);
                    i0 += 3;
                }
            }
            OperationType::TriangleStrip => {
                // Strips and fans are baked back as triangle lists.
                data.index_buffer_info_list[submesh_id].index_count =
                    num_indices.saturating_sub(2) * 3;
                let (mut i0, mut i1) = (0, 1);
                for i2 in 2..num_indices {
                    add_triangle(data, [idx(i0), idx(i1), idx(i2)], &lookup, submesh_id);
                    if i2 & 1 == 1 {
                        i1 = i2;
                    } else {
                        i0 = i2;
                    }
                }
            }
            OperationType::TriangleFan => {
                data.index_buffer_info_list[submesh_id].index_count =
                    num_indices.saturating_sub(2) * 3;
                for i1 in 1..num_indices.saturating_sub(1) {
                    add_triangle(data, [idx(0), idx(i1), idx(i1 + 1)], &lookup, submesh_id);
                }
            }
        }

        if shared {
            self.shared_vertex_lookup = lookup;
        } else {
            self.vertex_lookup = lookup;
        }
        Ok(())
    }
}

/// Add one triangle given by vertex instance indices.
///
/// Malformed triangles stay in the list as removed so triangle indices keep
/// matching the source order.
pub fn add_triangle(data: &mut LodData, ids: [u32; 3], lookup: &[usize], submesh_id: usize) {
    let ti = data.triangle_list.len();
    let mut tri = Triangle {
        vertices: ids.map(|id| lookup[id as usize]),
        vertex_ids: ids,
        normal: meshlod_core::Vector3f::zeros(),
        submesh_id,
        removed: false,
    };

    if tri.is_degenerate() || is_duplicate_triangle(data, &tri) {
        log::debug!(
            "In {}, malformed triangle found with ID: {} (vertices {:?}). \
             It will be excluded from LOD level calculations.",
            data.mesh_name,
            ti,
            tri.vertex_ids
        );
        tri.set_removed();
        data.index_buffer_info_list[submesh_id].index_count -= 3;
        data.triangle_list.push(tri);
        return;
    }

    tri.compute_normal(&data.vertex_list);
    let vertices = tri.vertices;
    data.triangle_list.push(tri);
    for &vi in &vertices {
        data.vertex_list[vi].add_triangle(ti);
    }
    for i in 0..3 {
        for n in 0..3 {
            if i != n {
                data.vertex_list[vertices[i]].add_edge(vertices[n]);
            }
        }
    }
}

/// An existing live triangle already uses the same three unique vertices.
fn is_duplicate_triangle(data: &LodData, tri: &Triangle) -> bool {
    data.vertex_list[tri.vertices[0]].triangles.iter().any(|&t| {
        let other = &data.triangle_list[t];
        tri.vertices.iter().all(|&v| other.has_vertex(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlod_core::{Point3f, SubMesh, TriangleMesh, Vector3f};

    fn build(mesh: &SourceMesh) -> LodData {
        let mut data = LodData::new();
        LodInputProvider::new(mesh).init_data(&mut data).unwrap();
        data
    }

    fn quad_positions() -> Vec<Point3f> {
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_build_quad_adjacency() {
        let mesh = TriangleMesh::from_vertices_and_faces(quad_positions(), vec![[0, 1, 2], [0, 2, 3]]);
        let data = build(&SourceMesh::from_triangle_mesh(&mesh));

        assert_eq!(data.vertex_list.len(), 4);
        assert_eq!(data.triangle_list.len(), 2);
        assert_eq!(data.index_buffer_info_list[0].index_count, 6);
        assert_eq!(data.index_buffer_info_list[0].index_size, 2);

        // Diagonal 0-2 is shared by both triangles.
        let v0 = &data.vertex_list[0];
        assert_eq!(v0.edges.len(), 3);
        assert_eq!(v0.edges[v0.find_edge(2).unwrap()].ref_count, 2);
        assert_eq!(v0.edges[v0.find_edge(1).unwrap()].ref_count, 1);
        assert_eq!(v0.triangles, vec![0, 1]);
        assert!(!v0.seam);
    }

    #[test]
    fn test_duplicate_positions_merge_into_seam() {
        // Two triangles with their own copies of the shared edge.
        let mut positions = quad_positions();
        positions.push(Point3f::new(0.0, 0.0, 0.0));
        positions.push(Point3f::new(1.0, 1.0, 0.0));
        let vb = VertexBuffer::new(positions);
        let ib = IndexBuffer::U16(vec![0, 1, 2, 4, 5, 3]);
        let mut mesh = SourceMesh::new("seam");
        mesh.submeshes.push(SubMesh::new(vb, ib));
        let data = build(&mesh);

        assert_eq!(data.vertex_list.len(), 4);
        assert!(data.vertex_list[0].seam);
        assert!(data.vertex_list[2].seam);
        assert!(!data.vertex_list[1].seam);
        // Positions merged, instance ids kept.
        assert_eq!(data.triangle_list[1].vertices, [0, 2, 3]);
        assert_eq!(data.triangle_list[1].vertex_ids, [4, 5, 3]);
        assert_eq!(data.find_unique_vertex_by_pos(&Point3f::new(1.0, 1.0, 0.0)), Some(2));
        assert_eq!(data.find_unique_vertex_by_pos(&Point3f::new(5.0, 1.0, 0.0)), None);
    }

    #[test]
    fn test_malformed_triangles_are_excluded() {
        let vb = VertexBuffer::new(quad_positions());
        let ib = IndexBuffer::U32(vec![0, 1, 2, 0, 0, 3, 2, 0, 1]);
        let mut mesh = SourceMesh::new("bad");
        mesh.submeshes.push(SubMesh::new(vb, ib));
        let data = build(&mesh);

        assert_eq!(data.triangle_list.len(), 3);
        assert!(!data.triangle_list[0].is_removed());
        assert!(data.triangle_list[1].is_removed());
        assert!(data.triangle_list[2].is_removed());
        assert_eq!(data.index_buffer_info_list[0].index_count, 3);
        assert_eq!(data.index_buffer_info_list[0].index_size, 4);
        // Vertex 3 is only referenced by the degenerate triangle.
        assert!(data.vertex_list[3].is_unused());
    }

    #[test]
    fn test_strip_and_fan_decoding() {
        let vb = VertexBuffer::new(quad_positions());
        let mut mesh = SourceMesh::new("topologies");
        mesh.submeshes.push(
            SubMesh::new(vb.clone(), IndexBuffer::U16(vec![0, 1, 3, 2]))
                .with_operation(OperationType::TriangleStrip),
        );
        mesh.submeshes.push(
            SubMesh::new(vb, IndexBuffer::U16(vec![0, 1, 2, 3]))
                .with_operation(OperationType::TriangleFan),
        );
        let data = build(&mesh);

        let strip: Vec<[u32; 3]> = data.active_triangles(0).collect();
        assert_eq!(strip, vec![[0, 1, 3], [3, 1, 2]]);
        let fan: Vec<[u32; 3]> = data.active_triangles(1).collect();
        assert_eq!(fan, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(data.index_buffer_info_list[0].index_count, 6);
        assert_eq!(data.index_buffer_info_list[1].index_count, 6);
    }

    #[test]
    fn test_shared_vertex_buffer_loaded_once() {
        let mut mesh = SourceMesh::new("shared");
        mesh.shared_vertices = Some(VertexBuffer::new(quad_positions()));
        mesh.submeshes.push(SubMesh::shared(IndexBuffer::U16(vec![0, 1, 2])));
        mesh.submeshes.push(SubMesh::shared(IndexBuffer::U16(vec![0, 2, 3])));
        let data = build(&mesh);

        assert_eq!(data.vertex_list.len(), 4);
        assert!(data.vertex_list.iter().all(|v| !v.seam));
        assert_eq!(data.triangle_list[1].submesh_id, 1);
        assert_eq!(data.vertex_list[0].edges[data.vertex_list[0].find_edge(2).unwrap()].ref_count, 2);
    }

    #[test]
    fn test_missing_shared_buffer_is_error() {
        let mut mesh = SourceMesh::new("broken");
        mesh.submeshes.push(SubMesh::shared(IndexBuffer::U16(vec![0, 1, 2])));
        let mut data = LodData::new();
        assert!(LodInputProvider::new(&mesh).init_data(&mut data).is_err());
    }

    #[test]
    fn test_out_of_range_index_is_error() {
        let mut mesh = SourceMesh::new("broken");
        mesh.submeshes.push(SubMesh::new(
            VertexBuffer::new(quad_positions()),
            IndexBuffer::U16(vec![0, 1, 9]),
        ));
        let mut data = LodData::new();
        assert!(LodInputProvider::new(&mesh).init_data(&mut data).is_err());
    }

    #[test]
    fn test_short_normal_buffer_is_error() {
        let vb = VertexBuffer {
            positions: quad_positions(),
            normals: Some(vec![Vector3f::z()]),
        };
        let mut mesh = SourceMesh::new("short normals");
        mesh.submeshes.push(SubMesh::new(vb, IndexBuffer::U16(vec![0, 1, 2])));
        let mut data = LodData::new();
        let err = LodInputProvider::new(&mesh).init_data(&mut data).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_vertex_normals_merge_on_seam() {
        let mut positions = quad_positions();
        positions.push(Point3f::new(0.0, 0.0, 0.0));
        let normals = vec![
            Vector3f::x(),
            Vector3f::z(),
            Vector3f::z(),
            Vector3f::z(),
            Vector3f::y(),
        ];
        let mut mesh = SourceMesh::new("normals");
        mesh.submeshes.push(SubMesh::new(
            VertexBuffer::with_normals(positions, normals),
            IndexBuffer::U16(vec![0, 1, 2, 4, 2, 3]),
        ));
        let data = build(&mesh);
        assert!(data.use_vertex_normals);
        let n = data.vertex_list[0].normal;
        let expected = Vector3f::new(1.0, 1.0, 0.0).normalize();
        assert!((n - expected).norm() < 1e-6);
    }

    #[test]
    fn test_missing_normals_disable_vertex_normals() {
        let mesh = TriangleMesh::from_vertices_and_faces(quad_positions(), vec![[0, 1, 2]]);
        let data = build(&SourceMesh::from_triangle_mesh(&mesh));
        assert!(!data.use_vertex_normals);
    }
}
