//! Mesh data structures and functionality

use crate::index::*;
use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-instance vertex attributes of a submesh or of the shared buffer.
///
/// Several instances may share a position (UV seams, hard edges); the
/// generator merges them into one unique vertex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VertexBuffer {
    pub positions: Vec<Point3f>,
    pub normals: Option<Vec<Vector3f>>,
}

impl VertexBuffer {
    pub fn new(positions: Vec<Point3f>) -> Self {
        Self {
            positions,
            normals: None,
        }
    }

    pub fn with_normals(positions: Vec<Point3f>, normals: Vec<Vector3f>) -> Self {
        let normals = (normals.len() == positions.len()).then_some(normals);
        Self { positions, normals }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// A submesh: one index buffer over either its own or the shared vertices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubMesh {
    /// `None` means the submesh indexes the mesh's shared vertex buffer.
    pub vertex_buffer: Option<VertexBuffer>,
    pub index_buffer: IndexBuffer,
    pub operation: OperationType,
}

impl SubMesh {
    pub fn new(vertex_buffer: VertexBuffer, index_buffer: IndexBuffer) -> Self {
        Self {
            vertex_buffer: Some(vertex_buffer),
            index_buffer,
            operation: OperationType::TriangleList,
        }
    }

    pub fn shared(index_buffer: IndexBuffer) -> Self {
        Self {
            vertex_buffer: None,
            index_buffer,
            operation: OperationType::TriangleList,
        }
    }

    pub fn with_operation(mut self, operation: OperationType) -> Self {
        self.operation = operation;
        self
    }

    pub fn uses_shared_vertices(&self) -> bool {
        self.vertex_buffer.is_none()
    }

    /// Number of triangles the index buffer decodes to.
    pub fn triangle_count(&self) -> usize {
        let n = self.index_buffer.len();
        match self.operation {
            OperationType::TriangleList => n / 3,
            OperationType::TriangleStrip | OperationType::TriangleFan => n.saturating_sub(2),
        }
    }
}

/// Renderable source mesh handed to the LOD generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMesh {
    pub name: String,
    pub shared_vertices: Option<VertexBuffer>,
    pub submeshes: Vec<SubMesh>,
    pub bounding_sphere_radius: f32,
}

impl SourceMesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Single triangle-list submesh over the mesh's vertices.
    pub fn from_triangle_mesh(mesh: &TriangleMesh) -> Self {
        let vertex_buffer = match &mesh.normals {
            Some(normals) => VertexBuffer::with_normals(mesh.vertices.clone(), normals.clone()),
            None => VertexBuffer::new(mesh.vertices.clone()),
        };
        let indices: Vec<u32> = mesh
            .faces
            .iter()
            .flat_map(|f| f.iter().map(|&i| i as u32))
            .collect();
        let index_buffer = IndexBuffer::for_vertex_count(mesh.vertex_count(), &indices);
        let mut source = SourceMesh::new("mesh");
        source.submeshes.push(SubMesh::new(vertex_buffer, index_buffer));
        source.compute_bounding_sphere_radius();
        source
    }

    /// Vertex buffer indexed by submesh `i`.
    pub fn vertex_buffer(&self, i: usize) -> Option<&VertexBuffer> {
        let submesh = self.submeshes.get(i)?;
        submesh.vertex_buffer.as_ref().or(self.shared_vertices.as_ref())
    }

    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submeshes.iter().all(|s| s.index_buffer.is_empty())
    }

    /// Radius around the origin enclosing every vertex.
    pub fn compute_bounding_sphere_radius(&mut self) {
        let buffers = self
            .shared_vertices
            .iter()
            .chain(self.submeshes.iter().filter_map(|s| s.vertex_buffer.as_ref()));
        let mut radius_sq = 0.0f32;
        for buffer in buffers {
            for p in &buffer.positions {
                radius_sq = radius_sq.max(p.coords.norm_squared());
            }
        }
        self.bounding_sphere_radius = radius_sq.sqrt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_quad() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_from_triangle_mesh() {
        let source = SourceMesh::from_triangle_mesh(&make_quad());
        assert_eq!(source.submesh_count(), 1);
        let submesh = &source.submeshes[0];
        assert_eq!(submesh.index_buffer, IndexBuffer::U16(vec![0, 1, 2, 0, 2, 3]));
        assert_eq!(submesh.triangle_count(), 2);
        assert_eq!(source.vertex_buffer(0).unwrap().vertex_count(), 4);
        assert_relative_eq!(source.bounding_sphere_radius, 2.0f32.sqrt());
    }

    #[test]
    fn test_shared_vertex_lookup() {
        let mut source = SourceMesh::new("shared");
        source.shared_vertices = Some(VertexBuffer::new(make_quad().vertices));
        source.submeshes.push(SubMesh::shared(IndexBuffer::U16(vec![0, 1, 2])));
        assert!(source.submeshes[0].uses_shared_vertices());
        assert_eq!(source.vertex_buffer(0).unwrap().vertex_count(), 4);
        assert!(source.vertex_buffer(1).is_none());
    }

    #[test]
    fn test_strip_triangle_count() {
        let submesh = SubMesh::shared(IndexBuffer::U16(vec![0, 1, 2, 3, 4]))
            .with_operation(OperationType::TriangleStrip);
        assert_eq!(submesh.triangle_count(), 3);
    }

    #[test]
    fn test_mismatched_normals_dropped() {
        let vb = VertexBuffer::with_normals(make_quad().vertices, vec![Vector3f::z()]);
        assert!(vb.normals.is_none());
    }
}
