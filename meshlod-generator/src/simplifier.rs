//! One-shot simplification of a [`TriangleMesh`]

use crate::config::{LodConfig, LodLevel};
use crate::generator::MeshLodGenerator;
use meshlod_core::{Error, Result, TriangleMesh};

/// Simplify a mesh by reducing the number of faces/vertices
pub trait MeshSimplifier {
    /// Simplify mesh with target reduction ratio (0.0 = no reduction, 1.0 = maximum reduction)
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh>;
}

/// Runs a single proportional LOD level and returns the surviving triangles
/// as a new mesh.
///
/// The ratio is the fraction of unique vertices to remove.
#[derive(Debug, Clone, Copy)]
pub struct ProgressiveMeshSimplifier {
    pub use_vertex_normals: bool,
}

impl Default for ProgressiveMeshSimplifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressiveMeshSimplifier {
    pub fn new() -> Self {
        Self {
            use_vertex_normals: true,
        }
    }
}

impl MeshSimplifier for ProgressiveMeshSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&reduction_ratio) {
            return Err(Error::InvalidData(
                "Reduction ratio must be between 0.0 and 1.0".to_string(),
            ));
        }
        if reduction_ratio == 0.0 {
            return Ok(mesh.clone());
        }

        let mut config = LodConfig::new(vec![LodLevel::proportional(1.0, reduction_ratio)])
            .with_compression(false);
        config.advanced.use_vertex_normals = self.use_vertex_normals;
        let source = meshlod_core::SourceMesh::from_triangle_mesh(mesh);
        let generation = MeshLodGenerator::new().generate_lod_levels(&source, &config)?;

        let Some(level) = generation.output.level(0, 0) else {
            // Nothing could be collapsed.
            return Ok(mesh.clone());
        };
        let indices: Vec<usize> = level.indices().map(|i| i as usize).collect();
        Ok(compact(mesh, &indices))
    }
}

/// Keep the referenced vertices of `mesh` and renumber `indices` to them.
/// Degenerate triangles (the empty level placeholder) are dropped.
fn compact(mesh: &TriangleMesh, indices: &[usize]) -> TriangleMesh {
    let mut remap = vec![usize::MAX; mesh.vertex_count()];
    let mut vertices = Vec::new();
    let mut normals = mesh.normals.as_ref().map(|_| Vec::new());
    let mut faces = Vec::with_capacity(indices.len() / 3);

    for tri in indices.chunks_exact(3) {
        if tri[0] == tri[1] || tri[1] == tri[2] || tri[2] == tri[0] {
            continue;
        }
        let mut face = [0usize; 3];
        for (slot, &vi) in face.iter_mut().zip(tri) {
            if remap[vi] == usize::MAX {
                remap[vi] = vertices.len();
                vertices.push(mesh.vertices[vi]);
                if let (Some(out), Some(src)) = (normals.as_mut(), mesh.normals.as_ref()) {
                    out.push(src[vi]);
                }
            }
            *slot = remap[vi];
        }
        faces.push(face);
    }

    let mut result = TriangleMesh::from_vertices_and_faces(vertices, faces);
    if let Some(normals) = normals {
        result.set_normals(normals);
    }
    result
}
