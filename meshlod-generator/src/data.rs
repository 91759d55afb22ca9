//! Mesh adjacency model shared by every stage of LOD generation
//!
//! All containers are append-only: vertices, triangles and submesh records
//! are addressed by their index for the whole run, and removal only marks
//! them unused.

use priority_queue::PriorityQueue;
use std::cmp::Ordering;
use std::collections::HashMap;
use meshlod_core::{Point3f, PositionKey, Vector3f};

pub const INVALID: usize = usize::MAX;

/// Cost of a collapse that must never happen (triangle flip and similar).
pub const NEVER_COLLAPSE_COST: f32 = f32::MAX;

/// Cost of an edge that has not been evaluated yet.
pub const UNINITIALIZED_COLLAPSE_COST: f32 = f32::INFINITY;

// ============================================================
// Edge / Vertex / Triangle
// ============================================================

/// Directed edge from the owning vertex to `dst`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub dst: usize,
    pub collapse_cost: f32,
    /// Number of triangles using this edge. 1 means border edge.
    pub ref_count: u32,
}

impl Edge {
    pub fn new(dst: usize) -> Self {
        Self {
            dst,
            collapse_cost: UNINITIALIZED_COLLAPSE_COST,
            ref_count: 0,
        }
    }

    pub fn is_border(&self) -> bool {
        self.ref_count == 1
    }
}

/// Unique (position-deduplicated) vertex.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub position: Point3f,
    pub normal: Vector3f,
    pub edges: Vec<Edge>,
    pub triangles: Vec<usize>,
    pub collapse_to: usize,
    /// Shared by several vertex instances (UV seam, submesh boundary).
    pub seam: bool,
}

impl Vertex {
    pub fn new(position: Point3f) -> Self {
        Self {
            position,
            normal: Vector3f::zeros(),
            edges: Vec::new(),
            triangles: Vec::new(),
            collapse_to: INVALID,
            seam: false,
        }
    }

    pub fn is_unused(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn find_edge(&self, dst: usize) -> Option<usize> {
        self.edges.iter().position(|e| e.dst == dst)
    }

    pub fn has_edge(&self, dst: usize) -> bool {
        self.find_edge(dst).is_some()
    }

    /// Reference the edge to `dst` once more, creating it if needed.
    pub fn add_edge(&mut self, dst: usize) {
        match self.find_edge(dst) {
            Some(i) => self.edges[i].ref_count += 1,
            None => {
                let mut edge = Edge::new(dst);
                edge.ref_count = 1;
                self.edges.push(edge);
            }
        }
    }

    /// Drop one reference of the edge to `dst`; the edge goes away at zero.
    pub fn remove_edge(&mut self, dst: usize) {
        let i = self
            .find_edge(dst)
            .unwrap_or_else(|| panic!("removing missing edge to vertex {}", dst));
        if self.edges[i].ref_count <= 1 {
            self.edges.swap_remove(i);
        } else {
            self.edges[i].ref_count -= 1;
        }
    }

    pub fn add_triangle(&mut self, ti: usize) {
        if !self.triangles.contains(&ti) {
            self.triangles.push(ti);
        }
    }

    pub fn remove_triangle(&mut self, ti: usize) {
        let i = self
            .triangles
            .iter()
            .position(|&t| t == ti)
            .unwrap_or_else(|| panic!("removing missing triangle {}", ti));
        self.triangles.swap_remove(i);
    }
}

#[derive(Debug, Clone)]
pub struct Triangle {
    /// Unique vertex indices.
    pub vertices: [usize; 3],
    /// Vertex instance indices written to the submesh index buffer.
    pub vertex_ids: [u32; 3],
    pub normal: Vector3f,
    pub submesh_id: usize,
    pub removed: bool,
}

impl Triangle {
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn set_removed(&mut self) {
        self.removed = true;
    }

    pub fn has_vertex(&self, vi: usize) -> bool {
        self.vertices.contains(&vi)
    }

    /// Instance index used by this triangle for unique vertex `vi`.
    pub fn vertex_id(&self, vi: usize) -> u32 {
        let slot = self
            .vertices
            .iter()
            .position(|&v| v == vi)
            .unwrap_or_else(|| panic!("vertex {} is not part of the triangle", vi));
        self.vertex_ids[slot]
    }

    /// Two corners share a unique vertex.
    pub fn is_degenerate(&self) -> bool {
        let [a, b, c] = self.vertices;
        a == b || b == c || c == a
    }

    pub fn compute_normal(&mut self, vertex_list: &[Vertex]) {
        let p0 = vertex_list[self.vertices[0]].position;
        let p1 = vertex_list[self.vertices[1]].position;
        let p2 = vertex_list[self.vertices[2]].position;
        self.normal = face_normal(&p0, &p1, &p2);
    }
}

/// Unit normal of the triangle `(p0, p1, p2)`, zero when degenerate.
pub fn face_normal(p0: &Point3f, p1: &Point3f, p2: &Point3f) -> Vector3f {
    (p1 - p0)
        .cross(&(p2 - p1))
        .try_normalize(f32::EPSILON * f32::EPSILON)
        .unwrap_or_else(Vector3f::zeros)
}

/// Per-submesh index bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexBufferInfo {
    /// 2 or 4 bytes, fixed for the run.
    pub index_size: usize,
    /// Indices alive at the current collapse state.
    pub index_count: usize,
    /// Index count at the last first-pass bake (compressed output).
    pub prev_index_count: usize,
    /// Indices only present in the previous level (compressed output).
    pub prev_only_index_count: usize,
}

// ============================================================
// Collapse cost heap
// ============================================================

#[derive(Debug, Clone, Copy)]
struct HeapKey {
    cost: f32,
    vertex: usize,
}

impl PartialEq for HeapKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for HeapKey {}

impl PartialOrd for HeapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smallest (cost, vertex) first
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

/// Vertices ordered by their cheapest collapse, ties broken by vertex index.
///
/// The vertex index is the handle of its entry. Keys are replaced by
/// erase + insert only.
#[derive(Debug, Clone, Default)]
pub struct CollapseCostHeap {
    queue: PriorityQueue<usize, HeapKey>,
}

impl CollapseCostHeap {
    pub fn new() -> Self {
        Self {
            queue: PriorityQueue::new(),
        }
    }

    pub fn insert(&mut self, vertex: usize, cost: f32) {
        let previous = self.queue.push(vertex, HeapKey { cost, vertex });
        assert!(previous.is_none(), "vertex {} already has a heap entry", vertex);
    }

    pub fn erase(&mut self, vertex: usize) -> Option<f32> {
        self.queue.remove(&vertex).map(|(_, key)| key.cost)
    }

    /// Cheapest `(vertex, cost)`.
    pub fn peek_min(&self) -> Option<(usize, f32)> {
        self.queue.peek().map(|(&v, key)| (v, key.cost))
    }

    pub fn cost_of(&self, vertex: usize) -> Option<f32> {
        self.queue.get_priority(&vertex).map(|key| key.cost)
    }

    pub fn contains(&self, vertex: usize) -> bool {
        self.queue.get(&vertex).is_some()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Entries in ascending `(cost, vertex)` order.
    pub fn sorted(&self) -> Vec<(usize, f32)> {
        let mut entries: Vec<HeapKey> = self.queue.iter().map(|(_, &k)| k).collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries.into_iter().map(|k| (k.vertex, k.cost)).collect()
    }
}

// ============================================================
// LodData
// ============================================================

/// Working state of one LOD generation run.
#[derive(Debug, Clone, Default)]
pub struct LodData {
    pub mesh_name: String,
    pub vertex_list: Vec<Vertex>,
    pub triangle_list: Vec<Triangle>,
    pub index_buffer_info_list: Vec<IndexBufferInfo>,
    pub collapse_cost_heap: CollapseCostHeap,
    /// Position based lookup. Position is the real identity of a vertex.
    pub unique_vertex_lookup: HashMap<PositionKey, usize>,
    pub use_vertex_normals: bool,
}

impl LodData {
    pub fn new() -> Self {
        Self {
            use_vertex_normals: true,
            ..Default::default()
        }
    }

    pub fn find_unique_vertex_by_pos(&self, pos: &Point3f) -> Option<usize> {
        self.unique_vertex_lookup.get(&PositionKey::new(pos)).copied()
    }

    /// Triangles not removed so far.
    pub fn active_triangle_count(&self) -> usize {
        self.triangle_list.iter().filter(|t| !t.is_removed()).count()
    }

    /// Vertex instance triples of the live triangles of `submesh`.
    pub fn active_triangles(&self, submesh: usize) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.triangle_list
            .iter()
            .filter(move |t| !t.is_removed() && t.submesh_id == submesh)
            .map(|t| t.vertex_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_ref_counting() {
        let mut v = Vertex::new(Point3f::origin());
        v.add_edge(3);
        v.add_edge(3);
        v.add_edge(5);
        assert_eq!(v.edges.len(), 2);
        assert_eq!(v.edges[0].ref_count, 2);
        assert!(!v.edges[0].is_border());
        assert!(v.edges[1].is_border());

        v.remove_edge(3);
        assert_eq!(v.edges[0].ref_count, 1);
        v.remove_edge(3);
        assert!(!v.has_edge(3));
        assert_eq!(v.edges.len(), 1);
        assert_eq!(v.edges[0].dst, 5);
    }

    #[test]
    #[should_panic]
    fn test_remove_missing_edge_panics() {
        let mut v = Vertex::new(Point3f::origin());
        v.remove_edge(1);
    }

    #[test]
    fn test_heap_orders_by_cost_then_vertex() {
        let mut heap = CollapseCostHeap::new();
        heap.insert(4, 0.5);
        heap.insert(1, 0.5);
        heap.insert(7, 0.1);
        heap.insert(2, NEVER_COLLAPSE_COST);
        assert_eq!(heap.peek_min(), Some((7, 0.1)));
        assert_eq!(heap.erase(7), Some(0.1));
        assert_eq!(heap.peek_min(), Some((1, 0.5)));
        assert_eq!(
            heap.sorted(),
            vec![(1, 0.5), (4, 0.5), (2, NEVER_COLLAPSE_COST)]
        );
        assert_eq!(heap.cost_of(4), Some(0.5));
        assert!(!heap.contains(7));
        assert_eq!(heap.len(), 3);
    }

    #[test]
    #[should_panic]
    fn test_heap_rejects_second_entry() {
        let mut heap = CollapseCostHeap::new();
        heap.insert(1, 0.5);
        heap.insert(1, 0.25);
    }

    #[test]
    fn test_triangle_queries() {
        let tri = Triangle {
            vertices: [2, 5, 9],
            vertex_ids: [20, 50, 90],
            normal: Vector3f::z(),
            submesh_id: 0,
            removed: false,
        };
        assert!(tri.has_vertex(5));
        assert!(!tri.has_vertex(3));
        assert_eq!(tri.vertex_id(9), 90);
        assert!(!tri.is_degenerate());
    }

    #[test]
    fn test_face_normal_degenerate_is_zero() {
        let p = Point3f::new(1.0, 1.0, 1.0);
        assert_eq!(face_normal(&p, &p, &p), Vector3f::zeros());
        let n = face_normal(
            &Point3f::new(0.0, 0.0, 0.0),
            &Point3f::new(1.0, 0.0, 0.0),
            &Point3f::new(0.0, 1.0, 0.0),
        );
        assert_eq!(n, Vector3f::z());
    }
}
