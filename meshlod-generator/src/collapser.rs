//! Edge collapse executor
//!
//! Repeatedly collapses the globally cheapest vertex into its chosen
//! neighbour and keeps the adjacency model, the index counts and the cost
//! heap consistent after every step.

use crate::collapse_cost::CollapseCost;
use crate::data::*;
use crate::output::LodOutputProvider;
use itertools::Itertools;

/// Instance pair of an edge that disappeared in the current collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CollapsedEdge {
    src_id: u32,
    dst_id: u32,
    submesh_id: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReducedVertex {
    pub vertex: usize,
    pub collapsed_to: usize,
    pub cost: f32,
}

#[derive(Debug, Default)]
pub struct LodCollapser {
    tmp_collapsed_edges: Vec<CollapsedEdge>,
    last_reduced_vertex: Option<ReducedVertex>,
    collapse_count: usize,
}

impl LodCollapser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collapse while more than `vertex_count_limit` vertices remain and the
    /// cheapest collapse costs less than `collapse_cost_limit`.
    pub fn collapse(
        &mut self,
        data: &mut LodData,
        cost: &dyn CollapseCost,
        output: &mut dyn LodOutputProvider,
        vertex_count_limit: usize,
        collapse_cost_limit: f32,
    ) {
        while data.collapse_cost_heap.len() > vertex_count_limit {
            let Some((vi, vertex_cost)) = data.collapse_cost_heap.peek_min() else {
                break;
            };
            if Self::is_stale(data, vi) {
                // Re-derive and look at the heap again.
                cost.update_vertex_collapse_cost(data, vi);
                if Self::is_stale(data, vi) {
                    // No collapsible edge left.
                    data.collapse_cost_heap.erase(vi);
                }
                continue;
            }
            if vertex_cost >= collapse_cost_limit {
                break;
            }
            let collapsed_to = data.vertex_list[vi].collapse_to;
            self.collapse_vertex(data, cost, output, vi);
            self.last_reduced_vertex = Some(ReducedVertex {
                vertex: vi,
                collapsed_to,
                cost: vertex_cost,
            });
            self.collapse_count += 1;
        }
    }

    /// The heap entry of `vi` no longer describes a possible collapse.
    fn is_stale(data: &LodData, vi: usize) -> bool {
        let v = &data.vertex_list[vi];
        v.edges.is_empty() || v.collapse_to == INVALID || !v.has_edge(v.collapse_to)
    }

    pub fn last_reduced_vertex(&self) -> Option<ReducedVertex> {
        self.last_reduced_vertex
    }

    /// Collapses executed over the lifetime of this collapser.
    pub fn collapse_count(&self) -> usize {
        self.collapse_count
    }

    fn has_src_id(&self, src_id: u32, submesh_id: usize) -> bool {
        self.tmp_collapsed_edges
            .iter()
            .any(|e| e.src_id == src_id && e.submesh_id == submesh_id)
    }

    /// Destination instance for `src_id`: an exact match first, any collapsed
    /// edge of the same submesh otherwise.
    fn find_dst_id(&self, src_id: u32, submesh_id: usize) -> Option<u32> {
        self.tmp_collapsed_edges
            .iter()
            .find(|e| e.src_id == src_id && e.submesh_id == submesh_id)
            .or_else(|| {
                self.tmp_collapsed_edges
                    .iter()
                    .find(|e| e.submesh_id == submesh_id)
            })
            .map(|e| e.dst_id)
    }

    pub fn collapse_vertex(
        &mut self,
        data: &mut LodData,
        cost: &dyn CollapseCost,
        output: &mut dyn LodOutputProvider,
        src: usize,
    ) {
        let dst = data.vertex_list[src].collapse_to;
        let heap_cost = data.collapse_cost_heap.cost_of(src);
        assert!(
            heap_cost.is_some_and(|c| c != NEVER_COLLAPSE_COST && c != UNINITIALIZED_COLLAPSE_COST),
            "vertex {} has no collapsible heap entry",
            src
        );
        assert!(!data.vertex_list[src].edges.is_empty());
        assert!(!data.vertex_list[src].triangles.is_empty());
        assert!(
            data.vertex_list[src].has_edge(dst),
            "vertex {} has no edge to its target {}",
            src,
            dst
        );

        // Triangles may come from different submeshes with their own vertex
        // buffers, so the removed triangles record which instance moves where.
        self.tmp_collapsed_edges.clear();
        let triangles = std::mem::take(&mut data.vertex_list[src].triangles);
        for &ti in &triangles {
            let tri = &data.triangle_list[ti];
            if !tri.has_vertex(dst) {
                continue;
            }
            let src_id = tri.vertex_id(src);
            let submesh_id = tri.submesh_id;
            if !self.has_src_id(src_id, submesh_id) {
                self.tmp_collapsed_edges.push(CollapsedEdge {
                    src_id,
                    dst_id: tri.vertex_id(dst),
                    submesh_id,
                });
            }
            data.index_buffer_info_list[submesh_id].index_count -= 3;
            output.triangle_removed(data, ti);
            remove_triangle_from_edges(data, ti, src);
        }
        assert!(!self.tmp_collapsed_edges.is_empty());
        debug_assert!(!data.vertex_list[dst].has_edge(src));

        for &ti in &triangles {
            let tri = &data.triangle_list[ti];
            if tri.has_vertex(dst) {
                continue;
            }
            let src_id = tri.vertex_id(src);
            let submesh_id = tri.submesh_id;
            match self.find_dst_id(src_id, submesh_id) {
                Some(dst_id) => {
                    replace_vertex(data, ti, src, dst, dst_id);
                    output.triangle_changed(data, ti);
                    let (triangle_list, vertex_list) = (&mut data.triangle_list, &data.vertex_list);
                    triangle_list[ti].compute_normal(vertex_list);
                }
                None => {
                    // No edge of this submesh to move along.
                    data.index_buffer_info_list[submesh_id].index_count -= 3;
                    output.triangle_removed(data, ti);
                    remove_triangle_from_edges(data, ti, src);
                }
            }
        }

        if data.vertex_list[src].seam {
            data.vertex_list[dst].seam = true;
        }

        data.collapse_cost_heap.erase(src);
        let src_edges = std::mem::take(&mut data.vertex_list[src].edges);
        data.vertex_list[src].collapse_to = INVALID;

        // Costs read the faces of the neighbours, so the whole two-ring is
        // refreshed.
        let updatable: Vec<usize> = src_edges
            .iter()
            .flat_map(|e| {
                std::iter::once(e.dst).chain(data.vertex_list[e.dst].edges.iter().map(|e2| e2.dst))
            })
            .filter(|&v| v != src)
            .sorted_unstable()
            .dedup()
            .collect();
        for vi in updatable {
            cost.update_vertex_collapse_cost(data, vi);
        }
    }
}

/// Mark triangle `ti` removed and drop its edge references.
///
/// `skip` is the collapsing vertex, whose lists are discarded afterwards.
fn remove_triangle_from_edges(data: &mut LodData, ti: usize, skip: usize) {
    let tri = &mut data.triangle_list[ti];
    tri.set_removed();
    let vertices = tri.vertices;
    for &vi in vertices.iter().filter(|&&v| v != skip) {
        data.vertex_list[vi].remove_triangle(ti);
    }
    for i in 0..3 {
        if vertices[i] == skip {
            continue;
        }
        for n in 0..3 {
            if i != n {
                data.vertex_list[vertices[i]].remove_edge(vertices[n]);
            }
        }
    }
}

/// Move corner `src` of triangle `ti` onto `dst` using instance `new_id`.
fn replace_vertex(data: &mut LodData, ti: usize, src: usize, dst: usize, new_id: u32) {
    data.vertex_list[dst].add_triangle(ti);
    let tri = &data.triangle_list[ti];
    let slot = tri
        .vertices
        .iter()
        .position(|&v| v == src)
        .unwrap_or_else(|| panic!("triangle {} does not use vertex {}", ti, src));
    let vertices = tri.vertices;
    for (n, &vn) in vertices.iter().enumerate() {
        if n != slot {
            let neighbor = &mut data.vertex_list[vn];
            neighbor.remove_edge(src);
            neighbor.add_edge(dst);
            data.vertex_list[dst].add_edge(vn);
        }
    }
    let tri = &mut data.triangle_list[ti];
    tri.vertices[slot] = dst;
    tri.vertex_ids[slot] = new_id;
}
