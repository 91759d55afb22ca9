//! Collapse cost engine
//!
//! A [`CollapseCost`] rates single directed edges; the provided methods turn
//! those ratings into the per-vertex cheapest collapse and keep the
//! [`CollapseCostHeap`](crate::data::CollapseCostHeap) in sync with it.

use crate::data::*;
use meshlod_core::Result;

/// True iff any outgoing edge of `vertex` is used by a single triangle.
pub fn is_border_vertex(vertex: &Vertex) -> bool {
    vertex.edges.iter().any(Edge::is_border)
}

/// Insert the cheapest collapse of every used vertex into the heap.
///
/// Vertices whose edges all rate [`UNINITIALIZED_COLLAPSE_COST`] get no entry.
pub fn fill_collapse_cost_heap<C: CollapseCost + ?Sized>(cost: &C, data: &mut LodData) {
    data.collapse_cost_heap.clear();
    for vi in 0..data.vertex_list.len() {
        if data.vertex_list[vi].is_unused() {
            log::warn!(
                "In {}, vertex {} is unused. It will be excluded from the LOD process.",
                data.mesh_name,
                vi
            );
            data.vertex_list[vi].collapse_to = INVALID;
            continue;
        }
        let (collapse_cost, collapse_to) = cost.compute_vertex_collapse_cost(data, vi);
        data.vertex_list[vi].collapse_to = collapse_to;
        if collapse_cost == UNINITIALIZED_COLLAPSE_COST {
            log::debug!(
                "In {}, no edge of vertex {} has a collapse cost. It will not be collapsed.",
                data.mesh_name,
                vi
            );
            continue;
        }
        data.collapse_cost_heap.insert(vi, collapse_cost);
    }
}

/// Strategy for rating edge collapses.
pub trait CollapseCost {
    /// Cost of moving `src` onto `edge.dst`. Must be non-negative and
    /// deterministic for a given topology.
    fn compute_edge_collapse_cost(&self, data: &LodData, src: usize, edge: &Edge) -> f32;

    /// Compute every vertex's cheapest collapse and fill the heap.
    fn init_collapse_costs(&mut self, data: &mut LodData) -> Result<()> {
        fill_collapse_cost_heap(&*self, data);
        Ok(())
    }

    /// Cheapest `(cost, target)` over the outgoing edges of `vi`.
    ///
    /// Edge costs are stored on the edges. The first minimum in edge order
    /// wins ties.
    fn compute_vertex_collapse_cost(&self, data: &mut LodData, vi: usize) -> (f32, usize) {
        assert!(
            !data.vertex_list[vi].edges.is_empty(),
            "collapse cost requested for edgeless vertex {}",
            vi
        );
        let mut collapse_cost = UNINITIALIZED_COLLAPSE_COST;
        let mut collapse_to = INVALID;
        for ei in 0..data.vertex_list[vi].edges.len() {
            let edge = data.vertex_list[vi].edges[ei];
            let cost = self.compute_edge_collapse_cost(data, vi, &edge);
            data.vertex_list[vi].edges[ei].collapse_cost = cost;
            if cost < collapse_cost {
                collapse_cost = cost;
                collapse_to = edge.dst;
            }
        }
        (collapse_cost, collapse_to)
    }

    /// Re-evaluate `vi` and replace its heap entry if the result changed.
    fn update_vertex_collapse_cost(&self, data: &mut LodData, vi: usize) {
        let (collapse_cost, collapse_to) = if data.vertex_list[vi].is_unused() {
            (UNINITIALIZED_COLLAPSE_COST, INVALID)
        } else {
            self.compute_vertex_collapse_cost(data, vi)
        };

        let current = data.collapse_cost_heap.cost_of(vi);
        let unchanged = data.vertex_list[vi].collapse_to == collapse_to
            && current.is_some_and(|c| c == collapse_cost);
        if unchanged {
            return;
        }
        data.vertex_list[vi].collapse_to = collapse_to;
        data.collapse_cost_heap.erase(vi);
        if collapse_cost != UNINITIALIZED_COLLAPSE_COST {
            data.collapse_cost_heap.insert(vi, collapse_cost);
        }
    }
}

impl<T: CollapseCost + ?Sized> CollapseCost for Box<T> {
    fn compute_edge_collapse_cost(&self, data: &LodData, src: usize, edge: &Edge) -> f32 {
        (**self).compute_edge_collapse_cost(data, src, edge)
    }

    fn init_collapse_costs(&mut self, data: &mut LodData) -> Result<()> {
        (**self).init_collapse_costs(data)
    }

    fn compute_vertex_collapse_cost(&self, data: &mut LodData, vi: usize) -> (f32, usize) {
        (**self).compute_vertex_collapse_cost(data, vi)
    }

    fn update_vertex_collapse_cost(&self, data: &mut LodData, vi: usize) {
        (**self).update_vertex_collapse_cost(data, vi)
    }
}
