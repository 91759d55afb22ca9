//! Curvature based collapse cost
//!
//! Rates a collapse by how much the faces around the source vertex bend
//! relative to the faces that disappear, scaled by the edge length. Border
//! vertices are rated by how straight the border stays, seams are penalised
//! and collapses that flip a face are forbidden.

use crate::collapse_cost::{is_border_vertex, CollapseCost};
use crate::data::*;

/// Live geometric cost strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurvatureCost;

impl CurvatureCost {
    pub fn new() -> Self {
        Self
    }

    /// A face of `src` that survives the collapse would turn over.
    fn flips_triangle(data: &LodData, src: usize, dst: usize) -> bool {
        let src_vertex = &data.vertex_list[src];
        src_vertex.triangles.iter().any(|&ti| {
            let tri = &data.triangle_list[ti];
            if tri.has_vertex(dst) {
                return false;
            }
            let p = tri.vertices.map(|v| {
                let v = if v == src { dst } else { v };
                data.vertex_list[v].position
            });
            let new_normal = (p[1] - p[0]).cross(&(p[2] - p[1]));
            new_normal.dot(&tri.normal) < 0.0
        })
    }

    fn border_cost(data: &LodData, src: usize, edge: &Edge) -> f32 {
        if edge.ref_count > 1 {
            // Border vertex moving inward.
            return 1.0;
        }
        // Along the border: the straighter the remaining border, the cheaper.
        let src_vertex = &data.vertex_list[src];
        let dst_pos = data.vertex_list[edge.dst].position;
        let collapse_edge = (src_vertex.position - dst_pos).normalize();
        let mut kinkiness = -1.0f32;
        for other in &src_vertex.edges {
            if other.dst != edge.dst && other.is_border() {
                let other_border_edge =
                    (src_vertex.position - data.vertex_list[other.dst].position).normalize();
                kinkiness = kinkiness.max(other_border_edge.dot(&collapse_edge));
            }
        }
        (1.002 + kinkiness) * 0.5
    }

    fn interior_cost(data: &LodData, src: usize, dst: usize) -> f32 {
        let src_vertex = &data.vertex_list[src];
        let mut curvature = 1.0f32;
        for &ti in &src_vertex.triangles {
            let normal = data.triangle_list[ti].normal;
            let mut min_curvature = -1.0f32;
            for &tj in &src_vertex.triangles {
                let side = &data.triangle_list[tj];
                if side.has_vertex(dst) {
                    min_curvature = min_curvature.max(normal.dot(&side.normal));
                }
            }
            curvature = curvature.min(min_curvature);
        }
        (1.002 - curvature) * 0.5
    }

    fn seam_cost(src: &Vertex, dst: &Vertex, cost: f32) -> f32 {
        if !src.seam {
            cost
        } else if !dst.seam {
            cost.max(0.05) * 64.0
        } else {
            cost.max(0.005) * 8.0
        }
    }

    fn vertex_normal_cost(src: &Vertex, dst: &Vertex, data: &LodData, dist: f32) -> f32 {
        let diff = src.normal.dot(&dst.normal) / 8.0;
        let mut normal_cost = 0.0f32;
        for edge in &src.edges {
            let neighbor = &data.vertex_list[edge.dst];
            let before_dist = (neighbor.position - src.position).norm();
            let after_dist = (neighbor.position - dst.position).norm();
            let before_dot = neighbor.normal.dot(&src.normal);
            let after_dot = neighbor.normal.dot(&dst.normal);
            let angle_term = diff.max((before_dot - after_dot).abs());
            let dist_term = (after_dist / 8.0).max(dist.max((before_dist - after_dist).abs()));
            normal_cost = normal_cost.max(angle_term * dist_term);
        }
        normal_cost
    }
}

impl CollapseCost for CurvatureCost {
    fn compute_edge_collapse_cost(&self, data: &LodData, src: usize, edge: &Edge) -> f32 {
        let dst = edge.dst;
        if Self::flips_triangle(data, src, dst) {
            return NEVER_COLLAPSE_COST;
        }

        let src_vertex = &data.vertex_list[src];
        let dst_vertex = &data.vertex_list[dst];
        let mut cost = if is_border_vertex(src_vertex) {
            Self::border_cost(data, src, edge)
        } else {
            Self::interior_cost(data, src, dst)
        };
        cost = Self::seam_cost(src_vertex, dst_vertex, cost);

        let dist = (src_vertex.position - dst_vertex.position).norm();
        cost *= dist;
        if data.use_vertex_normals {
            let normal_cost = Self::vertex_normal_cost(src_vertex, dst_vertex, data, dist);
            cost = cost.max(normal_cost * 0.25);
        }

        // Rounding may push an almost flat neighbourhood below zero.
        let cost = cost.max(0.0);
        assert!(
            cost != UNINITIALIZED_COLLAPSE_COST && !cost.is_nan(),
            "invalid collapse cost for edge {} -> {}",
            src,
            dst
        );
        cost
    }
}
