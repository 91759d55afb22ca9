//! Profile replay cost strategy
//!
//! Replays externally recorded edge costs and falls back to another
//! calculator for every edge the profile does not mention.

use crate::collapse_cost::{fill_collapse_cost_heap, CollapseCost};
use crate::data::*;
use meshlod_core::{Error, Point3f, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Recorded collapse cost of the edge between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfiledEdge {
    pub src: Point3f,
    pub dst: Point3f,
    pub cost: f32,
}

impl ProfiledEdge {
    pub fn new(src: Point3f, dst: Point3f, cost: f32) -> Self {
        Self { src, dst, cost }
    }

    /// Finite and non-negative.
    pub fn is_valid_cost(&self) -> bool {
        self.cost.is_finite() && self.cost >= 0.0
    }
}

pub struct CollapseCostProfiler<C> {
    profile: Vec<ProfiledEdge>,
    /// Source vertex -> (destination vertex, cost).
    lookup: HashMap<usize, Vec<(usize, f32)>>,
    cost_calculator: C,
}

impl<C: CollapseCost> CollapseCostProfiler<C> {
    pub fn new(profile: Vec<ProfiledEdge>, cost_calculator: C) -> Self {
        Self {
            profile,
            lookup: HashMap::new(),
            cost_calculator,
        }
    }

    /// Resolve the profile positions to vertices and move them into the
    /// lookup table. The profile list is consumed.
    pub fn inject_profile(&mut self, data: &LodData) -> Result<()> {
        let find = |pos: &Point3f| {
            data.find_unique_vertex_by_pos(pos).ok_or_else(|| {
                Error::InvalidProfile(format!(
                    "position ({}, {}, {}) is not a vertex of '{}'",
                    pos.x, pos.y, pos.z, data.mesh_name
                ))
            })
        };
        for entry in &self.profile {
            if !entry.is_valid_cost() {
                return Err(Error::InvalidProfile(format!(
                    "cost {} in profile must be finite and non-negative",
                    entry.cost
                )));
            }
            let src = find(&entry.src)?;
            let dst = find(&entry.dst)?;
            self.lookup.entry(src).or_default().push((dst, entry.cost));
        }
        log::debug!(
            "Injected {} profiled edges into {}",
            self.profile.len(),
            data.mesh_name
        );
        self.profile.clear();
        Ok(())
    }

    pub fn has_profile(&self, vertex: usize) -> bool {
        self.lookup.contains_key(&vertex)
    }

    pub fn cost_calculator(&self) -> &C {
        &self.cost_calculator
    }
}

impl<C: CollapseCost> CollapseCost for CollapseCostProfiler<C> {
    fn compute_edge_collapse_cost(&self, data: &LodData, src: usize, edge: &Edge) -> f32 {
        let profiled = self
            .lookup
            .get(&src)
            .and_then(|entries| entries.iter().find(|(dst, _)| *dst == edge.dst));
        match profiled {
            Some(&(_, cost)) => cost,
            None => self.cost_calculator.compute_edge_collapse_cost(data, src, edge),
        }
    }

    fn init_collapse_costs(&mut self, data: &mut LodData) -> Result<()> {
        if !self.profile.is_empty() {
            self.inject_profile(data)?;
        }
        fill_collapse_cost_heap(&*self, data);
        Ok(())
    }
}
