//! LOD level configuration

use crate::profiler::ProfiledEdge;
use meshlod_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// How `LodLevel::reduction_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionMethod {
    /// Fraction of the vertices to remove, in `[0, 1]`.
    #[default]
    Proportional,
    /// Exact number of vertices to remove.
    Constant,
    /// Collapse every vertex cheaper than the value.
    CollapseCost,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// Distance at which the level is used. Not interpreted by the generator
    /// except for ordering.
    pub distance: f32,
    #[serde(default)]
    pub reduction_method: ReductionMethod,
    pub reduction_value: f32,
}

impl LodLevel {
    pub fn new(distance: f32, reduction_method: ReductionMethod, reduction_value: f32) -> Self {
        Self {
            distance,
            reduction_method,
            reduction_value,
        }
    }

    pub fn proportional(distance: f32, reduction: f32) -> Self {
        Self::new(distance, ReductionMethod::Proportional, reduction)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodAdvancedConfig {
    /// Bake pairs of levels into shared index buffers.
    #[serde(default = "default_true")]
    pub use_compression: bool,
    /// Include vertex normals in the collapse cost when the mesh has them.
    #[serde(default = "default_true")]
    pub use_vertex_normals: bool,
    /// Recorded costs replayed instead of the live cost.
    #[serde(default)]
    pub profile: Vec<ProfiledEdge>,
}

impl Default for LodAdvancedConfig {
    fn default() -> Self {
        Self {
            use_compression: true,
            use_vertex_normals: true,
            profile: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LodConfig {
    pub levels: Vec<LodLevel>,
    #[serde(default)]
    pub advanced: LodAdvancedConfig,
}

impl LodConfig {
    pub fn new(levels: Vec<LodLevel>) -> Self {
        Self {
            levels,
            advanced: LodAdvancedConfig::default(),
        }
    }

    pub fn with_compression(mut self, use_compression: bool) -> Self {
        self.advanced.use_compression = use_compression;
        self
    }

    pub fn with_profile(mut self, profile: Vec<ProfiledEdge>) -> Self {
        self.advanced.profile = profile;
        self
    }

    /// Levels must be ordered by increasing distance and carry non-negative
    /// reduction values; proportional values may not exceed 1. Profile costs
    /// must be finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        if let Some(entry) = self.advanced.profile.iter().find(|e| !e.is_valid_cost()) {
            return Err(Error::InvalidProfile(format!(
                "cost {} of profiled edge {:?} -> {:?} must be finite and non-negative",
                entry.cost, entry.src, entry.dst
            )));
        }
        for (i, level) in self.levels.iter().enumerate() {
            if !(level.reduction_value >= 0.0) {
                return Err(Error::InvalidData(format!(
                    "LOD level {} has invalid reduction value {}",
                    i, level.reduction_value
                )));
            }
            if level.reduction_method == ReductionMethod::Proportional && level.reduction_value > 1.0
            {
                return Err(Error::InvalidData(format!(
                    "LOD level {} removes {} of the vertices, must be at most 1.0",
                    i, level.reduction_value
                )));
            }
            if i > 0 && !(level.distance > self.levels[i - 1].distance) {
                return Err(Error::InvalidData(format!(
                    "LOD level {} distance {} must be greater than {}",
                    i,
                    level.distance,
                    self.levels[i - 1].distance
                )));
            }
        }
        Ok(())
    }
}
