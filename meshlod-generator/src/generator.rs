//! LOD generation driver
//!
//! Wires input, cost strategy, collapser and output provider together and
//! walks the configured levels.

use crate::collapse_cost::CollapseCost;
use crate::collapser::LodCollapser;
use crate::config::{LodConfig, LodLevel, ReductionMethod};
use crate::curvature::CurvatureCost;
use crate::data::{LodData, NEVER_COLLAPSE_COST};
use crate::input::LodInputProvider;
use crate::output::{LodOutputBuffer, LodOutputProvider};
use crate::output_buffer::LodOutputProviderBuffer;
use crate::output_compressed::LodOutputProviderCompressedBuffer;
use crate::profiler::CollapseCostProfiler;
use meshlod_core::{Error, Result, SourceMesh};
use rayon::prelude::*;

/// What happened to one configured level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LodLevelOutcome {
    /// Unique vertices left after the level's collapses.
    pub unique_vertex_count: usize,
    /// Nothing collapsed since the previous bake, so no level was baked.
    pub skipped: bool,
    /// Position in the generated level list, `None` when skipped.
    pub lod_index: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct LodGeneration {
    pub output: LodOutputBuffer,
    /// One entry per configured level.
    pub levels: Vec<LodLevelOutcome>,
}

impl LodGeneration {
    pub fn baked_level_count(&self) -> usize {
        self.levels.iter().filter(|l| !l.skipped).count()
    }
}

/// Collapse limits `(vertex_count_limit, collapse_cost_limit)` of a level,
/// given the number of vertices the run started with.
pub fn level_limits(level: &LodLevel, vertex_count: usize) -> (usize, f32) {
    match level.reduction_method {
        ReductionMethod::Proportional => {
            let removed = (vertex_count as f64 * level.reduction_value as f64) as usize;
            (vertex_count - removed.min(vertex_count), NEVER_COLLAPSE_COST)
        }
        ReductionMethod::Constant => (
            vertex_count.saturating_sub(level.reduction_value as usize),
            NEVER_COLLAPSE_COST,
        ),
        ReductionMethod::CollapseCost => (0, level.reduction_value.min(NEVER_COLLAPSE_COST)),
    }
}

/// Run the level loop over prepared data.
///
/// `data` must already hold the collapse costs. Levels that remove no vertex
/// compared to the previous bake are skipped; baked levels get consecutive
/// LOD indices starting at 0. The output is finalized.
pub fn compute_lods(
    data: &mut LodData,
    cost: &dyn CollapseCost,
    output: &mut dyn LodOutputProvider,
    levels: &[LodLevel],
) -> Vec<LodLevelOutcome> {
    let mut collapser = LodCollapser::new();
    let vertex_count = data.collapse_cost_heap.len();
    let mut last_bake_vertex_count = vertex_count;
    let mut lod_index = 0;
    let mut outcomes = Vec::with_capacity(levels.len());

    for (i, level) in levels.iter().enumerate() {
        let (vertex_count_limit, collapse_cost_limit) = level_limits(level, vertex_count);
        collapser.collapse(data, cost, output, vertex_count_limit, collapse_cost_limit);

        let unique_vertex_count = data.collapse_cost_heap.len();
        let skipped = unique_vertex_count == last_bake_vertex_count;
        let mut outcome = LodLevelOutcome {
            unique_vertex_count,
            skipped,
            lod_index: None,
        };
        if skipped {
            log::debug!(
                "{}: level {} left {} vertices unchanged, skipped",
                data.mesh_name,
                i,
                unique_vertex_count
            );
        } else {
            log::debug!(
                "{}: level {} baked as LOD {} with {} vertices",
                data.mesh_name,
                i,
                lod_index,
                unique_vertex_count
            );
            output.bake_lod_level(data, lod_index);
            outcome.lod_index = Some(lod_index);
            last_bake_vertex_count = unique_vertex_count;
            lod_index += 1;
        }
        outcomes.push(outcome);
    }

    output.finalize(data);
    outcomes
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MeshLodGenerator;

impl MeshLodGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate every configured level of `mesh`.
    pub fn generate_lod_levels(&self, mesh: &SourceMesh, config: &LodConfig) -> Result<LodGeneration> {
        config.validate()?;
        if mesh.is_empty() {
            return Err(Error::InvalidData(format!("mesh '{}' is empty", mesh.name)));
        }

        let mut data = LodData::new();
        data.use_vertex_normals = config.advanced.use_vertex_normals;
        LodInputProvider::new(mesh).init_data(&mut data)?;

        let mut cost: Box<dyn CollapseCost> = if config.advanced.profile.is_empty() {
            Box::new(CurvatureCost::new())
        } else {
            Box::new(CollapseCostProfiler::new(
                config.advanced.profile.clone(),
                CurvatureCost::new(),
            ))
        };
        let mut output: Box<dyn LodOutputProvider> = if config.advanced.use_compression {
            Box::new(LodOutputProviderCompressedBuffer::new())
        } else {
            Box::new(LodOutputProviderBuffer::new())
        };

        cost.init_collapse_costs(&mut data)?;
        output.prepare(&data);
        log::info!(
            "Generating {} LOD levels for {} ({} vertices, {} triangles)",
            config.levels.len(),
            data.mesh_name,
            data.collapse_cost_heap.len(),
            data.active_triangle_count()
        );

        let levels = compute_lods(&mut data, cost.as_ref(), output.as_mut(), &config.levels);
        Ok(LodGeneration {
            output: output.into_buffer(),
            levels,
        })
    }

    /// Generate levels for independent meshes in parallel.
    pub fn generate_batch(&self, meshes: &[SourceMesh], config: &LodConfig) -> Vec<Result<LodGeneration>> {
        meshes
            .par_iter()
            .map(|mesh| self.generate_lod_levels(mesh, config))
            .collect()
    }
}
