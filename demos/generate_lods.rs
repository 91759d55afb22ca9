//! Generate LOD levels for an OBJ file or a procedural sphere
//!
//! ```text
//! generate_lods --input model.obj --levels 0.25,0.5,0.75
//! generate_lods --sphere 32 --config lods.json --report report.json
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use meshlod_core::{IndexBuffer, Point3f, SourceMesh, SubMesh, VertexBuffer};
use meshlod_generator::{LodConfig, LodGeneration, LodLevel, MeshLodGenerator, ProfiledEdge};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generate_lods", about = "Progressive mesh LOD generation")]
struct Args {
    /// OBJ file; each group becomes a submesh
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Generate a UV sphere with this many segments instead of reading a file
    #[arg(long, default_value_t = 24)]
    sphere: usize,

    /// JSON level configuration; overrides --levels
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Proportional reductions, one level each
    #[arg(short, long, value_delimiter = ',', default_values_t = vec![0.25, 0.5, 0.75])]
    levels: Vec<f32>,

    /// JSON list of recorded edge costs
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Bake every level into its own index buffer
    #[arg(long)]
    no_compression: bool,

    /// Write a JSON summary of the generated levels
    #[arg(short, long)]
    report: Option<PathBuf>,
}

#[derive(Serialize)]
struct LevelReport {
    level: usize,
    lod_index: Option<usize>,
    unique_vertices: usize,
    skipped: bool,
    /// Index count per submesh, empty when skipped.
    index_counts: Vec<usize>,
}

fn load_obj(path: &PathBuf) -> Result<SourceMesh> {
    let obj = obj::Obj::load(path).with_context(|| format!("reading {}", path.display()))?;
    let positions: Vec<Point3f> = obj
        .data
        .position
        .iter()
        .map(|p| Point3f::new(p[0], p[1], p[2]))
        .collect();
    let vertex_count = positions.len();

    let mut mesh = SourceMesh::new(path.display().to_string());
    mesh.shared_vertices = Some(VertexBuffer::new(positions));
    for object in &obj.data.objects {
        for group in &object.groups {
            let mut indices = Vec::new();
            for poly in &group.polys {
                // Fan triangulation of convex polygons.
                let corners: Vec<u32> = poly.0.iter().map(|t| t.0 as u32).collect();
                for i in 1..corners.len().saturating_sub(1) {
                    indices.extend_from_slice(&[corners[0], corners[i], corners[i + 1]]);
                }
            }
            if !indices.is_empty() {
                mesh.submeshes.push(SubMesh::shared(IndexBuffer::for_vertex_count(
                    vertex_count,
                    &indices,
                )));
            }
        }
    }
    if mesh.is_empty() {
        bail!("{} contains no faces", path.display());
    }
    mesh.compute_bounding_sphere_radius();
    Ok(mesh)
}

fn uv_sphere(segments: usize) -> Result<SourceMesh> {
    if segments < 4 {
        bail!("a sphere needs at least 4 segments, got {}", segments);
    }
    let rings = segments / 2 + 1;
    let mut positions = vec![Point3f::new(0.0, 0.0, 1.0)];
    for r in 1..rings - 1 {
        let theta = std::f32::consts::PI * r as f32 / (rings - 1) as f32;
        for s in 0..segments {
            let phi = 2.0 * std::f32::consts::PI * s as f32 / segments as f32;
            positions.push(Point3f::new(
                theta.sin() * phi.cos(),
                theta.sin() * phi.sin(),
                theta.cos(),
            ));
        }
    }
    positions.push(Point3f::new(0.0, 0.0, -1.0));
    let bottom = (positions.len() - 1) as u32;
    let ring = |r: usize, s: usize| (1 + (r - 1) * segments + s % segments) as u32;

    let mut indices = Vec::new();
    for s in 0..segments {
        indices.extend_from_slice(&[0, ring(1, s), ring(1, s + 1)]);
    }
    for r in 1..rings - 2 {
        for s in 0..segments {
            let (a, b) = (ring(r, s), ring(r, s + 1));
            let (c, d) = (ring(r + 1, s), ring(r + 1, s + 1));
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
    for s in 0..segments {
        indices.extend_from_slice(&[bottom, ring(rings - 2, s + 1), ring(rings - 2, s)]);
    }

    let vertex_count = positions.len();
    let mut mesh = SourceMesh::new(format!("sphere{}", segments));
    mesh.submeshes.push(SubMesh::new(
        VertexBuffer::new(positions),
        IndexBuffer::for_vertex_count(vertex_count, &indices),
    ));
    mesh.compute_bounding_sphere_radius();
    Ok(mesh)
}

fn load_config(args: &Args) -> Result<LodConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => LodConfig::new(
            args.levels
                .iter()
                .enumerate()
                .map(|(i, &reduction)| LodLevel::proportional((i + 1) as f32 * 10.0, reduction))
                .collect(),
        ),
    };
    if let Some(path) = &args.profile {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let profile: Vec<ProfiledEdge> =
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        config.advanced.profile = profile;
    }
    if args.no_compression {
        config.advanced.use_compression = false;
    }
    Ok(config)
}

fn report(generation: &LodGeneration) -> Vec<LevelReport> {
    generation
        .levels
        .iter()
        .enumerate()
        .map(|(level, outcome)| LevelReport {
            level,
            lod_index: outcome.lod_index,
            unique_vertices: outcome.unique_vertex_count,
            skipped: outcome.skipped,
            index_counts: outcome
                .lod_index
                .map(|lod| {
                    generation
                        .output
                        .submesh
                        .iter()
                        .filter_map(|s| s.gen_index_buffers.get(lod))
                        .map(|b| b.index_count)
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mesh = match &args.input {
        Some(path) => load_obj(path)?,
        None => uv_sphere(args.sphere)?,
    };
    let config = load_config(&args)?;
    log::info!(
        "Loaded {} with {} submeshes (radius {:.3}), {} levels requested",
        mesh.name,
        mesh.submesh_count(),
        mesh.bounding_sphere_radius,
        config.levels.len()
    );

    let generation = MeshLodGenerator::new().generate_lod_levels(&mesh, &config)?;
    let levels = report(&generation);
    for level in &levels {
        if level.skipped {
            println!("level {}: skipped ({} vertices)", level.level, level.unique_vertices);
        } else {
            println!(
                "level {}: {} vertices, indices per submesh {:?}",
                level.level, level.unique_vertices, level.index_counts
            );
        }
    }

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&levels)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("Report written to {}", path.display());
    }
    Ok(())
}
