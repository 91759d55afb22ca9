//! Benchmarks of LOD generation with independent and compressed output

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use meshlod_core::{Point3f, SourceMesh, TriangleMesh};
use meshlod_generator::{LodConfig, LodLevel, MeshLodGenerator, MeshSimplifier, ProgressiveMeshSimplifier};

fn generate_grid_mesh(size: usize) -> TriangleMesh {
    let mut vertices = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 / (size - 1) as f32 * std::f32::consts::PI;
            let fy = y as f32 / (size - 1) as f32 * std::f32::consts::PI;
            vertices.push(Point3f::new(
                x as f32,
                y as f32,
                (fx.sin() * fy.sin()) * 2.0,
            ));
        }
    }
    let mut faces = Vec::with_capacity((size - 1) * (size - 1) * 2);
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = y * size + x;
            let tr = tl + 1;
            let bl = (y + 1) * size + x;
            let br = bl + 1;
            faces.push([tl, bl, tr]);
            faces.push([tr, bl, br]);
        }
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

fn level_config(use_compression: bool) -> LodConfig {
    LodConfig::new(vec![
        LodLevel::proportional(10.0, 0.25),
        LodLevel::proportional(20.0, 0.5),
        LodLevel::proportional(40.0, 0.75),
        LodLevel::proportional(80.0, 0.9),
    ])
    .with_compression(use_compression)
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("lod_generation");
    let generator = MeshLodGenerator::new();

    for &size in &[10, 20, 40] {
        let mesh = SourceMesh::from_triangle_mesh(&generate_grid_mesh(size));
        let face_count = (size - 1) * (size - 1) * 2;

        for (name, compressed) in [("buffer", false), ("compressed", true)] {
            let config = level_config(compressed);
            group.bench_with_input(
                BenchmarkId::new(name, format!("{}f", face_count)),
                &mesh,
                |b, mesh| {
                    b.iter(|| {
                        let result = generator.generate_lod_levels(black_box(mesh), &config).unwrap();
                        black_box(result);
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_simplifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("simplifier");
    let mesh = generate_grid_mesh(30);
    let simplifier = ProgressiveMeshSimplifier::new();

    for &ratio in &[0.3, 0.5, 0.7] {
        group.bench_with_input(
            BenchmarkId::new("progressive", format!("r{}", (ratio * 100.0) as u32)),
            &ratio,
            |b, &ratio| {
                b.iter(|| {
                    let result = simplifier.simplify(black_box(&mesh), ratio).unwrap();
                    black_box(result);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_generation, bench_simplifier);
criterion_main!(benches);
