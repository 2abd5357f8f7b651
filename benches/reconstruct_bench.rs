//! Reconstruction and frame benchmarks.
//!
//! Measures:
//! - Dense-grid reconstruction from sparse authoring, by grid size
//! - Deformation reconstruction, by vertex count
//! - A full rig frame with warm caches

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use glam::Vec2;

use myth_rig::param::{AxisSpace, Deformation, Grid, GridReconstructor, MergeMode, Parameter};
use myth_rig::{NodeId, PropertySheet, Rig};

/// Corners plus one interior cell: exercises every reconstruction stage.
fn sparse_grid(n: usize) -> Grid<f32> {
    let mut grid = Grid::new([n, n], &0.0);
    for (i, &[x, y]) in [[0, 0], [0, n - 1], [n - 1, 0], [n / 2, n / 3]].iter().enumerate() {
        grid.set(x, y, i as f32).ok();
    }
    grid
}

fn bench_reconstruct_scalar(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct_scalar");

    for n in [3, 5, 9, 17] {
        let axes = AxisSpace::uniform(&[n, n]).expect("valid axes");
        let grid = sparse_grid(n);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| GridReconstructor::reconstruct(black_box(&grid), &axes, &0.0));
        });
    }

    group.finish();
}

fn bench_reconstruct_deformation(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct_deformation");
    let axes = AxisSpace::uniform(&[3, 3]).expect("valid axes");

    for vertices in [64, 512, 4096] {
        let zero = Deformation::zeroed(vertices);
        let mut grid = Grid::new([3, 3], &zero);
        let field = Deformation::from_offsets(vec![Vec2::new(1.0, -1.0); vertices]);
        grid.set(0, 0, field.clone()).ok();
        grid.set(2, 2, field).ok();

        group.throughput(Throughput::Elements(vertices as u64));
        group.bench_with_input(BenchmarkId::from_parameter(vertices), &vertices, |b, _| {
            b.iter(|| GridReconstructor::reconstruct(black_box(&grid), &axes, &zero));
        });
    }

    group.finish();
}

fn bench_frame(c: &mut Criterion) {
    let mut scene = PropertySheet::new();
    let mut rig = Rig::new();

    for i in 0..64 {
        let node = NodeId(i);
        scene.add_property(node, "transform.t.x", 0.0);
        let key = rig.add_parameter(
            Parameter::plane(format!("p{i}"), vec![0.0, 0.5, 1.0], vec![0.0, 0.5, 1.0])
                .expect("valid axes"),
        );
        let id = rig
            .bind_value(key, &scene, node, "transform.t.x", MergeMode::Additive)
            .expect("property exists");
        let binding = rig.value_binding_mut(key, id).expect("value binding");
        binding.set_value(0, 0, -1.0).ok();
        binding.set_value(2, 2, 1.0).ok();
        rig.parameter_mut(key)
            .expect("live parameter")
            .set_base(Vec2::splat(i as f32 / 64.0));
    }

    // Warm the dense caches.
    rig.begin_frame();
    rig.apply(&mut scene);

    c.bench_function("frame_64_bindings", |b| {
        b.iter(|| {
            rig.begin_frame();
            black_box(rig.apply(&mut scene))
        });
    });
}

criterion_group!(
    benches,
    bench_reconstruct_scalar,
    bench_reconstruct_deformation,
    bench_frame
);
criterion_main!(benches);
