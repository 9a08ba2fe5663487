use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec2;
use sieve::{Aabb, Bounds, GridConfig, HashGrid, PackedIdSet};

const ARENA: f32 = 8192.0;

/// Spread `count` boxes over the arena on a jittered lattice.
#[allow(clippy::cast_precision_loss)]
fn scatter(count: u16) -> Vec<(u16, Aabb)> {
    let side = f32::from(count).sqrt().ceil();
    let spacing = ARENA / side;
    (0..count)
        .map(|id| {
            let i = f32::from(id);
            let jitter = (i * 37.0) % 23.0;
            let center = Vec2::new(
                (i % side) * spacing - ARENA / 2.0 + jitter,
                (i / side).floor() * spacing - ARENA / 2.0 - jitter,
            );
            (id, Aabb::square(center, 30.0 + (i % 7.0) * 10.0))
        })
        .collect()
}

fn bench_insert_and_pairs(c: &mut Criterion) {
    let boxes = scatter(4000);
    let mut live = PackedIdSet::new();
    for &(id, _) in &boxes {
        live.add(id);
    }
    let mut grid = HashGrid::new(GridConfig::default());
    let mut tick = 0;

    c.bench_function("insert_and_pairs_4000", |b| {
        b.iter(|| {
            tick += 1;
            grid.begin_tick(tick, Bounds::new(ARENA, ARENA));
            for &(id, aabb) in &boxes {
                grid.insert(id, aabb).unwrap();
            }
            let mut count = 0u32;
            grid.for_each_collision_pair(&mut live, |_, _, _| count += 1)
                .unwrap();
            grid.end_tick(tick);
            black_box(count)
        });
    });
}

fn bench_retrieve(c: &mut Criterion) {
    let boxes = scatter(4000);
    let live: PackedIdSet = boxes.iter().map(|&(id, _)| id).collect();
    let mut grid = HashGrid::new(GridConfig::default());
    grid.begin_tick(1, Bounds::new(ARENA, ARENA));
    for &(id, aabb) in &boxes {
        grid.insert(id, aabb).unwrap();
    }

    // Roughly one player view.
    let view = Aabb::new(Vec2::new(250.0, -120.0), Vec2::new(960.0, 540.0));
    c.bench_function("retrieve_view", |b| {
        b.iter(|| black_box(grid.retrieve(&live, black_box(view)).unwrap().len()));
    });
}

criterion_group!(benches, bench_insert_and_pairs, bench_retrieve);
criterion_main!(benches);
