use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use geocache_sim::{
    build_session_app, regenerate_visible, run_frame, CellCoord, GameConfig, GridStore,
    LatLng, MemoryStore, Viewport,
};

fn bench_regenerate(c: &mut Criterion) {
    let spawner = GameConfig::default().spawner();
    let mut group = c.benchmark_group("regenerate");

    for radius in [8u32, 16, 25, 50] {
        group.bench_with_input(BenchmarkId::new("radius", radius), &radius, |b, &radius| {
            let mut store = GridStore::new();
            for k in 0..radius as i32 {
                store.set(CellCoord::new(k, -k), 0);
            }
            b.iter(|| regenerate_visible(CellCoord::new(0, 0), radius, &store, &spawner));
        });
    }

    group.finish();
}

fn bench_pan_frame(c: &mut Criterion) {
    c.bench_function("frame/pan", |b| {
        b.iter_batched(
            || build_session_app(Arc::new(GameConfig::default()), Box::new(MemoryStore::new())),
            |mut app| {
                app.world
                    .resource_mut::<Viewport>()
                    .recenter(LatLng::new(36.9985, -122.0565));
                run_frame(&mut app);
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(regenerate_benches, bench_regenerate, bench_pan_frame);
criterion_main!(regenerate_benches);
