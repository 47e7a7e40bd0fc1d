use colony_sim::{build_headless_app, run_turn, SimulationConfig};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

fn bench_turn(c: &mut Criterion) {
    let mut group = c.benchmark_group("turn");

    for empires in [2u32, 4, 8, 16] {
        group.bench_with_input(
            BenchmarkId::new("empires", empires),
            &empires,
            |b, &empires| {
                b.iter_batched(
                    || {
                        let mut app = build_headless_app();
                        app.world.resource_mut::<SimulationConfig>().starter_empires = empires;
                        // First update seeds the starter galaxy.
                        run_turn(&mut app);
                        app
                    },
                    |mut app| {
                        run_turn(&mut app);
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

criterion_group!(turn_benches, bench_turn);
criterion_main!(turn_benches);
