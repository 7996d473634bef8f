use contesa::harness::{run_store, run_strategy, BenchConfig};
use contesa::stores::in_memory::InMemoryStore;
use contesa::stores::CounterStore;
use contesa::strategies::Strategy;
use contesa::txn::memory::MemStore;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const NUM_WORKERS: u32 = 8;
const ITERATIONS_PER_WORKER: u32 = 1_000;

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy_increment");
    group.sample_size(10);

    for strategy in Strategy::ALL {
        group.bench_function(
            BenchmarkId::new(
                strategy.name(),
                format!("{}workers x {}iter", NUM_WORKERS, ITERATIONS_PER_WORKER),
            ),
            |b| {
                b.iter(|| {
                    let store = MemStore::new();
                    let config = BenchConfig::new(NUM_WORKERS, ITERATIONS_PER_WORKER);
                    black_box(run_strategy(&store, strategy, &config).unwrap())
                })
            },
        );
    }

    group.finish();
}

fn bench_backends(c: &mut Criterion) {
    let mut group = c.benchmark_group("backend_increment");
    group.sample_size(10);

    group.bench_function(
        BenchmarkId::new(
            "memory",
            format!("{}workers x {}iter", NUM_WORKERS, ITERATIONS_PER_WORKER),
        ),
        |b| {
            b.iter(|| {
                let store = InMemoryStore::new();
                store.initialize().unwrap();
                let config = BenchConfig::new(NUM_WORKERS, ITERATIONS_PER_WORKER);
                black_box(run_store(&store, "memory", &config).unwrap())
            })
        },
    );

    group.finish();
}

criterion_group!(benches, bench_strategies, bench_backends);
criterion_main!(benches);
