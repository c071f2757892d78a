//! Criterion benchmarks over the full per-tick sweep.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use volley_bench::{reference_image, stress_image};
use volley_engine::{CoreMemory, SpikeCore};
use volley_test_utils::{CollectingSink, MockFabric, TestClock};

fn load(mem: &CoreMemory) -> SpikeCore {
    SpikeCore::load(
        mem,
        Box::new(TestClock::new()),
        Box::new(MockFabric::new()),
        Box::new(CollectingSink::new()),
    )
    .unwrap()
}

fn bench_reference_tick(c: &mut Criterion) {
    let mut mem = reference_image(42);
    let mut core = load(&mem);
    c.bench_function("tick_100_fast_sources", |b| {
        b.iter(|| black_box(core.on_timer_tick(&mut mem).unwrap()));
    });
}

fn bench_stress_tick(c: &mut Criterion) {
    let mut mem = stress_image(42);
    let mut core = load(&mem);
    c.bench_function("tick_1000_mixed_sources", |b| {
        b.iter(|| black_box(core.on_timer_tick(&mut mem).unwrap()));
    });
}

criterion_group!(benches, bench_reference_tick, bench_stress_tick);
criterion_main!(benches);
