//! Tick-throughput benchmarks for common tree shapes.

use arbor_runtime::Blackboard;
use arbor_tree::{Builder, Status};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn deep_sequence(depth: usize) -> arbor_tree::Tree {
    let mut builder = Builder::new().sequence();
    for _ in 0..depth {
        builder = builder.action(|_: &Blackboard| Status::Success);
    }
    builder.end().unwrap().build().unwrap()
}

fn bench_sequence_tick(c: &mut Criterion) {
    let mut tree = deep_sequence(64);
    c.bench_function("sequence_64_leaves_tick", |b| {
        b.iter(|| black_box(tree.tick()))
    });
}

fn bench_selector_fallback(c: &mut Criterion) {
    let mut builder = Builder::new().selector();
    for _ in 0..63 {
        builder = builder.action(|_: &Blackboard| Status::Failure);
    }
    let mut tree = builder
        .action(|_: &Blackboard| Status::Success)
        .end()
        .unwrap()
        .build()
        .unwrap();
    c.bench_function("selector_64_fallback_tick", |b| {
        b.iter(|| black_box(tree.tick()))
    });
}

fn bench_blackboard_heavy_tick(c: &mut Criterion) {
    let mut tree = Builder::new()
        .sequence()
        .action(|bb: &Blackboard| {
            bb.set("a", 1_i64);
            bb.set("b", 2_i64);
            Status::Success
        })
        .action(|bb: &Blackboard| {
            let a = bb.get::<i64>("a").unwrap_or(0);
            let b = bb.get::<i64>("b").unwrap_or(0);
            bb.set("sum", a + b);
            Status::Success
        })
        .end()
        .unwrap()
        .build()
        .unwrap();
    c.bench_function("blackboard_heavy_tick", |b| b.iter(|| black_box(tree.tick())));
}

criterion_group!(
    benches,
    bench_sequence_tick,
    bench_selector_fallback,
    bench_blackboard_heavy_tick
);
criterion_main!(benches);
