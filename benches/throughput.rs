use criterion::{black_box, criterion_group, criterion_main, Criterion};
use line_pipeline::{Identity, PipelineBuilder};
use std::time::Duration;

fn run_identity_pipeline(stages: usize, capacity: usize, records: usize) {
    let mut builder = PipelineBuilder::new(capacity);
    for i in 0..stages {
        builder = builder.add_stage(format!("stage{}", i), Box::new(Identity));
    }
    let mut pipeline = builder.build().expect("Build failed");
    pipeline.wire();

    for i in 0..records {
        let _ = pipeline.feed(black_box(format!("record-{:08}", i)));
    }
    pipeline.close().expect("Close failed");
    pipeline.drain_and_wait().expect("Drain failed");
    pipeline.teardown();
}

fn benchmark_single_stage_throughput(c: &mut Criterion) {
    c.bench_function("single_stage_1000_records", |b| {
        b.iter(|| run_identity_pipeline(1, 1000, 1000));
    });
}

fn benchmark_three_stage_throughput(c: &mut Criterion) {
    c.bench_function("three_stage_1000_records", |b| {
        b.iter(|| run_identity_pipeline(3, 1000, 1000));
    });
}

fn benchmark_small_queues(c: &mut Criterion) {
    c.bench_function("three_stage_capacity_1_1000_records", |b| {
        b.iter(|| run_identity_pipeline(3, 1, 1000));
    });
}

fn benchmark_builtin_chain(c: &mut Criterion) {
    c.bench_function("builtin_chain_1000_records", |b| {
        b.iter(|| {
            let mut pipeline = PipelineBuilder::new(64)
                .add_named("uppercaser")
                .add_named("rotator")
                .add_named("flipper")
                .add_named("expander")
                .build()
                .expect("Build failed");
            pipeline.wire();
            for i in 0..1000 {
                let _ = pipeline.feed(black_box(format!("the quick brown fox {}", i)));
            }
            pipeline.close().expect("Close failed");
            pipeline.drain_and_wait().expect("Drain failed");
            pipeline.teardown();
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = benchmark_single_stage_throughput, benchmark_three_stage_throughput,
        benchmark_small_queues, benchmark_builtin_chain
);
criterion_main!(benches);
