use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rate_bench::{
    Dispatcher, InMemoryStore, LatencyCutoff, Metrics, PayloadGenerator, RateLimiter,
    RateLimiterConfig, SystemClock, WindowRateLimiter, WriteStore,
};
use std::sync::Arc;
use std::time::Duration;

fn limiter(rate: u32) -> WindowRateLimiter {
    let config = RateLimiterConfig::new(rate, Duration::from_secs(3600)).unwrap();
    WindowRateLimiter::new(config, Arc::new(SystemClock::new()))
}

/// Benchmark single-threaded admission decisions
fn bench_single_threaded_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_threaded");
    group.throughput(Throughput::Elements(1000));

    for rate in [10u32, 1000, 1_000_000].iter() {
        group.bench_with_input(BenchmarkId::new("allow_request", rate), rate, |b, &rate| {
            let limiter = limiter(rate);
            b.iter(|| {
                for _ in 0..1000 {
                    black_box(limiter.allow_request());
                }
                limiter.reset_window();
            })
        });
    }

    group.finish();
}

/// Benchmark admission under contention on the window lock
fn bench_concurrent_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");

    for num_threads in [2, 4, 8].iter() {
        group.throughput(Throughput::Elements((*num_threads as u64) * 1000));

        group.bench_with_input(
            BenchmarkId::new("threads", num_threads),
            num_threads,
            |b, &num_threads| {
                b.iter(|| {
                    let limiter = Arc::new(limiter(500));

                    let mut handles = vec![];
                    for _ in 0..num_threads {
                        let limiter = Arc::clone(&limiter);
                        handles.push(std::thread::spawn(move || {
                            for _ in 0..1000 {
                                black_box(limiter.allow_request());
                            }
                        }));
                    }

                    for handle in handles {
                        handle.join().unwrap();
                    }
                })
            },
        );
    }

    group.finish();
}

/// Benchmark lock-free metrics recording
fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("record_completion", |b| {
        let metrics = Metrics::new();
        b.iter(|| {
            for i in 0..1000u64 {
                metrics.record_completion(black_box(Duration::from_micros(i)));
            }
        })
    });

    group.bench_function("snapshot", |b| {
        let metrics = Metrics::new();
        metrics.record_completion(Duration::from_millis(3));
        b.iter(|| black_box(metrics.snapshot()))
    });

    group.finish();
}

/// Benchmark payload generation
fn bench_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload");

    for value_length in [10usize, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("generate", value_length),
            value_length,
            |b, &value_length| {
                let generator = PayloadGenerator::new(5, value_length);
                let mut rng = StdRng::seed_from_u64(7);
                b.iter(|| black_box(generator.generate(&mut rng)))
            },
        );
    }

    group.finish();
}

/// Benchmark a full fanout against the in-memory store
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    for fanout in [100usize, 1000].iter() {
        group.throughput(Throughput::Elements(*fanout as u64));

        group.bench_with_input(BenchmarkId::new("fanout", fanout), fanout, |b, &fanout| {
            let store = Arc::new(InMemoryStore::default());
            runtime.block_on(store.provision()).unwrap();

            b.iter(|| {
                let dispatcher = Dispatcher::new(
                    Arc::new(limiter(fanout as u32 / 2)),
                    Metrics::new(),
                    LatencyCutoff::default(),
                );
                let store: Arc<dyn WriteStore> = store.clone();
                black_box(
                    runtime
                        .block_on(dispatcher.run_writes(fanout, store, PayloadGenerator::default()))
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_threaded_admission,
    bench_concurrent_admission,
    bench_metrics,
    bench_payload,
    bench_dispatch
);
criterion_main!(benches);
