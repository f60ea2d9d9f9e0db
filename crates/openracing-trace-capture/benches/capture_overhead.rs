//! Benchmarks for capture overhead

use std::hint::black_box;
use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use openracing_trace_capture::{
    CaptureConfig, EventKind, LabelEncoding, Sample, TraceEncoder, TraceSession,
};

fn session(capacity: usize) -> Option<TraceSession> {
    let config = CaptureConfig::builder()
        .buffer_capacity(capacity)
        .build()
        .ok()?;
    TraceSession::new(config).ok()
}

fn bench_record(c: &mut Criterion) {
    let Some(session) = session(1024) else {
        return;
    };
    let Ok(mut recorder) = session.register_thread() else {
        return;
    };

    // Queued buffers are drained outside the timed region.
    c.bench_function("record_instant", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                black_box(recorder.instant(black_box("bench"), black_box("tick"))).ok();
            }
            let elapsed = start.elapsed();
            black_box(session.flush_alloc()).ok();
            elapsed
        })
    });

    c.bench_function("record_with_timestamp", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = Duration::ZERO;
            for ts in 0..iters {
                let sample = recorder.create_sample("bench", "tick", ts, EventKind::Begin);
                let start = Instant::now();
                black_box(recorder.record(sample)).ok();
                elapsed += start.elapsed();
            }
            black_box(session.flush_alloc()).ok();
            elapsed
        })
    });
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for count in [64usize, 1024, 16_384] {
        let samples: Vec<Sample> = (0..count as u64)
            .map(|ts| Sample::with_identity("physics", "integrate", ts, EventKind::Instant, 4242, 7))
            .collect();
        let encoder = TraceEncoder::new("bench", LabelEncoding::Escaped);
        let mut out = vec![0u8; encoder.output_size(&samples)];

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("output_size", count), &samples, |b, s| {
            b.iter(|| black_box(encoder.output_size(s)))
        });
        group.bench_with_input(BenchmarkId::new("encode_into", count), &samples, |b, s| {
            b.iter(|| black_box(encoder.encode_into(s, &mut out)).ok())
        });
    }
    group.finish();
}

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush_alloc");
    for buffers in [1usize, 16] {
        let Some(session) = session(1024) else {
            return;
        };
        group.throughput(Throughput::Elements((buffers * 1024) as u64));
        group.bench_function(BenchmarkId::from_parameter(buffers), |b| {
            b.iter_custom(|iters| {
                let mut elapsed = Duration::ZERO;
                for _ in 0..iters {
                    if let Ok(mut recorder) = session.register_thread() {
                        for _ in 0..buffers * 1024 {
                            recorder.instant("bench", "tick").ok();
                        }
                    }
                    let start = Instant::now();
                    black_box(session.flush_alloc()).ok();
                    elapsed += start.elapsed();
                }
                elapsed
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_record, bench_encode, bench_flush);

criterion_main!(benches);
