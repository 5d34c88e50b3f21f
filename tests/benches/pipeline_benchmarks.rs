//! # Signing Pipeline Benchmarks
//!
//! | Area | What is measured |
//! |------|------------------|
//! | Event filter | Per-event dispatch decision |
//! | Error classifier | Raw failure to taxonomy |
//! | Full run | Start to terminal outcome with no device or network delay |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_types::{DeviceFailure, SigningEvent};
use signing_pipeline::{classify, dispatch, PipelineConfig, SigningPipeline};
use signing_tests::fixtures::{signed_operation, Harness};
use signing_runtime::adapters::DeviceScript;
use std::time::Duration;

// ============================================================================
// Event filter
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("event-filter");

    for chunks in [16u32, 256, 4096] {
        let events: Vec<_> = (0..=chunks)
            .map(|index| SigningEvent::streaming(f64::from(index) / f64::from(chunks), index, chunks))
            .collect();

        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_with_input(BenchmarkId::new("streaming", chunks), &events, |b, events| {
            b.iter(|| {
                for event in events {
                    black_box(dispatch(event.clone(), |_| true));
                }
            })
        });
    }
    group.finish();
}

// ============================================================================
// Error classifier
// ============================================================================

fn bench_classify(c: &mut Criterion) {
    let failures = [
        DeviceFailure::user_refused(),
        DeviceFailure::Disconnected {
            path: "hid://bench".into(),
        },
        DeviceFailure::Transport("HID write failed".into()),
        DeviceFailure::Status {
            status_code: 0x6a80,
            message: "Invalid data".into(),
        },
    ];

    c.bench_function("classify", |b| {
        b.iter(|| {
            for failure in &failures {
                black_box(classify(failure));
            }
        })
    });
}

// ============================================================================
// Full run
// ============================================================================

fn bench_full_run(c: &mut Criterion) {
    let Ok(runtime) = tokio::runtime::Builder::new_multi_thread().enable_all().build() else {
        return;
    };
    let pipeline = SigningPipeline::new(
        PipelineConfig::default().with_min_broadcast_duration(Duration::ZERO),
    );

    let mut group = c.benchmark_group("full-run");
    for chunks in [4u32, 64] {
        group.bench_with_input(BenchmarkId::new("approve", chunks), &chunks, |b, &chunks| {
            b.iter(|| {
                runtime.block_on(async {
                    let script = DeviceScript::new()
                        .streaming(chunks, Duration::ZERO)
                        .event(
                            Duration::ZERO,
                            SigningEvent::Signed {
                                signed_operation: signed_operation(),
                            },
                        );
                    let harness = Harness::accepting(script, Duration::ZERO);
                    black_box(harness.args().start(&pipeline).outcome().await)
                })
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dispatch, bench_classify, bench_full_run);
criterion_main!(benches);
