//! Engine throughput by lane width, against the reference double hash.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use miner_core::{double_sha256, BlockHeader, Engine, HeaderTemplate, LaneWidth};

fn create_header() -> HeaderTemplate {
    HeaderTemplate::from(&BlockHeader {
        version: 0x2000_0000,
        prev_block_hash: [0x11; 32],
        merkle_root: [0x22; 32],
        reference_hash: [0x33; 32],
        time: 1_700_000_000,
        bits: 0x1d00ffff,
        nonce: 0,
    })
}

fn bench_lane_widths(c: &mut Criterion) {
    let engine = Engine::new(&create_header());
    let mut group = c.benchmark_group("engine_lanes");

    for width in [LaneWidth::One, LaneWidth::Two, LaneWidth::Three, LaneWidth::Four] {
        group.throughput(Throughput::Elements(width.count() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(width.count()),
            &width,
            |b, &width| {
                let mut base = 0u32;
                b.iter(|| {
                    let batch = engine.hash_batch(width, black_box(base));
                    base = base.wrapping_add(width.count() as u32);
                    batch
                })
            },
        );
    }

    group.finish();
}

fn bench_reference(c: &mut Criterion) {
    let mut header = create_header();
    let mut group = c.benchmark_group("reference");
    group.throughput(Throughput::Elements(1));

    group.bench_function("double_sha256_112_bytes", |b| {
        let mut nonce = 0u32;
        b.iter(|| {
            header.set_nonce(black_box(nonce));
            nonce = nonce.wrapping_add(1);
            double_sha256(header.as_bytes())
        })
    });

    group.bench_function("engine_setup", |b| {
        b.iter(|| Engine::new(black_box(&header)))
    });

    group.finish();
}

criterion_group!(benches, bench_lane_widths, bench_reference);
criterion_main!(benches);
