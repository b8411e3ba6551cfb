//! Encode Pipeline Benchmarks
//!
//! Benchmarks for pixel normalization and GIF muxing.
//!
//! Run with: `cargo bench --bench encode_ops`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gifcast::{mux, normalize, Frame, MuxSettings, NormalizeOptions};

fn noisy_frame(size: u32, seed: u32) -> Frame {
    let data = (0..size * size * 4)
        .map(|i| (i.wrapping_mul(31).wrapping_add(seed * 17) % 256) as u8)
        .collect();
    Frame::new(data, size, size).unwrap()
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for size in [64u32, 256, 512] {
        let frame = noisy_frame(size, 0);
        for flatten in [true, false] {
            let options = NormalizeOptions {
                flatten_transparency: flatten,
                ..Default::default()
            };
            let label = format!("{size}px_flatten_{flatten}");
            group.bench_with_input(BenchmarkId::from_parameter(label), &frame, |bench, f| {
                bench.iter(|| black_box(normalize(f.clone(), &options).unwrap()));
            });
        }
    }

    group.finish();
}

fn bench_mux(c: &mut Criterion) {
    let mut group = c.benchmark_group("mux");
    group.sample_size(10);

    for speed in [1, 10, 30] {
        let settings = MuxSettings {
            frame_delay_ms: 33,
            loop_playback: true,
            quantizer_speed: speed,
        };
        let images: Vec<_> = (0..10)
            .map(|seed| normalize(noisy_frame(128, seed), &NormalizeOptions::default()).unwrap())
            .collect();

        group.bench_with_input(
            BenchmarkId::new("10x128px", format!("speed_{speed}")),
            &images,
            |bench, imgs| {
                bench.iter(|| black_box(mux(imgs.clone(), settings).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_mux);
criterion_main!(benches);
