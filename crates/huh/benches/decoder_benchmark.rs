use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use huh::{decode_bytes, encode_to_writer, EncodeOptions, Metadata, NoProgress};
use image::{Rgb, RgbImage};
use std::hint::black_box;

fn encoded_gradient(size: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(size, size, |x, y| Rgb([x as u8, y as u8, (x ^ y) as u8]));
    let mut metadata = Metadata::new();
    metadata.insert("source".into(), "benchmark".into());
    encode_to_writer(
        Vec::new(),
        &image,
        &metadata,
        &EncodeOptions::default(),
        &mut NoProgress,
    )
    .expect("Failed to encode benchmark image")
}

fn legacy_gradient(size: u32) -> Vec<u8> {
    let mut data = size.to_le_bytes().to_vec();
    data.extend_from_slice(&size.to_le_bytes());
    for y in 0..size {
        for x in 0..size {
            data.extend_from_slice(&[x as u8, y as u8, (x ^ y) as u8]);
        }
    }
    data
}

fn bench_decode_current(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_current");

    for size in [64u32, 256, 1024] {
        let data = encoded_gradient(size);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{size}x{size}")),
            &data,
            |b, data| {
                b.iter(|| {
                    let result = decode_bytes(black_box(data));
                    assert!(result.is_ok());
                    result
                })
            },
        );
    }

    group.finish();
}

fn bench_decode_legacy(c: &mut Criterion) {
    let data = legacy_gradient(512);

    c.bench_function("decode_legacy_512x512", |b| {
        b.iter(|| {
            let result = decode_bytes(black_box(&data));
            assert!(result.is_ok());
            result
        })
    });
}

fn bench_to_rgba(c: &mut Criterion) {
    let container = decode_bytes(&encoded_gradient(512)).expect("Failed to decode");

    c.bench_function("to_rgba_512x512", |b| {
        b.iter(|| black_box(&container).to_rgba_image())
    });
}

criterion_group!(
    benches,
    bench_decode_current,
    bench_decode_legacy,
    bench_to_rgba
);
criterion_main!(benches);
