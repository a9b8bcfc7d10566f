use criterion::{criterion_group, criterion_main, Criterion};
use facemorph_image::{rgba8_from_rgba_f32, rgba_from_pixels, PixelBuffer, PixelFormat};
use std::hint::black_box;

fn sample_pixels() -> PixelBuffer {
    PixelBuffer::new([1920, 1080].into(), PixelFormat::Bgr8, vec![127; 1920 * 1080 * 3]).unwrap()
}

fn bench_image(c: &mut Criterion) {
    let mut group = c.benchmark_group("Image");

    group.bench_function("rgba_from_bgr8", |b| {
        b.iter_batched(
            sample_pixels,
            |pixels| rgba_from_pixels(black_box(&pixels)).unwrap(),
            criterion::BatchSize::LargeInput,
        )
    });

    group.bench_function("rgba8_from_rgba_f32", |b| {
        b.iter_batched(
            || rgba_from_pixels(&sample_pixels()).unwrap(),
            |image| rgba8_from_rgba_f32(black_box(&image)).unwrap(),
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_image);
criterion_main!(benches);
