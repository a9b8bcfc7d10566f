use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use facemorph_engine::{FaceMorph, MorphConfig, MorphImage};
use facemorph_geometry::{LandmarkLayout, Point2};
use facemorph_image::{PixelBuffer, PixelFormat};
use std::hint::black_box;

// a ring of points around the image center, standing in for detected landmarks
fn ring(size: usize, num_points: usize, radius: f32) -> Vec<Point2> {
    let c = size as f32 / 2.0;
    (0..num_points)
        .map(|i| {
            let a = i as f32 / num_points as f32 * std::f32::consts::TAU;
            let r = radius * size as f32 * (0.6 + 0.4 * ((i % 5) as f32 / 4.0));
            Point2::new(c + r * a.cos(), c + r * a.sin())
        })
        .collect()
}

fn bench_morph(c: &mut Criterion) {
    let mut group = c.benchmark_group("Morph");

    for size in [256, 512].iter() {
        let config = MorphConfig {
            layout: LandmarkLayout {
                left_eye: 0,
                right_eye: 10,
                nose: 20,
            },
            ..Default::default()
        };
        let mut morph = FaceMorph::with_cpu_backend(config);

        let pixels =
            PixelBuffer::new([*size, *size].into(), PixelFormat::Rgb8, vec![90; size * size * 3])
                .unwrap();
        morph
            .set_source(MorphImage::new(pixels.clone(), ring(*size, 68, 0.3)).unwrap())
            .unwrap();
        morph
            .set_destination(MorphImage::new(pixels, ring(*size, 68, 0.25)).unwrap())
            .unwrap();

        group.bench_with_input(BenchmarkId::new("render", size), &0.5f32, |b, t| {
            b.iter(|| black_box(morph.render(black_box(*t)).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_morph);
criterion_main!(benches);
