// Molding benchmark - measure resize + mean subtraction + batch stacking
//
// Run with: cargo bench --bench molding_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{ImageBuffer, Rgb, RgbImage};

use mrcnn_molding::{mold_inputs, resize_image, MoldConfig};

fn test_image(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            ((x + y) % 256) as u8,
            ((x * 2) % 256) as u8,
            ((y * 2) % 256) as u8,
        ])
    })
}

/// Benchmark aspect-preserving resize at typical camera resolutions
fn bench_resize_image(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize_image");

    let resolutions = vec![(640, 480, "640x480"), (1280, 720, "1280x720"), (1920, 1080, "1920x1080")];

    for (width, height, name) in resolutions {
        let image = test_image(width, height);

        group.bench_with_input(BenchmarkId::new("padded_1024", name), &image, |b, img| {
            b.iter(|| {
                let result = resize_image(black_box(img), 800, 1024, true);
                black_box(result);
            });
        });
    }

    group.finish();
}

/// Benchmark the full molding path for a small batch
fn bench_mold_inputs(c: &mut Criterion) {
    let config = MoldConfig {
        image_min_dim: 512,
        image_max_dim: 512,
        ..MoldConfig::default()
    };
    let images = vec![test_image(640, 480), test_image(1280, 720)];

    c.bench_function("mold_inputs/batch_of_2", |b| {
        b.iter(|| {
            let batch = mold_inputs(black_box(&images), &config).unwrap();
            black_box(batch);
        });
    });
}

criterion_group!(benches, bench_resize_image, bench_mold_inputs);
criterion_main!(benches);
