//! Benchmark for spatial vs frequency domain convolution.

use std::hint::black_box;

use convolve::{Config, Image, Kernel, convolve};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn test_image(size: usize) -> Image {
    Image::from_fn(&[size, size], |c| {
        let (y, x) = (c[0] as f32, c[1] as f32);
        (0.37 * x).sin() * (0.23 * y).cos() + 1.0
    })
    .unwrap()
}

fn benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("convolve_512");
    let image = test_image(512);

    for fwhm in [2.0f32, 6.0, 12.0] {
        let kernel = Kernel::gaussian_2d(fwhm, 3.0).unwrap().into_image();
        let width = kernel.dsize()[0];

        group.bench_with_input(BenchmarkId::new("spatial", width), &kernel, |b, kernel| {
            b.iter(|| convolve(black_box(&image), kernel, &Config::spatial()).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("frequency", width), &kernel, |b, kernel| {
            b.iter(|| convolve(black_box(&image), kernel, &Config::frequency()).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
