//! Testing utilities.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::image::Image;

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Uniform noise in `[0, 1)`, reproducible through `seed`.
pub fn noise_image(dsize: &[usize], seed: u64) -> Image {
    let mut rng = StdRng::seed_from_u64(seed);
    Image::from_fn(dsize, |_| rng.random::<f32>()).unwrap()
}

pub fn constant_image(dsize: &[usize], value: f32) -> Image {
    Image::from_fn(dsize, |_| value).unwrap()
}

/// Zero 2D image with unit point sources at `points` (row, column).
pub fn point_sources(height: usize, width: usize, points: &[(usize, usize)]) -> Image {
    let mut image = Image::zeros(&[height, width]).unwrap();
    for &(y, x) in points {
        image.data_mut()[y * width + x] += 1.0;
    }
    image
}

/// Largest absolute difference between two same-sized images.
pub fn max_abs_diff(a: &Image, b: &Image) -> f32 {
    assert_eq!(a.dsize(), b.dsize(), "dimension mismatch");
    a.data()
        .iter()
        .zip(b.data())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

/// Pixels `(row, column)` of a 2D image at least `margin` away from every edge.
pub fn interior(image: &Image, margin: usize) -> impl Iterator<Item = (usize, usize)> {
    let (h, w) = (image.dsize()[0], image.dsize()[1]);
    (margin..h - margin).flat_map(move |y| (margin..w - margin).map(move |x| (y, x)))
}
