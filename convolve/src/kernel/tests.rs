use super::*;
use crate::image::BLANK;

#[test]
fn test_new_rejects_even_axis() {
    let image = Image::zeros(&[3, 4]).unwrap();
    assert!(matches!(
        Kernel::new(image),
        Err(Error::EvenKernelAxis { axis: 1, size: 4 })
    ));
}

#[test]
fn test_center() {
    let kernel = Kernel::new(Image::zeros(&[3, 5, 7]).unwrap()).unwrap();
    assert_eq!(kernel.center(), vec![1, 2, 3]);
}

#[test]
fn test_normalized_sums_to_one() {
    let kernel = Kernel::from_data(&[3, 3], (1..=9).map(|v| v as f32).collect()).unwrap();
    let normalized = kernel.normalized().unwrap();
    let sum: f64 = normalized.data().iter().map(|&v| v as f64).sum();
    assert!((sum - 1.0).abs() < 1e-6, "sum = {sum}");
    // Original left untouched.
    assert_eq!(kernel.data()[8], 9.0);
}

#[test]
fn test_normalized_zeroes_blanks() {
    let kernel = Kernel::from_data(&[3], vec![1.0, BLANK, 3.0]).unwrap();
    let normalized = kernel.normalized().unwrap();
    assert_eq!(normalized.data(), &[0.25, 0.0, 0.75]);
}

#[test]
fn test_normalized_zero_sum_is_error() {
    let kernel = Kernel::from_data(&[3], vec![-1.0, 2.0, -1.0]).unwrap();
    assert!(matches!(
        kernel.normalized(),
        Err(Error::ZeroSum { what: "kernel" })
    ));
}

#[test]
fn test_flip_rotates_2d() {
    let kernel = Kernel::from_data(&[3, 3], (0..9).map(|v| v as f32).collect()).unwrap();
    let flipped = kernel.flipped();
    // Top-left moves to bottom-right, center stays.
    assert_eq!(flipped.image().get(&[2, 2]), 0.0);
    assert_eq!(flipped.image().get(&[0, 0]), 8.0);
    assert_eq!(flipped.image().get(&[1, 1]), 4.0);
    assert_eq!(flipped.image().get(&[0, 1]), 7.0);
}

#[test]
fn test_flip_twice_is_identity() {
    let data: Vec<f32> = (0..15).map(|v| (v as f32 * 0.37).sin()).collect();
    let kernel = Kernel::from_data(&[3, 5], data).unwrap();
    let restored = kernel.flipped().flipped();
    assert_eq!(
        kernel.data().iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
        restored.data().iter().map(|v| v.to_bits()).collect::<Vec<_>>()
    );
}

#[test]
fn test_gaussian_2d_properties() {
    let kernel = Kernel::gaussian_2d(3.0, 3.0).unwrap();
    let [h, w] = [kernel.dsize()[0], kernel.dsize()[1]];
    assert_eq!(h, w);
    assert_eq!(h % 2, 1);

    let sum: f64 = kernel.data().iter().map(|&v| v as f64).sum();
    assert!((sum - 1.0).abs() < 1e-5, "sum = {sum}");

    let center = kernel.image().get(&[h / 2, w / 2]);
    assert!(kernel.data().iter().all(|&v| v <= center));
    // Circular symmetry.
    assert_eq!(kernel.image().get(&[0, w / 2]), kernel.image().get(&[h / 2, 0]));
}

#[test]
fn test_gaussian_1d_width() {
    // sigma = 2.0 * 0.4247, radius = ceil(3 * 0.849) = 3
    let kernel = Kernel::gaussian_1d(2.0, 3.0).unwrap();
    assert_eq!(kernel.dsize(), &[7]);
}

#[test]
fn test_gaussian_rejects_bad_fwhm() {
    assert!(Kernel::gaussian_2d(0.0, 3.0).is_err());
    assert!(Kernel::gaussian_2d(f32::NAN, 3.0).is_err());
    assert!(Kernel::gaussian_1d(2.0, -1.0).is_err());
}

#[test]
fn test_identity() {
    let kernel = Kernel::identity(2).unwrap();
    assert_eq!(kernel.dsize(), &[1, 1]);
    assert_eq!(kernel.data(), &[1.0]);
}
