//! Convolution kernels.
//!
//! A [`Kernel`] is an [`Image`] whose every axis has odd length, so it has a
//! unique center pixel that maps to the "no shift" position of the
//! convolution. Preparation steps (blank removal, normalization, flipping)
//! return new kernels and leave the original untouched.

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use crate::image::Image;

/// FWHM = 2 * sqrt(2 * ln(2)) * sigma
const FWHM_TO_SIGMA: f32 = 0.424_660_9;

#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    image: Image,
}

impl Kernel {
    /// Validates that every axis of `image` is odd.
    pub fn new(image: Image) -> Result<Self> {
        if let Some((axis, &size)) = image.dsize().iter().enumerate().find(|(_, n)| *n % 2 == 0) {
            return Err(Error::EvenKernelAxis { axis, size });
        }
        Ok(Self { image })
    }

    /// Builds a kernel from raw samples, see [`Image::new`].
    pub fn from_data(dsize: &[usize], data: Vec<f32>) -> Result<Self> {
        Self::new(Image::new(dsize, data)?)
    }

    /// The 1x1 kernel that leaves an image unchanged.
    pub fn identity(ndim: usize) -> Result<Self> {
        Self::from_data(&vec![1; ndim], vec![1.0])
    }

    /// Normalized 1D Gaussian with width `2 * ceil(truncation * sigma) + 1`.
    pub fn gaussian_1d(fwhm: f32, truncation: f32) -> Result<Self> {
        let weights = gaussian_weights(fwhm, truncation)?;
        let total: f32 = weights.iter().sum();
        let len = weights.len();
        Self::from_data(&[len], weights.into_iter().map(|w| w / total).collect())
    }

    /// Normalized circular 2D Gaussian, the separable product of two
    /// [`Kernel::gaussian_1d`] profiles.
    pub fn gaussian_2d(fwhm: f32, truncation: f32) -> Result<Self> {
        let weights = gaussian_weights(fwhm, truncation)?;
        let len = weights.len();
        let mut data = Vec::with_capacity(len * len);
        for &wy in &weights {
            data.extend(weights.iter().map(|&wx| wy * wx));
        }
        let total: f32 = data.iter().sum();
        data.iter_mut().for_each(|v| *v /= total);
        Self::from_data(&[len, len], data)
    }

    #[inline]
    pub fn image(&self) -> &Image {
        &self.image
    }

    #[inline]
    pub fn into_image(self) -> Image {
        self.image
    }

    #[inline]
    pub fn dsize(&self) -> &[usize] {
        self.image.dsize()
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.image.ndim()
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        self.image.data()
    }

    /// Coordinates of the center pixel.
    pub fn center(&self) -> Vec<usize> {
        self.dsize().iter().map(|n| n / 2).collect()
    }

    /// Copy with every blank sample replaced by zero.
    pub fn with_blanks_zeroed(&self) -> Self {
        let mut image = self.image.clone();
        image
            .data_mut()
            .iter_mut()
            .filter(|v| v.is_nan())
            .for_each(|v| *v = 0.0);
        Self { image }
    }

    /// Copy with blanks zeroed and the remaining samples scaled to sum to one.
    pub fn normalized(&self) -> Result<Self> {
        let mut kernel = self.with_blanks_zeroed();
        let sum = kernel.image.sum_non_blank();
        if sum == 0.0 {
            return Err(Error::ZeroSum { what: "kernel" });
        }
        kernel
            .image
            .data_mut()
            .iter_mut()
            .for_each(|v| *v = (*v as f64 / sum) as f32);
        Ok(kernel)
    }

    /// Copy rotated by 180 degrees on every axis.
    ///
    /// For a row-major buffer this is a plain reversal of the sample order.
    pub fn flipped(&self) -> Self {
        let mut image = self.image.clone();
        image.data_mut().reverse();
        Self { image }
    }
}

fn gaussian_weights(fwhm: f32, truncation: f32) -> Result<Vec<f32>> {
    if !(fwhm > 0.0 && fwhm.is_finite()) {
        return Err(Error::InvalidConfig {
            reason: format!("Gaussian FWHM must be positive, got {fwhm}"),
        });
    }
    if !(truncation > 0.0 && truncation.is_finite()) {
        return Err(Error::InvalidConfig {
            reason: format!("Gaussian truncation must be positive, got {truncation}"),
        });
    }

    let sigma = fwhm * FWHM_TO_SIGMA;
    let radius = (truncation * sigma).ceil() as usize;
    let two_sigma_sq = 2.0 * sigma * sigma;

    Ok((0..2 * radius + 1)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / two_sigma_sq).exp()
        })
        .collect())
}
