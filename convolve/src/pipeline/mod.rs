//! Top-level convolution entry points.
//!
//! Validates the configuration and inputs, prepares the kernel, and
//! dispatches to the spatial or frequency domain convolver:
//!
//! - Normal mode: the kernel must have odd axes and the image's
//!   dimensionality. Blank kernel samples become zero, the kernel is
//!   normalized and, for the spatial domain, flipped so that both domains
//!   compute the same convolution.
//! - Kernel estimation (`make_kernel_radius`): the `kernel` argument is the
//!   sharp reference image. Both images are scaled to unit sum so their
//!   zero-frequency bins match before the spectra are divided.


use crate::config::{CancelToken, Config, Domain};
use crate::error::{Error, Result};
use crate::frequency::{self, FrequencyConvolver, FrequencySteps};
use crate::image::Image;
use crate::kernel::Kernel;
use crate::spatial::convolve_spatial;

/// Output of [`convolve`].
#[derive(Debug, Clone)]
pub struct ConvolutionResult {
    /// Convolved image, or the estimated kernel in kernel estimation mode.
    /// Pixels without any valid input in their footprint are blank.
    pub image: Image,
    /// Intermediate frequency domain amplitudes, when requested.
    pub frequency_steps: Option<FrequencySteps>,
}

/// Convolves `image` with `kernel` according to `config`.
///
/// All configuration and shape errors are reported before any worker thread
/// starts.
pub fn convolve(image: &Image, kernel: &Image, config: &Config) -> Result<ConvolutionResult> {
    convolve_with_cancel(image, kernel, config, &CancelToken::new())
}

/// Like [`convolve`], stopping early with [`Error::Cancelled`] once `cancel`
/// is triggered.
pub fn convolve_with_cancel(
    image: &Image,
    kernel: &Image,
    config: &Config,
    cancel: &CancelToken,
) -> Result<ConvolutionResult> {
    config.validate()?;

    tracing::info!(
        domain = ?config.domain,
        image = ?image.dsize(),
        kernel = ?kernel.dsize(),
        threads = config.num_threads,
        make_kernel = ?config.make_kernel_radius,
        "Convolving"
    );

    let (output, frequency_steps) = match config.make_kernel_radius {
        Some(radius) => estimate_kernel(image, kernel, radius, config, cancel)?,
        None => {
            let kernel = prepare_kernel(image, kernel, config)?;
            match config.domain {
                Domain::Spatial => {
                    let output = convolve_spatial(
                        image,
                        &kernel,
                        config.edge_correction,
                        config.num_threads,
                        cancel,
                    )?;
                    (output, None)
                }
                Domain::Frequency => {
                    frequency::validate_convolve(image, &kernel)?;
                    FrequencyConvolver::new(
                        config.num_threads,
                        config.keep_frequency_steps,
                        cancel,
                    )?
                    .convolve(image, &kernel)?
                }
            }
        }
    };

    let blanks = output.blank_count();
    if blanks > 0 {
        tracing::warn!(blanks, "Output pixels without valid input coverage set to blank");
    }

    Ok(ConvolutionResult {
        image: output,
        frequency_steps,
    })
}

/// Validates `kernel` and applies the blank removal, normalization and flip
/// requested by `config`.
pub fn prepare_kernel(image: &Image, kernel: &Image, config: &Config) -> Result<Kernel> {
    if kernel.ndim() != image.ndim() {
        return Err(Error::DimensionMismatch {
            image: image.ndim(),
            kernel: kernel.ndim(),
        });
    }

    let kernel = Kernel::new(kernel.clone())?;
    let kernel = if config.kernel_normalize {
        kernel.normalized()?
    } else {
        kernel.with_blanks_zeroed()
    };

    // The spectral product already realises the flipped-kernel sum.
    if config.kernel_flip && config.domain == Domain::Spatial {
        Ok(kernel.flipped())
    } else {
        Ok(kernel)
    }
}

fn estimate_kernel(
    blurry: &Image,
    sharp: &Image,
    radius: usize,
    config: &Config,
    cancel: &CancelToken,
) -> Result<(Image, Option<FrequencySteps>)> {
    frequency::validate_make_kernel(blurry, sharp, radius)?;
    let blurry = unit_sum(blurry, "blurry image")?;
    let sharp = unit_sum(sharp, "sharp image")?;

    FrequencyConvolver::new(config.num_threads, config.keep_frequency_steps, cancel)?
        .make_kernel(&blurry, &sharp, radius, config.min_sharp_spectrum)
}

fn unit_sum(image: &Image, what: &'static str) -> Result<Image> {
    let sum = image.sum_non_blank();
    if sum == 0.0 {
        return Err(Error::ZeroSum { what });
    }
    let data = image
        .data()
        .iter()
        .map(|&v| (v as f64 / sum) as f32)
        .collect();
    Image::new(image.dsize(), data)
}
