//! Convolve - kernel convolution of astronomical images.
//!
//! This library convolves 1D, 2D and 3D images with odd-sized kernels:
//! - Spatial domain: direct summation that skips blank (NaN) pixels and can
//!   correct for the kernel weight lost at image edges
//! - Frequency domain: zero-padded FFT convolution for 1D and 2D images
//! - Kernel estimation: recovers the PSF that blurs a sharp image into a
//!   blurry one by dividing their spectra
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use convolve::{Config, Image, Kernel, convolve};
//!
//! let image = Image::new(&[height, width], pixels)?;
//! let kernel = Kernel::gaussian_2d(3.0, 3.0)?;
//!
//! let result = convolve(&image, kernel.image(), &Config::frequency())?;
//! println!("{:?}", result.image.dsize());
//! ```

pub mod config;
pub mod error;
pub mod frequency;
pub mod image;
pub mod kernel;
mod pipeline;
pub mod spatial;
pub mod thread_plan;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{CancelToken, Config, DEFAULT_MIN_SHARP_SPECTRUM, Domain};
pub use error::{Error, Result};
pub use frequency::{FrequencyConvolver, FrequencySteps};
pub use image::{BLANK, Image};
pub use kernel::Kernel;
pub use pipeline::{ConvolutionResult, convolve, convolve_with_cancel, prepare_kernel};
pub use spatial::convolve_spatial;
pub use thread_plan::ThreadPlan;
