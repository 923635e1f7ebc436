//! Configuration for a convolution call.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default spectral floor used when estimating a kernel.
pub const DEFAULT_MIN_SHARP_SPECTRUM: f64 = 0.0025;

/// Domain in which the convolution is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Direct summation over the kernel footprint. Handles blank pixels and
    /// image edges, cost grows with the kernel area.
    #[default]
    Spatial,
    /// Zero-padded FFT product. Cost is independent of the kernel size but
    /// blank pixels are not allowed.
    Frequency,
}

/// Convolution parameters.
///
/// Missing fields take their [`Default`] values when deserializing, so a
/// document only needs to mention what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub domain: Domain,
    /// Divide each spatial-domain output pixel by the kernel weight that
    /// actually overlapped valid input, removing edge darkening.
    /// Ignored in the frequency domain.
    pub edge_correction: bool,
    /// Estimate a kernel of this radius by dividing the image spectrum by the
    /// spectrum of the sharp image passed as the kernel. Frequency domain only.
    pub make_kernel_radius: Option<usize>,
    /// Sharp image spectral bins with a magnitude at or below this floor are
    /// skipped when estimating a kernel. Must lie in `[0, 1]`.
    pub min_sharp_spectrum: f64,
    /// Rotate the kernel by 180 degrees before spatial convolution.
    pub kernel_flip: bool,
    /// Scale the kernel so its non-blank samples sum to one.
    pub kernel_normalize: bool,
    pub num_threads: usize,
    /// Return the amplitude images of the intermediate frequency-domain steps.
    pub keep_frequency_steps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: Domain::default(),
            edge_correction: true,
            make_kernel_radius: None,
            min_sharp_spectrum: DEFAULT_MIN_SHARP_SPECTRUM,
            kernel_flip: true,
            kernel_normalize: true,
            num_threads: rayon::current_num_threads(),
            keep_frequency_steps: false,
        }
    }
}

impl Config {
    /// Spatial domain with edge correction.
    pub fn spatial() -> Self {
        Self::default()
    }

    pub fn frequency() -> Self {
        Self {
            domain: Domain::Frequency,
            ..Self::default()
        }
    }

    /// Kernel estimation with the given radius.
    pub fn make_kernel(radius: usize) -> Self {
        Self {
            domain: Domain::Frequency,
            make_kernel_radius: Some(radius),
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Checks parameter ranges that do not depend on the images.
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(Error::InvalidConfig {
                reason: "num_threads must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.min_sharp_spectrum) {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "min_sharp_spectrum must be in [0, 1], got {}",
                    self.min_sharp_spectrum
                ),
            });
        }
        if let Some(radius) = self.make_kernel_radius {
            if self.domain != Domain::Frequency {
                return Err(Error::MakeKernelNeedsFrequency);
            }
            if radius == 0 {
                return Err(Error::MakeKernelRadius { radius, max: 0 });
            }
        }
        Ok(())
    }
}

/// Shared flag that asks a running convolution to stop.
///
/// Workers poll the flag between work items; a cancelled call returns
/// [`Error::Cancelled`] instead of a partial image.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
