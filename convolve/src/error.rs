//! Error types for convolution.

use thiserror::Error;

/// Errors reported before (or instead of) producing a convolved image.
///
/// Everything except [`Error::Cancelled`] is detected while validating the
/// inputs, before any worker thread is spawned.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported dimensionality: {ndim} (only 1, 2 or 3 axes are supported)")]
    UnsupportedDimensions { ndim: usize },

    #[error("Axis {axis} has zero length")]
    EmptyAxis { axis: usize },

    #[error("Buffer length mismatch: dimensions {dsize:?} need {expected} samples, got {actual}")]
    DataLength {
        dsize: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Kernel axis {axis} has even length {size}; every kernel axis must be odd")]
    EvenKernelAxis { axis: usize, size: usize },

    #[error("Image has {image} dimensions but the kernel has {kernel}")]
    DimensionMismatch { image: usize, kernel: usize },

    #[error("Frequency domain convolution supports 1D and 2D images, got {ndim}D")]
    FrequencyDimensions { ndim: usize },

    #[error(
        "Image has {count} blank pixels; frequency domain convolution cannot account for missing data, use the spatial domain"
    )]
    BlankInFrequencyDomain { count: usize },

    #[error("Kernel estimation (make-kernel) is only possible in the frequency domain")]
    MakeKernelNeedsFrequency,

    #[error("Kernel estimation (make-kernel) needs 2D images, got {ndim}D")]
    MakeKernelDimensions { ndim: usize },

    #[error("Sharp image dimensions {sharp:?} differ from blurry image dimensions {blurry:?}")]
    MakeKernelShapeMismatch {
        blurry: Vec<usize>,
        sharp: Vec<usize>,
    },

    #[error("Kernel estimation radius {radius} out of range, must be in 1..={max}")]
    MakeKernelRadius { radius: usize, max: usize },

    #[error("Cannot normalize the {what}: sum of its non-blank pixels is zero")]
    ZeroSum { what: &'static str },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Failed to build worker thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Convolution was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
