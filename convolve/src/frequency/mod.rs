//! Frequency domain convolution and kernel estimation.
//!
//! Both images are zero-padded into complex buffers large enough that the
//! circular convolution of the DFT does not wrap around, transformed with
//! row-then-column 1D FFTs, combined bin by bin and transformed back:
//!
//! 1. Pad image and kernel to `ps0 x ps1` (even sizes).
//! 2. Forward FFT of both buffers (row pass, then column pass).
//! 3. Multiply the spectra, or divide them when estimating a kernel.
//! 4. Inverse FFT of the combined buffer.
//! 5. Keep the real part, crop the padding, snap round-off noise to zero.
//!
//! When estimating a kernel the quotient is centered on the padded grid, cut
//! to a disc of the requested radius and renormalized to unit sum.


mod fft;

use common::{DisjointMut, FloatExt};
use rayon::prelude::*;
use rustfft::FftDirection;
use rustfft::num_complex::Complex64;

use crate::config::CancelToken;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::kernel::Kernel;
use crate::thread_plan::ThreadPlan;
use fft::FftContext;

/// Padded samples with a smaller magnitude are FFT round-off and become zero.
pub const ROUNDOFF_THRESHOLD: f64 = 1e-10;

/// A correctly normalized kernel has no spectral bin above unit magnitude.
/// Quotients larger than this come from ill-conditioned bins and are dropped.
const MAX_KERNEL_SPECTRUM: f64 = 1.00001;

/// Elements per rayon task for the bin-wise passes.
const CHUNK_SIZE: usize = 4096;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Amplitude images of the intermediate frequency domain buffers, all of the
/// padded size `ps0 x ps1`.
#[derive(Debug, Clone)]
pub struct FrequencySteps {
    pub image_spectrum: Image,
    pub kernel_spectrum: Image,
    pub combined_spectrum: Image,
    /// Real part after the inverse transform, before cropping.
    pub padded_spatial: Image,
}

/// Runs FFT-based convolutions on a fixed number of threads.
pub struct FrequencyConvolver<'a> {
    num_threads: usize,
    pool: rayon::ThreadPool,
    keep_steps: bool,
    cancel: &'a CancelToken,
}

impl<'a> FrequencyConvolver<'a> {
    pub fn new(num_threads: usize, keep_steps: bool, cancel: &'a CancelToken) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("spectrum-{i}"))
            .build()?;
        Ok(Self {
            num_threads,
            pool,
            keep_steps,
            cancel,
        })
    }

    /// Convolves `image` with `kernel` (used as given, no flip).
    ///
    /// The output has the dimensions of `image`.
    pub fn convolve(
        &self,
        image: &Image,
        kernel: &Kernel,
    ) -> Result<(Image, Option<FrequencySteps>)> {
        validate_convolve(image, kernel)?;

        let [h, w] = shape2(image.dsize());
        let [kh, kw] = shape2(kernel.dsize());
        let ctx = FftContext::new(padded(h + kh - 1), padded(w + kw - 1));
        tracing::debug!(
            image = ?[h, w],
            kernel = ?[kh, kw],
            padded = ?[ctx.rows(), ctx.cols()],
            "frequency convolution"
        );

        let mut buffers = [
            pad_complex(image.data(), [h, w], &ctx),
            pad_complex(kernel.data(), [kh, kw], &ctx),
        ];
        self.transform(&ctx, &mut buffers, FftDirection::Forward)?;
        let spectra = self.spectrum_steps(&buffers, &ctx);

        let [image_spectrum, kernel_spectrum] = &mut buffers;
        self.combine(image_spectrum, kernel_spectrum, |a, b| a * b);
        let combined = self.amplitude_step(image_spectrum, &ctx);

        let mut combined_buffer = [std::mem::take(image_spectrum)];
        self.transform(&ctx, &mut combined_buffer, FftDirection::Inverse)?;
        let [spatial] = combined_buffer;
        let real: Vec<f64> = spatial.iter().map(|c| c.re).collect();

        let output = crop(&real, ctx.cols(), [kh / 2, kw / 2], [h, w]);
        let steps = self.collect_steps(spectra, combined, &real, &ctx);
        Ok((Image::new(image.dsize(), output)?, steps))
    }

    /// Estimates the kernel that blurs `sharp` into `blurry`.
    ///
    /// Both images must be 2D, of equal size, free of blanks, and normalized
    /// to unit sum so their zero-frequency bins are both one. The result is a
    /// `(2 * radius - 1)` square kernel summing to one.
    pub fn make_kernel(
        &self,
        blurry: &Image,
        sharp: &Image,
        radius: usize,
        min_sharp_spectrum: f64,
    ) -> Result<(Image, Option<FrequencySteps>)> {
        validate_make_kernel(blurry, sharp, radius)?;

        let [h, w] = shape2(blurry.dsize());
        let ctx = FftContext::new(padded(h), padded(w));
        tracing::debug!(
            image = ?[h, w],
            padded = ?[ctx.rows(), ctx.cols()],
            radius,
            min_sharp_spectrum,
            "kernel estimation"
        );

        let mut buffers = [
            pad_complex(blurry.data(), [h, w], &ctx),
            pad_complex(sharp.data(), [h, w], &ctx),
        ];
        self.transform(&ctx, &mut buffers, FftDirection::Forward)?;
        let spectra = self.spectrum_steps(&buffers, &ctx);

        let [blurry_spectrum, sharp_spectrum] = &mut buffers;
        self.combine(blurry_spectrum, sharp_spectrum, |a, b| {
            divide_spectrum(a, b, min_sharp_spectrum)
        });
        let combined = self.amplitude_step(blurry_spectrum, &ctx);

        let mut combined_buffer = [std::mem::take(blurry_spectrum)];
        self.transform(&ctx, &mut combined_buffer, FftDirection::Inverse)?;
        let [spatial] = combined_buffer;
        let real: Vec<f64> = spatial.iter().map(|c| c.re).collect();

        let centered = recenter(&real, ctx.rows(), ctx.cols(), radius);
        let width = 2 * radius - 1;
        let origin = [ctx.rows() / 2 - radius, ctx.cols() / 2 - radius];
        let output = crop(&centered, ctx.cols(), origin, [width, width]);

        let steps = self.collect_steps(spectra, combined, &real, &ctx);
        Ok((Image::new(&[width, width], output)?, steps))
    }

    /// Row pass then column pass over every buffer, each pass on its own
    /// [`ThreadPlan`]. The forward direction is unnormalized.
    fn transform(
        &self,
        ctx: &FftContext,
        buffers: &mut [Vec<Complex64>],
        direction: FftDirection,
    ) -> Result<()> {
        let (rows, cols) = (ctx.rows(), ctx.cols());
        let multiplier = buffers.len();
        let views: Vec<DisjointMut<'_, Complex64>> =
            buffers.iter_mut().map(|b| DisjointMut::new(b)).collect();
        let workspaces = ctx.workspaces(self.num_threads.min(multiplier * rows.max(cols)));

        let row_plan = ThreadPlan::distribute(multiplier * rows, self.num_threads);
        row_plan.run("fft-rows", |thread, indices| {
            let mut workspace = workspaces[thread].lock();
            for index in indices {
                if self.cancel.is_cancelled() {
                    return;
                }
                let (buffer, row) = (index / rows, index % rows);
                // SAFETY: each (buffer, row) pair is owned by one thread in this pass.
                let line = unsafe { views[buffer].slice_mut(row * cols, cols) };
                ctx.process_row(line, &mut workspace, direction);
            }
        });
        self.cancel.check()?;

        let col_plan = ThreadPlan::distribute(multiplier * cols, self.num_threads);
        col_plan.run("fft-columns", |thread, indices| {
            let mut workspace = workspaces[thread].lock();
            for index in indices {
                if self.cancel.is_cancelled() {
                    return;
                }
                let (buffer, col) = (index / cols, index % cols);
                let view = &views[buffer];
                // SAFETY: each (buffer, column) pair is owned by one thread in this pass.
                ctx.process_column(
                    &mut workspace,
                    direction,
                    |i| unsafe { view.read(i * cols + col) },
                    |i, c| unsafe { view.write(i * cols + col, c) },
                );
            }
        });
        self.cancel.check()
    }

    /// Replaces every bin of `target` with `op(target, other)`.
    fn combine<F>(&self, target: &mut [Complex64], other: &[Complex64], op: F)
    where
        F: Fn(Complex64, Complex64) -> Complex64 + Sync,
    {
        self.pool.install(|| {
            target
                .par_chunks_mut(CHUNK_SIZE)
                .zip(other.par_chunks(CHUNK_SIZE))
                .for_each(|(target, other)| {
                    for (a, &b) in target.iter_mut().zip(other) {
                        *a = op(*a, b);
                    }
                });
        });
    }

    fn amplitude_step(&self, buffer: &[Complex64], ctx: &FftContext) -> Option<Image> {
        if !self.keep_steps {
            return None;
        }
        let amplitude: Vec<f32> = self
            .pool
            .install(|| buffer.par_iter().map(|c| c.norm() as f32).collect());
        Image::new(&[ctx.rows(), ctx.cols()], amplitude).ok()
    }

    fn spectrum_steps(
        &self,
        buffers: &[Vec<Complex64>; 2],
        ctx: &FftContext,
    ) -> Option<(Image, Image)> {
        Some((
            self.amplitude_step(&buffers[0], ctx)?,
            self.amplitude_step(&buffers[1], ctx)?,
        ))
    }

    fn collect_steps(
        &self,
        spectra: Option<(Image, Image)>,
        combined: Option<Image>,
        real: &[f64],
        ctx: &FftContext,
    ) -> Option<FrequencySteps> {
        let (image_spectrum, kernel_spectrum) = spectra?;
        let padded_spatial =
            Image::new(&[ctx.rows(), ctx.cols()], real.iter().map(|&v| v as f32).collect())
                .ok()?;
        Some(FrequencySteps {
            image_spectrum,
            kernel_spectrum,
            combined_spectrum: combined?,
            padded_spatial,
        })
    }
}

/// Checks the inputs of [`FrequencyConvolver::convolve`] without touching
/// any thread.
pub(crate) fn validate_convolve(image: &Image, kernel: &Kernel) -> Result<()> {
    check_frequency_input(image)?;
    if kernel.ndim() != image.ndim() {
        return Err(Error::DimensionMismatch {
            image: image.ndim(),
            kernel: kernel.ndim(),
        });
    }
    Ok(())
}

/// Checks the inputs of [`FrequencyConvolver::make_kernel`] without touching
/// any thread.
pub(crate) fn validate_make_kernel(blurry: &Image, sharp: &Image, radius: usize) -> Result<()> {
    check_frequency_input(blurry)?;
    check_frequency_input(sharp)?;
    if blurry.ndim() != 2 {
        return Err(Error::MakeKernelDimensions { ndim: blurry.ndim() });
    }
    if sharp.dsize() != blurry.dsize() {
        return Err(Error::MakeKernelShapeMismatch {
            blurry: blurry.dsize().to_vec(),
            sharp: sharp.dsize().to_vec(),
        });
    }
    let [h, w] = shape2(blurry.dsize());
    let max = padded(h).min(padded(w)) / 2;
    if radius == 0 || radius > max {
        return Err(Error::MakeKernelRadius { radius, max });
    }
    Ok(())
}

fn check_frequency_input(image: &Image) -> Result<()> {
    if image.ndim() > 2 {
        return Err(Error::FrequencyDimensions { ndim: image.ndim() });
    }
    let count = image.blank_count();
    if count > 0 {
        return Err(Error::BlankInFrequencyDomain { count });
    }
    Ok(())
}

/// 1D data is handled as a single row.
fn shape2(dsize: &[usize]) -> [usize; 2] {
    match *dsize {
        [n] => [1, n],
        [h, w] => [h, w],
        _ => unreachable!("frequency domain input checked to have 1 or 2 axes"),
    }
}

/// Rounds up to an even length.
#[inline]
fn padded(n: usize) -> usize {
    n + n % 2
}

/// Copies `data` into the top-left corner of a zeroed complex buffer.
fn pad_complex(data: &[f32], [h, w]: [usize; 2], ctx: &FftContext) -> Vec<Complex64> {
    let mut buffer = vec![ZERO; ctx.rows() * ctx.cols()];
    for (src, dst) in data.chunks_exact(w).zip(buffer.chunks_exact_mut(ctx.cols())).take(h) {
        for (d, &s) in dst.iter_mut().zip(src) {
            *d = Complex64::new(s as f64, 0.0);
        }
    }
    buffer
}

/// Spectral division guarded against noise amplification.
///
/// Bins where the divisor magnitude is at or below `floor`, and quotients
/// above unit magnitude, become zero.
fn divide_spectrum(a: Complex64, b: Complex64, floor: f64) -> Complex64 {
    if b.norm() <= floor {
        return ZERO;
    }
    let quotient = a / b;
    if quotient.norm() > MAX_KERNEL_SPECTRUM {
        ZERO
    } else {
        quotient
    }
}

/// Maps a periodic DFT index (zero shift at 0) to a centered one (zero shift
/// at `n / 2 - 1`). `n` must be even.
#[inline]
fn periodic_to_centered(i: usize, n: usize) -> usize {
    if i > n / 2 { i - (n / 2 + 1) } else { i + n / 2 - 1 }
}

/// Centers the periodic spatial result, keeps the samples closer than
/// `radius` to the center, and scales them to unit sum.
fn recenter(spatial: &[f64], rows: usize, cols: usize, radius: usize) -> Vec<f64> {
    let (ci, cj) = (rows / 2 - 1, cols / 2 - 1);
    let mut centered = vec![0.0f64; rows * cols];

    for i in 0..rows {
        let ii = periodic_to_centered(i, rows);
        let di = ii as f64 - ci as f64;
        for j in 0..cols {
            let jj = periodic_to_centered(j, cols);
            let dj = jj as f64 - cj as f64;
            if (di * di + dj * dj).sqrt() < radius as f64 {
                centered[ii * cols + jj] = spatial[i * cols + j];
            }
        }
    }

    let sum: f64 = centered.iter().sum();
    if sum == 0.0 {
        tracing::warn!("Estimated kernel is empty; lower min_sharp_spectrum or check the inputs");
        return centered;
    }
    centered.iter_mut().for_each(|v| *v /= sum);
    centered
}

/// Copies the `size` window starting at `origin` out of a row-major buffer
/// with `stride` columns, snapping round-off noise to zero.
fn crop(buffer: &[f64], stride: usize, origin: [usize; 2], size: [usize; 2]) -> Vec<f32> {
    let [oy, ox] = origin;
    let [h, w] = size;
    let mut output = Vec::with_capacity(h * w);
    for y in 0..h {
        let start = (oy + y) * stride + ox;
        output.extend(
            buffer[start..start + w]
                .iter()
                .map(|&v| v.snap_to_zero(ROUNDOFF_THRESHOLD) as f32),
        );
    }
    output
}
