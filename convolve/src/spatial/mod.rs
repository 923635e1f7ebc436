//! Direct (spatial domain) convolution.
//!
//! Every output pixel is the kernel-weighted sum of the input pixels under
//! the kernel footprint. Blank input pixels do not contribute, and with edge
//! correction the sum is divided by the kernel weight that actually landed on
//! valid input, so pixels near the border or next to blank regions keep the
//! flux scale of the interior.


use std::ops::Range;

use common::DisjointMut;

use crate::config::CancelToken;
use crate::error::Result;
use crate::image::{BLANK, Image, shape3};
use crate::kernel::Kernel;
use crate::thread_plan::ThreadPlan;

/// Convolves `image` with an already prepared `kernel`.
///
/// The kernel is applied as given: `out[p] = Σ k[j] * in[p + j - center]`.
/// Callers wanting a true convolution pass a flipped kernel.
///
/// A pixel whose footprint holds no valid input, or whose overlapping kernel
/// weight is zero while `edge_correction` is on, comes out blank.
pub fn convolve_spatial(
    image: &Image,
    kernel: &Kernel,
    edge_correction: bool,
    num_threads: usize,
    cancel: &CancelToken,
) -> Result<Image> {
    debug_assert_eq!(image.ndim(), kernel.ndim());

    let footprint = Footprint::new(image.shape3(), shape3(kernel.dsize()));
    let mut output = vec![0.0f32; image.size()];
    let plan = ThreadPlan::distribute(image.size(), num_threads);

    {
        let out = DisjointMut::new(&mut output);
        plan.run("spatial", |_, indices| {
            for p in indices {
                if cancel.is_cancelled() {
                    return;
                }
                let value =
                    footprint.convolve_pixel(image.data(), kernel.data(), p, edge_correction);
                // SAFETY: the plan assigns every output index to exactly one thread.
                unsafe { out.write(p, value) };
            }
        });
    }
    cancel.check()?;

    let blanks = output.iter().filter(|v| v.is_nan()).count();
    tracing::debug!(
        pixels = output.len(),
        threads = plan.num_threads(),
        blanks,
        "spatial convolution done"
    );

    Image::new(image.dsize(), output)
}

/// Image and kernel geometry, both padded to three axes.
#[derive(Debug, Clone, Copy)]
struct Footprint {
    image: [usize; 3],
    kernel: [usize; 3],
    half: [usize; 3],
}

impl Footprint {
    fn new(image: [usize; 3], kernel: [usize; 3]) -> Self {
        Self {
            image,
            kernel,
            half: kernel.map(|k| k / 2),
        }
    }

    fn coords(&self, p: usize) -> [usize; 3] {
        let [_, s1, s2] = self.image;
        [p / (s1 * s2), (p / s2) % s1, p % s2]
    }

    /// Range of kernel indices on `axis` that fall inside the image when the
    /// kernel center sits on coordinate `c`.
    fn overlap(&self, axis: usize, c: usize) -> Range<usize> {
        let half = self.half[axis];
        let start = half.saturating_sub(c);
        let end = self.kernel[axis].min(self.image[axis] + half - c);
        start..end
    }

    fn convolve_pixel(
        &self,
        input: &[f32],
        kernel: &[f32],
        p: usize,
        edge_correction: bool,
    ) -> f32 {
        let c = self.coords(p);
        let [_, s1, s2] = self.image;
        let [_, k1, k2] = self.kernel;
        let [r0, r1, r2] = [0, 1, 2].map(|axis| self.overlap(axis, c[axis]));

        let mut sum = 0.0f64;
        let mut ksum = 0.0f64;
        let mut valid = false;

        for j0 in r0 {
            let i0 = c[0] + j0 - self.half[0];
            for j1 in r1.clone() {
                let i1 = c[1] + j1 - self.half[1];
                let in_start = (i0 * s1 + i1) * s2 + c[2] + r2.start - self.half[2];
                let k_start = (j0 * k1 + j1) * k2 + r2.start;
                let len = r2.len();

                for (&v, &w) in input[in_start..in_start + len]
                    .iter()
                    .zip(&kernel[k_start..k_start + len])
                {
                    if v.is_nan() || w.is_nan() {
                        continue;
                    }
                    sum += w as f64 * v as f64;
                    ksum += w as f64;
                    valid = true;
                }
            }
        }

        if !valid {
            return BLANK;
        }
        if edge_correction {
            if ksum == 0.0 {
                return BLANK;
            }
            (sum / ksum) as f32
        } else {
            sum as f32
        }
    }
}
