//! Dense floating-point image buffers with 1 to 3 axes.
//!
//! Samples are stored row-major with axis 0 varying slowest, so a 2D image
//! with `dsize = [height, width]` is a sequence of `height` rows. Missing data
//! ("blank" pixels) is marked with NaN.


use crate::error::{Error, Result};

/// Largest supported number of axes.
pub const MAX_DIMENSIONS: usize = 3;

/// Value marking a missing sample.
pub const BLANK: f32 = f32::NAN;

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: Vec<f32>,
    dsize: Vec<usize>,
}

impl Image {
    /// Wraps `data` with the axis lengths `dsize` (slowest axis first).
    pub fn new(dsize: &[usize], data: Vec<f32>) -> Result<Self> {
        let expected = checked_size(dsize)?;
        if data.len() != expected {
            return Err(Error::DataLength {
                dsize: dsize.to_vec(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            dsize: dsize.to_vec(),
        })
    }

    pub fn zeros(dsize: &[usize]) -> Result<Self> {
        let size = checked_size(dsize)?;
        Ok(Self {
            data: vec![0.0; size],
            dsize: dsize.to_vec(),
        })
    }

    /// Builds an image by evaluating `f` on the coordinates of every sample.
    pub fn from_fn<F>(dsize: &[usize], mut f: F) -> Result<Self>
    where
        F: FnMut(&[usize]) -> f32,
    {
        let size = checked_size(dsize)?;
        let mut coords = vec![0usize; dsize.len()];
        let mut data = Vec::with_capacity(size);
        for _ in 0..size {
            data.push(f(&coords));
            for axis in (0..dsize.len()).rev() {
                coords[axis] += 1;
                if coords[axis] < dsize[axis] {
                    break;
                }
                coords[axis] = 0;
            }
        }
        Ok(Self {
            data,
            dsize: dsize.to_vec(),
        })
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dsize.len()
    }

    #[inline]
    pub fn dsize(&self) -> &[usize] {
        &self.dsize
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[inline]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Sample at `coords` (one coordinate per axis, slowest first).
    pub fn get(&self, coords: &[usize]) -> f32 {
        assert_eq!(coords.len(), self.ndim(), "coordinate count mismatch");
        let index = coords
            .iter()
            .zip(&self.dsize)
            .fold(0, |acc, (&c, &n)| {
                assert!(c < n, "coordinate {c} out of bounds ({n})");
                acc * n + c
            });
        self.data[index]
    }

    pub fn has_blank(&self) -> bool {
        self.data.iter().any(|v| v.is_nan())
    }

    pub fn blank_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Sum of all non-blank samples, accumulated in double precision.
    pub fn sum_non_blank(&self) -> f64 {
        self.data
            .iter()
            .filter(|v| !v.is_nan())
            .map(|&v| v as f64)
            .sum()
    }

    /// Axis lengths left-padded with ones to exactly three axes.
    pub(crate) fn shape3(&self) -> [usize; 3] {
        shape3(&self.dsize)
    }
}

/// Left-pads `dsize` with ones so 1D and 2D images share the 3D loops.
pub(crate) fn shape3(dsize: &[usize]) -> [usize; 3] {
    let mut shape = [1usize; MAX_DIMENSIONS];
    let offset = MAX_DIMENSIONS - dsize.len();
    shape[offset..].copy_from_slice(dsize);
    shape
}

fn checked_size(dsize: &[usize]) -> Result<usize> {
    if dsize.is_empty() || dsize.len() > MAX_DIMENSIONS {
        return Err(Error::UnsupportedDimensions { ndim: dsize.len() });
    }
    if let Some(axis) = dsize.iter().position(|&n| n == 0) {
        return Err(Error::EmptyAxis { axis });
    }
    Ok(dsize.iter().product())
}
