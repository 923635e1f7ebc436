use num_traits::Float;

pub trait FloatExt: Sized {
    /// Absolute comparison against [`crate::EPSILON`].
    fn approximately_eq(self, other: Self) -> bool;

    /// Comparison scaled by the larger magnitude of the two operands.
    ///
    /// Values whose magnitudes are both below `tolerance` compare equal, so
    /// samples sitting on the round-off floor do not blow up the ratio.
    fn relative_eq(self, other: Self, tolerance: Self) -> bool;

    /// Returns zero when `|self| < threshold`, `self` otherwise.
    fn snap_to_zero(self, threshold: Self) -> Self;
}

impl<T: Float> FloatExt for T {
    fn approximately_eq(self, other: Self) -> bool {
        let epsilon = T::from(crate::EPSILON).unwrap_or_else(T::epsilon);
        (self - other).abs() < epsilon
    }

    fn relative_eq(self, other: Self, tolerance: Self) -> bool {
        let scale = self.abs().max(other.abs());
        if scale < tolerance {
            return true;
        }
        (self - other).abs() <= tolerance * scale
    }

    #[inline]
    fn snap_to_zero(self, threshold: Self) -> Self {
        if self.abs() < threshold {
            T::zero()
        } else {
            self
        }
    }
}
