//! Shared mutable access to one buffer from many threads.
//!
//! The scheduler hands every worker thread a disjoint set of indices into the
//! same output buffer (pixels, FFT rows or FFT columns). Those sets are not
//! contiguous, so the buffer cannot be split with `chunks_mut`; instead each
//! worker receives a [`DisjointMut`] and writes only the indices it owns.

use std::marker::PhantomData;

/// A `Send + Sync` view of a mutable slice whose users promise disjoint access.
///
/// All accessors are `unsafe`: the caller must guarantee that no two threads
/// touch the same element while the view is shared.
#[derive(Debug)]
pub struct DisjointMut<'a, T> {
    ptr: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

// SAFETY: access is only possible through the unsafe accessors below, whose
// contract requires the caller to partition indices between threads.
unsafe impl<T: Send> Send for DisjointMut<'_, T> {}
unsafe impl<T: Send> Sync for DisjointMut<'_, T> {}

impl<'a, T> DisjointMut<'a, T> {
    pub fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    /// No other thread may access `index` concurrently.
    #[inline]
    pub unsafe fn write(&self, index: usize, value: T) {
        assert!(index < self.len, "index {index} out of bounds ({})", self.len);
        unsafe { self.ptr.add(index).write(value) }
    }

    /// # Safety
    /// No other thread may write `index` concurrently.
    #[inline]
    pub unsafe fn read(&self, index: usize) -> T
    where
        T: Copy,
    {
        assert!(index < self.len, "index {index} out of bounds ({})", self.len);
        unsafe { self.ptr.add(index).read() }
    }

    /// Mutable sub-slice `[start, start + len)`.
    ///
    /// # Safety
    /// No other thread may access any element of the range while the returned
    /// slice is alive.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slice_mut(&self, start: usize, len: usize) -> &mut [T] {
        assert!(
            start + len <= self.len,
            "range {start}..{} out of bounds ({})",
            start + len,
            self.len
        );
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(start), len) }
    }
}
