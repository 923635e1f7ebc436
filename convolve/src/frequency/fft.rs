//! FFT plans and per-thread workspaces for the row/column passes.
//!
//! One [`FftContext`] is built per convolution call. Its plans are shared
//! read-only by every worker thread; each thread gets its own [`Workspace`]
//! (FFT scratch plus a buffer for gathering one strided column).

use std::sync::Arc;

use parking_lot::Mutex;
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftDirection, FftPlanner};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Forward and inverse plans for transforms of one length.
struct LinePlan {
    len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl LinePlan {
    fn new(planner: &mut FftPlanner<f64>, len: usize) -> Self {
        Self {
            len,
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
        }
    }

    fn scratch_len(&self) -> usize {
        self.forward
            .get_inplace_scratch_len()
            .max(self.inverse.get_inplace_scratch_len())
    }

    /// In-place transform. The inverse divides every sample by the length.
    fn process(&self, line: &mut [Complex64], scratch: &mut [Complex64], direction: FftDirection) {
        debug_assert_eq!(line.len(), self.len);
        match direction {
            FftDirection::Forward => self.forward.process_with_scratch(line, scratch),
            FftDirection::Inverse => {
                self.inverse.process_with_scratch(line, scratch);
                let norm = 1.0 / self.len as f64;
                line.iter_mut().for_each(|c| *c *= norm);
            }
        }
    }
}

pub(crate) struct Workspace {
    scratch: Vec<Complex64>,
    column: Vec<Complex64>,
}

/// Plans for a `rows x cols` padded buffer.
pub(crate) struct FftContext {
    rows: usize,
    cols: usize,
    /// Transforms along a row (length `cols`, stride 1).
    row_plan: LinePlan,
    /// Transforms along a column (length `rows`, stride `cols`).
    col_plan: LinePlan,
}

impl FftContext {
    pub(crate) fn new(rows: usize, cols: usize) -> Self {
        let mut planner = FftPlanner::new();
        let row_plan = LinePlan::new(&mut planner, cols);
        let col_plan = LinePlan::new(&mut planner, rows);
        Self {
            rows,
            cols,
            row_plan,
            col_plan,
        }
    }

    #[inline]
    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub(crate) fn cols(&self) -> usize {
        self.cols
    }

    /// One workspace per worker thread, indexed by thread number.
    pub(crate) fn workspaces(&self, threads: usize) -> Vec<Mutex<Workspace>> {
        let scratch_len = self.row_plan.scratch_len().max(self.col_plan.scratch_len());
        (0..threads)
            .map(|_| {
                Mutex::new(Workspace {
                    scratch: vec![ZERO; scratch_len],
                    column: vec![ZERO; self.rows],
                })
            })
            .collect()
    }

    /// Transforms one contiguous row in place.
    pub(crate) fn process_row(
        &self,
        row: &mut [Complex64],
        workspace: &mut Workspace,
        direction: FftDirection,
    ) {
        self.row_plan.process(row, &mut workspace.scratch, direction);
    }

    /// Transforms the column gathered into the workspace by `load`, then
    /// hands the result to `store`.
    pub(crate) fn process_column(
        &self,
        workspace: &mut Workspace,
        direction: FftDirection,
        load: impl Fn(usize) -> Complex64,
        store: impl Fn(usize, Complex64),
    ) {
        let Workspace { scratch, column } = workspace;
        for (i, c) in column.iter_mut().enumerate() {
            *c = load(i);
        }
        self.col_plan.process(column, scratch, direction);
        for (i, &c) in column.iter().enumerate() {
            store(i, c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_inverse_restores_row() {
        let ctx = FftContext::new(4, 6);
        let mut ws = ctx.workspaces(1).pop().unwrap().into_inner();
        let original: Vec<Complex64> = (0..6).map(|i| Complex64::new(i as f64, -0.5)).collect();
        let mut row = original.clone();

        ctx.process_row(&mut row, &mut ws, FftDirection::Forward);
        ctx.process_row(&mut row, &mut ws, FftDirection::Inverse);

        for (a, b) in row.iter().zip(&original) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_forward_has_no_normalization() {
        let ctx = FftContext::new(2, 8);
        let mut ws = ctx.workspaces(1).pop().unwrap().into_inner();
        let mut row = vec![Complex64::new(1.0, 0.0); 8];
        ctx.process_row(&mut row, &mut ws, FftDirection::Forward);
        assert!((row[0].re - 8.0).abs() < 1e-12);
        assert!(row[1..].iter().all(|c| c.norm() < 1e-12));
    }

    #[test]
    fn test_column_round_trip() {
        let ctx = FftContext::new(4, 3);
        let mut ws = ctx.workspaces(1).pop().unwrap().into_inner();
        let data: Vec<Complex64> = (0..12).map(|i| Complex64::new(i as f64, 0.0)).collect();
        let cells: Vec<std::cell::Cell<Complex64>> =
            data.iter().map(|&c| std::cell::Cell::new(c)).collect();

        for direction in [FftDirection::Forward, FftDirection::Inverse] {
            ctx.process_column(
                &mut ws,
                direction,
                |i| cells[i * 3 + 1].get(),
                |i, c| cells[i * 3 + 1].set(c),
            );
        }

        for (cell, original) in cells.iter().zip(&data) {
            assert!((cell.get() - original).norm() < 1e-12);
        }
    }
}
