//! Sliding-window overlap-add over a whole image or strip

use crate::algorithm::window::{WindowEvaluator, WindowScratch, WindowStatus};
use crate::io::error::{Result, WithContext};
use crate::io::progress::ProgressSink;
use crate::math::svd::SvdSolver;
use crate::spatial::OverlapGrids;
use bitvec::prelude::*;
use log::{debug, warn};
use ndarray::{Array2, ArrayView3, s};

/// Number of window centers `(rows, cols)` of a `height x width` image
pub const fn window_grid(height: usize, width: usize, pad: usize) -> (usize, usize) {
    (
        height.saturating_sub(2 * pad),
        width.saturating_sub(2 * pad),
    )
}

/// Sum and coverage grids plus the windows that were left out
#[derive(Debug, Clone)]
pub struct Accumulation {
    /// Sub-pixel sum and count grids
    pub grids: OverlapGrids,
    /// One bit per window center, row-major, set when the window was skipped
    pub skipped: BitVec,
    window_cols: usize,
    pad: usize,
    subpixels: usize,
}

impl Accumulation {
    /// Empty result for a `height x width` input
    pub fn empty(height: usize, width: usize, pad: usize, subpixels: usize) -> Self {
        let (window_rows, window_cols) = window_grid(height, width, pad);
        Self {
            grids: OverlapGrids::new(height * subpixels, width * subpixels),
            skipped: bitvec![0; window_rows * window_cols],
            window_cols,
            pad,
            subpixels,
        }
    }

    /// Number of skipped windows
    pub fn skipped_windows(&self) -> usize {
        self.skipped.count_ones()
    }

    /// Whether the window centered at input pixel `(row, col)` was skipped
    pub fn is_skipped(&self, row: usize, col: usize) -> bool {
        if row < self.pad || col < self.pad || col - self.pad >= self.window_cols {
            return false;
        }
        let index = (row - self.pad) * self.window_cols + (col - self.pad);
        self.skipped.get(index).as_deref() == Some(&true)
    }

    /// Final image: sum divided by count
    pub fn normalize(&self) -> Array2<f64> {
        self.grids.normalize()
    }

    /// Add a strip result whose input rows start at `first_row`
    pub fn merge_strip(&mut self, strip: &Self, first_row: usize) {
        self.grids.merge_rows(first_row * self.subpixels, &strip.grids);

        let offset = first_row * self.window_cols;
        for index in strip.skipped.iter_ones() {
            if let Some(mut bit) = self.skipped.get_mut(offset + index) {
                *bit = true;
            }
        }
    }
}

/// Run every window of `image` with fresh `nalgebra` scratch space
///
/// # Errors
///
/// Returns an error if a window fails under an `Abort` policy
pub fn accumulate<P>(
    image: ArrayView3<'_, f64>,
    evaluator: &WindowEvaluator<'_>,
    progress: &P,
) -> Result<Accumulation>
where
    P: ProgressSink + ?Sized,
{
    let mut scratch = WindowScratch::new(evaluator.geometry(), image.dim().2);
    accumulate_with(image, evaluator, &mut scratch, progress)
}

/// Run every window of `image` using the given scratch space
///
/// `image` must already carry `pad` rows and columns of context on each side;
/// centers run over `[pad, height - pad) x [pad, width - pad)` in row-major
/// order.
///
/// # Errors
///
/// Returns an error if a window fails under an `Abort` policy, tagged with
/// the window center
pub fn accumulate_with<S, P>(
    image: ArrayView3<'_, f64>,
    evaluator: &WindowEvaluator<'_>,
    scratch: &mut WindowScratch<S>,
    progress: &P,
) -> Result<Accumulation>
where
    S: SvdSolver,
    P: ProgressSink + ?Sized,
{
    let geometry = evaluator.geometry();
    let pad = geometry.pad();
    let subpixels = geometry.subpixels();
    let (height, width, _) = image.dim();
    let mut result = Accumulation::empty(height, width, pad, subpixels);
    let window_cols = result.window_cols;

    for (window_row, i) in (pad..height.saturating_sub(pad)).enumerate() {
        for (window_col, j) in (pad..width.saturating_sub(pad)).enumerate() {
            let roi = image.slice(s![i - pad..=i + pad, j - pad..=j + pad, ..]);
            match evaluator.evaluate(roi, scratch).with_window(i, j)? {
                WindowStatus::Evaluated { .. } => {
                    let origin = (subpixels * (i - pad), subpixels * (j - pad));
                    result.grids.add_window(origin, scratch.tile());
                }
                WindowStatus::Skipped(reason) => {
                    debug!("window ({i}, {j}) skipped: {reason:?}");
                    result.skipped.set(window_row * window_cols + window_col, true);
                }
            }
            progress.window_completed();
        }
    }

    let skipped = result.skipped_windows();
    if skipped > 0 {
        warn!(
            "{skipped} of {} windows skipped; their regions have reduced coverage",
            result.skipped.len()
        );
    }

    Ok(result)
}
