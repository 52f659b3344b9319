//! Overlap-add accumulation grids at sub-pixel resolution

use ndarray::{Array2, ArrayView2, Zip, s};
use num_traits::NumAssign;

/// Add `tile` into `grid` with its top-left corner at `origin`
///
/// The part of the tile that would fall outside the grid is ignored.
pub fn add_tile<T>(grid: &mut Array2<T>, origin: (usize, usize), tile: ArrayView2<'_, T>)
where
    T: NumAssign + Copy,
{
    let (rows, cols) = grid.dim();
    let (tile_rows, tile_cols) = tile.dim();
    let row_end = (origin.0 + tile_rows).min(rows);
    let col_end = (origin.1 + tile_cols).min(cols);
    if origin.0 >= row_end || origin.1 >= col_end {
        return;
    }

    let mut target = grid.slice_mut(s![origin.0..row_end, origin.1..col_end]);
    let source = tile.slice(s![..row_end - origin.0, ..col_end - origin.1]);
    Zip::from(&mut target)
        .and(&source)
        .for_each(|dst, &src| *dst += src);
}

/// Add `value` to every cell of the `shape` rectangle at `origin`
pub fn add_constant<T>(grid: &mut Array2<T>, origin: (usize, usize), shape: (usize, usize), value: T)
where
    T: NumAssign + Copy,
{
    let (rows, cols) = grid.dim();
    let row_end = (origin.0 + shape.0).min(rows);
    let col_end = (origin.1 + shape.1).min(cols);
    if origin.0 >= row_end || origin.1 >= col_end {
        return;
    }

    grid.slice_mut(s![origin.0..row_end, origin.1..col_end])
        .map_inplace(|cell| *cell += value);
}

/// Paired sum and coverage grids of one reconstruction
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapGrids {
    /// Accumulated pseudo-spectrum
    pub sum: Array2<f64>,
    /// Number of windows contributing to each sub-pixel
    pub count: Array2<u32>,
}

impl OverlapGrids {
    /// Zero-initialized grids of `rows x cols` sub-pixels
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            sum: Array2::zeros((rows, cols)),
            count: Array2::zeros((rows, cols)),
        }
    }

    /// Grid shape in sub-pixels
    pub fn dim(&self) -> (usize, usize) {
        self.sum.dim()
    }

    /// Overlap-add one window tile and count it once at every covered cell
    pub fn add_window(&mut self, origin: (usize, usize), tile: ArrayView2<'_, f64>) {
        add_tile(&mut self.sum, origin, tile);
        add_constant(&mut self.count, origin, tile.dim(), 1);
    }

    /// Add another pair of grids whose first row lands on `row_offset`
    ///
    /// `other` spans the full width; rows beyond this grid are ignored.
    pub fn merge_rows(&mut self, row_offset: usize, other: &Self) {
        add_tile(&mut self.sum, (row_offset, 0), other.sum.view());
        add_tile(&mut self.count, (row_offset, 0), other.count.view());
    }

    /// Divide the sum by the count
    ///
    /// Cells no window covered divide zero by zero and come out as NaN.
    pub fn normalize(&self) -> Array2<f64> {
        normalize(self.sum.view(), self.count.view())
    }
}

/// Elementwise `sum / count`
pub fn normalize(sum: ArrayView2<'_, f64>, count: ArrayView2<'_, u32>) -> Array2<f64> {
    Zip::from(&sum)
        .and(&count)
        .map_collect(|&total, &windows| total / f64::from(windows))
}
