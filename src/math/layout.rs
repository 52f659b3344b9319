//! Column-major index mapping between window pixels, flat vectors and tiles
//!
//! Every reshape in the reconstruction goes through these functions. The
//! first axis always varies fastest: window pixel `(row, col)` of a window
//! with side `side` is flat element `row + col * side`, and element `k` of a
//! flat vector folded into an `n x n` tile lands on `(k % n, k / n)`.
//! Switching either mapping to row-major transposes every tile.
//!
//! The mask is the one exception: its weights are read row-major, so flat
//! element `i` of the window is weighted by mask cell [`mask_position`]`(i)`.

/// Flat index of window pixel `(row, col)`
pub const fn flat_index(row: usize, col: usize, side: usize) -> usize {
    row + col * side
}

/// Window pixel `(row, col)` of flat index `index`
pub const fn window_position(index: usize, side: usize) -> (usize, usize) {
    (index % side, index / side)
}

/// Mask cell whose weight applies to flat window element `index`
pub const fn mask_position(index: usize, side: usize) -> (usize, usize) {
    (index / side, index % side)
}

/// Tile cell receiving element `k` of the reversed spectrum
///
/// Inverse of [`flat_index`] for an `msize x msize` tile.
pub const fn tile_position(k: usize, msize: usize) -> (usize, usize) {
    window_position(k, msize)
}

/// Tile cell receiving sub-pixel test point `point`
///
/// The spectrum is reversed before folding, so the last test point fills the
/// top-left cell.
pub const fn test_point_cell(point: usize, msize: usize) -> (usize, usize) {
    tile_position(msize * msize - 1 - point, msize)
}
