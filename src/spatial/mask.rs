//! Window padding and Gaussian mask/geometry construction
//!
//! The reconstruction core accepts any square mask and any geometry matrix of
//! the right shape. The Gaussian builders here give the command-line tool a
//! ready-made PSF model.

use crate::io::error::{Result, invalid_parameter, shape_mismatch};
use crate::math::layout::{test_point_cell, window_position};
use ndarray::Array2;

/// Half-window radius `pad` of a square mask with side `dimension`
///
/// # Errors
///
/// Returns a shape mismatch if `dimension` is even, since no `pad` satisfies
/// `2 * pad + 1 == dimension`
pub fn calculate_padding(dimension: usize) -> Result<usize> {
    if dimension % 2 == 1 {
        Ok((dimension - 1) / 2)
    } else {
        Err(shape_mismatch(
            "mask side",
            &"an odd side length",
            &dimension,
        ))
    }
}

fn validate_sigma(sigma: f64) -> Result<()> {
    if sigma.is_finite() && sigma > 0.0 {
        Ok(())
    } else {
        Err(invalid_parameter(
            "psf_sigma",
            &sigma,
            &"must be a positive finite number of pixels",
        ))
    }
}

fn gaussian(dy: f64, dx: f64, sigma: f64) -> f64 {
    (-dx.mul_add(dx, dy * dy) / (2.0 * sigma * sigma)).exp()
}

/// Isotropic Gaussian weighting window with unit peak
///
/// # Errors
///
/// Returns an error if `side` is even or `sigma` is not positive
pub fn gaussian_mask(side: usize, sigma: f64) -> Result<Array2<f64>> {
    let pad = calculate_padding(side)? as f64;
    validate_sigma(sigma)?;

    Ok(Array2::from_shape_fn((side, side), |(row, col)| {
        gaussian(row as f64 - pad, col as f64 - pad, sigma)
    }))
}

/// Gaussian PSF sampled between every window pixel and every test point
///
/// Row `i` is window pixel [`window_position`]`(i, side)`; column `p` is the
/// sub-pixel test point that the projector will place on tile cell
/// [`test_point_cell`]`(p, msize)`. Test points sit at sub-pixel centers, so
/// the result has shape `[side², (side * subpixels)²]`.
///
/// # Errors
///
/// Returns an error if `side` is even, `subpixels` is zero or `sigma` is not
/// positive
pub fn gaussian_geometry(side: usize, subpixels: usize, sigma: f64) -> Result<Array2<f64>> {
    calculate_padding(side)?;
    validate_sigma(sigma)?;
    if subpixels == 0 {
        return Err(invalid_parameter(
            "subpixels",
            &subpixels,
            &"must be at least 1",
        ));
    }

    let msize = side * subpixels;
    let scale = subpixels as f64;

    Ok(Array2::from_shape_fn(
        (side * side, msize * msize),
        |(pixel, point)| {
            let (row, col) = window_position(pixel, side);
            let (cell_row, cell_col) = test_point_cell(point, msize);
            let y = (cell_row as f64 + 0.5) / scale - 0.5;
            let x = (cell_col as f64 + 0.5) / scale - 0.5;
            gaussian(row as f64 - y, col as f64 - x, sigma)
        },
    ))
}
