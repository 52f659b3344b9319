//! Whitened geometry shared by every window of a reconstruction
//!
//! The geometry matrix is normalized by its maximum, weighted per window
//! pixel by the mask and transposed once. The per-test-point energy of the
//! result is the total against which each window's signal energy is
//! compared.

use crate::io::error::{MusicalError, Result, invalid_parameter, shape_mismatch};
use crate::math::layout::mask_position;
use crate::spatial::mask::calculate_padding;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

/// Read-only quantities derived from the mask and geometry matrix
#[derive(Debug, Clone)]
pub struct WhitenedGeometry {
    mask_flat: Array1<f64>,
    gm: Array2<f64>,
    gmod: Array1<f64>,
    side: usize,
    pad: usize,
    subpixels: usize,
}

impl WhitenedGeometry {
    /// Derive the whitened geometry for a square mask
    ///
    /// `gmatrix` has one row per mask pixel in column-major order and one
    /// column per sub-pixel test point, i.e. shape
    /// `[side², (side * subpixels)²]`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The mask is not square or its side is even
    /// - `subpixels` is zero
    /// - `gmatrix` does not have the shape above
    /// - The maximum of `gmatrix` is not a positive finite number
    pub fn new(
        mask: ArrayView2<'_, f64>,
        gmatrix: ArrayView2<'_, f64>,
        subpixels: usize,
    ) -> Result<Self> {
        let (mask_rows, mask_cols) = mask.dim();
        if mask_rows != mask_cols {
            return Err(shape_mismatch(
                "mask",
                &"a square mask",
                &(mask_rows, mask_cols),
            ));
        }
        let side = mask_rows;
        let pad = calculate_padding(side)?;
        if subpixels == 0 {
            return Err(invalid_parameter(
                "subpixels",
                &subpixels,
                &"must be at least 1",
            ));
        }

        let mask_size = side * side;
        let msize = side * subpixels;
        let expected = (mask_size, msize * msize);
        if gmatrix.dim() != expected {
            return Err(shape_mismatch("geometry matrix", &expected, &gmatrix.dim()));
        }

        let max = gmatrix.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !(max.is_finite() && max > 0.0) {
            return Err(MusicalError::InvalidSourceData {
                reason: format!("geometry matrix maximum must be positive and finite, got {max}"),
            });
        }

        let mask_flat = Array1::from_shape_fn(mask_size, |index| {
            mask.get(mask_position(index, side)).copied().unwrap_or(0.0)
        });

        let mut gm = gmatrix.t().to_owned();
        for row in gm.rows_mut() {
            Zip::from(row)
                .and(&mask_flat)
                .for_each(|value, &weight| *value = *value / max * weight);
        }
        let gmod = gm.map_axis(Axis(1), |row| row.iter().map(|v| v * v).sum::<f64>());

        Ok(Self {
            mask_flat,
            gm,
            gmod,
            side,
            pad,
            subpixels,
        })
    }

    /// Mask weights flattened row-major, one per flat window element
    pub fn mask_flat(&self) -> ArrayView1<'_, f64> {
        self.mask_flat.view()
    }

    /// Whitened, transposed geometry, shape `[msize², side²]`
    pub fn gm(&self) -> ArrayView2<'_, f64> {
        self.gm.view()
    }

    /// Squared row norms of [`gm`](Self::gm), one per test point
    pub fn gmod(&self) -> ArrayView1<'_, f64> {
        self.gmod.view()
    }

    /// Window side length `2 * pad + 1`
    pub const fn side(&self) -> usize {
        self.side
    }

    /// Half-window radius
    pub const fn pad(&self) -> usize {
        self.pad
    }

    /// Sub-pixels per input pixel along each axis
    pub const fn subpixels(&self) -> usize {
        self.subpixels
    }

    /// Number of pixels in a window
    pub const fn mask_size(&self) -> usize {
        self.side * self.side
    }

    /// Side of an output tile in sub-pixels
    pub const fn msize(&self) -> usize {
        self.side * self.subpixels
    }

    /// Number of sub-pixel test points per window
    pub const fn points(&self) -> usize {
        self.msize() * self.msize()
    }
}
