//! Signal/noise subspace projection of one masked window patch
//!
//! The patch is decomposed, the leading singular vectors above the threshold
//! span the signal subspace, and every sub-pixel test point gets the ratio of
//! its geometry energy inside that subspace to the energy outside it. The
//! resulting pseudo-spectrum is reversed and folded column-major into a tile.

use crate::io::error::{Result, numerical_failure};
use crate::math::layout::tile_position;
use crate::math::svd::SvdSolver;
use crate::spatial::WhitenedGeometry;
use ndarray::linalg::general_mat_mul;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip, s};

/// Outcome of projecting one patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// The tile was written using a signal subspace of this dimension
    Tile {
        /// Effective rank `m`
        rank: usize,
    },
    /// Rank selection fell back to a non-positive dimension; the tile is stale
    DegenerateRank {
        /// Rank after fallback
        rank: isize,
        /// Number of singular values that were available
        singular_values: usize,
    },
}

/// Effective signal rank for descending `singular_values`
///
/// Counts the leading values at or above `threshold10`. When that count is
/// zero or covers every value, the rank falls back to `len - 3`, which is
/// zero or negative for fewer than four singular values.
pub fn select_rank(singular_values: ArrayView1<'_, f64>, threshold10: f64) -> isize {
    let available = singular_values.len();
    let leading = singular_values
        .iter()
        .take_while(|&&value| value >= threshold10)
        .count();

    if leading == 0 || leading >= available {
        available as isize - 3
    } else {
        leading as isize
    }
}

/// Per-test-point energy of `gm` inside the span of the first `rank` columns of `u`
///
/// `projection` receives `gm · u[:, ..rank]` and is resized when too small;
/// `signal` receives the row-wise sum of squares of that product.
pub fn signal_energy(
    gm: ArrayView2<'_, f64>,
    u: ArrayView2<'_, f64>,
    rank: usize,
    projection: &mut Array2<f64>,
    signal: &mut Array1<f64>,
) {
    let points = gm.nrows();
    if projection.nrows() != points || projection.ncols() < rank {
        *projection = Array2::zeros((points, u.ncols().max(rank)));
    }
    if signal.len() != points {
        *signal = Array1::zeros(points);
    }

    let mut product = projection.slice_mut(s![.., ..rank]);
    general_mat_mul(1.0, &gm, &u.slice(s![.., ..rank]), 0.0, &mut product);

    Zip::from(signal)
        .and(product.rows())
        .for_each(|energy, row| *energy = row.iter().map(|v| v * v).sum::<f64>());
}

/// `(signal / (gmod - signal)) ^ (alpha / 2)` for every test point
///
/// The noise energy is not guarded; a test point lying in the signal
/// subspace divides by (nearly) zero and yields a huge or infinite value.
pub fn pseudo_spectrum(
    signal: ArrayView1<'_, f64>,
    gmod: ArrayView1<'_, f64>,
    alpha: f64,
    spectrum: &mut Array1<f64>,
) {
    if spectrum.len() != signal.len() {
        *spectrum = Array1::zeros(signal.len());
    }
    let exponent = alpha / 2.0;

    Zip::from(spectrum)
        .and(&signal)
        .and(&gmod)
        .for_each(|value, &energy, &total| {
            let noise = total - energy;
            *value = (energy / noise).powf(exponent);
        });
}

/// Reverse `spectrum` and fold it column-major into the square `tile`
pub fn fold_tile(spectrum: ArrayView1<'_, f64>, tile: &mut Array2<f64>) {
    let msize = tile.nrows();
    if msize == 0 {
        return;
    }
    for (k, &value) in spectrum.iter().rev().enumerate() {
        if let Some(cell) = tile.get_mut(tile_position(k, msize)) {
            *cell = value;
        }
    }
}

/// Buffers reused across projections of one worker
#[derive(Debug, Clone)]
pub struct ProjectionBuffers {
    projection: Array2<f64>,
    signal: Array1<f64>,
    spectrum: Array1<f64>,
}

impl ProjectionBuffers {
    /// Buffers sized for `geometry` and up to `frames` singular vectors
    pub fn new(geometry: &WhitenedGeometry, frames: usize) -> Self {
        let points = geometry.points();
        Self {
            projection: Array2::zeros((points, frames.min(geometry.mask_size()))),
            signal: Array1::zeros(points),
            spectrum: Array1::zeros(points),
        }
    }

    /// Signal energy of the last projection
    pub fn signal(&self) -> ArrayView1<'_, f64> {
        self.signal.view()
    }

    /// Pseudo-spectrum of the last projection, before reversal
    pub fn spectrum(&self) -> ArrayView1<'_, f64> {
        self.spectrum.view()
    }
}

/// Projects masked patches onto the whitened geometry
#[derive(Debug, Clone, Copy)]
pub struct CovarianceProjector<'g> {
    geometry: &'g WhitenedGeometry,
    threshold10: f64,
    alpha: f64,
}

impl<'g> CovarianceProjector<'g> {
    /// Create a projector with singular value threshold `10^threshold`
    pub fn new(geometry: &'g WhitenedGeometry, threshold: f64, alpha: f64) -> Self {
        Self {
            geometry,
            threshold10: 10_f64.powf(threshold),
            alpha,
        }
    }

    /// Linear singular value threshold
    pub const fn threshold10(&self) -> f64 {
        self.threshold10
    }

    /// Contrast exponent
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Project `patch` (`[mask_size, frames]`) and write the `msize x msize` tile
    ///
    /// # Errors
    ///
    /// Returns a numerical failure if the decomposition fails or its
    /// left singular vectors do not match the patch
    pub fn project<S: SvdSolver>(
        &self,
        patch: ArrayView2<'_, f64>,
        solver: &mut S,
        buffers: &mut ProjectionBuffers,
        tile: &mut Array2<f64>,
    ) -> Result<Projection> {
        solver.compute(patch)?;

        let singular_values = solver.singular_values();
        let available = singular_values.len();
        let rank = select_rank(singular_values, self.threshold10);
        let m = match usize::try_from(rank) {
            Ok(m) if m > 0 => m,
            _ => {
                return Ok(Projection::DegenerateRank {
                    rank,
                    singular_values: available,
                });
            }
        };

        let u = solver.left_singular_vectors();
        if u.nrows() != self.geometry.mask_size() || u.ncols() < m {
            return Err(numerical_failure(&format!(
                "left singular vectors have shape {:?}, need {} rows and {m} columns",
                u.dim(),
                self.geometry.mask_size()
            )));
        }

        signal_energy(
            self.geometry.gm(),
            u,
            m,
            &mut buffers.projection,
            &mut buffers.signal,
        );
        pseudo_spectrum(
            buffers.signal.view(),
            self.geometry.gmod(),
            self.alpha,
            &mut buffers.spectrum,
        );
        fold_tile(buffers.spectrum.view(), tile);

        Ok(Projection::Tile { rank: m })
    }
}
