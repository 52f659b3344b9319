//! Evaluation of a single window neighborhood

use crate::algorithm::projector::{CovarianceProjector, Projection, ProjectionBuffers};
use crate::io::error::{MusicalError, Result, shape_mismatch};
use crate::math::layout::flat_index;
use crate::math::svd::{NalgebraSvd, SvdSolver};
use crate::spatial::WhitenedGeometry;
use log::debug;
use ndarray::{Array2, ArrayView2, ArrayView3};

/// What to do with a window that cannot produce a tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowPolicy {
    /// Leave the window out of the sum and the count
    #[default]
    Skip,
    /// Fail the whole run
    Abort,
}

/// Why a window was left out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Rank selection fell back to this non-positive value
    DegenerateRank(isize),
    /// The decomposition failed
    NumericalFailure,
}

/// Result of evaluating one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    /// The scratch tile holds this window's contribution
    Evaluated {
        /// Effective rank `m` used
        rank: usize,
    },
    /// Nothing to accumulate
    Skipped(SkipReason),
}

/// Per-worker scratch space, fully overwritten by every evaluation
#[derive(Debug, Clone)]
pub struct WindowScratch<S = NalgebraSvd> {
    patch: Array2<f64>,
    solver: S,
    buffers: ProjectionBuffers,
    tile: Array2<f64>,
}

impl WindowScratch<NalgebraSvd> {
    /// Scratch using the default `nalgebra` decomposition
    pub fn new(geometry: &WhitenedGeometry, frames: usize) -> Self {
        Self::with_solver(geometry, frames, NalgebraSvd::new())
    }
}

impl<S: SvdSolver> WindowScratch<S> {
    /// Scratch using a caller-provided decomposition
    pub fn with_solver(geometry: &WhitenedGeometry, frames: usize, solver: S) -> Self {
        let msize = geometry.msize();
        Self {
            patch: Array2::zeros((geometry.mask_size(), frames)),
            solver,
            buffers: ProjectionBuffers::new(geometry, frames),
            tile: Array2::zeros((msize, msize)),
        }
    }

    /// Masked, flattened patch of the last window
    pub fn patch(&self) -> ArrayView2<'_, f64> {
        self.patch.view()
    }

    /// Tile of the last evaluated window
    pub fn tile(&self) -> ArrayView2<'_, f64> {
        self.tile.view()
    }

    /// Intermediate projection buffers of the last window
    pub const fn buffers(&self) -> &ProjectionBuffers {
        &self.buffers
    }
}

/// Masks window neighborhoods and projects them into tiles
#[derive(Debug, Clone, Copy)]
pub struct WindowEvaluator<'g> {
    geometry: &'g WhitenedGeometry,
    projector: CovarianceProjector<'g>,
    degenerate_rank: WindowPolicy,
    numerical_failure: WindowPolicy,
}

impl<'g> WindowEvaluator<'g> {
    /// Evaluator that skips degenerate and failing windows
    pub fn new(geometry: &'g WhitenedGeometry, threshold: f64, alpha: f64) -> Self {
        Self {
            geometry,
            projector: CovarianceProjector::new(geometry, threshold, alpha),
            degenerate_rank: WindowPolicy::Skip,
            numerical_failure: WindowPolicy::Skip,
        }
    }

    /// Replace the policies for degenerate ranks and numerical failures
    #[must_use]
    pub const fn with_policies(
        mut self,
        degenerate_rank: WindowPolicy,
        numerical_failure: WindowPolicy,
    ) -> Self {
        self.degenerate_rank = degenerate_rank;
        self.numerical_failure = numerical_failure;
        self
    }

    /// Shared geometry
    pub const fn geometry(&self) -> &'g WhitenedGeometry {
        self.geometry
    }

    /// Underlying projector
    pub const fn projector(&self) -> &CovarianceProjector<'g> {
        &self.projector
    }

    /// Evaluate the `side x side x frames` neighborhood `roi`
    ///
    /// On [`WindowStatus::Evaluated`] the tile is available through
    /// [`WindowScratch::tile`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `roi` is not a full window
    /// - The rank is degenerate and the degenerate policy is `Abort`
    /// - The decomposition fails and the numerical policy is `Abort`
    pub fn evaluate<S: SvdSolver>(
        &self,
        roi: ArrayView3<'_, f64>,
        scratch: &mut WindowScratch<S>,
    ) -> Result<WindowStatus> {
        let side = self.geometry.side();
        let (rows, cols, frames) = roi.dim();
        if rows != side || cols != side {
            return Err(shape_mismatch("window", &(side, side), &(rows, cols)));
        }

        let mask_size = self.geometry.mask_size();
        if scratch.patch.dim() != (mask_size, frames) {
            scratch.patch = Array2::zeros((mask_size, frames));
        }
        let mask_flat = self.geometry.mask_flat();
        for ((row, col, frame), &sample) in roi.indexed_iter() {
            let index = flat_index(row, col, side);
            let weight = mask_flat.get(index).copied().unwrap_or(0.0);
            if let Some(cell) = scratch.patch.get_mut((index, frame)) {
                *cell = sample * weight;
            }
        }

        let projected = self.projector.project(
            scratch.patch.view(),
            &mut scratch.solver,
            &mut scratch.buffers,
            &mut scratch.tile,
        );

        match projected {
            Ok(Projection::Tile { rank }) => Ok(WindowStatus::Evaluated { rank }),
            Ok(Projection::DegenerateRank {
                rank,
                singular_values,
            }) => match self.degenerate_rank {
                WindowPolicy::Skip => Ok(WindowStatus::Skipped(SkipReason::DegenerateRank(rank))),
                WindowPolicy::Abort => Err(MusicalError::DegenerateRank {
                    window: None,
                    rank,
                    singular_values,
                }),
            },
            Err(error @ MusicalError::NumericalFailure { .. }) => match self.numerical_failure {
                WindowPolicy::Skip => {
                    debug!("skipping window: {error}");
                    Ok(WindowStatus::Skipped(SkipReason::NumericalFailure))
                }
                WindowPolicy::Abort => Err(error),
            },
            Err(error) => Err(error),
        }
    }
}
