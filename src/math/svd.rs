//! Singular value decomposition of masked window patches

use crate::io::configuration::{SVD_EPSILON, SVD_MAX_ITERATIONS};
use crate::io::error::{Result, numerical_failure};
use nalgebra::DMatrix;
use nalgebra::linalg::SVD;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Left singular vectors and singular values of a real matrix
///
/// After a successful [`compute`](SvdSolver::compute) on an `r x c` matrix,
/// `singular_values` holds `min(r, c)` values in descending order and column
/// `i` of `left_singular_vectors` belongs to singular value `i`.
pub trait SvdSolver {
    /// Decompose `matrix`, replacing any previous result
    ///
    /// # Errors
    ///
    /// Returns a numerical failure if the decomposition does not converge or
    /// produces non-finite values
    fn compute(&mut self, matrix: ArrayView2<'_, f64>) -> Result<()>;

    /// Left singular vectors `U`, one column per singular value
    fn left_singular_vectors(&self) -> ArrayView2<'_, f64>;

    /// Singular values `S`, descending
    fn singular_values(&self) -> ArrayView1<'_, f64>;
}

/// Thin SVD backed by `nalgebra`
///
/// Keeps its output buffers between calls; each call overwrites them
/// completely.
#[derive(Debug, Clone)]
pub struct NalgebraSvd {
    u: Array2<f64>,
    s: Array1<f64>,
    epsilon: f64,
    max_iterations: usize,
}

impl Default for NalgebraSvd {
    fn default() -> Self {
        Self::new()
    }
}

impl NalgebraSvd {
    /// Create a solver with the default tolerance and iteration cap
    pub fn new() -> Self {
        Self::with_limits(SVD_EPSILON, SVD_MAX_ITERATIONS)
    }

    /// Create a solver with a custom tolerance and iteration cap
    pub fn with_limits(epsilon: f64, max_iterations: usize) -> Self {
        Self {
            u: Array2::zeros((0, 0)),
            s: Array1::zeros(0),
            epsilon,
            max_iterations,
        }
    }
}

impl SvdSolver for NalgebraSvd {
    fn compute(&mut self, matrix: ArrayView2<'_, f64>) -> Result<()> {
        let (rows, cols) = matrix.dim();
        if matrix.iter().any(|value| !value.is_finite()) {
            return Err(numerical_failure(&"patch contains non-finite samples"));
        }

        // nalgebra storage is column-major, the transposed view iterates in that order
        let decomposed = DMatrix::from_iterator(rows, cols, matrix.t().iter().copied());
        let svd = SVD::try_new(decomposed, true, false, self.epsilon, self.max_iterations)
            .ok_or_else(|| {
                numerical_failure(&format!(
                    "SVD did not converge within {} iterations",
                    self.max_iterations
                ))
            })?;
        let u = svd
            .u
            .ok_or_else(|| numerical_failure(&"SVD returned no left singular vectors"))?;

        let values: Vec<f64> = svd.singular_values.iter().copied().collect();
        if values.iter().any(|value| !value.is_finite()) {
            return Err(numerical_failure(&"SVD produced non-finite singular values"));
        }

        let rank = values.len();
        let mut order: Vec<usize> = (0..rank).collect();
        order.sort_by(|&a, &b| {
            let va = values.get(a).copied().unwrap_or(0.0);
            let vb = values.get(b).copied().unwrap_or(0.0);
            vb.total_cmp(&va)
        });

        if self.u.dim() != (rows, rank) {
            self.u = Array2::zeros((rows, rank));
        }
        if self.s.len() != rank {
            self.s = Array1::zeros(rank);
        }

        for (target, &source) in order.iter().enumerate() {
            if let Some(value) = self.s.get_mut(target) {
                *value = values.get(source).copied().unwrap_or(0.0);
            }
            let column = u.column(source);
            for (dst, src) in self.u.column_mut(target).iter_mut().zip(column.iter()) {
                *dst = *src;
            }
        }

        Ok(())
    }

    fn left_singular_vectors(&self) -> ArrayView2<'_, f64> {
        self.u.view()
    }

    fn singular_values(&self) -> ArrayView1<'_, f64> {
        self.s.view()
    }
}
