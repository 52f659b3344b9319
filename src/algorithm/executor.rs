//! Reconstruction entry point tying geometry, windows and strips together

use crate::algorithm::accumulator::{self, Accumulation, window_grid};
use crate::algorithm::driver::accumulate_tiled;
use crate::algorithm::window::{WindowEvaluator, WindowPolicy};
use crate::io::configuration::{DEFAULT_ALPHA, DEFAULT_SUBPIXELS, DEFAULT_THRESHOLD};
use crate::io::error::{Result, invalid_parameter, shape_mismatch};
use crate::io::progress::ProgressSink;
use crate::spatial::WhitenedGeometry;
use log::{debug, info, warn};
use ndarray::{Array2, ArrayView2, ArrayView3};

/// Reconstruction parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MusicalConfig {
    /// Sub-pixels per input pixel along each axis
    pub subpixels: usize,
    /// Base-10 exponent of the singular value threshold
    pub threshold: f64,
    /// Contrast exponent applied to the signal/noise ratio
    pub alpha: f64,
    /// Number of row strips evaluated concurrently
    pub cores: usize,
    /// Handling of windows whose rank falls back to zero or below
    pub degenerate_rank: WindowPolicy,
    /// Handling of windows whose decomposition fails
    pub numerical_failure: WindowPolicy,
}

impl Default for MusicalConfig {
    fn default() -> Self {
        Self {
            subpixels: DEFAULT_SUBPIXELS,
            threshold: DEFAULT_THRESHOLD,
            alpha: DEFAULT_ALPHA,
            cores: 1,
            degenerate_rank: WindowPolicy::Skip,
            numerical_failure: WindowPolicy::Skip,
        }
    }
}

impl MusicalConfig {
    /// Check parameter ranges
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if `subpixels` or `cores` is zero,
    /// or if `threshold` or `alpha` is not finite
    pub fn validate(&self) -> Result<()> {
        if self.subpixels == 0 {
            return Err(invalid_parameter(
                "subpixels",
                &self.subpixels,
                &"must be at least 1",
            ));
        }
        if self.cores == 0 {
            return Err(invalid_parameter("cores", &self.cores, &"must be at least 1"));
        }
        if !self.threshold.is_finite() {
            return Err(invalid_parameter(
                "threshold",
                &self.threshold,
                &"must be finite",
            ));
        }
        if !self.alpha.is_finite() {
            return Err(invalid_parameter("alpha", &self.alpha, &"must be finite"));
        }
        Ok(())
    }
}

/// A configured reconstruction over one mask and geometry matrix
#[derive(Debug, Clone)]
pub struct Musical {
    geometry: WhitenedGeometry,
    config: MusicalConfig,
}

impl Musical {
    /// Validate the configuration and derive the whitened geometry
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the mask and
    /// geometry matrix shapes disagree
    pub fn new(
        mask: ArrayView2<'_, f64>,
        gmatrix: ArrayView2<'_, f64>,
        config: MusicalConfig,
    ) -> Result<Self> {
        config.validate()?;
        let geometry = WhitenedGeometry::new(mask, gmatrix, config.subpixels)?;
        debug!(
            "geometry ready: window {0}x{0}, {1} test points per window",
            geometry.side(),
            geometry.points()
        );
        Ok(Self { geometry, config })
    }

    /// Derived geometry
    pub const fn geometry(&self) -> &WhitenedGeometry {
        &self.geometry
    }

    /// Active configuration
    pub const fn config(&self) -> &MusicalConfig {
        &self.config
    }

    /// Window evaluator carrying the configured threshold, alpha and policies
    pub fn evaluator(&self) -> WindowEvaluator<'_> {
        WindowEvaluator::new(&self.geometry, self.config.threshold, self.config.alpha)
            .with_policies(self.config.degenerate_rank, self.config.numerical_failure)
    }

    /// Number of windows evaluated for a `height x width` image
    pub const fn window_count(&self, height: usize, width: usize) -> usize {
        let (rows, cols) = window_grid(height, width, self.geometry.pad());
        rows * cols
    }

    /// Check that `image` is a usable `[height, width, frames]` stack
    ///
    /// # Errors
    ///
    /// Returns a shape mismatch if the stack has no frames
    pub fn check_image(&self, image: ArrayView3<'_, f64>) -> Result<()> {
        let (height, width, frames) = image.dim();
        if frames == 0 {
            return Err(shape_mismatch(
                "image stack",
                &"at least one frame",
                &(height, width, frames),
            ));
        }
        if self.window_count(height, width) == 0 {
            warn!(
                "{height}x{width} image is smaller than the {0}x{0} window; output stays uncovered",
                self.geometry.side()
            );
        }
        Ok(())
    }

    /// Single-threaded sum and count grids
    ///
    /// # Errors
    ///
    /// Returns an error if the image is invalid or a window fails under an
    /// `Abort` policy
    pub fn accumulate<P>(&self, image: ArrayView3<'_, f64>, progress: &P) -> Result<Accumulation>
    where
        P: ProgressSink + ?Sized,
    {
        self.check_image(image)?;
        accumulator::accumulate(image, &self.evaluator(), progress)
    }

    /// Sum and count grids from `config.cores` concurrent strips
    ///
    /// # Errors
    ///
    /// Returns an error if the image is invalid, the worker pool cannot be
    /// built or any strip fails
    pub fn accumulate_tiled<P>(
        &self,
        image: ArrayView3<'_, f64>,
        progress: &P,
    ) -> Result<Accumulation>
    where
        P: ProgressSink + ?Sized,
    {
        self.check_image(image)?;
        accumulate_tiled(image, &self.evaluator(), self.config.cores, progress)
    }

    /// Super-resolved image: accumulated sum divided by coverage
    ///
    /// Runs tiled when more than one core is configured. Sub-pixels no
    /// window covered are NaN.
    ///
    /// # Errors
    ///
    /// Propagates any error of the accumulation
    pub fn reconstruct<P>(&self, image: ArrayView3<'_, f64>, progress: &P) -> Result<Array2<f64>>
    where
        P: ProgressSink + ?Sized,
    {
        let accumulation = if self.config.cores > 1 {
            self.accumulate_tiled(image, progress)?
        } else {
            self.accumulate(image, progress)?
        };

        let (height, width, frames) = image.dim();
        info!(
            "reconstructed {height}x{width}x{frames} stack: {} windows, {} skipped",
            accumulation.skipped.len(),
            accumulation.skipped_windows()
        );

        Ok(accumulation.normalize())
    }
}
