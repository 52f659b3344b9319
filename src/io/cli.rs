//! Command-line interface for reconstructing a directory of frames

use crate::algorithm::executor::{Musical, MusicalConfig};
use crate::algorithm::window::WindowPolicy;
use crate::io::configuration::{
    DEFAULT_ALPHA, DEFAULT_MASK_SIZE, DEFAULT_PSF_SIGMA, DEFAULT_SUBPIXELS, DEFAULT_THRESHOLD,
    OUTPUT_SUFFIX,
};
use crate::io::error::{Result, invalid_parameter};
use crate::io::image::{export_image, load_frame_stack};
use crate::io::progress::ProgressManager;
use crate::spatial::mask::{gaussian_geometry, gaussian_mask};
use clap::Parser;
use log::info;
use ndarray::Array2;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "musical")]
#[command(
    author,
    version,
    about = "Super-resolve a stack of microscopy frames with MUSICAL"
)]
/// Command-line arguments for the reconstruction tool
// CLI tools commonly need multiple boolean flags for various features and user preferences
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Directory holding the frames (PNG or TIFF, one file per frame)
    #[arg(value_name = "FRAMES")]
    pub target: PathBuf,

    /// Output PNG path (defaults to <FRAMES>_musical.png next to the directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Sub-pixels per input pixel along each axis
    #[arg(short, long, default_value_t = DEFAULT_SUBPIXELS)]
    pub subpixels: usize,

    /// Base-10 exponent of the singular value threshold
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD, allow_hyphen_values = true)]
    pub threshold: f64,

    /// Contrast exponent
    #[arg(short, long, default_value_t = DEFAULT_ALPHA)]
    pub alpha: f64,

    /// Number of concurrent row strips (defaults to available parallelism)
    #[arg(short, long)]
    pub cores: Option<usize>,

    /// Side of the square analysis window in pixels (odd)
    #[arg(short, long, default_value_t = DEFAULT_MASK_SIZE)]
    pub mask_size: usize,

    /// Standard deviation of the Gaussian PSF in pixels
    #[arg(short, long, default_value_t = DEFAULT_PSF_SIGMA)]
    pub psf_sigma: f64,

    /// Abort instead of skipping windows whose rank degenerates
    #[arg(long)]
    pub fail_on_degenerate: bool,

    /// Abort instead of skipping windows whose decomposition fails
    #[arg(long)]
    pub fail_on_numerical: bool,

    /// Also export the window coverage grid to this path
    #[arg(long, value_name = "PATH")]
    pub counts: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Reconstruct even if the output exists
    #[arg(short, long)]
    pub no_skip: bool,
}

const fn policy(abort: bool) -> WindowPolicy {
    if abort {
        WindowPolicy::Abort
    } else {
        WindowPolicy::Skip
    }
}

impl Cli {
    /// Check if an existing output should be kept
    pub const fn skip_existing(&self) -> bool {
        !self.no_skip
    }

    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Worker count, falling back to the available parallelism
    pub fn cores(&self) -> usize {
        self.cores.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
        })
    }

    /// Reconstruction parameters selected on the command line
    pub fn config(&self) -> MusicalConfig {
        MusicalConfig {
            subpixels: self.subpixels,
            threshold: self.threshold,
            alpha: self.alpha,
            cores: self.cores(),
            degenerate_rank: policy(self.fail_on_degenerate),
            numerical_failure: policy(self.fail_on_numerical),
        }
    }

    /// Path the reconstruction is written to
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| Self::default_output_path(&self.target))
    }

    fn default_output_path(target: &Path) -> PathBuf {
        let stem = target.file_name().unwrap_or_default();
        let output_name = format!("{}{OUTPUT_SUFFIX}.png", stem.to_string_lossy());

        if let Some(parent) = target.parent() {
            parent.join(output_name)
        } else {
            PathBuf::from(output_name)
        }
    }
}

/// Runs one reconstruction described by the command line
pub struct StackProcessor {
    cli: Cli,
}

impl StackProcessor {
    /// Create a processor for the given CLI arguments
    pub const fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Load the frames, reconstruct and export
    ///
    /// # Errors
    ///
    /// Returns an error if the target is not a directory, the parameters are
    /// invalid, loading or reconstruction fails, or an output cannot be
    /// written
    pub fn process(&self) -> Result<()> {
        if !self.cli.target.is_dir() {
            return Err(invalid_parameter(
                "target",
                &self.cli.target.display(),
                &"must be a directory of frames",
            ));
        }

        let output_path = self.cli.output_path();
        if self.cli.skip_existing() && output_path.exists() {
            info!("skipping {} (output exists)", self.cli.target.display());
            return Ok(());
        }

        let start_time = Instant::now();
        let stack = load_frame_stack(&self.cli.target)?;
        let (height, width, frames) = stack.dim();
        info!("loaded {frames} frames of {height}x{width}");

        let mask = gaussian_mask(self.cli.mask_size, self.cli.psf_sigma)?;
        let gmatrix = gaussian_geometry(self.cli.mask_size, self.cli.subpixels, self.cli.psf_sigma)?;
        let musical = Musical::new(mask.view(), gmatrix.view(), self.cli.config())?;

        let windows = musical.window_count(height, width);
        let progress = if self.cli.should_show_progress() {
            ProgressManager::new(windows, &self.cli.target.display().to_string())
        } else {
            ProgressManager::hidden(windows)
        };

        let accumulation = if musical.config().cores > 1 {
            musical.accumulate_tiled(stack.view(), &progress)?
        } else {
            musical.accumulate(stack.view(), &progress)?
        };
        progress.finish();

        export_image(accumulation.normalize().view(), &output_path)?;
        if let Some(counts_path) = &self.cli.counts {
            let coverage: Array2<f64> = accumulation.grids.count.mapv(f64::from);
            export_image(coverage.view(), counts_path)?;
        }

        info!(
            "wrote {} in {:.1?} ({} of {windows} windows skipped)",
            output_path.display(),
            start_time.elapsed(),
            accumulation.skipped_windows()
        );

        Ok(())
    }
}
