//! Reconstruction constants and runtime configuration defaults

// Default values for configurable parameters
/// Sub-pixels per input pixel along each axis
pub const DEFAULT_SUBPIXELS: usize = 10;

/// Base-10 exponent of the singular value threshold
pub const DEFAULT_THRESHOLD: f64 = -0.5;

/// Contrast exponent applied to the signal/noise ratio
pub const DEFAULT_ALPHA: f64 = 4.0;

/// Side length of the square analysis window (must be odd)
pub const DEFAULT_MASK_SIZE: usize = 7;

/// Standard deviation of the Gaussian PSF model, in input pixels
pub const DEFAULT_PSF_SIGMA: f64 = 1.0;

// Decomposition limits
/// Convergence tolerance handed to the SVD routine
pub const SVD_EPSILON: f64 = f64::EPSILON;

// Bounds the bidiagonal sweep so degenerate patches fail instead of spinning
/// Maximum SVD iterations before a window is reported as non-convergent
pub const SVD_MAX_ITERATIONS: usize = 10_000;

// Input and output settings
/// Frame file extensions picked up from the input directory
pub const FRAME_EXTENSIONS: [&str; 3] = ["png", "tif", "tiff"];
/// Suffix added to the output filename
pub const OUTPUT_SUFFIX: &str = "_musical";
/// Largest value written to 16-bit output images
pub const OUTPUT_WHITE_LEVEL: f64 = 65_535.0;

// Progress bar display settings
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;
