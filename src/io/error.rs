//! Error types and context management for reconstruction operations

use std::fmt;
use std::path::PathBuf;

/// Main error type for all reconstruction operations
#[derive(Debug)]
pub enum MusicalError {
    /// Failed to load a frame from the filesystem
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image loading error
        source: image::ImageError,
    },

    /// Input data doesn't meet reconstruction requirements
    InvalidSourceData {
        /// Description of what's wrong with the input data
        reason: String,
    },

    /// Array dimensions are inconsistent with each other
    ///
    /// Raised before any window is evaluated, e.g. when:
    /// - The mask is not square or has an even side
    /// - The geometry matrix does not match the mask or sub-pixel grid
    /// - The frame stack is empty or frames differ in size
    ShapeMismatch {
        /// What was being checked
        what: &'static str,
        /// Expected dimensions
        expected: String,
        /// Dimensions that were found
        found: String,
    },

    /// The decomposition of a single window failed
    NumericalFailure {
        /// Window center `(row, col)` in input pixels, when known
        window: Option<(usize, usize)>,
        /// Description of the failure
        reason: String,
    },

    /// Rank selection fell back to a non-positive subspace dimension
    DegenerateRank {
        /// Window center `(row, col)` in input pixels, when known
        window: Option<(usize, usize)>,
        /// The selected rank after fallback
        rank: isize,
        /// Number of singular values that were available
        singular_values: usize,
    },

    /// A worker of the tiled driver failed
    StripFailed {
        /// Index of the strip, counted from the top of the image
        strip: usize,
        /// Error raised inside the strip
        source: Box<MusicalError>,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Failed to save an output image to disk
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image export error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Supporting computation could not be set up
    Computation {
        /// Name of the computation that failed
        operation: &'static str,
        /// Description of the failure
        reason: String,
    },
}

fn describe_window(window: Option<(usize, usize)>) -> String {
    window.map_or_else(
        || "unknown window".to_string(),
        |(row, col)| format!("window ({row}, {col})"),
    )
}

impl fmt::Display for MusicalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::InvalidSourceData { reason } => {
                write!(f, "Invalid source data: {reason}")
            }
            Self::ShapeMismatch {
                what,
                expected,
                found,
            } => {
                write!(f, "Shape mismatch for {what}: expected {expected}, found {found}")
            }
            Self::NumericalFailure { window, reason } => {
                write!(
                    f,
                    "Numerical failure at {}: {reason}",
                    describe_window(*window)
                )
            }
            Self::DegenerateRank {
                window,
                rank,
                singular_values,
            } => {
                write!(
                    f,
                    "Degenerate signal rank {rank} at {} ({singular_values} singular values)",
                    describe_window(*window)
                )
            }
            Self::StripFailed { strip, source } => {
                write!(f, "Strip {strip} failed: {source}")
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::Computation { operation, reason } => {
                write!(f, "Computation error in {operation}: {reason}")
            }
        }
    }
}

impl std::error::Error for MusicalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } | Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            Self::StripFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Convenience type alias for reconstruction results
pub type Result<T> = std::result::Result<T, MusicalError>;

/// Additional context to enrich per-window error messages
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorContext {
    /// Window center `(row, col)` being evaluated
    pub window: Option<(usize, usize)>,
}

/// Enriches errors with the window that produced them
pub trait WithContext<T> {
    /// Add error context to a Result
    ///
    /// # Errors
    ///
    /// Propagates the original error with additional context applied
    fn with_context(self, context: ErrorContext) -> Result<T>;

    /// Add just the window center
    ///
    /// # Errors
    ///
    /// Propagates the original error with the window position applied
    fn with_window(self, row: usize, col: usize) -> Result<T>;
}

impl<T, E> WithContext<T> for std::result::Result<T, E>
where
    E: Into<MusicalError>,
{
    fn with_context(self, context: ErrorContext) -> Result<T> {
        self.map_err(|e| {
            let mut error = e.into();
            // Only per-window failures carry a position
            match &mut error {
                MusicalError::NumericalFailure { window, .. }
                | MusicalError::DegenerateRank { window, .. } => {
                    if context.window.is_some() {
                        *window = context.window;
                    }
                }
                _ => {}
            }
            error
        })
    }

    fn with_window(self, row: usize, col: usize) -> Result<T> {
        self.with_context(ErrorContext {
            window: Some((row, col)),
        })
    }
}

impl From<image::ImageError> for MusicalError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageLoad {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<std::io::Error> for MusicalError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> MusicalError {
    MusicalError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a shape mismatch error
pub fn shape_mismatch(
    what: &'static str,
    expected: &impl fmt::Debug,
    found: &impl fmt::Debug,
) -> MusicalError {
    MusicalError::ShapeMismatch {
        what,
        expected: format!("{expected:?}"),
        found: format!("{found:?}"),
    }
}

/// Create a numerical failure error without a window position
pub fn numerical_failure(reason: &impl ToString) -> MusicalError {
    MusicalError::NumericalFailure {
        window: None,
        reason: reason.to_string(),
    }
}

/// Create a computation error
pub fn computation_error(operation: &'static str, reason: &impl ToString) -> MusicalError {
    MusicalError::Computation {
        operation,
        reason: reason.to_string(),
    }
}
