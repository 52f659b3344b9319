//! Signal-subspace (MUSICAL) super-resolution for fluorescence microscopy
//!
//! Every neighborhood of a frame stack is decomposed with an SVD, split into
//! a signal and a noise subspace, and turned into a sub-pixel pseudo-spectrum
//! tile. Tiles are overlap-added into a finer grid and averaged by coverage.

#![deny(unsafe_code)]

/// Windowed estimator, accumulation and the tiled parallel driver
pub mod algorithm;
/// Input/output operations, configuration and error handling
pub mod io;
/// Index layout and SVD building blocks
pub mod math;
/// Geometry, masks and sub-pixel grids
pub mod spatial;

pub use algorithm::executor::{Musical, MusicalConfig};
pub use io::error::{MusicalError, Result};
