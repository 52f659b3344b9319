//! Spatial data structures shared across windows
//!
//! This module contains spatial-related functionality including:
//! - Window padding and Gaussian PSF models
//! - The whitened geometry derived once per reconstruction
//! - Sub-pixel sum and coverage grids

/// Whitened geometry and per-test-point energy
pub mod geometry;
/// Overlap-add sum and count grids
pub mod grid;
/// Padding radius and Gaussian mask/geometry builders
pub mod mask;

pub use geometry::WhitenedGeometry;
pub use grid::OverlapGrids;
