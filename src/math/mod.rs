//! Numerical building blocks for the reconstruction

/// Column-major index mapping shared by every reshape
pub mod layout;
/// SVD capability and its `nalgebra` implementation
pub mod svd;
