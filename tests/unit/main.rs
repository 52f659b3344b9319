//! Unit tests mirroring the `src/` layout, one file per source file


use musical::spatial::mask::{gaussian_geometry, gaussian_mask};
use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded stack of uniform samples in `[0, 1)`
pub fn random_stack(height: usize, width: usize, frames: usize, seed: u64) -> Array3<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array3::from_shape_simple_fn((height, width, frames), || rng.random::<f64>())
}

/// Gaussian mask and matching geometry matrix
pub fn gaussian_setup(side: usize, subpixels: usize, sigma: f64) -> (Array2<f64>, Array2<f64>) {
    let mask = gaussian_mask(side, sigma).unwrap_or_else(|_| Array2::ones((side, side)));
    let gmatrix = gaussian_geometry(side, subpixels, sigma)
        .unwrap_or_else(|_| Array2::ones((side * side, (side * subpixels).pow(2))));
    (mask, gmatrix)
}
