/// Sliding-window overlap-add accumulation
pub mod accumulator;
/// Row-strip parallel driver with halo overlap
pub mod driver;
/// Reconstruction configuration and entry point
pub mod executor;
/// Subspace projection and pseudo-spectrum of one patch
pub mod projector;
/// Masking and policy handling for one window
pub mod window;
