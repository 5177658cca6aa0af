//! Change detection between two images

/// Alignment, differencing and summary of two rasters
pub mod change;
/// Binary masks and connected component labelling
pub mod components;
/// Motion-compensated differencing by block matching
pub mod flow;
/// Structural similarity differencing
pub mod ssim;
