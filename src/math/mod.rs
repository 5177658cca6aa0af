//! Mathematical utilities for windowed image statistics

/// Summed-area tables
pub mod integral;
