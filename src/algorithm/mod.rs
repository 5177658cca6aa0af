//! Detection aggregation and the engine facade

/// Cross-tile remapping and duplicate suppression
pub mod aggregation;
/// Backend selection, tiled inference and comparison entry points
pub mod engine;
