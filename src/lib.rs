//! Tiled object detection and two-image change detection for aerial imagery
//!
//! Oversized images are split into an overlapping tile grid, each tile is run
//! through a detection model, and the per-tile detections are remapped and
//! deduplicated into one list for the whole image. Independently, two images
//! can be compared to localize the pixels and regions that changed.

#![forbid(unsafe_code)]

/// Detection aggregation and the engine facade
pub mod algorithm;
/// Change detection between two images
pub mod analysis;
/// Detection model abstraction, adapters and the built-in model
pub mod inference;
/// Input/output operations, configuration and error handling
pub mod io;
/// Summed-area tables
pub mod math;
/// Rasters, boxes and tile planning
pub mod spatial;

pub use algorithm::engine::{Analysis, AnalysisStatus, Engine, ModelSet};
pub use analysis::change::{ComparisonMethod, ComparisonResult};
pub use io::error::{EngineError, Result};
