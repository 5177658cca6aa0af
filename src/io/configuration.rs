//! Engine constants and runtime configuration defaults

use crate::io::error::{EngineError, Result, invalid_parameter};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Tiling geometry
/// Default tile width in pixels
pub const DEFAULT_TILE_WIDTH: u32 = 512;
/// Default tile height in pixels
pub const DEFAULT_TILE_HEIGHT: u32 = 512;
/// Default fraction of each tile shared with its neighbour on both axes
pub const DEFAULT_OVERLAP_RATIO: f32 = 0.2;

// Images larger than this on either axis are tiled
/// Width above which tiling activates
pub const TILING_TRIGGER_WIDTH: u32 = 1920;
/// Height above which tiling activates
pub const TILING_TRIGGER_HEIGHT: u32 = 1080;

/// IoU above which same-class detections are merged during aggregation
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;

/// Default minimum detection confidence
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// Default per-pixel change threshold
pub const DEFAULT_CHANGE_THRESHOLD: u32 = 30;

// Comparison strategies
/// Side length of the square SSIM window (odd)
pub const DEFAULT_SSIM_WINDOW: usize = 7;
/// Side length of the block-matching blocks
pub const DEFAULT_FLOW_BLOCK_SIZE: usize = 8;
/// Maximum block displacement searched on each axis
pub const DEFAULT_FLOW_SEARCH_RADIUS: usize = 4;

// Output settings
/// Suffix added to detection report filenames
pub const DETECTIONS_SUFFIX: &str = "_detections";
/// Suffix added to annotated image filenames
pub const ANNOTATED_SUFFIX: &str = "_annotated";
/// Threshold for switching to batch progress mode
pub const MAX_INDIVIDUAL_PROGRESS_BARS: usize = 5;

/// Tiled inference parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilingConfig {
    /// Whether the tiling backend may be used at all
    pub enabled: bool,
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Overlap ratio in `[0, 1)` applied to both axes
    pub overlap_ratio: f32,
    /// Tiling activates when the image is wider than this
    pub trigger_width: u32,
    /// Tiling activates when the image is taller than this
    pub trigger_height: u32,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tile_width: DEFAULT_TILE_WIDTH,
            tile_height: DEFAULT_TILE_HEIGHT,
            overlap_ratio: DEFAULT_OVERLAP_RATIO,
            trigger_width: TILING_TRIGGER_WIDTH,
            trigger_height: TILING_TRIGGER_HEIGHT,
        }
    }
}

/// Change comparison parameters shared by all methods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Connected regions smaller than this are not reported (pixels still count)
    pub min_region_area: usize,
    /// Keep at most this many regions, largest first
    pub max_regions: Option<usize>,
    /// SSIM window side length
    pub ssim_window: usize,
    /// Block-matching block side length
    pub flow_block_size: usize,
    /// Block-matching search radius
    pub flow_search_radius: usize,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            min_region_area: 1,
            max_regions: None,
            ssim_window: DEFAULT_SSIM_WINDOW,
            flow_block_size: DEFAULT_FLOW_BLOCK_SIZE,
            flow_search_radius: DEFAULT_FLOW_SEARCH_RADIUS,
        }
    }
}

/// Complete engine configuration, loadable from JSON
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tiled inference parameters
    pub tiling: TilingConfig,
    /// Cross-tile duplicate IoU threshold
    pub iou_threshold: f32,
    /// Downscale images whose longer side exceeds this before inference
    pub max_image_dimension: Option<u32>,
    /// Worker threads used for per-tile inference (1 = sequential)
    pub worker_threads: usize,
    /// Change comparison parameters
    pub comparison: ComparisonConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tiling: TilingConfig::default(),
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_image_dimension: None,
            worker_threads: 1,
            comparison: ComparisonConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Read a configuration from a JSON file; missing fields keep defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails validation
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::FileSystem {
            path: path.to_path_buf(),
            operation: "read configuration",
            source: e,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| EngineError::Config {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter against its legal range
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` naming the first offending field
    pub fn validate(&self) -> Result<()> {
        let tiling = &self.tiling;
        if tiling.tile_width == 0 || tiling.tile_height == 0 {
            return Err(invalid_parameter(
                "tile_size",
                &format!("{}x{}", tiling.tile_width, tiling.tile_height),
                &"tile dimensions must be positive",
            ));
        }
        if !(tiling.overlap_ratio.is_finite() && (0.0..1.0).contains(&tiling.overlap_ratio)) {
            return Err(invalid_parameter(
                "overlap_ratio",
                &tiling.overlap_ratio,
                &"must be in [0, 1)",
            ));
        }
        if !(self.iou_threshold.is_finite()
            && self.iou_threshold > 0.0
            && self.iou_threshold <= 1.0)
        {
            return Err(invalid_parameter(
                "iou_threshold",
                &self.iou_threshold,
                &"must be in (0, 1]",
            ));
        }
        if self.max_image_dimension == Some(0) {
            return Err(invalid_parameter(
                "max_image_dimension",
                &0,
                &"must be positive when set",
            ));
        }
        if self.worker_threads == 0 {
            return Err(invalid_parameter(
                "worker_threads",
                &0,
                &"at least one worker is required",
            ));
        }
        let comparison = &self.comparison;
        if comparison.ssim_window == 0 || comparison.ssim_window % 2 == 0 {
            return Err(invalid_parameter(
                "ssim_window",
                &comparison.ssim_window,
                &"must be a positive odd number",
            ));
        }
        if comparison.flow_block_size == 0 {
            return Err(invalid_parameter(
                "flow_block_size",
                &0,
                &"must be positive",
            ));
        }
        Ok(())
    }
}
