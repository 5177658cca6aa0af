//! Serializable records handed to the persistence collaborator

use crate::algorithm::aggregation::AggregatedDetection;
use crate::algorithm::engine::{Analysis, AnalysisStatus};
use crate::inference::adapter::Backend;
use crate::io::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Box as top-left corner plus extent
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct XywhBox {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Box width
    pub width: f32,
    /// Box height
    pub height: f32,
}

/// One stored detection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Model class index
    pub class_id: u32,
    /// Human-readable class label
    pub class_name: String,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
    /// Box in `x/y/width/height` form
    pub bbox: XywhBox,
    /// Box as `[x_min, y_min, x_max, y_max]`
    pub bbox_xyxy: [f32; 4],
    /// Tiles that reported the object
    pub source_tiles: Vec<usize>,
}

impl From<&AggregatedDetection> for DetectionRecord {
    fn from(detection: &AggregatedDetection) -> Self {
        let [x, y, width, height] = detection.bbox.to_xywh();
        let b = &detection.bbox;
        Self {
            class_id: detection.class_id,
            class_name: detection.class_name.clone(),
            confidence: detection.confidence,
            bbox: XywhBox {
                x,
                y,
                width,
                height,
            },
            bbox_xyxy: [b.x_min, b.y_min, b.x_max, b.y_max],
            source_tiles: detection.source_tiles.iter().copied().collect(),
        }
    }
}

/// Persistence record for one analyzed image
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Caller-chosen task identifier
    pub task_id: String,
    /// Image that was analyzed
    pub image_path: String,
    /// Outcome of the analysis
    pub status: AnalysisStatus,
    /// Number of detections kept
    pub detection_count: usize,
    /// Detections by descending confidence
    pub detections: Vec<DetectionRecord>,
    /// Wall time of the analysis in seconds
    pub processing_time_secs: f64,
    /// Backend that ran, if any
    pub backend: Option<Backend>,
    /// Whether more than one tile was inferred
    pub tiled: bool,
    /// Tiles sent to the model
    pub tile_count: usize,
    /// Source `(width, height)`
    pub image_size: (u32, u32),
}

impl AnalysisReport {
    /// Build the record for an analysis of `image_path`
    pub fn from_analysis(task_id: impl Into<String>, image_path: &Path, analysis: &Analysis) -> Self {
        Self {
            task_id: task_id.into(),
            image_path: image_path.display().to_string(),
            status: analysis.status.clone(),
            detection_count: analysis.detection_count(),
            detections: analysis.detections.iter().map(DetectionRecord::from).collect(),
            processing_time_secs: analysis.elapsed.as_secs_f64(),
            backend: analysis.backend,
            tiled: analysis.is_tiled(),
            tile_count: analysis.tile_count,
            image_size: analysis.image_size,
        }
    }
}

/// Pretty-printed JSON for any record
///
/// # Errors
///
/// Returns `Serialization` if the value cannot be encoded
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| EngineError::Serialization { source: e })
}

/// Write a record as pretty-printed JSON, creating parent directories
///
/// # Errors
///
/// Returns an error if serialization fails or the file cannot be written
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let text = to_json(value)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::FileSystem {
            path: parent.to_path_buf(),
            operation: "create directory",
            source: e,
        })?;
    }
    std::fs::write(path, text).map_err(|e| EngineError::FileSystem {
        path: path.to_path_buf(),
        operation: "write report",
        source: e,
    })
}
