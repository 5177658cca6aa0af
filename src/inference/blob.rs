//! Built-in contrast blob detector
//!
//! Marks pixels whose luminance differs from the raster mean by more than a
//! contrast threshold, groups them into 8-connected blobs, and reports each
//! blob of plausible size as a detection. Bright and dark blobs are separate
//! classes. Confidence is the blob's mean contrast divided by a scale and
//! clamped to `[0, 1]`.

use crate::analysis::components::{BinaryMask, label_components_weighted};
use crate::inference::model::{DetectionModel, RawDetection};
use crate::io::error::Result;
use crate::spatial::Raster;
use num_traits::clamp;
use serde::{Deserialize, Serialize};

/// Class index reported for blobs brighter than their surroundings
pub const BRIGHT_CLASS_ID: u32 = 0;
/// Class index reported for blobs darker than their surroundings
pub const DARK_CLASS_ID: u32 = 1;

/// Tunable parameters of the blob detector
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobParams {
    /// Minimum absolute luminance deviation from the mean
    pub contrast_threshold: u8,
    /// Smallest blob reported, in pixels
    pub min_area: usize,
    /// Blobs covering more than this fraction of the raster are background
    pub max_area_fraction: f32,
    /// Mean contrast that maps to confidence 1.0
    pub confidence_scale: f32,
    /// Label for bright blobs
    pub bright_class: String,
    /// Label for dark blobs
    pub dark_class: String,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            contrast_threshold: 60,
            min_area: 16,
            max_area_fraction: 0.25,
            confidence_scale: 160.0,
            bright_class: "bright_object".to_string(),
            dark_class: "dark_object".to_string(),
        }
    }
}

/// Deterministic pure-Rust detector usable without an ML runtime
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlobModel {
    params: BlobParams,
}

impl BlobModel {
    /// Create a detector with the given parameters
    pub const fn new(params: BlobParams) -> Self {
        Self { params }
    }

    /// Parameters in use
    pub const fn params(&self) -> &BlobParams {
        &self.params
    }

    fn detections_for(
        &self,
        mask: &BinaryMask,
        deviation: &ndarray::Array2<f64>,
        class_id: u32,
        confidence_threshold: f32,
    ) -> Vec<RawDetection> {
        let total = (mask.width() * mask.height()) as f64;
        let max_area = (total * f64::from(self.params.max_area_fraction)).max(1.0);
        let class_name = if class_id == BRIGHT_CLASS_ID {
            &self.params.bright_class
        } else {
            &self.params.dark_class
        };

        label_components_weighted(mask, |x, y| {
            deviation.get((y, x)).copied().unwrap_or(0.0).abs()
        })
        .iter()
        .filter(|blob| blob.area >= self.params.min_area && (blob.area as f64) <= max_area)
        .filter_map(|blob| {
            let scale = f64::from(self.params.confidence_scale.max(f32::EPSILON));
            let confidence = clamp(blob.mean_weight() / scale, 0.0, 1.0) as f32;
            (confidence >= confidence_threshold).then(|| RawDetection {
                class_id,
                class_name: class_name.clone(),
                confidence,
                bbox: blob.bbox.to_bounding_box(),
            })
        })
        .collect()
    }
}

impl DetectionModel for BlobModel {
    fn name(&self) -> &str {
        "blob"
    }

    fn detect(&self, raster: &Raster, confidence_threshold: f32) -> Result<Vec<RawDetection>> {
        if raster.is_empty() {
            return Ok(Vec::new());
        }

        let luminance = raster.luminance();
        let mean = luminance.iter().map(|&v| f64::from(v)).sum::<f64>() / luminance.len() as f64;
        let deviation = luminance.mapv(|v| f64::from(v) - mean);
        let (height, width) = deviation.dim();
        let contrast = f64::from(self.params.contrast_threshold);

        let bright = BinaryMask::from_fn(width, height, |x, y| {
            deviation.get((y, x)).is_some_and(|&d| d > contrast)
        });
        let dark = BinaryMask::from_fn(width, height, |x, y| {
            deviation.get((y, x)).is_some_and(|&d| d < -contrast)
        });

        let mut detections =
            self.detections_for(&bright, &deviation, BRIGHT_CLASS_ID, confidence_threshold);
        detections.extend(self.detections_for(
            &dark,
            &deviation,
            DARK_CLASS_ID,
            confidence_threshold,
        ));
        Ok(detections)
    }
}
