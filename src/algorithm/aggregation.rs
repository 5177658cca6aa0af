//! Cross-tile detection aggregation
//!
//! Per-tile detections are translated into full-image coordinates, then
//! same-class detections overlapping above the IoU threshold are collapsed
//! into the best one. Overlapping tiles see objects in their shared band
//! twice, so without this step such objects would be double counted.
//!
//! Ranking for both survival and output order is: confidence descending,
//! then earliest tile in row-major plan order, then smaller box area, then
//! input order.

use crate::inference::model::RawDetection;
use crate::io::error::{Result, invalid_parameter};
use crate::spatial::{BoundingBox, Tile};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// A detection in full-image coordinates with the tiles that reported it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDetection {
    /// Model class index
    pub class_id: u32,
    /// Human-readable class label
    pub class_name: String,
    /// Confidence of the surviving detection
    pub confidence: f32,
    /// Box in full-image pixel space
    pub bbox: BoundingBox,
    /// Ids of every tile whose detection merged into this one
    pub source_tiles: BTreeSet<usize>,
}

/// Output of one aggregation pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregation {
    /// Survivors ordered by descending confidence
    pub detections: Vec<AggregatedDetection>,
    /// Number of detections merged into a survivor
    pub duplicates_removed: usize,
}

struct Candidate {
    detection: AggregatedDetection,
    tile_id: usize,
    area: f32,
    sequence: usize,
}

fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.detection
        .confidence
        .total_cmp(&a.detection.confidence)
        .then(a.tile_id.cmp(&b.tile_id))
        .then(a.area.total_cmp(&b.area))
        .then(a.sequence.cmp(&b.sequence))
}

/// Translate a tile-local detection into full-image coordinates
///
/// The box is clipped to the image; `None` if nothing valid remains.
pub fn remap(
    tile: &Tile,
    detection: &RawDetection,
    image_size: (u32, u32),
) -> Option<AggregatedDetection> {
    let bbox = detection
        .bbox
        .translated(tile.origin.0 as f32, tile.origin.1 as f32)
        .clamped(image_size.0, image_size.1)?;

    Some(AggregatedDetection {
        class_id: detection.class_id,
        class_name: detection.class_name.clone(),
        confidence: detection.confidence,
        bbox,
        source_tiles: BTreeSet::from([tile.id]),
    })
}

/// Merges duplicate detections produced by overlapping tiles
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aggregator {
    iou_threshold: f32,
}

impl Aggregator {
    /// Create an aggregator that merges same-class boxes with IoU above `iou_threshold`
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` unless the threshold is in `(0, 1]`
    pub fn new(iou_threshold: f32) -> Result<Self> {
        if iou_threshold.is_finite() && iou_threshold > 0.0 && iou_threshold <= 1.0 {
            Ok(Self { iou_threshold })
        } else {
            Err(invalid_parameter(
                "iou_threshold",
                &iou_threshold,
                &"must be in (0, 1]",
            ))
        }
    }

    /// Configured merge threshold
    pub const fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    /// Remap, deduplicate and order detections from every tile
    pub fn aggregate(
        &self,
        tiles_with_detections: &[(Tile, Vec<RawDetection>)],
        image_size: (u32, u32),
    ) -> Aggregation {
        let mut candidates = Vec::new();
        for (tile, detections) in tiles_with_detections {
            for detection in detections {
                if let Some(remapped) = remap(tile, detection, image_size) {
                    candidates.push(Candidate {
                        area: remapped.bbox.area(),
                        detection: remapped,
                        tile_id: tile.id,
                        sequence: candidates.len(),
                    });
                }
            }
        }
        candidates.sort_by(rank);

        let mut kept: Vec<AggregatedDetection> = Vec::with_capacity(candidates.len());
        let mut kept_by_class: HashMap<u32, Vec<usize>> = HashMap::new();
        let mut duplicates_removed = 0;

        for candidate in candidates {
            let class_members = kept_by_class
                .entry(candidate.detection.class_id)
                .or_default();

            let survivor = class_members.iter().copied().find(|&index| {
                kept.get(index).is_some_and(|existing| {
                    existing.bbox.iou(&candidate.detection.bbox) > self.iou_threshold
                })
            });

            match survivor.and_then(|index| kept.get_mut(index)) {
                Some(existing) => {
                    existing
                        .source_tiles
                        .extend(candidate.detection.source_tiles.iter().copied());
                    duplicates_removed += 1;
                }
                None => {
                    class_members.push(kept.len());
                    kept.push(candidate.detection);
                }
            }
        }

        Aggregation {
            detections: kept,
            duplicates_removed,
        }
    }
}
