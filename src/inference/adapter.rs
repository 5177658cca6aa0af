//! Uniform inference entry point over the whole-image and tiling backends
//!
//! The adapter never decides which backend to use; the engine does. It only
//! turns a model handle into a `detect` call that cannot fail: a missing model
//! yields an empty list with an `Unavailable` status, and a model error yields
//! an empty list with a `Failed` status.

use crate::inference::model::{ModelHandle, RawDetection};
use crate::spatial::Raster;
use num_traits::clamp;
use serde::{Deserialize, Serialize};

/// Which model slot an adapter wraps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// One inference call over the full image
    WholeImage,
    /// One inference call per planned tile
    Tiled,
}

/// Outcome of a single inference call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InferenceStatus {
    /// Model ran
    Ok,
    /// No model was loaded
    Unavailable {
        /// Reason recorded when loading failed
        reason: String,
    },
    /// Model raised an error for this raster
    Failed {
        /// Error message from the model
        reason: String,
    },
}

/// Detections plus the status of the call that produced them
#[derive(Clone, Debug, PartialEq)]
pub struct Inference {
    /// Sanitized detections in raster coordinates
    pub detections: Vec<RawDetection>,
    /// How the call went
    pub status: InferenceStatus,
}

/// A model handle bound to a backend slot
#[derive(Clone, Debug)]
pub struct InferenceAdapter {
    backend: Backend,
    handle: ModelHandle,
}

impl InferenceAdapter {
    /// Bind a handle to a backend slot
    pub const fn new(backend: Backend, handle: ModelHandle) -> Self {
        Self { backend, handle }
    }

    /// Backend slot of this adapter
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    /// Whether the wrapped model is loaded
    pub const fn is_available(&self) -> bool {
        self.handle.is_ready()
    }

    /// Load failure recorded on the handle, if the model is unavailable
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.handle {
            ModelHandle::Ready(_) => None,
            ModelHandle::Unavailable { reason } => Some(reason),
        }
    }

    /// Run the model on one raster
    pub fn detect(&self, raster: &Raster, confidence_threshold: f32) -> Inference {
        let model = match &self.handle {
            ModelHandle::Ready(model) => model,
            ModelHandle::Unavailable { reason } => {
                return Inference {
                    detections: Vec::new(),
                    status: InferenceStatus::Unavailable {
                        reason: reason.clone(),
                    },
                };
            }
        };

        match model.detect(raster, confidence_threshold) {
            Ok(detections) => Inference {
                detections: sanitize(detections, raster.dimensions(), confidence_threshold),
                status: InferenceStatus::Ok,
            },
            Err(error) => {
                log::warn!(
                    "{} ({:?}) failed on a {}x{} raster: {error}",
                    model.name(),
                    self.backend,
                    raster.width(),
                    raster.height()
                );
                Inference {
                    detections: Vec::new(),
                    status: InferenceStatus::Failed {
                        reason: error.to_string(),
                    },
                }
            }
        }
    }
}

/// Enforce detection invariants on model output
///
/// Drops non-finite confidences, clamps the rest to `[0, 1]`, drops those
/// below the threshold, and clips boxes to the raster (dropping boxes that
/// end up empty).
pub fn sanitize(
    detections: Vec<RawDetection>,
    raster_size: (u32, u32),
    confidence_threshold: f32,
) -> Vec<RawDetection> {
    detections
        .into_iter()
        .filter(|detection| detection.confidence.is_finite())
        .filter_map(|mut detection| {
            detection.confidence = clamp(detection.confidence, 0.0, 1.0);
            if detection.confidence < confidence_threshold {
                return None;
            }
            detection.bbox = detection.bbox.clamped(raster_size.0, raster_size.1)?;
            Some(detection)
        })
        .collect()
}
