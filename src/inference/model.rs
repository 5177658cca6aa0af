//! Detection model abstraction and the explicit model handle

use crate::io::error::Result;
use crate::spatial::{BoundingBox, Raster};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One detection in the pixel coordinates of the raster it came from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Model class index
    pub class_id: u32,
    /// Human-readable class label
    pub class_name: String,
    /// Model-reported confidence in `[0, 1]`
    pub confidence: f32,
    /// Box in the source raster's pixel space
    pub bbox: BoundingBox,
}

/// A loaded object detector
///
/// Implementations must be pure functions of the raster, the threshold and
/// their own immutable weights so tiles can be processed in any order.
pub trait DetectionModel: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Detect objects with confidence at or above `confidence_threshold`
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails for this raster
    fn detect(&self, raster: &Raster, confidence_threshold: f32) -> Result<Vec<RawDetection>>;
}

/// A model that is either loaded or known to be unavailable
#[derive(Clone)]
pub enum ModelHandle {
    /// Model loaded and ready for inference
    Ready(Arc<dyn DetectionModel>),
    /// Loading failed; inference degrades to an empty result
    Unavailable {
        /// Why the model could not be loaded
        reason: String,
    },
}

impl ModelHandle {
    /// Wrap a loaded model
    pub fn ready<M: DetectionModel + 'static>(model: M) -> Self {
        Self::Ready(Arc::new(model))
    }

    /// Record a failed load
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// True when a model is loaded
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The loaded model, if any
    pub fn model(&self) -> Option<&dyn DetectionModel> {
        match self {
            Self::Ready(model) => Some(model.as_ref()),
            Self::Unavailable { .. } => None,
        }
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(model) => write!(f, "ModelHandle::Ready({})", model.name()),
            Self::Unavailable { reason } => write!(f, "ModelHandle::Unavailable({reason})"),
        }
    }
}
