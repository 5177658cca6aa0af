//! Detection models and the inference adapter wrapped around them

/// Uniform, non-failing inference over a model handle
pub mod adapter;
/// Built-in contrast blob detector
pub mod blob;
/// Model specification loading
pub mod loader;
/// Detection model trait, raw detections and model handles
pub mod model;

pub use adapter::{Backend, Inference, InferenceAdapter, InferenceStatus};
pub use model::{DetectionModel, ModelHandle, RawDetection};
