//! Model loading from JSON model specifications
//!
//! Loading never aborts the caller: any failure becomes an `Unavailable`
//! handle carrying the reason, and the engine degrades around it.

use crate::inference::blob::{BlobModel, BlobParams};
use crate::inference::model::ModelHandle;
use crate::io::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable description of which model to build
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    /// Built-in contrast blob detector
    Blob(BlobParams),
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::Blob(BlobParams::default())
    }
}

/// Parse a model specification file
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not describe a
/// supported model
pub fn read_model_spec(path: &Path) -> Result<ModelSpec> {
    let text = std::fs::read_to_string(path).map_err(|e| EngineError::FileSystem {
        path: path.to_path_buf(),
        operation: "read model specification",
        source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| EngineError::Config {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Instantiate the model a specification describes
pub fn build_model(spec: ModelSpec) -> ModelHandle {
    match spec {
        ModelSpec::Blob(params) => ModelHandle::ready(BlobModel::new(params)),
    }
}

/// Load the model at `path`, or the built-in default when no path is given
pub fn load_model(path: Option<&Path>) -> ModelHandle {
    let Some(path) = path else {
        return build_model(ModelSpec::default());
    };

    match read_model_spec(path) {
        Ok(spec) => {
            log::info!("Loaded model specification from {}", path.display());
            build_model(spec)
        }
        Err(error) => {
            log::warn!("Model unavailable: {error}");
            ModelHandle::unavailable(error.to_string())
        }
    }
}
