//! Error types for engine operations
//!
//! Only invalid parameters, unreadable configuration and broken internal
//! geometry surface as `Err`. Decode failures and missing models are reported
//! as typed statuses inside successful results (see `AnalysisStatus` and
//! `ComparisonStatus`).

use std::fmt;
use std::path::PathBuf;

/// Main error type for all engine operations
#[derive(Debug)]
pub enum EngineError {
    /// Failed to decode an image from the filesystem
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image decoding error
        source: image::ImageError,
    },

    /// Image decoded but cannot be processed
    InvalidImage {
        /// Path to the image file
        path: PathBuf,
        /// Description of what is wrong with the decoded image
        reason: String,
    },

    /// Call parameter rejected before any processing
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Failed to save an image to disk
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image encoding error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configuration or model specification file could not be parsed
    Config {
        /// Path of the configuration file
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// Result record could not be serialized
    Serialization {
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// Internal tile or box geometry broke its contract
    Geometry {
        /// Name of the operation that produced the geometry
        operation: &'static str,
        /// Description of the violation
        reason: String,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::InvalidImage { path, reason } => {
                write!(f, "Invalid image '{}': {reason}", path.display())
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::Config { path, source } => {
                write!(f, "Failed to parse '{}': {source}", path.display())
            }
            Self::Serialization { source } => {
                write!(f, "Failed to serialize result: {source}")
            }
            Self::Geometry { operation, reason } => {
                write!(f, "Geometry error in {operation}: {reason}")
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } | Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            Self::Config { source, .. } | Self::Serialization { source } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for engine results
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization { source: err }
    }
}

impl EngineError {
    /// True for errors caused by the caller's input rather than the engine
    pub const fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> EngineError {
    EngineError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a geometry contract error
pub fn geometry_error(operation: &'static str, reason: &impl ToString) -> EngineError {
    EngineError::Geometry {
        operation,
        reason: reason.to_string(),
    }
}

/// Reject a confidence threshold outside `[0, 1]`
///
/// # Errors
///
/// Returns `InvalidParameter` if the value is not finite or out of range
pub fn check_confidence(confidence: f32) -> Result<f32> {
    if confidence.is_finite() && (0.0..=1.0).contains(&confidence) {
        Ok(confidence)
    } else {
        Err(invalid_parameter(
            "confidence_threshold",
            &confidence,
            &"must be a finite value in [0, 1]",
        ))
    }
}

/// Reject a change threshold outside `[1, 100]`
///
/// # Errors
///
/// Returns `InvalidParameter` if the value is out of range
pub fn check_change_threshold(threshold: u32) -> Result<u32> {
    if (1..=100).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(invalid_parameter(
            "threshold",
            &threshold,
            &"must be in [1, 100]",
        ))
    }
}
