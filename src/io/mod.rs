//! Input/output, configuration and error handling

/// Command-line interface
pub mod cli;
/// Default constants and the engine configuration
pub mod configuration;
/// Error taxonomy and validation helpers
pub mod error;
/// Image loading and PNG export
pub mod image;
/// Stderr logging backend for the binary
pub mod logger;
/// Terminal progress display
pub mod progress;
/// Serializable persistence records
pub mod report;
