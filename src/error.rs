//! Error types for depth-based object tracking.
//!
//! Per-pixel sensor anomalies are never errors; they are folded into the
//! observation model. Only configuration, usage and numerical collapse surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackingError {
    /// A device backend was requested but is not compiled in or was not supplied.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// `track` was called before `initialize`.
    #[error("Tracker is not initialized, call initialize before track")]
    NotInitialized,

    /// Every particle evaluated to zero likelihood; the caller should reinitialize.
    #[error("Degenerate belief: likelihood collapsed across all {particles} particles")]
    DegenerateBelief { particles: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Image error: {0}")]
    Image(String),
}

impl From<serde_yaml::Error> for TrackingError {
    fn from(err: serde_yaml::Error) -> Self {
        TrackingError::Parse(err.to_string())
    }
}

impl From<image::ImageError> for TrackingError {
    fn from(err: image::ImageError) -> Self {
        TrackingError::Image(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrackingError>;
