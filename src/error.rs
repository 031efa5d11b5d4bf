// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the pose visualization pipeline.

use std::fmt;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PoseError>;

/// Main error type for the pose visualization pipeline.
#[derive(Debug)]
pub enum PoseError {
    /// The camera or video file could not be opened.
    SourceUnavailable(String),
    /// A frame read failed after the source was opened.
    ReadFailure(String),
    /// Error loading the pose model.
    ModelLoadError(String),
    /// Error while running the pose model.
    InferenceError(String),
    /// Error processing images.
    ImageError(String),
    /// Invalid configuration provided.
    ConfigError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
    /// Window or render surface error.
    VisualizerError(String),
    /// Feature not enabled.
    FeatureNotEnabled(String),
    /// The estimator was used after `release()`.
    Released,
}

impl PoseError {
    /// Whether the error ends a run (as opposed to a per-frame condition).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::ImageError(_) | Self::VisualizerError(_))
    }
}

impl fmt::Display for PoseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnavailable(msg) => write!(f, "Source unavailable: {msg}"),
            Self::ReadFailure(msg) => write!(f, "Frame read failure: {msg}"),
            Self::ModelLoadError(msg) => write!(f, "Model load error: {msg}"),
            Self::InferenceError(msg) => write!(f, "Inference error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::VisualizerError(msg) => write!(f, "Visualizer error: {msg}"),
            Self::FeatureNotEnabled(msg) => write!(f, "Feature not enabled: {msg}"),
            Self::Released => write!(f, "Pose estimator already released"),
        }
    }
}

impl std::error::Error for PoseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PoseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for PoseError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}
