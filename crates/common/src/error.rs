//! Error types shared across DRS-Track crates.

use std::path::PathBuf;

/// Top-level error type for DRS-Track operations.
#[derive(Debug, thiserror::Error)]
pub enum DrsError {
    #[error("Invalid calibration: {message}")]
    InvalidCalibration { message: String },

    #[error("Insufficient track length: longest segment has {longest} frames, {required} required")]
    InsufficientTrackLength { longest: usize, required: usize },

    #[error("Trajectory projection failed: {message}")]
    ProjectionFailed { message: String },

    #[error("Detection error: {message}")]
    Detection { message: String },

    #[error("Tracking error: {message}")]
    Tracking { message: String },

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using DrsError.
pub type DrsResult<T> = Result<T, DrsError>;

impl DrsError {
    pub fn invalid_calibration(msg: impl Into<String>) -> Self {
        Self::InvalidCalibration {
            message: msg.into(),
        }
    }

    pub fn projection_failed(msg: impl Into<String>) -> Self {
        Self::ProjectionFailed {
            message: msg.into(),
        }
    }

    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection {
            message: msg.into(),
        }
    }

    pub fn tracking(msg: impl Into<String>) -> Self {
        Self::Tracking {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error means "no analysis could be produced" rather than
    /// a fault in the input or the environment.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientTrackLength { .. } | Self::ProjectionFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_track_message() {
        let err = DrsError::InsufficientTrackLength {
            longest: 1,
            required: 10,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient track length: longest segment has 1 frames, 10 required"
        );
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_calibration_error_is_fatal_not_unavailable() {
        let err = DrsError::invalid_calibration("stump rectangle is empty");
        assert!(!err.is_unavailable());
        assert!(err.to_string().contains("stump rectangle"));
    }
}
