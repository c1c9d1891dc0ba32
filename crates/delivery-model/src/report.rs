//! Persisted analysis report.
//!
//! A report is the envelope written next to the tracking stream after an
//! analysis: which calibration was used, the tracked records, and the
//! outcome.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisOutcome;
use crate::calibration::Calibration;
use crate::tracking::BallTrackingData;

/// Current schema version for reports.
pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Analysis report file (`report.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub schema_version: String,

    /// Generation timestamp (RFC 3339).
    pub generated_at: String,

    /// Name of the detector backend that produced the candidates.
    #[serde(default)]
    pub detector: String,

    /// Number of frames read from the source.
    #[serde(default)]
    pub frames_processed: u64,

    pub calibration: Calibration,

    /// The selected track segment.
    pub tracking: Vec<BallTrackingData>,

    pub outcome: AnalysisOutcome,
}

impl AnalysisReport {
    pub fn new(
        detector: impl Into<String>,
        frames_processed: u64,
        calibration: Calibration,
        tracking: Vec<BallTrackingData>,
        outcome: AnalysisOutcome,
    ) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            detector: detector.into(),
            frames_processed,
            calibration,
            tracking,
            outcome,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ModelError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ModelError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ModelError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Generation time parsed back into a timestamp.
    pub fn generated_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::parse_from_rfc3339(&self.generated_at)
            .ok()
            .map(|t| t.with_timezone(&chrono::Utc))
    }
}

/// Errors that can occur when reading or writing model files.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid calibration: {message}")]
    ValidationError { message: String },
}
