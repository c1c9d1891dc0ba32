//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Calibration file used when none is given on the command line.
    #[serde(default)]
    pub calibration_path: Option<PathBuf>,

    /// Tracker and analysis defaults.
    #[serde(default)]
    pub analysis: AnalysisDefaults,

    /// Detection worker pool settings.
    #[serde(default)]
    pub engine: EngineDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default tracker/analysis parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisDefaults {
    /// Minimum detector confidence for a candidate to be considered.
    pub acceptance_threshold: f64,

    /// Multiplier applied to confidence for every interpolated frame.
    pub confidence_decay: f64,

    /// Consecutive interpolated frames tolerated before the track is lost.
    pub max_interpolated_run: usize,

    /// Frames after a loss during which a candidate continues the flight.
    pub reacquisition_window: usize,

    /// Minimum frames in the longest segment for metrics to be computed.
    pub min_track_length: usize,

    /// Records averaged for release speed and direction.
    pub release_window: usize,

    /// Records averaged for the direction just before the bounce.
    pub pre_bounce_window: usize,

    /// Squared Mahalanobis distance accepted by the measurement gate.
    pub gate_threshold: f64,

    /// Jerk noise of the motion model (units/s^3).
    pub process_noise: f64,

    /// Position noise of a full-confidence detection (units).
    pub measurement_noise: f64,

    /// Largest plausible ball acceleration between accepted frames (m/s^2).
    pub max_acceleration_mps2: f64,

    /// Velocity/acceleration covariance multiplier applied when a plausible
    /// candidate falls outside the gate (bounce, deflection).
    pub maneuver_inflation: f64,

    /// Gate multiplier used while reacquiring a lost ball.
    pub reacquisition_gate_scale: f64,
}

/// Detection worker pool parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineDefaults {
    /// Number of detection tasks allowed in flight.
    pub detection_workers: usize,

    /// Capacity of the bounded queues around the worker pool.
    pub queue_depth: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "drs_processing_core=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            calibration_path: None,
            analysis: AnalysisDefaults::default(),
            engine: EngineDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.5,
            confidence_decay: 0.8,
            max_interpolated_run: 5,
            reacquisition_window: 10,
            min_track_length: 10,
            release_window: 3,
            pre_bounce_window: 3,
            gate_threshold: 11.83,
            process_noise: 500_000.0,
            measurement_noise: 2.0,
            max_acceleration_mps2: 2500.0,
            maneuver_inflation: 1000.0,
            reacquisition_gate_scale: 4.0,
        }
    }
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            detection_workers: 4,
            queue_depth: 8,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("drs-track").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.acceptance_threshold, 0.5);
        assert_eq!(config.analysis.max_interpolated_run, 5);
        assert_eq!(config.analysis.reacquisition_window, 10);
        assert_eq!(config.analysis.min_track_length, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config_fills_missing_sections() {
        let json = r#"{ "analysis": { "min_track_length": 4 } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.analysis.min_track_length, 4);
        assert_eq!(config.analysis.release_window, 3);
        assert_eq!(config.engine.queue_depth, 8);
        assert!(config.calibration_path.is_none());
    }
}
