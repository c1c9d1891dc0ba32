//! Calibration record.
//!
//! A calibration describes the camera view of one ground: metric scale,
//! frame rate, where the stumps are, which way the ball travels, and the
//! thresholds used to classify deliveries. It is loaded once per analysis
//! and never mutated.
//!
//! All geometry is evaluated in the plane of the tracked positions:
//!
//! - `along(p)` is the signed distance along the pitch axis from the stumps
//!   plane, negative on the bowler's side.
//! - `lateral(p)` is the signed perpendicular offset from the line through
//!   the stumps reference along the pitch axis.
//! - `height(p)` is the offset along the up axis from the stumps base.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geometry::{Position, Rect, Velocity};
use crate::report::ModelError;

/// A direction in the analysis plane. Need not be normalized on disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub x: f64,
    pub y: f64,
}

impl Axis {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn vector(&self) -> Velocity {
        Velocity::new(self.x, self.y)
    }

    /// Unit vector along the axis; the raw vector if it has no length.
    pub fn unit(&self) -> Velocity {
        let v = self.vector();
        v.normalized().unwrap_or(v)
    }
}

/// Allowed range of `lateral(pitchPoint)` for a ball pitching in line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LateralBounds {
    pub min: f64,
    pub max: f64,
}

impl LateralBounds {
    pub fn contains(&self, lateral: f64) -> bool {
        lateral >= self.min && lateral <= self.max
    }
}

/// Ball-type classification thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassificationThresholds {
    /// Minimum absolute swing for a swing classification (degrees).
    pub min_swing_angle_deg: f64,

    /// Pitch distance below which a delivery is a yorker (meters).
    pub yorker_distance_m: f64,

    /// Post-bounce vertical speed above which a delivery is a bouncer (m/s).
    pub bouncer_vertical_speed_mps: f64,
}

impl Default for ClassificationThresholds {
    fn default() -> Self {
        Self {
            min_swing_angle_deg: 1.5,
            yorker_distance_m: 2.0,
            bouncer_vertical_speed_mps: 7.0,
        }
    }
}

/// Weights of the LBW probability model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LbwWeights {
    /// Logistic steepness applied to the normalized impact margin.
    pub margin_steepness: f64,

    /// Multiplier applied when no bounce was detected, in `(0, 1]`.
    pub no_bounce_factor: f64,

    /// Multiplier applied when the ball pitched outside the line, in `(0, 1]`.
    pub outside_line_factor: f64,
}

impl Default for LbwWeights {
    fn default() -> Self {
        Self {
            margin_steepness: 4.0,
            no_bounce_factor: 0.6,
            outside_line_factor: 0.2,
        }
    }
}

/// Camera and ground calibration for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calibration {
    /// Meters per position unit.
    pub meters_per_unit: f64,

    /// Video frame rate (frames per second).
    pub frame_rate: f64,

    /// Direction of ball travel, bowler to batter.
    pub pitch_axis: Axis,

    /// Direction of increasing height.
    pub up_axis: Axis,

    /// Base of the middle stump.
    pub stumps_reference: Position,

    /// Stump silhouette in the analysis plane.
    pub stumps: Rect,

    /// Height of the bails above the stumps base, in position units.
    pub bail_height: f64,

    /// Lateral range of an in-line pitch, in position units.
    pub in_line: LateralBounds,

    #[serde(default)]
    pub thresholds: ClassificationThresholds,

    /// Converts fitted path curvature (1/m) to rpm.
    pub curvature_to_rpm: f64,

    /// Vertical speed band treated as "not descending" (units/s).
    pub bounce_tolerance: f64,

    /// Fraction of the swing angle applied as post-bounce deviation.
    pub bounce_deviation_coefficient: f64,

    #[serde(default)]
    pub lbw: LbwWeights,
}

impl Default for Calibration {
    /// Side-on broadcast view of an 800x400 frame, image y pointing down.
    fn default() -> Self {
        Self {
            meters_per_unit: 0.0359,
            frame_rate: 60.0,
            pitch_axis: Axis::new(1.0, 0.0),
            up_axis: Axis::new(0.0, -1.0),
            stumps_reference: Position::new(620.0, 360.0),
            stumps: Rect::new(616.0, 340.0, 624.0, 360.0),
            bail_height: 20.0,
            in_line: LateralBounds {
                min: -6.0,
                max: 6.0,
            },
            thresholds: ClassificationThresholds::default(),
            curvature_to_rpm: 150_000.0,
            bounce_tolerance: 5.0,
            bounce_deviation_coefficient: 0.5,
            lbw: LbwWeights::default(),
        }
    }
}

impl Calibration {
    /// Load and validate a calibration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let calibration: Calibration =
            serde_json::from_str(&json).map_err(|e| ModelError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        calibration.validate()?;
        Ok(calibration)
    }

    /// Write the calibration as pretty JSON.
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

    /// Check every field; all problems are reported together.
    pub fn validate(&self) -> Result<(), ModelError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ModelError::ValidationError {
                message: problems.join("; "),
            })
        }
    }

    fn problems(&self) -> Vec<String> {
        let mut errors = vec![];

        let positive = |name: &str, value: f64, errors: &mut Vec<String>| {
            if !(value.is_finite() && value > 0.0) {
                errors.push(format!("{name} must be positive and finite (got {value})"));
            }
        };
        let non_negative = |name: &str, value: f64, errors: &mut Vec<String>| {
            if !(value.is_finite() && value >= 0.0) {
                errors.push(format!("{name} must be non-negative (got {value})"));
            }
        };
        let factor = |name: &str, value: f64, errors: &mut Vec<String>| {
            if !(value > 0.0 && value <= 1.0) {
                errors.push(format!("{name} must be in (0, 1] (got {value})"));
            }
        };

        positive("metersPerUnit", self.meters_per_unit, &mut errors);
        positive("frameRate", self.frame_rate, &mut errors);
        positive("bailHeight", self.bail_height, &mut errors);

        let pitch = self.pitch_axis.vector();
        let up = self.up_axis.vector();
        if pitch.normalized().is_none() {
            errors.push("pitchAxis must be a non-zero direction".into());
        }
        if up.normalized().is_none() {
            errors.push("upAxis must be a non-zero direction".into());
        }
        if let (Some(p), Some(u)) = (pitch.normalized(), up.normalized()) {
            if p.cross(&u).abs() < 1e-6 {
                errors.push("pitchAxis and upAxis must not be parallel".into());
            }
        }

        if !self.stumps_reference.is_finite() {
            errors.push("stumpsReference must be finite".into());
        }

        if !self.stumps.is_proper() {
            errors.push("stumps rectangle must have positive width and height".into());
        } else if pitch.normalized().is_some() {
            let corners = [
                Position::new(self.stumps.min_x, self.stumps.min_y),
                Position::new(self.stumps.min_x, self.stumps.max_y),
                Position::new(self.stumps.max_x, self.stumps.min_y),
                Position::new(self.stumps.max_x, self.stumps.max_y),
            ];
            let along: Vec<f64> = corners.iter().map(|c| self.along(c)).collect();
            let lo = along.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = along.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if !(lo <= 0.0 && hi >= 0.0) {
                errors.push("stumps rectangle must straddle the stumps plane".into());
            }
        }

        if !(self.in_line.min < self.in_line.max) {
            errors.push("inLine.min must be less than inLine.max".into());
        }

        non_negative(
            "thresholds.minSwingAngleDeg",
            self.thresholds.min_swing_angle_deg,
            &mut errors,
        );
        non_negative(
            "thresholds.yorkerDistanceM",
            self.thresholds.yorker_distance_m,
            &mut errors,
        );
        non_negative(
            "thresholds.bouncerVerticalSpeedMps",
            self.thresholds.bouncer_vertical_speed_mps,
            &mut errors,
        );
        non_negative("curvatureToRpm", self.curvature_to_rpm, &mut errors);
        non_negative("bounceTolerance", self.bounce_tolerance, &mut errors);
        non_negative(
            "bounceDeviationCoefficient",
            self.bounce_deviation_coefficient,
            &mut errors,
        );

        positive("lbw.marginSteepness", self.lbw.margin_steepness, &mut errors);
        factor("lbw.noBounceFactor", self.lbw.no_bounce_factor, &mut errors);
        factor(
            "lbw.outsideLineFactor",
            self.lbw.outside_line_factor,
            &mut errors,
        );

        errors
    }

    /// Signed distance from the stumps plane along the pitch axis.
    pub fn along(&self, p: &Position) -> f64 {
        self.stumps_reference.delta_to(p).dot(&self.pitch_axis.unit())
    }

    /// Signed offset from the pitch-axis line through the stumps.
    pub fn lateral(&self, p: &Position) -> f64 {
        self.pitch_axis.unit().cross(&self.stumps_reference.delta_to(p))
    }

    /// Height above the stumps base.
    pub fn height(&self, p: &Position) -> f64 {
        self.stumps_reference.delta_to(p).dot(&self.up_axis.unit())
    }

    /// Component of `v` along the up axis; negative while descending.
    pub fn vertical_velocity(&self, v: &Velocity) -> f64 {
        v.dot(&self.up_axis.unit())
    }

    /// `+1.0` or `-1.0`: handedness of the (pitch, up) axis pair.
    pub fn orientation_sign(&self) -> f64 {
        if self.pitch_axis.unit().cross(&self.up_axis.unit()) < 0.0 {
            -1.0
        } else {
            1.0
        }
    }

    /// Convert a length in position units to meters.
    pub fn to_meters(&self, units: f64) -> f64 {
        units * self.meters_per_unit
    }

    /// Convert meters to position units.
    pub fn from_meters(&self, meters: f64) -> f64 {
        meters / self.meters_per_unit
    }

    /// Convert a speed in units/s to km/h.
    pub fn speed_kmh(&self, units_per_sec: f64) -> f64 {
        self.to_meters(units_per_sec) * 3.6
    }

    /// Seconds between consecutive frames.
    pub fn frame_interval_secs(&self) -> f64 {
        1.0 / self.frame_rate
    }
}
