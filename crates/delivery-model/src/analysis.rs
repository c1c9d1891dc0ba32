//! Delivery analysis results.

use serde::{Deserialize, Serialize};

use crate::geometry::Position;

/// Delivery classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallType {
    Inswinger,
    Outswinger,
    Straight,
    Yorker,
    Bouncer,
}

impl BallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BallType::Inswinger => "inswinger",
            BallType::Outswinger => "outswinger",
            BallType::Straight => "straight",
            BallType::Yorker => "yorker",
            BallType::Bouncer => "bouncer",
        }
    }
}

impl std::fmt::Display for BallType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leg-before-wicket verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LbwPrediction {
    /// Probability in `(0.0, 1.0)`.
    pub probability: f64,

    /// Where the projected path crosses the stumps plane.
    pub impact_point: Position,

    pub would_hit_stumps: bool,
}

/// Metrics and verdict for one delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResults {
    /// Release speed (km/h).
    pub speed: f64,

    /// Peak speed over the track (km/h).
    pub max_speed: f64,

    /// Bounce position; absent when no bounce was found.
    pub pitch_point: Option<Position>,

    /// Frame of the bounce, when one was found.
    #[serde(default)]
    pub pitch_frame: Option<u64>,

    /// Distance from the bounce to the stumps along the pitch axis (meters).
    pub pitch_distance: f64,

    /// Signed swing in degrees; positive swings in towards the batter.
    pub swing_angle: f64,

    /// Modeled spin rate (rpm).
    pub spin_rate: f64,

    pub ball_type: BallType,

    pub lbw_prediction: LbwPrediction,

    /// Observed path followed by the projected path to the stumps.
    pub trajectory: Vec<Position>,

    /// True when no bounce was detected.
    #[serde(default)]
    pub no_bounce: bool,
}

/// Result of analysing one video.
///
/// `Unavailable` is a successful run that could not produce metrics, for
/// example when the ball was never tracked long enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Available { results: AnalysisResults },
    Unavailable { reason: String },
}

impl AnalysisOutcome {
    pub fn results(&self) -> Option<&AnalysisResults> {
        match self {
            AnalysisOutcome::Available { results } => Some(results),
            AnalysisOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, AnalysisOutcome::Available { .. })
    }
}

impl From<AnalysisResults> for AnalysisOutcome {
    fn from(results: AnalysisResults) -> Self {
        AnalysisOutcome::Available { results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnalysisResults {
        AnalysisResults {
            speed: 132.4,
            max_speed: 135.0,
            pitch_point: Some(Position::new(420.0, 355.0)),
            pitch_frame: Some(30),
            pitch_distance: 7.18,
            swing_angle: -2.1,
            spin_rate: 310.0,
            ball_type: BallType::Outswinger,
            lbw_prediction: LbwPrediction {
                probability: 0.71,
                impact_point: Position::new(620.0, 352.0),
                would_hit_stumps: true,
            },
            trajectory: vec![Position::new(0.0, 0.0), Position::new(620.0, 352.0)],
            no_bounce: false,
        }
    }

    #[test]
    fn test_results_json_shape() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"maxSpeed\":135.0"));
        assert!(json.contains("\"ballType\":\"outswinger\""));
        assert!(json.contains("\"lbwPrediction\":{"));
        assert!(json.contains("\"wouldHitStumps\":true"));
        assert!(json.contains("\"impactPoint\":{"));
    }

    #[test]
    fn test_missing_pitch_point_serializes_as_null() {
        let mut r = sample();
        r.pitch_point = None;
        r.pitch_frame = None;
        r.no_bounce = true;
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"pitchPoint\":null"));
        let parsed: AnalysisResults = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, r);
    }

    #[test]
    fn test_outcome_tagging() {
        let outcome = AnalysisOutcome::Unavailable {
            reason: "insufficient track length".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"status\":\"unavailable\""));
        assert!(outcome.results().is_none());

        let available: AnalysisOutcome = sample().into();
        assert!(available.is_available());
    }
}
