//! LBW decision.
//!
//! The boolean verdict is a pure geometric test. The probability combines
//! how deep inside (or far outside) the stump rectangle the impact lands
//! with the tracking confidence, then discounts deliveries without a
//! bounce or pitching outside the line:
//!
//! ```text
//! margin   = signed_margin(impact) / min_half_extent     (+ inside, - outside)
//! geometry = 0.5 + 0.5 * s / (1 + |s|),  s = k * margin
//! evidence = 0.5 + 0.5 * confidence
//! p        = geometry * evidence * no_bounce_factor? * outside_line_factor?
//! ```
//!
//! `p` increases with the margin and with confidence, and each factor only
//! ever lowers it. The geometry term decays as `1/distance` outside the
//! stumps, so impacts further away always score lower.

use drs_delivery_model::{Calibration, LbwPrediction, Position};

use crate::math::soft_step;

/// Inputs to the LBW decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LbwInput {
    pub impact_point: Position,

    /// Absent when no bounce was detected.
    pub pitch_point: Option<Position>,

    /// Tracking confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Breakdown of a decision, kept for reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LbwAssessment {
    pub in_stumps: bool,
    pub below_bails: bool,
    pub in_line: bool,
    pub margin: f64,
    pub prediction: LbwPrediction,
}

/// Decide whether the ball would have hit the stumps.
pub fn assess(input: &LbwInput, calibration: &Calibration) -> LbwAssessment {
    let stumps = &calibration.stumps;
    let impact = input.impact_point;

    let in_stumps = stumps.contains(&impact);
    let below_bails = calibration.height(&impact) < calibration.bail_height;
    let in_line = input
        .pitch_point
        .map_or(true, |p| calibration.in_line.contains(calibration.lateral(&p)));

    let margin = stumps.signed_margin(&impact) / stumps.min_half_extent();
    let geometry = soft_step(calibration.lbw.margin_steepness * margin);
    let evidence = 0.5 + 0.5 * input.confidence.clamp(0.0, 1.0);

    let mut probability = geometry * evidence;
    if input.pitch_point.is_none() {
        probability *= calibration.lbw.no_bounce_factor;
    }
    if !in_line {
        probability *= calibration.lbw.outside_line_factor;
    }

    LbwAssessment {
        in_stumps,
        below_bails,
        in_line,
        margin,
        prediction: LbwPrediction {
            probability: probability.clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON),
            impact_point: impact,
            would_hit_stumps: in_stumps && below_bails && in_line,
        },
    }
}

/// Shorthand for [`assess`] returning only the prediction.
pub fn decide(input: &LbwInput, calibration: &Calibration) -> LbwPrediction {
    assess(input, calibration).prediction
}
