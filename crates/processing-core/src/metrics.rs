//! Delivery metrics and ball-type classification.
//!
//! Speeds come straight from the tracked velocities. Swing is the signed
//! angle between the release direction and the direction just before the
//! bounce. Spin is a modeled quantity: the curvature of a quadratic fit of
//! lateral offset against distance travelled, scaled by a calibrated
//! coefficient. Neither is a measurement of the ball's rotation.

use drs_delivery_model::{
    BallTrackingData, BallType, Calibration, ClassificationThresholds, Velocity,
};
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::math::quadratic_ls;
use crate::pitch_point::{pitch_distance, PitchPoint};

/// Window sizes used by the metric computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricWindows {
    /// Records averaged for the release speed and direction.
    pub release: usize,

    /// Records averaged for the direction just before the bounce.
    pub pre_bounce: usize,
}

impl Default for MetricWindows {
    fn default() -> Self {
        Self {
            release: 3,
            pre_bounce: 3,
        }
    }
}

/// Scalar metrics of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryMetrics {
    pub speed_kmh: f64,
    pub max_speed_kmh: f64,

    /// Signed; positive swings in towards the batter.
    pub swing_angle_deg: f64,

    pub spin_rate_rpm: f64,

    /// Meters from the pitch point (or the last position when there was
    /// no bounce) to the stumps plane.
    pub pitch_distance_m: f64,

    /// Largest upward speed after the bounce (m/s).
    pub post_bounce_vertical_mps: f64,

    pub no_bounce: bool,
}

impl DeliveryMetrics {
    /// Compute metrics for a track. `records` must be non-empty.
    pub fn compute(
        records: &[BallTrackingData],
        pitch: Option<&PitchPoint>,
        calibration: &Calibration,
        windows: MetricWindows,
    ) -> Self {
        let release_len = windows.release.max(1).min(records.len());
        let release = &records[..release_len];

        let speed = mean(release.iter().map(BallTrackingData::speed)).unwrap_or(0.0);
        let max_speed = records
            .iter()
            .map(BallTrackingData::speed)
            .fold(0.0_f64, f64::max);

        // Records up to, not including, the bounce.
        let pre_bounce = match pitch {
            Some(p) => &records[..p.index.min(records.len())],
            None => records,
        };

        let swing_angle_deg = swing_angle(release, pre_bounce, windows.pre_bounce, calibration);
        let spin_rate_rpm = spin_rate(pre_bounce, calibration);

        let (pitch_distance_m, post_bounce_vertical_mps) = match pitch {
            Some(p) => {
                let vertical = records[(p.index + 1).min(records.len())..]
                    .iter()
                    .map(|r| calibration.vertical_velocity(&r.velocity))
                    .fold(0.0_f64, f64::max);
                (
                    pitch_distance(&p.position, calibration),
                    calibration.to_meters(vertical),
                )
            }
            None => {
                let last = records.last().map(|r| r.position).unwrap_or_default();
                (pitch_distance(&last, calibration), 0.0)
            }
        };

        Self {
            speed_kmh: calibration.speed_kmh(speed),
            max_speed_kmh: calibration.speed_kmh(max_speed),
            swing_angle_deg,
            spin_rate_rpm,
            pitch_distance_m,
            post_bounce_vertical_mps,
            no_bounce: pitch.is_none(),
        }
    }
}

/// Classify a delivery from its metrics.
///
/// Rules apply in order: bouncer, yorker, swing, straight. Without a
/// bounce only yorker or straight are possible.
pub fn classify(metrics: &DeliveryMetrics, thresholds: &ClassificationThresholds) -> BallType {
    if !metrics.no_bounce && metrics.post_bounce_vertical_mps > thresholds.bouncer_vertical_speed_mps
    {
        return BallType::Bouncer;
    }
    if metrics.pitch_distance_m < thresholds.yorker_distance_m {
        return BallType::Yorker;
    }
    if metrics.no_bounce {
        return BallType::Straight;
    }
    if metrics.swing_angle_deg.abs() >= thresholds.min_swing_angle_deg {
        if metrics.swing_angle_deg > 0.0 {
            BallType::Inswinger
        } else {
            BallType::Outswinger
        }
    } else {
        BallType::Straight
    }
}

fn swing_angle(
    release: &[BallTrackingData],
    pre_bounce: &[BallTrackingData],
    window: usize,
    calibration: &Calibration,
) -> f64 {
    let start = pre_bounce.len().saturating_sub(window.max(1));
    let release_dir = Velocity::mean(release.iter().map(|r| &r.velocity));
    let late_dir = Velocity::mean(pre_bounce[start..].iter().map(|r| &r.velocity));

    match (release_dir, late_dir) {
        (Some(a), Some(b)) if a.magnitude() > 0.0 && b.magnitude() > 0.0 => {
            calibration.orientation_sign() * a.angle_to(&b).to_degrees()
        }
        _ => 0.0,
    }
}

fn spin_rate(pre_bounce: &[BallTrackingData], calibration: &Calibration) -> f64 {
    if pre_bounce.len() < 3 {
        return 0.0;
    }

    let along: Vec<f64> = pre_bounce
        .iter()
        .map(|r| calibration.to_meters(calibration.along(&r.position)))
        .collect();
    let lateral: Vec<f64> = pre_bounce
        .iter()
        .map(|r| calibration.to_meters(calibration.lateral(&r.position)))
        .collect();

    // Centre both axes; curvature is shift invariant and the normal
    // equations stay well conditioned far from the pitch line.
    let mid_x = along.iter().sum::<f64>() / along.len() as f64;
    let mid_y = lateral.iter().sum::<f64>() / lateral.len() as f64;
    let x = na::DVector::from_iterator(along.len(), along.iter().map(|a| a - mid_x));
    let y = na::DVector::from_iterator(lateral.len(), lateral.iter().map(|l| l - mid_y));

    match quadratic_ls(&x, &y) {
        Some(beta) => (2.0 * beta[0]).abs() * calibration.curvature_to_rpm,
        None => 0.0,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
