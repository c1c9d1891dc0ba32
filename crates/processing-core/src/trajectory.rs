//! Projection of the ball path to the stumps plane.
//!
//! From the projection start (the pitch point, or the last record before
//! the stumps plane when there was no bounce) the path is extrapolated as
//! `p(t) = p0 + v t + a t^2 / 2` and solved for `along(p(t)) = 0`.

use drs_common::error::{DrsError, DrsResult};
use drs_delivery_model::{BallTrackingData, Calibration, Position, Velocity};

use crate::math::smallest_positive_root;
use crate::pitch_point::PitchPoint;

/// Upper bound on predicted samples; longer flights are sampled coarser.
const MAX_PROJECTION_SAMPLES: usize = 1000;

/// Result of projecting a delivery to the stumps.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Where the path meets the stumps plane.
    pub impact_point: Position,

    /// Observed positions up to the start, then the predicted path.
    pub path: Vec<Position>,

    /// Record the projection started from.
    pub start_index: usize,

    pub time_to_impact_secs: f64,
}

/// Project the track to the stumps plane.
///
/// After a bounce the starting velocity is turned by the swing angle times
/// `bounce_deviation_coefficient`, in the direction of the swing.
pub fn project(
    records: &[BallTrackingData],
    pitch: Option<&PitchPoint>,
    swing_angle_deg: f64,
    calibration: &Calibration,
) -> DrsResult<Projection> {
    let (start_index, velocity) = match pitch {
        Some(p) => {
            let record = records
                .get(p.index)
                .ok_or_else(|| DrsError::projection_failed("pitch point outside the track"))?;
            let deviation = calibration.orientation_sign()
                * swing_angle_deg
                * calibration.bounce_deviation_coefficient;
            (p.index, record.velocity.rotated(deviation.to_radians()))
        }
        None => {
            let index = records
                .iter()
                .rposition(|r| calibration.along(&r.position) < 0.0)
                .ok_or_else(|| {
                    DrsError::projection_failed("track never appears before the stumps plane")
                })?;
            (index, records[index].velocity)
        }
    };

    let start = records[start_index].position;
    let acceleration = mean_acceleration(&records[start_index..]);

    let axis = calibration.pitch_axis.unit();
    let c = calibration.along(&start);
    if c > 0.0 {
        return Err(DrsError::projection_failed(format!(
            "projection starts {:.1} units beyond the stumps plane",
            c
        )));
    }

    let t_impact = if c == 0.0 {
        0.0
    } else {
        smallest_positive_root(0.5 * acceleration.dot(&axis), velocity.dot(&axis), c)
            .ok_or_else(|| DrsError::projection_failed("path never reaches the stumps plane"))?
    };

    let at = |t: f64| {
        Position::new(
            start.x + velocity.vx * t + 0.5 * acceleration.vx * t * t,
            start.y + velocity.vy * t + 0.5 * acceleration.vy * t * t,
        )
    };
    let impact_point = at(t_impact);

    let mut path: Vec<Position> = records[..=start_index].iter().map(|r| r.position).collect();
    if t_impact > 0.0 {
        let steps = ((t_impact / calibration.frame_interval_secs()).ceil() as usize)
            .clamp(1, MAX_PROJECTION_SAMPLES);
        let step = t_impact / steps as f64;
        path.extend((1..steps).map(|i| at(i as f64 * step)));
        path.push(impact_point);
    }

    tracing::debug!(
        start = start_index,
        t_impact,
        impact_x = impact_point.x,
        impact_y = impact_point.y,
        "Projected to stumps plane"
    );

    Ok(Projection {
        impact_point,
        path,
        start_index,
        time_to_impact_secs: t_impact,
    })
}

/// Mean acceleration implied by consecutive record velocities.
pub fn mean_acceleration(records: &[BallTrackingData]) -> Velocity {
    let samples: Vec<Velocity> = records
        .windows(2)
        .filter_map(|pair| {
            let dt = (pair[1].timestamp_ms - pair[0].timestamp_ms) / 1000.0;
            (dt > 0.0).then(|| {
                Velocity::new(
                    (pair[1].velocity.vx - pair[0].velocity.vx) / dt,
                    (pair[1].velocity.vy - pair[0].velocity.vy) / dt,
                )
            })
        })
        .collect();
    Velocity::mean(samples.iter()).unwrap_or(Velocity::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(frame: u64, p: Position, v: Velocity) -> BallTrackingData {
        BallTrackingData {
            frame_index: frame,
            timestamp_ms: frame as f64 * 1000.0 / 60.0,
            position: p,
            velocity: v,
            confidence: 1.0,
            interpolated: false,
        }
    }

    /// Uniform motion towards the stumps at 600 units/s, starting at x = 100.
    fn uniform(n: u64, y: f64) -> Vec<BallTrackingData> {
        (0..n)
            .map(|f| record(f, Position::new(100.0 + f as f64 * 10.0, y), Velocity::new(600.0, 0.0)))
            .collect()
    }

    #[test]
    fn test_no_bounce_projects_straight() {
        let cal = Calibration::default();
        let records = uniform(20, 350.0);
        let proj = project(&records, None, 0.0, &cal).unwrap();

        assert!(cal.along(&proj.impact_point).abs() < 1e-9);
        assert!((proj.impact_point.y - 350.0).abs() < 1e-9);
        assert_eq!(proj.start_index, 19);
        assert_eq!(*proj.path.last().unwrap(), proj.impact_point);
        assert!(proj.path.len() > records.len());
    }

    #[test]
    fn test_bounce_projection_uses_post_bounce_acceleration() {
        let cal = Calibration::default();
        // Ball rising off the pitch at x = 400, pulled down at 300 units/s^2.
        let records: Vec<_> = (0..20u64)
            .map(|f| {
                let t = f as f64 / 60.0;
                let vy = -100.0 + 300.0 * t;
                let y = 355.0 - 100.0 * t + 150.0 * t * t;
                record(f, Position::new(400.0 + 600.0 * t, y), Velocity::new(600.0, vy))
            })
            .collect();
        let pitch = PitchPoint {
            index: 0,
            frame: 0,
            position: records[0].position,
        };
        let proj = project(&records, Some(&pitch), 0.0, &cal).unwrap();

        let t = 220.0 / 600.0;
        let expected_y = 355.0 - 100.0 * t + 150.0 * t * t;
        assert!((proj.impact_point.x - 620.0).abs() < 1e-6);
        assert!((proj.impact_point.y - expected_y).abs() < 1e-6);
        assert!((proj.time_to_impact_secs - t).abs() < 1e-9);
    }

    #[test]
    fn test_swing_deviation_turns_the_path() {
        let cal = Calibration::default();
        let records = uniform(10, 300.0);
        let pitch = PitchPoint {
            index: 5,
            frame: 5,
            position: records[5].position,
        };
        let straight = project(&records, Some(&pitch), 0.0, &cal).unwrap();
        let swung = project(&records, Some(&pitch), 4.0, &cal).unwrap();
        assert!((swung.impact_point.y - straight.impact_point.y).abs() > 1.0);
    }

    #[test]
    fn test_moving_away_fails() {
        let cal = Calibration::default();
        let records: Vec<_> = (0..10u64)
            .map(|f| record(f, Position::new(300.0 - f as f64 * 10.0, 300.0), Velocity::new(-600.0, 0.0)))
            .collect();
        let err = project(&records, None, 0.0, &cal).unwrap_err();
        assert!(matches!(err, DrsError::ProjectionFailed { .. }));
    }

    #[test]
    fn test_track_entirely_past_stumps_fails() {
        let cal = Calibration::default();
        let records: Vec<_> = (0..5u64)
            .map(|f| record(f, Position::new(700.0 + f as f64, 300.0), Velocity::new(60.0, 0.0)))
            .collect();
        assert!(project(&records, None, 0.0, &cal).is_err());
    }

    #[test]
    fn test_mean_acceleration() {
        let records: Vec<_> = (0..5u64)
            .map(|f| {
                let t = f as f64 / 60.0;
                record(f, Position::ORIGIN, Velocity::new(0.0, 273.0 * t))
            })
            .collect();
        let a = mean_acceleration(&records);
        assert!(a.vx.abs() < 1e-9);
        assert!((a.vy - 273.0).abs() < 1e-6);
        assert_eq!(mean_acceleration(&records[..1]), Velocity::ZERO);
    }
}
