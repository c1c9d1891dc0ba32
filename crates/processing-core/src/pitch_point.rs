//! Bounce detection.
//!
//! The pitch point is the first frame where the ball stops descending:
//! vertical velocity goes from below `-tolerance` to at or above it, and
//! stays there for the following frame. The confirmation frame keeps a
//! single noisy velocity sample from being read as a bounce.

use drs_delivery_model::{BallTrackingData, Calibration, Position};

/// Where and when the ball pitched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchPoint {
    /// Index into the analysed record slice.
    pub index: usize,
    pub frame: u64,
    pub position: Position,
}

/// Scan `records` for the bounce frame.
pub fn detect_pitch_point(
    records: &[BallTrackingData],
    calibration: &Calibration,
) -> Option<PitchPoint> {
    let tolerance = calibration.bounce_tolerance;
    let rising = |r: &BallTrackingData| calibration.vertical_velocity(&r.velocity) >= -tolerance;

    let mut descending = false;
    for (index, record) in records.iter().enumerate() {
        if !rising(record) {
            descending = true;
            continue;
        }
        if !descending {
            continue;
        }
        if records.get(index + 1).map_or(true, rising) {
            return Some(PitchPoint {
                index,
                frame: record.frame_index,
                position: record.position,
            });
        }
    }
    None
}

/// Distance from the pitch point to the stumps along the pitch axis (meters).
pub fn pitch_distance(position: &Position, calibration: &Calibration) -> f64 {
    calibration.to_meters(calibration.along(position).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drs_delivery_model::{Axis, Velocity};

    fn record(frame: u64, vy: f64) -> BallTrackingData {
        BallTrackingData {
            frame_index: frame,
            timestamp_ms: frame as f64 * 1000.0 / 60.0,
            position: Position::new(frame as f64 * 10.0, 300.0),
            velocity: Velocity::new(600.0, vy),
            confidence: 1.0,
            interpolated: false,
        }
    }

    fn y_up() -> Calibration {
        Calibration {
            up_axis: Axis::new(0.0, 1.0),
            ..Calibration::default()
        }
    }

    #[test]
    fn test_sign_change_at_frame_30() {
        let records: Vec<_> = (0..60)
            .map(|f| record(f, if f < 30 { -50.0 } else { 50.0 }))
            .collect();
        let pitch = detect_pitch_point(&records, &y_up()).unwrap();
        assert!((29..=31).contains(&pitch.frame), "pitch at {}", pitch.frame);
        assert_eq!(pitch.position, records[pitch.index].position);
    }

    #[test]
    fn test_image_coordinates() {
        // Default calibration has up = -y, so a descending ball has vy > 0.
        let records: Vec<_> = (0..40)
            .map(|f| record(f, if f < 20 { 120.0 } else { -30.0 }))
            .collect();
        let pitch = detect_pitch_point(&records, &Calibration::default()).unwrap();
        assert_eq!(pitch.frame, 20);
    }

    #[test]
    fn test_level_flight_has_no_bounce() {
        let records: Vec<_> = (0..60).map(|f| record(f, 0.0)).collect();
        assert!(detect_pitch_point(&records, &y_up()).is_none());
    }

    #[test]
    fn test_rising_from_start_is_not_a_bounce() {
        let records: Vec<_> = (0..20).map(|f| record(f, 40.0)).collect();
        assert!(detect_pitch_point(&records, &y_up()).is_none());
    }

    #[test]
    fn test_single_frame_blip_is_ignored() {
        let mut records: Vec<_> = (0..40)
            .map(|f| record(f, if f < 25 { -50.0 } else { 50.0 }))
            .collect();
        records[10].velocity.vy = 10.0;
        let pitch = detect_pitch_point(&records, &y_up()).unwrap();
        assert_eq!(pitch.frame, 25);
    }

    #[test]
    fn test_within_tolerance_counts_as_not_descending() {
        let cal = y_up();
        let records: Vec<_> = (0..20)
            .map(|f| record(f, if f < 10 { -50.0 } else { -cal.bounce_tolerance * 0.5 }))
            .collect();
        assert_eq!(detect_pitch_point(&records, &cal).unwrap().frame, 10);
    }

    #[test]
    fn test_bounce_on_last_record() {
        let records: Vec<_> = (0..10)
            .map(|f| record(f, if f < 9 { -50.0 } else { 50.0 }))
            .collect();
        assert_eq!(detect_pitch_point(&records, &y_up()).unwrap().frame, 9);
    }

    #[test]
    fn test_pitch_distance_in_meters() {
        let cal = Calibration::default();
        let p = Position::new(cal.stumps_reference.x - 100.0, 355.0);
        assert!((pitch_distance(&p, &cal) - 100.0 * cal.meters_per_unit).abs() < 1e-12);
    }
}
