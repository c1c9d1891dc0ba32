//! Post-tracking analysis.
//!
//! [`DeliveryAnalyzer`] runs pitch detection, metrics, projection and the
//! LBW decision over a finished track. It holds no state between calls, so
//! analysing the same records twice yields identical results.

use drs_common::config::AnalysisDefaults;
use drs_common::error::{DrsError, DrsResult};
use drs_delivery_model::{
    validate_records, AnalysisOutcome, AnalysisResults, BallTrackingData, Calibration, ModelError,
};

use crate::lbw::{self, LbwInput};
use crate::metrics::{classify, DeliveryMetrics, MetricWindows};
use crate::pitch_point::detect_pitch_point;
use crate::tracker::FinalizedTrack;
use crate::trajectory;

/// Shortest track any analysis can use, whatever the configuration says.
const MIN_ANALYSABLE_RECORDS: usize = 2;

/// Pure analysis of one delivery track.
#[derive(Debug, Clone)]
pub struct DeliveryAnalyzer {
    calibration: Calibration,
    min_track_length: usize,
    windows: MetricWindows,
}

impl DeliveryAnalyzer {
    pub fn new(calibration: Calibration, defaults: &AnalysisDefaults) -> Self {
        Self {
            calibration,
            min_track_length: defaults.min_track_length.max(MIN_ANALYSABLE_RECORDS),
            windows: MetricWindows {
                release: defaults.release_window,
                pre_bounce: defaults.pre_bounce_window,
            },
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn min_track_length(&self) -> usize {
        self.min_track_length
    }

    /// Reject an unusable calibration before any frame is processed.
    pub fn check_calibration(&self) -> DrsResult<()> {
        self.calibration.validate().map_err(|err| match err {
            ModelError::ValidationError { message } => DrsError::invalid_calibration(message),
            other => DrsError::invalid_calibration(other.to_string()),
        })
    }

    /// Analyse the selected track segment.
    pub fn analyze(&self, records: &[BallTrackingData]) -> DrsResult<AnalysisResults> {
        self.check_calibration()?;

        if records.len() < self.min_track_length {
            return Err(DrsError::InsufficientTrackLength {
                longest: records.len(),
                required: self.min_track_length,
            });
        }

        let problems = validate_records(records);
        if !problems.is_empty() {
            return Err(DrsError::tracking(problems.join("; ")));
        }

        let cal = &self.calibration;
        let pitch = detect_pitch_point(records, cal);
        if pitch.is_none() {
            tracing::info!("No bounce detected");
        }

        let metrics = DeliveryMetrics::compute(records, pitch.as_ref(), cal, self.windows);
        let ball_type = classify(&metrics, &cal.thresholds);
        let projection =
            trajectory::project(records, pitch.as_ref(), metrics.swing_angle_deg, cal)?;

        let last = records[records.len() - 1];
        let confidence = match pitch {
            Some(p) => (records[p.index].confidence + last.confidence) / 2.0,
            None => last.confidence,
        };
        let lbw_prediction = lbw::decide(
            &LbwInput {
                impact_point: projection.impact_point,
                pitch_point: pitch.map(|p| p.position),
                confidence,
            },
            cal,
        );

        tracing::info!(
            records = records.len(),
            speed_kmh = metrics.speed_kmh,
            ball_type = %ball_type,
            lbw = lbw_prediction.would_hit_stumps,
            probability = lbw_prediction.probability,
            "Delivery analysed"
        );

        Ok(AnalysisResults {
            speed: metrics.speed_kmh,
            max_speed: metrics.max_speed_kmh,
            pitch_point: pitch.map(|p| p.position),
            pitch_frame: pitch.map(|p| p.frame),
            pitch_distance: metrics.pitch_distance_m,
            swing_angle: metrics.swing_angle_deg,
            spin_rate: metrics.spin_rate_rpm,
            ball_type,
            lbw_prediction,
            trajectory: projection.path,
            no_bounce: metrics.no_bounce,
        })
    }

    /// Analyse the longest segment of a finalized track.
    pub fn analyze_track(&self, track: &FinalizedTrack) -> DrsResult<AnalysisResults> {
        match track.longest() {
            Some(segment) => self.analyze(&segment.records),
            None => {
                self.check_calibration()?;
                Err(DrsError::InsufficientTrackLength {
                    longest: 0,
                    required: self.min_track_length,
                })
            }
        }
    }

    /// Like [`analyze_track`](Self::analyze_track), with "no analysis
    /// possible" reported as [`AnalysisOutcome::Unavailable`].
    pub fn outcome(&self, track: &FinalizedTrack) -> DrsResult<AnalysisOutcome> {
        match self.analyze_track(track) {
            Ok(results) => Ok(results.into()),
            Err(err) if err.is_unavailable() => {
                tracing::warn!(reason = %err, "Analysis unavailable");
                Ok(AnalysisOutcome::Unavailable {
                    reason: err.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drs_delivery_model::{Position, TrackSegment, Velocity};

    fn record(frame: u64, p: Position, v: Velocity) -> BallTrackingData {
        BallTrackingData {
            frame_index: frame,
            timestamp_ms: frame as f64 * 1000.0 / 60.0,
            position: p,
            velocity: v,
            confidence: 0.9,
            interpolated: false,
        }
    }

    fn constant_velocity() -> Vec<BallTrackingData> {
        (0..60u64)
            .map(|f| {
                let t = f as f64 / 60.0;
                record(f, Position::new(100.0 + 10.0 * t, 200.0), Velocity::new(10.0, 0.0))
            })
            .collect()
    }

    /// Descends at 120 units/s for 30 frames, then climbs at 20 units/s.
    fn bouncing() -> Vec<BallTrackingData> {
        let mut y = 300.0;
        (0..60u64)
            .map(|f| {
                let vy = if f < 30 { 120.0 } else { -20.0 };
                let r = record(f, Position::new(300.0 + f as f64 * 10.0, y), Velocity::new(600.0, vy));
                y += vy / 60.0;
                r
            })
            .collect()
    }

    fn analyzer() -> DeliveryAnalyzer {
        DeliveryAnalyzer::new(Calibration::default(), &AnalysisDefaults::default())
    }

    #[test]
    fn test_constant_velocity_no_bounce() {
        let results = analyzer().analyze(&constant_velocity()).unwrap();
        assert!(results.no_bounce);
        assert!(results.pitch_point.is_none());
        assert!(results.swing_angle.abs() < 1e-9);
        assert!(matches!(
            results.ball_type,
            drs_delivery_model::BallType::Straight | drs_delivery_model::BallType::Yorker
        ));
        let p = results.lbw_prediction.probability;
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn test_bounce_found_near_frame_30() {
        let results = analyzer().analyze(&bouncing()).unwrap();
        assert!(!results.no_bounce);
        let frame = results.pitch_frame.unwrap();
        assert!((29..=31).contains(&frame), "pitch at {frame}");
        assert!(results.pitch_distance > 0.0);
    }

    #[test]
    fn test_recomputation_is_identical() {
        let a = analyzer();
        let records = bouncing();
        assert_eq!(a.analyze(&records).unwrap(), a.analyze(&records).unwrap());
    }

    #[test]
    fn test_short_tracks_are_insufficient() {
        let a = analyzer();
        let records = constant_velocity();
        for len in [0, 1, 9] {
            match a.analyze(&records[..len]) {
                Err(DrsError::InsufficientTrackLength { longest, required }) => {
                    assert_eq!(longest, len);
                    assert_eq!(required, 10);
                }
                other => panic!("expected InsufficientTrackLength, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_length_one_is_insufficient_even_with_low_minimum() {
        let defaults = AnalysisDefaults {
            min_track_length: 0,
            ..AnalysisDefaults::default()
        };
        let a = DeliveryAnalyzer::new(Calibration::default(), &defaults);
        let err = a.analyze(&constant_velocity()[..1]).unwrap_err();
        assert!(matches!(err, DrsError::InsufficientTrackLength { .. }));
    }

    #[test]
    fn test_invalid_calibration_rejected_first() {
        let cal = Calibration {
            frame_rate: 0.0,
            ..Calibration::default()
        };
        let a = DeliveryAnalyzer::new(cal, &AnalysisDefaults::default());
        assert!(matches!(
            a.analyze(&[]),
            Err(DrsError::InvalidCalibration { .. })
        ));
    }

    #[test]
    fn test_empty_track_outcome_is_unavailable() {
        let outcome = analyzer().outcome(&FinalizedTrack::default()).unwrap();
        assert!(!outcome.is_available());
    }

    #[test]
    fn test_outcome_uses_longest_segment() {
        let records = bouncing();
        let short = TrackSegment {
            records: records[..5].to_vec(),
        };
        let long = TrackSegment {
            records: records[10..].to_vec(),
        };
        let outcome = analyzer()
            .outcome(&FinalizedTrack::new(vec![short, long]))
            .unwrap();
        let results = outcome.results().unwrap();
        assert_eq!(results.pitch_frame, Some(30));
    }
}
