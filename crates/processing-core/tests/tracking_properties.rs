use drs_common::config::AnalysisDefaults;
use drs_delivery_model::{BallType, Calibration, ClassificationThresholds, Position};
use drs_processing_core::lbw::{decide, LbwInput};
use drs_processing_core::metrics::{classify, DeliveryMetrics};
use drs_processing_core::{Measurement, TrackStep, Tracker, TrackerConfig};
use proptest::prelude::*;

fn tracker() -> Tracker {
    let cal = Calibration::default();
    Tracker::new(
        TrackerConfig::from_defaults(&AnalysisDefaults::default(), &cal),
        &cal,
    )
}

fn measurement() -> impl Strategy<Value = Option<(f64, f64, f64)>> {
    prop::option::weighted(0.7, (0.0f64..600.0, 0.0f64..400.0, 0.0f64..1.0))
}

proptest! {
    #[test]
    fn emitted_records_are_bounded_and_ordered(
        frames in prop::collection::vec(measurement(), 1..120)
    ) {
        let mut t = tracker();
        let mut last_emitted: Option<u64> = None;
        for (i, m) in frames.iter().enumerate() {
            let m = m.map(|(x, y, c)| Measurement::new(Position::new(x, y), c));
            let step = t.process(i as u64, i as f64 * 1000.0 / 60.0, m).unwrap();
            if let TrackStep::Record(r) = step {
                prop_assert!((0.0..=1.0).contains(&r.confidence));
                if let Some(prev) = last_emitted {
                    prop_assert!(r.frame_index > prev);
                }
                last_emitted = Some(r.frame_index);
            }
        }

        let track = t.finish();
        let mut previous_end: Option<u64> = None;
        for segment in track.segments() {
            prop_assert!(!segment.is_empty());
            prop_assert!(!segment.records.last().unwrap().interpolated);
            for pair in segment.records.windows(2) {
                prop_assert!(pair[1].frame_index > pair[0].frame_index);
            }
            for r in &segment.records {
                prop_assert!((0.0..=1.0).contains(&r.confidence));
            }
            if let Some(end) = previous_end {
                prop_assert!(segment.start_frame().unwrap() > end);
            }
            previous_end = segment.end_frame();
        }
        if let Some(longest) = track.longest() {
            prop_assert!(track.segments().iter().all(|s| s.len() <= longest.len()));
        }
    }

    #[test]
    fn lbw_probability_falls_as_impact_moves_out(
        offset in 0.1f64..5000.0,
        step in 0.1f64..2000.0,
        conf in 0.0f64..=1.0,
    ) {
        let cal = Calibration::default();
        let at = |dx: f64| decide(
            &LbwInput {
                impact_point: Position::new(cal.stumps.max_x + dx, 350.0),
                pitch_point: None,
                confidence: conf,
            },
            &cal,
        );
        let near = at(offset);
        let far = at(offset + step);
        prop_assert!(far.probability < near.probability);
        prop_assert!(!near.would_hit_stumps && !far.would_hit_stumps);
    }

    #[test]
    fn lbw_probability_rises_with_confidence(
        x in 560.0f64..680.0,
        y in 300.0f64..380.0,
        low in 0.0f64..1.0,
        bump in 0.01f64..1.0,
    ) {
        let cal = Calibration::default();
        let high = (low + bump).min(1.0);
        let p = |c: f64| decide(
            &LbwInput {
                impact_point: Position::new(x, y),
                pitch_point: Some(Position::new(400.0, 360.0)),
                confidence: c,
            },
            &cal,
        ).probability;
        prop_assert!(p(high) >= p(low));
        prop_assert!(p(low) > 0.0 && p(high) < 1.0);
    }

    #[test]
    fn no_bounce_is_only_yorker_or_straight(
        pitch_m in 0.0f64..25.0,
        swing in -30.0f64..30.0,
        vertical in 0.0f64..30.0,
    ) {
        let m = DeliveryMetrics {
            speed_kmh: 120.0,
            max_speed_kmh: 125.0,
            swing_angle_deg: swing,
            spin_rate_rpm: 0.0,
            pitch_distance_m: pitch_m,
            post_bounce_vertical_mps: vertical,
            no_bounce: true,
        };
        let ball = classify(&m, &ClassificationThresholds::default());
        prop_assert!(matches!(ball, BallType::Yorker | BallType::Straight));
    }
}
