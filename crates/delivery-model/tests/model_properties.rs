use drs_delivery_model::{
    record_at_time, trail, BallTrackingData, Calibration, Position, Rect, Velocity,
};
use proptest::prelude::*;

fn records(n: usize) -> Vec<BallTrackingData> {
    (0..n)
        .map(|i| BallTrackingData {
            frame_index: i as u64,
            timestamp_ms: i as f64 * 20.0,
            position: Position::new(i as f64, 0.0),
            velocity: Velocity::ZERO,
            confidence: 1.0,
            interpolated: false,
        })
        .collect()
}

proptest! {
    #[test]
    fn signed_margin_sign_matches_containment(x in -50.0f64..50.0, y in -50.0f64..50.0) {
        let rect = Rect::new(-10.0, -5.0, 10.0, 5.0);
        let p = Position::new(x, y);
        let margin = rect.signed_margin(&p);
        if rect.contains_strictly(&p) {
            prop_assert!(margin > 0.0);
        } else if !rect.contains(&p) {
            prop_assert!(margin < 0.0);
        }
    }

    #[test]
    fn margin_decreases_moving_away(offset in 0.0f64..40.0, step in 0.01f64..10.0) {
        let rect = Rect::new(-10.0, -5.0, 10.0, 5.0);
        let near = Position::new(10.0 + offset, 0.0);
        let far = Position::new(10.0 + offset + step, 0.0);
        prop_assert!(rect.signed_margin(&far) < rect.signed_margin(&near));
    }

    #[test]
    fn record_at_time_never_after_query(n in 1usize..50, ms in 0.0f64..1200.0) {
        let rs = records(n);
        let r = record_at_time(&rs, ms).unwrap();
        prop_assert!(r.timestamp_ms <= ms);
        let next = rs.iter().find(|x| x.frame_index == r.frame_index + 1);
        if let Some(next) = next {
            prop_assert!(next.timestamp_ms > ms);
        }
    }

    #[test]
    fn trail_ends_at_index(n in 1usize..50, index in 0usize..60, len in 1usize..20) {
        let rs = records(n);
        let t = trail(&rs, index, len);
        prop_assert!(t.len() <= len);
        prop_assert!(!t.is_empty());
        prop_assert_eq!(t.last().unwrap().x, index.min(n - 1) as f64);
    }

    #[test]
    fn along_is_zero_on_stumps_plane(y in 0.0f64..400.0) {
        let c = Calibration::default();
        let p = Position::new(c.stumps_reference.x, y);
        prop_assert!(c.along(&p).abs() < 1e-9);
    }
}
