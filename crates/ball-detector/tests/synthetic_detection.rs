use drs_ball_detector::synthetic::{SyntheticDelivery, BALL};
use drs_ball_detector::{
    BallDetector, ColorBlobConfig, ColorBlobDetector, DetectionContext, TemplateConfig,
    TemplateDetector,
};

fn assert_tracks_delivery(detector: &dyn BallDetector) {
    let delivery = SyntheticDelivery {
        occluded: vec![12, 13],
        ..SyntheticDelivery::default()
    };

    let mut detected = 0;
    for frame in delivery.render() {
        let truth = delivery.ball_position(frame.index as u32);
        match detector.detect(&frame, &DetectionContext::unconstrained()) {
            Some(c) => {
                detected += 1;
                assert!(
                    c.position.distance_to(&truth) < 1.5,
                    "frame {}: {:?} vs {:?}",
                    frame.index,
                    c.position,
                    truth
                );
                assert!((0.0..=1.0).contains(&c.confidence));
            }
            None => assert!(
                delivery.occluded.contains(&(frame.index as u32)) || truth.x > 800.0,
                "missed frame {}",
                frame.index
            ),
        }
    }

    assert!(detected >= 50);
}

#[test]
fn color_blob_follows_synthetic_delivery() {
    assert_tracks_delivery(&ColorBlobDetector::new(ColorBlobConfig::default()));
}

#[test]
fn template_follows_synthetic_delivery() {
    let detector = TemplateDetector::disc(
        5,
        TemplateConfig {
            target: Some(BALL),
            ..TemplateConfig::default()
        },
    );
    assert_tracks_delivery(&detector);
}
