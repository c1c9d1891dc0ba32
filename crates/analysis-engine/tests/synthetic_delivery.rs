use drs_analysis_engine::{AnalysisSession, SessionConfig, SessionState};
use drs_ball_detector::synthetic::SyntheticDelivery;
use drs_ball_detector::{DetectorKind, VecFrameSource};
use drs_delivery_model::writer::{read_tracking_file, TrackWriter};
use drs_delivery_model::{AnalysisReport, Calibration, TrackStreamHeader};

fn delivery() -> SyntheticDelivery {
    SyntheticDelivery {
        occluded: vec![15, 16],
        ..SyntheticDelivery::default()
    }
}

async fn analyse(config: SessionConfig) -> drs_analysis_engine::SessionReport {
    let mut session = AnalysisSession::new(config, Calibration::default()).unwrap();
    let report = session
        .run(Box::new(VecFrameSource::new(delivery().render())))
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Completed);
    report
}

#[tokio::test]
async fn color_blob_delivery_end_to_end() {
    let report = analyse(SessionConfig::default()).await;
    let cal = Calibration::default();

    assert_eq!(report.segments, 1);
    assert!(report.tracking.len() >= 45);
    let bridged: Vec<u64> = report
        .tracking
        .iter()
        .filter(|r| r.interpolated)
        .map(|r| r.frame_index)
        .collect();
    assert_eq!(bridged, vec![15, 16]);

    let results = report.outcome.results().expect("analysis should be available");
    assert!(!results.no_bounce);
    let pitch = results.pitch_frame.unwrap();
    assert!((36..=40).contains(&pitch), "pitch at frame {pitch}");
    assert!(cal.along(&results.lbw_prediction.impact_point).abs() < 1e-6);
    let p = results.lbw_prediction.probability;
    assert!(p > 0.0 && p < 1.0);

    // Release speed: 700 px/s horizontal plus the initial descent.
    let kmh = 700.0 * cal.meters_per_unit * 3.6;
    assert!(results.speed > kmh * 0.85 && results.speed < kmh * 1.3);
}

#[tokio::test]
async fn template_delivery_end_to_end() {
    let report = analyse(SessionConfig {
        detector: DetectorKind::Template,
        ..SessionConfig::default()
    })
    .await;
    assert_eq!(report.detector, "template");
    let results = report.outcome.results().expect("analysis should be available");
    let pitch = results.pitch_frame.unwrap();
    assert!((36..=40).contains(&pitch), "pitch at frame {pitch}");
}

#[tokio::test]
async fn report_and_tracking_persist() {
    let cal = Calibration::default();
    let report = analyse(SessionConfig::default()).await;

    let dir = std::env::temp_dir().join(format!("drs_engine_persist_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let tracking_path = dir.join("tracking.jsonl");
    {
        let header =
            TrackStreamHeader::new(cal.frame_rate, cal.meters_per_unit, report.tracking.len());
        let mut writer = TrackWriter::new(tracking_path.clone(), &header).unwrap();
        writer.write_all(&report.tracking).unwrap();
    }
    let (header, records) = read_tracking_file(&tracking_path).unwrap();
    assert_eq!(header.unwrap().record_count, report.tracking.len());
    assert_eq!(records.len(), report.tracking.len());
    for (read, written) in records.iter().zip(&report.tracking) {
        assert_eq!(read.frame_index, written.frame_index);
        assert_eq!(read.interpolated, written.interpolated);
        assert!(read.position.distance_to(&written.position) < 1e-9);
    }

    let report_path = dir.join("report.json");
    let expected = report.outcome.results().cloned().unwrap();
    report.into_report(&cal).save(&report_path).unwrap();
    let loaded = AnalysisReport::load(&report_path).unwrap();
    let results = loaded.outcome.results().unwrap();
    assert_eq!(results.ball_type, expected.ball_type);
    assert_eq!(results.pitch_frame, expected.pitch_frame);
    assert_eq!(results.trajectory.len(), expected.trajectory.len());
    assert!((loaded.calibration.meters_per_unit - cal.meters_per_unit).abs() < 1e-12);
    assert!(loaded.generated_at().is_some());

    let _ = std::fs::remove_dir_all(&dir);
}
