//! Analyse a delivery from an image sequence.

use std::path::PathBuf;

use drs_analysis_engine::{AnalysisSession, SessionConfig};
use drs_ball_detector::{DetectorKind, ImageSequenceSource};
use drs_common::config::AppConfig;
use drs_delivery_model::writer::TrackWriter;
use drs_delivery_model::{AnalysisOutcome, Calibration, TrackStreamHeader};

pub struct AnalyzeArgs {
    pub frames: PathBuf,
    pub calibration: Option<PathBuf>,
    pub output: PathBuf,
    pub detector: String,
    pub template: Option<PathBuf>,
    pub workers: Option<usize>,
    pub sequential: bool,
}

pub async fn run(config: &AppConfig, args: AnalyzeArgs) -> anyhow::Result<()> {
    let calibration_path = args
        .calibration
        .or_else(|| config.calibration_path.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("No calibration given; pass --calibration or run `drs init`")
        })?;
    let calibration = Calibration::load(&calibration_path)
        .map_err(|e| anyhow::anyhow!("Failed to load calibration: {e}"))?;

    let detector: DetectorKind = args.detector.parse()?;

    println!("Analyzing frames in: {}", args.frames.display());
    println!("  Calibration: {}", calibration_path.display());

    let source = ImageSequenceSource::open(&args.frames, calibration.frame_rate)?;
    println!("  Frames: {}", source.len());

    let mut engine = config.engine.clone();
    if let Some(workers) = args.workers {
        engine.detection_workers = workers;
    }

    let session_config = SessionConfig {
        detector,
        template_path: args.template,
        analysis: config.analysis.clone(),
        engine,
        sequential: args.sequential,
        ..SessionConfig::default()
    };
    let mut session = AnalysisSession::new(session_config, calibration.clone())?;

    let cancel = session.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling analysis");
            cancel.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    });

    let report = session.run(Box::new(source)).await?;
    println!(
        "  Detected ball in {} of {} frames ({:.1}%)",
        report.stats.frames_detected,
        report.stats.frames_read,
        report.stats.detection_rate()
    );
    println!(
        "  Track segments: {} (selected {} records)",
        report.segments,
        report.tracking.len()
    );

    std::fs::create_dir_all(&args.output)?;
    let tracking_path = args.output.join("tracking.jsonl");
    {
        let header = TrackStreamHeader::new(
            calibration.frame_rate,
            calibration.meters_per_unit,
            report.tracking.len(),
        );
        let mut writer = TrackWriter::new(tracking_path.clone(), &header)?;
        writer.write_all(&report.tracking)?;
        writer.flush()?;
    }
    println!("  Tracking saved to: {}", tracking_path.display());

    print_outcome(&report.outcome);

    let report_path = args.output.join("report.json");
    report.into_report(&calibration).save(&report_path)?;
    println!("  Report saved to: {}", report_path.display());
    println!("\nAnalysis complete.");

    Ok(())
}

pub fn print_outcome(outcome: &AnalysisOutcome) {
    match outcome {
        AnalysisOutcome::Available { results } => {
            println!();
            println!("Delivery:");
            println!("  Speed: {:.1} km/h (max {:.1})", results.speed, results.max_speed);
            match results.pitch_point {
                Some(p) => println!(
                    "  Pitched: frame {} at ({:.1}, {:.1}), {:.2} m from the stumps",
                    results.pitch_frame.unwrap_or_default(),
                    p.x,
                    p.y,
                    results.pitch_distance
                ),
                None => println!("  Pitched: no bounce detected"),
            }
            println!("  Swing: {:+.2}°", results.swing_angle);
            println!("  Spin (modeled): {:.0} rpm", results.spin_rate);
            println!("  Type: {}", results.ball_type);
            println!();
            let lbw = &results.lbw_prediction;
            println!("LBW:");
            println!(
                "  Impact: ({:.1}, {:.1})",
                lbw.impact_point.x, lbw.impact_point.y
            );
            println!(
                "  Verdict: {} (probability {:.1}%)",
                if lbw.would_hit_stumps {
                    "hitting"
                } else {
                    "missing"
                },
                lbw.probability * 100.0
            );
        }
        AnalysisOutcome::Unavailable { reason } => {
            println!();
            println!("Analysis unavailable: {reason}");
        }
    }
}
