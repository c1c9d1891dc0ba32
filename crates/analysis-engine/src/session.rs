//! Analysis session management.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use drs_ball_detector::{build_detector, BallDetector, DetectorKind, FrameSource};
use drs_common::config::{AnalysisDefaults, EngineDefaults};
use drs_common::error::{DrsError, DrsResult};
use drs_delivery_model::{AnalysisOutcome, AnalysisReport, BallTrackingData, Calibration};
use drs_processing_core::{DeliveryAnalyzer, FinalizedTrack, TrackStep, Tracker, TrackerConfig};
use image::Rgb;

use crate::pipeline::{DetectionPipeline, PipelineStats};
use crate::sequential::{run_sequential, to_measurement};

/// Configuration for one analysis run.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Detector backend.
    pub detector: DetectorKind,

    /// Expected ball colour (RGB).
    pub ball_color: [u8; 3],

    /// Template image for the template backend; a rendered disc otherwise.
    pub template_path: Option<PathBuf>,

    /// Tracker and analysis parameters.
    pub analysis: AnalysisDefaults,

    /// Worker pool parameters.
    pub engine: EngineDefaults,

    /// Feed the tracker's continuity hint to the detector, one frame at a
    /// time, instead of detecting in parallel.
    pub sequential: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            detector: DetectorKind::default(),
            ball_color: [200, 30, 30],
            template_path: None,
            analysis: AnalysisDefaults::default(),
            engine: EngineDefaults::default(),
            sequential: false,
        }
    }
}

/// State of an analysis session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created but not run.
    Idle,
    /// Frames are being processed.
    Running,
    /// Finished with an outcome.
    Completed,
    /// Stopped by the caller.
    Cancelled,
    /// An error occurred.
    Failed,
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub detector: String,

    /// Frames handed to the tracker.
    pub frames_processed: u64,

    pub stats: PipelineStats,

    /// Number of track segments found.
    pub segments: usize,

    /// Records of the selected (longest) segment.
    pub tracking: Vec<BallTrackingData>,

    pub outcome: AnalysisOutcome,
}

impl SessionReport {
    /// Persistable envelope for this run.
    pub fn into_report(self, calibration: &Calibration) -> AnalysisReport {
        AnalysisReport::new(
            self.detector,
            self.frames_processed,
            calibration.clone(),
            self.tracking,
            self.outcome,
        )
    }
}

/// One analysis of one delivery video.
///
/// A session runs once. Cancelling it discards the tracker, so nothing
/// partial is observable afterwards.
pub struct AnalysisSession {
    config: SessionConfig,
    calibration: Calibration,
    detector: Arc<dyn BallDetector>,
    state: SessionState,
    cancel_flag: Arc<AtomicBool>,
}

impl AnalysisSession {
    /// Create a session, building the configured detector. The calibration
    /// is validated here, before any frame is read.
    pub fn new(config: SessionConfig, calibration: Calibration) -> DrsResult<Self> {
        let detector = build_detector(
            config.detector,
            Rgb(config.ball_color),
            config.template_path.as_deref(),
        )?;
        Self::with_detector(config, calibration, Arc::from(detector))
    }

    /// Create a session around an existing detector.
    pub fn with_detector(
        config: SessionConfig,
        calibration: Calibration,
        detector: Arc<dyn BallDetector>,
    ) -> DrsResult<Self> {
        DeliveryAnalyzer::new(calibration.clone(), &config.analysis).check_calibration()?;
        Ok(Self {
            config,
            calibration,
            detector,
            state: SessionState::Idle,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Get a clone of the cancel flag for use in other tasks.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    /// Request cancellation; takes effect before the next frame.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Process every frame of `source` and analyse the result.
    pub async fn run(&mut self, source: Box<dyn FrameSource>) -> DrsResult<SessionReport> {
        if self.state != SessionState::Idle {
            return Err(DrsError::config("Session already started"));
        }
        self.state = SessionState::Running;

        tracing::info!(
            detector = self.detector.name(),
            sequential = self.config.sequential,
            workers = self.config.engine.detection_workers,
            "Starting analysis session"
        );

        let tracker = Tracker::new(
            TrackerConfig::from_defaults(&self.config.analysis, &self.calibration),
            &self.calibration,
        );
        let result = if self.config.sequential {
            self.track_sequential(source, tracker).await
        } else {
            self.track_parallel(source, tracker).await
        };

        let (track, stats, frames_processed) = match result {
            Ok(done) => done,
            Err(DrsError::Cancelled) => {
                self.state = SessionState::Cancelled;
                tracing::info!("Analysis cancelled");
                return Err(DrsError::Cancelled);
            }
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e);
            }
        };

        let analyzer = DeliveryAnalyzer::new(self.calibration.clone(), &self.config.analysis);
        let outcome = match analyzer.outcome(&track) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e);
            }
        };

        let segments = track.segments().len();
        let tracking = track
            .into_longest()
            .map(|s| s.into_records())
            .unwrap_or_default();

        self.state = SessionState::Completed;
        tracing::info!(
            frames = frames_processed,
            segments,
            records = tracking.len(),
            available = outcome.is_available(),
            "Analysis session complete"
        );

        Ok(SessionReport {
            detector: self.detector.name().to_string(),
            frames_processed,
            stats,
            segments,
            tracking,
            outcome,
        })
    }

    async fn track_parallel(
        &self,
        source: Box<dyn FrameSource>,
        mut tracker: Tracker,
    ) -> DrsResult<(FinalizedTrack, PipelineStats, u64)> {
        let pipeline = DetectionPipeline::new(
            self.detector.clone(),
            self.config.engine.detection_workers,
            self.config.engine.queue_depth,
        );
        let halt = pipeline.halt_flag();
        let (mut detections, handle) = pipeline.spawn(source);

        let mut frames_processed = 0u64;
        let mut failure = None;
        while let Some(item) = detections.recv().await {
            if self.cancel_flag.load(Ordering::SeqCst) {
                failure = Some(DrsError::Cancelled);
                break;
            }
            let step = item.and_then(|d| {
                tracker.process(
                    d.index,
                    d.timestamp_ms,
                    d.candidate.as_ref().map(to_measurement),
                )
            });
            match step {
                Ok(TrackStep::Finalized) => {
                    frames_processed += 1;
                    break;
                }
                Ok(_) => frames_processed += 1,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        // Stop the pipeline and release whatever is still queued.
        halt.store(true, Ordering::SeqCst);
        drop(detections);
        let stats = handle
            .await
            .map_err(|e| DrsError::detection(format!("Detection pipeline failed: {e}")))??;

        match failure {
            Some(e) => Err(e),
            None => Ok((tracker.finish(), stats, frames_processed)),
        }
    }

    async fn track_sequential(
        &self,
        mut source: Box<dyn FrameSource>,
        mut tracker: Tracker,
    ) -> DrsResult<(FinalizedTrack, PipelineStats, u64)> {
        let detector = self.detector.clone();
        let cancel = self.cancel_flag.clone();

        tokio::task::spawn_blocking(move || {
            let stats = run_sequential(source.as_mut(), detector.as_ref(), &mut tracker, &cancel)?;
            let frames = stats.frames_read;
            Ok((tracker.finish(), stats, frames))
        })
        .await
        .map_err(|e| DrsError::detection(format!("Sequential analysis failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drs_ball_detector::synthetic::SyntheticDelivery;
    use drs_ball_detector::VecFrameSource;

    fn synthetic(occluded: Vec<u32>) -> Box<dyn FrameSource> {
        let delivery = SyntheticDelivery {
            occluded,
            ..SyntheticDelivery::default()
        };
        Box::new(VecFrameSource::new(delivery.render()))
    }

    #[tokio::test]
    async fn test_parallel_session_completes() {
        let mut session =
            AnalysisSession::new(SessionConfig::default(), Calibration::default()).unwrap();
        let report = session.run(synthetic(vec![20])).await.unwrap();

        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(report.detector, "color-blob");
        assert!(report.outcome.is_available());
        assert!(report.frames_processed < 60);
        assert_eq!(report.segments, 1);
        assert!(report.tracking.iter().any(|r| r.interpolated));
    }

    #[tokio::test]
    async fn test_sequential_matches_parallel() {
        let parallel = AnalysisSession::new(SessionConfig::default(), Calibration::default())
            .unwrap()
            .run(synthetic(vec![]))
            .await
            .unwrap();
        let sequential = AnalysisSession::new(
            SessionConfig {
                sequential: true,
                ..SessionConfig::default()
            },
            Calibration::default(),
        )
        .unwrap()
        .run(synthetic(vec![]))
        .await
        .unwrap();

        assert_eq!(parallel.tracking, sequential.tracking);
        assert_eq!(parallel.outcome, sequential.outcome);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mut session =
            AnalysisSession::new(SessionConfig::default(), Calibration::default()).unwrap();
        session.cancel();
        let err = session.run(synthetic(vec![])).await.unwrap_err();
        assert!(matches!(err, DrsError::Cancelled));
        assert_eq!(session.state(), SessionState::Cancelled);
    }

    #[tokio::test]
    async fn test_empty_video_is_unavailable() {
        let mut session =
            AnalysisSession::new(SessionConfig::default(), Calibration::default()).unwrap();
        let report = session
            .run(Box::new(VecFrameSource::new(vec![])))
            .await
            .unwrap();
        assert!(!report.outcome.is_available());
        assert!(report.tracking.is_empty());
    }

    #[tokio::test]
    async fn test_session_runs_once() {
        let mut session =
            AnalysisSession::new(SessionConfig::default(), Calibration::default()).unwrap();
        session.run(synthetic(vec![])).await.unwrap();
        assert!(session.run(synthetic(vec![])).await.is_err());
    }

    #[test]
    fn test_invalid_calibration_rejected_up_front() {
        let calibration = Calibration {
            meters_per_unit: -1.0,
            ..Calibration::default()
        };
        let err = AnalysisSession::new(SessionConfig::default(), calibration)
            .err()
            .unwrap();
        assert!(matches!(err, DrsError::InvalidCalibration { .. }));
    }
}
