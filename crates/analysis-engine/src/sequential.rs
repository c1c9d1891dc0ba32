//! Single-threaded analysis loop.
//!
//! Unlike the parallel pipeline, this path hands the tracker's continuity
//! hint to the detector for every frame, so a detector can discard blobs
//! the ball could not have reached.

use std::sync::atomic::{AtomicBool, Ordering};

use drs_ball_detector::{BallDetector, Candidate, FrameSource};
use drs_common::error::{DrsError, DrsResult};
use drs_processing_core::{Measurement, TrackStep, Tracker};

use crate::pipeline::PipelineStats;

/// Tracker input for a detector candidate.
pub fn to_measurement(candidate: &Candidate) -> Measurement {
    Measurement::new(candidate.position, candidate.confidence)
}

/// Detect and track frame by frame until the source ends or the tracker
/// finalizes.
pub fn run_sequential(
    source: &mut dyn FrameSource,
    detector: &dyn BallDetector,
    tracker: &mut Tracker,
    cancel: &AtomicBool,
) -> DrsResult<PipelineStats> {
    let mut stats = PipelineStats {
        max_in_flight: 1,
        ..PipelineStats::default()
    };

    while let Some(frame) = source.next_frame()? {
        if cancel.load(Ordering::SeqCst) {
            return Err(DrsError::Cancelled);
        }
        stats.frames_read += 1;

        let context = tracker.detection_context(frame.timestamp_ms);
        let candidate = detector.detect(&frame, &context);
        stats.record(&candidate);

        let step = tracker.process(
            frame.index,
            frame.timestamp_ms,
            candidate.as_ref().map(to_measurement),
        )?;
        if step == TrackStep::Finalized {
            tracing::debug!(frame = frame.index, "Tracker finalized, stopping early");
            break;
        }
    }

    Ok(stats)
}
