//! Ordered parallel detection.
//!
//! Frames are read on a blocking task, detected on up to `workers`
//! blocking tasks at once, and handed on in the order they were read:
//!
//! ```text
//! FrameSource ──[queue]──▶ dispatcher ──spawn_blocking──▶ detect
//!                              │ (VecDeque of handles, awaited front first)
//!                              └──[queue]──▶ tracker
//! ```
//!
//! Both queues are bounded, so a slow tracker stalls detection and a slow
//! detector stalls reading.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use drs_ball_detector::{BallDetector, Candidate, DetectionContext, FrameSource, VideoFrame};
use drs_common::error::{DrsError, DrsResult};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Detection outcome for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDetection {
    pub index: u64,
    pub timestamp_ms: f64,
    pub candidate: Option<Candidate>,
}

/// Runtime statistics from a detection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames pulled from the source.
    pub frames_read: u64,

    /// Frames with a ball candidate.
    pub frames_detected: u64,

    /// Frames without one.
    pub frames_missed: u64,

    /// Most detection tasks observed in flight at once.
    pub max_in_flight: usize,
}

impl PipelineStats {
    /// Detection rate as a percentage.
    pub fn detection_rate(&self) -> f64 {
        let total = self.frames_detected + self.frames_missed;
        if total == 0 {
            return 0.0;
        }
        self.frames_detected as f64 / total as f64 * 100.0
    }

    pub(crate) fn record(&mut self, candidate: &Option<Candidate>) {
        if candidate.is_some() {
            self.frames_detected += 1;
        } else {
            self.frames_missed += 1;
        }
    }
}

/// Bounded, order-preserving detection pool.
pub struct DetectionPipeline {
    detector: Arc<dyn BallDetector>,
    workers: usize,
    queue_depth: usize,
    halt: Arc<AtomicBool>,
}

impl DetectionPipeline {
    pub fn new(detector: Arc<dyn BallDetector>, workers: usize, queue_depth: usize) -> Self {
        Self {
            detector,
            workers: workers.max(1),
            queue_depth: queue_depth.max(1),
            halt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops reading and dispatching once set. Frames already
    /// queued are dropped.
    pub fn halt_flag(&self) -> Arc<AtomicBool> {
        self.halt.clone()
    }

    /// Start the pipeline. Detections arrive on the receiver in frame
    /// order; the handle resolves to the run statistics once everything
    /// has drained.
    pub fn spawn(
        self,
        source: Box<dyn FrameSource>,
    ) -> (
        mpsc::Receiver<DrsResult<FrameDetection>>,
        JoinHandle<DrsResult<PipelineStats>>,
    ) {
        let (frame_tx, frame_rx) = mpsc::channel(self.queue_depth);
        let (out_tx, out_rx) = mpsc::channel(self.queue_depth);

        let reader = spawn_reader(source, frame_tx, self.halt.clone());
        let handle = tokio::spawn(async move {
            let stats = self.dispatch(frame_rx, out_tx).await;
            match reader.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "Frame reader stopped with error"),
                Err(e) => tracing::warn!(error = %e, "Frame reader join failed"),
            }
            stats
        });

        (out_rx, handle)
    }

    async fn dispatch(
        &self,
        mut frames: mpsc::Receiver<DrsResult<VideoFrame>>,
        out: mpsc::Sender<DrsResult<FrameDetection>>,
    ) -> DrsResult<PipelineStats> {
        let mut stats = PipelineStats::default();
        let mut in_flight: VecDeque<JoinHandle<FrameDetection>> = VecDeque::new();

        while let Some(frame) = frames.recv().await {
            if self.halt.load(Ordering::SeqCst) {
                break;
            }

            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    let _ = out.send(Err(e)).await;
                    break;
                }
            };
            stats.frames_read += 1;

            let detector = self.detector.clone();
            in_flight.push_back(tokio::task::spawn_blocking(move || FrameDetection {
                index: frame.index,
                timestamp_ms: frame.timestamp_ms,
                candidate: detector.detect(&frame, &DetectionContext::unconstrained()),
            }));
            stats.max_in_flight = stats.max_in_flight.max(in_flight.len());

            if in_flight.len() >= self.workers
                && !forward_front(&mut in_flight, &out, &mut stats).await?
            {
                break;
            }
        }

        // Dropping the receiver releases any frames still queued.
        drop(frames);

        while !in_flight.is_empty() {
            if self.halt.load(Ordering::SeqCst) {
                for handle in in_flight.drain(..) {
                    let _ = handle.await;
                }
                break;
            }
            if !forward_front(&mut in_flight, &out, &mut stats).await? {
                break;
            }
        }

        tracing::debug!(
            frames = stats.frames_read,
            detected = stats.frames_detected,
            max_in_flight = stats.max_in_flight,
            "Detection pipeline drained"
        );
        Ok(stats)
    }
}

/// Await the oldest detection and pass it on. Returns `false` once the
/// consumer has gone away.
async fn forward_front(
    in_flight: &mut VecDeque<JoinHandle<FrameDetection>>,
    out: &mpsc::Sender<DrsResult<FrameDetection>>,
    stats: &mut PipelineStats,
) -> DrsResult<bool> {
    let Some(handle) = in_flight.pop_front() else {
        return Ok(true);
    };
    let detection = handle
        .await
        .map_err(|e| DrsError::detection(format!("Detection task failed: {e}")))?;
    stats.record(&detection.candidate);
    Ok(out.send(Ok(detection)).await.is_ok())
}

fn spawn_reader(
    mut source: Box<dyn FrameSource>,
    tx: mpsc::Sender<DrsResult<VideoFrame>>,
    halt: Arc<AtomicBool>,
) -> JoinHandle<DrsResult<()>> {
    tokio::task::spawn_blocking(move || {
        while !halt.load(Ordering::SeqCst) {
            let next = source.next_frame();
            let done = !matches!(next, Ok(Some(_)));
            let item = match next {
                Ok(Some(frame)) => Ok(frame),
                Ok(None) => break,
                Err(e) => Err(e),
            };
            if tx.blocking_send(item).is_err() || done {
                break;
            }
        }
        Ok(())
    })
}
