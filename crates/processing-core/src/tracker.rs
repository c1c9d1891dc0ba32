//! Ball state estimation.
//!
//! The tracker is the only stage that carries state across frames. It fuses
//! per-frame measurements into a smoothed kinematic track, bridges short
//! detection gaps by extrapolation, and splits the flight into segments
//! when the ball is lost for too long.
//!
//! # State machine
//!
//! ```text
//! Idle ──accept──▶ Tracking ──gap too long──▶ Lost ──reacquire──▶ Tracking
//!   ▲                 │                        │
//!   └──window expired─┼────────────────────────┘
//!                     └──stumps plane / finish──▶ Finalized
//! ```

use drs_common::config::AnalysisDefaults;
use drs_common::error::{DrsError, DrsResult};
use drs_delivery_model::{
    BallTrackingData, Calibration, DetectionContext, Position, TrackSegment, Velocity,
};
use serde::{Deserialize, Serialize};

use crate::kalman::MotionFilter;

/// Shortest time step treated as elapsed time.
const MIN_DT_SECS: f64 = 1e-6;

/// Velocity variance while only one point of the flight is known.
const UNKNOWN_VELOCITY_VAR: f64 = 1e8;

/// Acceleration variance at the start of a segment.
const INITIAL_ACCELERATION_VAR: f64 = 1e6;

/// Tracker parameters in position units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Measurements at or below this confidence are treated as misses.
    pub acceptance_threshold: f64,
    pub confidence_decay: f64,
    pub max_interpolated_run: usize,
    pub reacquisition_window: usize,
    /// Squared Mahalanobis distance accepted by the gate.
    pub gate_threshold: f64,
    pub reacquisition_gate_scale: f64,
    /// Jerk spectral density of the motion model.
    pub process_noise: f64,
    /// Position standard deviation of a full-confidence measurement.
    pub measurement_noise: f64,
    /// Largest plausible acceleration (units/s^2).
    pub max_acceleration: f64,
    pub maneuver_inflation: f64,
}

impl TrackerConfig {
    /// Build from application defaults, converting metric limits with the
    /// calibration scale.
    pub fn from_defaults(defaults: &AnalysisDefaults, calibration: &Calibration) -> Self {
        Self {
            acceptance_threshold: defaults.acceptance_threshold,
            confidence_decay: defaults.confidence_decay,
            max_interpolated_run: defaults.max_interpolated_run,
            reacquisition_window: defaults.reacquisition_window,
            gate_threshold: defaults.gate_threshold,
            reacquisition_gate_scale: defaults.reacquisition_gate_scale,
            process_noise: defaults.process_noise,
            measurement_noise: defaults.measurement_noise,
            max_acceleration: calibration.from_meters(defaults.max_acceleration_mps2),
            maneuver_inflation: defaults.maneuver_inflation,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::from_defaults(&AnalysisDefaults::default(), &Calibration::default())
    }
}

/// Tracker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    Idle,
    Tracking,
    Lost,
    Finalized,
}

/// A detector measurement for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub position: Position,
    pub confidence: f64,
}

impl Measurement {
    pub fn new(position: Position, confidence: f64) -> Self {
        Self {
            position,
            confidence,
        }
    }
}

/// What the tracker did with one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackStep {
    /// Nothing emitted (idle, lost, or already finalized).
    Skipped,
    /// A record was appended to the current segment.
    Record(BallTrackingData),
    /// The ball was lost; the current segment is closed.
    Boundary,
    /// The ball passed the stumps plane; no further frames are used.
    Finalized,
}

/// All segments of one video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalizedTrack {
    segments: Vec<TrackSegment>,
}

impl FinalizedTrack {
    pub fn new(segments: Vec<TrackSegment>) -> Self {
        Self { segments }
    }

    /// Segments in chronological order.
    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }

    /// The longest segment; the earliest one wins ties.
    pub fn longest(&self) -> Option<&TrackSegment> {
        let mut best: Option<&TrackSegment> = None;
        for segment in &self.segments {
            if best.map_or(true, |b| segment.len() > b.len()) {
                best = Some(segment);
            }
        }
        best
    }

    pub fn longest_len(&self) -> usize {
        self.longest().map_or(0, TrackSegment::len)
    }

    pub fn into_longest(self) -> Option<TrackSegment> {
        let index = self
            .longest()
            .and_then(|l| self.segments.iter().position(|s| std::ptr::eq(s, l)))?;
        self.segments.into_iter().nth(index)
    }
}

/// Sequential ball tracker.
pub struct Tracker {
    config: TrackerConfig,
    calibration: Calibration,
    state: TrackerState,
    filter: Option<MotionFilter>,
    current: TrackSegment,
    segments: Vec<TrackSegment>,
    last_frame: Option<(u64, f64)>,
    last_accepted: Option<BallTrackingData>,
    last_confidence: f64,
    velocity_known: bool,
    interpolated_run: usize,
    frames_lost: usize,
}

impl Tracker {
    pub fn new(config: TrackerConfig, calibration: &Calibration) -> Self {
        Self {
            config,
            calibration: calibration.clone(),
            state: TrackerState::Idle,
            filter: None,
            current: TrackSegment::new(),
            segments: vec![],
            last_frame: None,
            last_accepted: None,
            last_confidence: 0.0,
            velocity_known: false,
            interpolated_run: 0,
            frames_lost: 0,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.state == TrackerState::Finalized
    }

    /// Records in the segment currently being built.
    pub fn current_segment(&self) -> &TrackSegment {
        &self.current
    }

    /// Continuity hint for detecting the frame at `timestamp_ms`.
    pub fn detection_context(&self, timestamp_ms: f64) -> DetectionContext {
        match (self.state, self.last_accepted) {
            (TrackerState::Tracking | TrackerState::Lost, Some(last)) => DetectionContext::after(
                last.position,
                (timestamp_ms - last.timestamp_ms) / 1000.0,
            ),
            _ => DetectionContext::unconstrained(),
        }
    }

    /// Feed one frame, in strict frame order.
    pub fn process(
        &mut self,
        frame_index: u64,
        timestamp_ms: f64,
        measurement: Option<Measurement>,
    ) -> DrsResult<TrackStep> {
        if self.state == TrackerState::Finalized {
            return Ok(TrackStep::Skipped);
        }
        self.check_order(frame_index, timestamp_ms)?;

        let dt = self
            .last_frame
            .map_or(0.0, |(_, t)| (timestamp_ms - t) / 1000.0);
        self.last_frame = Some((frame_index, timestamp_ms));

        let threshold = self.config.acceptance_threshold;
        let measurement = measurement.filter(|m| {
            m.confidence > threshold && m.confidence <= 1.0 && m.position.is_finite()
        });

        let step = match self.state {
            TrackerState::Idle => self.step_idle(frame_index, timestamp_ms, measurement),
            TrackerState::Tracking => {
                self.step_tracking(frame_index, timestamp_ms, dt, measurement)
            }
            TrackerState::Lost => self.step_lost(frame_index, timestamp_ms, dt, measurement),
            TrackerState::Finalized => TrackStep::Skipped,
        };
        Ok(step)
    }

    /// Close the open segment and hand over every segment.
    pub fn finish(&mut self) -> FinalizedTrack {
        if self.state != TrackerState::Finalized {
            self.close_segment();
            self.state = TrackerState::Finalized;
        }
        let track = FinalizedTrack::new(std::mem::take(&mut self.segments));
        tracing::info!(
            segments = track.segments().len(),
            longest = track.longest_len(),
            "Tracking finalized"
        );
        track
    }

    fn check_order(&self, frame_index: u64, timestamp_ms: f64) -> DrsResult<()> {
        if !timestamp_ms.is_finite() {
            return Err(DrsError::tracking(format!(
                "frame {frame_index} has a non-finite timestamp"
            )));
        }
        if let Some((last_index, last_ts)) = self.last_frame {
            if frame_index <= last_index {
                return Err(DrsError::tracking(format!(
                    "frame {frame_index} received after frame {last_index}"
                )));
            }
            if timestamp_ms < last_ts {
                return Err(DrsError::tracking(format!(
                    "frame {frame_index} timestamp {timestamp_ms}ms precedes {last_ts}ms"
                )));
            }
        }
        Ok(())
    }

    fn step_idle(
        &mut self,
        frame_index: u64,
        timestamp_ms: f64,
        measurement: Option<Measurement>,
    ) -> TrackStep {
        let Some(m) = measurement else {
            return TrackStep::Skipped;
        };

        let r = self.measurement_variance(m.confidence);
        self.filter = Some(MotionFilter::new(
            m.position,
            Velocity::ZERO,
            [r, UNKNOWN_VELOCITY_VAR, INITIAL_ACCELERATION_VAR],
            self.config.process_noise,
        ));
        self.velocity_known = false;
        self.interpolated_run = 0;
        self.frames_lost = 0;
        self.state = TrackerState::Tracking;

        tracing::debug!(frame = frame_index, x = m.position.x, y = m.position.y, "Track started");
        self.accept(frame_index, timestamp_ms, m.confidence)
    }

    fn step_tracking(
        &mut self,
        frame_index: u64,
        timestamp_ms: f64,
        dt: f64,
        measurement: Option<Measurement>,
    ) -> TrackStep {
        let Some(prior) = self.filter.clone() else {
            self.reset_to_idle();
            return self.step_idle(frame_index, timestamp_ms, measurement);
        };

        if let Some(m) = measurement {
            if !self.velocity_known {
                if self.initialise_velocity(&m, timestamp_ms) {
                    return self.accept(frame_index, timestamp_ms, m.confidence);
                }
            } else if let Some(filter) = self.correct(&prior, dt, &m, timestamp_ms, false) {
                self.filter = Some(filter);
                return self.accept(frame_index, timestamp_ms, m.confidence);
            } else {
                tracing::debug!(frame = frame_index, "Measurement rejected");
            }
        }

        self.interpolate(prior, dt, frame_index, timestamp_ms)
    }

    fn step_lost(
        &mut self,
        frame_index: u64,
        timestamp_ms: f64,
        dt: f64,
        measurement: Option<Measurement>,
    ) -> TrackStep {
        self.frames_lost += 1;
        let prior = match self.filter.clone() {
            Some(prior) if self.frames_lost <= self.config.reacquisition_window => prior,
            _ => {
                tracing::debug!(frame = frame_index, "Reacquisition window expired");
                self.reset_to_idle();
                return self.step_idle(frame_index, timestamp_ms, measurement);
            }
        };

        if let Some(m) = measurement {
            if let Some(filter) = self.correct(&prior, dt, &m, timestamp_ms, true) {
                tracing::debug!(
                    frame = frame_index,
                    frames_lost = self.frames_lost,
                    "Ball reacquired, new segment"
                );
                self.filter = Some(filter);
                self.state = TrackerState::Tracking;
                self.interpolated_run = 0;
                self.frames_lost = 0;
                return self.accept(frame_index, timestamp_ms, m.confidence);
            }
        }

        let mut filter = prior;
        filter.predict(dt);
        self.filter = Some(filter);
        TrackStep::Skipped
    }

    /// Two-point velocity from the lone first record to `m`, back-filled
    /// into the records already in the segment.
    fn initialise_velocity(&mut self, m: &Measurement, timestamp_ms: f64) -> bool {
        let Some(first) = self.current.records.iter().find(|r| !r.interpolated).copied() else {
            return false;
        };
        let elapsed = (timestamp_ms - first.timestamp_ms) / 1000.0;
        if elapsed < MIN_DT_SECS {
            return false;
        }

        let v = first.position.delta_to(&m.position).scaled(1.0 / elapsed);
        let r = self.measurement_variance(m.confidence);
        self.filter = Some(MotionFilter::new(
            m.position,
            v,
            [r, 2.0 * r / (elapsed * elapsed), INITIAL_ACCELERATION_VAR],
            self.config.process_noise,
        ));

        for record in self.current.records.iter_mut() {
            record.velocity = v;
            if record.interpolated {
                let t = (record.timestamp_ms - first.timestamp_ms) / 1000.0;
                record.position = first.position.advanced(&v, t);
            }
        }
        self.velocity_known = true;
        true
    }

    /// Gate `m` against the prediction from `prior`. A candidate outside
    /// the gate is retried with widened dynamics so that a bounce or a
    /// deflection does not break the track.
    fn correct(
        &self,
        prior: &MotionFilter,
        dt: f64,
        m: &Measurement,
        timestamp_ms: f64,
        reacquiring: bool,
    ) -> Option<MotionFilter> {
        let gate = if reacquiring {
            self.config.gate_threshold * self.config.reacquisition_gate_scale
        } else {
            if !self.plausible_acceleration(m, timestamp_ms) {
                return None;
            }
            self.config.gate_threshold
        };
        let r = self.measurement_variance(m.confidence);

        let mut predicted = prior.clone();
        predicted.predict(dt);
        if let Some(innovation) = predicted
            .innovation(&m.position, r)
            .filter(|i| i.distance_sq <= gate)
        {
            predicted.correct(&innovation);
            return Some(predicted);
        }

        let mut widened = prior.clone();
        widened.inflate_dynamics(self.config.maneuver_inflation);
        widened.predict(dt);
        let innovation = widened
            .innovation(&m.position, r)
            .filter(|i| i.distance_sq <= gate)?;
        tracing::debug!(
            distance_sq = innovation.distance_sq,
            "Maneuver: measurement accepted with widened dynamics"
        );
        widened.correct(&innovation);
        Some(widened)
    }

    fn plausible_acceleration(&self, m: &Measurement, timestamp_ms: f64) -> bool {
        let Some(last) = self.last_accepted else {
            return true;
        };
        let elapsed = (timestamp_ms - last.timestamp_ms) / 1000.0;
        if elapsed < MIN_DT_SECS {
            return true;
        }
        let implied = last.position.delta_to(&m.position).scaled(1.0 / elapsed);
        let accel = Velocity::new(implied.vx - last.velocity.vx, implied.vy - last.velocity.vy)
            .magnitude()
            / elapsed;
        if accel > self.config.max_acceleration {
            tracing::debug!(accel, limit = self.config.max_acceleration, "Implausible acceleration");
            return false;
        }
        true
    }

    fn accept(&mut self, frame_index: u64, timestamp_ms: f64, confidence: f64) -> TrackStep {
        let Some(filter) = &self.filter else {
            return TrackStep::Skipped;
        };

        let record = BallTrackingData {
            frame_index,
            timestamp_ms,
            position: filter.position(),
            velocity: if self.velocity_known {
                filter.velocity()
            } else {
                Velocity::ZERO
            },
            confidence: confidence.clamp(0.0, 1.0),
            interpolated: false,
        };
        self.current.push(record);
        self.last_accepted = Some(record);
        self.last_confidence = record.confidence;
        self.interpolated_run = 0;

        if self.velocity_known && self.calibration.along(&record.position) >= 0.0 {
            tracing::debug!(frame = frame_index, "Ball passed the stumps plane");
            self.close_segment();
            self.state = TrackerState::Finalized;
            return TrackStep::Finalized;
        }

        TrackStep::Record(record)
    }

    fn interpolate(
        &mut self,
        mut filter: MotionFilter,
        dt: f64,
        frame_index: u64,
        timestamp_ms: f64,
    ) -> TrackStep {
        filter.predict(dt);
        self.interpolated_run += 1;

        if self.interpolated_run > self.config.max_interpolated_run {
            tracing::debug!(
                frame = frame_index,
                run = self.interpolated_run,
                "Track lost"
            );
            self.filter = Some(filter);
            self.close_segment();
            self.state = TrackerState::Lost;
            self.frames_lost = 0;
            return TrackStep::Boundary;
        }

        let confidence = (self.last_confidence * self.config.confidence_decay).clamp(0.0, 1.0);
        let record = BallTrackingData {
            frame_index,
            timestamp_ms,
            position: filter.position(),
            velocity: if self.velocity_known {
                filter.velocity()
            } else {
                Velocity::ZERO
            },
            confidence,
            interpolated: true,
        };
        self.last_confidence = confidence;
        self.filter = Some(filter);
        self.current.push(record);
        TrackStep::Record(record)
    }

    fn close_segment(&mut self) {
        let mut segment = std::mem::take(&mut self.current);
        segment.trim_trailing_interpolated();
        if segment.is_empty() {
            return;
        }
        tracing::debug!(
            start = segment.start_frame(),
            end = segment.end_frame(),
            records = segment.len(),
            "Segment closed"
        );
        self.segments.push(segment);
    }

    fn reset_to_idle(&mut self) {
        self.state = TrackerState::Idle;
        self.filter = None;
        self.last_accepted = None;
        self.velocity_known = false;
        self.interpolated_run = 0;
        self.frames_lost = 0;
    }

    fn measurement_variance(&self, confidence: f64) -> f64 {
        self.config.measurement_noise.powi(2) / confidence.max(1e-3)
    }
}
