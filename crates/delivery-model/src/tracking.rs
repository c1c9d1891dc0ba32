//! Per-frame ball tracking records.
//!
//! Tracking records are persisted as JSONL with a `#`-prefixed header line,
//! the same layout used for every streamed record file in this workspace.

use serde::{Deserialize, Serialize};

use crate::geometry::{Position, Velocity};

/// Current schema version for tracking streams.
pub const TRACK_SCHEMA_VERSION: &str = "1.0";

/// Default number of positions shown in an overlay trail.
pub const DEFAULT_TRAIL_LENGTH: usize = 10;

/// One smoothed sample of the ball's state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallTrackingData {
    /// Index of the source frame.
    pub frame_index: u64,

    /// Presentation time of the source frame in milliseconds.
    pub timestamp_ms: f64,

    pub position: Position,

    pub velocity: Velocity,

    /// Tracker confidence in `[0.0, 1.0]`.
    pub confidence: f64,

    /// True when the record was produced by motion-model extrapolation
    /// rather than an accepted detection.
    pub interpolated: bool,
}

impl BallTrackingData {
    /// Timestamp as fractional seconds.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_ms / 1000.0
    }

    /// Speed in plane units per second.
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }
}

/// Unit of the position coordinates in a tracking stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateUnits {
    #[default]
    Pixels,
    Meters,
}

/// Header line of a tracking JSONL file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStreamHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Frame rate of the analyzed video.
    pub frame_rate: f64,

    #[serde(default)]
    pub units: CoordinateUnits,

    /// Meters per position unit.
    pub meters_per_unit: f64,

    /// Number of records that follow the header.
    pub record_count: usize,
}

impl TrackStreamHeader {
    pub fn new(frame_rate: f64, meters_per_unit: f64, record_count: usize) -> Self {
        Self {
            schema_version: TRACK_SCHEMA_VERSION.to_string(),
            frame_rate,
            units: CoordinateUnits::Pixels,
            meters_per_unit,
            record_count,
        }
    }
}

/// A continuous run of tracking records between two track losses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackSegment {
    pub records: Vec<BallTrackingData>,
}

impl TrackSegment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: BallTrackingData) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Frame index of the first record.
    pub fn start_frame(&self) -> Option<u64> {
        self.records.first().map(|r| r.frame_index)
    }

    /// Frame index of the last record.
    pub fn end_frame(&self) -> Option<u64> {
        self.records.last().map(|r| r.frame_index)
    }

    /// Number of records backed by an accepted detection.
    pub fn observed_count(&self) -> usize {
        self.records.iter().filter(|r| !r.interpolated).count()
    }

    /// Drop interpolated records after the last observed one.
    pub fn trim_trailing_interpolated(&mut self) {
        let keep = self
            .records
            .iter()
            .rposition(|r| !r.interpolated)
            .map_or(0, |i| i + 1);
        self.records.truncate(keep);
    }

    pub fn into_records(self) -> Vec<BallTrackingData> {
        self.records
    }
}

/// Spatial-continuity hint handed to a detector for one frame.
///
/// Owned by the tracker; detectors only read it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetectionContext {
    /// Position of the last accepted detection, if any.
    pub last_position: Option<Position>,

    /// Seconds elapsed since that detection.
    pub elapsed_secs: f64,
}

impl DetectionContext {
    /// No prior: every candidate is spatially plausible.
    pub fn unconstrained() -> Self {
        Self::default()
    }

    pub fn after(last_position: Position, elapsed_secs: f64) -> Self {
        Self {
            last_position: Some(last_position),
            elapsed_secs,
        }
    }

    /// Whether `p` is reachable from the last position at `max_speed`
    /// (units/s), with `slack` units of tolerance.
    pub fn allows(&self, p: &Position, max_speed: f64, slack: f64) -> bool {
        match self.last_position {
            Some(last) => last.distance_to(p) <= max_speed * self.elapsed_secs.max(0.0) + slack,
            None => true,
        }
    }
}

/// Check that records are ordered and well-formed.
///
/// Returns a description of every violation found; an empty vector means
/// the sequence is valid.
pub fn validate_records(records: &[BallTrackingData]) -> Vec<String> {
    let mut errors = vec![];

    for (i, r) in records.iter().enumerate() {
        if !(0.0..=1.0).contains(&r.confidence) {
            errors.push(format!(
                "frame {}: confidence {} outside [0, 1]",
                r.frame_index, r.confidence
            ));
        }
        if !r.position.is_finite() || !r.timestamp_ms.is_finite() {
            errors.push(format!("frame {}: non-finite value", r.frame_index));
        }
        if i > 0 {
            let prev = &records[i - 1];
            if r.frame_index <= prev.frame_index {
                errors.push(format!(
                    "frame {} does not follow frame {}",
                    r.frame_index, prev.frame_index
                ));
            }
            if r.timestamp_ms < prev.timestamp_ms {
                errors.push(format!("frame {}: timestamp decreases", r.frame_index));
            }
        }
    }

    errors
}

/// The record shown at playback time `ms`: the last record whose timestamp
/// is not after `ms`, or the first record if `ms` precedes the track.
pub fn record_at_time(records: &[BallTrackingData], ms: f64) -> Option<&BallTrackingData> {
    if records.is_empty() {
        return None;
    }
    let idx = records.partition_point(|r| r.timestamp_ms <= ms);
    Some(&records[idx.saturating_sub(1)])
}

/// Positions of up to `len` records ending at `index` (inclusive), oldest
/// first.
pub fn trail(records: &[BallTrackingData], index: usize, len: usize) -> Vec<Position> {
    if records.is_empty() || len == 0 {
        return vec![];
    }
    let end = index.min(records.len() - 1) + 1;
    let start = end.saturating_sub(len);
    records[start..end].iter().map(|r| r.position).collect()
}

/// Parse tracking records from JSONL content, skipping the header.
pub fn parse_tracking(jsonl: &str) -> Result<Vec<BallTrackingData>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Parse the `#` header line, if the content has one.
pub fn parse_tracking_header(
    jsonl: &str,
) -> Option<Result<TrackStreamHeader, serde_json::Error>> {
    jsonl
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.strip_prefix('#'))
        .map(|rest| serde_json::from_str(rest.trim()))
}

/// Serialize records to JSONL format (no header).
pub fn serialize_tracking(records: &[BallTrackingData]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for record in records {
        output.push_str(&serde_json::to_string(record)?);
        output.push('\n');
    }
    Ok(output)
}
