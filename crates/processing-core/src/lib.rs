//! DRS-Track Processing Core
//!
//! Turns per-frame ball measurements into a delivery verdict:
//! - **Tracker:** Kalman-filtered ball state with gap handling and segments
//! - **Pitch Point:** Locates the bounce in the finished track
//! - **Metrics:** Speed, swing, modeled spin, and ball-type classification
//! - **Trajectory:** Projects the post-bounce path to the stumps plane
//! - **LBW:** Geometric hit test with a probability
//!
//! This crate is pure computation: no I/O, no threads. The same track and
//! calibration always yield the same results.

pub mod analyzer;
pub mod lbw;
pub mod math;
pub mod metrics;
pub mod pitch_point;
pub mod tracker;
pub mod trajectory;

mod kalman;

pub use analyzer::DeliveryAnalyzer;
pub use metrics::{classify, DeliveryMetrics};
pub use pitch_point::{detect_pitch_point, PitchPoint};
pub use tracker::{FinalizedTrack, Measurement, TrackStep, Tracker, TrackerConfig, TrackerState};
