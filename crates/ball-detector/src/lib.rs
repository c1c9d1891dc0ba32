//! DRS-Track Ball Detector
//!
//! Finds the ball in a single decoded frame. Detection is stateless: the
//! only cross-frame information a detector sees is the continuity hint in
//! [`DetectionContext`], which the tracker owns and passes in.
//!
//! Two backends implement [`BallDetector`]:
//!
//! - **Color blob:** colour mask, connected components, shape filters
//! - **Template:** normalized cross-correlation against a ball template
//!
//! Frames come from a [`FrameSource`]; decoding video containers is left
//! to external tools that write image sequences.

pub mod backends;
pub mod frame;
pub mod synthetic;

use drs_delivery_model::Position;

pub use backends::{
    build_detector, ColorBlobConfig, ColorBlobDetector, DetectorKind, TemplateConfig,
    TemplateDetector,
};
pub use drs_delivery_model::DetectionContext;
pub use frame::{FrameSource, ImageSequenceSource, VecFrameSource, VideoFrame};

/// A single ball candidate found in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Ball centre in image pixels.
    pub position: Position,

    /// Detector confidence in `[0.0, 1.0]`.
    pub confidence: f64,

    /// Apparent ball radius in pixels.
    pub radius: f64,
}

/// Per-frame ball detector.
pub trait BallDetector: Send + Sync {
    /// Locate the ball, or return `None` when it is occluded, too blurred,
    /// or not uniquely identifiable.
    fn detect(&self, frame: &VideoFrame, context: &DetectionContext) -> Option<Candidate>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
