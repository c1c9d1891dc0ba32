//! DRS-Track Analysis Engine
//!
//! Runs one delivery video through detection, tracking and analysis.
//! Detection is the expensive, stateless stage and runs on a bounded pool;
//! the tracker is single-owner and sees detections in strict frame order.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │              AnalysisSession               │
//! │ ┌─────────────┐ ┌───────────┐ ┌─────────┐  │
//! │ │ FrameSource │▶│ Detection │▶│ Tracker │  │
//! │ │  (reader)   │ │ pool (N)  │ │         │  │
//! │ └─────────────┘ └───────────┘ └────┬────┘  │
//! │                                    ▼       │
//! │                     ┌──────────────────┐   │
//! │                     │ DeliveryAnalyzer │   │
//! │                     └──────────────────┘   │
//! └────────────────────────────────────────────┘
//! ```

pub mod pipeline;
pub mod sequential;
pub mod session;

pub use pipeline::{DetectionPipeline, FrameDetection, PipelineStats};
pub use sequential::run_sequential;
pub use session::*;
