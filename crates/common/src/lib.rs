//! DRS-Track Common Utilities
//!
//! Shared infrastructure for all DRS-Track crates:
//! - Error types and result aliases
//! - Playback frame clock for slow-motion review
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
