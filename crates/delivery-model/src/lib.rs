//! DRS-Track Delivery Model
//!
//! Defines the data contracts shared by the analysis engine and its
//! consumers:
//! - **Geometry:** Positions, velocities, and rectangles in the image plane
//! - **Tracking:** Per-frame ball tracking records and track segments
//! - **Analysis:** Delivery metrics, ball type, and the LBW prediction
//! - **Calibration:** Scale, frame rate, stump geometry, and thresholds
//! - **Report:** The persisted analysis envelope and its error type
//!
//! Serialized field names are camelCase so that presentation components
//! can read the records without a mapping layer.

pub mod analysis;
pub mod calibration;
pub mod geometry;
pub mod report;
pub mod tracking;
pub mod writer;

pub use analysis::*;
pub use calibration::*;
pub use geometry::*;
pub use report::*;
pub use tracking::*;
