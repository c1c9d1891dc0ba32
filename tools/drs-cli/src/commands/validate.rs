//! Validate a calibration file.

use std::path::PathBuf;

use drs_delivery_model::{Calibration, ModelError};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating calibration at: {}", path.display());

    // Parse without validation so every problem can be listed.
    let json = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read calibration: {e}"))?;
    let calibration: Calibration = serde_json::from_str(&json)
        .map_err(|e| anyhow::anyhow!("Failed to parse calibration: {e}"))?;

    println!("  Scale: {} m/unit", calibration.meters_per_unit);
    println!("  Frame rate: {} fps", calibration.frame_rate);
    println!(
        "  Pitch axis: ({}, {})  Up axis: ({}, {})",
        calibration.pitch_axis.x,
        calibration.pitch_axis.y,
        calibration.up_axis.x,
        calibration.up_axis.y
    );
    println!(
        "  Stumps: ({}, {}) - ({}, {}), bails at {}",
        calibration.stumps.min_x,
        calibration.stumps.min_y,
        calibration.stumps.max_x,
        calibration.stumps.max_y,
        calibration.bail_height
    );

    match calibration.validate() {
        Ok(()) => {
            println!("\nCalibration is valid.");
            Ok(())
        }
        Err(ModelError::ValidationError { message }) => {
            println!("\nValidation issues:");
            for problem in message.split("; ") {
                println!("  - {problem}");
            }
            anyhow::bail!("calibration is invalid")
        }
        Err(e) => Err(e.into()),
    }
}
