//! Write a default calibration file.

use std::path::PathBuf;

use drs_delivery_model::Calibration;

pub fn run(output: PathBuf, force: bool) -> anyhow::Result<()> {
    let path = output.join("calibration.json");
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }

    let calibration = Calibration::default();
    calibration
        .save(&path)
        .map_err(|e| anyhow::anyhow!("Failed to write calibration: {e}"))?;

    println!("Calibration written to: {}", path.display());
    println!(
        "  Side-on view, {} m/px at {} fps",
        calibration.meters_per_unit, calibration.frame_rate
    );
    println!(
        "  Stumps base at ({}, {})",
        calibration.stumps_reference.x, calibration.stumps_reference.y
    );
    println!();
    println!("Edit the stump geometry and scale to match your camera before analysing.");

    Ok(())
}
