//! Render a synthetic delivery.

use std::path::PathBuf;

use drs_ball_detector::synthetic::SyntheticDelivery;

pub fn run(
    dir: PathBuf,
    frames: u32,
    bounce_frame: u32,
    width: u32,
    height: u32,
    occlude: Vec<u32>,
) -> anyhow::Result<()> {
    if bounce_frame >= frames {
        anyhow::bail!("bounce frame {bounce_frame} is past the last frame");
    }

    let delivery = SyntheticDelivery {
        width,
        height,
        frames,
        bounce_frame,
        occluded: occlude,
        ..SyntheticDelivery::default()
    };

    std::fs::create_dir_all(&dir)?;
    for frame in delivery.render() {
        let path = dir.join(format!("frame_{:05}.png", frame.index));
        frame
            .image
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
    }

    println!("Rendered {} frames to {}", frames, dir.display());
    println!(
        "  {}x{} @ {} fps, bounce at frame {}",
        width, height, delivery.frame_rate, bounce_frame
    );
    println!("  Analyse with: drs analyze {} --calibration calibration.json", dir.display());

    Ok(())
}
