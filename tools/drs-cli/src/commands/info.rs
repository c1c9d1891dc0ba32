//! Show an analysis report.

use std::path::PathBuf;

use drs_delivery_model::AnalysisReport;

use super::analyze::print_outcome;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let report =
        AnalysisReport::load(&path).map_err(|e| anyhow::anyhow!("Failed to load report: {e}"))?;

    println!("Report: {}", path.display());
    println!("  Schema: {}", report.schema_version);
    match report.generated_at() {
        Some(at) => println!("  Generated: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("  Generated: {}", report.generated_at),
    }
    println!("  Detector: {}", report.detector);
    println!("  Frames processed: {}", report.frames_processed);
    println!();

    println!("Tracking:");
    println!("  Records: {}", report.tracking.len());
    let interpolated = report.tracking.iter().filter(|r| r.interpolated).count();
    println!("  Interpolated: {interpolated}");
    if let (Some(first), Some(last)) = (report.tracking.first(), report.tracking.last()) {
        println!(
            "  Frames: {}-{} ({:.2}s)",
            first.frame_index,
            last.frame_index,
            (last.timestamp_ms - first.timestamp_ms) / 1000.0
        );
    }

    print_outcome(&report.outcome);
    Ok(())
}
