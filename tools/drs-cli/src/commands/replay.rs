//! Replay a tracking file in slow motion.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use drs_common::clock::{PlaybackClock, PlaybackState, PLAYBACK_SPEEDS};
use drs_delivery_model::writer::read_tracking_file;
use drs_delivery_model::{trail, BallTrackingData, DEFAULT_TRAIL_LENGTH};

pub async fn run(path: PathBuf, speed: f64, no_wait: bool) -> anyhow::Result<()> {
    let (header, records) =
        read_tracking_file(&path).map_err(|e| anyhow::anyhow!("Failed to read track: {e}"))?;
    if records.is_empty() {
        println!("No tracking records in {}", path.display());
        return Ok(());
    }

    if !PLAYBACK_SPEEDS.contains(&speed) {
        tracing::warn!(speed, presets = ?PLAYBACK_SPEEDS, "Speed is not a preset");
    }

    let frame_rate = header
        .as_ref()
        .map(|h| h.frame_rate)
        .unwrap_or_else(|| estimate_frame_rate(&records));
    let mut clock = PlaybackClock::new(records.len(), frame_rate)?;
    clock.set_speed(speed)?;

    println!(
        "Replaying {} records at {}x ({:.1} ms per frame)",
        records.len(),
        speed,
        clock.interval_ns() as f64 / 1e6
    );
    print_frame(&records, 0);

    let origin = Instant::now();
    let mut simulated_ns = 0u64;
    let now_ns = |simulated: u64| {
        if no_wait {
            simulated
        } else {
            origin.elapsed().as_nanos() as u64
        }
    };

    clock.start(now_ns(simulated_ns));
    while clock.state() == PlaybackState::Playing {
        if no_wait {
            simulated_ns += clock.interval_ns();
        } else {
            tokio::time::sleep(Duration::from_nanos(clock.interval_ns())).await;
        }
        if let Some(cursor) = clock.tick(now_ns(simulated_ns)) {
            print_frame(&records, cursor);
        }
    }

    println!("Replay finished.");
    Ok(())
}

fn print_frame(records: &[BallTrackingData], index: usize) {
    let record = &records[index];
    let tail = trail(records, index, DEFAULT_TRAIL_LENGTH);
    println!(
        "  frame {:>4}  t={:>8.1}ms  ({:>7.1}, {:>7.1})  conf {:.2}{}  trail {}",
        record.frame_index,
        record.timestamp_ms,
        record.position.x,
        record.position.y,
        record.confidence,
        if record.interpolated { " *" } else { "  " },
        tail.len()
    );
}

/// Frame rate implied by record timestamps, for files without a header.
fn estimate_frame_rate(records: &[BallTrackingData]) -> f64 {
    match (records.first(), records.last()) {
        (Some(first), Some(last)) if last.frame_index > first.frame_index => {
            let span_ms = last.timestamp_ms - first.timestamp_ms;
            let frames = (last.frame_index - first.frame_index) as f64;
            if span_ms > 0.0 {
                frames * 1000.0 / span_ms
            } else {
                drs_delivery_model::Calibration::default().frame_rate
            }
        }
        _ => drs_delivery_model::Calibration::default().frame_rate,
    }
}
