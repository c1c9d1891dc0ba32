//! DRS-Track CLI: command-line interface for delivery analysis.
//!
//! Usage:
//!   drs analyze <FRAMES>      Track the ball and analyse a delivery
//!   drs validate <PATH>       Validate a calibration file
//!   drs init                  Write a default calibration file
//!   drs info <PATH>           Summarise an analysis report
//!   drs synth <DIR>           Render a synthetic delivery as PNG frames
//!   drs replay <PATH>         Play back a tracking file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use drs_common::config::{AppConfig, LoggingConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "drs",
    about = "Cricket ball tracking and LBW decision review",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track the ball through an image sequence and analyse the delivery
    Analyze {
        /// Directory of decoded frames (PNG/JPEG, sorted by name)
        frames: PathBuf,

        /// Calibration file (defaults to the configured calibration)
        #[arg(short, long)]
        calibration: Option<PathBuf>,

        /// Output directory for tracking.jsonl and report.json
        #[arg(short, long, default_value = "drs-output")]
        output: PathBuf,

        /// Detector backend: blob|template
        #[arg(long, default_value = "blob")]
        detector: String,

        /// Ball template image for the template detector
        #[arg(long)]
        template: Option<PathBuf>,

        /// Detection workers (defaults to the configured value)
        #[arg(long)]
        workers: Option<usize>,

        /// Detect one frame at a time using the tracker's continuity hint
        #[arg(long)]
        sequential: bool,
    },

    /// Validate a calibration file
    Validate {
        /// Path to the calibration file
        path: PathBuf,
    },

    /// Write a default calibration file
    Init {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show an analysis report
    Info {
        /// Path to report.json
        path: PathBuf,
    },

    /// Render a synthetic delivery as PNG frames
    Synth {
        /// Output directory
        dir: PathBuf,

        /// Number of frames
        #[arg(long, default_value = "60")]
        frames: u32,

        /// Frame at which the ball pitches
        #[arg(long, default_value = "36")]
        bounce_frame: u32,

        /// Frame width
        #[arg(long, default_value = "800")]
        width: u32,

        /// Frame height
        #[arg(long, default_value = "400")]
        height: u32,

        /// Frames in which the ball is hidden
        #[arg(long, value_delimiter = ',')]
        occlude: Vec<u32>,
    },

    /// Play back a tracking file at slow motion
    Replay {
        /// Path to tracking.jsonl
        path: PathBuf,

        /// Playback speed: 0.1|0.25|0.5|1|2
        #[arg(long, default_value = "0.25")]
        speed: f64,

        /// Print frames as fast as possible instead of in real time
        #[arg(long)]
        no_wait: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    drs_common::logging::init_logging(&LoggingConfig {
        level,
        ..config.logging.clone()
    });

    match cli.command {
        Commands::Analyze {
            frames,
            calibration,
            output,
            detector,
            template,
            workers,
            sequential,
        } => {
            commands::analyze::run(
                &config,
                commands::analyze::AnalyzeArgs {
                    frames,
                    calibration,
                    output,
                    detector,
                    template,
                    workers,
                    sequential,
                },
            )
            .await
        }
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Init { output, force } => commands::init::run(output, force),
        Commands::Info { path } => commands::info::run(path),
        Commands::Synth {
            dir,
            frames,
            bounce_frame,
            width,
            height,
            occlude,
        } => commands::synth::run(dir, frames, bounce_frame, width, height, occlude),
        Commands::Replay {
            path,
            speed,
            no_wait,
        } => commands::replay::run(path, speed, no_wait).await,
    }
}
