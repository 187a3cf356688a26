//! Voxscan Application
//!
//! Command-line front end for the depth scanning engine.
//!
//! Features:
//! - Replay a recorded depth session or a synthetic camera through a scan
//! - Export the fused point cloud (PLY) and voxel surface mesh (OBJ)
//! - Inspect exported files

mod app;

use app::{FrameSource, LoggingConfig, ScanOptions};
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Voxscan - Depth Camera Scanning and Reconstruction
#[derive(Parser, Debug)]
#[command(name = "voxscan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Stream spans to Tracy (requires the `tracy` feature)
    #[arg(long, global = true)]
    tracy: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scan and export the result
    Scan(ScanArgs),
    /// Print point count and bounds of an exported .ply or .obj
    Inspect {
        /// File to load
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["recording", "synthetic"])))]
struct ScanArgs {
    /// Recording directory containing manifest.json
    #[arg(long)]
    recording: Option<PathBuf>,

    /// Use the synthetic camera for this many frames
    #[arg(long)]
    synthetic: Option<usize>,

    /// Scan config (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the point cloud here
    #[arg(long)]
    ply: Option<PathBuf>,

    /// Write the voxel surface mesh here
    #[arg(long)]
    obj: Option<PathBuf>,
}

impl ScanArgs {
    fn into_options(self) -> ScanOptions {
        let source = match (self.recording, self.synthetic) {
            (Some(dir), _) => FrameSource::Recording(dir),
            (None, Some(frames)) => FrameSource::Synthetic(frames),
            // clap enforces exactly one source
            (None, None) => FrameSource::Synthetic(0),
        };
        ScanOptions {
            source,
            config: self.config,
            ply: self.ply,
            obj: self.obj,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    LoggingConfig {
        level: cli.log_level,
        enable_tracy: cli.tracy,
    }
    .init();

    let outcome = match cli.command {
        Command::Scan(args) => app::run_scan(&args.into_options()).map(|_| ()),
        Command::Inspect { file } => app::run_inspect(&file).map(|_| ()),
    };

    if let Err(e) = outcome {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}
