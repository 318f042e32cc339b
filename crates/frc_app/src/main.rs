//! Command-line front end for batch frame reconstruction.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use frc_core::config::ConfigManager;
use frc_core::discovery::{self, IMAGES_DIR};
use frc_core::extraction::ffmpeg;
use frc_core::models::BatchReport;
use frc_core::orchestrator::BatchDriver;

/// Default config filename, resolved relative to the scene directory.
const CONFIG_FILE: &str = "frame-recon.toml";

#[derive(Parser)]
#[command(
    name = "frame-recon",
    version,
    about = "Per-timestamp multi-camera 3D reconstruction"
)]
struct Cli {
    /// Path to a config file (default: <scene>/frame-recon.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose per-frame logging (full engine output in log files).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct every common frame in a scene directory.
    Process {
        /// Scene directory holding camera videos and/or `images/`.
        scene_data_path: PathBuf,

        /// Decode camera videos into `images/` before reconstructing.
        #[arg(long)]
        extract_frames: bool,

        /// Disable GPU use in the GPU-capable engine stages.
        #[arg(long)]
        no_gpu: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_target(false)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Process {
            scene_data_path,
            extract_frames,
            no_gpu,
        } => process(scene_data_path, extract_frames, no_gpu, cli.config, cli.verbose),
    }
}

fn process(
    scene: PathBuf,
    extract_frames: bool,
    no_gpu: bool,
    config: Option<PathBuf>,
    verbose: bool,
) -> anyhow::Result<ExitCode> {
    if !scene.is_dir() {
        bail!("Scene directory does not exist: {}", scene.display());
    }

    let config_path = config.unwrap_or_else(|| scene.join(CONFIG_FILE));
    let mut manager = ConfigManager::new(&config_path);
    manager
        .load_or_create()
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let settings = manager.settings_mut();
    if no_gpu {
        settings.engine.use_gpu = false;
    }
    if verbose {
        settings.logging.compact = false;
    }
    let settings = settings.clone();

    // Discovery errors are the only fatal errors: nothing has run yet.
    let sources = discovery::discover_sources(&scene, extract_frames)?;
    let cameras: Vec<String> = sources.iter().map(|s| s.name.clone()).collect();

    let images_dir = scene.join(IMAGES_DIR);
    if extract_frames {
        let summary = ffmpeg::extract_all(&settings.extraction, &sources, &images_dir);
        tracing::info!("Extraction: {}", summary.summary());
        // Reconstruction needs every camera, so any camera left without
        // frames stops the run here, attributed to extraction rather
        // than to the frame-index probe that would otherwise retry the
        // same broken video.
        if !summary.all_succeeded() {
            let failed: Vec<String> = summary
                .failed
                .iter()
                .map(|(camera, err)| format!("{} ({})", camera, err))
                .collect();
            bail!("Frame extraction failed for camera(s): {}", failed.join(", "));
        }
    }

    let frame_index = discovery::build_frame_index(
        &sources,
        &images_dir,
        &settings.extraction.ffprobe_binary,
        settings.extraction.frame_count_tolerance,
    )?;

    let driver = BatchDriver::new(&scene, settings);
    let report = driver.run(&frame_index, &cameras);
    print_ledger(&report);

    Ok(exit_code_for(&report))
}

fn print_ledger(report: &BatchReport) {
    for record in &report.records {
        match &record.outcome {
            frc_core::models::FrameOutcome::Reconstructed => {
                tracing::info!("frame {:>5}  reconstructed", record.index);
            }
            frc_core::models::FrameOutcome::AlreadyComplete => {
                tracing::info!("frame {:>5}  already complete", record.index);
            }
            frc_core::models::FrameOutcome::Failed { reason } => {
                tracing::warn!("frame {:>5}  FAILED: {}", record.index, reason);
            }
        }
    }
    tracing::info!("{}", report.summary());
}

fn exit_code_for(report: &BatchReport) -> ExitCode {
    ExitCode::from(report.status().exit_code() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn broken_video_reports_extraction_failure_not_probe() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("cam0.mp4"), b"not a real video").unwrap();

        let err = process(dir.path().to_path_buf(), true, false, None, false).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("extraction failed"), "unexpected error: {}", msg);
        assert!(msg.contains("cam0"));
        assert!(!msg.contains("probe"));
    }

    #[test]
    fn process_flags_parse() {
        let cli = Cli::parse_from([
            "frame-recon",
            "process",
            "/data/scene",
            "--extract-frames",
            "--no-gpu",
        ]);
        let Commands::Process {
            scene_data_path,
            extract_frames,
            no_gpu,
        } = cli.command;
        assert_eq!(scene_data_path, PathBuf::from("/data/scene"));
        assert!(extract_frames);
        assert!(no_gpu);
    }
}
