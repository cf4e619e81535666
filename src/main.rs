use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use clip_normalizer::{
    backend::FfmpegBackend,
    clip::ClipNormalizer,
    config::Config,
    table::{ClipTable, RowPlan},
};

#[derive(Parser)]
#[command(
    name = "clip-normalizer",
    version,
    about = "Cut and normalize timecoded video clips",
    long_about = "Clip-Normalizer reads a table of (video, start, end) rows, cuts each range out of the downloaded source video and re-encodes it at a fixed frame rate, square letterboxed size and audio sample rate."
)]
struct Cli {
    /// Clip table (delimited text with a header row)
    #[arg(short, long)]
    table: PathBuf,

    /// Directory containing the downloaded source videos
    #[arg(short, long, default_value = "download_video")]
    input_dir: PathBuf,

    /// Directory to write normalized clips to
    #[arg(short, long, default_value = "processed_clips")]
    output_dir: PathBuf,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output frame rate
    #[arg(long)]
    fps: Option<f64>,

    /// Side of the square output frame in pixels
    #[arg(long)]
    size: Option<u32>,

    /// Output audio sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Default)]
struct Summary {
    succeeded: usize,
    failed: usize,
    skipped: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Clip-Normalizer v{}", env!("CARGO_PKG_VERSION"));
    info!("Table: {:?}", cli.table);
    info!("Input: {:?}", cli.input_dir);
    info!("Output: {:?}", cli.output_dir);

    if !cli.table.exists() {
        bail!("Clip table not found: {:?}", cli.table);
    }
    if !cli.input_dir.is_dir() {
        bail!("Input directory not found: {:?}", cli.input_dir);
    }

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path).map_err(|e| anyhow::anyhow!(e.user_message()))?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    if cli.fps.is_some() {
        config.clip.fps = cli.fps;
    }
    if cli.size.is_some() {
        config.clip.size = cli.size;
    }
    if cli.sample_rate.is_some() {
        config.clip.sample_rate = cli.sample_rate;
    }
    config.validate().map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let targets = config.clip.targets();
    info!(
        "Targets: fps={:?} size={:?} sample_rate={:?}",
        targets.fps, targets.size, targets.sample_rate
    );

    let backend = FfmpegBackend::new(config.encoder.clone());
    if !backend.is_available() {
        bail!(
            "ffmpeg/ffprobe not found ({:?}, {:?}); install FFmpeg or set [encoder] paths",
            config.encoder.ffmpeg,
            config.encoder.ffprobe
        );
    }
    let normalizer = ClipNormalizer::new(backend);

    let table = ClipTable::from_file(&cli.table, &config.table).map_err(|e| anyhow::anyhow!(e.user_message()))?;
    info!("Loaded {} rows", table.len());

    let mut summary = Summary::default();
    let total = table.len();

    for (index, row) in table.rows().iter().enumerate() {
        let position = index + 1;

        let plan = row.as_ref().map_err(|e| e.clone()).and_then(|row| {
            row.plan(&cli.input_dir, &cli.output_dir, &config.table.input_extension, targets)
        });

        let request = match plan {
            Ok(RowPlan::Clip(request)) => request,
            Ok(RowPlan::MissingEnd { video_id }) => {
                warn!("[{}/{}] {}: no end time, skipping", position, total, video_id);
                summary.skipped += 1;
                continue;
            }
            Err(e) => {
                error!("[{}/{}] {}", position, total, e);
                summary.failed += 1;
                continue;
            }
        };

        if request.output_path.exists() {
            debug!("[{}/{}] {:?} already exists, skipping", position, total, request.output_path);
            summary.skipped += 1;
            continue;
        }

        let result = normalizer.clip(&request);
        if result.success {
            info!(
                "[{}/{}] ✓ {:?} ({} frames)",
                position, total, result.output_path, result.frames_written
            );
            summary.succeeded += 1;
        } else {
            error!(
                "[{}/{}] ✗ {:?}: {}",
                position,
                total,
                request.source_path,
                result.error_message().unwrap_or("unknown error")
            );
            summary.failed += 1;
        }
    }

    info!(
        "Done: {} succeeded, {} failed, {} skipped, {} total",
        summary.succeeded, summary.failed, summary.skipped, total
    );
    Ok(())
}
