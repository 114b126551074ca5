//! Assemble command - watch for rendered tiles and stitch them into frames.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tilefarm::assembler::{AssemblyProgress, AssemblyReport, TileAssembler};
use tilefarm::config::ConfigFile;
use tokio_util::sync::CancellationToken;

use super::common::{resolve_spec, JobArgs};
use crate::error::CliError;

/// Arguments for the assemble command.
#[derive(Debug, Args)]
pub struct AssembleArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Poll interval for missing tiles, in milliseconds
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// How long to wait for each frame's tiles, in seconds
    #[arg(long, value_name = "SECS")]
    pub tile_timeout_secs: Option<u64>,

    /// Maximum number of frames assembled concurrently
    #[arg(long, value_name = "N")]
    pub max_concurrent: Option<usize>,

    /// Write a frame even when some of its tiles never arrived
    #[arg(long)]
    pub allow_partial: bool,

    /// Delete tile files after their frame is written
    #[arg(long)]
    pub cleanup: bool,

    /// Write the assembly report as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Suppress the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Run the assemble command.
pub fn run(args: AssembleArgs) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let (spec, grid) = resolve_spec(&args.job, &config)?;

    let mut assembly = config.assembly_config();
    if let Some(ms) = args.poll_interval_ms {
        assembly = assembly.with_poll_interval(Duration::from_millis(ms));
    }
    if let Some(secs) = args.tile_timeout_secs {
        assembly = assembly.with_tile_timeout(Duration::from_secs(secs));
    }
    if let Some(max) = args.max_concurrent {
        assembly = assembly.with_max_concurrent_frames(max);
    }
    if args.allow_partial {
        assembly = assembly.with_require_all_tiles(false);
    }
    if args.cleanup {
        assembly = assembly.with_cleanup_tiles(true);
    }

    // Ctrl+C stops waiting for new tiles; frames already collected still
    // get composed.
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, finishing frames already collected...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Runtime(format!("failed to set signal handler: {}", e)))?;

    let frame_count = spec.frame_range().count();
    let tile_total = frame_count * grid.len();
    println!(
        "Assembling {} frames from {}",
        frame_count,
        spec.output_dir().display()
    );
    println!(
        "  Grid:    {}x{} ({} tiles per frame)",
        grid.num_x(),
        grid.num_y(),
        grid.len()
    );
    println!(
        "  Timeout: {}s per frame, polling every {}ms",
        assembly.tile_timeout.as_secs(),
        assembly.poll_interval.as_millis()
    );
    println!();

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Runtime(format!("failed to start async runtime: {}", e)))?;

    let assembler = TileAssembler::new(assembly);
    let report = runtime.block_on(async {
        let bar = if args.no_progress {
            None
        } else {
            let bar_done = CancellationToken::new();
            let handle = tokio::spawn(drive_progress_bar(
                assembler.progress(),
                tile_total as u64,
                bar_done.clone(),
            ));
            Some((bar_done, handle))
        };

        let result = assembler.assemble(&spec, &grid, cancel.clone()).await;

        if let Some((bar_done, handle)) = bar {
            bar_done.cancel();
            let _ = handle.await;
        }
        result
    })?;

    print_report(&report);

    if let Some(ref path) = args.report {
        write_report(path, &report)?;
        println!("Report written to {}", path.display());
    }

    if report.all_complete() {
        Ok(())
    } else {
        Err(CliError::Incomplete(report.summary()))
    }
}

/// Redraw the progress bar from assembly counters until told to stop.
async fn drive_progress_bar(progress: Arc<AssemblyProgress>, total: u64, done: CancellationToken) {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} tiles  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    loop {
        let snapshot = progress.snapshot();
        bar.set_position(snapshot.tiles_collected as u64);
        bar.set_message(format!(
            "{}/{} frames",
            snapshot.frames_done(),
            snapshot.frames_total
        ));
        if done.is_cancelled() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    bar.finish_and_clear();
}

/// Print the per-frame outcome summary.
fn print_report(report: &AssemblyReport) {
    let mark = if report.all_complete() {
        style("✓").green().bold()
    } else {
        style("✗").red().bold()
    };
    println!();
    println!("{} {}", mark, report.summary());
    for frame in report.frames.iter().filter(|f| !f.is_complete()) {
        let detail = frame
            .error
            .clone()
            .unwrap_or_else(|| match frame.missing_tiles.len() {
                0 => String::new(),
                1 => format!("missing {}", frame.missing_tiles[0]),
                n => format!("missing {} tiles ({}, ...)", n, frame.missing_tiles[0]),
            });
        println!("  frame {:4}  {:<10}  {}", frame.frame, frame.status, detail);
    }
}

/// Write the report as pretty-printed JSON.
fn write_report(path: &Path, report: &AssemblyReport) -> Result<(), CliError> {
    let json = serde_json::to_vec_pretty(report)?;
    std::fs::write(path, json).map_err(|source| CliError::WriteReport {
        path: path.to_path_buf(),
        source,
    })
}
