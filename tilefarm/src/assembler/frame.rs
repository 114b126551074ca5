//! Per-frame collection and composition.
//!
//! One worker handles one frame: poll the output directory until the
//! frame's tile files are all present, compose them, and write the frame
//! image atomically. Workers never fail the whole run; whatever happens is
//! folded into the frame's [`FrameReport`].

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::compositor::{encode_frame, Compositor, TileSource};
use super::config::AssemblyConfig;
use super::progress::AssemblyProgress;
use super::report::{FrameReport, FrameStatus};
use crate::grid::{TileGrid, TileRegion};
use crate::job::RenderJobSpec;
use crate::naming::{frame_file_name, tile_file_name};

/// Everything a frame worker needs, shared across all workers of one run.
pub(crate) struct FrameContext<C> {
    pub spec: RenderJobSpec,
    pub grid: TileGrid,
    pub config: AssemblyConfig,
    pub compositor: Arc<C>,
    pub progress: Arc<AssemblyProgress>,
    pub cancel: CancellationToken,
}

/// File names (with regions) this frame's renderers will produce.
pub(crate) fn expected_tiles(spec: &RenderJobSpec, grid: &TileGrid, frame: i32) -> Vec<(String, TileRegion)> {
    let extension = spec.output_format().extension();
    grid.regions()
        .iter()
        .map(|region| {
            let name = tile_file_name(
                spec.output_prefix(),
                frame,
                region.ix(),
                region.iy(),
                extension,
            );
            (name, *region)
        })
        .collect()
}

/// Report for a frame abandoned before its worker ever ran.
pub(crate) fn abandoned_report<C>(ctx: &FrameContext<C>, frame: i32) -> FrameReport {
    let missing = if ctx.spec.tiling_enabled() {
        expected_tiles(&ctx.spec, &ctx.grid, frame)
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    } else {
        vec![frame_file_name(
            ctx.spec.output_prefix(),
            frame,
            ctx.spec.output_format().extension(),
        )]
    };
    let expected = missing.len();
    ctx.progress.frame_incomplete();
    FrameReport {
        frame,
        status: FrameStatus::Incomplete,
        output_file: None,
        tiles_expected: expected,
        tiles_found: 0,
        missing_tiles: missing,
        error: None,
        elapsed: std::time::Duration::ZERO,
    }
}

/// Assembles one frame to a terminal state.
pub(crate) async fn assemble_frame<C>(ctx: &FrameContext<C>, frame: i32) -> FrameReport
where
    C: Compositor + 'static,
{
    let started = Instant::now();
    let report = if ctx.spec.tiling_enabled() {
        assemble_tiled(ctx, frame, started).await
    } else {
        verify_untiled(ctx, frame, started).await
    };

    match report.status {
        FrameStatus::Complete => {
            ctx.progress.frame_completed();
            debug!(
                frame,
                tiles = report.tiles_found,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "frame complete"
            );
        }
        FrameStatus::Incomplete => {
            ctx.progress.frame_incomplete();
            warn!(
                frame,
                found = report.tiles_found,
                expected = report.tiles_expected,
                missing = ?report.missing_tiles,
                "frame incomplete"
            );
        }
        FrameStatus::Failed => {
            ctx.progress.frame_failed();
            warn!(frame, error = ?report.error, "frame failed");
        }
        _ => {}
    }

    report
}

/// Waits for every tile of a tiled frame, composes them, and writes the
/// frame image.
async fn assemble_tiled<C>(ctx: &FrameContext<C>, frame: i32, started: Instant) -> FrameReport
where
    C: Compositor + 'static,
{
    let mut pending = expected_tiles(&ctx.spec, &ctx.grid, frame);
    let tiles_expected = pending.len();
    let mut collected: Vec<TileSource> = Vec::with_capacity(tiles_expected);

    loop {
        let mut still_pending = Vec::new();
        for (name, region) in pending.drain(..) {
            match read_if_present(ctx, &name).await {
                Some(bytes) => {
                    ctx.progress.tile_collected();
                    collected.push(TileSource::new(name, region, bytes));
                }
                None => still_pending.push((name, region)),
            }
        }
        pending = still_pending;

        if pending.is_empty() {
            break;
        }
        if ctx.cancel.is_cancelled() {
            debug!(frame, waiting = pending.len(), "frame collection cancelled");
            break;
        }
        if started.elapsed() >= ctx.config.tile_timeout {
            break;
        }

        tokio::select! {
            biased;

            _ = ctx.cancel.cancelled() => {}
            _ = tokio::time::sleep(ctx.config.poll_interval) => {}
        }
    }

    let missing: Vec<String> = pending.into_iter().map(|(name, _)| name).collect();
    let tiles_found = collected.len();

    if !missing.is_empty() && ctx.config.require_all_tiles {
        return FrameReport {
            frame,
            status: FrameStatus::Incomplete,
            output_file: None,
            tiles_expected,
            tiles_found,
            missing_tiles: missing,
            error: None,
            elapsed: started.elapsed(),
        };
    }

    let collected_names: Vec<String> = collected.iter().map(|t| t.name.clone()).collect();

    // Pixel work stays off the async runtime
    let width = ctx.spec.image_width();
    let height = ctx.spec.image_height();
    let format = ctx.spec.output_format();
    let compositor = Arc::clone(&ctx.compositor);
    let composed = tokio::task::spawn_blocking(move || {
        let canvas = compositor.compose(width, height, &collected)?;
        encode_frame(&canvas, format)
    })
    .await;

    let encoded = match composed {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            return FrameReport {
                frame,
                status: FrameStatus::Failed,
                output_file: None,
                tiles_expected,
                tiles_found,
                missing_tiles: missing,
                error: Some(e.to_string()),
                elapsed: started.elapsed(),
            }
        }
        Err(e) => {
            return FrameReport {
                frame,
                status: FrameStatus::Failed,
                output_file: None,
                tiles_expected,
                tiles_found,
                missing_tiles: missing,
                error: Some(format!("compose task panicked: {}", e)),
                elapsed: started.elapsed(),
            }
        }
    };

    let output = ctx.spec.frame_path(frame);
    if let Err(e) = write_atomic(&output, &encoded).await {
        return FrameReport {
            frame,
            status: FrameStatus::Failed,
            output_file: None,
            tiles_expected,
            tiles_found,
            missing_tiles: missing,
            error: Some(e),
            elapsed: started.elapsed(),
        };
    }

    if ctx.config.cleanup_tiles {
        remove_tiles(ctx, &collected_names).await;
    }

    let status = if missing.is_empty() {
        FrameStatus::Complete
    } else {
        // Partial frame was still written; the gaps stay blank
        FrameStatus::Incomplete
    };
    FrameReport {
        frame,
        status,
        output_file: Some(output),
        tiles_expected,
        tiles_found,
        missing_tiles: missing,
        error: None,
        elapsed: started.elapsed(),
    }
}

/// For untiled jobs the renderer writes the frame file itself; the worker
/// only waits for it and confirms it decodes. Rewriting it here would race
/// the renderer against its own output.
async fn verify_untiled<C>(ctx: &FrameContext<C>, frame: i32, started: Instant) -> FrameReport {
    let name = frame_file_name(
        ctx.spec.output_prefix(),
        frame,
        ctx.spec.output_format().extension(),
    );
    let path = ctx.spec.output_dir().join(&name);

    let bytes = loop {
        if let Some(bytes) = read_if_present(ctx, &name).await {
            break bytes;
        }
        if ctx.cancel.is_cancelled() || started.elapsed() >= ctx.config.tile_timeout {
            return FrameReport {
                frame,
                status: FrameStatus::Incomplete,
                output_file: None,
                tiles_expected: 1,
                tiles_found: 0,
                missing_tiles: vec![name],
                error: None,
                elapsed: started.elapsed(),
            };
        }

        tokio::select! {
            biased;

            _ = ctx.cancel.cancelled() => {}
            _ = tokio::time::sleep(ctx.config.poll_interval) => {}
        }
    };
    ctx.progress.tile_collected();

    let decode = tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes).map(|_| ())
    })
    .await;

    match decode {
        Ok(Ok(())) => FrameReport {
            frame,
            status: FrameStatus::Complete,
            output_file: Some(path),
            tiles_expected: 1,
            tiles_found: 1,
            missing_tiles: Vec::new(),
            error: None,
            elapsed: started.elapsed(),
        },
        Ok(Err(e)) => FrameReport {
            frame,
            status: FrameStatus::Failed,
            output_file: None,
            tiles_expected: 1,
            tiles_found: 1,
            missing_tiles: Vec::new(),
            error: Some(format!("frame file failed to decode: {}", e)),
            elapsed: started.elapsed(),
        },
        Err(e) => FrameReport {
            frame,
            status: FrameStatus::Failed,
            output_file: None,
            tiles_expected: 1,
            tiles_found: 1,
            missing_tiles: Vec::new(),
            error: Some(format!("decode task panicked: {}", e)),
            elapsed: started.elapsed(),
        },
    }
}

/// Reads a file from the output directory if it exists with content.
///
/// Renderers create files before filling them, so zero-byte files count as
/// not yet present. Read errors are treated the same way and retried on
/// the next poll.
async fn read_if_present<C>(ctx: &FrameContext<C>, name: &str) -> Option<Bytes> {
    let path = ctx.spec.output_dir().join(name);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.len() > 0 => match tokio::fs::read(&path).await {
            Ok(data) => Some(Bytes::from(data)),
            Err(e) => {
                debug!(file = %path.display(), error = %e, "tile read failed, will retry");
                None
            }
        },
        _ => None,
    }
}

/// Writes via a temporary sibling then renames, so consumers watching the
/// directory never observe a half-written frame.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), String> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, data)
        .await
        .map_err(|e| format!("failed to write {}: {}", tmp.display(), e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| format!("failed to rename {} to {}: {}", tmp.display(), path.display(), e))
}

async fn remove_tiles<C>(ctx: &FrameContext<C>, names: &[String]) {
    for name in names {
        let path = ctx.spec.output_dir().join(name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(file = %path.display(), error = %e, "failed to remove tile file");
        }
    }
}
