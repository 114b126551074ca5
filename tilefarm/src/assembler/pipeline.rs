//! Orchestration of an assembly run across frames.
//!
//! [`TileAssembler`] fans one worker out per frame, bounded by a semaphore,
//! and folds every worker's outcome into a single [`AssemblyReport`]. A run
//! only returns `Err` for configuration defects; rendering problems
//! (missing tiles, undecodable files) land in the report instead.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::compositor::{Compositor, ImageCompositor};
use super::config::AssemblyConfig;
use super::frame::{abandoned_report, assemble_frame, FrameContext};
use super::progress::AssemblyProgress;
use super::report::{AssemblyReport, FrameReport, FrameStatus};
use crate::frame::FrameRange;
use crate::grid::TileGrid;
use crate::job::RenderJobSpec;

/// Collects rendered tiles into finished frame images.
///
/// # Example
///
/// ```no_run
/// use tilefarm::assembler::{AssemblyConfig, TileAssembler};
/// use tilefarm::job::RenderJobSpec;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let spec = RenderJobSpec::new("shot", 1920, 1080, "1-24".parse()?)
///     .with_tiling(5, 2)
///     .with_output_dir("/renders/shot");
/// let grid = spec.plan_grid()?;
///
/// let assembler = TileAssembler::new(AssemblyConfig::default());
/// let report = assembler.assemble(&spec, &grid, CancellationToken::new()).await?;
/// println!("{}", report.summary());
/// # Ok(())
/// # }
/// ```
pub struct TileAssembler<C = ImageCompositor> {
    config: AssemblyConfig,
    compositor: Arc<C>,
    progress: Arc<AssemblyProgress>,
}

impl TileAssembler<ImageCompositor> {
    pub fn new(config: AssemblyConfig) -> Self {
        Self::with_compositor(config, ImageCompositor::new())
    }
}

impl<C> TileAssembler<C>
where
    C: Compositor + 'static,
{
    /// Builds an assembler around a custom compositor.
    pub fn with_compositor(config: AssemblyConfig, compositor: C) -> Self {
        Self {
            config,
            compositor: Arc::new(compositor),
            progress: Arc::new(AssemblyProgress::new()),
        }
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Counters observers can poll while [`assemble`](Self::assemble) runs.
    pub fn progress(&self) -> Arc<AssemblyProgress> {
        Arc::clone(&self.progress)
    }

    /// Runs assembly for every frame in the spec's range.
    ///
    /// Waits, composes, and writes concurrently across frames, bounded by
    /// [`AssemblyConfig::max_concurrent_frames`]. Cancelling the token stops
    /// the waiting; frames already fully collected still finish, everything
    /// else lands in the report as `Incomplete`.
    ///
    /// # Errors
    ///
    /// * [`AssemblyError::GeometryMismatch`] - grid planned for other dimensions
    /// * [`AssemblyError::EmptyFrameRange`] - frame range yields no frames
    pub async fn assemble(
        &self,
        spec: &RenderJobSpec,
        grid: &TileGrid,
        cancel: CancellationToken,
    ) -> Result<AssemblyReport, AssemblyError> {
        if grid.frame_width() != spec.image_width() || grid.frame_height() != spec.image_height() {
            return Err(AssemblyError::GeometryMismatch {
                spec_width: spec.image_width(),
                spec_height: spec.image_height(),
                grid_width: grid.frame_width(),
                grid_height: grid.frame_height(),
            });
        }
        let frames: Vec<i32> = spec.frame_range().iter().collect();
        if frames.is_empty() {
            return Err(AssemblyError::EmptyFrameRange(spec.frame_range()));
        }

        let tiles_per_frame = if spec.tiling_enabled() { grid.len() } else { 1 };
        self.progress
            .set_totals(frames.len(), frames.len() * tiles_per_frame);

        let started = Instant::now();
        info!(
            job = spec.job_name(),
            frames = frames.len(),
            tiles_per_frame,
            workers = self.config.max_concurrent_frames,
            "assembly started"
        );

        let ctx = Arc::new(FrameContext {
            spec: spec.clone(),
            grid: grid.clone(),
            config: self.config.clone(),
            compositor: Arc::clone(&self.compositor),
            progress: Arc::clone(&self.progress),
            cancel: cancel.clone(),
        });
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_frames));

        let mut handles = Vec::with_capacity(frames.len());
        for &frame in &frames {
            let ctx = Arc::clone(&ctx);
            let semaphore = Arc::clone(&semaphore);
            handles.push((
                frame,
                tokio::spawn(async move {
                    // Frames cancelled before their turn are abandoned, not started
                    let permit = tokio::select! {
                        biased;

                        _ = ctx.cancel.cancelled() => None,
                        permit = semaphore.acquire_owned() => permit.ok(),
                    };
                    match permit {
                        Some(_permit) => assemble_frame(&ctx, frame).await,
                        None => abandoned_report(&ctx, frame),
                    }
                }),
            ));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (frame, handle) in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    self.progress.frame_failed();
                    reports.push(FrameReport {
                        frame,
                        status: FrameStatus::Failed,
                        output_file: None,
                        tiles_expected: tiles_per_frame,
                        tiles_found: 0,
                        missing_tiles: Vec::new(),
                        error: Some(format!("frame worker panicked: {}", e)),
                        elapsed: started.elapsed(),
                    });
                }
            }
        }

        let report = AssemblyReport {
            job_name: spec.job_name().to_string(),
            frames: reports,
            cancelled: cancel.is_cancelled(),
            elapsed: started.elapsed(),
        };
        info!(
            job = spec.job_name(),
            summary = %report.summary(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "assembly finished"
        );
        Ok(report)
    }
}

/// Configuration defects that prevent an assembly run from starting.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Grid was planned for different frame dimensions than the spec's.
    #[error(
        "grid planned for {grid_width}×{grid_height} but job renders \
         {spec_width}×{spec_height}"
    )]
    GeometryMismatch {
        spec_width: u32,
        spec_height: u32,
        grid_width: u32,
        grid_height: u32,
    },

    /// The frame range yields no frames.
    #[error("frame range {0} yields no frames")]
    EmptyFrameRange(FrameRange),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::compositor::{CompositeError, TileSource};
    use crate::job::OutputFormat;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    fn fast_config() -> AssemblyConfig {
        AssemblyConfig::new()
            .with_poll_interval(Duration::from_millis(5))
            .with_tile_timeout(Duration::from_millis(250))
            .with_max_concurrent_frames(4)
    }

    fn write_png(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 4]) {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        std::fs::write(dir.join(name), buf.into_inner()).unwrap();
    }

    /// Writes every tile of a frame as a solid PNG.
    fn write_all_tiles(dir: &Path, spec: &RenderJobSpec, frame: i32) {
        let grid = spec.plan_grid().unwrap();
        for region in grid.regions() {
            let name = format!(
                "{}_frame{:04}_tile{}_{}.png",
                spec.output_prefix(),
                frame,
                region.ix(),
                region.iy()
            );
            write_png(dir, &name, region.width(), region.height(), [50, 60, 70, 255]);
        }
    }

    fn tiled_spec(dir: &Path, frames: &str) -> RenderJobSpec {
        RenderJobSpec::new("shot", 8, 4, frames.parse().unwrap())
            .with_tiling(2, 2)
            .with_output_dir(dir)
    }

    /// Compositor that records how many tiles each call received.
    struct CountingCompositor {
        calls: Arc<Mutex<Vec<usize>>>,
    }

    impl Compositor for CountingCompositor {
        fn compose(
            &self,
            width: u32,
            height: u32,
            tiles: &[TileSource],
        ) -> Result<RgbaImage, CompositeError> {
            self.calls.lock().unwrap().push(tiles.len());
            Ok(RgbaImage::new(width, height))
        }
    }

    #[tokio::test]
    async fn test_assembles_frames_from_present_tiles() {
        let temp = TempDir::new().unwrap();
        let spec = tiled_spec(temp.path(), "1-2");
        let grid = spec.plan_grid().unwrap();
        write_all_tiles(temp.path(), &spec, 1);
        write_all_tiles(temp.path(), &spec, 2);

        let assembler = TileAssembler::new(fast_config());
        let report = assembler
            .assemble(&spec, &grid, CancellationToken::new())
            .await
            .unwrap();

        assert!(report.all_complete(), "summary: {}", report.summary());
        assert_eq!(report.frame_count(), 2);
        assert!(temp.path().join("shot_frame0001.png").is_file());
        assert!(temp.path().join("shot_frame0002.png").is_file());
        // Cleanup is off by default, tiles stay put
        assert!(temp.path().join("shot_frame0001_tile0_0.png").is_file());

        let written = image::open(temp.path().join("shot_frame0001.png"))
            .unwrap()
            .to_rgba8();
        assert_eq!(written.dimensions(), (8, 4));
        assert_eq!(written.get_pixel(0, 0), &Rgba([50, 60, 70, 255]));
        assert_eq!(written.get_pixel(7, 3), &Rgba([50, 60, 70, 255]));
    }

    #[tokio::test]
    async fn test_missing_tile_marks_frame_incomplete() {
        let temp = TempDir::new().unwrap();
        let spec = tiled_spec(temp.path(), "1-1");
        let grid = spec.plan_grid().unwrap();
        // Leave tile1_1 missing
        write_png(temp.path(), "shot_frame0001_tile0_0.png", 4, 2, [1, 1, 1, 255]);
        write_png(temp.path(), "shot_frame0001_tile1_0.png", 4, 2, [1, 1, 1, 255]);
        write_png(temp.path(), "shot_frame0001_tile0_1.png", 4, 2, [1, 1, 1, 255]);

        let assembler = TileAssembler::new(fast_config());
        let report = assembler
            .assemble(&spec, &grid, CancellationToken::new())
            .await
            .unwrap();

        let frame = report.frame(1).unwrap();
        assert_eq!(frame.status, FrameStatus::Incomplete);
        assert_eq!(frame.tiles_found, 3);
        assert_eq!(frame.missing_tiles, vec!["shot_frame0001_tile1_1.png"]);
        assert!(!temp.path().join("shot_frame0001.png").exists());
    }

    #[tokio::test]
    async fn test_partial_assembly_writes_gappy_frame() {
        let temp = TempDir::new().unwrap();
        let spec = tiled_spec(temp.path(), "1-1");
        let grid = spec.plan_grid().unwrap();
        write_png(temp.path(), "shot_frame0001_tile0_0.png", 4, 2, [200, 0, 0, 255]);

        let config = fast_config().with_require_all_tiles(false);
        let assembler = TileAssembler::new(config);
        let report = assembler
            .assemble(&spec, &grid, CancellationToken::new())
            .await
            .unwrap();

        let frame = report.frame(1).unwrap();
        assert_eq!(frame.status, FrameStatus::Incomplete);
        assert_eq!(frame.tiles_found, 1);
        assert_eq!(frame.missing_tiles.len(), 3);

        let written = image::open(temp.path().join("shot_frame0001.png"))
            .unwrap()
            .to_rgba8();
        assert_eq!(written.get_pixel(0, 0), &Rgba([200, 0, 0, 255]));
        assert_eq!(written.get_pixel(7, 3), &Rgba([0, 0, 0, 0]));
    }

    #[tokio::test]
    async fn test_tile_arriving_late_still_completes() {
        let temp = TempDir::new().unwrap();
        let spec = tiled_spec(temp.path(), "1-1");
        let grid = spec.plan_grid().unwrap();
        write_png(temp.path(), "shot_frame0001_tile0_0.png", 4, 2, [9, 9, 9, 255]);
        write_png(temp.path(), "shot_frame0001_tile1_0.png", 4, 2, [9, 9, 9, 255]);
        write_png(temp.path(), "shot_frame0001_tile0_1.png", 4, 2, [9, 9, 9, 255]);

        let dir = temp.path().to_path_buf();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            write_png(&dir, "shot_frame0001_tile1_1.png", 4, 2, [9, 9, 9, 255]);
        });

        let assembler = TileAssembler::new(fast_config().with_tile_timeout(Duration::from_secs(5)));
        let report = assembler
            .assemble(&spec, &grid, CancellationToken::new())
            .await
            .unwrap();
        writer.await.unwrap();

        assert!(report.all_complete(), "summary: {}", report.summary());
    }

    #[tokio::test]
    async fn test_zero_byte_tile_counts_as_absent() {
        let temp = TempDir::new().unwrap();
        let spec = tiled_spec(temp.path(), "1-1");
        let grid = spec.plan_grid().unwrap();
        write_png(temp.path(), "shot_frame0001_tile0_0.png", 4, 2, [1, 1, 1, 255]);
        write_png(temp.path(), "shot_frame0001_tile1_0.png", 4, 2, [1, 1, 1, 255]);
        write_png(temp.path(), "shot_frame0001_tile0_1.png", 4, 2, [1, 1, 1, 255]);
        // Renderer created the file but wrote nothing yet
        std::fs::write(temp.path().join("shot_frame0001_tile1_1.png"), b"").unwrap();

        let assembler = TileAssembler::new(fast_config());
        let report = assembler
            .assemble(&spec, &grid, CancellationToken::new())
            .await
            .unwrap();

        let frame = report.frame(1).unwrap();
        assert_eq!(frame.status, FrameStatus::Incomplete);
        assert_eq!(frame.missing_tiles, vec!["shot_frame0001_tile1_1.png"]);
    }

    #[tokio::test]
    async fn test_cancellation_abandons_waiting_frames() {
        let temp = TempDir::new().unwrap();
        let spec = tiled_spec(temp.path(), "1-4");
        let grid = spec.plan_grid().unwrap();
        // No tiles ever arrive

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            canceller.cancel();
        });

        let config = fast_config().with_tile_timeout(Duration::from_secs(60));
        let assembler = TileAssembler::new(config);
        let started = Instant::now();
        let report = assembler.assemble(&spec, &grid, cancel).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.frame_count(), 4);
        assert_eq!(report.incomplete(), 4);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cleanup_removes_tiles_after_write() {
        let temp = TempDir::new().unwrap();
        let spec = tiled_spec(temp.path(), "1-1");
        let grid = spec.plan_grid().unwrap();
        write_all_tiles(temp.path(), &spec, 1);

        let assembler = TileAssembler::new(fast_config().with_cleanup_tiles(true));
        let report = assembler
            .assemble(&spec, &grid, CancellationToken::new())
            .await
            .unwrap();

        assert!(report.all_complete());
        assert!(temp.path().join("shot_frame0001.png").is_file());
        for region in grid.regions() {
            let name = format!("shot_frame0001_tile{}_{}.png", region.ix(), region.iy());
            assert!(!temp.path().join(name).exists());
        }
    }

    #[tokio::test]
    async fn test_corrupt_tile_fails_frame() {
        let temp = TempDir::new().unwrap();
        let spec = tiled_spec(temp.path(), "1-1");
        let grid = spec.plan_grid().unwrap();
        write_png(temp.path(), "shot_frame0001_tile0_0.png", 4, 2, [1, 1, 1, 255]);
        write_png(temp.path(), "shot_frame0001_tile1_0.png", 4, 2, [1, 1, 1, 255]);
        write_png(temp.path(), "shot_frame0001_tile0_1.png", 4, 2, [1, 1, 1, 255]);
        std::fs::write(
            temp.path().join("shot_frame0001_tile1_1.png"),
            b"this is not a png",
        )
        .unwrap();

        let assembler = TileAssembler::new(fast_config());
        let report = assembler
            .assemble(&spec, &grid, CancellationToken::new())
            .await
            .unwrap();

        let frame = report.frame(1).unwrap();
        assert_eq!(frame.status, FrameStatus::Failed);
        assert!(frame.error.as_deref().unwrap().contains("failed to decode"));
        assert!(!temp.path().join("shot_frame0001.png").exists());
    }

    #[tokio::test]
    async fn test_untiled_frame_verified_without_rewrite() {
        let temp = TempDir::new().unwrap();
        let spec = RenderJobSpec::new("shot", 8, 4, "1-1".parse().unwrap())
            .with_output_dir(temp.path());
        let grid = spec.plan_grid().unwrap();
        write_png(temp.path(), "shot_frame0001.png", 8, 4, [3, 4, 5, 255]);
        let original = std::fs::read(temp.path().join("shot_frame0001.png")).unwrap();

        let assembler = TileAssembler::new(fast_config());
        let report = assembler
            .assemble(&spec, &grid, CancellationToken::new())
            .await
            .unwrap();

        assert!(report.all_complete());
        let after = std::fs::read(temp.path().join("shot_frame0001.png")).unwrap();
        assert_eq!(original, after, "frame file must not be rewritten");
    }

    #[tokio::test]
    async fn test_compositor_sees_every_tile() {
        let temp = TempDir::new().unwrap();
        let spec = tiled_spec(temp.path(), "1-2");
        let grid = spec.plan_grid().unwrap();
        write_all_tiles(temp.path(), &spec, 1);
        write_all_tiles(temp.path(), &spec, 2);

        let calls = Arc::new(Mutex::new(Vec::new()));
        let compositor = CountingCompositor {
            calls: Arc::clone(&calls),
        };
        let assembler = TileAssembler::with_compositor(fast_config(), compositor);
        let report = assembler
            .assemble(&spec, &grid, CancellationToken::new())
            .await
            .unwrap();

        assert!(report.all_complete());
        assert_eq!(*calls.lock().unwrap(), vec![4, 4]);

        let snapshot = assembler.progress().snapshot();
        assert_eq!(snapshot.tiles_collected, 8);
        assert_eq!(snapshot.frames_completed, 2);
    }

    #[tokio::test]
    async fn test_geometry_mismatch_rejected() {
        let temp = TempDir::new().unwrap();
        let spec = tiled_spec(temp.path(), "1-1");
        let foreign = crate::grid::plan_grid(100, 100, 2, 2).unwrap();

        let assembler = TileAssembler::new(fast_config());
        let err = assembler
            .assemble(&spec, &foreign, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AssemblyError::GeometryMismatch { .. }));
    }

    #[tokio::test]
    async fn test_empty_frame_range_rejected() {
        let temp = TempDir::new().unwrap();
        let spec = tiled_spec(temp.path(), "9-1");
        let grid = spec.plan_grid().unwrap();

        let assembler = TileAssembler::new(fast_config());
        let err = assembler
            .assemble(&spec, &grid, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AssemblyError::EmptyFrameRange(_)));
    }
}
