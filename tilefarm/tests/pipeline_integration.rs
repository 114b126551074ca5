//! Integration tests for the full tiled-render round trip.
//!
//! These tests drive the pipeline end to end:
//! - job spec → task expansion → bundle dispatch, with the written
//!   manifest as the only hand-off to the simulated render hosts
//! - rendered tile files → assembly → frame images on disk
//! - assembled output → validation against a reference render
//!
//! Run with: `cargo test --test pipeline_integration`

use std::path::Path;
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use tilefarm::assembler::{AssemblyConfig, FrameStatus, TileAssembler};
use tilefarm::dispatch::{BundleDispatch, RenderDispatch, MANIFEST_FILENAME};
use tilefarm::job::{AssetReferences, JobUnitBuilder, RenderJobSpec};
use tilefarm::validate::{ComparisonOutcome, OutputValidator, ValidationConfig};

// ============================================================================
// Helper Functions
// ============================================================================

/// Deterministic full-frame pixel pattern. Frames differ in the blue
/// channel, so a tile pasted into the wrong frame shows up in validation.
fn reference_pixel(x: u32, y: u32, frame: i32) -> Rgba<u8> {
    Rgba([x as u8, y as u8, (frame as u8).wrapping_mul(40), 255])
}

/// Writes the reference render of one frame: the full pattern in a single
/// whole-frame image, the way an untiled render would produce it.
fn write_reference_frames(dir: &Path, prefix: &str, width: u32, height: u32, frames: &[i32]) {
    for &frame in frames {
        let img = RgbaImage::from_fn(width, height, |x, y| reference_pixel(x, y, frame));
        img.save_with_format(
            dir.join(format!("{prefix}_frame{frame:04}.png")),
            ImageFormat::Png,
        )
        .expect("reference frame should encode");
    }
}

/// Renders one manifest task the way a farm host would: the task's region
/// of the reference pattern, saved under the task's output file name.
///
/// The task is taken from the parsed `manifest.json`, not from in-process
/// state, so this also checks that the bundle alone carries everything a
/// renderer needs. `red_shift` simulates a misrendered tile.
fn render_manifest_task(render_dir: &Path, task: &serde_json::Value, red_shift: u8) {
    let frame = task["frame"].as_i64().expect("manifest task has a frame") as i32;
    let region = &task["region"];
    let left = region["left"].as_u64().expect("region has a left edge") as u32;
    let top = region["top"].as_u64().expect("region has a top edge") as u32;
    let width = region["width"].as_u64().expect("region has a width") as u32;
    let height = region["height"].as_u64().expect("region has a height") as u32;
    let name = task["output_file"]
        .as_str()
        .expect("manifest task has an output file");

    let tile = RgbaImage::from_fn(width, height, |x, y| {
        let Rgba([r, g, b, a]) = reference_pixel(left + x, top + y, frame);
        Rgba([r.wrapping_add(red_shift), g, b, a])
    });
    tile.save_with_format(render_dir.join(name), ImageFormat::Png)
        .expect("tile should encode");
}

fn fast_config() -> AssemblyConfig {
    AssemblyConfig::new()
        .with_poll_interval(Duration::from_millis(5))
        .with_tile_timeout(Duration::from_secs(5))
}

// ============================================================================
// Integration Tests
// ============================================================================

/// Test the complete happy path across every stage.
///
/// 1. Build a 3-frame job tiled 3×2 and dispatch it to a bundle
/// 2. "Render" every task listed in the bundle's manifest
/// 3. Assemble the tiles into frame images, deleting tiles afterwards
/// 4. Validate the assembled frames against a whole-frame reference render
#[tokio::test]
async fn test_submit_render_assemble_validate_round_trip() {
    let temp = TempDir::new().expect("temp dir");
    let render_dir = temp.path().join("renders");
    let reference_dir = temp.path().join("reference");
    std::fs::create_dir(&render_dir).unwrap();
    std::fs::create_dir(&reference_dir).unwrap();

    let spec = RenderJobSpec::new("hero", 64, 48, "1-3".parse().unwrap())
        .with_tiling(3, 2)
        .with_output_dir(&render_dir);
    let grid = spec.plan_grid().expect("3×2 over 64×48 is a valid grid");
    let unit = JobUnitBuilder::new(&spec)
        .with_asset_references(AssetReferences::new().with_input_file("/scenes/hero.vpb"))
        .build(&grid)
        .expect("job unit should build");

    // Hand off through a bundle, as a real submission would
    let dispatch = BundleDispatch::new(temp.path().join("bundles"));
    let receipt = dispatch.dispatch(&unit).expect("dispatch should succeed");
    assert!(
        receipt.job_id.starts_with("hero_"),
        "job id should carry the job name, got {}",
        receipt.job_id
    );
    let bundle_dir = receipt.location.expect("bundle dispatch reports its directory");

    // The simulated farm sees nothing but the bundle
    let manifest: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(bundle_dir.join(MANIFEST_FILENAME)).unwrap(),
    )
    .expect("manifest should parse");
    let tasks = manifest["tasks"].as_array().expect("manifest lists tasks");
    assert_eq!(tasks.len(), 3 * 6, "3 frames x 6 tiles");
    for task in tasks {
        render_manifest_task(&render_dir, task, 0);
    }

    // Collect and compose, removing tile files once frames are written
    let assembler = TileAssembler::new(fast_config().with_cleanup_tiles(true));
    let report = assembler
        .assemble(&spec, &grid, CancellationToken::new())
        .await
        .expect("assembly should start");

    assert!(report.all_complete(), "summary: {}", report.summary());
    assert_eq!(report.frame_count(), 3);
    for frame in 1..=3 {
        let path = render_dir.join(format!("hero_frame{frame:04}.png"));
        assert!(path.is_file(), "missing assembled frame {}", path.display());
    }
    let leftover_tiles = std::fs::read_dir(&render_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains("_tile"))
        .count();
    assert_eq!(leftover_tiles, 0, "cleanup should remove every tile file");

    let snapshot = assembler.progress().snapshot();
    assert_eq!(snapshot.tiles_collected, 18);
    assert_eq!(snapshot.frames_completed, 3);

    // The reassembled frames must match a whole-frame render exactly
    write_reference_frames(&reference_dir, "hero", 64, 48, &[1, 2, 3]);
    let validator = OutputValidator::new(ValidationConfig::default());
    let comparison = validator
        .compare_directories("tiled-vs-reference", &reference_dir, &render_dir)
        .expect("both directories are readable");
    assert!(comparison.passed(), "{}", comparison.summary_line());
    assert_eq!(comparison.file_count(), 3);
}

/// Test that validation catches a misrendered tile the assembler cannot.
///
/// One host renders its tile with shifted colors. The tile decodes fine
/// and has the right dimensions, so assembly completes; only the pixel
/// comparison against the reference render reveals the damage.
#[tokio::test]
async fn test_validation_catches_misrendered_tile() {
    let temp = TempDir::new().expect("temp dir");
    let render_dir = temp.path().join("renders");
    let reference_dir = temp.path().join("reference");
    std::fs::create_dir(&render_dir).unwrap();
    std::fs::create_dir(&reference_dir).unwrap();

    let spec = RenderJobSpec::new("hero", 32, 16, "1-1".parse().unwrap())
        .with_tiling(2, 1)
        .with_output_dir(&render_dir);
    let grid = spec.plan_grid().unwrap();
    let unit = JobUnitBuilder::new(&spec).build(&grid).unwrap();

    // Left tile correct, right tile 16 levels too red
    for (i, task) in unit.tasks().iter().enumerate() {
        let task_json = serde_json::to_value(task).unwrap();
        let red_shift = if i == 1 { 16 } else { 0 };
        render_manifest_task(&render_dir, &task_json, red_shift);
    }

    let assembler = TileAssembler::new(fast_config().with_cleanup_tiles(true));
    let report = assembler
        .assemble(&spec, &grid, CancellationToken::new())
        .await
        .unwrap();
    assert!(
        report.all_complete(),
        "the damaged tile still assembles: {}",
        report.summary()
    );

    write_reference_frames(&reference_dir, "hero", 32, 16, &[1]);
    let validator = OutputValidator::new(ValidationConfig::default());
    let comparison = validator
        .compare_directories("damage-check", &reference_dir, &render_dir)
        .unwrap();

    assert!(!comparison.passed(), "shifted pixels must fail validation");
    match &comparison.files[0].outcome {
        ComparisonOutcome::Mismatch { similarity } => {
            // Only the right tile's red channel is off
            assert!(
                (0.5..1.0).contains(similarity),
                "similarity {} should reflect partial damage",
                similarity
            );
        }
        other => panic!("expected a pixel mismatch, got {other:?}"),
    }
}

/// Test that cancellation keeps finished work and accounts for the rest.
///
/// Frame 1's tiles are all on disk; frame 2's never arrive. Cancelling
/// mid-run must still compose frame 1 and report frame 2 incomplete with
/// every missing tile named.
#[tokio::test]
async fn test_cancellation_preserves_collected_frames() {
    let temp = TempDir::new().expect("temp dir");
    let spec = RenderJobSpec::new("cancelshot", 16, 16, "1-2".parse().unwrap())
        .with_tiling(2, 2)
        .with_output_dir(temp.path());
    let grid = spec.plan_grid().unwrap();
    let unit = JobUnitBuilder::new(&spec).build(&grid).unwrap();

    for task in unit.tasks().iter().filter(|t| t.frame() == 1) {
        let task_json = serde_json::to_value(task).unwrap();
        render_manifest_task(temp.path(), &task_json, 0);
    }

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(80)).await;
        canceller.cancel();
    });

    let config = fast_config().with_tile_timeout(Duration::from_secs(60));
    let assembler = TileAssembler::new(config);
    let report = assembler.assemble(&spec, &grid, cancel).await.unwrap();

    assert!(report.cancelled, "the run was cancelled");

    let first = report.frame(1).expect("frame 1 is in the report");
    assert_eq!(first.status, FrameStatus::Complete);
    assert!(temp.path().join("cancelshot_frame0001.png").is_file());

    let second = report.frame(2).expect("frame 2 is in the report");
    assert_eq!(second.status, FrameStatus::Incomplete);
    assert_eq!(second.missing_tiles.len(), 4, "all four tiles never arrived");
    assert!(!temp.path().join("cancelshot_frame0002.png").exists());
}
