//! Render job description.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::frame::FrameRange;
use crate::grid::{plan_grid, InvalidGridError, TileGrid, TileIndex};
use crate::naming::{frame_file_name, tile_file_name};

/// Image format of rendered tiles and assembled frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Tiff,
    Bmp,
    Exr,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Exr => "exr",
        }
    }

    /// Parses an extension (case-insensitive, `jpeg`/`tif` aliases accepted).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "tiff" | "tif" => Some(OutputFormat::Tiff),
            "bmp" => Some(OutputFormat::Bmp),
            "exr" => Some(OutputFormat::Exr),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Immutable description of one render submission.
///
/// Created once at submission time and never mutated afterwards; the job
/// builder and the tile assembler both read the same spec, so file naming
/// and geometry stay consistent across the process boundary.
///
/// When tiling is disabled the job renders whole frames and the grid is the
/// degenerate 1×1 case.
///
/// # Example
///
/// ```
/// use tilefarm::job::{OutputFormat, RenderJobSpec};
///
/// let spec = RenderJobSpec::new("hero_shot", 1920, 1080, "1-24".parse().unwrap())
///     .with_tiling(5, 2)
///     .with_output_prefix("hero")
///     .with_output_format(OutputFormat::Png);
///
/// assert!(spec.tiling_enabled());
/// assert_eq!(spec.tile_counts(), (5, 2));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderJobSpec {
    job_name: String,
    image_width: u32,
    image_height: u32,
    frame_range: FrameRange,
    tile_counts: Option<(u32, u32)>,
    output_dir: PathBuf,
    output_prefix: String,
    output_format: OutputFormat,
}

impl RenderJobSpec {
    /// Creates a spec with tiling disabled, output to the current directory,
    /// PNG output, and the job name as filename prefix.
    pub fn new(
        job_name: impl Into<String>,
        image_width: u32,
        image_height: u32,
        frame_range: FrameRange,
    ) -> Self {
        let job_name = job_name.into();
        let output_prefix = job_name.clone();
        Self {
            job_name,
            image_width,
            image_height,
            frame_range,
            tile_counts: None,
            output_dir: PathBuf::from("."),
            output_prefix,
            output_format: OutputFormat::Png,
        }
    }

    /// Enables tiling with the given column and row counts.
    pub fn with_tiling(mut self, num_x: u32, num_y: u32) -> Self {
        self.tile_counts = Some((num_x, num_y));
        self
    }

    /// Disables tiling (whole-frame tasks).
    pub fn without_tiling(mut self) -> Self {
        self.tile_counts = None;
        self
    }

    /// Sets the directory tile and frame files live in.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the output filename prefix.
    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    /// Sets the output image format.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn image_width(&self) -> u32 {
        self.image_width
    }

    pub fn image_height(&self) -> u32 {
        self.image_height
    }

    pub fn frame_range(&self) -> FrameRange {
        self.frame_range
    }

    pub fn tiling_enabled(&self) -> bool {
        self.tile_counts.is_some()
    }

    /// Tile grid shape; `(1, 1)` when tiling is disabled.
    pub fn tile_counts(&self) -> (u32, u32) {
        self.tile_counts.unwrap_or((1, 1))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn output_prefix(&self) -> &str {
        &self.output_prefix
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Plans the tile grid for this spec.
    ///
    /// Both the job builder and the assembler must consume a grid planned
    /// from the spec they were given; this is the one partitioning entry
    /// point for a spec.
    pub fn plan_grid(&self) -> Result<TileGrid, InvalidGridError> {
        let (num_x, num_y) = self.tile_counts();
        plan_grid(self.image_width, self.image_height, num_x, num_y)
    }

    /// Path of one rendered tile image for this job.
    pub fn tile_path(&self, frame: i32, tile: TileIndex) -> PathBuf {
        self.output_dir.join(tile_file_name(
            &self.output_prefix,
            frame,
            tile.ix,
            tile.iy,
            self.output_format.extension(),
        ))
    }

    /// Path of one assembled (or non-tiled) frame image for this job.
    pub fn frame_path(&self, frame: i32) -> PathBuf {
        self.output_dir.join(frame_file_name(
            &self.output_prefix,
            frame,
            self.output_format.extension(),
        ))
    }
}
