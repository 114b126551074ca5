//! Shared argument types and resolution helpers for CLI commands.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tilefarm::config::{ConfigFile, ConfigKey};
use tilefarm::frame::FrameRange;
use tilefarm::grid::TileGrid;
use tilefarm::job::{OutputFormat, RenderJobSpec};

use crate::error::CliError;

/// Output format selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    /// Portable Network Graphics (lossless, the default)
    Png,
    /// JPEG (lossy, no alpha channel)
    Jpeg,
    /// Tagged Image File Format
    Tiff,
    /// Windows bitmap
    Bmp,
    /// OpenEXR (32-bit float)
    Exr,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Jpeg => OutputFormat::Jpeg,
            FormatArg::Tiff => OutputFormat::Tiff,
            FormatArg::Bmp => OutputFormat::Bmp,
            FormatArg::Exr => OutputFormat::Exr,
        }
    }
}

/// Job geometry and naming arguments shared by plan, submit, and assemble.
#[derive(Debug, Args)]
pub struct JobArgs {
    /// Job name, also the default filename prefix
    #[arg(long)]
    pub name: String,

    /// Full frame width in pixels
    #[arg(long)]
    pub width: u32,

    /// Full frame height in pixels
    #[arg(long)]
    pub height: u32,

    /// Frame range: START, START-STOP, or START-STOPxSTEP (e.g. 1-24x2)
    #[arg(long, default_value = "1")]
    pub frames: String,

    /// Tile grid as COLSxROWS (e.g. 5x2); omit to render whole frames
    #[arg(long, value_name = "COLSxROWS")]
    pub tiles: Option<String>,

    /// Directory rendered tiles are collected from and frames written to
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Filename prefix for tiles and frames (defaults to the job name)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Output image format
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
}

/// Parse a `COLSxROWS` tile grid argument.
pub fn parse_tile_counts(s: &str) -> Result<(u32, u32), CliError> {
    let lower = s.to_lowercase();
    lower
        .split_once('x')
        .and_then(|(x, y)| {
            let num_x = x.trim().parse::<u32>().ok()?;
            let num_y = y.trim().parse::<u32>().ok()?;
            Some((num_x, num_y))
        })
        .ok_or_else(|| {
            CliError::Args(format!(
                "invalid tile grid '{}': expected COLSxROWS, e.g. 5x2",
                s
            ))
        })
}

/// Build the job spec and its tile grid from CLI arguments and config.
///
/// CLI arguments take precedence, then the config file, then library
/// defaults.
pub fn resolve_spec(
    args: &JobArgs,
    config: &ConfigFile,
) -> Result<(RenderJobSpec, TileGrid), CliError> {
    let frames: FrameRange = args
        .frames
        .parse()
        .map_err(|e| CliError::Args(format!("invalid frame range '{}': {}", args.frames, e)))?;

    let mut spec = RenderJobSpec::new(args.name.as_str(), args.width, args.height, frames);

    if let Some(ref tiles) = args.tiles {
        let (num_x, num_y) = parse_tile_counts(tiles)?;
        spec = spec.with_tiling(num_x, num_y);
    }

    let output_dir = args.output_dir.clone().or_else(|| {
        let configured = ConfigKey::OutputDirectory.get(config);
        (!configured.is_empty()).then(|| PathBuf::from(configured))
    });
    if let Some(dir) = output_dir {
        spec = spec.with_output_dir(dir);
    }

    if let Some(ref prefix) = args.prefix {
        spec = spec.with_output_prefix(prefix.as_str());
    }

    let format = args
        .format
        .map(OutputFormat::from)
        .or_else(|| OutputFormat::from_extension(&ConfigKey::OutputFormat.get(config)));
    if let Some(format) = format {
        spec = spec.with_output_format(format);
    }

    let grid = spec.plan_grid()?;
    Ok((spec, grid))
}
