//! Plan command - preview the tile grid and task list without writing anything.

use clap::Args;
use tilefarm::config::ConfigFile;
use tilefarm::job::JobUnitBuilder;

use super::common::{resolve_spec, JobArgs};
use crate::error::CliError;

/// Arguments for the plan command.
#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Print the full job as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Run the plan command.
pub fn run(args: PlanArgs) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let (spec, grid) = resolve_spec(&args.job, &config)?;
    let unit = JobUnitBuilder::new(&spec).build(&grid)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&unit)?);
        return Ok(());
    }

    println!("Job:    {}", spec.job_name());
    println!("Image:  {}x{}", spec.image_width(), spec.image_height());
    println!(
        "Frames: {} ({} frames)",
        spec.frame_range(),
        spec.frame_range().count()
    );
    if spec.tiling_enabled() {
        let (num_x, num_y) = spec.tile_counts();
        println!("Tiling: {}x{} ({} tiles per frame)", num_x, num_y, grid.len());
    } else {
        println!("Tiling: disabled (whole-frame tasks)");
    }
    println!("Output: {}", spec.output_dir().display());
    println!();

    if spec.tiling_enabled() {
        println!("Tile regions:");
        for region in grid.regions() {
            println!("  {}", region);
        }
        println!();
    }

    println!("{} tasks:", unit.task_count());
    for task in unit.tasks().iter().take(4) {
        println!("  {}", task.output_file());
    }
    if unit.task_count() > 4 {
        println!("  ... {} more", unit.task_count() - 4);
    }

    Ok(())
}
