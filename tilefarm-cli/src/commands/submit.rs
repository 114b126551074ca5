//! Submit command - build a job bundle for the render farm.

use std::path::PathBuf;

use clap::Args;
use tilefarm::config::{ConfigFile, ConfigKey};
use tilefarm::dispatch::{BundleDispatch, RenderDispatch};
use tilefarm::job::{AssetReferences, JobUnitBuilder};

use super::common::{resolve_spec, JobArgs};
use crate::error::CliError;

/// Arguments for the submit command.
#[derive(Debug, Args)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Scene or other input file the renderer needs (repeatable)
    #[arg(long = "input", value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Directory of auxiliary inputs such as textures (repeatable)
    #[arg(long = "input-dir", value_name = "DIR")]
    pub input_dirs: Vec<PathBuf>,

    /// Directory job bundles are written to
    #[arg(long, value_name = "DIR")]
    pub bundle_dir: Option<PathBuf>,
}

/// Run the submit command.
pub fn run(args: SubmitArgs) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let (spec, grid) = resolve_spec(&args.job, &config)?;

    let mut references = AssetReferences::new();
    for input in &args.inputs {
        references = references.with_input_file(input);
    }
    for dir in &args.input_dirs {
        references = references.with_input_directory(dir);
    }
    references = references.with_output_directory(spec.output_dir());

    let unit = JobUnitBuilder::new(&spec)
        .with_asset_references(references)
        .build(&grid)?;

    let bundle_dir = resolve_bundle_dir(args.bundle_dir, &config);
    let dispatch = BundleDispatch::new(bundle_dir);
    let receipt = dispatch.dispatch(&unit)?;

    println!("Submitted {} ({} tasks)", receipt.job_id, unit.task_count());
    if let Some(location) = receipt.location {
        println!("Bundle:   {}", location.display());
    }
    Ok(())
}

/// Bundle directory: CLI flag, then config, then a per-user default.
fn resolve_bundle_dir(cli: Option<PathBuf>, config: &ConfigFile) -> PathBuf {
    if let Some(dir) = cli {
        return dir;
    }
    let configured = ConfigKey::DispatchBundleDir.get(config);
    if !configured.is_empty() {
        return PathBuf::from(configured);
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilefarm")
        .join("bundles")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_dir_precedence() {
        let mut config = ConfigFile::default();
        config.set("dispatch", "bundle_dir", "/configured");

        let cli = Some(PathBuf::from("/from-flag"));
        assert_eq!(
            resolve_bundle_dir(cli, &config),
            PathBuf::from("/from-flag")
        );
        assert_eq!(
            resolve_bundle_dir(None, &config),
            PathBuf::from("/configured")
        );
    }

    #[test]
    fn test_bundle_dir_default_under_cache() {
        let dir = resolve_bundle_dir(None, &ConfigFile::default());
        assert!(dir.ends_with("tilefarm/bundles"));
    }
}
