//! Validate command - compare rendered output against a reference directory.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use tilefarm::config::ConfigFile;
use tilefarm::validate::{ComparisonOutcome, ComparisonReport, OutputValidator};

use crate::error::CliError;

/// Arguments for the validate command.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Directory of known-good reference images
    pub reference: PathBuf,

    /// Directory of images to check
    pub candidate: PathBuf,

    /// Label for the report (defaults to the candidate directory name)
    #[arg(long)]
    pub name: Option<String>,

    /// Per-channel difference still treated as equal (0-255)
    #[arg(long, value_name = "N")]
    pub channel_tolerance: Option<u8>,

    /// Similarity fraction required to pass (0.0-1.0)
    #[arg(long, value_name = "FRACTION")]
    pub min_similarity: Option<f64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the comparison report as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

/// Run the validate command.
pub fn run(args: ValidateArgs) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();

    let mut validation = config.validation_config();
    if let Some(tolerance) = args.channel_tolerance {
        validation = validation.with_channel_tolerance(tolerance);
    }
    if let Some(min) = args.min_similarity {
        validation = validation.with_min_similarity(min);
    }

    let name = args.name.clone().unwrap_or_else(|| {
        args.candidate
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "comparison".to_string())
    });

    let validator = OutputValidator::new(validation);
    let report = validator.compare_directories(&name, &args.reference, &args.candidate)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let verdict = if report.passed() {
            style("PASS").green().bold()
        } else {
            style("FAIL").red().bold()
        };
        println!("{}: {}", report.name, verdict);
        println!(
            "  {} files compared, {} failed",
            report.file_count(),
            report.failure_count()
        );
        for failure in report.failures() {
            println!("  {:<40} {}", failure.name, describe_outcome(&failure.outcome));
        }
    }

    if let Some(ref path) = args.report {
        write_report(path, &report)?;
    }

    if report.passed() {
        Ok(())
    } else {
        Err(CliError::ValidationFailed(format!(
            "{} of {} files differ from the reference",
            report.failure_count(),
            report.file_count()
        )))
    }
}

/// Write the report as pretty-printed JSON.
fn write_report(path: &Path, report: &ComparisonReport) -> Result<(), CliError> {
    let json = serde_json::to_vec_pretty(report)?;
    std::fs::write(path, json).map_err(|source| CliError::WriteReport {
        path: path.to_path_buf(),
        source,
    })
}

fn describe_outcome(outcome: &ComparisonOutcome) -> String {
    match outcome {
        ComparisonOutcome::Match { similarity } => format!("match ({:.4})", similarity),
        ComparisonOutcome::Mismatch { similarity } => format!("similarity {:.4}", similarity),
        ComparisonOutcome::DimensionMismatch {
            reference_width,
            reference_height,
            candidate_width,
            candidate_height,
        } => format!(
            "dimensions {}x{}, reference is {}x{}",
            candidate_width, candidate_height, reference_width, reference_height
        ),
        ComparisonOutcome::MissingCandidate => "missing from candidate".to_string(),
        ComparisonOutcome::MissingReference => "missing from reference".to_string(),
        ComparisonOutcome::Unreadable { detail } => format!("unreadable: {}", detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_outcome_wording() {
        let mismatch = ComparisonOutcome::Mismatch { similarity: 0.75 };
        assert_eq!(describe_outcome(&mismatch), "similarity 0.7500");

        let dims = ComparisonOutcome::DimensionMismatch {
            reference_width: 1920,
            reference_height: 1080,
            candidate_width: 960,
            candidate_height: 540,
        };
        assert!(describe_outcome(&dims).contains("960x540"));

        assert_eq!(
            describe_outcome(&ComparisonOutcome::MissingCandidate),
            "missing from candidate"
        );
    }
}
