//! Pixel comparison of two render output directories.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::report::{ComparisonOutcome, ComparisonReport, FileComparison};
use crate::job::OutputFormat;

/// Default per-channel difference still counted as equal.
///
/// Codec round-trips shift 8-bit values by a unit or two; bit-exact
/// comparison would fail renders that are visually identical.
pub const DEFAULT_CHANNEL_TOLERANCE: u8 = 2;

/// Default fraction of in-tolerance samples required to pass.
pub const DEFAULT_MIN_SIMILARITY: f64 = 1.0;

/// Configuration for output validation.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Per-channel absolute difference treated as equal.
    pub channel_tolerance: u8,

    /// Fraction of samples that must be within tolerance for a file to
    /// pass, in `0.0..=1.0`.
    pub min_similarity: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            channel_tolerance: DEFAULT_CHANNEL_TOLERANCE,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }
}

impl ValidationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-channel tolerance.
    pub fn with_channel_tolerance(mut self, tolerance: u8) -> Self {
        self.channel_tolerance = tolerance;
        self
    }

    /// Set the passing similarity fraction (clamped to `0.0..=1.0`).
    pub fn with_min_similarity(mut self, similarity: f64) -> Self {
        self.min_similarity = similarity.clamp(0.0, 1.0);
        self
    }
}

/// Compares a directory of assembled output against a reference render.
///
/// Used after tiled runs to confirm that distributed render + reassembly
/// produced the same pixels a single whole-frame render would have.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use tilefarm::validate::{OutputValidator, ValidationConfig};
///
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let validator = OutputValidator::new(ValidationConfig::default());
/// let report = validator.compare_directories(
///     "tiled-vs-reference",
///     Path::new("/renders/reference"),
///     Path::new("/renders/tiled"),
/// )?;
/// println!("{}", report.summary_line());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct OutputValidator {
    config: ValidationConfig,
}

impl OutputValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Compares every image file under `reference` against its same-named
    /// counterpart under `candidate`.
    ///
    /// Pairing is by file name. Files present on only one side are
    /// reported as missing on the other; a file missing in either
    /// direction fails the run. Non-image files are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ValidateError::ReadDir`] when either directory cannot be
    /// listed. Unreadable individual files are per-file outcomes, not
    /// errors.
    pub fn compare_directories(
        &self,
        name: &str,
        reference: &Path,
        candidate: &Path,
    ) -> Result<ComparisonReport, ValidateError> {
        let reference_files = list_images(reference)?;
        let candidate_files = list_images(candidate)?;

        let mut files = Vec::with_capacity(reference_files.len());
        for (file_name, reference_path) in &reference_files {
            let outcome = match candidate_files.get(file_name) {
                Some(candidate_path) => {
                    self.compare_pair(file_name, reference_path, candidate_path)
                }
                None => ComparisonOutcome::MissingCandidate,
            };
            files.push(FileComparison {
                name: file_name.clone(),
                outcome,
            });
        }
        for file_name in candidate_files.keys() {
            if !reference_files.contains_key(file_name) {
                files.push(FileComparison {
                    name: file_name.clone(),
                    outcome: ComparisonOutcome::MissingReference,
                });
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));

        let report = ComparisonReport {
            name: name.to_string(),
            files,
        };
        info!(
            run = name,
            files = report.file_count(),
            failures = report.failure_count(),
            passed = report.passed(),
            "comparison finished"
        );
        Ok(report)
    }

    fn compare_pair(&self, name: &str, reference: &Path, candidate: &Path) -> ComparisonOutcome {
        let reference_img = match image::open(reference) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                return ComparisonOutcome::Unreadable {
                    detail: format!("{}: {}", reference.display(), e),
                }
            }
        };
        let candidate_img = match image::open(candidate) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                return ComparisonOutcome::Unreadable {
                    detail: format!("{}: {}", candidate.display(), e),
                }
            }
        };

        if reference_img.dimensions() != candidate_img.dimensions() {
            debug!(
                file = name,
                reference = ?reference_img.dimensions(),
                candidate = ?candidate_img.dimensions(),
                "image dimensions differ"
            );
            return ComparisonOutcome::DimensionMismatch {
                reference_width: reference_img.width(),
                reference_height: reference_img.height(),
                candidate_width: candidate_img.width(),
                candidate_height: candidate_img.height(),
            };
        }

        let tolerance = self.config.channel_tolerance;
        let mut within = 0usize;
        let mut max_delta = 0u8;
        for (&a, &b) in reference_img.as_raw().iter().zip(candidate_img.as_raw()) {
            let delta = a.abs_diff(b);
            if delta <= tolerance {
                within += 1;
            }
            if delta > max_delta {
                max_delta = delta;
            }
        }

        let total = reference_img.as_raw().len();
        let similarity = if total == 0 {
            1.0
        } else {
            within as f64 / total as f64
        };

        if similarity >= self.config.min_similarity {
            ComparisonOutcome::Match { similarity }
        } else {
            debug!(
                file = name,
                similarity,
                max_delta,
                tolerance,
                "pixels differ beyond tolerance"
            );
            ComparisonOutcome::Mismatch { similarity }
        }
    }
}

/// Image files in a directory, keyed by file name.
fn list_images(dir: &Path) -> Result<BTreeMap<String, PathBuf>, ValidateError> {
    let read_dir = fs::read_dir(dir).map_err(|source| ValidateError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = BTreeMap::new();
    for entry in read_dir {
        let entry = entry.map_err(|source| ValidateError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if OutputFormat::from_extension(extension).is_none() {
            continue;
        }
        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            files.insert(file_name.to_string(), path);
        }
    }
    Ok(files)
}

/// Errors from output validation.
#[derive(Debug)]
pub enum ValidateError {
    /// A comparison root could not be listed.
    ReadDir { path: PathBuf, source: io::Error },
}

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidateError::ReadDir { path, .. } => {
                write!(f, "failed to list directory {}", path.display())
            }
        }
    }
}

impl std::error::Error for ValidateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidateError::ReadDir { source, .. } => Some(source),
        }
    }
}
