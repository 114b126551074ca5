//! Outcomes of output-directory comparison.

use serde::Serialize;

/// How one file pair (or unpaired file) compared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ComparisonOutcome {
    /// Pixels agreed within tolerance.
    Match { similarity: f64 },

    /// Pixels disagreed beyond tolerance.
    Mismatch { similarity: f64 },

    /// Same name, different image dimensions.
    DimensionMismatch {
        reference_width: u32,
        reference_height: u32,
        candidate_width: u32,
        candidate_height: u32,
    },

    /// File exists under the reference root only.
    MissingCandidate,

    /// File exists under the candidate root only.
    MissingReference,

    /// A file could not be read or decoded.
    Unreadable { detail: String },
}

impl ComparisonOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, ComparisonOutcome::Match { .. })
    }

    /// Similarity score in `0.0..=1.0`; anything that never compared
    /// pixels scores zero.
    pub fn similarity(&self) -> f64 {
        match self {
            ComparisonOutcome::Match { similarity } => *similarity,
            ComparisonOutcome::Mismatch { similarity } => *similarity,
            _ => 0.0,
        }
    }
}

/// Comparison result for one file name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileComparison {
    /// File name shared by (or expected in) both roots.
    pub name: String,

    pub outcome: ComparisonOutcome,
}

impl FileComparison {
    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }
}

/// Full result of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// Label for the run, carried into the summary line.
    pub name: String,

    /// Per-file outcomes, sorted by file name.
    pub files: Vec<FileComparison>,
}

impl ComparisonReport {
    /// True when every compared file matched and neither side had files
    /// the other lacked.
    pub fn passed(&self) -> bool {
        self.files.iter().all(FileComparison::passed)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn failure_count(&self) -> usize {
        self.files.iter().filter(|f| !f.passed()).count()
    }

    /// Files that failed, for log output.
    pub fn failures(&self) -> impl Iterator<Item = &FileComparison> {
        self.files.iter().filter(|f| !f.passed())
    }

    /// The one-line verdict, e.g. `tile-pass: PASS`.
    pub fn summary_line(&self) -> String {
        let verdict = if self.passed() { "PASS" } else { "FAIL" };
        format!("{}: {}", self.name, verdict)
    }
}
