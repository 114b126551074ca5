//! Validation of assembled output against reference renders.
//!
//! Answers one question: did tiled rendering plus reassembly produce the
//! same image a whole-frame render would have? [`OutputValidator`] pairs
//! files by name across two directories and scores each pair by the
//! fraction of channel samples within tolerance, so a verdict survives the
//! small value shifts lossy codecs introduce.

mod compare;
mod report;

pub use compare::{
    OutputValidator, ValidateError, ValidationConfig, DEFAULT_CHANNEL_TOLERANCE,
    DEFAULT_MIN_SIMILARITY,
};
pub use report::{ComparisonOutcome, ComparisonReport, FileComparison};
