//! Per-frame and per-job assembly outcomes.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Lifecycle of one frame inside the assembler.
///
/// Frames move `Pending` → `Collecting` → one of the terminal states. Every
/// frame the job names ends in exactly one terminal state, including frames
/// abandoned by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FrameStatus {
    /// Not yet picked up by a worker.
    Pending,

    /// A worker is waiting for this frame's tile files.
    Collecting,

    /// Frame image written from the full tile set.
    Complete,

    /// Gave up with tiles still missing (timeout or cancellation).
    Incomplete,

    /// Tiles arrived but decoding, composing, or writing failed.
    Failed,
}

impl FrameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, FrameStatus::Pending | FrameStatus::Collecting)
    }

    pub fn is_complete(self) -> bool {
        self == FrameStatus::Complete
    }
}

impl fmt::Display for FrameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FrameStatus::Pending => "pending",
            FrameStatus::Collecting => "collecting",
            FrameStatus::Complete => "complete",
            FrameStatus::Incomplete => "incomplete",
            FrameStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Outcome of assembling one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    /// Frame number.
    pub frame: i32,

    /// Terminal status the frame reached.
    pub status: FrameStatus,

    /// Path of the written frame image, when one was produced.
    pub output_file: Option<PathBuf>,

    /// Tiles the grid called for.
    pub tiles_expected: usize,

    /// Tiles that actually arrived and decoded.
    pub tiles_found: usize,

    /// File names of tiles that never arrived.
    pub missing_tiles: Vec<String>,

    /// Compose or write failure, when the status is `Failed`.
    pub error: Option<String>,

    /// Wall-clock time from pickup to terminal state.
    pub elapsed: Duration,
}

impl FrameReport {
    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }
}

/// Outcome of one assembler run over a whole job.
///
/// Holds one [`FrameReport`] per frame in the job's range, in range order,
/// so callers can account for every frame without cross-checking the spec.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssemblyReport {
    /// Job the run belonged to.
    pub job_name: String,

    /// Per-frame outcomes, in frame range order.
    pub frames: Vec<FrameReport>,

    /// Whether the run was interrupted by cancellation.
    pub cancelled: bool,

    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
}

impl AssemblyReport {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn completed(&self) -> usize {
        self.count(FrameStatus::Complete)
    }

    pub fn incomplete(&self) -> usize {
        self.count(FrameStatus::Incomplete)
    }

    pub fn failed(&self) -> usize {
        self.count(FrameStatus::Failed)
    }

    /// True when every frame reached `Complete`.
    pub fn all_complete(&self) -> bool {
        self.frames.iter().all(|f| f.is_complete())
    }

    /// The report for a specific frame, if the job covered it.
    pub fn frame(&self, frame: i32) -> Option<&FrameReport> {
        self.frames.iter().find(|f| f.frame == frame)
    }

    /// One-line human summary, e.g. `24 frames: 23 complete, 1 incomplete`.
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} complete", self.completed())];
        if self.incomplete() > 0 {
            parts.push(format!("{} incomplete", self.incomplete()));
        }
        if self.failed() > 0 {
            parts.push(format!("{} failed", self.failed()));
        }
        let mut line = format!("{} frames: {}", self.frame_count(), parts.join(", "));
        if self.cancelled {
            line.push_str(" (cancelled)");
        }
        line
    }

    fn count(&self, status: FrameStatus) -> usize {
        self.frames.iter().filter(|f| f.status == status).count()
    }
}
