//! Live progress counters for an assembler run.
//!
//! Frame workers bump lock-free atomic counters; observers (CLI progress
//! bars, log ticks) take point-in-time [`ProgressSnapshot`]s. Counters only
//! ever increase during a run.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared counters updated by frame workers as tiles arrive and frames
/// finish.
#[derive(Debug, Default)]
pub struct AssemblyProgress {
    frames_total: AtomicUsize,
    tiles_total: AtomicUsize,
    frames_completed: AtomicUsize,
    frames_incomplete: AtomicUsize,
    frames_failed: AtomicUsize,
    tiles_collected: AtomicUsize,
}

impl AssemblyProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the run's workload before workers start.
    pub(crate) fn set_totals(&self, frames: usize, tiles: usize) {
        self.frames_total.store(frames, Ordering::Relaxed);
        self.tiles_total.store(tiles, Ordering::Relaxed);
    }

    pub(crate) fn tile_collected(&self) {
        self.tiles_collected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_completed(&self) {
        self.frames_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_incomplete(&self) {
        self.frames_incomplete.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_failed(&self) {
        self.frames_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            frames_total: self.frames_total.load(Ordering::Relaxed),
            tiles_total: self.tiles_total.load(Ordering::Relaxed),
            frames_completed: self.frames_completed.load(Ordering::Relaxed),
            frames_incomplete: self.frames_incomplete.load(Ordering::Relaxed),
            frames_failed: self.frames_failed.load(Ordering::Relaxed),
            tiles_collected: self.tiles_collected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of an assembler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub frames_total: usize,
    pub tiles_total: usize,
    pub frames_completed: usize,
    pub frames_incomplete: usize,
    pub frames_failed: usize,
    pub tiles_collected: usize,
}

impl ProgressSnapshot {
    /// Frames that reached any terminal state.
    pub fn frames_done(&self) -> usize {
        self.frames_completed + self.frames_incomplete + self.frames_failed
    }

    /// Completion fraction in `0.0..=1.0`, by finished frames.
    pub fn fraction(&self) -> f64 {
        if self.frames_total == 0 {
            return 1.0;
        }
        self.frames_done() as f64 / self.frames_total as f64
    }
}
