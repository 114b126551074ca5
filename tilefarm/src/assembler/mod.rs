//! Reassembly of distributed tile renders into finished frames.
//!
//! Render hosts drop tile files into the job's output directory as they
//! finish. The assembler watches that directory, and for each frame in the
//! job's range collects the frame's tiles, pastes them onto a full-size
//! canvas, and writes the frame image atomically. Every frame ends in a
//! terminal state in the run's [`AssemblyReport`] — missing tiles, decode
//! failures, and cancellation are outcomes, not errors.
//!
//! ```text
//! tile files ──► collect (poll) ──► compose ──► encode ──► frame file
//!                    │                 │
//!                AssemblyProgress   Compositor
//! ```

mod compositor;
mod config;
mod frame;
mod pipeline;
mod progress;
mod report;

pub use compositor::{CompositeError, Compositor, ImageCompositor, TileSource};
pub use config::{AssemblyConfig, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TILE_TIMEOUT_SECS};
pub use pipeline::{AssemblyError, TileAssembler};
pub use progress::{AssemblyProgress, ProgressSnapshot};
pub use report::{AssemblyReport, FrameReport, FrameStatus};
