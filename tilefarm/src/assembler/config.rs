//! Configuration for the tile assembler.

use std::thread;
use std::time::Duration;

/// Default interval between polls for not-yet-rendered tile files.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default time to wait for any single tile file before giving up on it.
pub const DEFAULT_TILE_TIMEOUT_SECS: u64 = 120;

/// Configuration for the tile assembler.
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Interval between checks for tile files that have not appeared yet.
    pub poll_interval: Duration,

    /// How long to wait for a single tile file before marking it missing.
    ///
    /// The clock starts when collection of the tile's frame starts, not at
    /// assembler startup, so late frames in a long job get the full window.
    pub tile_timeout: Duration,

    /// Maximum number of frames assembled concurrently.
    pub max_concurrent_frames: usize,

    /// Whether a frame with missing tiles is abandoned (`true`) or composed
    /// from the tiles that did arrive (`false`).
    pub require_all_tiles: bool,

    /// Whether tile files are deleted after their frame is written.
    pub cleanup_tiles: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            tile_timeout: Duration::from_secs(DEFAULT_TILE_TIMEOUT_SECS),
            max_concurrent_frames: default_concurrency(),
            require_all_tiles: true,
            cleanup_tiles: false,
        }
    }
}

impl AssemblyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interval between polls for missing tile files.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the per-tile wait deadline.
    pub fn with_tile_timeout(mut self, timeout: Duration) -> Self {
        self.tile_timeout = timeout;
        self
    }

    /// Set the number of frames assembled concurrently (minimum 1).
    pub fn with_max_concurrent_frames(mut self, max: usize) -> Self {
        self.max_concurrent_frames = max.max(1);
        self
    }

    /// Require every tile before composing (`true`) or accept partial
    /// frames (`false`).
    pub fn with_require_all_tiles(mut self, require: bool) -> Self {
        self.require_all_tiles = require;
        self
    }

    /// Enable or disable deleting tile files once their frame is written.
    pub fn with_cleanup_tiles(mut self, cleanup: bool) -> Self {
        self.cleanup_tiles = cleanup;
        self
    }
}

/// One frame in flight per core, falling back to 4 when the core count is
/// unavailable.
fn default_concurrency() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}
