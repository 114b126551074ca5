//! Frame range handling.
//!
//! A frame range names the animation frames of one render job as
//! `start`..`stop` inclusive, advanced by `step`. Ranges are written
//! `START-STOP` with an optional `xSTEP` suffix:
//!
//! - `1-100` — frames 1 through 100
//! - `1-100x10` — frames 1, 11, 21, … 91
//! - `7` — the single frame 7
//!
//! `stop` is included only when reachable from `start` by whole steps;
//! the range never overshoots. Negative frame numbers are allowed.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Inclusive, stepped frame range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FrameRange {
    start: i32,
    stop: i32,
    step: u32,
}

impl FrameRange {
    /// Creates a frame range.
    ///
    /// # Errors
    ///
    /// Returns [`FrameRangeError::ZeroStep`] when `step` is zero. A range
    /// with `start > stop` is accepted but iterates no frames.
    pub fn new(start: i32, stop: i32, step: u32) -> Result<Self, FrameRangeError> {
        if step == 0 {
            return Err(FrameRangeError::ZeroStep);
        }
        Ok(Self { start, stop, step })
    }

    /// Range covering exactly one frame.
    pub fn single(frame: i32) -> Self {
        Self {
            start: frame,
            stop: frame,
            step: 1,
        }
    }

    /// First frame of the range.
    pub fn start(&self) -> i32 {
        self.start
    }

    /// Last candidate frame of the range (included only when reachable).
    pub fn stop(&self) -> i32 {
        self.stop
    }

    /// Step between consecutive frames.
    pub fn step(&self) -> u32 {
        self.step
    }

    /// Number of frames the range yields.
    pub fn count(&self) -> usize {
        if self.start > self.stop {
            return 0;
        }
        let span = self.stop as i64 - self.start as i64;
        (span / self.step as i64 + 1) as usize
    }

    /// Whether the range yields no frames.
    pub fn is_empty(&self) -> bool {
        self.start > self.stop
    }

    /// Iterates the frames in ascending order.
    pub fn iter(&self) -> FrameIter {
        FrameIter {
            next: self.start as i64,
            stop: self.stop as i64,
            step: self.step as i64,
        }
    }
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.step == 1 {
            write!(f, "{}-{}", self.start, self.stop)
        } else {
            write!(f, "{}-{}x{}", self.start, self.stop, self.step)
        }
    }
}

impl IntoIterator for &FrameRange {
    type Item = i32;
    type IntoIter = FrameIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the frames of a [`FrameRange`].
#[derive(Debug, Clone)]
pub struct FrameIter {
    next: i64,
    stop: i64,
    step: i64,
}

impl Iterator for FrameIter {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        if self.next > self.stop {
            return None;
        }
        let frame = self.next as i32;
        self.next += self.step;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.next > self.stop {
            0
        } else {
            ((self.stop - self.next) / self.step + 1) as usize
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameIter {}

/// Error parsing or constructing a frame range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRangeError {
    /// Input doesn't match `START[-STOP[xSTEP]]`.
    InvalidFormat(String),
    /// Step must be at least 1.
    ZeroStep,
    /// A numeric component was out of range.
    InvalidNumber(String),
}

impl fmt::Display for FrameRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRangeError::InvalidFormat(s) => {
                write!(f, "invalid frame range '{}': expected START-STOP[xSTEP]", s)
            }
            FrameRangeError::ZeroStep => write!(f, "frame range step must be at least 1"),
            FrameRangeError::InvalidNumber(s) => write!(f, "invalid frame number: {}", s),
        }
    }
}

impl std::error::Error for FrameRangeError {}

/// Pattern: `START`, `START-STOP`, or `START-STOPxSTEP`.
///
/// Groups: 1 = start, 2 = stop (optional), 3 = step (optional).
fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(-?\d+)(?:-(-?\d+)(?:x(\d+))?)?$").unwrap())
}

impl FromStr for FrameRange {
    type Err = FrameRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let captures = range_pattern()
            .captures(trimmed)
            .ok_or_else(|| FrameRangeError::InvalidFormat(trimmed.to_string()))?;

        let start_str = captures.get(1).unwrap().as_str();
        let start = start_str
            .parse::<i32>()
            .map_err(|_| FrameRangeError::InvalidNumber(start_str.to_string()))?;

        let stop = match captures.get(2) {
            Some(m) => m
                .as_str()
                .parse::<i32>()
                .map_err(|_| FrameRangeError::InvalidNumber(m.as_str().to_string()))?,
            None => start,
        };

        let step = match captures.get(3) {
            Some(m) => m
                .as_str()
                .parse::<u32>()
                .map_err(|_| FrameRangeError::InvalidNumber(m.as_str().to_string()))?,
            None => 1,
        };

        FrameRange::new(start, stop, step)
    }
}
