//! Tile grid types.

use std::fmt;

use serde::Serialize;

/// Position of one tile within its grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileIndex {
    /// Column index (0-based, increases rightward)
    pub ix: u32,
    /// Row index (0-based, increases downward)
    pub iy: u32,
}

impl TileIndex {
    pub fn new(ix: u32, iy: u32) -> Self {
        Self { ix, iy }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile{}_{}", self.ix, self.iy)
    }
}

/// One rectangular cell of a tile grid.
///
/// Carries both the grid position (`ix`, `iy`) and the pixel bounding box
/// (`left`, `top`, `width`, `height`) in the full frame's coordinate space.
/// Regions are only created by [`plan_grid`](crate::grid::plan_grid), which
/// guarantees that the regions of one grid exactly cover the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TileRegion {
    /// Column index (0-based, increases rightward)
    ix: u32,
    /// Row index (0-based, increases downward)
    iy: u32,
    /// Left edge in frame pixels
    left: u32,
    /// Top edge in frame pixels
    top: u32,
    /// Region width in pixels
    width: u32,
    /// Region height in pixels
    height: u32,
}

impl TileRegion {
    pub(crate) fn new(ix: u32, iy: u32, left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            ix,
            iy,
            left,
            top,
            width,
            height,
        }
    }

    /// Column index within the grid.
    pub fn ix(&self) -> u32 {
        self.ix
    }

    /// Row index within the grid.
    pub fn iy(&self) -> u32 {
        self.iy
    }

    /// Grid position as a [`TileIndex`].
    pub fn index(&self) -> TileIndex {
        TileIndex::new(self.ix, self.iy)
    }

    /// Left edge in frame pixels (inclusive).
    pub fn left(&self) -> u32 {
        self.left
    }

    /// Top edge in frame pixels (inclusive).
    pub fn top(&self) -> u32 {
        self.top
    }

    /// Region width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Region height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// One past the right edge in frame pixels.
    pub fn right(&self) -> u32 {
        self.left + self.width
    }

    /// One past the bottom edge in frame pixels.
    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }

    /// Whether the given frame pixel falls inside this region.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }
}

impl fmt::Display for TileRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tile{}_{} ({}×{} at {},{})",
            self.ix, self.iy, self.width, self.height, self.left, self.top
        )
    }
}

/// The complete tile grid for one frame: all regions in row-major order
/// plus the frame dimensions and grid shape they were planned for.
///
/// Both the job builder and the assembler consume the same `TileGrid` so
/// their view of the partitioning can never diverge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    frame_width: u32,
    frame_height: u32,
    num_x: u32,
    num_y: u32,
    regions: Vec<TileRegion>,
}

impl TileGrid {
    pub(crate) fn new(
        frame_width: u32,
        frame_height: u32,
        num_x: u32,
        num_y: u32,
        regions: Vec<TileRegion>,
    ) -> Self {
        Self {
            frame_width,
            frame_height,
            num_x,
            num_y,
            regions,
        }
    }

    /// Full frame width this grid was planned for.
    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    /// Full frame height this grid was planned for.
    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    /// Number of tile columns.
    pub fn num_x(&self) -> u32 {
        self.num_x
    }

    /// Number of tile rows.
    pub fn num_y(&self) -> u32 {
        self.num_y
    }

    /// All regions in row-major order (`iy` outer, `ix` inner).
    pub fn regions(&self) -> &[TileRegion] {
        &self.regions
    }

    /// Total number of tiles (`num_x × num_y`).
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the grid holds no regions. Never true for a planned grid.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Whether this is the degenerate single-tile grid.
    pub fn is_single_tile(&self) -> bool {
        self.num_x == 1 && self.num_y == 1
    }

    /// Looks up the region at grid position (`ix`, `iy`).
    pub fn region(&self, ix: u32, iy: u32) -> Option<&TileRegion> {
        if ix >= self.num_x || iy >= self.num_y {
            return None;
        }
        self.regions.get((iy * self.num_x + ix) as usize)
    }
}

/// Errors from tile grid planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidGridError {
    /// Frame width or height was zero.
    ZeroFrameDimension { width: u32, height: u32 },
    /// Requested tile count was zero on either axis.
    ZeroTileCount { num_x: u32, num_y: u32 },
    /// More tile columns requested than the frame has pixel columns.
    TooManyColumns { num_x: u32, width: u32 },
    /// More tile rows requested than the frame has pixel rows.
    TooManyRows { num_y: u32, height: u32 },
}

impl fmt::Display for InvalidGridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidGridError::ZeroFrameDimension { width, height } => {
                write!(f, "frame dimensions must be positive, got {}×{}", width, height)
            }
            InvalidGridError::ZeroTileCount { num_x, num_y } => {
                write!(f, "tile counts must be at least 1, got {}×{}", num_x, num_y)
            }
            InvalidGridError::TooManyColumns { num_x, width } => {
                write!(
                    f,
                    "cannot split {} pixel columns into {} tile columns",
                    width, num_x
                )
            }
            InvalidGridError::TooManyRows { num_y, height } => {
                write!(
                    f,
                    "cannot split {} pixel rows into {} tile rows",
                    height, num_y
                )
            }
        }
    }
}

impl std::error::Error for InvalidGridError {}
