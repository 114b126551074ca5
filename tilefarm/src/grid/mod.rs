//! Tile grid planning
//!
//! Partitions a full output frame into a rectangular grid of tile regions
//! that can be rendered independently and reassembled later. Planning is
//! pure geometry: no I/O, no state, deterministic for a given input.
//!
//! When a frame dimension is not evenly divisible by the tile count, the
//! remainder is distributed one pixel at a time to the leading columns
//! (and rows), so any two tiles on the same axis differ by at most one
//! pixel and the grid covers the frame exactly — no gaps, no overlaps.

mod types;

pub use types::{InvalidGridError, TileGrid, TileIndex, TileRegion};

/// Splits `total` pixels into `count` spans of `(offset, size)`.
///
/// The first `total % count` spans get one extra pixel, so sizes differ by
/// at most one and offsets are contiguous.
fn axis_spans(total: u32, count: u32) -> Vec<(u32, u32)> {
    let base = total / count;
    let remainder = total % count;

    let mut spans = Vec::with_capacity(count as usize);
    let mut offset = 0;
    for i in 0..count {
        let size = if i < remainder { base + 1 } else { base };
        spans.push((offset, size));
        offset += size;
    }
    spans
}

/// Plans the tile grid for a frame of `width`×`height` pixels split into
/// `num_x`×`num_y` tiles.
///
/// Regions are returned in row-major order (`iy` outer, `ix` inner); other
/// components rely on that ordering for deterministic task enumeration.
/// A 1×1 grid yields exactly one region covering the whole frame.
///
/// # Arguments
///
/// * `width` - Full frame width in pixels (must be > 0)
/// * `height` - Full frame height in pixels (must be > 0)
/// * `num_x` - Number of tile columns (1 to `width`)
/// * `num_y` - Number of tile rows (1 to `height`)
///
/// # Errors
///
/// Returns [`InvalidGridError`] for zero dimensions, zero tile counts, or
/// grids denser than the frame's pixels (which would produce empty tiles).
pub fn plan_grid(
    width: u32,
    height: u32,
    num_x: u32,
    num_y: u32,
) -> Result<TileGrid, InvalidGridError> {
    if width == 0 || height == 0 {
        return Err(InvalidGridError::ZeroFrameDimension { width, height });
    }
    if num_x == 0 || num_y == 0 {
        return Err(InvalidGridError::ZeroTileCount { num_x, num_y });
    }
    if num_x > width {
        return Err(InvalidGridError::TooManyColumns { num_x, width });
    }
    if num_y > height {
        return Err(InvalidGridError::TooManyRows { num_y, height });
    }

    let columns = axis_spans(width, num_x);
    let rows = axis_spans(height, num_y);

    let mut regions = Vec::with_capacity((num_x * num_y) as usize);
    for (iy, &(top, tile_height)) in rows.iter().enumerate() {
        for (ix, &(left, tile_width)) in columns.iter().enumerate() {
            regions.push(TileRegion::new(
                ix as u32,
                iy as u32,
                left,
                top,
                tile_width,
                tile_height,
            ));
        }
    }

    Ok(TileGrid::new(width, height, num_x, num_y, regions))
}
