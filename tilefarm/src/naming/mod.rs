//! Deterministic output file naming.
//!
//! Filenames are the only identity shared between the dispatch side (which
//! names the files workers must produce) and the assembly side (which
//! locates them afterwards) — there is no database in between. Both sides
//! call the formatting functions here, so the convention cannot silently
//! diverge.
//!
//! The convention:
//!
//! - tile image: `{prefix}_frame{NNNN}_tile{ix}_{iy}.{ext}`
//! - assembled frame: `{prefix}_frame{NNNN}.{ext}`
//!
//! where `NNNN` is the frame number zero-padded to four digits (negative
//! frames keep their sign, e.g. `-012`).
//!
//! Examples:
//! - `shot_frame0001_tile0_0.png` — tile (0, 0) of frame 1
//! - `shot_frame0001.png` — assembled frame 1

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::grid::TileIndex;

/// Formats the file name for one rendered tile.
///
/// # Example
///
/// ```
/// use tilefarm::naming::tile_file_name;
///
/// let name = tile_file_name("shot", 1, 4, 1, "png");
/// assert_eq!(name, "shot_frame0001_tile4_1.png");
/// ```
pub fn tile_file_name(prefix: &str, frame: i32, ix: u32, iy: u32, extension: &str) -> String {
    format!(
        "{}_frame{:04}_tile{}_{}.{}",
        prefix, frame, ix, iy, extension
    )
}

/// Formats the file name for one assembled frame.
///
/// # Example
///
/// ```
/// use tilefarm::naming::frame_file_name;
///
/// let name = frame_file_name("shot", 12, "png");
/// assert_eq!(name, "shot_frame0012.png");
/// ```
pub fn frame_file_name(prefix: &str, frame: i32, extension: &str) -> String {
    format!("{}_frame{:04}.{}", prefix, frame, extension)
}

/// A parsed output file name: either one tile or one assembled frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFileName {
    /// Job output prefix (everything before `_frame`)
    pub prefix: String,
    /// Frame number
    pub frame: i32,
    /// Tile position when this is a tile file, `None` for a frame file
    pub tile: Option<TileIndex>,
    /// File extension without the dot
    pub extension: String,
}

impl OutputFileName {
    /// Whether this names a tile image rather than an assembled frame.
    pub fn is_tile(&self) -> bool {
        self.tile.is_some()
    }
}

impl fmt::Display for OutputFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tile {
            Some(tile) => f.write_str(&tile_file_name(
                &self.prefix,
                self.frame,
                tile.ix,
                tile.iy,
                &self.extension,
            )),
            None => f.write_str(&frame_file_name(&self.prefix, self.frame, &self.extension)),
        }
    }
}

/// Error parsing an output file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameParseError {
    /// File name doesn't match the output naming convention.
    InvalidPattern,
    /// Frame number was out of range.
    InvalidFrame(String),
    /// Tile index was out of range.
    InvalidTileIndex(String),
}

impl fmt::Display for NameParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameParseError::InvalidPattern => {
                write!(f, "file name doesn't match the output naming convention")
            }
            NameParseError::InvalidFrame(s) => write!(f, "invalid frame number: {}", s),
            NameParseError::InvalidTileIndex(s) => write!(f, "invalid tile index: {}", s),
        }
    }
}

impl std::error::Error for NameParseError {}

/// Pattern: `<prefix>_frame<NNNN>[_tile<ix>_<iy>].<ext>`
///
/// Groups: 1 = prefix, 2 = frame, 3/4 = tile ix/iy (optional), 5 = extension.
fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.+)_frame(-?\d+)(?:_tile(\d+)_(\d+))?\.([A-Za-z0-9]+)$").unwrap()
    })
}

/// Parses a file name back into its (prefix, frame, tile, extension) parts.
///
/// # Arguments
///
/// * `file_name` - Bare file name, no directory components
///
/// # Returns
///
/// The parsed parts, or an error if the name doesn't follow the convention.
pub fn parse_output_file_name(file_name: &str) -> Result<OutputFileName, NameParseError> {
    let captures = name_pattern()
        .captures(file_name)
        .ok_or(NameParseError::InvalidPattern)?;

    let prefix = captures.get(1).unwrap().as_str().to_string();

    let frame_str = captures.get(2).unwrap().as_str();
    let frame = frame_str
        .parse::<i32>()
        .map_err(|_| NameParseError::InvalidFrame(frame_str.to_string()))?;

    let tile = match (captures.get(3), captures.get(4)) {
        (Some(ix_m), Some(iy_m)) => {
            let ix = ix_m
                .as_str()
                .parse::<u32>()
                .map_err(|_| NameParseError::InvalidTileIndex(ix_m.as_str().to_string()))?;
            let iy = iy_m
                .as_str()
                .parse::<u32>()
                .map_err(|_| NameParseError::InvalidTileIndex(iy_m.as_str().to_string()))?;
            Some(TileIndex::new(ix, iy))
        }
        _ => None,
    };

    let extension = captures.get(5).unwrap().as_str().to_string();

    Ok(OutputFileName {
        prefix,
        frame,
        tile,
        extension,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_file_name_format() {
        assert_eq!(
            tile_file_name("shot", 1, 0, 0, "png"),
            "shot_frame0001_tile0_0.png"
        );
        assert_eq!(
            tile_file_name("shot", 1, 4, 1, "png"),
            "shot_frame0001_tile4_1.png"
        );
    }

    #[test]
    fn test_frame_file_name_format() {
        assert_eq!(frame_file_name("shot", 1, "png"), "shot_frame0001.png");
        assert_eq!(frame_file_name("shot", 1234, "exr"), "shot_frame1234.exr");
    }

    #[test]
    fn test_frame_padding() {
        assert_eq!(frame_file_name("s", 0, "png"), "s_frame0000.png");
        assert_eq!(frame_file_name("s", 99, "png"), "s_frame0099.png");
        assert_eq!(frame_file_name("s", 12345, "png"), "s_frame12345.png");
    }

    #[test]
    fn test_negative_frame_keeps_sign() {
        assert_eq!(frame_file_name("s", -12, "png"), "s_frame-012.png");
        assert_eq!(
            tile_file_name("s", -5, 1, 0, "png"),
            "s_frame-005_tile1_0.png"
        );
    }

    #[test]
    fn test_parse_tile_name() {
        let parsed = parse_output_file_name("shot_frame0001_tile4_1.png").unwrap();
        assert_eq!(parsed.prefix, "shot");
        assert_eq!(parsed.frame, 1);
        assert_eq!(parsed.tile, Some(TileIndex::new(4, 1)));
        assert_eq!(parsed.extension, "png");
        assert!(parsed.is_tile());
    }

    #[test]
    fn test_parse_frame_name() {
        let parsed = parse_output_file_name("shot_frame0042.png").unwrap();
        assert_eq!(parsed.prefix, "shot");
        assert_eq!(parsed.frame, 42);
        assert_eq!(parsed.tile, None);
        assert!(!parsed.is_tile());
    }

    #[test]
    fn test_parse_prefix_with_underscores() {
        // Prefixes may themselves contain underscores and even "frame"
        let parsed = parse_output_file_name("my_scene_v2_frame0010_tile0_3.tiff").unwrap();
        assert_eq!(parsed.prefix, "my_scene_v2");
        assert_eq!(parsed.frame, 10);
        assert_eq!(parsed.tile, Some(TileIndex::new(0, 3)));
        assert_eq!(parsed.extension, "tiff");
    }

    #[test]
    fn test_parse_negative_frame() {
        let parsed = parse_output_file_name("s_frame-012.png").unwrap();
        assert_eq!(parsed.frame, -12);
    }

    #[test]
    fn test_parse_rejects_non_matching_names() {
        for name in [
            "",
            "readme.txt",
            "shot.png",
            "shot_frame.png",
            "shot_frameX_tile0_0.png",
            "shot_frame0001_tile0.png",
            "shot_frame0001_tile0_0",
        ] {
            let result = parse_output_file_name(name);
            assert!(
                matches!(result, Err(NameParseError::InvalidPattern)),
                "'{}' should be rejected, got {:?}",
                name,
                result
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflowing_frame() {
        let result = parse_output_file_name("s_frame99999999999.png");
        assert!(matches!(result, Err(NameParseError::InvalidFrame(_))));
    }

    #[test]
    fn test_format_parse_roundtrip() {
        let name = tile_file_name("render_out", 37, 2, 5, "jpg");
        let parsed = parse_output_file_name(&name).unwrap();
        assert_eq!(parsed.prefix, "render_out");
        assert_eq!(parsed.frame, 37);
        assert_eq!(parsed.tile, Some(TileIndex::new(2, 5)));
        assert_eq!(parsed.extension, "jpg");
        assert_eq!(parsed.to_string(), name);
    }

    #[test]
    fn test_display_matches_formatting_functions() {
        let frame_name = OutputFileName {
            prefix: "shot".to_string(),
            frame: 7,
            tile: None,
            extension: "png".to_string(),
        };
        assert_eq!(frame_name.to_string(), "shot_frame0007.png");

        let tile_name = OutputFileName {
            tile: Some(TileIndex::new(1, 2)),
            ..frame_name
        };
        assert_eq!(tile_name.to_string(), "shot_frame0007_tile1_2.png");
    }

    #[test]
    fn test_tile_and_frame_names_never_collide() {
        // A frame file can never parse as a tile file and vice versa
        let tile = parse_output_file_name("s_frame0001_tile0_0.png").unwrap();
        let frame = parse_output_file_name("s_frame0001.png").unwrap();
        assert!(tile.is_tile());
        assert!(!frame.is_tile());
        assert_ne!(tile.to_string(), frame.to_string());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            NameParseError::InvalidPattern.to_string(),
            "file name doesn't match the output naming convention"
        );
        assert_eq!(
            NameParseError::InvalidFrame("x".to_string()).to_string(),
            "invalid frame number: x"
        );
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_tile_name_roundtrip(
                prefix in "[a-z][a-z0-9_]{0,20}",
                frame in -9999i32..9999,
                ix in 0u32..100,
                iy in 0u32..100,
            ) {
                let name = tile_file_name(&prefix, frame, ix, iy, "png");
                let parsed = parse_output_file_name(&name)?;
                prop_assert_eq!(parsed.prefix, prefix);
                prop_assert_eq!(parsed.frame, frame);
                prop_assert_eq!(parsed.tile, Some(TileIndex::new(ix, iy)));
            }

            #[test]
            fn test_frame_name_roundtrip(
                prefix in "[a-z][a-z0-9_]{0,20}",
                frame in -9999i32..9999,
            ) {
                let name = frame_file_name(&prefix, frame, "png");
                let parsed = parse_output_file_name(&name)?;
                prop_assert_eq!(parsed.prefix, prefix);
                prop_assert_eq!(parsed.frame, frame);
                prop_assert_eq!(parsed.tile, None);
            }

            #[test]
            fn test_distinct_tiles_get_distinct_names(
                frame in -999i32..999,
                ix1 in 0u32..50,
                iy1 in 0u32..50,
                ix2 in 0u32..50,
                iy2 in 0u32..50,
            ) {
                prop_assume!((ix1, iy1) != (ix2, iy2));
                let a = tile_file_name("shot", frame, ix1, iy1, "png");
                let b = tile_file_name("shot", frame, ix2, iy2, "png");
                prop_assert_ne!(a, b);
            }
        }
    }
}
