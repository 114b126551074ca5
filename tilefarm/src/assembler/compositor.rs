//! Pasting decoded tiles onto a full-frame canvas.
//!
//! [`Compositor`] is the seam between tile collection and pixel work, so
//! tests can drive the assembler without real image files. The default
//! [`ImageCompositor`] decodes with the `image` crate and pastes each tile
//! at the exact offset its grid region dictates.

use bytes::Bytes;
use image::{DynamicImage, GenericImage, ImageFormat, RgbaImage};
use thiserror::Error;

use crate::grid::TileRegion;
use crate::job::OutputFormat;

/// One rendered tile handed to the compositor: where it belongs and its
/// encoded file content.
#[derive(Debug, Clone)]
pub struct TileSource {
    /// File name the tile arrived under, for error reporting.
    pub name: String,

    /// Grid region the tile covers.
    pub region: TileRegion,

    /// Encoded image bytes as read from disk.
    pub bytes: Bytes,
}

impl TileSource {
    pub fn new(name: impl Into<String>, region: TileRegion, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            region,
            bytes,
        }
    }
}

/// Combines tile images into one frame canvas.
///
/// Implementations must place every tile exactly at its region's offset.
/// Tiles may be absent (partial assembly); uncovered pixels stay at the
/// canvas default.
pub trait Compositor: Send + Sync {
    fn compose(
        &self,
        width: u32,
        height: u32,
        tiles: &[TileSource],
    ) -> Result<RgbaImage, CompositeError>;
}

/// Compositor backed by the `image` crate.
///
/// Decodes each tile from its encoded bytes, checks its dimensions against
/// the region it claims to cover, and pastes it at `(left, top)`. Working
/// depth is 8-bit RGBA; deeper sources are converted on decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCompositor;

impl ImageCompositor {
    pub fn new() -> Self {
        Self
    }
}

impl Compositor for ImageCompositor {
    fn compose(
        &self,
        width: u32,
        height: u32,
        tiles: &[TileSource],
    ) -> Result<RgbaImage, CompositeError> {
        let mut canvas = RgbaImage::new(width, height);

        for tile in tiles {
            let decoded = image::load_from_memory(&tile.bytes)
                .map_err(|source| CompositeError::Decode {
                    name: tile.name.clone(),
                    source,
                })?
                .to_rgba8();

            let region = &tile.region;
            if decoded.width() != region.width() || decoded.height() != region.height() {
                return Err(CompositeError::SizeMismatch {
                    name: tile.name.clone(),
                    expected_width: region.width(),
                    expected_height: region.height(),
                    actual_width: decoded.width(),
                    actual_height: decoded.height(),
                });
            }

            canvas
                .copy_from(&decoded, region.left(), region.top())
                .map_err(|source| CompositeError::OutOfBounds {
                    name: tile.name.clone(),
                    source,
                })?;
        }

        Ok(canvas)
    }
}

/// Encodes a composed frame for its configured output format.
///
/// JPEG has no alpha channel and EXR stores floats, so those two convert
/// before encoding; everything else writes the 8-bit RGBA canvas as-is.
pub(crate) fn encode_frame(
    image: &RgbaImage,
    format: OutputFormat,
) -> Result<Vec<u8>, CompositeError> {
    let mut buf = std::io::Cursor::new(Vec::new());
    let target = image_format(format);
    match format {
        OutputFormat::Jpeg => {
            DynamicImage::ImageRgba8(image.clone())
                .to_rgb8()
                .write_to(&mut buf, target)?;
        }
        OutputFormat::Exr => {
            DynamicImage::ImageRgba8(image.clone())
                .to_rgba32f()
                .write_to(&mut buf, target)?;
        }
        _ => image.write_to(&mut buf, target)?,
    }
    Ok(buf.into_inner())
}

fn image_format(format: OutputFormat) -> ImageFormat {
    match format {
        OutputFormat::Png => ImageFormat::Png,
        OutputFormat::Jpeg => ImageFormat::Jpeg,
        OutputFormat::Tiff => ImageFormat::Tiff,
        OutputFormat::Bmp => ImageFormat::Bmp,
        OutputFormat::Exr => ImageFormat::OpenExr,
    }
}

/// Errors from composing or encoding a frame.
#[derive(Debug, Error)]
pub enum CompositeError {
    /// A tile file's content was not a decodable image.
    #[error("tile {name} failed to decode")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// A tile decoded to different dimensions than its region.
    #[error(
        "tile {name} is {actual_width}×{actual_height}, \
         expected {expected_width}×{expected_height}"
    )]
    SizeMismatch {
        name: String,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// A tile's region does not fit inside the canvas.
    #[error("tile {name} falls outside the frame canvas")]
    OutOfBounds {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// The composed frame could not be encoded.
    #[error("failed to encode frame image")]
    Encode(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::plan_grid;
    use image::{GenericImageView, Rgba};

    /// Encodes a solid-color PNG of the given size.
    fn solid_png(width: u32, height: u32, color: Rgba<u8>) -> Bytes {
        let img = RgbaImage::from_pixel(width, height, color);
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        Bytes::from(buf.into_inner())
    }

    #[test]
    fn test_compose_places_tiles_at_region_offsets() {
        let grid = plan_grid(4, 2, 2, 1).unwrap();
        let left = grid.regions()[0];
        let right = grid.regions()[1];

        let tiles = vec![
            TileSource::new("l.png", left, solid_png(2, 2, Rgba([255, 0, 0, 255]))),
            TileSource::new("r.png", right, solid_png(2, 2, Rgba([0, 255, 0, 255]))),
        ];

        let canvas = ImageCompositor::new().compose(4, 2, &tiles).unwrap();
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(2, 0), &Rgba([0, 255, 0, 255]));
        assert_eq!(canvas.get_pixel(3, 1), &Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_partial_compose_leaves_gap_transparent() {
        let grid = plan_grid(4, 2, 2, 1).unwrap();
        let left = grid.regions()[0];

        let tiles = vec![TileSource::new(
            "l.png",
            left,
            solid_png(2, 2, Rgba([9, 9, 9, 255])),
        )];

        let canvas = ImageCompositor::new().compose(4, 2, &tiles).unwrap();
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([9, 9, 9, 255]));
        assert_eq!(canvas.get_pixel(3, 1), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_undecodable_tile_rejected() {
        let grid = plan_grid(4, 2, 2, 1).unwrap();
        let tiles = vec![TileSource::new(
            "junk.png",
            grid.regions()[0],
            Bytes::from_static(b"not an image"),
        )];

        let err = ImageCompositor::new().compose(4, 2, &tiles).unwrap_err();
        assert!(matches!(err, CompositeError::Decode { ref name, .. } if name == "junk.png"));
    }

    #[test]
    fn test_wrong_tile_dimensions_rejected() {
        let grid = plan_grid(4, 2, 2, 1).unwrap();
        let tiles = vec![TileSource::new(
            "t.png",
            grid.regions()[0],
            solid_png(3, 3, Rgba([0, 0, 0, 255])),
        )];

        let err = ImageCompositor::new().compose(4, 2, &tiles).unwrap_err();
        match err {
            CompositeError::SizeMismatch {
                expected_width,
                expected_height,
                actual_width,
                actual_height,
                ..
            } => {
                assert_eq!((expected_width, expected_height), (2, 2));
                assert_eq!((actual_width, actual_height), (3, 3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_encode_round_trips_png() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([10, 20, 30, 255]));
        let bytes = encode_frame(&img, OutputFormat::Png).unwrap();
        let back = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (3, 3));
        assert_eq!(back.get_pixel(1, 1), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_encode_jpeg_drops_alpha() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([10, 20, 30, 128]));
        let bytes = encode_frame(&img, OutputFormat::Jpeg).unwrap();
        let back = image::load_from_memory(&bytes).unwrap();
        assert_eq!(back.width(), 3);
        // JPEG carries no alpha channel
        assert!(!back.color().has_alpha());
    }

    #[test]
    fn test_encode_exr_produces_float_image() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
        let bytes = encode_frame(&img, OutputFormat::Exr).unwrap();
        let back = image::load_from_memory_with_format(&bytes, ImageFormat::OpenExr).unwrap();
        assert_eq!(back.dimensions(), (2, 2));
    }
}
