//! Dispatchable task descriptors.

use serde::Serialize;

use crate::grid::{TileIndex, TileRegion};

/// One dispatchable unit of work: render one (frame, tile) pair, or one
/// whole frame when tiling is disabled.
///
/// The descriptor carries everything the external renderer needs — the
/// region bounding box to crop to and the exact file name the result must
/// be written under. The file name doubles as the task's identity: the
/// assembler later resolves results purely by name, with no side index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDescriptor {
    frame: i32,
    tile: Option<TileIndex>,
    region: TileRegion,
    output_file: String,
}

impl TaskDescriptor {
    pub(crate) fn new(
        frame: i32,
        tile: Option<TileIndex>,
        region: TileRegion,
        output_file: String,
    ) -> Self {
        Self {
            frame,
            tile,
            region,
            output_file,
        }
    }

    /// Frame number this task renders.
    pub fn frame(&self) -> i32 {
        self.frame
    }

    /// Tile position, `None` for a whole-frame task.
    pub fn tile(&self) -> Option<TileIndex> {
        self.tile
    }

    /// Pixel region of the full frame this task covers.
    pub fn region(&self) -> &TileRegion {
        &self.region
    }

    /// File name (no directory) the renderer must produce.
    pub fn output_file(&self) -> &str {
        &self.output_file
    }

    /// Human-readable task label for farm UIs: the output file name without
    /// its extension.
    pub fn name(&self) -> &str {
        self.output_file
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.output_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> TileRegion {
        crate::grid::plan_grid(100, 100, 2, 2).unwrap().regions()[0]
    }

    #[test]
    fn test_tiled_task_accessors() {
        let task = TaskDescriptor::new(
            7,
            Some(TileIndex::new(0, 0)),
            region(),
            "shot_frame0007_tile0_0.png".to_string(),
        );
        assert_eq!(task.frame(), 7);
        assert_eq!(task.tile(), Some(TileIndex::new(0, 0)));
        assert_eq!(task.output_file(), "shot_frame0007_tile0_0.png");
        assert_eq!(task.name(), "shot_frame0007_tile0_0");
    }

    #[test]
    fn test_whole_frame_task_has_no_tile() {
        let task = TaskDescriptor::new(3, None, region(), "shot_frame0003.png".to_string());
        assert_eq!(task.tile(), None);
        assert_eq!(task.name(), "shot_frame0003");
    }

    #[test]
    fn test_name_without_extension_falls_back() {
        let task = TaskDescriptor::new(1, None, region(), "noext".to_string());
        assert_eq!(task.name(), "noext");
    }
}
