//! Job unit construction.
//!
//! Expands a [`RenderJobSpec`] crossed with its tile grid into the flat,
//! ordered task list the external distribution layer dispatches. Building
//! is pure in-memory planning: no files are written and no farm is
//! contacted.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::frame::FrameRange;
use crate::grid::TileGrid;
use crate::job::{AssetReferences, RenderJobSpec, TaskDescriptor};
use crate::naming::{frame_file_name, tile_file_name};

/// The complete dispatchable description of one submission: the job
/// parameters, every task, and the job's asset references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobUnit {
    spec: RenderJobSpec,
    tasks: Vec<TaskDescriptor>,
    asset_references: AssetReferences,
}

impl JobUnit {
    /// The spec this unit was built from.
    pub fn spec(&self) -> &RenderJobSpec {
        &self.spec
    }

    /// All tasks in dispatch order: frames in range order, tiles row-major
    /// within each frame.
    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Asset references recorded for the job.
    pub fn asset_references(&self) -> &AssetReferences {
        &self.asset_references
    }

    /// The distinct frames covered, in range order.
    pub fn frames(&self) -> Vec<i32> {
        self.spec.frame_range().iter().collect()
    }
}

/// Builds [`JobUnit`]s from a spec and a planned tile grid.
///
/// # Example
///
/// ```
/// use tilefarm::job::{JobUnitBuilder, RenderJobSpec};
///
/// let spec = RenderJobSpec::new("shot", 1920, 1080, "1-2".parse().unwrap())
///     .with_tiling(5, 2);
/// let grid = spec.plan_grid().unwrap();
///
/// let unit = JobUnitBuilder::new(&spec).build(&grid).unwrap();
/// assert_eq!(unit.task_count(), 2 * 5 * 2);
/// ```
#[derive(Debug, Clone)]
pub struct JobUnitBuilder {
    spec: RenderJobSpec,
    asset_references: AssetReferences,
}

impl JobUnitBuilder {
    pub fn new(spec: &RenderJobSpec) -> Self {
        Self {
            spec: spec.clone(),
            asset_references: AssetReferences::new(),
        }
    }

    /// Records asset references to carry in the built unit.
    pub fn with_asset_references(mut self, references: AssetReferences) -> Self {
        self.asset_references = references;
        self
    }

    /// Expands the spec into one task per (frame, tile).
    ///
    /// The grid must be the one planned for this spec — a differing
    /// full-frame geometry means builder and assembler would disagree about
    /// the partitioning, which is a configuration defect.
    ///
    /// # Errors
    ///
    /// * [`BuildError::GeometryMismatch`] - grid planned for other dimensions
    /// * [`BuildError::EmptyGrid`] - grid holds no regions
    /// * [`BuildError::EmptyFrameRange`] - frame range yields no frames
    /// * [`BuildError::DuplicateTaskName`] - two tasks resolved to one file
    pub fn build(&self, grid: &TileGrid) -> Result<JobUnit, BuildError> {
        let spec = &self.spec;

        if grid.is_empty() {
            return Err(BuildError::EmptyGrid);
        }
        if grid.frame_width() != spec.image_width() || grid.frame_height() != spec.image_height() {
            return Err(BuildError::GeometryMismatch {
                spec_width: spec.image_width(),
                spec_height: spec.image_height(),
                grid_width: grid.frame_width(),
                grid_height: grid.frame_height(),
            });
        }

        let frames: Vec<i32> = spec.frame_range().iter().collect();
        if frames.is_empty() {
            return Err(BuildError::EmptyFrameRange(spec.frame_range()));
        }

        let extension = spec.output_format().extension();
        let mut tasks = Vec::with_capacity(frames.len() * grid.len());
        let mut seen_names: HashSet<String> = HashSet::with_capacity(tasks.capacity());

        for &frame in &frames {
            for region in grid.regions() {
                let (tile, output_file) = if spec.tiling_enabled() {
                    let name = tile_file_name(
                        spec.output_prefix(),
                        frame,
                        region.ix(),
                        region.iy(),
                        extension,
                    );
                    (Some(region.index()), name)
                } else {
                    // Whole-frame tasks write the final frame name directly
                    let name = frame_file_name(spec.output_prefix(), frame, extension);
                    (None, name)
                };

                if !seen_names.insert(output_file.clone()) {
                    return Err(BuildError::DuplicateTaskName(output_file));
                }
                tasks.push(TaskDescriptor::new(frame, tile, *region, output_file));
            }
        }

        tracing::debug!(
            job = spec.job_name(),
            frames = frames.len(),
            tiles = grid.len(),
            tasks = tasks.len(),
            "built job unit"
        );

        Ok(JobUnit {
            spec: spec.clone(),
            tasks,
            asset_references: self.asset_references.clone(),
        })
    }
}

/// Errors from job unit construction.
///
/// All of these are configuration defects: fatal to the submission,
/// surfaced immediately, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The frame range yields no frames.
    EmptyFrameRange(FrameRange),
    /// The tile grid holds no regions.
    EmptyGrid,
    /// Grid was planned for different frame dimensions than the spec's.
    GeometryMismatch {
        spec_width: u32,
        spec_height: u32,
        grid_width: u32,
        grid_height: u32,
    },
    /// Two tasks resolved to the same output file name.
    DuplicateTaskName(String),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::EmptyFrameRange(range) => {
                write!(f, "frame range {} yields no frames", range)
            }
            BuildError::EmptyGrid => write!(f, "tile grid holds no regions"),
            BuildError::GeometryMismatch {
                spec_width,
                spec_height,
                grid_width,
                grid_height,
            } => write!(
                f,
                "grid planned for {}×{} but job renders {}×{}",
                grid_width, grid_height, spec_width, spec_height
            ),
            BuildError::DuplicateTaskName(name) => {
                write!(f, "duplicate task output name: {}", name)
            }
        }
    }
}

impl std::error::Error for BuildError {}
