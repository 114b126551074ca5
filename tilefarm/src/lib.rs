//! TileFarm - distributed tiled rendering, without the farm knowing it
//!
//! TileFarm splits large still-image render jobs into rectangular tiles
//! that independent hosts can render in parallel, then reassembles the
//! per-tile outputs into finished frames and checks them against reference
//! renders. The render farm itself stays external: this library plans the
//! work, hands it off through [`dispatch::RenderDispatch`], and picks the
//! results back up from the output directory.
//!
//! The pipeline has four stages:
//!
//! 1. [`grid`] - partition the frame into an exact-cover tile grid
//! 2. [`job`] - expand a job spec into per-tile task descriptors
//! 3. [`assembler`] - collect rendered tiles and compose frame images
//! 4. [`validate`] - compare assembled output against a reference render
//!
//! # Example
//!
//! ```
//! use tilefarm::job::{JobUnitBuilder, RenderJobSpec};
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = RenderJobSpec::new("hero_shot", 1920, 1080, "1-24".parse()?)
//!     .with_tiling(5, 2)
//!     .with_output_dir("/renders/hero_shot");
//!
//! let grid = spec.plan_grid()?;
//! let unit = JobUnitBuilder::new(&spec).build(&grid)?;
//! assert_eq!(unit.task_count(), 24 * 10);
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```

pub mod assembler;
pub mod config;
pub mod dispatch;
pub mod frame;
pub mod grid;
pub mod job;
pub mod logging;
pub mod naming;
pub mod validate;

pub use assembler::{AssemblyConfig, AssemblyReport, TileAssembler};
pub use frame::FrameRange;
pub use grid::{plan_grid, TileGrid};
pub use job::{JobUnitBuilder, RenderJobSpec};
pub use validate::{OutputValidator, ValidationConfig};
