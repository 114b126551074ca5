//! Render job description and task expansion.
//!
//! A [`RenderJobSpec`] captures everything the pipeline needs to know about
//! one submission: output geometry, frame range, optional tiling, and where
//! finished files land. [`JobUnitBuilder`] crosses the spec with its planned
//! tile grid to produce the flat task list a dispatch backend hands to the
//! farm, together with the job's [`AssetReferences`].

mod assets;
mod builder;
mod spec;
mod task;

pub use assets::{AssetReferenceResolver, AssetReferences, AssetResolveError, NoAssets};
pub use builder::{BuildError, JobUnit, JobUnitBuilder};
pub use spec::{OutputFormat, RenderJobSpec};
pub use task::TaskDescriptor;
