//! Asset reference resolution boundary.
//!
//! Which scene files, textures, and reference data a job depends on is
//! discovered by scene introspection — a capability of the host
//! application, not of this pipeline. The pipeline only defines the
//! [`AssetReferenceResolver`] boundary and carries the resolved
//! [`AssetReferences`] into the job bundle.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::job::RenderJobSpec;

/// File and directory references a render job depends on or produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetReferences {
    /// Individual input files (scene file, referenced textures, …)
    pub input_files: Vec<PathBuf>,
    /// Directories whose entire content is an input
    pub input_directories: Vec<PathBuf>,
    /// Directories the job writes into
    pub output_directories: Vec<PathBuf>,
}

impl AssetReferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one input file.
    pub fn with_input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_files.push(path.into());
        self
    }

    /// Adds one input directory.
    pub fn with_input_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_directories.push(path.into());
        self
    }

    /// Adds one output directory.
    pub fn with_output_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_directories.push(path.into());
        self
    }

    /// Whether no references are recorded at all.
    pub fn is_empty(&self) -> bool {
        self.input_files.is_empty()
            && self.input_directories.is_empty()
            && self.output_directories.is_empty()
    }
}

/// Supplies the asset references for a job.
///
/// Implemented by the host application's scene-introspection layer;
/// [`NoAssets`] is the trivial implementation for jobs without tracked
/// dependencies.
pub trait AssetReferenceResolver: Send + Sync {
    fn resolve(&self, spec: &RenderJobSpec) -> Result<AssetReferences, AssetResolveError>;
}

/// Resolver that reports no asset references.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssets;

impl AssetReferenceResolver for NoAssets {
    fn resolve(&self, spec: &RenderJobSpec) -> Result<AssetReferences, AssetResolveError> {
        Ok(AssetReferences::new().with_output_directory(spec.output_dir()))
    }
}

/// Error from an asset reference resolver.
#[derive(Debug)]
pub struct AssetResolveError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AssetResolveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for AssetResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset resolution failed: {}", self.message)
    }
}

impl std::error::Error for AssetResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameRange;

    #[test]
    fn test_references_builder() {
        let refs = AssetReferences::new()
            .with_input_file("/scenes/hero.vpb")
            .with_input_directory("/textures")
            .with_output_directory("/renders");

        assert_eq!(refs.input_files, vec![PathBuf::from("/scenes/hero.vpb")]);
        assert_eq!(refs.input_directories, vec![PathBuf::from("/textures")]);
        assert_eq!(refs.output_directories, vec![PathBuf::from("/renders")]);
        assert!(!refs.is_empty());
    }

    #[test]
    fn test_default_is_empty() {
        assert!(AssetReferences::new().is_empty());
    }

    #[test]
    fn test_no_assets_resolver_reports_output_dir() {
        let spec = RenderJobSpec::new("shot", 100, 100, FrameRange::single(1))
            .with_output_dir("/renders/shot");
        let refs = NoAssets.resolve(&spec).unwrap();
        assert!(refs.input_files.is_empty());
        assert_eq!(refs.output_directories, vec![PathBuf::from("/renders/shot")]);
    }

    #[test]
    fn test_error_display_and_source() {
        use std::error::Error;

        let plain = AssetResolveError::new("scene not loaded");
        assert_eq!(plain.to_string(), "asset resolution failed: scene not loaded");
        assert!(plain.source().is_none());

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let wrapped = AssetResolveError::with_source("cannot stat scene", io);
        assert!(wrapped.source().is_some());
    }
}
