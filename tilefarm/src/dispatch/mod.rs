//! Hand-off of built job units to a distribution backend.
//!
//! The pipeline itself never talks to a render farm. [`RenderDispatch`] is
//! the seam where an external system takes over; [`BundleDispatch`] is the
//! built-in implementation that serializes the unit to a self-contained
//! bundle directory for out-of-band submission.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::job::{JobUnit, RenderJobSpec, TaskDescriptor};

/// File inside a bundle holding the job parameters and task list.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// File inside a bundle holding the job's asset references.
pub const ASSET_REFERENCES_FILENAME: &str = "asset_references.json";

/// Proof of a completed hand-off: where the unit went and the identifier
/// the backend assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// Backend-assigned identifier for the submission.
    pub job_id: String,

    /// Local path associated with the submission, when the backend has one.
    pub location: Option<PathBuf>,
}

/// A backend that accepts built job units for distributed execution.
///
/// Dispatch is synchronous and consumes nothing: the caller keeps the unit
/// and may dispatch it to several backends.
pub trait RenderDispatch: Send + Sync {
    fn dispatch(&self, unit: &JobUnit) -> Result<DispatchReceipt, DispatchError>;
}

/// Writes each dispatched unit to `{root}/{job_name}_{timestamp}/` as a
/// `manifest.json` plus `asset_references.json` pair.
///
/// The bundle is complete in itself: a farm-side tool can reconstruct the
/// full task list without access to the submitting host.
#[derive(Debug, Clone)]
pub struct BundleDispatch {
    root: PathBuf,
}

#[derive(Serialize)]
struct BundleManifest<'a> {
    job: &'a RenderJobSpec,
    tasks: &'a [TaskDescriptor],
}

impl BundleDispatch {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Picks a bundle directory name that does not collide with an earlier
    /// dispatch in the same second.
    fn create_bundle_dir(&self, job_name: &str) -> Result<PathBuf, DispatchError> {
        fs::create_dir_all(&self.root).map_err(|source| DispatchError::CreateDirFailed {
            path: self.root.clone(),
            source,
        })?;

        let timestamp = chrono::Local::now().format("%Y%m%dT%H%M%S");
        let base = format!("{}_{}", job_name, timestamp);

        for attempt in 0..100u32 {
            let name = if attempt == 0 {
                base.clone()
            } else {
                format!("{}_{}", base, attempt)
            };
            let dir = self.root.join(&name);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(dir),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => {
                    return Err(DispatchError::CreateDirFailed { path: dir, source })
                }
            }
        }

        Err(DispatchError::CreateDirFailed {
            path: self.root.join(base),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "bundle names exhausted"),
        })
    }

    fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<(), DispatchError> {
        let body = serde_json::to_vec_pretty(value).map_err(DispatchError::Serialize)?;
        let path = dir.join(name);
        fs::write(&path, body).map_err(|source| DispatchError::WriteFailed { path, source })
    }
}

impl RenderDispatch for BundleDispatch {
    fn dispatch(&self, unit: &JobUnit) -> Result<DispatchReceipt, DispatchError> {
        let dir = self.create_bundle_dir(unit.spec().job_name())?;

        let manifest = BundleManifest {
            job: unit.spec(),
            tasks: unit.tasks(),
        };
        Self::write_json(&dir, MANIFEST_FILENAME, &manifest)?;
        Self::write_json(&dir, ASSET_REFERENCES_FILENAME, unit.asset_references())?;

        // Directory name doubles as the submission id
        let job_id = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| unit.spec().job_name().to_string());

        tracing::info!(
            job_id = %job_id,
            tasks = unit.task_count(),
            bundle = %dir.display(),
            "wrote job bundle"
        );

        Ok(DispatchReceipt {
            job_id,
            location: Some(dir),
        })
    }
}

/// Errors from handing a job unit to a backend.
#[derive(Debug)]
pub enum DispatchError {
    /// A bundle directory could not be created.
    CreateDirFailed {
        path: PathBuf,
        source: io::Error,
    },

    /// A bundle file could not be written.
    WriteFailed {
        path: PathBuf,
        source: io::Error,
    },

    /// The unit could not be serialized.
    Serialize(serde_json::Error),

    /// Backend-specific failure.
    Backend(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::CreateDirFailed { path, .. } => {
                write!(f, "failed to create bundle directory {}", path.display())
            }
            DispatchError::WriteFailed { path, .. } => {
                write!(f, "failed to write bundle file {}", path.display())
            }
            DispatchError::Serialize(_) => write!(f, "failed to serialize job unit"),
            DispatchError::Backend(msg) => write!(f, "dispatch backend error: {}", msg),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::CreateDirFailed { source, .. } => Some(source),
            DispatchError::WriteFailed { source, .. } => Some(source),
            DispatchError::Serialize(source) => Some(source),
            DispatchError::Backend(_) => None,
        }
    }
}
