//! CLI error type.
//!
//! Every command returns `Result<(), CliError>`; `main` prints the error
//! and exits non-zero.

use std::fmt;
use std::io;
use std::path::PathBuf;

use tilefarm::assembler::AssemblyError;
use tilefarm::config::ConfigError;
use tilefarm::dispatch::DispatchError;
use tilefarm::grid::InvalidGridError;
use tilefarm::job::BuildError;
use tilefarm::logging::LoggingError;
use tilefarm::validate::ValidateError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Invalid command-line arguments.
    Args(String),

    /// Configuration file problem.
    Config(String),

    /// Logging could not be initialized.
    Logging(LoggingError),

    /// The requested tile grid is invalid.
    Grid(InvalidGridError),

    /// The job could not be built from its description.
    Build(BuildError),

    /// The job bundle could not be written.
    Dispatch(DispatchError),

    /// Assembly refused to start.
    Assembly(AssemblyError),

    /// Validation could not run.
    Validate(ValidateError),

    /// JSON output could not be encoded.
    Json(serde_json::Error),

    /// A report file could not be written.
    WriteReport { path: PathBuf, source: io::Error },

    /// The async runtime or signal handler could not be set up.
    Runtime(String),

    /// Assembly ran but left frames incomplete or failed.
    Incomplete(String),

    /// Validation ran and found outputs that differ from the reference.
    ValidationFailed(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Args(message) => write!(f, "{}", message),
            CliError::Config(message) => write!(f, "{}", message),
            CliError::Logging(e) => write!(f, "logging setup failed: {}", e),
            CliError::Grid(e) => write!(f, "invalid tile grid: {}", e),
            CliError::Build(e) => write!(f, "failed to build job: {}", e),
            CliError::Dispatch(e) => write!(f, "failed to write job bundle: {}", e),
            CliError::Assembly(e) => write!(f, "assembly failed: {}", e),
            CliError::Validate(e) => write!(f, "validation could not run: {}", e),
            CliError::Json(e) => write!(f, "failed to encode JSON: {}", e),
            CliError::WriteReport { path, source } => {
                write!(f, "failed to write report {}: {}", path.display(), source)
            }
            CliError::Runtime(message) => write!(f, "{}", message),
            CliError::Incomplete(summary) => write!(f, "{}", summary),
            CliError::ValidationFailed(summary) => write!(f, "{}", summary),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Logging(e) => Some(e),
            CliError::Grid(e) => Some(e),
            CliError::Build(e) => Some(e),
            CliError::Dispatch(e) => Some(e),
            CliError::Assembly(e) => Some(e),
            CliError::Validate(e) => Some(e),
            CliError::Json(e) => Some(e),
            CliError::WriteReport { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<InvalidGridError> for CliError {
    fn from(e: InvalidGridError) -> Self {
        CliError::Grid(e)
    }
}

impl From<BuildError> for CliError {
    fn from(e: BuildError) -> Self {
        CliError::Build(e)
    }
}

impl From<DispatchError> for CliError {
    fn from(e: DispatchError) -> Self {
        CliError::Dispatch(e)
    }
}

impl From<AssemblyError> for CliError {
    fn from(e: AssemblyError) -> Self {
        CliError::Assembly(e)
    }
}

impl From<ValidateError> for CliError {
    fn from(e: ValidateError) -> Self {
        CliError::Validate(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_context() {
        let err = CliError::Args("invalid tile grid '5'".to_string());
        assert_eq!(err.to_string(), "invalid tile grid '5'");

        let err = CliError::WriteReport {
            path: PathBuf::from("/tmp/report.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/tmp/report.json"));
    }

    #[test]
    fn test_config_error_converts_to_message() {
        let err: CliError = ConfigError::UnknownKey("bogus.key".to_string()).into();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("bogus.key"));
    }
}
