//! Persistent configuration in an INI file.
//!
//! Settings live under `{config_dir}/tilefarm/config.ini` in four sections:
//! `[output]`, `[assembly]`, `[validation]`, and `[logging]`, plus
//! `[dispatch]` for bundle output. [`ConfigKey`] enumerates every key the
//! file understands, so the CLI can validate, list, and round-trip settings
//! without stringly-typed section/key pairs scattered around.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use tracing::warn;

use crate::assembler::AssemblyConfig;
use crate::job::OutputFormat;
use crate::validate::ValidationConfig;

/// Directory name under the platform config root.
const CONFIG_DIR_NAME: &str = "tilefarm";

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.ini";

/// Platform path of the configuration file.
///
/// Falls back to the current directory when the platform has no config
/// root.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// The configuration file's content.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    ini: Ini,
}

impl ConfigFile {
    /// Loads from the platform config path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { ini })
    }

    /// Saves to the platform config path, creating parent directories.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Saves to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Save {
                path: path.to_path_buf(),
                source,
            })?;
        }
        self.ini
            .write_to_file(path)
            .map_err(|source| ConfigError::Save {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.ini.get_from(Some(section), key)
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.ini.with_section(Some(section)).set(key, value.into());
    }

    /// Assembler settings from `[assembly]`, falling back to defaults for
    /// absent or unparseable values.
    pub fn assembly_config(&self) -> AssemblyConfig {
        let mut config = AssemblyConfig::default();
        if let Some(ms) = self.parsed(ConfigKey::AssemblyPollIntervalMs) {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = self.parsed(ConfigKey::AssemblyTileTimeoutSecs) {
            config.tile_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = self.parsed::<usize>(ConfigKey::AssemblyMaxConcurrentFrames) {
            config.max_concurrent_frames = max.max(1);
        }
        if let Some(require) = self.parsed(ConfigKey::AssemblyRequireAllTiles) {
            config.require_all_tiles = require;
        }
        if let Some(cleanup) = self.parsed(ConfigKey::AssemblyCleanupTiles) {
            config.cleanup_tiles = cleanup;
        }
        config
    }

    /// Validator settings from `[validation]`, falling back to defaults.
    pub fn validation_config(&self) -> ValidationConfig {
        let mut config = ValidationConfig::default();
        if let Some(tolerance) = self.parsed(ConfigKey::ValidationChannelTolerance) {
            config.channel_tolerance = tolerance;
        }
        if let Some(similarity) = self.parsed::<f64>(ConfigKey::ValidationMinSimilarity) {
            config.min_similarity = similarity.clamp(0.0, 1.0);
        }
        config
    }

    fn parsed<T: FromStr>(&self, key: ConfigKey) -> Option<T> {
        let raw = self.get(key.section(), key.key_name())?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key = %key.name(), value = raw, "ignoring unparseable config value");
                None
            }
        }
    }
}

/// Every key the configuration file understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    /// `output.directory` - default output directory for jobs.
    OutputDirectory,
    /// `output.format` - default output format extension.
    OutputFormat,
    /// `assembly.poll_interval_ms` - poll interval for missing tiles.
    AssemblyPollIntervalMs,
    /// `assembly.tile_timeout_secs` - per-tile wait deadline.
    AssemblyTileTimeoutSecs,
    /// `assembly.max_concurrent_frames` - frame worker bound.
    AssemblyMaxConcurrentFrames,
    /// `assembly.require_all_tiles` - abandon frames with missing tiles.
    AssemblyRequireAllTiles,
    /// `assembly.cleanup_tiles` - delete tiles after the frame is written.
    AssemblyCleanupTiles,
    /// `validation.channel_tolerance` - per-channel difference treated equal.
    ValidationChannelTolerance,
    /// `validation.min_similarity` - passing similarity fraction.
    ValidationMinSimilarity,
    /// `dispatch.bundle_dir` - where job bundles are written.
    DispatchBundleDir,
    /// `logging.level` - default log level.
    LoggingLevel,
    /// `logging.directory` - log file directory; empty logs to stderr only.
    LoggingDirectory,
}

impl ConfigKey {
    /// All keys, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::OutputDirectory,
            ConfigKey::OutputFormat,
            ConfigKey::AssemblyPollIntervalMs,
            ConfigKey::AssemblyTileTimeoutSecs,
            ConfigKey::AssemblyMaxConcurrentFrames,
            ConfigKey::AssemblyRequireAllTiles,
            ConfigKey::AssemblyCleanupTiles,
            ConfigKey::ValidationChannelTolerance,
            ConfigKey::ValidationMinSimilarity,
            ConfigKey::DispatchBundleDir,
            ConfigKey::LoggingLevel,
            ConfigKey::LoggingDirectory,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::OutputDirectory | ConfigKey::OutputFormat => "output",
            ConfigKey::AssemblyPollIntervalMs
            | ConfigKey::AssemblyTileTimeoutSecs
            | ConfigKey::AssemblyMaxConcurrentFrames
            | ConfigKey::AssemblyRequireAllTiles
            | ConfigKey::AssemblyCleanupTiles => "assembly",
            ConfigKey::ValidationChannelTolerance | ConfigKey::ValidationMinSimilarity => {
                "validation"
            }
            ConfigKey::DispatchBundleDir => "dispatch",
            ConfigKey::LoggingLevel | ConfigKey::LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::OutputDirectory => "directory",
            ConfigKey::OutputFormat => "format",
            ConfigKey::AssemblyPollIntervalMs => "poll_interval_ms",
            ConfigKey::AssemblyTileTimeoutSecs => "tile_timeout_secs",
            ConfigKey::AssemblyMaxConcurrentFrames => "max_concurrent_frames",
            ConfigKey::AssemblyRequireAllTiles => "require_all_tiles",
            ConfigKey::AssemblyCleanupTiles => "cleanup_tiles",
            ConfigKey::ValidationChannelTolerance => "channel_tolerance",
            ConfigKey::ValidationMinSimilarity => "min_similarity",
            ConfigKey::DispatchBundleDir => "bundle_dir",
            ConfigKey::LoggingLevel => "level",
            ConfigKey::LoggingDirectory => "directory",
        }
    }

    /// Fully qualified `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value, or the empty string when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        config
            .get(self.section(), self.key_name())
            .unwrap_or_default()
            .to_string()
    }

    /// Validates and stores a value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        self.validate(value)?;
        config.set(self.section(), self.key_name(), value);
        Ok(())
    }

    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        let ok = match self {
            ConfigKey::OutputDirectory
            | ConfigKey::DispatchBundleDir
            | ConfigKey::LoggingDirectory => !value.is_empty(),
            ConfigKey::OutputFormat => OutputFormat::from_extension(value).is_some(),
            ConfigKey::AssemblyPollIntervalMs | ConfigKey::AssemblyTileTimeoutSecs => {
                value.parse::<u64>().is_ok()
            }
            ConfigKey::AssemblyMaxConcurrentFrames => {
                value.parse::<usize>().map(|n| n >= 1).unwrap_or(false)
            }
            ConfigKey::AssemblyRequireAllTiles | ConfigKey::AssemblyCleanupTiles => {
                value.parse::<bool>().is_ok()
            }
            ConfigKey::ValidationChannelTolerance => value.parse::<u8>().is_ok(),
            ConfigKey::ValidationMinSimilarity => value
                .parse::<f64>()
                .map(|s| (0.0..=1.0).contains(&s))
                .unwrap_or(false),
            ConfigKey::LoggingLevel => {
                matches!(value, "trace" | "debug" | "info" | "warn" | "error" | "off")
            }
        };
        if ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidValue {
                key: self.name(),
                value: value.to_string(),
            })
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .find(|key| key.name() == s)
            .copied()
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

/// Errors from reading, writing, or mutating configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read or parsed.
    Load { path: PathBuf, source: ini::Error },

    /// The file could not be written.
    Save { path: PathBuf, source: io::Error },

    /// No such configuration key.
    UnknownKey(String),

    /// A value failed validation for its key.
    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Load { path, .. } => {
                write!(f, "failed to load config from {}", path.display())
            }
            ConfigError::Save { path, .. } => {
                write!(f, "failed to save config to {}", path.display())
            }
            ConfigError::UnknownKey(key) => write!(f, "unknown configuration key: {}", key),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value '{}' for {}", value, key)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Load { source, .. } => Some(source),
            ConfigError::Save { source, .. } => Some(source),
            _ => None,
        }
    }
}
