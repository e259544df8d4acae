//! Export configuration.
//!
//! Settings come from an optional INI file and can be overridden
//! programmatically with the `with_*` builder methods.
//!
//! # Example Configuration (INI)
//!
//! ```ini
//! [export]
//! reproject_vectors = false
//! keep_workdir = false
//! workdir_parent = /var/tmp
//! compression_level = 6
//! ```

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

/// Section holding export settings.
pub const EXPORT_SECTION: &str = "export";

/// Errors in configuration, job files or run parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no output path selected")]
    MissingOutput,

    #[error("Failed to load {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Layer [{section}] has no path")]
    MissingLayerPath { section: String },

    #[error("Layer [{section}] has unknown kind {kind:?} (expected vector or raster)")]
    UnknownLayerKind { section: String, kind: String },

    #[error("No layers selected for export")]
    NoLayers,
}

/// Settings for an export run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportConfig {
    /// Reproject vector features declared in another reference to WGS84.
    pub reproject_vectors: bool,
    /// Leave the per-run working directory on disk after the run.
    pub keep_workdir: bool,
    /// Directory the working directory is created in; system temp if unset.
    pub workdir_parent: Option<PathBuf>,
    /// Deflate level (0-9) for archives; library default if unset.
    pub compression_level: Option<i64>,
}

impl ExportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reproject_vectors(mut self, enabled: bool) -> Self {
        self.reproject_vectors = enabled;
        self
    }

    pub fn with_keep_workdir(mut self, keep: bool) -> Self {
        self.keep_workdir = keep;
        self
    }

    pub fn with_workdir_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.workdir_parent = Some(parent.into());
        self
    }

    pub fn with_compression_level(mut self, level: i64) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = self.compression_level {
            if !(0..=9).contains(&level) {
                return Err(ConfigError::InvalidValue {
                    key: "compression_level".to_string(),
                    value: level.to_string(),
                    reason: "must be between 0 and 9".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Default location of the configuration file.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kmlexport").join("config.ini"))
}

/// Loader for the `[export]` INI configuration.
pub struct ConfigFile;

impl ConfigFile {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<ExportConfig, ConfigError> {
        if !path.exists() {
            return Ok(ExportConfig::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&text).map_err(|e| match e {
            ConfigError::Load { reason, .. } => ConfigError::Load {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Load from the default location, if there is one.
    pub fn load_default() -> Result<ExportConfig, ConfigError> {
        match config_file_path() {
            Some(path) => Self::load(&path),
            None => Ok(ExportConfig::default()),
        }
    }

    pub fn parse(text: &str) -> Result<ExportConfig, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Load {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;
        let mut config = ExportConfig::default();
        let Some(section) = ini.section(Some(EXPORT_SECTION)) else {
            return Ok(config);
        };

        if let Some(value) = section.get("reproject_vectors") {
            config.reproject_vectors = parse_bool("reproject_vectors", value)?;
        }
        if let Some(value) = section.get("keep_workdir") {
            config.keep_workdir = parse_bool("keep_workdir", value)?;
        }
        if let Some(value) = section.get("workdir_parent") {
            let value = value.trim();
            if !value.is_empty() {
                config.workdir_parent = Some(PathBuf::from(value));
            }
        }
        if let Some(value) = section.get("compression_level") {
            let level = value
                .trim()
                .parse::<i64>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "compression_level".to_string(),
                    value: value.to_string(),
                    reason: e.to_string(),
                })?;
            config.compression_level = Some(level);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Parse an INI boolean (`true/false`, `yes/no`, `on/off`, `1/0`).
pub fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
