//! CLI error type.

use kmlexport::source::DataSourceError;
use kmlexport::{ConfigError, ExportError};
use thiserror::Error;

/// Errors surfaced to the user by the `kmlexport` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// The export run failed.
    #[error("{0}")]
    Export(#[from] ExportError),

    /// A configuration or job file could not be used.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A layer could not be inspected.
    #[error("{0}")]
    Source(#[from] DataSourceError),

    /// Invalid command-line usage.
    #[error("{0}")]
    Usage(String),
}
