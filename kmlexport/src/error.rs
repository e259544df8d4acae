//! Top-level error type for export runs.
//!
//! Every component has its own error enum; [`ExportError`] groups them into
//! the six kinds a run can fail with. All of them are fatal: the first
//! failing layer aborts the whole export.

use thiserror::Error;

use crate::config::ConfigError;
use crate::crs::ReprojectionError;
use crate::export::PackagingError;
use crate::geometry::GeometryError;
use crate::render::RenderError;
use crate::source::DataSourceError;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors that abort an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A layer source could not be opened or read.
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// A feature carried malformed geometry.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// A spatial reference was missing or could not be transformed.
    #[error("Reprojection error: {0}")]
    Reprojection(#[from] ReprojectionError),

    /// The renderer failed to produce an image.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Writing the document, an image or the archive failed.
    #[error("Packaging error: {0}")]
    Packaging(#[from] PackagingError),

    /// The run was not configured correctly.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
