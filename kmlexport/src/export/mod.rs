//! The export pipeline.
//!
//! ```text
//! ExportRequest { layers, output }
//!        │
//!        ▼
//!   Exporter::run ── fresh working directory
//!        │
//!        ▼
//!   assemble ─── LayerRef::Vector ──► export_vector ──► Folder
//!        │   └── LayerRef::Raster ──► export_raster ──► GroundOverlay + rasters/<base>.png
//!        │
//!        ▼  workdir/doc.kml, [workdir/rasters/*.png]
//!   package ─── no images ──► <output>.kml
//!            └─ images ────► <output>.kmz { doc.kml, rasters/<base>.png ... }
//! ```
//!
//! Layers are processed one at a time in request order. The first error
//! aborts the run and no output file is left behind.

mod assembler;
mod exporter;
mod package;
mod progress;
mod raster;
mod vector;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use assembler::{assemble, Assembly, AssemblyContext, DOCUMENT_NAME, RASTER_DIR};
pub use exporter::{ExportRequest, Exporter};
pub use package::{package, ExportArtifact};
pub use progress::{NoProgress, ProgressSink};
pub use raster::{export_raster, overlay_name, RasterExport};
pub use vector::export_vector;

/// Errors writing the document, images or archive.
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to build archive {}: {reason}", .path.display())]
    Archive { path: PathBuf, reason: String },

    #[error("Failed to create working directory: {0}")]
    WorkDir(#[source] io::Error),
}

impl PackagingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PackagingError::Io {
            path: path.into(),
            source,
        }
    }
}
