//! Layer data sources.
//!
//! The export engine never touches files directly: it asks a
//! [`LayerProvider`] to open each selected layer and gets back an in-memory
//! dataset.
//!
//! ```text
//! LayerRef::Vector ──► LayerProvider::open_vector ──► VectorDataset
//!                                                      ├─ fields (schema)
//!                                                      ├─ features (attrs + WKB)
//!                                                      └─ spatial_ref
//!
//! LayerRef::Raster ──► LayerProvider::open_raster ──► RasterDataset
//!                                                      ├─ width × height
//!                                                      ├─ geo_transform
//!                                                      └─ spatial_ref
//! ```
//!
//! [`FileLayerProvider`] reads GeoJSON and ESRI Shapefiles for vectors, and
//! world-file georeferenced images for rasters.

mod geojson_reader;
mod raster;
mod shp_reader;
mod vector;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::layer::{RasterLayer, VectorLayer};

pub use raster::{world_file_candidates, Extent, GeoTransform, RasterDataset, WorldFile};
pub use vector::{Feature, FieldValue, VectorDataset};

/// Errors opening or reading a layer's data source.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("Failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported data source format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Failed to read {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("No georeferencing found for {}", .0.display())]
    MissingGeoreference(PathBuf),

    #[error("Invalid world file {}: {reason}", .path.display())]
    InvalidWorldFile { path: PathBuf, reason: String },
}

impl DataSourceError {
    pub(crate) fn read(path: &Path, reason: impl ToString) -> Self {
        DataSourceError::Read {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Opens layer handles into datasets.
pub trait LayerProvider {
    fn open_vector(&self, layer: &VectorLayer) -> Result<VectorDataset, DataSourceError>;

    fn open_raster(&self, layer: &RasterLayer) -> Result<RasterDataset, DataSourceError>;
}

/// Vector file formats understood by [`FileLayerProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    GeoJson,
    Shapefile,
}

impl VectorFormat {
    /// Detect the format from a file extension.
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "geojson" | "json" => Some(VectorFormat::GeoJson),
            "shp" => Some(VectorFormat::Shapefile),
            _ => None,
        }
    }
}

/// Reads layers from local files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLayerProvider;

impl FileLayerProvider {
    pub fn new() -> Self {
        Self
    }
}

impl LayerProvider for FileLayerProvider {
    fn open_vector(&self, layer: &VectorLayer) -> Result<VectorDataset, DataSourceError> {
        let path = layer.path();
        if !path.exists() {
            return Err(DataSourceError::Open {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            });
        }
        let format = VectorFormat::detect(path)
            .ok_or_else(|| DataSourceError::UnsupportedFormat(path.to_path_buf()))?;
        debug!(path = %path.display(), ?format, "Opening vector source");

        match format {
            VectorFormat::GeoJson => geojson_reader::read(path),
            VectorFormat::Shapefile => shp_reader::read(path),
        }
    }

    fn open_raster(&self, layer: &RasterLayer) -> Result<RasterDataset, DataSourceError> {
        debug!(path = %layer.path().display(), "Opening raster source");
        RasterDataset::open(layer.path())
    }
}

/// Read a `.prj` sidecar next to `path`, if one exists.
pub(crate) fn read_prj_sidecar(path: &Path) -> Result<Option<String>, DataSourceError> {
    let prj = path.with_extension("prj");
    if !prj.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&prj).map_err(|source| DataSourceError::Open {
        path: prj.clone(),
        source,
    })?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}
