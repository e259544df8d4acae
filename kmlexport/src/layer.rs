//! Layer handles selected for export.

use std::fmt;
use std::path::{Path, PathBuf};

/// Raster file extensions recognised when inferring a layer's kind.
pub const RASTER_EXTENSIONS: &[&str] = &["tif", "tiff", "png", "jpg", "jpeg"];

/// Whether a layer is exported as placemarks or as a ground overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Vector,
    Raster,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Vector => write!(f, "Vector"),
            LayerKind::Raster => write!(f, "Raster"),
        }
    }
}

/// Location and display name of a layer's data source.
///
/// A source string may carry a provider suffix after `|`
/// (e.g. `roads.gpkg|layername=roads`); only the part before it names the
/// file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSource {
    source: String,
    path: PathBuf,
    name: String,
}

impl LayerSource {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let path = PathBuf::from(source.split('|').next().unwrap_or_default().trim());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.clone());
        Self { source, path, name }
    }

    /// Override the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The source string as given.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// File path of the data source.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name without directory or extension.
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// A vector data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorLayer(pub LayerSource);

/// A raster data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterLayer(pub LayerSource);

impl std::ops::Deref for VectorLayer {
    type Target = LayerSource;

    fn deref(&self) -> &LayerSource {
        &self.0
    }
}

impl std::ops::Deref for RasterLayer {
    type Target = LayerSource;

    fn deref(&self) -> &LayerSource {
        &self.0
    }
}

/// A layer selected for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerRef {
    Vector(VectorLayer),
    Raster(RasterLayer),
}

impl LayerRef {
    pub fn vector(source: impl Into<String>) -> Self {
        LayerRef::Vector(VectorLayer(LayerSource::new(source)))
    }

    pub fn raster(source: impl Into<String>) -> Self {
        LayerRef::Raster(RasterLayer(LayerSource::new(source)))
    }

    /// Build a layer, inferring its kind from the file extension.
    pub fn from_path(source: impl Into<String>) -> Self {
        let source = LayerSource::new(source);
        match infer_kind(source.path()) {
            LayerKind::Raster => LayerRef::Raster(RasterLayer(source)),
            LayerKind::Vector => LayerRef::Vector(VectorLayer(source)),
        }
    }

    /// Build a layer of an explicit kind.
    pub fn with_kind(source: impl Into<String>, kind: LayerKind) -> Self {
        match kind {
            LayerKind::Vector => LayerRef::vector(source),
            LayerKind::Raster => LayerRef::raster(source),
        }
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            LayerRef::Vector(_) => LayerKind::Vector,
            LayerRef::Raster(_) => LayerKind::Raster,
        }
    }

    pub fn source(&self) -> &LayerSource {
        match self {
            LayerRef::Vector(layer) => &layer.0,
            LayerRef::Raster(layer) => &layer.0,
        }
    }

    pub fn path(&self) -> &Path {
        self.source().path()
    }

    pub fn name(&self) -> &str {
        self.source().name()
    }

    pub fn base_name(&self) -> String {
        self.source().base_name()
    }

    pub fn is_raster(&self) -> bool {
        self.kind() == LayerKind::Raster
    }
}

/// Guess a layer's kind from its file extension.
pub fn infer_kind(path: &Path) -> LayerKind {
    let is_raster = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| RASTER_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if is_raster {
        LayerKind::Raster
    } else {
        LayerKind::Vector
    }
}
