//! kmlexport - GIS layers to KML and KMZ
//!
//! This library exports an ordered selection of vector and raster layers to
//! a single KML document, or to a KMZ archive when rasters are involved.
//! Vector features become placemarks grouped in one folder per layer;
//! rasters are rendered, flattened onto white and pinned to their
//! geographic bounding box as ground overlays.
//!
//! The entry point is [`Exporter`]: give it an [`ExportRequest`] listing
//! `(LayerRef, PropertyBindings)` pairs and an output path.

pub mod bindings;
pub mod config;
pub mod crs;
pub mod error;
pub mod export;
pub mod geometry;
pub mod job;
pub mod kml;
pub mod layer;
pub mod render;
pub mod source;

pub use bindings::{KmlProperty, PropertyBindings};
pub use config::{ConfigError, ConfigFile, ExportConfig};
pub use error::{ExportError, ExportResult};
pub use export::{ExportArtifact, ExportRequest, Exporter, NoProgress, ProgressSink};
pub use job::ExportJob;
pub use layer::{LayerKind, LayerRef};
pub use render::{ImageFileRenderer, RasterRenderer};
pub use source::{FileLayerProvider, LayerProvider};
