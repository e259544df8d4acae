//! Spatial references and reprojection.
//!
//! KML is always longitude/latitude on WGS84 (EPSG:4326). This module
//! decides whether a dataset already is, and if not, reprojects it:
//!
//! ```text
//! ".prj" / "EPSG:n" / "+proj=..."
//!            │
//!            ▼
//!      SpatialRef::from_definition ──► normalised parameter set
//!            │                               │
//!            │            == SpatialRef::wgs84()? ── yes ──► native transform
//!            ▼                               │
//!   CoordinateTransform (proj4rs)            no
//!            │                               ▼
//!            └──────────────► ensure_geographic: warped view in EPSG:4326
//! ```

mod epsg;
mod spatial_ref;
mod transform;
mod warp;
mod wkt;

use thiserror::Error;

pub use epsg::{proj_definition, WGS84_EPSG};
pub use spatial_ref::SpatialRef;
pub use transform::CoordinateTransform;
pub use warp::{ensure_geographic, GeographicView, EDGE_SAMPLES};

/// Errors resolving spatial references or transforming coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReprojectionError {
    #[error("Data source has no spatial reference")]
    MissingSpatialRef,

    #[error("Unrecognised spatial reference definition: {0}")]
    InvalidDefinition(String),

    #[error("Unknown EPSG code: {0}")]
    UnknownEpsg(u32),

    #[error("Projection engine rejected the reference: {0}")]
    Engine(String),

    #[error("Failed to transform ({x}, {y}): {reason}")]
    TransformFailed { x: f64, y: f64, reason: String },

    #[error("Reprojected extent is empty")]
    DegenerateExtent,
}
