//! Geometry translation.
//!
//! Feature geometry reaches the exporter as well-known binary (WKB), the
//! interchange encoding every layer provider can produce. This module
//! decodes it into [`Geometry`] and translates that into the matching KML
//! geometry element:
//!
//! ```text
//! WKB bytes ──► wkb::decode ──► Geometry ──► to_kml ──► KmlElement
//!                                  ▲
//!                     (optional reprojection happens here)
//! ```
//!
//! Coordinate values are carried through untouched, including elevation.
//! Measure (M) ordinates are read and dropped since KML has no place for them.

mod error;
mod translate;
mod types;
pub mod wkb;

pub use error::GeometryError;
pub use translate::{format_coordinates, to_kml, translate_wkb};
pub use types::{Coord, Geometry, GeometryType};
