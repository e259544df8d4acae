//! Geographic views of rasters.
//!
//! A raster whose reference is not WGS84 is seen through a virtual warped
//! view: nothing is resampled or written, only the view's size and
//! pixel-to-geo transform are derived. The view covers the geographic
//! bounding box of the raster's edges with square pixels, and keeps the
//! raster's diagonal pixel count.

use tracing::{debug, warn};

use super::{CoordinateTransform, ReprojectionError, SpatialRef};
use crate::kml::GeoBounds;
use crate::source::{GeoTransform, RasterDataset};

/// Sample points taken along each raster edge.
pub const EDGE_SAMPLES: usize = 21;

/// A raster as seen in the geographic reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeographicView {
    pub width: u32,
    pub height: u32,
    pub geo_transform: GeoTransform,
    /// False when the raster already was in the geographic reference.
    pub reprojected: bool,
}

impl GeographicView {
    /// Lat/lon box covered by the view, whichever way its rows and
    /// columns run.
    pub fn bounds(&self) -> GeoBounds {
        let gt = &self.geo_transform;
        let (x0, y0) = (gt.origin_x(), gt.origin_y());
        let x1 = x0 + gt.pixel_width() * f64::from(self.width);
        let y1 = y0 + gt.pixel_height() * f64::from(self.height);
        GeoBounds {
            north: y0.max(y1),
            south: y0.min(y1),
            east: x0.max(x1),
            west: x0.min(x1),
        }
    }
}

/// Return `raster` in the geographic reference.
///
/// Rasters already in WGS84 come back unchanged with their native transform.
/// Reference equality is decided on the full parsed definition.
pub fn ensure_geographic(raster: &RasterDataset) -> Result<GeographicView, ReprojectionError> {
    let definition = raster
        .spatial_ref
        .as_deref()
        .ok_or(ReprojectionError::MissingSpatialRef)?;
    let source = SpatialRef::from_definition(definition)?;
    let target = SpatialRef::wgs84();

    if source == target {
        return Ok(GeographicView {
            width: raster.width,
            height: raster.height,
            geo_transform: raster.geo_transform,
            reprojected: false,
        });
    }

    let transform = CoordinateTransform::new(&source, &target)?;
    let view = suggested_view(raster, &transform)?;
    debug!(
        path = %raster.path.display(),
        from = %source,
        width = view.width,
        height = view.height,
        "Reprojected raster view"
    );
    Ok(view)
}

/// Geographic bounding box of the sampled raster edges.
#[derive(Debug, Clone, Copy, PartialEq)]
struct EdgeBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    /// Samples the transform rejected.
    failed: usize,
}

/// Project `EDGE_SAMPLES` points along each raster edge with `project`.
///
/// Samples that fail to project are skipped and counted; the call fails
/// only when none project.
fn sample_edges<F>(raster: &RasterDataset, project: F) -> Result<EdgeBox, ReprojectionError>
where
    F: Fn(f64, f64) -> Result<(f64, f64), ReprojectionError>,
{
    let (w, h) = (f64::from(raster.width), f64::from(raster.height));
    let mut edges = EdgeBox {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
        failed: 0,
    };
    let mut last_error = None;
    let mut transformed = 0usize;

    let steps = (EDGE_SAMPLES - 1) as f64;
    for i in 0..EDGE_SAMPLES {
        let t = i as f64 / steps;
        let edge_points = [(t * w, 0.0), (t * w, h), (0.0, t * h), (w, t * h)];
        for (col, row) in edge_points {
            let (x, y) = raster.geo_transform.apply(col, row);
            match project(x, y) {
                Ok((gx, gy)) => {
                    edges.min_x = edges.min_x.min(gx);
                    edges.min_y = edges.min_y.min(gy);
                    edges.max_x = edges.max_x.max(gx);
                    edges.max_y = edges.max_y.max(gy);
                    transformed += 1;
                }
                Err(e) => {
                    debug!(x, y, error = %e, "Edge sample failed to transform");
                    edges.failed += 1;
                    last_error = Some(e);
                }
            }
        }
    }

    if transformed == 0 {
        return Err(last_error.unwrap_or(ReprojectionError::DegenerateExtent));
    }
    if edges.failed > 0 {
        warn!(
            path = %raster.path.display(),
            failed = edges.failed,
            sampled = edges.failed + transformed,
            "Some raster edge samples could not be reprojected; bounds cover the rest"
        );
    }
    Ok(edges)
}

fn suggested_view(
    raster: &RasterDataset,
    transform: &CoordinateTransform,
) -> Result<GeographicView, ReprojectionError> {
    let (w, h) = (f64::from(raster.width), f64::from(raster.height));
    if raster.width == 0 || raster.height == 0 {
        return Err(ReprojectionError::DegenerateExtent);
    }

    let edges = sample_edges(raster, |x, y| transform.transform(x, y))?;
    let dx = edges.max_x - edges.min_x;
    let dy = edges.max_y - edges.min_y;
    if !(dx > 0.0 && dy > 0.0) {
        return Err(ReprojectionError::DegenerateExtent);
    }

    let resolution = (dx * dx + dy * dy).sqrt() / (w * w + h * h).sqrt();
    let width = ((dx / resolution + 0.5) as u32).max(1);
    let height = ((dy / resolution + 0.5) as u32).max(1);

    Ok(GeographicView {
        width,
        height,
        geo_transform: GeoTransform::north_up(edges.min_x, edges.max_y, resolution, -resolution),
        reprojected: true,
    })
}
