//! Raster layers to ground overlays.

use std::path::{Path, PathBuf};

use image::{imageops, ImageFormat};
use tracing::{debug, info};

use super::{PackagingError, RASTER_DIR};
use crate::bindings::PropertyBindings;
use crate::crs::{ensure_geographic, ReprojectionError};
use crate::error::ExportResult;
use crate::kml::GroundOverlay;
use crate::layer::RasterLayer;
use crate::render::{flatten_onto_white, render_checked, ImageSize, RasterRenderer, RenderError};
use crate::source::LayerProvider;

/// Result of exporting one raster layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterExport {
    pub overlay: GroundOverlay,
    /// The PNG written under the output directory.
    pub image_path: PathBuf,
}

/// Overlay label: `folder_name`, else `Name`, else the raster's base name.
pub fn overlay_name(bindings: &PropertyBindings, base_name: &str) -> String {
    bindings
        .folder_name()
        .or_else(|| bindings.name())
        .unwrap_or(base_name)
        .to_string()
}

/// Render one raster at its native size and pin it to its geographic box.
///
/// The rendered image is flattened onto white and saved as
/// `<out_dir>/<base>.png`; the overlay references it as `rasters/<base>.png`.
pub fn export_raster(
    provider: &dyn LayerProvider,
    layer: &RasterLayer,
    bindings: &PropertyBindings,
    renderer: &dyn RasterRenderer,
    out_dir: &Path,
) -> ExportResult<RasterExport> {
    let dataset = provider.open_raster(layer)?;
    let base = layer.base_name();
    let file_name = format!("{}.png", base);

    std::fs::create_dir_all(out_dir).map_err(|e| PackagingError::io(out_dir, e))?;
    let image_path = out_dir.join(&file_name);

    let view = ensure_geographic(&dataset)?;
    let bounds = view.bounds();
    if !bounds.is_valid() {
        return Err(ReprojectionError::DegenerateExtent.into());
    }

    let size = ImageSize::new(dataset.width, dataset.height);
    let rendered = render_checked(renderer, layer, &dataset.extent(), size)?;
    let mut opaque = flatten_onto_white(&rendered)?;
    if !view.reprojected {
        // Overlays are drawn north-up and west-to-east.
        let gt = view.geo_transform;
        if gt.pixel_height() > 0.0 {
            imageops::flip_vertical_in_place(&mut opaque);
        }
        if gt.pixel_width() < 0.0 {
            imageops::flip_horizontal_in_place(&mut opaque);
        }
    }
    opaque
        .save_with_format(&image_path, ImageFormat::Png)
        .map_err(|e| RenderError::Save {
            path: image_path.clone(),
            reason: e.to_string(),
        })?;
    debug!(path = %image_path.display(), %size, "Saved overlay image");

    let overlay = GroundOverlay {
        name: overlay_name(bindings, &base),
        href: format!("{}/{}", RASTER_DIR, file_name),
        bounds,
    };
    info!(
        layer = %overlay.name,
        %size,
        reprojected = view.reprojected,
        north = bounds.north,
        south = bounds.south,
        east = bounds.east,
        west = bounds.west,
        "Exported raster layer"
    );
    Ok(RasterExport {
        overlay,
        image_path,
    })
}
