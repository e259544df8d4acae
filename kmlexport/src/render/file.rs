//! Renderer that draws a raster straight from its image file.

use image::imageops::FilterType;
use image::RgbaImage;
use tracing::debug;

use super::{ImageSize, RasterRenderer, RenderError};
use crate::layer::RasterLayer;
use crate::source::Extent;

/// Decodes the raster's own file. No styling is applied.
///
/// The extent is ignored: the whole file is the native extent. The image is
/// only resampled when the requested size differs from the decoded one.
#[derive(Debug, Clone, Copy)]
pub struct ImageFileRenderer {
    filter: FilterType,
}

impl Default for ImageFileRenderer {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl ImageFileRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resampling filter used when sizes differ.
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

impl RasterRenderer for ImageFileRenderer {
    fn render(
        &self,
        layer: &RasterLayer,
        _extent: &Extent,
        size: ImageSize,
    ) -> Result<RgbaImage, RenderError> {
        let decoded = image::open(layer.path()).map_err(|e| RenderError::Failed {
            layer: layer.name().to_string(),
            reason: e.to_string(),
        })?;
        let rgba = decoded.to_rgba8();
        if ImageSize::of(&rgba) == size {
            return Ok(rgba);
        }
        debug!(
            layer = layer.name(),
            from = %ImageSize::of(&rgba),
            to = %size,
            "Resampling rendered raster"
        );
        Ok(image::imageops::resize(&rgba, size.width, size.height, self.filter))
    }
}
