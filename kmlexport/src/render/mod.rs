//! Raster rendering.
//!
//! Drawing a styled raster is not the exporter's job: it asks a
//! [`RasterRenderer`] for an RGBA image of the layer's native extent at its
//! native pixel size, then flattens the result onto white with
//! [`flatten_onto_white`] before saving it as an overlay.
//!
//! Any `Fn(&RasterLayer, &Extent, ImageSize) -> Result<RgbaImage, RenderError>`
//! is a renderer, which keeps tests free of real image files:
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use kmlexport::render::{ImageSize, RasterRenderer, RenderError};
//! use kmlexport::layer::RasterLayer;
//! use kmlexport::source::Extent;
//!
//! let solid = |_: &RasterLayer, _: &Extent, size: ImageSize| -> Result<RgbaImage, RenderError> {
//!     Ok(RgbaImage::from_pixel(size.width, size.height, Rgba([0, 128, 0, 255])))
//! };
//! # let _ = &solid as &dyn RasterRenderer;
//! ```

mod composite;
mod file;

use std::fmt;
use std::path::PathBuf;

use image::RgbaImage;
use thiserror::Error;

use crate::layer::RasterLayer;
use crate::source::Extent;

pub use composite::{flatten_onto_white, BACKGROUND};
pub use file::ImageFileRenderer;

/// Errors producing or saving a rendered raster.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Renderer failed for {layer}: {reason}")]
    Failed { layer: String, reason: String },

    #[error("Renderer returned {actual} instead of {expected}")]
    SizeMismatch {
        expected: ImageSize,
        actual: ImageSize,
    },

    #[error("Image compositing failed: {0}")]
    Compose(String),

    #[error("Failed to save image {}: {reason}", .path.display())]
    Save { path: PathBuf, reason: String },
}

/// Output size of a render in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &RgbaImage) -> Self {
        Self::new(image.width(), image.height())
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Produces pixels for a raster layer.
///
/// Implementations must return an image of exactly `size`; callers block
/// until the render completes.
pub trait RasterRenderer {
    fn render(
        &self,
        layer: &RasterLayer,
        extent: &Extent,
        size: ImageSize,
    ) -> Result<RgbaImage, RenderError>;
}

impl<F> RasterRenderer for F
where
    F: Fn(&RasterLayer, &Extent, ImageSize) -> Result<RgbaImage, RenderError>,
{
    fn render(
        &self,
        layer: &RasterLayer,
        extent: &Extent,
        size: ImageSize,
    ) -> Result<RgbaImage, RenderError> {
        self(layer, extent, size)
    }
}

/// Render and check the result has the requested size.
pub fn render_checked(
    renderer: &dyn RasterRenderer,
    layer: &RasterLayer,
    extent: &Extent,
    size: ImageSize,
) -> Result<RgbaImage, RenderError> {
    let image = renderer.render(layer, extent, size)?;
    let actual = ImageSize::of(&image);
    if actual != size {
        return Err(RenderError::SizeMismatch {
            expected: size,
            actual,
        });
    }
    Ok(image)
}
