//! Flattening rendered rasters onto an opaque background.

use image::{RgbImage, RgbaImage};
use tiny_skia::{Color, ColorU8, IntSize, Pixmap, PixmapPaint, Transform};

use super::RenderError;

/// Background colour overlays are flattened onto.
pub const BACKGROUND: [u8; 3] = [255, 255, 255];

/// Draw `image` over an opaque white canvas of the same size.
///
/// Standard source-over compositing: each pixel's colour is blended by its
/// alpha over white, so fully transparent pixels come out pure white. The
/// result has no alpha channel.
pub fn flatten_onto_white(image: &RgbaImage) -> Result<RgbImage, RenderError> {
    let (width, height) = image.dimensions();
    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| RenderError::Compose(format!("invalid size {}x{}", width, height)))?;

    let mut premultiplied = Vec::with_capacity(image.as_raw().len());
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let color = ColorU8::from_rgba(r, g, b, a).premultiply();
        premultiplied.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    let source = Pixmap::from_vec(premultiplied, size)
        .ok_or_else(|| RenderError::Compose("failed to wrap rendered pixels".to_string()))?;

    let mut canvas = Pixmap::new(width, height)
        .ok_or_else(|| RenderError::Compose("failed to allocate canvas".to_string()))?;
    canvas.fill(Color::from_rgba8(BACKGROUND[0], BACKGROUND[1], BACKGROUND[2], 255));
    canvas.draw_pixmap(
        0,
        0,
        source.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );

    // The canvas is opaque, so premultiplied and straight colour agree.
    let rgb: Vec<u8> = canvas
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| RenderError::Compose("flattened buffer has the wrong size".to_string()))
}
