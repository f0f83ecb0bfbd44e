//! Image encoding: painted RGBA surface → PNG or JPEG [`ImageBlob`].
//!
//! PNG is lossless and ignores the quality setting. JPEG has no alpha
//! channel, so the surface is flattened to RGB first; pdfium paints pages
//! on an opaque white background so nothing visible is lost.

use crate::config::{jpeg_quality, ImageFormat};
use crate::output::ImageBlob;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Encode a surface in `format`. `quality` is in `[0, 1]` and only used for JPEG.
pub fn encode_surface(
    surface: RgbaImage,
    format: ImageFormat,
    quality: f32,
) -> Result<ImageBlob, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Png => {
            surface.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(surface).into_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality));
            rgb.write_with_encoder(encoder)?;
        }
    }

    debug!("Encoded surface → {} bytes {}", buf.len(), format);
    Ok(ImageBlob::new(buf, format))
}
