//! PNG/WebP to JPEG conversion.

use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError, Rgb, RgbImage, Rgba};

use super::sniff::ImageType;

/// JPEG quality for converted images.
pub(crate) const JPEG_QUALITY: u8 = 95;

/// Decodes `src` as `format`, flattens it onto white and writes a JPEG to `dst`.
///
/// CPU-bound; call from `spawn_blocking`.
pub(crate) fn convert_to_jpeg(src: &Path, dst: &Path, format: ImageType) -> Result<(), ImageError> {
    let bytes = std::fs::read(src)?;
    let decoded = image::load_from_memory_with_format(&bytes, format.image_format())?;
    let flattened = flatten_onto_white(&decoded);

    let mut writer = BufWriter::new(std::fs::File::create(dst)?);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(&flattened)?;
    writer.flush()?;
    Ok(())
}

/// Composites the image "over" an opaque white canvas.
///
/// Dropping alpha directly would turn transparent regions black.
pub(crate) fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
    })
}

#[allow(clippy::cast_possible_truncation)]
fn over_white(channel: u8, alpha: u8) -> u8 {
    let channel = u16::from(channel);
    let alpha = u16::from(alpha);
    // Rounded (c * a + 255 * (255 - a)) / 255, at most 255.
    ((channel * alpha + 255 * (255 - alpha) + 127) / 255) as u8
}
