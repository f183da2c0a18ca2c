use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Pixel, RgbImage, RgbaImage};

use super::FloatImage;
use crate::error::{Error, Result};

/// Decode image bytes of any supported encoding.
///
/// The result is validated to have at least one pixel and is normalized to
/// one of the 8-bit layouts the pipeline works with (see [`normalize_layout`]).
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes).map_err(|source| Error::Encoding {
        context: "decode image",
        source,
    })?;

    validate_dimensions(image.width(), image.height())?;

    Ok(normalize_layout(image))
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|source| Error::Encoding {
            context: "encode PNG",
            source,
        })?;
    Ok(bytes)
}

/// Reject images and targets without pixels.
pub fn validate_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions {
            width,
            height,
            reason: "width and height must be positive",
        });
    }
    Ok(())
}

/// Collapse every decoded layout into gray8, RGB8 or RGBA8.
///
/// Layouts with alpha (including gray+alpha) become RGBA8, 16-bit gray
/// becomes gray8 and everything else becomes RGB8.
pub fn normalize_layout(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            image
        }
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(image.to_luma8()),
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Convert an 8-bit image to a normalized float image (value / 255).
pub fn to_float(image: &DynamicImage) -> FloatImage {
    match image {
        DynamicImage::ImageLuma8(buffer) => buffer_to_float(buffer),
        DynamicImage::ImageRgb8(buffer) => buffer_to_float(buffer),
        DynamicImage::ImageRgba8(buffer) => buffer_to_float(buffer),
        other => to_float(&normalize_layout(other.clone())),
    }
}

fn buffer_to_float<P>(buffer: &ImageBuffer<P, Vec<u8>>) -> FloatImage
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = buffer.dimensions();
    let channels = usize::from(P::CHANNEL_COUNT);
    let row = width as usize * channels;
    let raw = buffer.as_raw();

    FloatImage::from_shape_fn((height as usize, width as usize, channels), |(y, x, c)| {
        f32::from(raw[y * row + x * channels + c]) / 255.0
    })
}

/// Convert a normalized float image back to 8 bits, rounding to nearest.
///
/// # Errors
///
/// Returns [`Error::UnsupportedChannels`] unless the image has 1, 3 or 4
/// channels, and [`Error::InvalidDimensions`] for empty images.
pub fn to_dynamic(image: &FloatImage) -> Result<DynamicImage> {
    let (height, width, channels) = image.dim();
    let (width, height) = (to_u32(width)?, to_u32(height)?);
    validate_dimensions(width, height)?;

    // `iter` walks the logical (row-major) order regardless of memory layout.
    let raw: Vec<u8> = image.iter().map(|&v| quantize(v)).collect();

    let too_small = || Error::InvalidDimensions {
        width,
        height,
        reason: "pixel buffer does not match dimensions",
    };

    match channels {
        1 => GrayImage::from_raw(width, height, raw)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(too_small),
        3 => RgbImage::from_raw(width, height, raw)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(too_small),
        4 => RgbaImage::from_raw(width, height, raw)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(too_small),
        channels => Err(Error::UnsupportedChannels { channels }),
    }
}

/// Map a [0, 1] value to the nearest 8-bit level, clamping out-of-range input.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quantize(value: f32) -> u8 {
    // NaN saturates to 0 through the cast
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidDimensions {
        width: u32::MAX,
        height: u32::MAX,
        reason: "dimension does not fit in 32 bits",
    })
}
