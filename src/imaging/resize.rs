use image::{imageops, DynamicImage, ImageBuffer, Luma};

use super::{convert::validate_dimensions, FloatImage};
use crate::error::{Error, Result};

/// Resize an 8-bit image, keeping its channel layout.
///
/// Lanczos3 widens its support when shrinking, so downscaling is anti-aliased.
pub fn resize_dynamic(image: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
    validate_dimensions(width, height)?;

    if image.width() == width && image.height() == height {
        return Ok(image.clone());
    }

    let _span = tracing::debug_span!("resize", width, height).entered();
    Ok(image.resize_exact(width, height, imageops::FilterType::Lanczos3))
}

/// Resize a normalized float image, keeping it float and within [0, 1].
pub fn resize_float(image: &FloatImage, width: u32, height: u32) -> Result<FloatImage> {
    validate_dimensions(width, height)?;

    let (src_height, src_width, channels) = image.dim();
    if (src_width, src_height) == (width as usize, height as usize) {
        return Ok(image.clone());
    }

    let src_width = u32::try_from(src_width).map_err(|_| too_large())?;
    let src_height = u32::try_from(src_height).map_err(|_| too_large())?;
    validate_dimensions(src_width, src_height)?;

    let _span = tracing::debug_span!("resize", width, height).entered();

    let mut resized = FloatImage::zeros((height as usize, width as usize, channels));

    // Resample each plane on its own; Lanczos overshoot is clamped afterwards
    for c in 0..channels {
        let plane: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_fn(src_width, src_height, |x, y| {
                Luma([image[[y as usize, x as usize, c]]])
            });

        let scaled = imageops::resize(&plane, width, height, imageops::FilterType::Lanczos3);

        for (x, y, pixel) in scaled.enumerate_pixels() {
            resized[[y as usize, x as usize, c]] = pixel[0].clamp(0.0, 1.0);
        }
    }

    Ok(resized)
}

/// Parse a `WIDTHxHEIGHT` size such as `1024x768`.
pub fn parse_size(value: &str) -> Result<(u32, u32)> {
    let invalid = || Error::invalid_parameter("size", format!("expected WIDTHxHEIGHT, got {value:?}"));

    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let width: u32 = width.trim().parse().map_err(|_| invalid())?;
    let height: u32 = height.trim().parse().map_err(|_| invalid())?;

    validate_dimensions(width, height)?;
    Ok((width, height))
}

fn too_large() -> Error {
    Error::InvalidDimensions {
        width: u32::MAX,
        height: u32::MAX,
        reason: "dimension does not fit in 32 bits",
    }
}
