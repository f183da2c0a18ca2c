use image::{DynamicImage, GrayImage, Luma, RgbaImage};

use super::morphology;
use crate::error::{Error, Result};

/// Side of the square used to close holes in the matte.
pub const CLOSING_KERNEL: usize = 7;

/// Side of the Gaussian kernel used to soften matte edges.
pub const SMOOTHING_KERNEL: usize = 5;

/// Cleans the raw alpha channel produced by a matting model.
///
/// Raw mattes tend to have pinholes where the subject is dark or reflective
/// and stair-stepped outlines. Closing removes the holes without growing the
/// silhouette; the blur turns the steps into a short ramp. Color is untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatteRefiner;

impl MatteRefiner {
    pub fn new() -> Self {
        Self
    }

    /// Refine the alpha channel of an RGBA image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAlphaChannel`] if the image has no alpha.
    pub fn refine(&self, image: DynamicImage) -> Result<DynamicImage> {
        let _span = tracing::debug_span!("refine").entered();

        if !image.color().has_alpha() {
            return Err(Error::MissingAlphaChannel {
                width: image.width(),
                height: image.height(),
            });
        }

        let mut rgba = image.into_rgba8();
        let alpha = extract_alpha(&rgba);
        let refined = self.refine_alpha(&alpha);
        replace_alpha(&mut rgba, &refined);

        Ok(DynamicImage::ImageRgba8(rgba))
    }

    /// Closing followed by smoothing on a standalone alpha plane.
    pub fn refine_alpha(&self, alpha: &GrayImage) -> GrayImage {
        let closed = morphology::close(alpha, CLOSING_KERNEL);
        morphology::gaussian_blur(&closed, SMOOTHING_KERNEL)
    }
}

/// Copy the alpha channel out of an RGBA image.
pub fn extract_alpha(rgba: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        Luma([rgba.get_pixel(x, y)[3]])
    })
}

/// Overwrite the alpha channel of an RGBA image. Both must have the same size.
pub fn replace_alpha(rgba: &mut RgbaImage, alpha: &GrayImage) {
    debug_assert_eq!(rgba.dimensions(), alpha.dimensions());
    for (pixel, value) in rgba.pixels_mut().zip(alpha.pixels()) {
        pixel[3] = value[0];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Noise;
    use image::{Rgb, RgbImage, Rgba};

    const OPAQUE: u8 = 128;

    /// 140x140 canvas with an opaque 100x100 square at (20, 20) and a 3x3 hole in its middle.
    fn holed_square() -> GrayImage {
        GrayImage::from_fn(140, 140, |x, y| {
            let in_square = (20..120).contains(&x) && (20..120).contains(&y);
            let in_hole = (69..72).contains(&x) && (69..72).contains(&y);
            Luma([if in_square && !in_hole { 255 } else { 0 }])
        })
    }

    fn random_blobs(seed: u64) -> GrayImage {
        let mut noise = Noise::new(seed);
        let centers: Vec<(f32, f32, f32)> = (0..5)
            .map(|_| {
                (
                    noise.next_unit() * 64.0,
                    noise.next_unit() * 64.0,
                    4.0 + noise.next_unit() * 10.0,
                )
            })
            .collect();

        GrayImage::from_fn(64, 64, |x, y| {
            let inside = centers.iter().any(|&(cx, cy, r)| {
                let (dx, dy) = (x as f32 - cx, y as f32 - cy);
                dx * dx + dy * dy < r * r
            });
            let speckle = noise.next_unit() < 0.04;
            Luma([if inside ^ speckle { 255 } else { 0 }])
        })
    }

    /// Chebyshev distance from every opaque pixel of `refined` to the nearest
    /// opaque pixel of `original`.
    fn max_growth(original: &GrayImage, refined: &GrayImage) -> u32 {
        let sources: Vec<(u32, u32)> = original
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > OPAQUE)
            .map(|(x, y, _)| (x, y))
            .collect();

        refined
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > OPAQUE)
            .map(|(x, y, _)| {
                sources
                    .iter()
                    .map(|&(sx, sy)| x.abs_diff(sx).max(y.abs_diff(sy)))
                    .min()
                    .unwrap_or(u32::MAX)
            })
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_closing_fills_small_hole() {
        let closed = morphology::close(&holed_square(), CLOSING_KERNEL);
        for y in 69..72 {
            for x in 69..72 {
                assert!(closed.get_pixel(x, y)[0] >= 200, "hole pixel ({x}, {y}) still open");
            }
        }
        // Outline is exactly where it was
        assert_eq!(closed.get_pixel(20, 20)[0], 255);
        assert_eq!(closed.get_pixel(19, 20)[0], 0);
        assert_eq!(closed.get_pixel(119, 119)[0], 255);
        assert_eq!(closed.get_pixel(120, 119)[0], 0);
    }

    #[test]
    fn test_smoothing_ramps_edge_over_a_few_pixels() {
        let refined = MatteRefiner::new().refine_alpha(&holed_square());

        let row: Vec<u8> = (0..140).map(|x| refined.get_pixel(x, 70)[0]).collect();
        let ramp = row[..70].iter().filter(|&&a| a > 0 && a < 255).count();
        assert!((2..=5).contains(&ramp), "ramp width {ramp}: {:?}", &row[14..26]);

        assert_eq!(row[70], 255);
        assert_eq!(row[5], 0);
    }

    #[test]
    fn test_closing_is_idempotent() {
        let square = GrayImage::from_fn(60, 60, |x, y| {
            Luma([if (10..50).contains(&x) && (15..40).contains(&y) { 255 } else { 0 }])
        });
        let once = morphology::close(&square, CLOSING_KERNEL);
        let twice = morphology::close(&once, CLOSING_KERNEL);
        assert_eq!(once, square);
        assert_eq!(twice, once);

        for seed in 0..4 {
            let blobs = random_blobs(seed);
            let once = morphology::close(&blobs, CLOSING_KERNEL);
            let twice = morphology::close(&once, CLOSING_KERNEL);
            assert_eq!(twice, once, "seed {seed}");
        }
    }

    #[test]
    fn test_silhouette_does_not_grow() {
        // A solid square keeps its exact opaque footprint
        let square = GrayImage::from_fn(80, 80, |x, y| {
            Luma([if (20..60).contains(&x) && (20..60).contains(&y) { 255 } else { 0 }])
        });
        let refined = MatteRefiner::new().refine_alpha(&square);
        assert_eq!(max_growth(&square, &refined), 0);

        // Opaque pixels never land farther than the closing radius from the
        // original matte; the blur window sits inside the closing window
        let reach = (CLOSING_KERNEL / 2) as u32;
        for seed in 0..24 {
            let blobs = random_blobs(seed);
            let closed = morphology::close(&blobs, CLOSING_KERNEL);
            assert!(max_growth(&blobs, &closed) <= reach, "seed {seed}");

            let refined = MatteRefiner::new().refine_alpha(&blobs);
            assert!(max_growth(&blobs, &refined) <= reach, "seed {seed}");
        }
    }

    #[test]
    fn test_refine_keeps_color() {
        let rgba = RgbaImage::from_fn(30, 30, |x, y| {
            let alpha = if (8..22).contains(&x) && (8..22).contains(&y) { 255 } else { 0 };
            Rgba([x as u8 * 8, y as u8 * 8, 99, alpha])
        });

        let refined = MatteRefiner::new()
            .refine(DynamicImage::ImageRgba8(rgba.clone()))
            .unwrap()
            .into_rgba8();

        for (before, after) in rgba.pixels().zip(refined.pixels()) {
            assert_eq!(&before.0[..3], &after.0[..3]);
        }
        assert_ne!(extract_alpha(&rgba), extract_alpha(&refined));
    }

    #[test]
    fn test_rgb_input_is_rejected() {
        let rgb = RgbImage::from_pixel(10, 8, Rgb([1, 2, 3]));
        let err = MatteRefiner::new()
            .refine(DynamicImage::ImageRgb8(rgb))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingAlphaChannel {
                width: 10,
                height: 8
            }
        ));
    }

    #[test]
    fn test_alpha_round_trip() {
        let mut rgba = RgbaImage::from_pixel(3, 2, Rgba([5, 6, 7, 8]));
        let alpha = GrayImage::from_fn(3, 2, |x, y| Luma([(x + y * 3) as u8]));
        replace_alpha(&mut rgba, &alpha);
        assert_eq!(extract_alpha(&rgba), alpha);
        assert_eq!(rgba.get_pixel(2, 1), &Rgba([5, 6, 7, 5]));
    }
}
