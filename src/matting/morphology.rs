//! Grayscale morphology and smoothing for alpha mattes.
//!
//! Square structuring elements are separable, so every operator runs as a
//! horizontal pass followed by a vertical pass.

use image::{GrayImage, Luma};

use crate::imaging::reflect;

/// Window maximum over a `size` x `size` square. Pixels outside the image are ignored.
pub fn dilate(alpha: &GrayImage, size: usize) -> GrayImage {
    rank_filter(alpha, size, u8::max)
}

/// Window minimum over a `size` x `size` square. Pixels outside the image are ignored.
pub fn erode(alpha: &GrayImage, size: usize) -> GrayImage {
    rank_filter(alpha, size, u8::min)
}

/// Dilation followed by erosion with the same square.
///
/// Fills holes and gaps narrower than the square without moving the outline.
pub fn close(alpha: &GrayImage, size: usize) -> GrayImage {
    erode(&dilate(alpha, size), size)
}

fn rank_filter(alpha: &GrayImage, size: usize, pick: fn(u8, u8) -> u8) -> GrayImage {
    let radius = size / 2;
    let (width, height) = alpha.dimensions();
    let (w, h) = (width as usize, height as usize);
    let src = alpha.as_raw();

    let mut horizontal = vec![0u8; src.len()];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let (lo, hi) = (x.saturating_sub(radius), (x + radius).min(w - 1));
            horizontal[y * w + x] = row[lo..=hi].iter().copied().fold(row[x], pick);
        }
    }

    let mut output = vec![0u8; src.len()];
    for y in 0..h {
        let (lo, hi) = (y.saturating_sub(radius), (y + radius).min(h - 1));
        for x in 0..w {
            output[y * w + x] = (lo..=hi)
                .map(|yy| horizontal[yy * w + x])
                .fold(horizontal[y * w + x], pick);
        }
    }

    GrayImage::from_vec(width, height, output).unwrap_or_else(|| alpha.clone())
}

/// Gaussian kernel of odd length `size` with sigma derived from the size.
///
/// Sizes up to 7 use the fixed binomial-like tables (`[1, 4, 6, 4, 1] / 16`
/// for 5); larger ones use sigma = 0.3 * ((size - 1) / 2 - 1) + 0.8.
pub fn gaussian_kernel(size: usize) -> Vec<f32> {
    match size {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![
            0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
        ],
        _ => {
            let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
            let center = (size / 2) as f32;
            let raw: Vec<f32> = (0..size)
                .map(|i| {
                    let d = i as f32 - center;
                    (-(d * d) / (2.0 * sigma * sigma)).exp()
                })
                .collect();
            let total: f32 = raw.iter().sum();
            raw.into_iter().map(|k| k / total).collect()
        }
    }
}

/// Separable Gaussian blur with mirrored borders (edge pixel not repeated).
pub fn gaussian_blur(alpha: &GrayImage, size: usize) -> GrayImage {
    let kernel = gaussian_kernel(size);
    let radius = (kernel.len() / 2) as isize;
    let (width, height) = alpha.dimensions();
    let (w, h) = (width as usize, height as usize);

    let mut horizontal = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            horizontal[y * w + x] = kernel
                .iter()
                .enumerate()
                .map(|(i, k)| {
                    let xx = reflect(x as isize + i as isize - radius, w);
                    k * f32::from(alpha.get_pixel(xx as u32, y as u32)[0])
                })
                .sum();
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let value: f32 = kernel
            .iter()
            .enumerate()
            .map(|(i, k)| {
                let yy = reflect(y as isize + i as isize - radius, h);
                k * horizontal[yy * w + x]
            })
            .sum();
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dilate_grows_single_pixel_to_square() {
        let mut alpha = GrayImage::new(9, 9);
        alpha.put_pixel(4, 4, Luma([200]));

        let dilated = dilate(&alpha, 3);

        for y in 0..9 {
            for x in 0..9 {
                let inside = (3..=5).contains(&x) && (3..=5).contains(&y);
                let expected = if inside { 200 } else { 0 };
                assert_eq!(dilated.get_pixel(x, y)[0], expected, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_erode_removes_thin_line() {
        let mut alpha = GrayImage::from_pixel(9, 9, Luma([0]));
        for x in 0..9 {
            alpha.put_pixel(x, 4, Luma([255]));
        }
        let eroded = erode(&alpha, 3);
        assert!(eroded.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_border_pixels_are_not_eroded() {
        let alpha = GrayImage::from_pixel(6, 6, Luma([255]));
        let eroded = erode(&alpha, 7);
        assert!(eroded.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_close_fills_gap_narrower_than_kernel() {
        let mut alpha = GrayImage::from_pixel(20, 10, Luma([255]));
        for y in 0..10 {
            for x in 9..12 {
                alpha.put_pixel(x, y, Luma([0]));
            }
        }
        let closed = close(&alpha, 7);
        assert!(closed.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_kernels_sum_to_one() {
        for size in [1, 3, 5, 7, 9, 11] {
            let kernel = gaussian_kernel(size);
            assert_eq!(kernel.len(), size);
            assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5, "size {size}");
        }
    }

    #[test]
    fn test_blur_keeps_constant_image() {
        let alpha = GrayImage::from_pixel(7, 5, Luma([77]));
        let blurred = gaussian_blur(&alpha, 5);
        assert!(blurred.pixels().all(|p| p[0] == 77));
    }

    #[test]
    fn test_blur_ramps_hard_edge() {
        let alpha = GrayImage::from_fn(12, 3, |x, _| Luma([if x < 6 { 255 } else { 0 }]));
        let blurred = gaussian_blur(&alpha, 5);
        let row: Vec<u8> = (0..12).map(|x| blurred.get_pixel(x, 1)[0]).collect();
        assert_eq!(&row[3..9], &[255, 239, 175, 80, 16, 0]);
    }
}
